use newsletter_rag_core::{NewsletterIndex, SearchHit};

/// Print ranked hits for `nrag search`.
pub fn run_search(index: &NewsletterIndex, query: &str, limit: usize) {
    let hits = index.search(query, limit);
    print!("{}", render_hits(&hits));
}

pub fn render_hits(hits: &[SearchHit<'_>]) -> String {
    if hits.is_empty() {
        return "No results.\n".to_string();
    }

    let mut out = String::new();
    for (i, hit) in hits.iter().enumerate() {
        out.push_str(&format!(
            "{}. [{:.4}] {} ({})\n",
            i + 1,
            hit.score,
            hit.kind(),
            hit.provenance
        ));
        out.push_str(&format!("    {}\n", excerpt(hit.text(), 160)));
    }
    out
}

fn excerpt(text: &str, max: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= max {
        flat
    } else {
        let kept: String = flat.chars().take(max).collect();
        format!("{}...", kept.trim_end())
    }
}
