//! Answer composition for `/api/chat` and `nrag ask`.
//!
//! The top hit picks the formatter by its payload variant. Hits from other
//! kinds among the next two are appended as additional context, and a
//! narrative from the LLM collaborator is appended when one is available.
//!
//! A top score of zero or less means nothing relevant was found; those
//! queries get a fixed message and no sources.

use serde::Serialize;
use serde_json::{Map, Value};

use newsletter_rag_core::corpus::title_case;
use newsletter_rag_core::models::{
    ChunkPayload, DirectorMessage, Metric, MonthRecord, StateEngagement, TechnicalDevelopments,
};
use newsletter_rag_core::{NewsletterIndex, SearchHit};

use crate::llm::NarrativeClient;

pub const NO_DATA_MESSAGE: &str = "No relevant information found in the official newsletter data. Please try asking about:\n\
• Monthly statistics and activities (April 2025 - January 2026)\n\
• APAAR ID generation progress\n\
• State performance and attendance rates\n\
• Technical developments and infrastructure\n\
• Learning outcomes and KPIs\n\
• Director's message";

/// JSON body of `POST /api/chat`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatAnswer {
    pub answer: String,
    /// `"rag_only"` or `"hybrid"` (templated answer plus narrative).
    pub mode: String,
    pub sources: Vec<String>,
}

impl ChatAnswer {
    fn no_data() -> Self {
        Self {
            answer: NO_DATA_MESSAGE.to_string(),
            mode: "rag_only".to_string(),
            sources: Vec::new(),
        }
    }
}

/// Retrieve, format and optionally narrate an answer to `query`.
pub async fn answer_query(
    index: &NewsletterIndex,
    narrator: Option<&NarrativeClient>,
    query: &str,
    top_k: usize,
    context_results: usize,
) -> ChatAnswer {
    let query = query.trim();
    if query.is_empty() {
        return ChatAnswer::no_data();
    }

    let hits = index.search(query, top_k);
    let Some(mut answer) = render_answer(query, &hits) else {
        return ChatAnswer::no_data();
    };

    let mut mode = "rag_only";
    if let Some(narrator) = narrator {
        let context = hits
            .iter()
            .take(context_results)
            .map(|h| h.text())
            .collect::<Vec<_>>()
            .join("\n\n");
        if let Some(narrative) = narrator.summarize(query, &context).await {
            answer.push_str("\n\nAI Analysis:\n");
            answer.push_str(&narrative);
            mode = "hybrid";
        }
    }

    ChatAnswer {
        answer,
        mode: mode.to_string(),
        sources: hits
            .iter()
            .take(context_results)
            .map(|h| h.provenance.clone())
            .collect(),
    }
}

/// Templated answer from ranked hits, or `None` when nothing is relevant.
pub fn render_answer(query: &str, hits: &[SearchHit<'_>]) -> Option<String> {
    let primary = hits.first().filter(|h| h.score > 0.0)?;

    let mut answer = match primary.chunk.payload() {
        ChunkPayload::Month(month) => format_month(month),
        ChunkPayload::Technical(tech) => format_technical(tech),
        ChunkPayload::Kpi { category, values } => format_kpi(category, values),
        ChunkPayload::DirectorMessage(msg) => format_director_message(msg),
        ChunkPayload::StateEngagement(engagement) => format_state_engagement(engagement),
        ChunkPayload::Rvsk(_) | ChunkPayload::DetailedContext => format_generic(query, hits),
    };

    let extra: Vec<String> = hits
        .iter()
        .skip(1)
        .take(2)
        .filter(|h| h.kind() != primary.kind())
        .map(|h| format!("• {}", truncate(h.text(), 200)))
        .collect();
    if hits.len() > 1 {
        answer.push_str("\n\nAdditional Context:");
        for line in extra {
            answer.push('\n');
            answer.push_str(&line);
        }
    }

    Some(answer)
}

fn format_month(month: &MonthRecord) -> String {
    let mut lines = vec![
        format!("{} - Education Intelligence Report", month.month),
        String::new(),
        "Key Statistics:".to_string(),
    ];
    for (label, value) in [
        ("Schools", &month.schools),
        ("Teachers", &month.teachers),
        ("Students", &month.students),
        ("APAAR IDs Generated", &month.apaar_ids),
    ] {
        if let Some(v) = value {
            lines.push(format!("• {}: {}", label, v.grouped()));
        }
    }
    if let Some(rate) = &month.attendance_rate {
        lines.push(format!("• Attendance Rate: {}%", rate));
    }

    if !month.highlights.is_empty() {
        lines.push(String::new());
        lines.push("Key Highlights:".to_string());
        lines.extend(month.highlights.iter().map(|h| format!("• {}", h)));
    }

    if !month.activities.is_empty() {
        lines.push(String::new());
        lines.push("Major Activities:".to_string());
        lines.extend(month.activities.iter().take(5).map(|a| format!("• {}", a)));
    }

    if !month.events.is_empty() {
        lines.push(String::new());
        lines.push("Notable Events:".to_string());
        for event in month.events.iter().take(3) {
            lines.push(format!("• {} ({})", event.name, event.date));
            lines.push(format!("  {}", event.description));
        }
    }

    if !month.states.is_empty() {
        lines.push(String::new());
        lines.push("State Performance:".to_string());
        for (state, stats) in month.states.iter().take(3) {
            let mut parts = Vec::new();
            if let Some(a) = &stats.attendance {
                parts.push(format!("{}% attendance", a));
            }
            if let Some(c) = &stats.apaar_coverage {
                parts.push(format!("{}% APAAR coverage", c));
            }
            lines.push(format!("• {}: {}", state, parts.join(", ")));
        }
    }

    lines.join("\n")
}

fn format_technical(tech: &TechnicalDevelopments) -> String {
    let mut lines = vec![
        "Technical Developments & Infrastructure".to_string(),
        String::new(),
        "Dashboard Features:".to_string(),
    ];
    lines.extend(tech.dashboard_features.iter().take(5).map(|f| format!("• {}", f)));

    if !tech.infrastructure_upgrades.is_empty() {
        lines.push(String::new());
        lines.push("Infrastructure Upgrades:".to_string());
        lines.extend(tech.infrastructure_upgrades.iter().take(5).map(|u| format!("• {}", u)));
    }

    if let (Some(first), Some(last)) = (tech.apaar_milestones.first(), tech.apaar_milestones.last())
    {
        lines.push(String::new());
        lines.push("APAAR Milestones:".to_string());
        if let (Some(a), Some(b)) = (&first.registrations, &last.registrations) {
            lines.push(format!("• Growth: {} → {} registrations", a.grouped(), b.grouped()));
        }
        if let (Some(a), Some(b)) = (&first.states_active, &last.states_active) {
            lines.push(format!("• State Coverage: {} → {} states/UTs", a, b));
        }
    }

    lines.join("\n")
}

fn format_kpi(category: &str, values: &Map<String, Value>) -> String {
    let mut lines = vec![
        format!("Key Performance Indicators: {}", title_case(category)),
        String::new(),
    ];
    for (key, value) in values {
        let value = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        lines.push(format!("• {}: {}", title_case(key), value));
    }
    lines.join("\n")
}

fn format_director_message(msg: &DirectorMessage) -> String {
    [
        "Director's Message".to_string(),
        String::new(),
        format!("From: {}", msg.name.as_deref().unwrap_or("Director")),
        format!(
            "Position: {}",
            msg.position
                .as_deref()
                .unwrap_or("Director, Department of School Education & Literacy")
        ),
        String::new(),
        msg.message.clone().unwrap_or_default(),
    ]
    .join("\n")
}

fn format_state_engagement(engagement: &StateEngagement) -> String {
    let mut lines = vec!["State Engagement Overview".to_string(), String::new()];

    if let Some(summary) = &engagement.correspondence_summary {
        let or_zero = |m: &Option<Metric>| m.as_ref().map_or("0".to_string(), Metric::to_string);
        lines.push("Summary:".to_string());
        lines.push(format!("• Total States/UTs: {}", or_zero(&summary.total_states_uts)));
        lines.push(format!("• Active Participants: {}", or_zero(&summary.active_participants)));
        lines.push(format!("• MOUs Signed: {}", or_zero(&summary.mou_signed)));
        lines.push(format!(
            "• Advanced Implementation: {}",
            or_zero(&summary.implementation_advanced)
        ));
    }

    if !engagement.top_performing_states.is_empty() {
        lines.push(String::new());
        lines.push("Top Performing States:".to_string());
        for state in engagement.top_performing_states.iter().take(5) {
            let metrics: Vec<String> = [
                ("APAAR", &state.apaar_coverage),
                ("Attendance", &state.attendance),
                ("Digital Readiness", &state.digital_readiness),
            ]
            .iter()
            .filter_map(|&(label, v)| v.as_ref().map(|v| format!("{} {}%", label, v)))
            .collect();
            lines.push(format!("• {}: {}", state.name, metrics.join(", ")));
        }
    }

    lines.join("\n")
}

fn format_generic(query: &str, hits: &[SearchHit<'_>]) -> String {
    let mut lines = vec![
        format!("Answer to: '{}'", query),
        String::new(),
        "Based on the official newsletter data:".to_string(),
        String::new(),
    ];
    for (i, hit) in hits.iter().take(3).enumerate() {
        let text = hit.text().replace('\n', " ");
        let text = text.trim();
        if !text.is_empty() {
            lines.push(format!("{}. {}", i + 1, truncate(text, 300)));
            lines.push(String::new());
        }
    }
    lines.join("\n")
}

/// Cut to `max` characters, ending in `...` when shortened.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsletter_rag_core::Backend;
    use serde_json::json;

    fn index() -> NewsletterIndex {
        let data = json!({
            "director_message": {
                "name": "Shri Sanjay Kumar",
                "position": "Secretary, DoSEL",
                "message": "Data driven governance is transforming our classrooms."
            },
            "months": [{
                "month": "April 2025",
                "schools": 945000,
                "teachers": 4350000,
                "students": 111800000,
                "apaar_ids": 120000000,
                "attendance_rate": 96.2,
                "highlights": ["Summer readiness drive"],
                "activities": ["a1", "a2", "a3", "a4", "a5", "a6"],
                "events": [{"name": "VSK Conclave", "date": "12 April", "description": "Review meeting"}],
                "states": {
                    "Kerala": {"attendance": 98.6, "apaar_coverage": 91.5},
                    "Goa": {"attendance": 97.0, "apaar_coverage": 90.1},
                    "Bihar": {"attendance": 88.1, "apaar_coverage": 70.2},
                    "Assam": {"attendance": 90.3, "apaar_coverage": 75.0}
                }
            }],
            "technical_developments": {
                "dashboard_features": ["Live heatmap"],
                "apaar_milestones": [
                    {"month": "April 2025", "registrations": 120000000, "states_active": 28},
                    {"month": "January 2026", "registrations": 180000000, "states_active": 36}
                ]
            },
            "key_performance_indicators": {
                "learning_outcomes": {"foundational_literacy": "78%", "numeracy_proficiency": "74%"}
            },
            "state_engagement": {
                "correspondence_summary": {"total_states_uts": 36, "mou_signed": 30}
            }
        });
        let rule = "=".repeat(78);
        let context = format!(
            "{rule}\nThe Rashtriya Vidya Samiksha Kendra consolidates lunar telemetry alongside \
             ordinary school data for reporting purposes across every district.\n{rule}"
        );
        NewsletterIndex::initialize(&data, Some(&context), Backend::Auto).unwrap()
    }

    #[test]
    fn test_month_answer() {
        let idx = index();
        let hits = idx.search("April attendance", 5);
        let answer = render_answer("April attendance", &hits).unwrap();
        assert!(answer.starts_with("April 2025 - Education Intelligence Report"));
        assert!(answer.contains("• Schools: 945,000"));
        assert!(answer.contains("• Students: 111,800,000"));
        assert!(answer.contains("• Attendance Rate: 96.2%"));
        assert!(answer.contains("• a5"));
        assert!(!answer.contains("• a6"));
        assert!(answer.contains("• VSK Conclave (12 April)"));
        assert!(answer.contains("• Bihar: 88.1% attendance, 70.2% APAAR coverage"));
        assert!(!answer.contains("Assam"));
    }

    #[test]
    fn test_kpi_answer() {
        let idx = index();
        let hits = idx.search("foundational literacy", 5);
        let answer = render_answer("foundational literacy", &hits).unwrap();
        assert!(answer.starts_with("Key Performance Indicators: Learning Outcomes"));
        assert!(answer.contains("• Foundational Literacy: 78%"));
        assert!(answer.contains("• Numeracy Proficiency: 74%"));
    }

    #[test]
    fn test_technical_answer() {
        let idx = index();
        let hits = idx.search("heatmap dashboard features", 5);
        let answer = render_answer("heatmap", &hits).unwrap();
        assert!(answer.contains("• Live heatmap"));
        assert!(answer.contains("• Growth: 120,000,000 → 180,000,000 registrations"));
        assert!(answer.contains("• State Coverage: 28 → 36 states/UTs"));
    }

    #[test]
    fn test_director_answer() {
        let idx = index();
        let hits = idx.search("governance classrooms", 5);
        let answer = render_answer("governance", &hits).unwrap();
        assert!(answer.starts_with("Director's Message"));
        assert!(answer.contains("From: Shri Sanjay Kumar"));
        assert!(answer.contains("Position: Secretary, DoSEL"));
    }

    #[test]
    fn test_state_engagement_missing_fields_render_zero() {
        let idx = index();
        let hits = idx.search("MOUs signed", 5);
        let answer = render_answer("MOUs signed", &hits).unwrap();
        assert!(answer.contains("• MOUs Signed: 30"));
        assert!(answer.contains("• Active Participants: 0"));
    }

    #[test]
    fn test_detailed_context_uses_generic_answer() {
        let idx = index();
        let hits = idx.search("lunar telemetry", 5);
        let answer = render_answer("lunar telemetry", &hits).unwrap();
        assert!(answer.starts_with("Answer to: 'lunar telemetry'"));
        assert!(answer.contains("1. The Rashtriya Vidya Samiksha Kendra"));
    }

    #[test]
    fn test_no_relevant_result() {
        let idx = index();
        let hits = idx.search("quantum cryptocurrency", 5);
        assert!(render_answer("quantum cryptocurrency", &hits).is_none());
        assert!(render_answer("anything", &[]).is_none());
    }

    #[test]
    fn test_additional_context_skips_same_kind() {
        let idx = index();
        let find = |prefix: &str| {
            idx.chunks()
                .iter()
                .find(|c| c.text().starts_with(prefix))
                .unwrap()
        };
        let hit = |prefix: &str, score: f32| {
            let chunk = find(prefix);
            SearchHit {
                score,
                chunk,
                provenance: newsletter_rag_core::search::provenance(chunk),
            }
        };
        let hits = vec![
            hit("Dashboard features:", 0.9),
            hit("APAAR milestones:", 0.8),
            hit("learning_outcomes:", 0.7),
            hit("Director's Message", 0.6),
        ];
        let answer = render_answer("q", &hits).unwrap();
        let (_, extra) = answer.split_once("Additional Context:").unwrap();
        assert!(extra.contains("• learning_outcomes: foundational_literacy: 78%"));
        assert!(!extra.contains("APAAR milestones:"));
        assert!(!extra.contains("Director's Message"));
        assert_eq!(extra.lines().filter(|l| l.starts_with("• ")).count(), 1);
    }

    #[tokio::test]
    async fn test_answer_query_rag_only() {
        let idx = index();
        let out = answer_query(&idx, None, "  foundational literacy ", 5, 3).await;
        assert_eq!(out.mode, "rag_only");
        assert_eq!(out.sources[0], "official_newsletter::kpi_learning_outcomes");
        assert!(out.sources.len() <= 3);
    }

    #[tokio::test]
    async fn test_answer_query_no_data() {
        let idx = index();
        for q in ["", "   ", "quantum cryptocurrency"] {
            let out = answer_query(&idx, None, q, 5, 3).await;
            assert_eq!(out.answer, NO_DATA_MESSAGE);
            assert_eq!(out.mode, "rag_only");
            assert!(out.sources.is_empty());
        }
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 6), "abc...");
    }
}
