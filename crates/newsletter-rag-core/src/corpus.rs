//! Corpus builder.
//!
//! Renders each structured record into a sentence-like text chunk. The
//! emission order is the row order of the TF-IDF matrix, and therefore the
//! tie-break order for equal similarity scores:
//!
//! 1. director's message
//! 2. months, in file order
//! 3. technical developments (features, upgrades, milestones)
//! 4. KPI categories, in file order
//! 5. state engagement (summary, top performing states)
//! 6. RVSK programme chunks, ending with Hindi/English bilingual chunks
//! 7. paragraphs sliced from the optional free-text document
//!
//! Missing optional fields drop their clause from the rendered text.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{CorpusError, Result};
use crate::models::{
    Chunk, ChunkPayload, MonthRecord, NewsletterData, RvskData, Sourced, StateEngagement,
    TechnicalDevelopments,
};

/// Width of the `=` rule separating sections in the free-text document.
pub const SECTION_RULE_WIDTH: usize = 78;

/// Sections at or below this many characters are dropped.
pub const MIN_SECTION_CHARS: usize = 100;

/// Paragraphs at or below this many characters are dropped as noise.
pub const MIN_PARAGRAPH_CHARS: usize = 50;

/// Parse the structured source into typed records.
///
/// Fails with [`CorpusError::InvalidCorpusInput`] when the top level is not
/// a JSON object or a present field has an incompatible type.
pub fn parse_records(data: &Value) -> Result<NewsletterData> {
    if !data.is_object() {
        return Err(CorpusError::InvalidCorpusInput(format!(
            "expected a JSON object at the top level, found {}",
            json_type_name(data)
        )));
    }
    NewsletterData::deserialize(data).map_err(|e| CorpusError::InvalidCorpusInput(e.to_string()))
}

/// Parse and chunk in one step.
pub fn build_corpus(data: &Value, freetext: Option<&str>) -> Result<Vec<Chunk>> {
    let records = parse_records(data)?;
    Ok(build_chunks(&records, freetext))
}

/// Chunk already-parsed records plus optional free text.
pub fn build_chunks(records: &NewsletterData, freetext: Option<&str>) -> Vec<Chunk> {
    let mut chunks = Vec::new();

    if let Some(msg) = &records.director_message {
        let mut text = String::from("Director's Message");
        let from: Vec<&str> = [msg.name.as_deref(), msg.position.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        if !from.is_empty() {
            text.push_str(" from ");
            text.push_str(&from.join(", "));
        }
        text.push(':');
        if let Some(body) = &msg.message {
            text.push(' ');
            text.push_str(body);
        }
        chunks.push(Chunk::new(text, ChunkPayload::DirectorMessage(msg.clone())));
    }

    for month in &records.months {
        chunks.push(Chunk::new(month_text(month), ChunkPayload::Month(month.clone())));
    }

    if let Some(tech) = &records.technical_developments {
        technical_chunks(tech.clone(), &mut chunks);
    }

    for (category, values) in &records.key_performance_indicators {
        let pairs: Vec<String> = values
            .iter()
            .map(|(k, v)| format!("{}: {}", k, value_text(v)))
            .collect();
        chunks.push(Chunk::new(
            format!("{}: {}", category, pairs.join("; ")),
            ChunkPayload::Kpi {
                category: category.clone(),
                values: values.clone(),
            },
        ));
    }

    if let Some(engagement) = &records.state_engagement {
        engagement_chunks(engagement.clone(), &mut chunks);
    }

    if let Some(rvsk) = &records.rvsk_data {
        rvsk_chunks(rvsk.clone(), &mut chunks);
    }

    if let Some(text) = freetext {
        chunks.extend(
            freetext_paragraphs(text)
                .into_iter()
                .map(|p| Chunk::new(p, ChunkPayload::DetailedContext)),
        );
    }

    chunks
}

/// Slice a free-text document into retrievable paragraphs.
pub fn freetext_paragraphs(text: &str) -> Vec<String> {
    let rule = "=".repeat(SECTION_RULE_WIDTH);
    text.split(rule.as_str())
        .map(str::trim)
        .filter(|section| section.chars().count() > MIN_SECTION_CHARS)
        .flat_map(|section| section.split("\n\n"))
        .map(str::trim)
        .filter(|para| para.chars().count() > MIN_PARAGRAPH_CHARS)
        .map(str::to_string)
        .collect()
}

fn month_text(month: &MonthRecord) -> String {
    let mut text = format!("{} newsletter.", month.month);

    let mut stats: Vec<String> = [
        ("Schools", &month.schools),
        ("teachers", &month.teachers),
        ("students", &month.students),
        ("APAAR IDs", &month.apaar_ids),
    ]
    .iter()
    .filter_map(|&(label, v)| v.as_ref().map(|v| format!("{} {}", label, v)))
    .collect();
    if let Some(rate) = &month.attendance_rate {
        stats.push(format!("attendance {}%", rate));
    }
    push_clause(&mut text, None, &stats, ", ");

    push_clause(&mut text, Some("Highlights"), &month.highlights, "; ");
    push_clause(&mut text, Some("Activities"), &month.activities, "; ");

    let events: Vec<String> = month
        .events
        .iter()
        .map(|e| format!("{} on {}: {}", e.name, e.date, e.description))
        .collect();
    push_clause(&mut text, Some("Events"), &events, "; ");

    let states: Vec<String> = month
        .states
        .iter()
        .map(|(state, vals)| {
            let mut parts = Vec::new();
            if let Some(a) = &vals.attendance {
                parts.push(format!("attendance {}%", a));
            }
            if let Some(c) = &vals.apaar_coverage {
                parts.push(format!("APAAR coverage {}%", c));
            }
            if let Some(s) = &vals.schools {
                parts.push(format!("schools {}", s));
            }
            if parts.is_empty() {
                state.clone()
            } else {
                format!("{} {}", state, parts.join(", "))
            }
        })
        .collect();
    push_clause(&mut text, Some("State performance"), &states, ", ");

    text
}

/// Append `" Label: a; b."` when `items` is non-empty.
fn push_clause(text: &mut String, label: Option<&str>, items: &[String], sep: &str) {
    if items.is_empty() {
        return;
    }
    text.push(' ');
    if let Some(label) = label {
        text.push_str(label);
        text.push_str(": ");
    }
    text.push_str(&items.join(sep));
    text.push('.');
}

fn technical_chunks(tech: Sourced<TechnicalDevelopments>, chunks: &mut Vec<Chunk>) {
    if !tech.dashboard_features.is_empty() {
        chunks.push(Chunk::new(
            format!("Dashboard features: {}", tech.dashboard_features.join("; ")),
            ChunkPayload::Technical(tech.clone()),
        ));
    }
    if !tech.infrastructure_upgrades.is_empty() {
        chunks.push(Chunk::new(
            format!("Infrastructure upgrades: {}", tech.infrastructure_upgrades.join("; ")),
            ChunkPayload::Technical(tech.clone()),
        ));
    }
    if !tech.apaar_milestones.is_empty() {
        let milestones: Vec<String> = tech
            .apaar_milestones
            .iter()
            .map(|m| {
                let mut line = format!("{}:", m.month);
                if let Some(r) = &m.registrations {
                    line.push_str(&format!(" {} registrations", r));
                }
                if let Some(s) = &m.states_active {
                    line.push_str(&format!(" across {} states", s));
                }
                line
            })
            .collect();
        chunks.push(Chunk::new(
            format!("APAAR milestones: {}", milestones.join("; ")),
            ChunkPayload::Technical(tech),
        ));
    }
}

fn engagement_chunks(engagement: Sourced<StateEngagement>, chunks: &mut Vec<Chunk>) {
    if let Some(summary) = &engagement.correspondence_summary {
        let parts: Vec<String> = [
            (&summary.total_states_uts, "states/UTs"),
            (&summary.active_participants, "active"),
            (&summary.mou_signed, "MOUs signed"),
            (&summary.implementation_advanced, "with advanced implementation"),
        ]
        .iter()
        .filter_map(|&(v, label)| v.as_ref().map(|v| format!("{} {}", v, label)))
        .collect();
        chunks.push(Chunk::new(
            format!("State engagement: {}", parts.join(", ")),
            ChunkPayload::StateEngagement(engagement.clone()),
        ));
    }

    if !engagement.top_performing_states.is_empty() {
        let states: Vec<String> = engagement
            .top_performing_states
            .iter()
            .map(|s| {
                let metrics: Vec<String> = [
                    ("APAAR", &s.apaar_coverage),
                    ("attendance", &s.attendance),
                    ("digital readiness", &s.digital_readiness),
                ]
                .iter()
                .filter_map(|&(label, v)| v.as_ref().map(|v| format!("{} {}%", label, v)))
                .collect();
                format!("{}: {}", s.name, metrics.join(", "))
            })
            .collect();
        chunks.push(Chunk::new(
            format!("Top performing states: {}", states.join("; ")),
            ChunkPayload::StateEngagement(engagement),
        ));
    }
}

fn rvsk_chunks(rvsk: Sourced<RvskData>, chunks: &mut Vec<Chunk>) {
    let payload = || ChunkPayload::Rvsk(rvsk.clone());

    let mut overview = String::from(
        "Rashtriya Vidya Samiksha Kendra (RVSK) is the centralized national platform at CIET-NCERT",
    );
    if let Some(date) = &rvsk.launch_date {
        overview.push_str(&format!(", launched on {}", date));
    }
    overview.push('.');
    if let Some(progress) = &rvsk.current_progress {
        let parts: Vec<String> = [
            (&progress.states_uts_operationalized, "States/UTs operationalized"),
            (&progress.total_operational_vsks, "operational VSKs"),
            (&progress.schools_connected, "schools connected"),
            (&progress.teachers_linked, "teachers linked"),
            (&progress.students_tracked, "students tracked"),
            (&progress.total_apaar_ids, "total APAAR IDs generated"),
        ]
        .iter()
        .filter_map(|&(v, label)| v.as_ref().map(|v| format!("{} {}", v, label)))
        .collect();
        if !parts.is_empty() {
            overview.push_str(&format!(" Current progress: {}.", parts.join(", ")));
        }
    }
    chunks.push(Chunk::new(overview, payload()));

    if !rvsk.six_a_framework.is_empty() {
        let pillars: Vec<String> = rvsk
            .six_a_framework
            .iter()
            .map(|(k, v)| format!("{}: {}", title_case(k), v.status.as_deref().unwrap_or("")))
            .collect();
        chunks.push(Chunk::new(
            format!("RVSK 6A Educational Data Framework: {}", pillars.join("; ")),
            payload(),
        ));
    }

    if !rvsk.national_programs.is_empty() {
        chunks.push(Chunk::new(
            format!(
                "RVSK supports {} National Programs: {}",
                rvsk.national_programs.len(),
                rvsk.national_programs.join(", ")
            ),
            payload(),
        ));
    }

    if !rvsk.key_highlights.is_empty() {
        chunks.push(Chunk::new(
            format!("RVSK key highlights: {}", rvsk.key_highlights.join("; ")),
            payload(),
        ));
    }

    if let Some(cb) = &rvsk.capacity_building_2025 {
        let mut text = String::from("RVSK Capacity Building Workshop");
        if let Some(date) = &cb.date {
            text.push_str(&format!(", {}", date));
        }
        text.push(':');
        let parts: Vec<String> = [
            (&cb.batches, "batches"),
            (&cb.participants, "participants"),
            (&cb.states_uts_covered, "States/UTs covered"),
        ]
        .iter()
        .filter_map(|&(v, label)| v.as_ref().map(|v| format!("{} {}", v, label)))
        .collect();
        if !parts.is_empty() {
            text.push(' ');
            text.push_str(&parts.join(", "));
            text.push('.');
        }
        if !cb.curriculum.is_empty() {
            text.push_str(&format!(" Curriculum: {}", cb.curriculum.join(", ")));
        }
        chunks.push(Chunk::new(text, payload()));
    }

    for (region, states) in &rvsk.best_practices_by_region {
        if let Value::Object(states) = states {
            let practices: Vec<String> = states
                .iter()
                .map(|(s, practice)| format!("{}: {}", s.replace('_', " "), value_text(practice)))
                .collect();
            chunks.push(Chunk::new(
                format!(
                    "RVSK best practices in {} region: {}",
                    title_case(region),
                    practices.join("; ")
                ),
                payload(),
            ));
        }
    }

    if let Some(dpdp) = &rvsk.dpdp_compliance {
        chunks.push(Chunk::new(
            format!("DPDP Act 2023 compliance for VSKs: {}", dpdp.areas.join("; ")),
            payload(),
        ));
    }

    if let Some(apt) = &rvsk.apaar_for_teachers {
        let mut text = String::from("APAAR for Teachers:");
        if let Some(desc) = &apt.description {
            text.push_str(&format!(" {}.", desc));
        }
        if !apt.benefits.is_empty() {
            text.push_str(&format!(" Benefits: {}", apt.benefits.join("; ")));
        }
        chunks.push(Chunk::new(text, payload()));
    }

    if !rvsk.leadership.is_empty() {
        let leaders: Vec<String> = rvsk
            .leadership
            .iter()
            .map(|(role, v)| describe_leader(role, v))
            .collect();
        chunks.push(Chunk::new(
            format!("RVSK Leadership: {}", leaders.join("; ")),
            payload(),
        ));
        chunks.push(Chunk::new(
            format!(
                "RVSK नेतृत्व leadership निदेशक director संयुक्त निदेशक joint director: {}",
                leaders.join("; ")
            ),
            payload(),
        ));
    }

    let pillars: Vec<String> = SIX_A_PILLARS_HI
        .iter()
        .map(|(en, hi)| format!("{} {}", en, hi))
        .collect();
    chunks.push(Chunk::new(
        format!("6A Framework 6A फ्रेमवर्क छह स्तंभ: {}", pillars.join(", ")),
        payload(),
    ));

    let mut summary = String::from("राष्ट्रीय विद्या समीक्षा केंद्र RVSK VSK विद्या समीक्षा:");
    if let Some(progress) = &rvsk.current_progress {
        let parts: Vec<String> = [
            (&progress.states_uts_operationalized, "राज्य/केंद्र शासित प्रदेश"),
            (&progress.total_operational_vsks, "VSK संचालित"),
            (&progress.schools_connected, "स्कूल जुड़े"),
            (&progress.total_apaar_ids, "APAAR IDs"),
        ]
        .iter()
        .filter_map(|&(v, label)| v.as_ref().map(|v| format!("{} {}", v, label)))
        .collect();
        if !parts.is_empty() {
            summary.push(' ');
            summary.push_str(&parts.join(", "));
            summary.push('.');
        }
    }
    summary.push_str(" स्कूल शिक्षा school education शिक्षा मंत्रालय ministry of education");
    chunks.push(Chunk::new(summary, payload()));
}

/// English and Hindi names of the six 6A framework pillars.
const SIX_A_PILLARS_HI: [(&str, &str); 6] = [
    ("Attendance", "उपस्थिति"),
    ("Assessment", "मूल्यांकन"),
    ("Administration", "प्रशासन"),
    ("Accreditation", "मान्यता"),
    ("Adaptive Learning", "अनुकूली शिक्षा"),
    ("Artificial Intelligence", "कृत्रिम बुद्धिमत्ता"),
];

/// `"Prof. X (Director, NCERT)"` from either a plain name string or an
/// object carrying `name` and `position`.
fn describe_leader(role: &str, value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let name = map.get("name").map(value_text).unwrap_or_default();
            let position = map
                .get("position")
                .map(value_text)
                .unwrap_or_else(|| title_case(role));
            format!("{} ({})", name, position)
        }
        other => format!("{} ({})", value_text(other), title_case(role)),
    }
}

/// Strings render bare; everything else renders as JSON.
pub(crate) fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `"learning_outcomes"` → `"Learning Outcomes"`.
pub fn title_case(key: &str) -> String {
    key.replace('_', " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChunkKind;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "director_message": {
                "name": "Shri Sanjay Kumar",
                "position": "Secretary, DoSEL",
                "message": "Data driven governance is transforming our schools."
            },
            "months": [
                {
                    "month": "April 2025",
                    "schools": 945000,
                    "teachers": 4350000,
                    "students": 111800000,
                    "apaar_ids": 120000000,
                    "attendance_rate": 96.2,
                    "highlights": ["Summer readiness drive"],
                    "events": [{"name": "VSK Conclave", "date": "12 April", "description": "Review meeting"}],
                    "states": {"Kerala": {"attendance": 98.6, "apaar_coverage": 91.0}}
                },
                {"month": "May 2025"}
            ],
            "technical_developments": {
                "dashboard_features": ["Live attendance heatmap"],
                "infrastructure_upgrades": ["Cloud migration"],
                "apaar_milestones": [{"month": "April 2025", "registrations": 120000000, "states_active": 28}]
            },
            "key_performance_indicators": {
                "learning_outcomes": {"foundational_literacy": "78%", "numeracy": "74%"},
                "infrastructure": {"smart_classrooms": 120000}
            },
            "state_engagement": {
                "correspondence_summary": {"total_states_uts": 36, "active_participants": 34, "mou_signed": 30},
                "top_performing_states": [{"name": "Kerala", "apaar_coverage": 95.1, "attendance": 98.6, "digital_readiness": 92}]
            }
        })
    }

    #[test]
    fn test_emission_order() {
        let chunks = build_corpus(&sample(), None).unwrap();
        let kinds: Vec<ChunkKind> = chunks.iter().map(Chunk::kind).collect();
        assert_eq!(
            kinds,
            vec![
                ChunkKind::DirectorMessage,
                ChunkKind::Month,
                ChunkKind::Month,
                ChunkKind::Technical,
                ChunkKind::Technical,
                ChunkKind::Technical,
                ChunkKind::Kpi,
                ChunkKind::Kpi,
                ChunkKind::StateEngagement,
                ChunkKind::StateEngagement,
            ]
        );
        assert_eq!(chunks[6].category(), Some("learning_outcomes"));
        assert_eq!(chunks[7].category(), Some("infrastructure"));
    }

    #[test]
    fn test_month_text_contains_fields() {
        let chunks = build_corpus(&sample(), None).unwrap();
        let text = chunks[1].text();
        assert!(text.starts_with("April 2025 newsletter."));
        assert!(text.contains("Schools 945000"));
        assert!(text.contains("attendance 96.2%"));
        assert!(text.contains("Highlights: Summer readiness drive."));
        assert!(text.contains("VSK Conclave on 12 April: Review meeting"));
        assert!(text.contains("Kerala attendance 98.6%, APAAR coverage 91%"));
    }

    #[test]
    fn test_month_missing_fields_omit_clauses() {
        let chunks = build_corpus(&sample(), None).unwrap();
        assert_eq!(chunks[2].text(), "May 2025 newsletter.");
    }

    #[test]
    fn test_non_object_input_rejected() {
        for bad in [json!([1, 2, 3]), json!("months"), json!(null), json!(42)] {
            let err = build_corpus(&bad, None).unwrap_err();
            assert!(matches!(err, CorpusError::InvalidCorpusInput(_)));
        }
    }

    #[test]
    fn test_wrong_field_type_rejected() {
        let err = build_corpus(&json!({"months": "April"}), None).unwrap_err();
        assert!(matches!(err, CorpusError::InvalidCorpusInput(_)));
    }

    #[test]
    fn test_empty_object_yields_no_chunks() {
        assert!(build_corpus(&json!({}), None).unwrap().is_empty());
    }

    #[test]
    fn test_empty_technical_and_engagement_sections_yield_no_chunks() {
        let data = json!({
            "technical_developments": {"dashboard_features": [], "apaar_milestones": []},
            "state_engagement": {}
        });
        assert!(build_corpus(&data, None).unwrap().is_empty());
    }

    #[test]
    fn test_freetext_filters_short_sections_and_paragraphs() {
        let rule = "=".repeat(SECTION_RULE_WIDTH);
        let long_para = "The Vidya Samiksha Kendra aggregates attendance from every state portal daily.";
        let other_para = "Teachers receive weekly dashboards summarising learning outcome assessments.";
        let doc = format!(
            "Short intro\n{rule}\n{long_para}\n\ntiny\n\n{other_para}\n{rule}\nshort section"
        );
        let paras = freetext_paragraphs(&doc);
        assert_eq!(paras, vec![long_para.to_string(), other_para.to_string()]);
    }

    #[test]
    fn test_freetext_chunks_follow_records() {
        let doc = format!(
            "{}\n\n{}",
            "A".repeat(60),
            "Second paragraph long enough to pass the fifty character noise threshold."
        );
        let chunks = build_corpus(&sample(), Some(&doc)).unwrap();
        let tail: Vec<ChunkKind> = chunks.iter().rev().take(2).map(Chunk::kind).collect();
        assert_eq!(tail, vec![ChunkKind::DetailedContext, ChunkKind::DetailedContext]);
    }

    #[test]
    fn test_rvsk_chunks() {
        let data = json!({
            "rvsk_data": {
                "launch_date": "March 9, 2023",
                "current_progress": {"states_uts_operationalized": 35, "schools_connected": "11.51 Lakh"},
                "six_a_framework": {"adaptive_learning": {"status": "Piloting"}},
                "national_programs": ["PM POSHAN", "Samagra Shiksha"],
                "best_practices_by_region": {
                    "north_east": {"assam": "Gunotsav assessments"},
                    "ignored": "not a mapping"
                },
                "leadership": {"director": {"name": "Prof. D. P. Saklani", "position": "Director, NCERT"}}
            }
        });
        let chunks = build_corpus(&data, None).unwrap();
        assert!(chunks.iter().all(|c| c.kind() == ChunkKind::Rvsk));
        let texts: Vec<&str> = chunks.iter().map(Chunk::text).collect();
        assert!(texts[0].contains("launched on March 9, 2023"));
        assert!(texts[0].contains("11.51 Lakh schools connected"));
        assert!(texts.iter().any(|t| t.contains("Adaptive Learning: Piloting")));
        assert!(texts.iter().any(|t| t.contains("RVSK supports 2 National Programs")));
        assert!(texts.iter().any(|t| t.contains("North East region: assam: Gunotsav")));
        assert!(texts.iter().any(|t| t.contains("Prof. D. P. Saklani (Director, NCERT)")));
        assert_eq!(texts.iter().filter(|t| t.contains("best practices")).count(), 1);

        let n = texts.len();
        assert!(texts[n - 4].starts_with("RVSK Leadership:"));
        assert!(texts[n - 3].starts_with("RVSK नेतृत्व"));
        assert!(texts[n - 3].contains("Prof. D. P. Saklani (Director, NCERT)"));
        assert!(texts[n - 2].contains("Attendance उपस्थिति"));
        assert!(texts[n - 2].contains("Artificial Intelligence कृत्रिम बुद्धिमत्ता"));
        assert!(texts[n - 1].starts_with("राष्ट्रीय विद्या समीक्षा केंद्र"));
        assert!(texts[n - 1].contains("35 राज्य/केंद्र शासित प्रदेश"));
        assert!(texts[n - 1].contains("11.51 Lakh स्कूल जुड़े"));
    }

    #[test]
    fn test_rvsk_bilingual_chunks_without_leadership_or_progress() {
        let chunks = build_corpus(&json!({"rvsk_data": {}}), None).unwrap();
        let texts: Vec<&str> = chunks.iter().map(Chunk::text).collect();
        assert_eq!(texts.len(), 3);
        assert!(texts[1].starts_with("6A Framework"));
        assert_eq!(
            texts[2],
            "राष्ट्रीय विद्या समीक्षा केंद्र RVSK VSK विद्या समीक्षा: स्कूल शिक्षा school education शिक्षा मंत्रालय ministry of education"
        );
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("learning_outcomes"), "Learning Outcomes");
        assert_eq!(title_case("APAAR_ids"), "Apaar Ids");
    }
}
