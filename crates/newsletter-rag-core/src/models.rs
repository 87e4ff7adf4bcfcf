//! Newsletter record schema and the retrievable [`Chunk`] type.
//!
//! The JSON records are loosely shaped: every section is optional and most
//! fields inside a record may be missing. Each record type therefore
//! defaults every field, and carries any keys it does not know about in an
//! `extra` map so that the structured payload handed back with a search hit
//! is the record as it appeared in the source file.
//!
//! Mapping-shaped sections whose key order is meaningful (per-state stats,
//! KPI categories, regional best practices, ...) are held as ordered
//! `(key, value)` pairs rather than a sorted map.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde::de::{DeserializeOwned, Error as _};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// A numeric-looking field. Source files mix integers, decimals and
/// pre-formatted strings such as `"11.51 Lakh"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Metric {
    Count(i64),
    Ratio(f64),
    Text(String),
}

impl Metric {
    /// Render with thousands separators for counts (`945000` → `945,000`).
    pub fn grouped(&self) -> String {
        match self {
            Metric::Count(n) => group_thousands(*n),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Count(n) => write!(f, "{}", n),
            Metric::Ratio(r) => write!(f, "{}", r),
            Metric::Text(s) => f.write_str(s),
        }
    }
}

fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// The whole structured source: one file, all sections optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsletterData {
    #[serde(deserialize_with = "nullable")]
    pub months: Vec<Sourced<MonthRecord>>,
    pub director_message: Option<Sourced<DirectorMessage>>,
    pub technical_developments: Option<Sourced<TechnicalDevelopments>>,
    #[serde(with = "ordered_pairs", skip_serializing_if = "Vec::is_empty")]
    pub key_performance_indicators: Vec<(String, Map<String, Value>)>,
    pub state_engagement: Option<Sourced<StateEngagement>>,
    pub rvsk_data: Option<Sourced<RvskData>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One newsletter month.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonthRecord {
    pub month: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schools: Option<Metric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teachers: Option<Metric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub students: Option<Metric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apaar_ids: Option<Metric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendance_rate: Option<Metric>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub highlights: Vec<String>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub activities: Vec<String>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<EventRecord>,
    #[serde(with = "ordered_pairs", skip_serializing_if = "Vec::is_empty")]
    pub states: Vec<(String, StateStats)>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EventRecord {
    pub name: String,
    pub date: String,
    pub description: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StateStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendance: Option<Metric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apaar_coverage: Option<Metric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schools: Option<Metric>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectorMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TechnicalDevelopments {
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub dashboard_features: Vec<String>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub infrastructure_upgrades: Vec<String>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub apaar_milestones: Vec<Milestone>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Milestone {
    pub month: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrations: Option<Metric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub states_active: Option<Metric>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StateEngagement {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correspondence_summary: Option<CorrespondenceSummary>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub top_performing_states: Vec<TopState>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrespondenceSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_states_uts: Option<Metric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_participants: Option<Metric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mou_signed: Option<Metric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implementation_advanced: Option<Metric>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TopState {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apaar_coverage: Option<Metric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendance: Option<Metric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digital_readiness: Option<Metric>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Rashtriya Vidya Samiksha Kendra programme data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RvskData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launch_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_progress: Option<RvskProgress>,
    #[serde(with = "ordered_pairs", skip_serializing_if = "Vec::is_empty")]
    pub six_a_framework: Vec<(String, SixAPillar)>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub national_programs: Vec<String>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub key_highlights: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity_building_2025: Option<CapacityBuilding>,
    #[serde(with = "ordered_pairs", skip_serializing_if = "Vec::is_empty")]
    pub best_practices_by_region: Vec<(String, Value)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dpdp_compliance: Option<DpdpCompliance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apaar_for_teachers: Option<ApaarForTeachers>,
    #[serde(with = "ordered_pairs", skip_serializing_if = "Vec::is_empty")]
    pub leadership: Vec<(String, Value)>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RvskProgress {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub states_uts_operationalized: Option<Metric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_operational_vsks: Option<Metric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schools_connected: Option<Metric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teachers_linked: Option<Metric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub students_tracked: Option<Metric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_apaar_ids: Option<Metric>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SixAPillar {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacityBuilding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batches: Option<Metric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participants: Option<Metric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub states_uts_covered: Option<Metric>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub curriculum: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DpdpCompliance {
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub areas: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApaarForTeachers {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub benefits: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A typed record together with the JSON object it was parsed from.
///
/// Derefs to the typed view. Serializes as the source object, so keys keep
/// their file order and `null` or empty fields come back as they were.
#[derive(Debug, Clone)]
pub struct Sourced<T> {
    record: Arc<T>,
    source: Arc<Map<String, Value>>,
}

impl<T> Sourced<T> {
    pub fn source(&self) -> &Map<String, Value> {
        &self.source
    }
}

impl<T: DeserializeOwned> Sourced<T> {
    pub fn from_source(source: Map<String, Value>) -> serde_json::Result<Self> {
        let record = serde_json::from_value(Value::Object(source.clone()))?;
        Ok(Self {
            record: Arc::new(record),
            source: Arc::new(source),
        })
    }
}

impl<T> Deref for Sourced<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.record
    }
}

impl<T> Serialize for Sourced<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.source.serialize(serializer)
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Sourced<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = Map::<String, Value>::deserialize(deserializer)?;
        Sourced::from_source(source).map_err(D::Error::custom)
    }
}

/// Treat an explicit JSON `null` like a missing field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// (De)serialize a JSON object as `(key, value)` pairs in file order.
mod ordered_pairs {
    use serde::de::{DeserializeOwned, Error as _};
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::{Map, Value};

    pub fn serialize<S, T>(pairs: &[(String, T)], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        let mut map = serializer.serialize_map(Some(pairs.len()))?;
        for (k, v) in pairs {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Vec<(String, T)>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let map = Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default();
        map.into_iter()
            .map(|(k, v)| {
                serde_json::from_value(v)
                    .map(|t| (k.clone(), t))
                    .map_err(|e| D::Error::custom(format!("{}: {}", k, e)))
            })
            .collect()
    }
}

/// The closed set of chunk types. Drives provenance and answer formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    Month,
    DirectorMessage,
    Technical,
    Kpi,
    StateEngagement,
    Rvsk,
    DetailedContext,
}

impl ChunkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkKind::Month => "month",
            ChunkKind::DirectorMessage => "director_message",
            ChunkKind::Technical => "technical",
            ChunkKind::Kpi => "kpi",
            ChunkKind::StateEngagement => "state_engagement",
            ChunkKind::Rvsk => "rvsk",
            ChunkKind::DetailedContext => "detailed_context",
        }
    }
}

impl fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The structured record a chunk was rendered from.
///
/// Sections that produce several chunks (technical developments, state
/// engagement, RVSK) share one record; [`Sourced`] clones are cheap.
#[derive(Debug, Clone)]
pub enum ChunkPayload {
    Month(Sourced<MonthRecord>),
    DirectorMessage(Sourced<DirectorMessage>),
    Technical(Sourced<TechnicalDevelopments>),
    Kpi {
        category: String,
        values: Map<String, Value>,
    },
    StateEngagement(Sourced<StateEngagement>),
    Rvsk(Sourced<RvskData>),
    DetailedContext,
}

impl ChunkPayload {
    pub fn kind(&self) -> ChunkKind {
        match self {
            ChunkPayload::Month(_) => ChunkKind::Month,
            ChunkPayload::DirectorMessage(_) => ChunkKind::DirectorMessage,
            ChunkPayload::Technical(_) => ChunkKind::Technical,
            ChunkPayload::Kpi { .. } => ChunkKind::Kpi,
            ChunkPayload::StateEngagement(_) => ChunkKind::StateEngagement,
            ChunkPayload::Rvsk(_) => ChunkKind::Rvsk,
            ChunkPayload::DetailedContext => ChunkKind::DetailedContext,
        }
    }
}

impl Serialize for ChunkPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ChunkPayload::Month(m) => m.serialize(serializer),
            ChunkPayload::DirectorMessage(d) => d.serialize(serializer),
            ChunkPayload::Technical(t) => t.serialize(serializer),
            ChunkPayload::Kpi { values, .. } => values.serialize(serializer),
            ChunkPayload::StateEngagement(e) => e.serialize(serializer),
            ChunkPayload::Rvsk(r) => r.serialize(serializer),
            ChunkPayload::DetailedContext => Map::new().serialize(serializer),
        }
    }
}

/// One retrievable unit: rendered text plus the record it came from.
///
/// The text is fixed when the chunk is built; the TF-IDF matrix is fitted
/// against exactly this text, so there is no way to change it afterwards.
#[derive(Debug, Clone)]
pub struct Chunk {
    text: String,
    payload: ChunkPayload,
}

impl Chunk {
    pub(crate) fn new(text: impl Into<String>, payload: ChunkPayload) -> Self {
        Self {
            text: text.into(),
            payload,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn kind(&self) -> ChunkKind {
        self.payload.kind()
    }

    /// KPI sub-group name; `None` for every other kind.
    pub fn category(&self) -> Option<&str> {
        match &self.payload {
            ChunkPayload::Kpi { category, .. } => Some(category),
            _ => None,
        }
    }

    pub fn payload(&self) -> &ChunkPayload {
        &self.payload
    }

    /// The originating record as a JSON value.
    pub fn structured_payload(&self) -> Value {
        serde_json::to_value(&self.payload).unwrap_or_else(|_| Value::Object(Map::new()))
    }
}

impl Serialize for Chunk {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Chunk", 4)?;
        state.serialize_field("text", &self.text)?;
        state.serialize_field("kind", &self.kind())?;
        match self.category() {
            Some(category) => state.serialize_field("category", category)?,
            None => state.skip_field("category")?,
        }
        state.serialize_field("structured_payload", &self.payload)?;
        state.end()
    }
}
