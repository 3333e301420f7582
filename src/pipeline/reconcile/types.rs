//! Core types for the reconciliation pipeline.
//!
//! These types model the lifecycle of one analysis run:
//! RawFinding (LLM output, untrusted) → dedup → date resolution → Finding.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ═══════════════════════════════════════════
// Reception number
// ═══════════════════════════════════════════

/// Opaque patient/visit identifier. The model emits either a JSON string or
/// a JSON number; both are kept as given and stringified only for display
/// and export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ReceptionNumber {
    Number(serde_json::Number),
    Text(String),
}

impl ReceptionNumber {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Text(s) if s.is_empty())
    }
}

impl Default for ReceptionNumber {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl std::fmt::Display for ReceptionNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ReceptionNumber {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<u64> for ReceptionNumber {
    fn from(n: u64) -> Self {
        Self::Number(n.into())
    }
}

// ═══════════════════════════════════════════
// RawFinding (output of the analysis capability)
// ═══════════════════════════════════════════

/// One finding as returned by a single analysis pass.
///
/// Every field is optional on the wire: missing keys and `null` both
/// deserialize to an empty value, so a sparse model answer never fails the
/// whole pass.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFinding {
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: String,
    #[serde(default, deserialize_with = "lenient_reception_number")]
    pub reception_number: ReceptionNumber,
    /// Category label. Passed through as-is; see [`FindingKind`].
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub finding_type: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub excerpt: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub summary: String,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    })
}

fn lenient_reception_number<'de, D>(deserializer: D) -> Result<ReceptionNumber, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => ReceptionNumber::default(),
        Some(Value::Number(n)) => ReceptionNumber::Number(n),
        Some(Value::String(s)) => ReceptionNumber::Text(s),
        Some(other) => ReceptionNumber::Text(other.to_string()),
    })
}

// ═══════════════════════════════════════════
// Finding (terminal artifact)
// ═══════════════════════════════════════════

/// A reconciled finding. Same shape as [`RawFinding`], but `date` holds
/// either a canonical `YYYY/MM/DD` value or the configured placeholder.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub date: String,
    pub reception_number: ReceptionNumber,
    #[serde(rename = "type")]
    pub finding_type: String,
    pub excerpt: String,
    pub summary: String,
}

impl Finding {
    /// Build the final record from a raw finding and its resolved date.
    pub fn from_raw(raw: RawFinding, date: String) -> Self {
        Self {
            date,
            reception_number: raw.reception_number,
            finding_type: raw.finding_type,
            excerpt: raw.excerpt,
            summary: raw.summary,
        }
    }

    pub fn kind(&self) -> FindingKind {
        FindingKind::classify(&self.finding_type)
    }
}

// ═══════════════════════════════════════════
// Display classification
// ═══════════════════════════════════════════

/// Display grouping for a finding's `type` label.
///
/// Classification is permissive: anything that is not recognisably a
/// rally is shown with monologue styling. The stored label is never
/// rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FindingKind {
    Rally,
    Monologue,
}

impl FindingKind {
    pub fn classify(label: &str) -> Self {
        match label.trim() {
            "ラリー" | "rally" | "dialogue-exchange" => Self::Rally,
            _ => Self::Monologue,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rally => "rally",
            Self::Monologue => "monologue",
        }
    }
}

impl std::fmt::Display for FindingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
