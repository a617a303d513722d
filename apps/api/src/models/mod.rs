//! Shared record types passed between extraction, scoring and tailoring.
//!
//! Model output is untrusted: the `lenient` deserializers accept the loose shapes
//! models tend to return (numbers for strings, a single string for a list) and
//! normalize them at the boundary instead of failing the whole payload.

pub mod facts;
pub mod resume;

pub use facts::{CandidateFacts, ContactBlock, EducationEntry, ExperienceEntry};
pub use resume::{MissingKeyword, ResumeDoc, RiskReport, SkillLists, StudyItem};

pub(crate) mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn value_to_string(v: Value) -> Option<String> {
        match v {
            Value::String(s) => {
                let t = s.trim();
                (!t.is_empty()).then(|| t.to_string())
            }
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// `null`, missing, empty or whitespace-only strings become `None`.
    pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = Option::<Value>::deserialize(deserializer)?;
        Ok(v.and_then(value_to_string))
    }

    /// Accepts an array of scalars or a single string; drops nulls and blanks.
    pub fn string_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = Option::<Value>::deserialize(deserializer)?;
        Ok(match v {
            Some(Value::Array(items)) => items.into_iter().filter_map(value_to_string).collect(),
            Some(other) => value_to_string(other).into_iter().collect(),
            None => Vec::new(),
        })
    }

    /// Numbers, or numeric strings like "7" / "7.5"; anything else is `None`.
    pub fn opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = Option::<Value>::deserialize(deserializer)?;
        Ok(match v {
            Some(Value::Number(n)) => n.as_f64().filter(|f| f.is_finite()),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            _ => None,
        })
    }

    /// Arrays whose malformed elements are skipped rather than failing the parent.
    pub fn vec_skip_invalid<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: serde::de::DeserializeOwned,
    {
        let v = Option::<Value>::deserialize(deserializer)?;
        Ok(match v {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
            _ => Vec::new(),
        })
    }
}
