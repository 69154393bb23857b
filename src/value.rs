use core::fmt;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Answers keyed by field id, owned by the host's input layer.
pub type Answers = HashMap<String, AnswerValue>;

/// Reference to an uploaded file. The upload itself happens out of band;
/// only the metadata needed for validation travels with the answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl FileRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: None,
            mime_type: None,
            url: None,
        }
    }
}

// 回答値
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    #[default]
    Null,
    Boolean(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
    Files(Vec<FileRef>),
}

impl AnswerValue {
    pub fn text(s: impl Into<String>) -> Self {
        AnswerValue::Text(s.into())
    }

    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AnswerValue::List(items.into_iter().map(Into::into).collect())
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, AnswerValue::List(_) | AnswerValue::Files(_))
    }

    /// Empty means null, the empty string, or an empty sequence.
    pub fn is_empty(&self) -> bool {
        match self {
            AnswerValue::Null => true,
            AnswerValue::Text(s) => s.is_empty(),
            AnswerValue::List(items) => items.is_empty(),
            AnswerValue::Files(files) => files.is_empty(),
            AnswerValue::Boolean(_) | AnswerValue::Number(_) => false,
        }
    }

    /// Numeric coercion. Anything that is not a number or a numeric string is `NaN`.
    pub fn as_number(&self) -> f64 {
        match self {
            AnswerValue::Number(n) => *n,
            AnswerValue::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            AnswerValue::Text(s) => parse_number(s),
            AnswerValue::Null | AnswerValue::List(_) | AnswerValue::Files(_) => f64::NAN,
        }
    }

    /// String form used by substring and loose equality tests.
    pub fn to_loose_string(&self) -> String {
        match self {
            AnswerValue::Null => String::new(),
            AnswerValue::Boolean(b) => b.to_string(),
            AnswerValue::Number(n) => format_number(*n),
            AnswerValue::Text(s) => s.clone(),
            AnswerValue::List(items) => items.join(","),
            AnswerValue::Files(files) => files
                .iter()
                .map(|f| f.name.as_str())
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

impl fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AnswerValue::Text(s) => write!(f, "{}", s),
            _ => write!(f, "{}", self.to_loose_string()),
        }
    }
}

impl From<&str> for AnswerValue {
    fn from(s: &str) -> Self {
        AnswerValue::Text(s.to_string())
    }
}

impl From<String> for AnswerValue {
    fn from(s: String) -> Self {
        AnswerValue::Text(s)
    }
}

impl From<bool> for AnswerValue {
    fn from(b: bool) -> Self {
        AnswerValue::Boolean(b)
    }
}

impl From<f64> for AnswerValue {
    fn from(n: f64) -> Self {
        AnswerValue::Number(n)
    }
}

impl From<i64> for AnswerValue {
    fn from(n: i64) -> Self {
        AnswerValue::Number(n as f64)
    }
}

impl From<Vec<String>> for AnswerValue {
    fn from(items: Vec<String>) -> Self {
        AnswerValue::List(items)
    }
}

impl From<Vec<FileRef>> for AnswerValue {
    fn from(files: Vec<FileRef>) -> Self {
        AnswerValue::Files(files)
    }
}

/// Parses a trimmed decimal literal. Blank strings and words such as
/// `inf` or `NaN` do not count as numbers.
pub fn parse_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty()
        || !trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
    {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

pub fn format_number(n: f64) -> String {
    format!("{}", n)
}

/// Numeric coercion of a literal taken from a rule definition.
pub fn json_number(value: &serde_json::Value) -> f64 {
    match value {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        serde_json::Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        serde_json::Value::String(s) => parse_number(s),
        _ => f64::NAN,
    }
}

/// String form of a literal taken from a rule definition.
pub fn json_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.as_f64().map(format_number).unwrap_or_default(),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(json_string)
            .collect::<Vec<_>>()
            .join(","),
        serde_json::Value::Object(_) => "[object Object]".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_value_deserialize_shapes() {
        let answers: Answers = serde_json::from_str(
            r#"{
                "name": "Ada",
                "age": 36,
                "consent": true,
                "skills": ["rust", "go"],
                "empty": [],
                "resume": [{"name": "cv.pdf", "size": 1024, "mimeType": "application/pdf"}],
                "missing": null
            }"#,
        )
        .unwrap();

        assert_eq!(answers["name"], AnswerValue::text("Ada"));
        assert_eq!(answers["age"], AnswerValue::Number(36.0));
        assert_eq!(answers["consent"], AnswerValue::Boolean(true));
        assert_eq!(answers["skills"], AnswerValue::list(["rust", "go"]));
        assert_eq!(answers["empty"], AnswerValue::List(vec![]));
        assert!(matches!(&answers["resume"], AnswerValue::Files(files) if files[0].size == Some(1024)));
        assert_eq!(answers["missing"], AnswerValue::Null);
    }

    #[test]
    fn test_emptiness() {
        assert!(AnswerValue::Null.is_empty());
        assert!(AnswerValue::text("").is_empty());
        assert!(AnswerValue::List(vec![]).is_empty());
        assert!(!AnswerValue::text(" ").is_empty());
        assert!(!AnswerValue::Number(0.0).is_empty());
        assert!(!AnswerValue::Boolean(false).is_empty());
    }

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(AnswerValue::text(" 42 ").as_number(), 42.0);
        assert_eq!(AnswerValue::text("-1.5e2").as_number(), -150.0);
        assert!(AnswerValue::text("").as_number().is_nan());
        assert!(AnswerValue::text("inf").as_number().is_nan());
        assert!(AnswerValue::text("12abc").as_number().is_nan());
        assert!(AnswerValue::Null.as_number().is_nan());
        assert_eq!(AnswerValue::Boolean(true).as_number(), 1.0);
    }

    #[test]
    fn test_loose_strings() {
        assert_eq!(AnswerValue::Number(5.0).to_loose_string(), "5");
        assert_eq!(AnswerValue::Number(2.5).to_loose_string(), "2.5");
        assert_eq!(AnswerValue::list(["a", "b"]).to_loose_string(), "a,b");
        assert_eq!(json_string(&serde_json::json!(10)), "10");
        assert_eq!(json_string(&serde_json::json!(["x", 1])), "x,1");
    }
}
