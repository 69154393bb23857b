use serde::{Deserialize, Serialize};

/// User-facing validation messages. Hosts override entries to localise.
///
/// Templates use `{min}`, `{max}` and `{value}` placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MessageCatalog {
    pub required: String,
    pub invalid_email: String,
    pub select_at_least_one: String,
    pub invalid_number: String,
    pub invalid_date: String,
    pub future_date: String,
    pub invalid_option: String,
    pub must_agree: String,
    pub file_required: String,
    pub unexpected_type: String,
    pub pattern_mismatch: String,
    pub min_length: String,
    pub max_length: String,
    pub min_value: String,
    pub max_value: String,
    pub min_date: String,
    pub max_date: String,
    pub too_many_files: String,
    pub file_too_large: String,
    pub file_type_not_accepted: String,
}

impl Default for MessageCatalog {
    fn default() -> Self {
        Self {
            required: "this field is required".to_string(),
            invalid_email: "please enter a valid email address".to_string(),
            select_at_least_one: "select at least one".to_string(),
            invalid_number: "please enter a valid number".to_string(),
            invalid_date: "please enter a valid date".to_string(),
            future_date: "date cannot be in the future".to_string(),
            invalid_option: "please select a valid option".to_string(),
            must_agree: "you must check this box to continue".to_string(),
            file_required: "please upload at least one file".to_string(),
            unexpected_type: "unexpected value type".to_string(),
            pattern_mismatch: "invalid format".to_string(),
            min_length: "must be at least {min} characters".to_string(),
            max_length: "must be at most {max} characters".to_string(),
            min_value: "must be at least {min}".to_string(),
            max_value: "must be at most {max}".to_string(),
            min_date: "date must be on or after {min}".to_string(),
            max_date: "date must be on or before {max}".to_string(),
            too_many_files: "upload at most {max} files".to_string(),
            file_too_large: "{value} exceeds the maximum size of {max} bytes".to_string(),
            file_type_not_accepted: "{value} is not an accepted file type".to_string(),
        }
    }
}

/// Fills `{min}`, `{max}` and `{value}` in a message template.
pub fn render(template: &str, min: Option<&str>, max: Option<&str>, value: Option<&str>) -> String {
    let mut out = template.to_string();
    if let Some(min) = min {
        out = out.replace("{min}", min);
    }
    if let Some(max) = max {
        out = out.replace("{max}", max);
    }
    if let Some(value) = value {
        out = out.replace("{value}", value);
    }
    out
}
