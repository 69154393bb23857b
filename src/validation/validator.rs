use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;

use super::messages::{render, MessageCatalog};
use crate::value::{format_number, parse_number, AnswerValue, FileRef};

/// `Ok(())` or the single message of the first failing check.
pub type ValidationResult = Result<(), String>;

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$")
            .expect("email pattern is valid");
}

/// Parses `YYYY-MM-DD`, RFC 3339 timestamps and `YYYY-MM-DDTHH:MM` (the
/// shape browsers send for local date-time inputs).
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M")
                .ok()
                .map(|dt| dt.date())
        })
}

pub fn is_valid_email(s: &str) -> bool {
    EMAIL_RE.is_match(s)
}

#[derive(Debug, Clone)]
pub struct TextRules {
    pub required: bool,
    pub email: bool,
    pub pattern: Option<Regex>,
    pub pattern_message: Option<String>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct FileRules {
    pub required: bool,
    pub max_files: Option<usize>,
    pub max_file_size_bytes: Option<u64>,
    pub accepted_file_types: Option<Vec<String>>,
}

/// Compiled shape of one field's checks.
#[derive(Debug, Clone)]
pub enum ValidatorKind {
    /// Hidden fields: every input passes, absence included.
    Permissive,
    Text(TextRules),
    Number {
        required: bool,
        min: Option<f64>,
        max: Option<f64>,
    },
    Date {
        required: bool,
        min: Option<NaiveDate>,
        max: Option<NaiveDate>,
        disallow_future: bool,
        /// Pinned reference date; `None` reads the UTC date at validation time.
        today: Option<NaiveDate>,
    },
    /// select / radio
    Choice {
        required: bool,
        allowed: Option<Vec<String>>,
    },
    /// multiselect / checkbox with options
    MultiChoice {
        required: bool,
        allowed: Option<Vec<String>>,
    },
    /// checkbox without options
    Agreement { required: bool, must_be_true: bool },
    Files(FileRules),
}

#[derive(Debug, Clone)]
pub struct FieldValidator {
    field_id: String,
    kind: ValidatorKind,
    messages: Arc<MessageCatalog>,
}

impl FieldValidator {
    pub fn new(field_id: impl Into<String>, kind: ValidatorKind, messages: Arc<MessageCatalog>) -> Self {
        Self {
            field_id: field_id.into(),
            kind,
            messages,
        }
    }

    pub fn field_id(&self) -> &str {
        &self.field_id
    }

    pub fn kind(&self) -> &ValidatorKind {
        &self.kind
    }

    pub fn is_permissive(&self) -> bool {
        matches!(self.kind, ValidatorKind::Permissive)
    }

    pub fn validate(&self, value: Option<&AnswerValue>) -> ValidationResult {
        // absent and explicit null are the same thing for every kind
        let value = value.filter(|v| !matches!(v, AnswerValue::Null));
        match &self.kind {
            ValidatorKind::Permissive => Ok(()),
            ValidatorKind::Text(rules) => self.validate_text(rules, value),
            ValidatorKind::Number { required, min, max } => {
                self.validate_number(*required, *min, *max, value)
            }
            ValidatorKind::Date {
                required,
                min,
                max,
                disallow_future,
                today,
            } => self.validate_date(*required, *min, *max, *disallow_future, *today, value),
            ValidatorKind::Choice { required, allowed } => {
                self.validate_choice(*required, allowed.as_deref(), value)
            }
            ValidatorKind::MultiChoice { required, allowed } => {
                self.validate_multi_choice(*required, allowed.as_deref(), value)
            }
            ValidatorKind::Agreement {
                required,
                must_be_true,
            } => self.validate_agreement(*required, *must_be_true, value),
            ValidatorKind::Files(rules) => self.validate_files(rules, value),
        }
    }

    fn fail(&self, message: &str) -> ValidationResult {
        Err(message.to_string())
    }

    fn validate_text(&self, rules: &TextRules, value: Option<&AnswerValue>) -> ValidationResult {
        let text = match value {
            None => "",
            Some(AnswerValue::Text(s)) => s.as_str(),
            Some(_) => return self.fail(&self.messages.unexpected_type),
        };
        if text.is_empty() {
            return if rules.required {
                self.fail(&self.messages.required)
            } else {
                Ok(())
            };
        }

        if rules.email && !is_valid_email(text) {
            return self.fail(&self.messages.invalid_email);
        }
        if let Some(pattern) = &rules.pattern {
            if !pattern.is_match(text) {
                return self.fail(
                    rules
                        .pattern_message
                        .as_deref()
                        .unwrap_or(&self.messages.pattern_mismatch),
                );
            }
        }
        let length = text.chars().count();
        if let Some(min) = rules.min_length {
            if length < min {
                return Err(render(&self.messages.min_length, Some(&min.to_string()), None, None));
            }
        }
        if let Some(max) = rules.max_length {
            if length > max {
                return Err(render(&self.messages.max_length, None, Some(&max.to_string()), None));
            }
        }
        Ok(())
    }

    fn validate_number(
        &self,
        required: bool,
        min: Option<f64>,
        max: Option<f64>,
        value: Option<&AnswerValue>,
    ) -> ValidationResult {
        let number = match value {
            None => None,
            Some(AnswerValue::Text(s)) if s.trim().is_empty() => None,
            Some(AnswerValue::Text(s)) => Some(parse_number(s)),
            Some(AnswerValue::Number(n)) => Some(*n),
            Some(_) => return self.fail(&self.messages.invalid_number),
        };
        let Some(number) = number else {
            return if required {
                self.fail(&self.messages.required)
            } else {
                Ok(())
            };
        };
        if !number.is_finite() {
            return self.fail(&self.messages.invalid_number);
        }
        if let Some(min) = min {
            if number < min {
                return Err(render(&self.messages.min_value, Some(&format_number(min)), None, None));
            }
        }
        if let Some(max) = max {
            if number > max {
                return Err(render(&self.messages.max_value, None, Some(&format_number(max)), None));
            }
        }
        Ok(())
    }

    fn validate_date(
        &self,
        required: bool,
        min: Option<NaiveDate>,
        max: Option<NaiveDate>,
        disallow_future: bool,
        today: Option<NaiveDate>,
        value: Option<&AnswerValue>,
    ) -> ValidationResult {
        let text = match value {
            None => "",
            Some(AnswerValue::Text(s)) => s.trim(),
            Some(_) => return self.fail(&self.messages.invalid_date),
        };
        if text.is_empty() {
            return if required {
                self.fail(&self.messages.required)
            } else {
                Ok(())
            };
        }
        let Some(date) = parse_date(text) else {
            return self.fail(&self.messages.invalid_date);
        };
        if let Some(min) = min {
            if date < min {
                let min = min.format("%Y-%m-%d").to_string();
                return Err(render(&self.messages.min_date, Some(&min), None, None));
            }
        }
        if let Some(max) = max {
            if date > max {
                let max = max.format("%Y-%m-%d").to_string();
                return Err(render(&self.messages.max_date, None, Some(&max), None));
            }
        }
        if disallow_future && date > today.unwrap_or_else(|| Utc::now().date_naive()) {
            return self.fail(&self.messages.future_date);
        }
        Ok(())
    }

    fn validate_choice(
        &self,
        required: bool,
        allowed: Option<&[String]>,
        value: Option<&AnswerValue>,
    ) -> ValidationResult {
        let choice = match value {
            None => "",
            Some(AnswerValue::Text(s)) => s.as_str(),
            Some(_) => return self.fail(&self.messages.invalid_option),
        };
        if choice.is_empty() {
            return if required {
                self.fail(&self.messages.required)
            } else {
                Ok(())
            };
        }
        match allowed {
            Some(allowed) if !allowed.iter().any(|a| a == choice) => {
                self.fail(&self.messages.invalid_option)
            }
            _ => Ok(()),
        }
    }

    fn validate_multi_choice(
        &self,
        required: bool,
        allowed: Option<&[String]>,
        value: Option<&AnswerValue>,
    ) -> ValidationResult {
        let selected: &[String] = match value {
            None => &[],
            Some(AnswerValue::List(items)) => items,
            Some(AnswerValue::Text(s)) if s.is_empty() => &[],
            Some(_) => return self.fail(&self.messages.unexpected_type),
        };
        if selected.is_empty() {
            return if required {
                self.fail(&self.messages.select_at_least_one)
            } else {
                Ok(())
            };
        }
        if let Some(allowed) = allowed {
            if selected.iter().any(|s| !allowed.contains(s)) {
                return self.fail(&self.messages.invalid_option);
            }
        }
        Ok(())
    }

    fn validate_agreement(
        &self,
        required: bool,
        must_be_true: bool,
        value: Option<&AnswerValue>,
    ) -> ValidationResult {
        match value {
            Some(AnswerValue::Boolean(true)) => Ok(()),
            Some(AnswerValue::Boolean(false)) if required || must_be_true => {
                self.fail(&self.messages.must_agree)
            }
            Some(AnswerValue::Boolean(false)) => Ok(()),
            None if required => self.fail(&self.messages.must_agree),
            None => Ok(()),
            Some(_) => self.fail(&self.messages.unexpected_type),
        }
    }

    fn validate_files(&self, rules: &FileRules, value: Option<&AnswerValue>) -> ValidationResult {
        let files: &[FileRef] = match value {
            None => &[],
            Some(AnswerValue::Files(files)) => files,
            // `[]` deserializes as an empty list
            Some(AnswerValue::List(items)) if items.is_empty() => &[],
            Some(_) => return self.fail(&self.messages.unexpected_type),
        };
        if files.is_empty() {
            return if rules.required {
                self.fail(&self.messages.file_required)
            } else {
                Ok(())
            };
        }
        if let Some(max) = rules.max_files {
            if files.len() > max {
                return Err(render(&self.messages.too_many_files, None, Some(&max.to_string()), None));
            }
        }
        if let Some(max) = rules.max_file_size_bytes {
            if let Some(file) = files.iter().find(|f| f.size.is_some_and(|size| size > max)) {
                return Err(render(
                    &self.messages.file_too_large,
                    None,
                    Some(&max.to_string()),
                    Some(&file.name),
                ));
            }
        }
        if let Some(accepted) = &rules.accepted_file_types {
            if let Some(file) = files.iter().find(|f| !is_accepted_type(f, accepted)) {
                return Err(render(
                    &self.messages.file_type_not_accepted,
                    None,
                    None,
                    Some(&file.name),
                ));
            }
        }
        Ok(())
    }
}

/// Entries are `.ext` suffixes, `type/*` wildcards or exact MIME types.
fn is_accepted_type(file: &FileRef, accepted: &[String]) -> bool {
    let name = file.name.to_lowercase();
    let mime = file.mime_type.as_deref().map(str::to_lowercase);
    accepted.iter().any(|entry| {
        let entry = entry.trim().to_lowercase();
        if entry.starts_with('.') {
            name.ends_with(&entry)
        } else if let Some(prefix) = entry.strip_suffix("/*") {
            mime.as_deref()
                .is_some_and(|m| m.split('/').next() == Some(prefix))
        } else {
            mime.as_deref() == Some(entry.as_str())
        }
    })
}
