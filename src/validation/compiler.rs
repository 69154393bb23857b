use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use regex::Regex;
use tracing::{debug, warn};

use super::messages::MessageCatalog;
use super::validator::{
    parse_date, FieldValidator, FileRules, TextRules, ValidationResult, ValidatorKind,
};
use crate::config::InterpreterConfig;
use crate::rules::DerivedState;
use crate::schema::{FieldType, FieldValidation, FormField};
use crate::value::{AnswerValue, Answers};

/// # Validator Compiler
///
/// Turns fields plus the derived visible/required sets into one
/// [`FieldValidator`] per validatable field.
///
/// - Fields outside the visible set get [`ValidatorKind::Permissive`].
/// - Decorative fields get no validator at all.
/// - Broken constraints (bad regex, unparseable date bound) are dropped with
///   a warning; [`check_integrity`](crate::schema::check_integrity) reports
///   them at load time.
#[derive(Debug, Clone)]
pub struct ValidatorCompiler {
    messages: Arc<MessageCatalog>,
    /// `None` means the date at validation time.
    today: Option<NaiveDate>,
}

impl Default for ValidatorCompiler {
    fn default() -> Self {
        Self::new(&InterpreterConfig::default())
    }
}

impl ValidatorCompiler {
    pub fn new(config: &InterpreterConfig) -> Self {
        Self {
            messages: Arc::new(config.messages.clone()),
            today: None,
        }
    }

    /// Pins the reference date used by `disallowFuture`.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn set_today(&mut self, today: Option<NaiveDate>) {
        self.today = today;
    }

    /// The pinned date, or the current UTC date.
    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Utc::now().date_naive())
    }

    #[tracing::instrument(level = "debug", skip_all, fields(fields = fields.len()))]
    pub fn compile(
        &self,
        fields: &[FormField],
        required_field_ids: &BTreeSet<String>,
        visible_field_ids: &BTreeSet<String>,
    ) -> ValidatorSet {
        let validators: HashMap<String, FieldValidator> = fields
            .iter()
            .filter_map(|field| {
                self.compile_field(
                    field,
                    required_field_ids.contains(&field.id),
                    visible_field_ids.contains(&field.id),
                )
            })
            .map(|validator| (validator.field_id().to_string(), validator))
            .collect();
        debug!("compiled {} validators", validators.len());
        ValidatorSet { validators }
    }

    pub fn compile_state(&self, fields: &[FormField], state: &DerivedState) -> ValidatorSet {
        self.compile(fields, &state.required_field_ids, &state.visible_field_ids)
    }

    /// `None` for decorative fields.
    pub fn compile_field(
        &self,
        field: &FormField,
        required: bool,
        visible: bool,
    ) -> Option<FieldValidator> {
        if !field.field_type.is_validatable() {
            return None;
        }
        let kind = if visible {
            self.kind_for(field, required)
        } else {
            ValidatorKind::Permissive
        };
        Some(FieldValidator::new(
            field.id.clone(),
            kind,
            Arc::clone(&self.messages),
        ))
    }

    fn kind_for(&self, field: &FormField, required: bool) -> ValidatorKind {
        let empty = FieldValidation::default();
        let v = field.validation.as_ref().unwrap_or(&empty);

        match field.field_type {
            FieldType::Text | FieldType::Textarea | FieldType::Email => {
                ValidatorKind::Text(TextRules {
                    required,
                    email: field.field_type == FieldType::Email,
                    pattern: compile_pattern(&field.id, v.pattern.as_deref()),
                    pattern_message: v.pattern_message.clone(),
                    min_length: v.min_length,
                    max_length: v.max_length,
                })
            }
            FieldType::Number => ValidatorKind::Number {
                required,
                min: v.min,
                max: v.max,
            },
            FieldType::Date => ValidatorKind::Date {
                required,
                min: date_bound(&field.id, "minDate", v.min_date.as_deref()),
                max: date_bound(&field.id, "maxDate", v.max_date.as_deref()),
                disallow_future: v.disallow_future,
                today: self.today,
            },
            FieldType::Select | FieldType::Radio => ValidatorKind::Choice {
                required,
                allowed: v.allowed_values.clone(),
            },
            FieldType::Checkbox if field.has_options() => ValidatorKind::MultiChoice {
                required,
                allowed: v.allowed_values.clone(),
            },
            FieldType::Checkbox => ValidatorKind::Agreement {
                required,
                must_be_true: v.must_be_true,
            },
            FieldType::Multiselect => ValidatorKind::MultiChoice {
                required,
                allowed: v.allowed_values.clone(),
            },
            FieldType::File => ValidatorKind::Files(FileRules {
                required,
                max_files: v.max_files,
                max_file_size_bytes: v.max_file_size_bytes,
                accepted_file_types: v.accepted_file_types.clone(),
            }),
            // filtered out by is_validatable
            FieldType::Paragraph | FieldType::Divider | FieldType::Spacer | FieldType::Image => {
                ValidatorKind::Permissive
            }
        }
    }
}

fn compile_pattern(field_id: &str, pattern: Option<&str>) -> Option<Regex> {
    let pattern = pattern.filter(|p| !p.is_empty())?;
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!("ignoring invalid pattern on field {}: {}", field_id, e);
            None
        }
    }
}

fn date_bound(field_id: &str, bound: &str, value: Option<&str>) -> Option<NaiveDate> {
    let value = value.filter(|v| !v.trim().is_empty())?;
    let parsed = parse_date(value);
    if parsed.is_none() {
        warn!("ignoring unparseable {} {:?} on field {}", bound, value, field_id);
    }
    parsed
}

/// Compiles with the default message catalog and today's date.
pub fn compile(
    fields: &[FormField],
    required_field_ids: &BTreeSet<String>,
    visible_field_ids: &BTreeSet<String>,
) -> ValidatorSet {
    ValidatorCompiler::default().compile(fields, required_field_ids, visible_field_ids)
}

/// Per-field validators keyed by field id.
#[derive(Debug, Clone, Default)]
pub struct ValidatorSet {
    validators: HashMap<String, FieldValidator>,
}

impl ValidatorSet {
    pub fn get(&self, field_id: &str) -> Option<&FieldValidator> {
        self.validators.get(field_id)
    }

    pub fn contains(&self, field_id: &str) -> bool {
        self.validators.contains_key(field_id)
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Ids without a validator (decorative, unknown) always pass.
    pub fn validate(&self, field_id: &str, value: Option<&AnswerValue>) -> ValidationResult {
        match self.validators.get(field_id) {
            Some(validator) => validator.validate(value),
            None => Ok(()),
        }
    }

    /// Failures for `field_ids` only, one message per field.
    pub fn validate_answers<'a, I>(&self, answers: &Answers, field_ids: I) -> BTreeMap<String, String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        field_ids
            .into_iter()
            .filter_map(|id| {
                self.validate(id, answers.get(id))
                    .err()
                    .map(|message| (id.to_string(), message))
            })
            .collect()
    }
}
