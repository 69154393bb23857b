use serde::{Deserialize, Serialize};

/// # Field Type
///
/// Closed set of field kinds a form page can contain. Adding a kind here is a
/// compile-time change: every `match` over `FieldType` in the validator
/// compiler has to handle it.
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    PartialEq,
    Eq,
    Hash,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FieldType {
    Text,
    Email,
    Number,
    Date,
    Textarea,
    Select,
    Radio,
    Checkbox,
    Multiselect,
    File,
    Paragraph,
    Divider,
    Spacer,
    Image,
}

impl FieldType {
    /// Decorative kinds never receive a validator and never consume answers.
    pub fn is_validatable(&self) -> bool {
        !matches!(
            self,
            FieldType::Paragraph | FieldType::Divider | FieldType::Spacer | FieldType::Image
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOption {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl FieldOption {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: None,
        }
    }
}

/// Type-specific constraint bag. Only the entries that make sense for the
/// owning field's type are consulted; the rest are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValidation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// `YYYY-MM-DD`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_date: Option<String>,
    /// `YYYY-MM-DD`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_date: Option<String>,
    #[serde(default)]
    pub disallow_future: bool,
    #[serde(default)]
    pub must_be_true: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_files: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_file_size_bytes: Option<u64>,
    /// MIME types (`application/pdf`, `image/*`) or extensions (`.docx`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_file_types: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    pub id: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub label: String,
    /// Intrinsic required-ness, before any rule applies.
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<FieldOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<FieldValidation>,
}

impl FormField {
    pub fn new(id: impl Into<String>, field_type: FieldType) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            field_type,
            required: false,
            options: None,
            validation: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_options<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = Some(values.into_iter().map(FieldOption::new).collect());
        self
    }

    pub fn with_validation(mut self, validation: FieldValidation) -> Self {
        self.validation = Some(validation);
        self
    }

    /// A checkbox with declared options collects several values; without
    /// options it is a single agreement box.
    pub fn has_options(&self) -> bool {
        self.options.as_ref().is_some_and(|o| !o.is_empty())
    }
}
