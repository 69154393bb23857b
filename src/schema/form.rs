use serde::{Deserialize, Serialize};

use super::field::FormField;
use crate::rules::Rule;
use crate::{Error, InternalResult};

/// # Form Schema
///
/// Versioned, declarative form definition: pages → sections → rows → fields,
/// plus the conditional rules that apply across all of them.
///
/// The nesting exists for layout only. Interpretation works on the flattened
/// field list returned by [`FormSchema::all_fields`], in page order. Field ids
/// are expected to be unique across the whole schema; see
/// [`check_integrity`](super::integrity::check_integrity).
///
/// # Example
/// ```json
/// {
///   "pages": [{
///     "id": "p1", "title": "Contact",
///     "sections": [{"id": "s1", "rows": [{"fields": [
///       {"id": "email", "type": "email", "label": "Email", "required": true}
///     ]}]}]
///   }],
///   "rules": []
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(default)]
    pub pages: Vec<Page>,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub fields: Vec<FormField>,
}

impl Page {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    /// Single section, one field per row.
    pub fn with_fields(mut self, fields: Vec<FormField>) -> Self {
        self.sections.push(Section {
            id: format!("{}-section-{}", self.id, self.sections.len()),
            title: None,
            rows: fields
                .into_iter()
                .map(|field| Row {
                    id: None,
                    fields: vec![field],
                })
                .collect(),
        });
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = &FormField> {
        self.sections
            .iter()
            .flat_map(|section| section.rows.iter())
            .flat_map(|row| row.fields.iter())
    }
}

impl FormSchema {
    pub fn new(pages: Vec<Page>) -> Self {
        Self {
            pages,
            ..Default::default()
        }
    }

    pub fn with_rules(mut self, rules: Vec<Rule>) -> Self {
        self.rules = rules;
        self
    }

    pub fn from_json(s: &str) -> InternalResult<Self> {
        serde_json::from_str(s).map_err(|e| Error::schema(format!("Failed to parse form schema: {}", e)))
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Every field in page order.
    pub fn all_fields(&self) -> Vec<FormField> {
        self.pages.iter().flat_map(|page| page.fields().cloned()).collect()
    }

    /// Field ids on one page. Out-of-range steps have no fields.
    pub fn page_field_ids(&self, step: usize) -> Vec<String> {
        self.pages
            .get(step)
            .map(|page| page.fields().map(|f| f.id.clone()).collect())
            .unwrap_or_default()
    }

    pub fn page_index_of(&self, field_id: &str) -> Option<usize> {
        self.pages
            .iter()
            .position(|page| page.fields().any(|f| f.id == field_id))
    }

    pub fn field(&self, field_id: &str) -> Option<&FormField> {
        self.pages
            .iter()
            .flat_map(|page| page.fields())
            .find(|f| f.id == field_id)
    }
}
