//! One-time schema integrity check.
//!
//! Per-keystroke evaluation never validates schema shape. Hosts run
//! [`check_integrity`] after loading or editing a schema and surface the
//! report to the form author. Issues split in two severities:
//!
//! - [`Severity::Error`]: the schema breaks an interpreter precondition
//!   (duplicate ids, rules pointing at missing fields, uncompilable patterns).
//! - [`Severity::Warning`]: the schema loads and evaluates, but part of it is
//!   silently inert (unknown operators, `in` without a list, empty rules).

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::field::FormField;
use super::form::FormSchema;
use crate::config::InterpreterConfig;
use crate::rules::{ActionType, Combinator, ConditionGroup, ConditionNode, Operator, Rule};
use crate::rules::evaluator::node_count;
use crate::validation::parse_date;
use crate::{Error, InternalResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum IntegrityIssue {
    #[error("Schema has no pages")]
    NoPages,

    #[error("Duplicate field id '{field_id}' (pages {pages:?})")]
    DuplicateFieldId { field_id: String, pages: Vec<usize> },

    #[error("Rule {rule}: condition references unknown field '{field_id}'")]
    UnknownConditionField { rule: String, field_id: String },

    #[error("Rule {rule}: action targets unknown field '{field_id}'")]
    UnknownActionTarget { rule: String, field_id: String },

    #[error("Rule {rule}: unknown operator on field '{field_id}'")]
    UnknownOperator { rule: String, field_id: String },

    #[error("Rule {rule}: unknown combinator")]
    UnknownCombinator { rule: String },

    #[error("Rule {rule}: unknown action type targeting '{field_id}'")]
    UnknownActionType { rule: String, field_id: String },

    #[error("Rule {rule}: 'in' on field '{field_id}' needs a list value")]
    InWithoutList { rule: String, field_id: String },

    #[error("Rule {rule}: condition tree too large (depth {depth}, nodes {nodes})")]
    ConditionTooLarge {
        rule: String,
        depth: usize,
        nodes: usize,
    },

    #[error("Rule {rule} has no actions")]
    RuleWithoutActions { rule: String },

    #[error("Field '{field_id}': invalid pattern: {message}")]
    InvalidPattern { field_id: String, message: String },

    #[error("Field '{field_id}': {bound} '{value}' is not a YYYY-MM-DD date")]
    InvalidDateBound {
        field_id: String,
        bound: String,
        value: String,
    },

    #[error("Field '{field_id}': {constraint} lower bound exceeds upper bound")]
    InvertedBounds { field_id: String, constraint: String },

    #[error("Field '{field_id}' is decorative and cannot be required")]
    RequiredDecorativeField { field_id: String },
}

impl IntegrityIssue {
    pub fn severity(&self) -> Severity {
        match self {
            IntegrityIssue::NoPages
            | IntegrityIssue::DuplicateFieldId { .. }
            | IntegrityIssue::UnknownConditionField { .. }
            | IntegrityIssue::UnknownActionTarget { .. }
            | IntegrityIssue::InvalidPattern { .. }
            | IntegrityIssue::InvalidDateBound { .. }
            | IntegrityIssue::InvertedBounds { .. } => Severity::Error,
            IntegrityIssue::UnknownOperator { .. }
            | IntegrityIssue::UnknownCombinator { .. }
            | IntegrityIssue::UnknownActionType { .. }
            | IntegrityIssue::InWithoutList { .. }
            | IntegrityIssue::ConditionTooLarge { .. }
            | IntegrityIssue::RuleWithoutActions { .. }
            | IntegrityIssue::RequiredDecorativeField { .. } => Severity::Warning,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IntegrityReport {
    pub issues: Vec<IntegrityIssue>,
}

impl IntegrityReport {
    pub fn errors(&self) -> impl Iterator<Item = &IntegrityIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity() == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &IntegrityIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity() == Severity::Warning)
    }

    pub fn is_ok(&self) -> bool {
        self.errors().next().is_none()
    }

    /// Fails with [`Error::Integrity`] when any error-severity issue exists.
    pub fn into_result(self) -> InternalResult<()> {
        let errors: Vec<IntegrityIssue> = self.errors().cloned().collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Integrity(errors))
        }
    }
}

pub fn check_integrity(schema: &FormSchema) -> IntegrityReport {
    check_integrity_with(schema, &InterpreterConfig::default())
}

#[tracing::instrument(level = "debug", skip_all, fields(schema = ?schema.id))]
pub fn check_integrity_with(schema: &FormSchema, config: &InterpreterConfig) -> IntegrityReport {
    let mut issues = Vec::new();

    if schema.pages.is_empty() {
        issues.push(IntegrityIssue::NoPages);
    }

    // field id -> pages it appears on
    let mut seen: HashMap<&str, Vec<usize>> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for (index, page) in schema.pages.iter().enumerate() {
        for field in page.fields() {
            let pages = seen.entry(field.id.as_str()).or_default();
            if pages.is_empty() {
                order.push(field.id.as_str());
            }
            pages.push(index);
            check_field(field, &mut issues);
        }
    }
    for id in order {
        let pages = &seen[id];
        if pages.len() > 1 {
            issues.push(IntegrityIssue::DuplicateFieldId {
                field_id: id.to_string(),
                pages: pages.clone(),
            });
        }
    }

    for (index, rule) in schema.rules.iter().enumerate() {
        check_rule(index, rule, &seen, config, &mut issues);
    }

    for issue in &issues {
        match issue.severity() {
            Severity::Error => warn!(%issue, "schema integrity error"),
            Severity::Warning => debug!(%issue, "schema integrity warning"),
        }
    }

    IntegrityReport { issues }
}

fn check_field(field: &FormField, issues: &mut Vec<IntegrityIssue>) {
    let field_id = field.id.clone();

    if !field.field_type.is_validatable() && field.required {
        issues.push(IntegrityIssue::RequiredDecorativeField {
            field_id: field_id.clone(),
        });
    }

    let Some(validation) = &field.validation else {
        return;
    };

    if let Some(pattern) = &validation.pattern {
        if let Err(e) = regex::Regex::new(pattern) {
            issues.push(IntegrityIssue::InvalidPattern {
                field_id: field_id.clone(),
                message: e.to_string(),
            });
        }
    }

    for (bound, value) in [("minDate", &validation.min_date), ("maxDate", &validation.max_date)] {
        if let Some(value) = value {
            if parse_date(value).is_none() {
                issues.push(IntegrityIssue::InvalidDateBound {
                    field_id: field_id.clone(),
                    bound: bound.to_string(),
                    value: value.clone(),
                });
            }
        }
    }

    if let (Some(min), Some(max)) = (validation.min_length, validation.max_length) {
        if min > max {
            issues.push(IntegrityIssue::InvertedBounds {
                field_id: field_id.clone(),
                constraint: "length".to_string(),
            });
        }
    }
    if let (Some(min), Some(max)) = (validation.min, validation.max) {
        if min > max {
            issues.push(IntegrityIssue::InvertedBounds {
                field_id: field_id.clone(),
                constraint: "value".to_string(),
            });
        }
    }
    let min_date = validation.min_date.as_deref().and_then(parse_date);
    let max_date = validation.max_date.as_deref().and_then(parse_date);
    if let (Some(min), Some(max)) = (min_date, max_date) {
        if min > max {
            issues.push(IntegrityIssue::InvertedBounds {
                field_id,
                constraint: "date".to_string(),
            });
        }
    }
}

fn check_rule(
    index: usize,
    rule: &Rule,
    fields: &HashMap<&str, Vec<usize>>,
    config: &InterpreterConfig,
    issues: &mut Vec<IntegrityIssue>,
) {
    let label = rule.id.clone().unwrap_or_else(|| format!("#{}", index));

    let depth = rule.conditions.depth();
    let nodes = node_count(&rule.conditions);
    if depth > config.max_condition_depth || nodes > config.max_condition_nodes {
        issues.push(IntegrityIssue::ConditionTooLarge {
            rule: label.clone(),
            depth,
            nodes,
        });
    }

    check_group(&label, &rule.conditions, fields, issues);

    if rule.actions.is_empty() {
        issues.push(IntegrityIssue::RuleWithoutActions {
            rule: label.clone(),
        });
    }
    for action in &rule.actions {
        if action.action_type == ActionType::Unknown {
            issues.push(IntegrityIssue::UnknownActionType {
                rule: label.clone(),
                field_id: action.target_field_id.clone(),
            });
        }
        if !fields.contains_key(action.target_field_id.as_str()) {
            issues.push(IntegrityIssue::UnknownActionTarget {
                rule: label.clone(),
                field_id: action.target_field_id.clone(),
            });
        }
    }
}

fn check_group(
    label: &str,
    group: &ConditionGroup,
    fields: &HashMap<&str, Vec<usize>>,
    issues: &mut Vec<IntegrityIssue>,
) {
    if group.combinator == Combinator::Unknown {
        issues.push(IntegrityIssue::UnknownCombinator {
            rule: label.to_string(),
        });
    }
    for node in &group.conditions {
        let condition = match node {
            ConditionNode::Group(inner) => {
                check_group(label, inner, fields, issues);
                continue;
            }
            ConditionNode::Condition(condition) => condition,
        };
        if !fields.contains_key(condition.field_id.as_str()) {
            issues.push(IntegrityIssue::UnknownConditionField {
                rule: label.to_string(),
                field_id: condition.field_id.clone(),
            });
        }
        match condition.operator {
            Operator::Unknown => issues.push(IntegrityIssue::UnknownOperator {
                rule: label.to_string(),
                field_id: condition.field_id.clone(),
            }),
            Operator::In if !condition.value.is_array() => {
                issues.push(IntegrityIssue::InWithoutList {
                    rule: label.to_string(),
                    field_id: condition.field_id.clone(),
                })
            }
            _ => {}
        }
    }
}
