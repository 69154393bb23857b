use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::condition::ConditionGroup;
use crate::schema::FormField;

#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    PartialEq,
    Eq,
    Hash,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ActionType {
    Hide,
    Show,
    Require,
    Optional,
    /// Unrecognised action string; ignored during evaluation.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub target_field_id: String,
}

impl Action {
    pub fn new(action_type: ActionType, target_field_id: impl Into<String>) -> Self {
        Self {
            action_type,
            target_field_id: target_field_id.into(),
        }
    }
}

/// A condition tree paired with the actions it triggers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub conditions: ConditionGroup,
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl Rule {
    pub fn new(conditions: ConditionGroup, actions: Vec<Action>) -> Self {
        Self {
            id: None,
            conditions,
            actions,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Accumulated effect of every fired rule in one pass.
///
/// The fold starts from [`RuleOutcome::baseline`] (nothing hidden, nothing
/// forced) and only ever grows. Precedence is applied once, in
/// [`RuleOutcome::resolve`]:
/// - hidden beats shown, since the baseline is "visible unless hidden";
/// - force-optional beats force-required.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleOutcome {
    pub hidden: BTreeSet<String>,
    /// Informational only. Shown ids never change visibility.
    pub shown: BTreeSet<String>,
    pub force_required: BTreeSet<String>,
    pub force_optional: BTreeSet<String>,
}

impl RuleOutcome {
    pub fn baseline() -> Self {
        Self::default()
    }

    pub fn apply(mut self, action: &Action) -> Self {
        let target = action.target_field_id.clone();
        match action.action_type {
            ActionType::Hide => {
                self.hidden.insert(target);
            }
            ActionType::Show => {
                self.shown.insert(target);
            }
            ActionType::Require => {
                self.force_required.insert(target);
            }
            ActionType::Optional => {
                self.force_optional.insert(target);
            }
            ActionType::Unknown => {}
        }
        self
    }

    pub fn resolve(&self, fields: &[FormField]) -> DerivedState {
        let visible_field_ids = fields
            .iter()
            .filter(|f| !self.hidden.contains(&f.id))
            .map(|f| f.id.clone())
            .collect();

        let required_field_ids = fields
            .iter()
            .filter(|f| {
                (f.required || self.force_required.contains(&f.id))
                    && !self.force_optional.contains(&f.id)
            })
            .map(|f| f.id.clone())
            .collect();

        DerivedState {
            visible_field_ids,
            required_field_ids,
        }
    }
}

/// Visible and required field ids for one answers snapshot. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedState {
    pub visible_field_ids: BTreeSet<String>,
    pub required_field_ids: BTreeSet<String>,
}

impl DerivedState {
    /// State with no rules applied: everything visible, intrinsic required-ness.
    pub fn baseline(fields: &[FormField]) -> Self {
        RuleOutcome::baseline().resolve(fields)
    }

    pub fn is_visible(&self, field_id: &str) -> bool {
        self.visible_field_ids.contains(field_id)
    }

    pub fn is_required(&self, field_id: &str) -> bool {
        self.required_field_ids.contains(field_id)
    }
}
