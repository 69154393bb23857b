use serde::{Deserialize, Serialize};

/// Comparison applied to `answers[field_id]`.
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
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum Operator {
    Eq,
    Neq,
    Contains,
    In,
    IsEmpty,
    IsNotEmpty,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Any operator string this crate does not know. Always evaluates to `false`.
    #[serde(other)]
    Unknown,
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    PartialEq,
    Eq,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Combinator {
    #[default]
    And,
    Or,
    #[serde(other)]
    Unknown,
}

/// A single leaf test: `answers[field_id] <operator> value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub field_id: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl Condition {
    pub fn new(field_id: impl Into<String>, operator: Operator, value: serde_json::Value) -> Self {
        Self {
            field_id: field_id.into(),
            operator,
            value,
        }
    }
}

/// Recursive boolean tree over conditions.
///
/// `and` needs every child to hold, `or` needs at least one. An empty list
/// holds, so a rule without conditions always fires.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionGroup {
    #[serde(default)]
    pub combinator: Combinator,
    #[serde(default)]
    pub conditions: Vec<ConditionNode>,
}

impl ConditionGroup {
    pub fn all(conditions: Vec<ConditionNode>) -> Self {
        Self {
            combinator: Combinator::And,
            conditions,
        }
    }

    pub fn any(conditions: Vec<ConditionNode>) -> Self {
        Self {
            combinator: Combinator::Or,
            conditions,
        }
    }

    /// Nesting depth; a group with only leaf conditions has depth 1.
    pub fn depth(&self) -> usize {
        1 + self
            .conditions
            .iter()
            .map(|node| match node {
                ConditionNode::Group(group) => group.depth(),
                ConditionNode::Condition(_) => 0,
            })
            .max()
            .unwrap_or(0)
    }

    /// Depth-first visit of every leaf condition.
    pub fn leaves(&self) -> Vec<&Condition> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Condition>) {
        for node in &self.conditions {
            match node {
                ConditionNode::Group(group) => group.collect_leaves(out),
                ConditionNode::Condition(condition) => out.push(condition),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
// Condition first: every field of ConditionGroup has a default, so a leaf would
// otherwise deserialize as an empty group.
#[serde(untagged)]
pub enum ConditionNode {
    Condition(Condition),
    Group(ConditionGroup),
}

impl From<Condition> for ConditionNode {
    fn from(condition: Condition) -> Self {
        ConditionNode::Condition(condition)
    }
}

impl From<ConditionGroup> for ConditionNode {
    fn from(group: ConditionGroup) -> Self {
        ConditionNode::Group(group)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_nested_tree_deserialize() {
        let group: ConditionGroup = serde_json::from_value(json!({
            "combinator": "or",
            "conditions": [
                {"fieldId": "country", "operator": "eq", "value": "US"},
                {
                    "combinator": "and",
                    "conditions": [
                        {"fieldId": "age", "operator": "gte", "value": 18},
                        {"fieldId": "resume", "operator": "isNotEmpty"}
                    ]
                }
            ]
        }))
        .unwrap();

        assert_eq!(group.combinator, Combinator::Or);
        assert_eq!(group.depth(), 2);
        let leaves: Vec<&str> = group.leaves().iter().map(|c| c.field_id.as_str()).collect();
        assert_eq!(leaves, vec!["country", "age", "resume"]);
        match &group.conditions[1] {
            ConditionNode::Group(inner) => {
                assert_eq!(inner.conditions.len(), 2);
                assert!(matches!(
                    &inner.conditions[1],
                    ConditionNode::Condition(c) if c.operator == Operator::IsNotEmpty && c.value.is_null()
                ));
            }
            other => panic!("Expected nested group, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_operator_loads() {
        let condition: Condition = serde_json::from_value(json!({
            "fieldId": "x", "operator": "startsWith", "value": "a"
        }))
        .unwrap();
        assert_eq!(condition.operator, Operator::Unknown);
    }

    #[test]
    fn test_operator_names() {
        assert_eq!(Operator::IsNotEmpty.to_string(), "isNotEmpty");
        assert_eq!(
            serde_json::to_value(Operator::Gte).unwrap(),
            json!("gte")
        );
    }

    #[test]
    fn test_empty_group_defaults() {
        let group: ConditionGroup = serde_json::from_value(json!({})).unwrap();
        assert_eq!(group.combinator, Combinator::And);
        assert!(group.conditions.is_empty());
        assert_eq!(group.depth(), 1);
    }
}
