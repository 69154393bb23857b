use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, warn};

use super::action::{DerivedState, Rule, RuleOutcome};
use super::condition::{Combinator, Condition, ConditionGroup, ConditionNode, Operator};
use crate::config::InterpreterConfig;
use crate::schema::FormField;
use crate::value::{json_number, json_string, parse_number, AnswerValue, Answers};

/// Result of one evaluation pass, with the rules that fired.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationTrace {
    pub state: DerivedState,
    pub outcome: RuleOutcome,
    /// Indices into the rule list, in iteration order.
    pub fired_rules: Vec<usize>,
}

/// Walks rules against one answers snapshot.
///
/// Single pass, in rule order. Actions never feed back into conditions of
/// the same pass: a rule that hides a field does not make another rule's
/// `isEmpty` test on that field change its mind.
#[derive(Debug, Clone)]
pub struct RuleEvaluator {
    max_depth: usize,
    max_nodes: usize,
}

impl Default for RuleEvaluator {
    fn default() -> Self {
        Self::new(&InterpreterConfig::default())
    }
}

impl RuleEvaluator {
    pub fn new(config: &InterpreterConfig) -> Self {
        Self {
            max_depth: config.max_condition_depth,
            max_nodes: config.max_condition_nodes,
        }
    }

    pub fn evaluate(&self, rules: &[Rule], answers: &Answers, fields: &[FormField]) -> DerivedState {
        self.evaluate_with_trace(rules, answers, fields).state
    }

    #[tracing::instrument(level = "debug", skip_all, fields(rules = rules.len(), fields = fields.len()))]
    pub fn evaluate_with_trace(
        &self,
        rules: &[Rule],
        answers: &Answers,
        fields: &[FormField],
    ) -> EvaluationTrace {
        let known: HashSet<&str> = fields.iter().map(|f| f.id.as_str()).collect();

        let mut fired_rules = Vec::new();
        let outcome = rules
            .iter()
            .enumerate()
            .filter(|(index, rule)| self.rule_matches(*index, rule, answers, &known))
            .fold(RuleOutcome::baseline(), |outcome, (index, rule)| {
                debug!(rule = index, id = ?rule.id, "rule fired");
                fired_rules.push(index);
                rule.actions
                    .iter()
                    .fold(outcome, |outcome, action| outcome.apply(action))
            });

        EvaluationTrace {
            state: outcome.resolve(fields),
            outcome,
            fired_rules,
        }
    }

    fn rule_matches(
        &self,
        index: usize,
        rule: &Rule,
        answers: &Answers,
        known: &HashSet<&str>,
    ) -> bool {
        if !self.within_limits(&rule.conditions) {
            warn!(
                rule = index,
                id = ?rule.id,
                max_depth = self.max_depth,
                max_nodes = self.max_nodes,
                "condition tree exceeds evaluation limits, treating as false"
            );
            return false;
        }
        eval_group(&rule.conditions, answers, known)
    }

    /// One walk, stopped as soon as either budget is spent.
    fn within_limits(&self, group: &ConditionGroup) -> bool {
        let mut visited = 0;
        self.fits(group, 1, &mut visited)
    }

    fn fits(&self, group: &ConditionGroup, depth: usize, visited: &mut usize) -> bool {
        *visited += 1;
        if depth > self.max_depth || *visited > self.max_nodes {
            return false;
        }
        group.conditions.iter().all(|node| match node {
            ConditionNode::Group(inner) => self.fits(inner, depth + 1, visited),
            ConditionNode::Condition(_) => {
                *visited += 1;
                *visited <= self.max_nodes
            }
        })
    }
}

/// Evaluates rules with the default limits.
pub fn evaluate(rules: &[Rule], answers: &Answers, fields: &[FormField]) -> DerivedState {
    RuleEvaluator::default().evaluate(rules, answers, fields)
}

pub(crate) fn node_count(group: &ConditionGroup) -> usize {
    1 + group
        .conditions
        .iter()
        .map(|node| match node {
            ConditionNode::Group(inner) => node_count(inner),
            ConditionNode::Condition(_) => 1,
        })
        .sum::<usize>()
}

fn eval_group(group: &ConditionGroup, answers: &Answers, known: &HashSet<&str>) -> bool {
    let mut results = group.conditions.iter().map(|node| match node {
        ConditionNode::Group(inner) => eval_group(inner, answers, known),
        ConditionNode::Condition(condition) => eval_condition(condition, answers, known),
    });
    match group.combinator {
        Combinator::And => results.all(|r| r),
        Combinator::Or => group.conditions.is_empty() || results.any(|r| r),
        Combinator::Unknown => {
            debug!("unknown combinator, treating group as false");
            false
        }
    }
}

fn eval_condition(condition: &Condition, answers: &Answers, known: &HashSet<&str>) -> bool {
    if !known.contains(condition.field_id.as_str()) {
        debug!(field = %condition.field_id, "condition references unknown field");
        return false;
    }
    test_condition(condition, answers.get(&condition.field_id))
}

/// Applies one operator to the current answer. Total: mismatched shapes give `false`.
pub fn test_condition(condition: &Condition, value: Option<&AnswerValue>) -> bool {
    let target = &condition.value;
    match condition.operator {
        Operator::Eq => loose_eq(value, target),
        Operator::Neq => !loose_eq(value, target),
        Operator::Contains => contains(value, target),
        Operator::In => match (value, target) {
            (Some(v), serde_json::Value::Array(items)) if !v.is_sequence() => {
                items.iter().any(|item| strict_eq(v, item))
            }
            _ => false,
        },
        Operator::IsEmpty => value.map_or(true, AnswerValue::is_empty),
        Operator::IsNotEmpty => !value.map_or(true, AnswerValue::is_empty),
        Operator::Gt => compare(value, target, |a, b| a > b),
        Operator::Gte => compare(value, target, |a, b| a >= b),
        Operator::Lt => compare(value, target, |a, b| a < b),
        Operator::Lte => compare(value, target, |a, b| a <= b),
        Operator::Unknown => false,
    }
}

/// Equality where numeric strings and numbers compare equal.
fn loose_eq(value: Option<&AnswerValue>, target: &serde_json::Value) -> bool {
    use serde_json::Value as Json;

    let v = match value {
        None | Some(AnswerValue::Null) => return target.is_null(),
        Some(v) => v,
    };
    match (v, target) {
        (_, Json::Null) | (_, Json::Array(_)) | (_, Json::Object(_)) => false,
        (AnswerValue::Text(a), Json::String(b)) => a == b,
        (AnswerValue::Boolean(a), Json::Bool(b)) => a == b,
        (AnswerValue::List(_) | AnswerValue::Files(_), Json::String(b)) => {
            v.to_loose_string() == *b
        }
        (AnswerValue::List(_) | AnswerValue::Files(_), _) => {
            numbers_equal(parse_number(&v.to_loose_string()), json_number(target))
        }
        _ => numbers_equal(v.as_number(), json_number(target)),
    }
}

fn numbers_equal(a: f64, b: f64) -> bool {
    !a.is_nan() && !b.is_nan() && a == b
}

fn strict_eq(v: &AnswerValue, item: &serde_json::Value) -> bool {
    match (v, item) {
        (AnswerValue::Text(a), serde_json::Value::String(b)) => a == b,
        (AnswerValue::Boolean(a), serde_json::Value::Bool(b)) => a == b,
        (AnswerValue::Number(a), serde_json::Value::Number(b)) => Some(*a) == b.as_f64(),
        _ => false,
    }
}

fn contains(value: Option<&AnswerValue>, target: &serde_json::Value) -> bool {
    use serde_json::Value as Json;

    // a missing or structured target never matches
    if matches!(target, Json::Null | Json::Array(_) | Json::Object(_)) {
        return false;
    }
    match value {
        None | Some(AnswerValue::Null) => false,
        Some(AnswerValue::List(items)) => {
            matches!(target, serde_json::Value::String(t) if items.contains(t))
        }
        // file references are never equal to a literal
        Some(AnswerValue::Files(_)) => false,
        Some(v) => v
            .to_loose_string()
            .to_lowercase()
            .contains(&json_string(target).to_lowercase()),
    }
}

fn compare(value: Option<&AnswerValue>, target: &serde_json::Value, op: fn(f64, f64) -> bool) -> bool {
    let a = value.map_or(f64::NAN, AnswerValue::as_number);
    let b = json_number(target);
    !a.is_nan() && !b.is_nan() && op(a, b)
}
