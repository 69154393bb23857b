//! Rule evaluation: condition trees in, visible and required field ids out.
//!
//! ```text
//! answers ──► RuleEvaluator ──► RuleOutcome (fold over fired rules) ──► DerivedState
//! ```

pub mod action;
pub mod condition;
pub mod evaluator;

pub use action::{Action, ActionType, DerivedState, Rule, RuleOutcome};
pub use condition::{Combinator, Condition, ConditionGroup, ConditionNode, Operator};
pub use evaluator::{evaluate, EvaluationTrace, RuleEvaluator};
