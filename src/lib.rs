//! # formlogic: Form Schema Interpreter
//!
//! formlogic turns a declarative, versioned form schema plus the current
//! answers into what a renderer needs: which fields are visible, which are
//! required, whether each answer is valid, and whether the user may move to
//! the next page or submit.
//!
//! ## Pipeline
//!
//! ```text
//! FormSchema ──► all_fields ─┐
//!                            ├─► RuleEvaluator ──► DerivedState ──► ValidatorCompiler ──► ValidatorSet
//! Answers ───────────────────┘                                                              │
//!                                                          StepController (next/back/submit) ◄┘
//! ```
//!
//! ### 1. Schema ([`schema`])
//! Pages, sections, rows and fields. Layout nesting is flattened into one
//! ordered field list. [`schema::check_integrity`] is the one-time load check
//! for duplicate ids, dangling rule references and broken constraints.
//!
//! ### 2. Rules ([`rules`])
//! Recursive `and`/`or` condition trees over answers. Fired rules fold into a
//! [`rules::RuleOutcome`]; hide beats show, optional beats require. A
//! malformed condition is `false`, never an error.
//!
//! ### 3. Validation ([`validation`])
//! One validator per validatable field, built from field type, constraint
//! bag and the derived sets. Hidden fields accept anything. Failures are
//! data (one message per field), never [`Error`].
//!
//! ### 4. Steps ([`step`])
//! Page validation, the step state machine and [`step::FormSession`], which
//! keeps answers, derived state and errors consistent behind a version stamp.
//!
//! Every entry point is synchronous and pure over its arguments.

pub mod config;
pub mod error;
pub mod rules;
pub mod schema;
pub mod step;
pub mod validation;
pub mod value;

// Re-exports
pub use config::InterpreterConfig;
pub use error::*;
pub use rules::{evaluate, DerivedState, RuleEvaluator};
pub use schema::{check_integrity, FieldType, FormField, FormSchema};
pub use step::{can_advance, can_submit, validate_page, FormSession, StepController};
pub use validation::{compile, ValidatorCompiler, ValidatorSet};
pub use value::{AnswerValue, Answers, FileRef};
