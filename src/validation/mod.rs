//! Validator compilation: per-field checks derived from field type,
//! constraint bag and the current visible/required sets.

pub mod compiler;
pub mod messages;
pub mod validator;

pub use compiler::{compile, ValidatorCompiler, ValidatorSet};
pub use messages::{render, MessageCatalog};
pub use validator::{
    is_valid_email, parse_date, FieldValidator, FileRules, TextRules, ValidationResult,
    ValidatorKind,
};
