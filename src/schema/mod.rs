//! Field catalog: the static form definition the interpreter reads.

pub mod field;
pub mod form;
pub mod integrity;

pub use field::{FieldOption, FieldType, FieldValidation, FormField};
pub use form::{FormSchema, Page, Row, Section};
pub use integrity::{check_integrity, check_integrity_with, IntegrityIssue, IntegrityReport, Severity};
