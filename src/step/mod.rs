//! Multi-page navigation: page validation, the step state machine and a
//! session wrapper that keeps answers and derived state in sync.

pub mod controller;
pub mod page;
pub mod session;

pub use controller::{Navigation, StepController, Submission, SubmissionSink, SubmitOutcome};
pub use page::{
    can_advance, can_submit, validate_all, validate_all_with, validate_page, validate_page_with,
    PageValidation,
};
pub use session::FormSession;
