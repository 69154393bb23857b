use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use super::page::{validate_all_with, validate_page_with};
use crate::rules::DerivedState;
use crate::schema::FormSchema;
use crate::validation::ValidatorCompiler;
use crate::value::{AnswerValue, Answers};
use crate::{Error, InternalResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum Navigation {
    Moved { from: usize, to: usize },
    /// Already at the boundary, or a forward jump was requested.
    Unchanged { step: usize },
    Blocked { errors: BTreeMap<String, String> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum SubmitOutcome {
    Submitted(Submission),
    Blocked {
        first_invalid_step: usize,
        errors: BTreeMap<String, String>,
    },
    NotOnLastPage { step: usize },
}

/// Finalized answers handed to the host. Answers for hidden, decorative or
/// unknown fields are dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Submission {
    pub form_id: Option<String>,
    pub answers: BTreeMap<String, AnswerValue>,
}

impl Submission {
    pub fn collect(schema: &FormSchema, answers: &Answers, state: &DerivedState) -> Self {
        let kept: HashSet<String> = schema
            .all_fields()
            .into_iter()
            .filter(|f| f.field_type.is_validatable() && state.is_visible(&f.id))
            .map(|f| f.id)
            .collect();
        Self {
            form_id: schema.id.clone(),
            answers: answers
                .iter()
                .filter(|(id, _)| kept.contains(*id))
                .map(|(id, value)| (id.clone(), value.clone()))
                .collect(),
        }
    }
}

/// Host persistence seam for finished submissions.
pub trait SubmissionSink {
    fn accept(&mut self, submission: &Submission) -> InternalResult<()>;
}

impl SubmissionSink for Vec<Submission> {
    fn accept(&mut self, submission: &Submission) -> InternalResult<()> {
        self.push(submission.clone());
        Ok(())
    }
}

/// # Step Controller
///
/// Page-by-page navigation state for one form fill.
///
/// ```text
///        next (page valid)          next (page valid)
///  [0] ───────────────────► [1] ─── ... ───► [n-1] ──submit──► submitted
///      ◄─────────────────── back / jump_to (never validated)
/// ```
///
/// The controller owns the error map. `next` replaces only the entries for
/// fields on the current page; `submit` re-validates every page and replaces
/// the whole map.
#[derive(Debug, Clone)]
pub struct StepController {
    step: usize,
    page_count: usize,
    errors: BTreeMap<String, String>,
    submitted: bool,
    compiler: ValidatorCompiler,
}

impl StepController {
    pub fn new(page_count: usize) -> Self {
        Self::with_compiler(page_count, ValidatorCompiler::default())
    }

    pub fn with_compiler(page_count: usize, compiler: ValidatorCompiler) -> Self {
        Self {
            step: 0,
            page_count,
            errors: BTreeMap::new(),
            submitted: false,
            compiler,
        }
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn is_first_page(&self) -> bool {
        self.step == 0
    }

    pub fn is_last_page(&self) -> bool {
        self.page_count == 0 || self.step == self.page_count - 1
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    pub fn error(&self, field_id: &str) -> Option<&str> {
        self.errors.get(field_id).map(String::as_str)
    }

    pub fn compiler(&self) -> &ValidatorCompiler {
        &self.compiler
    }

    /// Pins the validation date without touching step, errors or submission.
    pub fn set_today(&mut self, today: NaiveDate) {
        self.compiler.set_today(Some(today));
    }

    /// Validates the current page and moves forward when it holds.
    pub fn next(&mut self, schema: &FormSchema, answers: &Answers, state: &DerivedState) -> Navigation {
        let result = validate_page_with(
            &self.compiler,
            schema,
            answers,
            self.step,
            &state.visible_field_ids,
            &state.required_field_ids,
        );

        for id in schema.page_field_ids(self.step) {
            self.errors.remove(&id);
        }
        if !result.ok {
            debug!(step = self.step, errors = result.errors.len(), "next blocked");
            self.errors.extend(result.errors.clone());
            return Navigation::Blocked {
                errors: result.errors,
            };
        }

        if self.is_last_page() {
            return Navigation::Unchanged { step: self.step };
        }
        let from = self.step;
        self.step += 1;
        Navigation::Moved { from, to: self.step }
    }

    pub fn back(&mut self) -> Navigation {
        if self.step == 0 {
            return Navigation::Unchanged { step: 0 };
        }
        let from = self.step;
        self.step -= 1;
        Navigation::Moved { from, to: self.step }
    }

    /// Backward jump to an earlier page. Forward jumps leave the step alone;
    /// they must go through [`StepController::next`].
    pub fn jump_to(&mut self, target: usize) -> InternalResult<Navigation> {
        if target >= self.page_count {
            return Err(Error::StepOutOfRange {
                step: target,
                page_count: self.page_count,
            });
        }
        if target >= self.step {
            return Ok(Navigation::Unchanged { step: self.step });
        }
        let from = self.step;
        self.step = target;
        Ok(Navigation::Moved { from, to: target })
    }

    /// Clears the error for a field whose answer just changed. Returns whether
    /// there was one.
    pub fn answer_changed(&mut self, field_id: &str) -> bool {
        self.errors.remove(field_id).is_some()
    }

    pub fn submit(&mut self, schema: &FormSchema, answers: &Answers, state: &DerivedState) -> SubmitOutcome {
        if self.page_count == 0 || !self.is_last_page() {
            return SubmitOutcome::NotOnLastPage { step: self.step };
        }

        let result = validate_all_with(
            &self.compiler,
            schema,
            answers,
            &state.visible_field_ids,
            &state.required_field_ids,
        );
        self.errors = result.errors.clone();

        if !result.ok {
            let first_invalid_step = result
                .errors
                .keys()
                .filter_map(|id| schema.page_index_of(id))
                .min()
                .unwrap_or(self.step);
            debug!(first_invalid_step, "submit blocked");
            return SubmitOutcome::Blocked {
                first_invalid_step,
                errors: result.errors,
            };
        }

        self.submitted = true;
        let submission = Submission::collect(schema, answers, state);
        info!(answers = submission.answers.len(), "form submitted");
        SubmitOutcome::Submitted(submission)
    }

    /// Like [`StepController::submit`], then hands a successful submission to
    /// `sink`. A sink failure leaves the controller unsubmitted.
    pub fn submit_to(
        &mut self,
        schema: &FormSchema,
        answers: &Answers,
        state: &DerivedState,
        sink: &mut dyn SubmissionSink,
    ) -> InternalResult<SubmitOutcome> {
        let outcome = self.submit(schema, answers, state);
        if let SubmitOutcome::Submitted(submission) = &outcome {
            if let Err(e) = sink.accept(submission) {
                self.submitted = false;
                return Err(match e {
                    Error::Submission(_) => e,
                    other => Error::Submission(other.to_string()),
                });
            }
        }
        Ok(outcome)
    }
}
