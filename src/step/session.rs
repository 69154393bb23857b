use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::debug;

use super::controller::{Navigation, StepController, SubmissionSink, SubmitOutcome};
use super::page::{validate_page_with, PageValidation};
use crate::config::InterpreterConfig;
use crate::rules::{DerivedState, EvaluationTrace, RuleEvaluator};
use crate::schema::{FormField, FormSchema};
use crate::validation::{ValidatorCompiler, ValidatorSet};
use crate::value::{AnswerValue, Answers};
use crate::InternalResult;

/// # Form Session
///
/// One schema, one answers snapshot and one [`StepController`].
///
/// Every answer change bumps [`FormSession::version`], clears that field's
/// error and recomputes the derived state before returning. A host that
/// validates off the UI thread keeps the version it started from and drops
/// the result unless [`FormSession::is_current`] still holds.
#[derive(Debug, Clone)]
pub struct FormSession {
    schema: FormSchema,
    fields: Vec<FormField>,
    answers: Answers,
    state: DerivedState,
    evaluator: RuleEvaluator,
    controller: StepController,
    version: u64,
}

impl FormSession {
    pub fn new(schema: FormSchema) -> Self {
        Self::with_config(schema, &InterpreterConfig::default())
    }

    pub fn with_config(schema: FormSchema, config: &InterpreterConfig) -> Self {
        let fields = schema.all_fields();
        let evaluator = RuleEvaluator::new(config);
        let answers = Answers::new();
        let state = evaluator.evaluate(&schema.rules, &answers, &fields);
        let controller = StepController::with_compiler(schema.page_count(), ValidatorCompiler::new(config));
        Self {
            schema,
            fields,
            answers,
            state,
            evaluator,
            controller,
            version: 0,
        }
    }

    /// Starts from previously saved answers.
    pub fn with_answers(mut self, answers: Answers) -> Self {
        self.answers = answers;
        self.version += 1;
        self.recompute();
        self
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.controller.set_today(today);
        self
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn answers(&self) -> &Answers {
        &self.answers
    }

    pub fn answer(&self, field_id: &str) -> Option<&AnswerValue> {
        self.answers.get(field_id)
    }

    pub fn state(&self) -> &DerivedState {
        &self.state
    }

    pub fn step(&self) -> usize {
        self.controller.step()
    }

    pub fn errors(&self) -> &BTreeMap<String, String> {
        self.controller.errors()
    }

    pub fn controller(&self) -> &StepController {
        &self.controller
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_current(&self, version: u64) -> bool {
        self.version == version
    }

    pub fn set_answer(&mut self, field_id: impl Into<String>, value: impl Into<AnswerValue>) -> u64 {
        let field_id = field_id.into();
        self.controller.answer_changed(&field_id);
        self.answers.insert(field_id, value.into());
        self.version += 1;
        self.recompute();
        self.version
    }

    pub fn clear_answer(&mut self, field_id: &str) -> u64 {
        self.controller.answer_changed(field_id);
        self.answers.remove(field_id);
        self.version += 1;
        self.recompute();
        self.version
    }

    fn recompute(&mut self) {
        self.state = self
            .evaluator
            .evaluate(&self.schema.rules, &self.answers, &self.fields);
        debug!(
            version = self.version,
            visible = self.state.visible_field_ids.len(),
            required = self.state.required_field_ids.len(),
            "derived state recomputed"
        );
    }

    pub fn trace(&self) -> EvaluationTrace {
        self.evaluator
            .evaluate_with_trace(&self.schema.rules, &self.answers, &self.fields)
    }

    pub fn validators(&self) -> ValidatorSet {
        self.controller.compiler().compile_state(&self.fields, &self.state)
    }

    /// Validates the current page without touching the error map.
    pub fn validate_current_page(&self) -> PageValidation {
        validate_page_with(
            self.controller.compiler(),
            &self.schema,
            &self.answers,
            self.controller.step(),
            &self.state.visible_field_ids,
            &self.state.required_field_ids,
        )
    }

    pub fn next(&mut self) -> Navigation {
        self.controller.next(&self.schema, &self.answers, &self.state)
    }

    pub fn back(&mut self) -> Navigation {
        self.controller.back()
    }

    pub fn jump_to(&mut self, step: usize) -> InternalResult<Navigation> {
        self.controller.jump_to(step)
    }

    pub fn submit(&mut self) -> SubmitOutcome {
        self.controller.submit(&self.schema, &self.answers, &self.state)
    }

    pub fn submit_to(&mut self, sink: &mut dyn SubmissionSink) -> InternalResult<SubmitOutcome> {
        self.controller
            .submit_to(&self.schema, &self.answers, &self.state, sink)
    }
}
