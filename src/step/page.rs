use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use crate::schema::{FormField, FormSchema};
use crate::validation::ValidatorCompiler;
use crate::value::Answers;

/// Outcome of validating one page, or every page at submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageValidation {
    pub ok: bool,
    /// field id → message, only for fields that were validated
    pub errors: BTreeMap<String, String>,
}

impl PageValidation {
    fn from_errors(errors: BTreeMap<String, String>) -> Self {
        Self {
            ok: errors.is_empty(),
            errors,
        }
    }
}

/// Validates the visible fields of `schema.pages[step]`.
pub fn validate_page(
    schema: &FormSchema,
    answers: &Answers,
    step: usize,
    visible_field_ids: &BTreeSet<String>,
    required_field_ids: &BTreeSet<String>,
) -> PageValidation {
    validate_page_with(
        &ValidatorCompiler::default(),
        schema,
        answers,
        step,
        visible_field_ids,
        required_field_ids,
    )
}

#[tracing::instrument(level = "debug", skip_all, fields(step = step))]
pub fn validate_page_with(
    compiler: &ValidatorCompiler,
    schema: &FormSchema,
    answers: &Answers,
    step: usize,
    visible_field_ids: &BTreeSet<String>,
    required_field_ids: &BTreeSet<String>,
) -> PageValidation {
    let fields: Vec<FormField> = schema
        .pages
        .get(step)
        .map(|page| page.fields().cloned().collect())
        .unwrap_or_default();
    if fields.is_empty() {
        debug!("step {} has no fields", step);
    }
    validate_fields(compiler, &fields, answers, visible_field_ids, required_field_ids)
}

/// Validates every visible field on every page.
pub fn validate_all(
    schema: &FormSchema,
    answers: &Answers,
    visible_field_ids: &BTreeSet<String>,
    required_field_ids: &BTreeSet<String>,
) -> PageValidation {
    validate_all_with(
        &ValidatorCompiler::default(),
        schema,
        answers,
        visible_field_ids,
        required_field_ids,
    )
}

#[tracing::instrument(level = "debug", skip_all)]
pub fn validate_all_with(
    compiler: &ValidatorCompiler,
    schema: &FormSchema,
    answers: &Answers,
    visible_field_ids: &BTreeSet<String>,
    required_field_ids: &BTreeSet<String>,
) -> PageValidation {
    validate_fields(
        compiler,
        &schema.all_fields(),
        answers,
        visible_field_ids,
        required_field_ids,
    )
}

fn validate_fields(
    compiler: &ValidatorCompiler,
    fields: &[FormField],
    answers: &Answers,
    visible_field_ids: &BTreeSet<String>,
    required_field_ids: &BTreeSet<String>,
) -> PageValidation {
    let validators = compiler.compile(fields, required_field_ids, visible_field_ids);
    let errors = validators.validate_answers(
        answers,
        fields
            .iter()
            .map(|f| f.id.as_str())
            .filter(|id| visible_field_ids.contains(*id)),
    );
    PageValidation::from_errors(errors)
}

pub fn can_advance(
    schema: &FormSchema,
    answers: &Answers,
    step: usize,
    visible_field_ids: &BTreeSet<String>,
    required_field_ids: &BTreeSet<String>,
) -> bool {
    validate_page(schema, answers, step, visible_field_ids, required_field_ids).ok
}

/// Only on the last page, and only when every page holds.
pub fn can_submit(
    schema: &FormSchema,
    answers: &Answers,
    step: usize,
    visible_field_ids: &BTreeSet<String>,
    required_field_ids: &BTreeSet<String>,
) -> bool {
    schema.page_count() > 0
        && step == schema.page_count() - 1
        && validate_all(schema, answers, visible_field_ids, required_field_ids).ok
}
