use std::collections::BTreeSet;

use formlogic::{
    compile, evaluate,
    rules::{Action, ActionType, Condition, ConditionGroup, Operator, Rule},
    step::{can_advance, validate_page, Navigation, SubmitOutcome},
    AnswerValue, Answers, FieldType, FormField, FormSchema, FormSession,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[ctor::ctor]
fn init_tests() {
    // テストの前に一度だけ実行したい処理
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

fn ids(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn answers(value: serde_json::Value) -> Answers {
    serde_json::from_value(value).unwrap()
}

#[test]
fn test_required_email_without_rules() {
    let fields = vec![FormField::new("email", FieldType::Email).required()];
    let state = evaluate(&[], &Answers::new(), &fields);
    assert_eq!(state.visible_field_ids, ids(&["email"]));
    assert_eq!(state.required_field_ids, ids(&["email"]));

    let validators = compile(&fields, &state.required_field_ids, &state.visible_field_ids);
    assert_eq!(
        validators.validate("email", Some(&AnswerValue::text(""))),
        Err("this field is required".to_string())
    );
    assert_eq!(
        validators.validate("email", Some(&AnswerValue::text("not-an-email"))),
        Err("please enter a valid email address".to_string())
    );
    assert_eq!(validators.validate("email", Some(&AnswerValue::text("a@b.com"))), Ok(()));
}

#[test]
fn test_conditional_require() {
    let fields = vec![
        FormField::new("country", FieldType::Select),
        FormField::new("state", FieldType::Text),
    ];
    let rules: Vec<Rule> = serde_json::from_value(json!([{
        "conditions": {
            "combinator": "and",
            "conditions": [{"fieldId": "country", "operator": "eq", "value": "US"}]
        },
        "actions": [{"type": "require", "targetFieldId": "state"}]
    }]))
    .unwrap();

    let us = evaluate(&rules, &answers(json!({"country": "US"})), &fields);
    assert!(us.is_required("state"));

    let ca = evaluate(&rules, &answers(json!({"country": "CA"})), &fields);
    assert!(!ca.is_required("state"));

    let intrinsic = vec![
        FormField::new("country", FieldType::Select),
        FormField::new("state", FieldType::Text).required(),
    ];
    let ca = evaluate(&rules, &answers(json!({"country": "CA"})), &intrinsic);
    assert!(ca.is_required("state"));
}

#[test]
fn test_hide_and_require_on_same_field() {
    let fields = vec![
        FormField::new("contact", FieldType::Radio),
        FormField::new("phone", FieldType::Text),
    ];
    let when_email = || {
        ConditionGroup::all(vec![Condition::new("contact", Operator::Eq, json!("email")).into()])
    };
    let rules = vec![
        Rule::new(when_email(), vec![Action::new(ActionType::Hide, "phone")]),
        Rule::new(when_email(), vec![Action::new(ActionType::Require, "phone")]),
    ];

    let state = evaluate(&rules, &answers(json!({"contact": "email"})), &fields);
    assert_eq!(state.visible_field_ids, ids(&["contact"]));

    let validators = compile(&fields, &state.required_field_ids, &state.visible_field_ids);
    assert_eq!(validators.validate("phone", None), Ok(()));
    assert_eq!(validators.validate("phone", Some(&AnswerValue::text(""))), Ok(()));
    assert_eq!(validators.validate("phone", Some(&AnswerValue::Boolean(true))), Ok(()));
}

#[test]
fn test_checkbox_with_options() {
    let fields = vec![FormField::new("consent", FieldType::Checkbox)
        .with_options(["a", "b"])
        .required()];
    let state = evaluate(&[], &Answers::new(), &fields);
    let validators = compile(&fields, &state.required_field_ids, &state.visible_field_ids);

    let empty = answers(json!({"consent": []}));
    assert_eq!(
        validators.validate("consent", empty.get("consent")),
        Err("select at least one".to_string())
    );
    let one = answers(json!({"consent": ["a"]}));
    assert_eq!(validators.validate("consent", one.get("consent")), Ok(()));
}

const TWO_PAGE_SCHEMA: &str = r#"{
    "id": "application",
    "pages": [
        {"id": "p1", "title": "About", "sections": [{"id": "s1", "rows": [
            {"fields": [{"id": "name", "type": "text", "label": "Name", "required": true}]},
            {"fields": [{"id": "intro", "type": "paragraph", "label": "Tell us about you"}]}
        ]}]},
        {"id": "p2", "title": "Experience", "sections": [{"id": "s2", "rows": [
            {"fields": [{"id": "years", "type": "number", "label": "Years", "required": true,
                         "validation": {"min": 0, "max": 60}}]},
            {"fields": [{"id": "portfolio", "type": "text", "label": "Portfolio"}]}
        ]}]}
    ],
    "rules": [{
        "conditions": {"combinator": "or", "conditions": [
            {"fieldId": "years", "operator": "gte", "value": 5}
        ]},
        "actions": [{"type": "require", "targetFieldId": "portfolio"}]
    }]
}"#;

#[test]
fn test_multi_page_navigation() {
    let schema = FormSchema::from_json(TWO_PAGE_SCHEMA).unwrap();
    let state = evaluate(&schema.rules, &Answers::new(), &schema.all_fields());

    let page = validate_page(
        &schema,
        &Answers::new(),
        0,
        &state.visible_field_ids,
        &state.required_field_ids,
    );
    assert!(!page.ok);
    assert_eq!(page.errors.keys().collect::<Vec<_>>(), vec!["name"]);
    assert!(!can_advance(
        &schema,
        &Answers::new(),
        0,
        &state.visible_field_ids,
        &state.required_field_ids
    ));

    let mut session = FormSession::new(schema);
    assert!(matches!(session.next(), Navigation::Blocked { .. }));
    assert_eq!(session.errors().get("name").map(String::as_str), Some("this field is required"));

    session.set_answer("name", "Grace");
    assert!(session.errors().is_empty());
    assert_eq!(session.next(), Navigation::Moved { from: 0, to: 1 });
    assert_eq!(session.step(), 1);

    assert_eq!(session.back(), Navigation::Moved { from: 1, to: 0 });
    assert_eq!(session.next(), Navigation::Moved { from: 0, to: 1 });

    session.set_answer("years", 7.0);
    assert!(session.state().is_required("portfolio"));
    assert!(matches!(session.next(), Navigation::Blocked { ref errors } if errors.contains_key("portfolio")));
    assert!(!session.errors().contains_key("name"));

    session.set_answer("years", 2.0);
    assert!(!session.state().is_required("portfolio"));
    match session.submit() {
        SubmitOutcome::Submitted(submission) => {
            assert_eq!(submission.form_id.as_deref(), Some("application"));
            assert_eq!(
                submission.answers.keys().collect::<Vec<_>>(),
                vec!["name", "years"]
            );
        }
        other => panic!("expected Submitted, got {:?}", other),
    }
}

#[test]
fn test_submit_sends_user_back_to_first_invalid_page() {
    let schema = FormSchema::from_json(TWO_PAGE_SCHEMA).unwrap();
    let mut session = FormSession::new(schema);
    session.set_answer("name", "Grace");
    session.next();
    session.set_answer("years", 3.0);
    session.clear_answer("name");

    match session.submit() {
        SubmitOutcome::Blocked {
            first_invalid_step,
            errors,
        } => {
            assert_eq!(first_invalid_step, 0);
            assert_eq!(errors.keys().collect::<Vec<_>>(), vec!["name"]);
        }
        other => panic!("expected Blocked, got {:?}", other),
    }
    // editing page 1 leaves the page 0 error in place
    session.set_answer("years", 4.0);
    assert_eq!(session.next(), Navigation::Unchanged { step: 1 });
    assert!(session.errors().contains_key("name"));

    assert_eq!(session.jump_to(0).unwrap(), Navigation::Moved { from: 1, to: 0 });
}
