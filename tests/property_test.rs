use std::collections::BTreeSet;

use formlogic::{
    compile, evaluate,
    rules::{Action, ActionType, Condition, ConditionGroup, ConditionNode, Operator, Rule},
    schema::Page,
    step::validate_page,
    AnswerValue, Answers, FieldType, FormField, FormSchema,
};
use proptest::prelude::*;
use serde_json::json;

const FIELD_COUNT: usize = 8;
// f0..f3 may be targeted by actions, f4..f7 never are
const TARGETABLE: usize = 4;

fn field_id(i: usize) -> String {
    format!("f{}", i)
}

fn arb_fields() -> impl Strategy<Value = Vec<FormField>> {
    prop::collection::vec(any::<bool>(), FIELD_COUNT).prop_map(|required| {
        required
            .into_iter()
            .enumerate()
            .map(|(i, req)| {
                let field = FormField::new(field_id(i), FieldType::Text);
                if req {
                    field.required()
                } else {
                    field
                }
            })
            .collect()
    })
}

fn arb_answer() -> impl Strategy<Value = AnswerValue> {
    prop_oneof![
        Just(AnswerValue::Null),
        Just(AnswerValue::text("")),
        Just(AnswerValue::text("yes")),
        Just(AnswerValue::text("3")),
        (-5.0..5.0f64).prop_map(AnswerValue::Number),
        any::<bool>().prop_map(AnswerValue::Boolean),
        Just(AnswerValue::list(["a", "b"])),
    ]
}

fn arb_answers() -> impl Strategy<Value = Answers> {
    prop::collection::hash_map((0..FIELD_COUNT).prop_map(field_id), arb_answer(), 0..FIELD_COUNT)
}

fn arb_operator() -> impl Strategy<Value = Operator> {
    prop_oneof![
        Just(Operator::Eq),
        Just(Operator::Neq),
        Just(Operator::Contains),
        Just(Operator::In),
        Just(Operator::IsEmpty),
        Just(Operator::IsNotEmpty),
        Just(Operator::Gt),
        Just(Operator::Gte),
        Just(Operator::Lt),
        Just(Operator::Lte),
    ]
}

fn arb_condition_value() -> impl Strategy<Value = serde_json::Value> {
    prop_oneof![
        Just(json!("yes")),
        Just(json!(3)),
        Just(json!(true)),
        Just(json!(["yes", "a"])),
        Just(json!(null)),
    ]
}

fn arb_condition() -> impl Strategy<Value = ConditionNode> {
    (0..FIELD_COUNT + 1, arb_operator(), arb_condition_value())
        .prop_map(|(i, op, value)| Condition::new(field_id(i), op, value).into())
}

fn arb_group() -> impl Strategy<Value = ConditionGroup> {
    let leaf = prop::collection::vec(arb_condition(), 0..3).prop_map(ConditionGroup::all);
    leaf.prop_recursive(3, 16, 3, |inner| {
        (
            any::<bool>(),
            prop::collection::vec(
                prop_oneof![arb_condition(), inner.prop_map(ConditionNode::from)],
                0..3,
            ),
        )
            .prop_map(|(any_of, nodes)| {
                if any_of {
                    ConditionGroup::any(nodes)
                } else {
                    ConditionGroup::all(nodes)
                }
            })
    })
}

fn arb_action() -> impl Strategy<Value = Action> {
    (
        prop_oneof![
            Just(ActionType::Hide),
            Just(ActionType::Show),
            Just(ActionType::Require),
            Just(ActionType::Optional),
        ],
        0..TARGETABLE,
    )
        .prop_map(|(action_type, i)| Action::new(action_type, field_id(i)))
}

fn arb_rules() -> impl Strategy<Value = Vec<Rule>> {
    prop::collection::vec(
        (arb_group(), prop::collection::vec(arb_action(), 1..3))
            .prop_map(|(conditions, actions)| Rule::new(conditions, actions)),
        0..6,
    )
}

fn always() -> ConditionGroup {
    ConditionGroup::all(vec![])
}

proptest! {
    #[test]
    fn evaluate_is_idempotent(
        fields in arb_fields(),
        rules in arb_rules(),
        answers in arb_answers(),
    ) {
        let first = evaluate(&rules, &answers, &fields);
        let second = evaluate(&rules, &answers, &fields);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn untargeted_fields_keep_intrinsic_state(
        fields in arb_fields(),
        rules in arb_rules(),
        answers in arb_answers(),
    ) {
        let state = evaluate(&rules, &answers, &fields);
        for field in &fields[TARGETABLE..] {
            prop_assert!(state.is_visible(&field.id));
            prop_assert_eq!(state.is_required(&field.id), field.required);
        }
    }

    #[test]
    fn optional_beats_require(
        fields in arb_fields(),
        rules in arb_rules(),
        answers in arb_answers(),
        target in 0..TARGETABLE,
    ) {
        let mut rules = rules;
        rules.push(Rule::new(always(), vec![Action::new(ActionType::Require, field_id(target))]));
        rules.push(Rule::new(always(), vec![Action::new(ActionType::Optional, field_id(target))]));
        let state = evaluate(&rules, &answers, &fields);
        prop_assert!(!state.is_required(&field_id(target)));
    }

    #[test]
    fn hide_beats_show(
        fields in arb_fields(),
        rules in arb_rules(),
        answers in arb_answers(),
        target in 0..TARGETABLE,
    ) {
        let mut rules = rules;
        rules.insert(0, Rule::new(always(), vec![Action::new(ActionType::Hide, field_id(target))]));
        rules.push(Rule::new(always(), vec![Action::new(ActionType::Show, field_id(target))]));
        let state = evaluate(&rules, &answers, &fields);
        prop_assert!(!state.is_visible(&field_id(target)));
    }

    #[test]
    fn hidden_validators_accept_anything(
        fields in arb_fields(),
        rules in arb_rules(),
        answers in arb_answers(),
        value in arb_answer(),
    ) {
        let state = evaluate(&rules, &answers, &fields);
        let validators = compile(&fields, &state.required_field_ids, &state.visible_field_ids);
        for field in fields.iter().filter(|f| !state.is_visible(&f.id)) {
            prop_assert_eq!(validators.validate(&field.id, None), Ok(()));
            prop_assert_eq!(validators.validate(&field.id, Some(&value)), Ok(()));
        }
    }

    #[test]
    fn page_errors_only_for_page_and_visible_fields(
        fields in arb_fields(),
        rules in arb_rules(),
        answers in arb_answers(),
        split in 0..FIELD_COUNT,
    ) {
        let schema = FormSchema::new(vec![
            Page::new("first", "First").with_fields(fields[..split].to_vec()),
            Page::new("second", "Second").with_fields(fields[split..].to_vec()),
        ]);
        let state = evaluate(&rules, &answers, &schema.all_fields());
        for step in 0..2 {
            let page_ids: BTreeSet<String> = schema.page_field_ids(step).into_iter().collect();
            let result = validate_page(
                &schema,
                &answers,
                step,
                &state.visible_field_ids,
                &state.required_field_ids,
            );
            prop_assert_eq!(result.ok, result.errors.is_empty());
            for id in result.errors.keys() {
                prop_assert!(page_ids.contains(id));
                prop_assert!(state.is_visible(id));
            }
        }
    }
}
