use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::models::{Answers, LogicAction, LogicCondition, LogicOperator, TemplateStructure};

/// Visibility and requiredness of a single question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuestionState {
    pub visible: bool,
    pub required: bool,
}

/// Question states keyed by question id
pub type QuestionStates = HashMap<String, QuestionState>;

/// Apply the template's logic rules to the current answers.
///
/// Rules run once, in declaration order. A rule reads answers, never the
/// states produced by earlier rules, and a later rule overrides an earlier
/// one for the same target. A `show` rule whose conditions fail hides its
/// target.
pub fn evaluate_logic(template: &TemplateStructure, answers: &Answers) -> QuestionStates {
    let mut states = template
        .questions()
        .map(|question| {
            (
                question.id.clone(),
                QuestionState {
                    visible: true,
                    required: question.is_required(),
                },
            )
        })
        .collect::<QuestionStates>();

    for rule in &template.logic {
        let holds = rule
            .conditions
            .iter()
            .all(|condition| condition_holds(condition, answers));

        let Some(target) = states.get_mut(&rule.target_id) else {
            continue;
        };

        match (rule.action, holds) {
            (LogicAction::Show, true) => target.visible = true,
            (LogicAction::Show, false) => target.visible = false,
            (LogicAction::Hide, true) => target.visible = false,
            (LogicAction::Require, true) => target.required = true,
            (LogicAction::Hide | LogicAction::Require, false) => {}
        }
    }

    states
}

/// Visible, required questions without a usable answer, in template order.
pub fn missing_required(template: &TemplateStructure, answers: &Answers) -> Vec<String> {
    let states = evaluate_logic(template, answers);
    template
        .questions()
        .filter(|question| {
            states
                .get(&question.id)
                .is_some_and(|state| state.visible && state.required)
        })
        .filter(|question| {
            answers
                .get(&question.id)
                .is_none_or(|answer| is_blank(&answer.value))
        })
        .map(|question| question.id.clone())
        .collect()
}

fn condition_holds(condition: &LogicCondition, answers: &Answers) -> bool {
    let Some(answer) = answers.get(&condition.question_id) else {
        return false;
    };
    let actual = &answer.value;
    if actual.is_null() {
        return false;
    }

    let expected = &condition.value;
    match condition.operator {
        LogicOperator::Equals => values_equal(actual, expected),
        LogicOperator::NotEquals => !values_equal(actual, expected),
        LogicOperator::Contains => contains(actual, expected),
        LogicOperator::GreaterThan => compare(actual, expected, |a, b| a > b),
        LogicOperator::LessThan => compare(actual, expected, |a, b| a < b),
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left.as_f64(), right.as_f64()) {
        (Some(left), Some(right)) => (left - right).abs() < f64::EPSILON,
        _ => left == right,
    }
}

fn contains(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::Array(items) => items.iter().any(|item| values_equal(item, needle)),
        Value::String(text) => needle.as_str().is_some_and(|needle| text.contains(needle)),
        _ => false,
    }
}

fn compare(left: &Value, right: &Value, op: impl Fn(f64, f64) -> bool) -> bool {
    match (as_number(left), as_number(right)) {
        (Some(left), Some(right)) => op(left, right),
        _ => false,
    }
}

/// Numeric view of an answer; numeric strings count.
pub(super) fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
