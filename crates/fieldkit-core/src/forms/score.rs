use serde::Serialize;
use serde_json::Value;

use super::logic::{as_number, evaluate_logic};
use crate::models::{Answers, QuestionItem, QuestionType, TemplateStructure};

/// Weighted score over the visible scored questions
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSummary {
    pub score: f64,
    pub max_score: f64,
    /// `score / max_score * 100`, 0 when nothing is scorable
    pub percentage: f64,
}

const SLIDER_MAX: f64 = 100.0;

/// Score the answers, skipping questions hidden by the template's logic.
pub fn calculate_score(template: &TemplateStructure, answers: &Answers) -> ScoreSummary {
    let states = evaluate_logic(template, answers);
    let mut summary = ScoreSummary::default();

    for question in template.questions() {
        if !question.kind.is_scored() {
            continue;
        }
        if states.get(&question.id).is_some_and(|state| !state.visible) {
            continue;
        }

        let answer = answers.get(&question.id).map(|answer| &answer.value);
        let (actual, max) = match question.kind {
            QuestionType::Select => select_score(question, answer),
            QuestionType::Slider => (answer.and_then(as_number).unwrap_or(0.0), SLIDER_MAX),
            _ => continue,
        };

        let weight = question.weight();
        summary.score += actual * weight;
        summary.max_score += max * weight;
    }

    if summary.max_score > 0.0 {
        summary.percentage = summary.score / summary.max_score * 100.0;
    }
    summary
}

/// `(chosen option score, best option score)` for a select question.
fn select_score(question: &QuestionItem, answer: Option<&Value>) -> (f64, f64) {
    let options = question.options();
    let max = options
        .iter()
        .map(|option| option.score.unwrap_or(0.0))
        .reduce(f64::max)
        .unwrap_or(0.0);

    let chosen = answer.and_then(option_key).and_then(|key| {
        options
            .iter()
            .find(|option| option.value == key)
            .map(|option| option.score.unwrap_or(0.0))
    });

    (chosen.unwrap_or(0.0), max)
}

fn option_key(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        index_answers, Answer, LogicAction, LogicCondition, LogicOperator, LogicRule, Page,
        QuestionOption, Section,
    };
    use serde_json::json;

    fn yes_no(id: &str) -> QuestionItem {
        QuestionItem::new(id, QuestionType::Select, "Insulated?")
            .with_options(vec![QuestionOption::scored("Y", 10.0), QuestionOption::scored("N", 0.0)])
            .with_weight(2.0)
    }

    fn single_section(items: Vec<QuestionItem>, logic: Vec<LogicRule>) -> TemplateStructure {
        TemplateStructure {
            pages: vec![Page {
                id: "p1".to_string(),
                title: String::new(),
                sections: vec![Section {
                    id: "s1".to_string(),
                    title: String::new(),
                    items,
                }],
            }],
            logic,
        }
    }

    #[test]
    fn select_question_scores_weighted_option() {
        let template = single_section(vec![yes_no("q1")], vec![]);

        let unanswered = calculate_score(&template, &Answers::new());
        assert_eq!(
            unanswered,
            ScoreSummary {
                score: 0.0,
                max_score: 20.0,
                percentage: 0.0
            }
        );

        let answered = calculate_score(&template, &index_answers([Answer::new("q1", json!("Y"))]));
        assert_eq!(
            answered,
            ScoreSummary {
                score: 20.0,
                max_score: 20.0,
                percentage: 100.0
            }
        );
    }

    #[test]
    fn unmatched_select_answer_scores_zero() {
        let template = single_section(vec![yes_no("q1")], vec![]);
        let answers = index_answers([Answer::new("q1", json!("maybe"))]);
        let summary = calculate_score(&template, &answers);
        assert_eq!(summary.score, 0.0);
        assert_eq!(summary.max_score, 20.0);
    }

    #[test]
    fn slider_scores_against_hundred() {
        let template = single_section(
            vec![QuestionItem::new("coverage", QuestionType::Slider, "Coverage").with_weight(0.5)],
            vec![],
        );
        let summary = calculate_score(
            &template,
            &index_answers([Answer::new("coverage", json!(60))]),
        );
        assert_eq!(summary.score, 30.0);
        assert_eq!(summary.max_score, 50.0);
        assert!((summary.percentage - 60.0).abs() < 1e-9);
    }

    #[test]
    fn unscored_types_are_ignored() {
        let template = single_section(
            vec![
                QuestionItem::new("notes", QuestionType::Text, "Notes"),
                QuestionItem::new("count", QuestionType::Number, "Count"),
            ],
            vec![],
        );
        let answers = index_answers([
            Answer::new("notes", json!("drafty")),
            Answer::new("count", json!(4)),
        ]);
        assert_eq!(calculate_score(&template, &answers), ScoreSummary::default());
    }

    #[test]
    fn hidden_questions_are_excluded() {
        let template = single_section(
            vec![
                QuestionItem::new("has_attic", QuestionType::Text, "Attic present?"),
                yes_no("q1"),
            ],
            vec![LogicRule {
                id: Some("attic-only".to_string()),
                conditions: vec![LogicCondition {
                    question_id: "has_attic".to_string(),
                    operator: LogicOperator::Equals,
                    value: json!("yes"),
                }],
                action: LogicAction::Show,
                target_id: "q1".to_string(),
            }],
        );
        let answers = index_answers([
            Answer::new("has_attic", json!("no")),
            Answer::new("q1", json!("Y")),
        ]);

        assert_eq!(calculate_score(&template, &answers), ScoreSummary::default());
    }

    #[test]
    fn json_round_trip_scores_identically() {
        let template = single_section(
            vec![
                QuestionItem::new("has_attic", QuestionType::Text, "Attic present?"),
                yes_no("q1"),
                QuestionItem::new("coverage", QuestionType::Slider, "Coverage"),
            ],
            vec![LogicRule {
                id: None,
                conditions: vec![LogicCondition {
                    question_id: "has_attic".to_string(),
                    operator: LogicOperator::Equals,
                    value: json!("yes"),
                }],
                action: LogicAction::Show,
                target_id: "q1".to_string(),
            }],
        );
        let reparsed = TemplateStructure::from_json(&template.to_json().unwrap()).unwrap();
        assert_eq!(reparsed, template);

        for answers in [
            Answers::new(),
            index_answers([Answer::new("has_attic", json!("yes")), Answer::new("q1", json!("N"))]),
            index_answers([
                Answer::new("has_attic", json!("yes")),
                Answer::new("q1", json!("Y")),
                Answer::new("coverage", json!("75")),
            ]),
        ] {
            assert_eq!(evaluate_logic(&reparsed, &answers), evaluate_logic(&template, &answers));
            assert_eq!(calculate_score(&reparsed, &answers), calculate_score(&template, &answers));
        }
    }
}
