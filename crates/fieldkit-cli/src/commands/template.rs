use std::path::Path;

use fieldkit_core::forms::{
    calculate_score, evaluate_logic, missing_required, template_problems, ScoreSummary,
};
use fieldkit_core::models::{index_answers, Answer, Answers, TemplateStructure};
use serde::Serialize;
use serde_json::Value;

use crate::error::CliError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRow {
    pub id: String,
    pub label: String,
    pub visible: bool,
    pub required: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateReport {
    pub questions: Vec<QuestionRow>,
    pub missing_required: Vec<String>,
    pub score: ScoreSummary,
}

pub fn run_template_check(path: &Path) -> Result<TemplateStructure, CliError> {
    let template = load_template(path)?;
    println!(
        "{}: {} page(s), {} question(s), {} rule(s)",
        path.display(),
        template.pages.len(),
        template.questions().count(),
        template.logic.len()
    );
    Ok(template)
}

pub fn run_template_score(
    template_path: &Path,
    answers_path: &Path,
    as_json: bool,
) -> Result<TemplateReport, CliError> {
    let template = load_template(template_path)?;
    let answers = parse_answers(&std::fs::read_to_string(answers_path)?)?;
    let report = build_report(&template, &answers);

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for row in &report.questions {
            let visibility = if row.visible { "shown" } else { "hidden" };
            let marker = if row.required { "*" } else { " " };
            println!("{marker} {:<16}  {visibility:<6}  {}", row.id, row.label);
        }
        if !report.missing_required.is_empty() {
            println!("missing required: {}", report.missing_required.join(", "));
        }
        println!(
            "score {:.1} / {:.1} ({:.1}%)",
            report.score.score, report.score.max_score, report.score.percentage
        );
    }
    Ok(report)
}

pub fn build_report(template: &TemplateStructure, answers: &Answers) -> TemplateReport {
    let states = evaluate_logic(template, answers);
    let questions = template
        .questions()
        .filter_map(|question| {
            states.get(&question.id).map(|state| QuestionRow {
                id: question.id.clone(),
                label: question.label.clone(),
                visible: state.visible,
                required: state.required,
            })
        })
        .collect();

    TemplateReport {
        questions,
        missing_required: missing_required(template, answers),
        score: calculate_score(template, answers),
    }
}

/// Load a template and reject structural problems.
pub fn load_template(path: &Path) -> Result<TemplateStructure, CliError> {
    let template = TemplateStructure::from_json(&std::fs::read_to_string(path)?)?;
    let problems = template_problems(&template);
    if problems.is_empty() {
        Ok(template)
    } else {
        Err(CliError::InvalidTemplate(problems.join("\n")))
    }
}

/// Accept either `[{questionId, value}, ...]` or `{questionId: value}`.
pub fn parse_answers(raw: &str) -> Result<Answers, CliError> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Array(items) => {
            let answers = items
                .into_iter()
                .map(serde_json::from_value::<Answer>)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| CliError::InvalidAnswers)?;
            Ok(index_answers(answers))
        }
        Value::Object(map) => Ok(index_answers(
            map.into_iter()
                .map(|(question_id, value)| Answer::new(question_id, value)),
        )),
        _ => Err(CliError::InvalidAnswers),
    }
}
