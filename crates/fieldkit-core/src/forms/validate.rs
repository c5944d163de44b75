use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::models::{QuestionType, TemplateStructure};

/// Structural problems in a template, in discovery order.
pub fn template_problems(template: &TemplateStructure) -> Vec<String> {
    let mut problems = Vec::new();
    let mut seen = HashSet::new();

    for question in template.questions() {
        if question.id.trim().is_empty() {
            problems.push(format!("Question \"{}\" has an empty id", question.label));
        } else if !seen.insert(question.id.as_str()) {
            problems.push(format!("Duplicate question id {}", question.id));
        }

        if matches!(question.kind, QuestionType::Select | QuestionType::Multiselect)
            && question.options().is_empty()
        {
            problems.push(format!("Question {} has no options", question.id));
        }

        if question.weight.is_some_and(|weight| !weight.is_finite() || weight < 0.0) {
            problems.push(format!("Question {} has an invalid weight", question.id));
        }
    }

    for (index, rule) in template.logic.iter().enumerate() {
        let name = rule
            .id
            .clone()
            .unwrap_or_else(|| format!("#{}", index + 1));

        if !seen.contains(rule.target_id.as_str()) {
            problems.push(format!(
                "Rule {name} targets unknown question {}",
                rule.target_id
            ));
        }
        for condition in &rule.conditions {
            if !seen.contains(condition.question_id.as_str()) {
                problems.push(format!(
                    "Rule {name} reads unknown question {}",
                    condition.question_id
                ));
            }
        }
    }

    problems
}

/// Reject templates with duplicate ids or dangling rule references.
pub fn validate_template(template: &TemplateStructure) -> Result<()> {
    let problems = template_problems(template);
    if problems.is_empty() {
        Ok(())
    } else {
        Err(Error::InvalidInput(problems.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
    {
      "pages": [{ "id": "p1", "title": "Exterior", "sections": [{ "id": "s1", "title": "Walls",
        "items": [
          { "id": "siding", "type": "select", "label": "Siding",
            "options": [{ "value": "vinyl", "score": 5 }, { "value": "wood", "score": 3 }] },
          { "id": "cracks", "type": "text", "label": "Cracks" }
        ] }] }],
      "logic": [{ "conditions": [{ "questionId": "siding", "operator": "equals", "value": "wood" }],
                  "action": "require", "targetId": "cracks" }]
    }
    "#;

    #[test]
    fn valid_template_passes() {
        let template = TemplateStructure::from_json(VALID).unwrap();
        assert!(template_problems(&template).is_empty());
        validate_template(&template).unwrap();
    }

    #[test]
    fn reports_duplicates_and_dangling_references() {
        let mut template = TemplateStructure::from_json(VALID).unwrap();
        let duplicate = template.pages[0].sections[0].items[1].clone();
        template.pages[0].sections[0].items.push(duplicate);
        template.logic[0].target_id = "windows".to_string();
        template.pages[0].sections[0].items[0].options = Some(Vec::new());

        let problems = template_problems(&template);
        assert_eq!(
            problems,
            vec![
                "Question siding has no options".to_string(),
                "Duplicate question id cracks".to_string(),
                "Rule #1 targets unknown question windows".to_string(),
            ]
        );

        let error = validate_template(&template).unwrap_err();
        assert!(matches!(error, Error::InvalidInput(message) if message.contains("windows")));
    }
}
