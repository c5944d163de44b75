//! Inspection/report template schema
//!
//! The JSON shape of these types is the persisted report-template format, so
//! field names are camelCase on the wire.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Answers keyed by question id
pub type Answers = HashMap<String, Answer>;

/// Full template: an ordered page tree plus conditional logic
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateStructure {
    pub pages: Vec<Page>,
    #[serde(default)]
    pub logic: Vec<LogicRule>,
}

impl TemplateStructure {
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Every question in page, section, item order.
    pub fn questions(&self) -> impl Iterator<Item = &QuestionItem> {
        self.pages
            .iter()
            .flat_map(|page| page.sections.iter())
            .flat_map(|section| section.items.iter())
    }

    pub fn find_question(&self, id: &str) -> Option<&QuestionItem> {
        self.questions().find(|question| question.id == id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub items: Vec<QuestionItem>,
}

/// Input widget kind; only `Select` and `Slider` contribute to the score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Text,
    Number,
    Select,
    Multiselect,
    Photo,
    Signature,
    Slider,
}

impl QuestionType {
    pub const fn is_scored(self) -> bool {
        matches!(self, Self::Select | Self::Slider)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<QuestionOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    /// Score multiplier, 1 when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl QuestionItem {
    pub fn new(id: impl Into<String>, kind: QuestionType, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            label: label.into(),
            options: None,
            required: None,
            weight: None,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: Vec<QuestionOption>) -> Self {
        self.options = Some(options);
        self
    }

    #[must_use]
    pub const fn with_required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    #[must_use]
    pub const fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn is_required(&self) -> bool {
        self.required.unwrap_or(false)
    }

    pub fn weight(&self) -> f64 {
        self.weight.unwrap_or(1.0)
    }

    pub fn options(&self) -> &[QuestionOption] {
        self.options.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOption {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl QuestionOption {
    pub fn scored(value: impl Into<String>, score: f64) -> Self {
        Self {
            value: value.into(),
            label: None,
            score: Some(score),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicOperator {
    Equals,
    NotEquals,
    Contains,
    GreaterThan,
    LessThan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicAction {
    Show,
    Hide,
    Require,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogicCondition {
    pub question_id: String,
    pub operator: LogicOperator,
    pub value: serde_json::Value,
}

/// All `conditions` must hold for `action` to apply to `target_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogicRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub conditions: Vec<LogicCondition>,
    pub action: LogicAction,
    pub target_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub question_id: String,
    pub value: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<String>,
}

impl Answer {
    pub fn new(question_id: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            question_id: question_id.into(),
            value,
            notes: None,
            media: Vec::new(),
        }
    }
}

/// Index a list of answers by question id; later entries win.
pub fn index_answers(answers: impl IntoIterator<Item = Answer>) -> Answers {
    answers
        .into_iter()
        .map(|answer| (answer.question_id.clone(), answer))
        .collect()
}
