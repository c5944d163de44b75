//! Data models for Fieldkit

mod mutation;
mod photo;
mod settings;
mod template;

pub use mutation::{FailedMutation, MutationId, MutationItem, MutationKind, Resource};
pub use photo::{photo_mime_type, PhotoId, UnsyncedPhoto};
pub use settings::{RetryPolicy, SyncSettings};
pub use template::{
    index_answers, Answer, Answers, LogicAction, LogicCondition, LogicOperator, LogicRule, Page,
    QuestionItem, QuestionOption, QuestionType, Section, TemplateStructure,
};
