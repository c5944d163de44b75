//! Inspection form logic: conditional visibility, scoring and validation.
//!
//! Everything here is pure and cheap enough to run on every answer change.

mod logic;
mod score;
mod validate;

pub use logic::{evaluate_logic, missing_required, QuestionState, QuestionStates};
pub use score::{calculate_score, ScoreSummary};
pub use validate::{template_problems, validate_template};
