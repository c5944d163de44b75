pub mod common;
pub mod completions;
pub mod enqueue;
pub mod failed;
pub mod photo;
pub mod queue;
pub mod settings;
pub mod sync;
pub mod template;
