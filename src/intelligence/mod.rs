//! Rule evaluation: profile + guideline table -> recommendation set.

pub mod engine;
pub mod messages;

pub use engine::evaluate;
pub use messages::MessageTemplates;
