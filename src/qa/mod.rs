//! Helpers around answer generation: context formatting and critique parsing

pub mod context;
pub mod critique;

pub use context::{citation, format_context, CONTEXT_SEPARATOR};
pub use critique::{parse_critique, should_revise, Critique, PARSE_ERROR_REASON};
