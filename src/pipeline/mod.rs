//! The three generation stages: component analysis, clarifying questions
//! and the final prompt build.

pub mod analyzer;
pub mod builder;
pub mod questions;

pub use analyzer::analyze;
pub use builder::build;
pub use questions::{generate_questions, output_format_question};
