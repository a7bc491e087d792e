//! Email triage — classifies correspondence as actionable or not and
//! suggests a reply.

pub mod classifier;
pub mod config;
pub mod error;
pub mod input;
pub mod llm;

pub use error::{Error, Result};
