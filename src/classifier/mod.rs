//! Classification and reply engine.
//!
//! Every message flows through:
//! 1. `prompt` — fixed template, raw text embedded verbatim
//! 2. `llm::FailoverChain` — primary provider, then fallback
//! 3. `parser` — JSON extraction, shape dispatch, rule-based repair
//! 4. `rules` — keyword scoring over `normalizer` output, used whenever
//!    the model is unavailable or its answer is unusable
//!
//! `processor::EmailClassifier` ties these together and guarantees a
//! well-formed result.

pub mod normalizer;
pub mod parser;
pub mod processor;
pub mod prompt;
pub mod rules;
pub mod types;

pub use normalizer::{Normalizer, normalize};
pub use processor::EmailClassifier;
pub use rules::RuleClassifier;
pub use types::{Classification, ClassificationItem, ClassificationResult};
