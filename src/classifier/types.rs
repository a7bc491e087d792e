//! Classification result types and their wire shape.

use serde::{Deserialize, Serialize};

use crate::error::ClassifyError;

/// The two categories a message can fall into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    /// Requires action or a reply.
    #[serde(rename = "Produtivo")]
    Productive,
    /// No action needed.
    #[serde(rename = "Improdutivo")]
    Unproductive,
}

impl Classification {
    /// Canonical wire label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Productive => "Produtivo",
            Self::Unproductive => "Improdutivo",
        }
    }

    /// Read a model-supplied label.
    ///
    /// Case-insensitive prefix match: `prod…` is Productive, `improd…` is
    /// Unproductive, anything else is `None`. The `prod` check runs first.
    pub fn from_label(value: &str) -> Option<Self> {
        let lower = value.trim().to_lowercase();
        if lower.starts_with("prod") {
            Some(Self::Productive)
        } else if lower.starts_with("improd") {
            Some(Self::Unproductive)
        } else {
            None
        }
    }

    /// Lenient variant used for list items: anything not `prod…` is Unproductive.
    pub fn from_label_lenient(value: &str) -> Self {
        if value.trim().to_lowercase().starts_with("prod") {
            Self::Productive
        } else {
            Self::Unproductive
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One sub-message of a multi-result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationItem {
    /// 1-based position in the completion.
    pub id: u32,
    pub classification: Classification,
    pub suggested_response: String,
}

/// Output of the engine.
///
/// Built through [`ClassificationResult::single`] or
/// [`ClassificationResult::multiple`], which keep `items` present exactly
/// when `is_multiple` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub classification: Classification,
    pub suggested_response: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_multiple: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<ClassificationItem>>,
}

impl ClassificationResult {
    pub fn single(classification: Classification, suggested_response: impl Into<String>) -> Self {
        Self {
            classification,
            suggested_response: suggested_response.into(),
            is_multiple: false,
            items: None,
        }
    }

    /// Aggregate items: Productive if any item is Productive. The top-level
    /// response is taken from the first item sharing the overall label.
    ///
    /// Callers must pass at least one item.
    pub fn multiple(items: Vec<ClassificationItem>) -> Self {
        let classification = if items
            .iter()
            .any(|i| i.classification == Classification::Productive)
        {
            Classification::Productive
        } else {
            Classification::Unproductive
        };
        let suggested_response = items
            .iter()
            .find(|i| i.classification == classification)
            .map(|i| i.suggested_response.clone())
            .unwrap_or_default();

        Self {
            classification,
            suggested_response,
            is_multiple: true,
            items: Some(items),
        }
    }

    /// Check the structural invariants.
    pub fn validate(&self) -> Result<(), ClassifyError> {
        if self.suggested_response.trim().is_empty() {
            return Err(ClassifyError::InvalidResult(
                "suggested_response is empty".into(),
            ));
        }
        match (&self.items, self.is_multiple) {
            (Some(items), true) => {
                if items.is_empty() {
                    return Err(ClassifyError::InvalidResult(
                        "multi-result has no items".into(),
                    ));
                }
                for (index, item) in items.iter().enumerate() {
                    if item.id as usize != index + 1 {
                        return Err(ClassifyError::InvalidResult(format!(
                            "item at position {} has id {}",
                            index + 1,
                            item.id
                        )));
                    }
                }
                Ok(())
            }
            (None, false) => Ok(()),
            (Some(_), false) => Err(ClassifyError::InvalidResult(
                "items present on a single result".into(),
            )),
            (None, true) => Err(ClassifyError::InvalidResult(
                "is_multiple set without items".into(),
            )),
        }
    }
}
