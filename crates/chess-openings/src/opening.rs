//! Core opening types.

use serde::{Deserialize, Serialize};

/// A named opening as recorded in the reference database.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpeningEntry {
    /// The ECO code for this opening (e.g., "B01", "C44").
    pub eco: String,
    /// The name of the opening.
    pub name: String,
    /// The variation within the opening, when the reference names one.
    #[serde(default)]
    pub variation: Option<String>,
}

impl OpeningEntry {
    /// Creates an opening entry without a variation.
    #[must_use]
    pub fn new(eco: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            eco: eco.into(),
            name: name.into(),
            variation: None,
        }
    }

    /// Sets the variation name.
    #[must_use]
    pub fn with_variation(mut self, variation: impl Into<String>) -> Self {
        self.variation = Some(variation.into());
        self
    }

    /// The "name - variation" label, if this entry has a variation.
    #[must_use]
    pub fn variation_label(&self) -> Option<String> {
        self.variation
            .as_ref()
            .map(|v| format!("{} - {}", self.name, v))
    }

    /// Every label this entry contributes to: the opening name, followed by
    /// the "name - variation" label when a variation is present.
    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        let mut labels = vec![self.name.clone()];
        labels.extend(self.variation_label());
        labels
    }
}
