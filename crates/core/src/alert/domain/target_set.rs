use std::collections::BTreeSet;

use crate::shared::constants::DEFAULT_TARGET_LABELS;

/// Immutable watch-list of alarm-worthy class labels.
///
/// Labels are trimmed and lower-cased on construction; blank entries are
/// dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetSet {
    labels: BTreeSet<String>,
}

impl TargetSet {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let labels = labels
            .into_iter()
            .map(|l| normalize(l.as_ref()))
            .filter(|l| !l.is_empty())
            .collect();
        Self { labels }
    }

    /// Normalized lookup: `label` is lower-cased before comparison.
    pub fn contains(&self, label: &str) -> bool {
        self.labels.contains(&normalize(label))
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

impl Default for TargetSet {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_LABELS.iter().copied())
    }
}

fn normalize(label: &str) -> String {
    label.trim().to_lowercase()
}
