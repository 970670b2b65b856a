//! SC-008: Append-only, de-duplicated diagnostic list.

use indexmap::IndexSet;
use std::fmt;

/// Non-fatal diagnostics in first-seen order. Identical messages are kept once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Warnings {
    seen: IndexSet<String>,
}

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message. Returns `false` if it was already present.
    pub fn push(&mut self, message: impl Into<String>) -> bool {
        let message = message.into();
        tracing::trace!(%message, "template warning");
        self.seen.insert(message)
    }

    /// Record with format arguments: `warnings.pushf(format_args!(...))`.
    pub fn pushf(&mut self, args: fmt::Arguments<'_>) -> bool {
        self.push(args.to_string())
    }

    pub fn contains(&self, message: &str) -> bool {
        self.seen.contains(message)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.seen.iter().map(String::as_str)
    }

    pub fn into_vec(self) -> Vec<String> {
        self.seen.into_iter().collect()
    }
}
