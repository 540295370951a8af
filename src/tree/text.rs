//! Element text content.
//!
//! Character data is kept as the runs the lexer delivered between tags.
//! Separate runs (text on both sides of a child element) stay distinct and
//! are never concatenated behind the caller's back.

use std::slice;

/// Non-empty text of an element.
///
/// Absence of text is `Option::<Text>::None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Text {
    /// Exactly one run.
    Single(String),
    /// Two or more runs in document order.
    Runs(Vec<String>),
}

impl Text {
    /// All runs in document order.
    pub fn as_slice(&self) -> &[String] {
        match self {
            Text::Single(run) => slice::from_ref(run),
            Text::Runs(runs) => runs,
        }
    }

    /// Runs joined with `separator`.
    pub fn join(&self, separator: &str) -> String {
        match self {
            Text::Single(run) => run.clone(),
            Text::Runs(runs) => runs.join(separator),
        }
    }

    /// Append a run: none becomes a single string, a second run turns the
    /// text into a list.
    pub(crate) fn append(slot: &mut Option<Text>, run: String) {
        *slot = Some(match slot.take() {
            None => Text::Single(run),
            Some(Text::Single(first)) => Text::Runs(vec![first, run]),
            Some(Text::Runs(mut runs)) => {
                runs.push(run);
                Text::Runs(runs)
            }
        });
    }
}

impl From<&str> for Text {
    fn from(run: &str) -> Self {
        Text::Single(run.to_string())
    }
}
