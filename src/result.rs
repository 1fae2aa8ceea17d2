use crate::error::DecodeError;
use crate::schema::System;

/// A document that was skipped because it failed to decode
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// Arrival index of the document in the cursor
    pub position: usize,
    pub error: DecodeError,
}

/// Decode outcome tagged with the document's arrival index
pub type Tagged = (usize, Result<System, DecodeError>);

/// Systems decoded by one run, in cursor arrival order, plus the documents
/// that were skipped. Duplicate ids are passed through untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    systems: Vec<System>,
    diagnostics: Vec<Diagnostic>,
    truncated: bool,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one decode outcome. Must be called in arrival order.
    pub fn push(&mut self, position: usize, outcome: Result<System, DecodeError>) {
        match outcome {
            Ok(system) => self.systems.push(system),
            Err(error) => self.diagnostics.push(Diagnostic { position, error }),
        }
    }

    /// Record outcomes that may have been produced out of order
    pub fn extend_tagged(&mut self, mut outcomes: Vec<Tagged>) {
        outcomes.sort_by_key(|(position, _)| *position);
        for (position, outcome) in outcomes {
            self.push(position, outcome);
        }
    }

    pub(crate) fn into_truncated(mut self) -> Self {
        self.truncated = true;
        self
    }

    pub fn systems(&self) -> &[System] {
        &self.systems
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// True when the run stopped early and this holds only what arrived first
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, System> {
        self.systems.iter()
    }

    pub fn into_parts(self) -> (Vec<System>, Vec<Diagnostic>) {
        (self.systems, self.diagnostics)
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a System;
    type IntoIter = std::slice::Iter<'a, System>;

    fn into_iter(self) -> Self::IntoIter {
        self.systems.iter()
    }
}
