//! The single-slot operation stage and its notes side channel.
//!
//! Builders produce a [`Staged`] value (operation plus notes) and hand it to
//! an [`OperationStage`]; the resolver later takes it back out. Staging a new
//! operation always discards the previous one together with its notes.

use ledgerkit_core::{NodeId, OperationBody, StagedOperation, TransactionId};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Errors from stage mutators.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StagingError {
    #[error("no operation is staged; call a stage method first")]
    NoActiveOperation,
}

/// Ordered human-readable notes about defaults applied on the caller's behalf.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Notes(Vec<String>);

impl Notes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, note: impl Into<String>) {
        self.0.push(note.into());
    }

    /// Appends `other` after the existing notes.
    pub fn append(&mut self, other: Notes) {
        self.0.extend(other.0);
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl From<Vec<String>> for Notes {
    fn from(notes: Vec<String>) -> Self {
        Self(notes)
    }
}

/// A freshly built operation together with the notes its builder produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Staged {
    pub operation: StagedOperation,
    pub notes: Notes,
}

impl Staged {
    #[must_use]
    pub fn new(body: OperationBody) -> Self {
        Self {
            operation: StagedOperation::new(body),
            notes: Notes::new(),
        }
    }

    /// Adds a note, builder style.
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note);
        self
    }

    pub fn note(&mut self, note: impl Into<String>) {
        self.notes.push(note);
    }
}

/// Holds at most one staged operation and the notes that describe it.
#[derive(Debug, Default)]
pub struct OperationStage {
    current: Option<StagedOperation>,
    notes: Notes,
}

impl OperationStage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces whatever was staged, including its notes.
    pub fn stage(&mut self, staged: Staged) -> &StagedOperation {
        debug!(kind = staged.operation.kind().label(), notes = staged.notes.len(), "operation staged");
        self.notes = staged.notes;
        self.current.insert(staged.operation)
    }

    /// Drops the staged operation and all notes.
    pub fn reset(&mut self) {
        self.current = None;
        self.notes.clear();
    }

    /// The staged operation.
    ///
    /// # Errors
    ///
    /// Returns `StagingError::NoActiveOperation` when nothing is staged.
    pub fn current_operation(&self) -> Result<&StagedOperation, StagingError> {
        self.current.as_ref().ok_or(StagingError::NoActiveOperation)
    }

    fn current_mut(&mut self) -> Result<&mut StagedOperation, StagingError> {
        self.current.as_mut().ok_or(StagingError::NoActiveOperation)
    }

    /// # Errors
    ///
    /// Returns `StagingError::NoActiveOperation` when nothing is staged.
    pub fn set_memo(&mut self, memo: impl Into<String>) -> Result<(), StagingError> {
        self.current_mut()?.memo = Some(memo.into());
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `StagingError::NoActiveOperation` when nothing is staged.
    pub fn set_explicit_id(&mut self, id: TransactionId) -> Result<(), StagingError> {
        self.current_mut()?.transaction_id = Some(id);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `StagingError::NoActiveOperation` when nothing is staged.
    pub fn set_target_nodes(&mut self, nodes: Vec<NodeId>) -> Result<(), StagingError> {
        self.current_mut()?.node_account_ids = nodes;
        Ok(())
    }

    pub fn add_note(&mut self, note: impl Into<String>) {
        self.notes.push(note);
    }

    #[must_use]
    pub fn notes(&self) -> &[String] {
        self.notes.as_slice()
    }

    pub fn clear_notes(&mut self) {
        self.notes.clear();
    }

    /// Removes the staged operation and its notes for execution.
    ///
    /// # Errors
    ///
    /// Returns `StagingError::NoActiveOperation` when nothing is staged; the
    /// notes are left untouched in that case.
    pub fn take(&mut self) -> Result<Staged, StagingError> {
        let operation = self.current.take().ok_or(StagingError::NoActiveOperation)?;
        Ok(Staged {
            operation,
            notes: std::mem::take(&mut self.notes),
        })
    }
}
