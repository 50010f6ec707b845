//! Per-domain builders.
//!
//! A builder turns validated parameters into a [`Staged`] operation plus the
//! notes describing defaults it filled in. The free `stage` functions in
//! each domain module are pure; the builder structs wrap them with an
//! [`OperationStage`] and the [`StageBuilder`] execution facade.

use std::sync::Arc;

use async_trait::async_trait;
use ledgerkit_core::{
    AccountId, AmountError, IdParseError, KeyError, KeyInput, KeyResolver, KeyValue, NodeId,
    Signer, StagedOperation, TransactionId,
};

use crate::context::AgentContext;
use crate::meta::MetaOptions;
use crate::outcome::{ExecutionOutcome, ExecutionReport};
use crate::resolver::{ExecutionError, ExecutionResolver};
use crate::stage::{OperationStage, Staged, StagingError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from turning parameters into a staged operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    Amount(#[from] AmountError),
    #[error(transparent)]
    Id(#[from] IdParseError),
    #[error("invalid `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("`{field}` was not given and no signer or acting account is configured to default it to")]
    NoDefaultAccount { field: &'static str },
}

impl BuildError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// BuildContext
// ---------------------------------------------------------------------------

/// What a stage function may consult besides its parameters.
#[derive(Debug, Clone)]
pub struct BuildContext {
    resolver: KeyResolver,
    operator: Option<AccountId>,
    acting: Option<AccountId>,
}

impl BuildContext {
    #[must_use]
    pub fn new(ctx: &AgentContext) -> Self {
        Self {
            resolver: ctx.key_resolver(),
            operator: ctx.operator_account(),
            acting: ctx.acting_account(),
        }
    }

    /// Resolves a required key. The `current_signer` sentinel stays deferred.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::InvalidKeyFormat` for unparseable input.
    pub fn key(&self, input: &KeyInput) -> Result<KeyValue, BuildError> {
        Ok(self.resolver.resolve_deferred(input)?)
    }

    /// Resolves an optional key, dropping it with a warning when invalid.
    #[must_use]
    pub fn optional_key(&self, field: &str, input: Option<&KeyInput>) -> Option<KeyValue> {
        self.resolver.resolve_optional(field, input)
    }

    #[must_use]
    pub fn operator(&self) -> Option<AccountId> {
        self.operator
    }

    /// The account the user most plausibly means: the acting account, else
    /// the operator.
    #[must_use]
    pub fn default_account(&self) -> Option<AccountId> {
        self.acting.or(self.operator)
    }

    /// `given`, or [`Self::default_account`] with a note produced by `note`.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::NoDefaultAccount` when nothing is given and no
    /// default exists.
    pub fn account_or_default(
        &self,
        field: &'static str,
        given: Option<AccountId>,
        staged_notes: &mut Vec<String>,
        note: impl FnOnce(AccountId) -> String,
    ) -> Result<AccountId, BuildError> {
        if let Some(account) = given {
            return Ok(account);
        }
        let account = self
            .default_account()
            .ok_or(BuildError::NoDefaultAccount { field })?;
        staged_notes.push(note(account));
        Ok(account)
    }

    /// `given`, or the operator account with a note.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::NoDefaultAccount` when nothing is given and no
    /// signer is configured.
    pub fn account_or_operator(
        &self,
        field: &'static str,
        given: Option<AccountId>,
        staged_notes: &mut Vec<String>,
        note: impl FnOnce(AccountId) -> String,
    ) -> Result<AccountId, BuildError> {
        if let Some(account) = given {
            return Ok(account);
        }
        let account = self.operator.ok_or(BuildError::NoDefaultAccount { field })?;
        staged_notes.push(note(account));
        Ok(account)
    }
}

/// Collects notes while a stage function runs, then attaches them.
pub(crate) fn staged_with_notes(
    body: ledgerkit_core::OperationBody,
    notes: Vec<String>,
) -> Staged {
    Staged {
        operation: StagedOperation::new(body),
        notes: notes.into(),
    }
}

// ---------------------------------------------------------------------------
// StageBuilder facade
// ---------------------------------------------------------------------------

/// Execution surface shared by every domain builder.
///
/// Executing consumes the staged operation; stage again to retry.
#[async_trait]
pub trait StageBuilder: Send {
    fn stage(&self) -> &OperationStage;

    fn stage_mut(&mut self) -> &mut OperationStage;

    fn resolver(&self) -> &ExecutionResolver;

    /// # Errors
    ///
    /// Returns `StagingError::NoActiveOperation` when nothing is staged.
    fn current_operation(&self) -> Result<&StagedOperation, StagingError> {
        self.stage().current_operation()
    }

    /// # Errors
    ///
    /// Returns `StagingError::NoActiveOperation` when nothing is staged.
    fn set_memo(&mut self, memo: &str) -> Result<&mut Self, StagingError>
    where
        Self: Sized,
    {
        self.stage_mut().set_memo(memo)?;
        Ok(self)
    }

    /// # Errors
    ///
    /// Returns `StagingError::NoActiveOperation` when nothing is staged.
    fn set_explicit_id(&mut self, id: TransactionId) -> Result<&mut Self, StagingError>
    where
        Self: Sized,
    {
        self.stage_mut().set_explicit_id(id)?;
        Ok(self)
    }

    /// # Errors
    ///
    /// Returns `StagingError::NoActiveOperation` when nothing is staged.
    fn set_target_nodes(&mut self, nodes: Vec<NodeId>) -> Result<&mut Self, StagingError>
    where
        Self: Sized,
    {
        self.stage_mut().set_target_nodes(nodes)?;
        Ok(self)
    }

    fn notes(&self) -> &[String] {
        self.stage().notes()
    }

    fn add_note(&mut self, note: String) {
        self.stage_mut().add_note(note);
    }

    fn clear_notes(&mut self) {
        self.stage_mut().clear_notes();
    }

    /// Runs the staged operation with the strategy the agent configuration
    /// and `meta` select.
    async fn execute(&mut self, meta: &MetaOptions) -> ExecutionReport {
        let resolver = self.resolver().clone();
        match self.stage_mut().take() {
            Ok(staged) => resolver.execute(staged, meta).await,
            Err(err) => not_staged(err, self.stage()),
        }
    }

    /// Submits the staged operation immediately under `signer`.
    async fn execute_with_signer(
        &mut self,
        signer: Arc<dyn Signer>,
        meta: &MetaOptions,
    ) -> ExecutionReport {
        let resolver = self.resolver().clone();
        match self.stage_mut().take() {
            Ok(staged) => resolver.execute_with_signer(staged, meta, signer).await,
            Err(err) => not_staged(err, self.stage()),
        }
    }

    /// Base64 bytes of the staged operation for an external signer.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::Staging` when nothing is staged, otherwise
    /// whatever [`ExecutionResolver::get_bytes`] returns.
    fn get_bytes(&mut self, meta: &MetaOptions) -> Result<String, ExecutionError> {
        let staged = self.stage_mut().take()?;
        self.resolver().get_bytes(staged, meta)
    }
}

fn not_staged(err: StagingError, stage: &OperationStage) -> ExecutionReport {
    ExecutionReport {
        outcome: ExecutionOutcome::from(ExecutionError::from(err)),
        notes: stage.notes().to_vec(),
    }
}

/// Generates a builder struct with its stage slot, resolver and
/// [`StageBuilder`] impl.
macro_rules! domain_builder {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub struct $name {
            build: $crate::builders::BuildContext,
            stage: $crate::stage::OperationStage,
            resolver: $crate::resolver::ExecutionResolver,
        }

        impl $name {
            #[must_use]
            pub fn new(ctx: $crate::context::AgentContext) -> Self {
                Self {
                    build: $crate::builders::BuildContext::new(&ctx),
                    stage: $crate::stage::OperationStage::new(),
                    resolver: $crate::resolver::ExecutionResolver::new(ctx),
                }
            }

            /// Bounds later executions to `deadline_ms`, counted from the
            /// start of each execution.
            #[must_use]
            pub fn with_deadline(mut self, deadline_ms: Option<u64>) -> Self {
                self.resolver = self.resolver.with_deadline(deadline_ms);
                self
            }

            /// Clears the stage, then stages what `build` produces. On error
            /// the stage is left empty.
            fn restage(
                &mut self,
                build: impl FnOnce(
                    &$crate::builders::BuildContext,
                ) -> Result<$crate::stage::Staged, $crate::builders::BuildError>,
            ) -> Result<&mut Self, $crate::builders::BuildError> {
                self.stage.reset();
                let staged = build(&self.build)?;
                self.stage.stage(staged);
                Ok(self)
            }
        }

        impl $crate::builders::StageBuilder for $name {
            fn stage(&self) -> &$crate::stage::OperationStage {
                &self.stage
            }

            fn stage_mut(&mut self) -> &mut $crate::stage::OperationStage {
                &mut self.stage
            }

            fn resolver(&self) -> &$crate::resolver::ExecutionResolver {
                &self.resolver
            }
        }
    };
}

pub mod account;
pub mod contract;
pub mod file;
pub mod schedule;
pub mod token;
pub mod topic;

pub use account::{AccountAction, AccountBuilder};
pub use contract::{ContractAction, ContractBuilder};
pub use file::{FileAction, FileBuilder};
pub use schedule::{ScheduleAction, ScheduleBuilder};
pub use token::{TokenAction, TokenBuilder};
pub use topic::{TopicAction, TopicBuilder};
