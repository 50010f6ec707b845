//! Execution-strategy resolution.
//!
//! For one staged operation the resolver applies meta options, decides
//! between immediate execution, returning bytes, and creating a schedule,
//! runs that strategy once, and folds every result (errors and panics
//! included) into an [`ExecutionReport`].

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use futures_util::FutureExt;
use ledgerkit_core::{
    KeyError, LedgerError, OperationKind, OperationPolicy, Receipt, Signer, StagedOperation,
    TransactionId,
};
use tracing::{error, info, info_span, warn, Instrument};

use crate::config::OperatingMode;
use crate::context::AgentContext;
use crate::deadline::{within, Deadline, DeadlineElapsed};
use crate::meta::{MetaOptions, MetaOptionsApplier};
use crate::outcome::{ExecutionOutcome, ExecutionReport};
use crate::schedule::{ScheduleComposer, ScheduleError, ScheduleOptions};
use crate::stage::{Notes, Staged, StagingError};

// ---------------------------------------------------------------------------
// Strategy decision
// ---------------------------------------------------------------------------

/// The delivery strategy chosen for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Execute,
    ReturnBytes,
    ScheduleCreate,
    /// Return-bytes mode cannot carry an operation that needs several
    /// network operations.
    RejectMultiStep,
}

impl Strategy {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Execute => "execute",
            Self::ReturnBytes => "return_bytes",
            Self::ScheduleCreate => "schedule_create",
            Self::RejectMultiStep => "reject_multi_step",
        }
    }
}

/// Picks the strategy for an operation.
///
/// Autonomous mode always executes, whatever the policy or schedule request.
/// In return-bytes mode multi-step operations are rejected, and the rest are
/// scheduled when requested (or by default) unless the kind is never
/// scheduled.
#[must_use]
pub fn decide(
    mode: OperatingMode,
    policy: OperationPolicy,
    schedule: Option<bool>,
    schedule_by_default: bool,
) -> Strategy {
    match mode {
        OperatingMode::Autonomous => Strategy::Execute,
        OperatingMode::ReturnBytes if policy.requires_multiple_operations => {
            Strategy::RejectMultiStep
        }
        OperatingMode::ReturnBytes => {
            if !policy.never_schedule && schedule.unwrap_or(schedule_by_default) {
                Strategy::ScheduleCreate
            } else {
                Strategy::ReturnBytes
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Everything that can end an execution attempt unsuccessfully.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Staging(#[from] StagingError),
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error("no signer is configured to submit the operation")]
    NoSigner,
    #[error(
        "{kind} needs more than one network operation and cannot be returned as a single \
         transaction; it requires autonomous mode"
    )]
    MultiStepUnsupportedInBytesMode { kind: &'static str },
    #[error("{source}")]
    Ledger {
        source: LedgerError,
        transaction_id: Option<TransactionId>,
    },
    #[error("schedule creation succeeded but the receipt carries no schedule id")]
    MissingScheduleId { transaction_id: TransactionId },
    #[error("operation did not finish within its {budget_ms}ms deadline")]
    DeadlineExceeded {
        budget_ms: u64,
        transaction_id: Option<TransactionId>,
    },
    #[error("internal error: {0}")]
    Panicked(String),
}

impl ExecutionError {
    /// Transaction id assigned before the failure, if any.
    #[must_use]
    pub fn transaction_id(&self) -> Option<TransactionId> {
        match self {
            Self::Ledger { transaction_id, .. }
            | Self::DeadlineExceeded { transaction_id, .. } => *transaction_id,
            Self::MissingScheduleId { transaction_id } => Some(*transaction_id),
            _ => None,
        }
    }

    #[must_use]
    pub fn requires_autonomous(&self) -> bool {
        matches!(self, Self::MultiStepUnsupportedInBytesMode { .. })
    }
}

impl ExecutionError {
    fn elapsed(elapsed: DeadlineElapsed, transaction_id: Option<TransactionId>) -> Self {
        Self::DeadlineExceeded {
            budget_ms: elapsed.budget_ms,
            transaction_id,
        }
    }
}

impl From<ExecutionError> for ExecutionOutcome {
    fn from(err: ExecutionError) -> Self {
        Self::Failed {
            error: err.to_string(),
            transaction_id: err.transaction_id(),
            requires_autonomous: err.requires_autonomous(),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "operation panicked".to_string())
}

// ---------------------------------------------------------------------------
// ExecutionResolver
// ---------------------------------------------------------------------------

/// Runs exactly one strategy per staged operation and never lets a fault
/// escape: the returned report is always well formed.
///
/// A deadline bounds the collaborator calls (submission, directory lookup)
/// rather than the whole attempt, so an expiry still reports the notes and
/// any transaction id already assigned.
#[derive(Debug, Clone)]
pub struct ExecutionResolver {
    ctx: AgentContext,
    deadline_ms: Option<u64>,
}

impl ExecutionResolver {
    #[must_use]
    pub fn new(ctx: AgentContext) -> Self {
        Self {
            ctx,
            deadline_ms: None,
        }
    }

    /// Bounds each later execution to `deadline_ms`, counted from the
    /// moment it starts.
    #[must_use]
    pub fn with_deadline(mut self, deadline_ms: Option<u64>) -> Self {
        self.deadline_ms = deadline_ms;
        self
    }

    #[must_use]
    pub fn context(&self) -> &AgentContext {
        &self.ctx
    }

    /// Delivers `staged` with the strategy chosen by [`decide`].
    pub async fn execute(&self, staged: Staged, meta: &MetaOptions) -> ExecutionReport {
        self.run(staged, meta, None).await
    }

    /// Submits `staged` immediately, signed and paid by `signer`, regardless
    /// of the operating mode. Sentinel keys resolve to `signer`'s key.
    pub async fn execute_with_signer(
        &self,
        staged: Staged,
        meta: &MetaOptions,
        signer: Arc<dyn Signer>,
    ) -> ExecutionReport {
        Self::new(self.ctx.clone().with_signer(signer))
            .with_deadline(self.deadline_ms)
            .run(staged, meta, Some(Strategy::Execute))
            .await
    }

    /// Serializes `staged` for an external signer regardless of the
    /// operating mode.
    ///
    /// # Errors
    ///
    /// Returns `SignerUnavailable` for an unresolvable key sentinel and
    /// `MultiStepUnsupportedInBytesMode` for operations that cannot travel
    /// as one transaction.
    pub fn get_bytes(&self, staged: Staged, meta: &MetaOptions) -> Result<String, ExecutionError> {
        let mut op = staged.operation;
        self.applier().apply(&mut op, meta)?;
        if self.policy(&op).requires_multiple_operations {
            return Err(ExecutionError::MultiStepUnsupportedInBytesMode {
                kind: op.kind().label(),
            });
        }
        self.return_bytes(op).map(|(bytes, _)| bytes)
    }

    async fn run(&self, staged: Staged, meta: &MetaOptions, forced: Option<Strategy>) -> ExecutionReport {
        let Staged {
            operation,
            mut notes,
        } = staged;
        let kind = operation.kind();
        let span = info_span!("execute", kind = kind.label(), strategy = tracing::field::Empty);
        let deadline = self.deadline_ms.map(Deadline::after_ms);

        let attempt = self
            .attempt(operation, meta, forced, deadline, &mut notes)
            .instrument(span);
        let outcome = match AssertUnwindSafe(attempt).catch_unwind().await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => {
                warn!(kind = kind.label(), error = %err, "operation failed");
                ExecutionOutcome::from(err)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(kind = kind.label(), panic = %message, "operation panicked");
                ExecutionOutcome::from(ExecutionError::Panicked(message))
            }
        };

        ExecutionReport {
            outcome,
            notes: notes.into_vec(),
        }
    }

    async fn attempt(
        &self,
        mut op: StagedOperation,
        meta: &MetaOptions,
        forced: Option<Strategy>,
        deadline: Option<Deadline>,
        notes: &mut Notes,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        self.applier().apply(&mut op, meta)?;

        let config = &self.ctx.config;
        let strategy = forced.unwrap_or_else(|| {
            decide(config.mode, self.policy(&op), meta.schedule, config.schedule_by_default)
        });
        tracing::Span::current().record("strategy", strategy.label());
        info!(strategy = strategy.label(), "execution strategy selected");

        match strategy {
            Strategy::Execute => {
                let (receipt, transaction_id) = self.submit(op, deadline).await?;
                Ok(ExecutionOutcome::Executed {
                    receipt,
                    transaction_id,
                })
            }
            Strategy::RejectMultiStep => Err(ExecutionError::MultiStepUnsupportedInBytesMode {
                kind: op.kind().label(),
            }),
            Strategy::ReturnBytes => {
                let (transaction_bytes, transaction_id) = self.return_bytes(op)?;
                Ok(ExecutionOutcome::BytesReturned {
                    transaction_bytes,
                    transaction_id,
                })
            }
            Strategy::ScheduleCreate => self.create_schedule(op, meta, deadline, notes).await,
        }
    }

    fn applier(&self) -> MetaOptionsApplier {
        MetaOptionsApplier::new(self.ctx.key_resolver())
    }

    fn policy(&self, op: &StagedOperation) -> OperationPolicy {
        op.body.policy(self.ctx.config.file_chunk_size)
    }

    async fn submit(
        &self,
        mut op: StagedOperation,
        deadline: Option<Deadline>,
    ) -> Result<(Receipt, TransactionId), ExecutionError> {
        let signer = self.ctx.signer.clone().ok_or(ExecutionError::NoSigner)?;
        let transaction_id = self
            .ctx
            .client
            .freeze(&mut op, signer.account_id())
            .map_err(|source| ExecutionError::Ledger {
                source,
                transaction_id: op.transaction_id,
            })?;
        let receipt = within(deadline, self.ctx.client.submit(&op, signer.as_ref()))
            .await
            .map_err(|elapsed| {
                warn!(transaction_id = %transaction_id, budget_ms = elapsed.budget_ms, "submission outlived its deadline");
                ExecutionError::elapsed(elapsed, Some(transaction_id))
            })?
            .map_err(|source| ExecutionError::Ledger {
                source,
                transaction_id: Some(transaction_id),
            })?;
        if !receipt.is_success() {
            return Err(ExecutionError::Ledger {
                source: LedgerError::Rejected {
                    status: receipt.status,
                },
                transaction_id: Some(transaction_id),
            });
        }
        info!(transaction_id = %transaction_id, status = %receipt.status, "operation executed");
        Ok((receipt, transaction_id))
    }

    fn return_bytes(&self, mut op: StagedOperation) -> Result<(String, Option<TransactionId>), ExecutionError> {
        if op.transaction_id.is_none() {
            if let Some(payer) = self.ctx.acting_account().or_else(|| self.ctx.operator_account()) {
                op.transaction_id = Some(TransactionId::generate(payer, self.ctx.clock.as_ref()));
            }
        }
        let bytes = self
            .ctx
            .client
            .serialize(&op)
            .map_err(|source| ExecutionError::Ledger {
                source,
                transaction_id: op.transaction_id,
            })?;
        Ok((STANDARD.encode(bytes), op.transaction_id))
    }

    async fn create_schedule(
        &self,
        op: StagedOperation,
        meta: &MetaOptions,
        deadline: Option<Deadline>,
        notes: &mut Notes,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        let options = ScheduleOptions::from_meta(meta);
        let composed = ScheduleComposer::new(&self.ctx)
            .with_deadline(deadline)
            .compose(op, &options, notes)
            .await?;
        let mut outer = composed.operation;
        // An explicit schedule admin key may itself be the sentinel.
        self.applier().substitute_operator_keys(&mut outer)?;

        let (receipt, transaction_id) = self.submit(outer, deadline).await?;
        let schedule_id = receipt
            .schedule_id
            .ok_or(ExecutionError::MissingScheduleId { transaction_id })?;
        Ok(ExecutionOutcome::ScheduleCreated {
            schedule_id,
            transaction_id,
            description: describe_schedule(
                composed.inner_kind,
                options.memo.as_deref(),
                composed.inner_payer,
            ),
        })
    }
}

fn describe_schedule(
    kind: OperationKind,
    memo: Option<&str>,
    inner_payer: ledgerkit_core::AccountId,
) -> String {
    let memo = memo.map(|m| format!(" with memo \"{m}\"")).unwrap_or_default();
    format!(
        "Scheduled {} created{memo}. Once it collects the required signatures it executes \
         and its fees are paid by {inner_payer}.",
        kind.label()
    )
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use ledgerkit_core::operation::{
        FileCreate, OperationBody, ScheduleTarget, TokenCreate, TokenKeys, TokenType, SupplyType,
        TopicDelete, TopicMessageSubmit,
    };
    use ledgerkit_core::{
        codec, AccountId, EntityId, FixedClock, Key, KeyAlgorithm, KeyValue, LedgerClient,
        PublicKey,
    };
    use proptest::prelude::{any, prop_assert_eq, proptest};
    use proptest::strategy::Strategy as _;

    use super::*;
    use crate::config::AgentConfig;
    use crate::sandbox::{SandboxLedger, StaticDirectory, StaticSigner};

    const NOW: u64 = 1_700_000_000_000_000_000;

    fn key(fill: u8) -> PublicKey {
        PublicKey {
            algorithm: KeyAlgorithm::Ed25519,
            bytes: vec![fill; 32],
        }
    }

    struct Harness {
        ledger: Arc<SandboxLedger>,
        ctx: AgentContext,
    }

    fn harness(config: AgentConfig) -> Harness {
        let clock = Arc::new(FixedClock::new(NOW));
        let ledger = Arc::new(SandboxLedger::new(clock.clone()));
        let ctx = AgentContext::new(config, ledger.clone())
            .with_clock(clock)
            .with_signer(Arc::new(StaticSigner::new(EntityId::num(2), Some(key(1)))));
        Harness { ledger, ctx }
    }

    fn bytes_mode(schedule_by_default: bool) -> AgentConfig {
        AgentConfig {
            mode: OperatingMode::ReturnBytes,
            schedule_by_default,
            ..AgentConfig::default()
        }
    }

    fn topic_message() -> Staged {
        Staged::new(OperationBody::TopicMessageSubmit(TopicMessageSubmit {
            topic_id: EntityId::num(600),
            message: b"hello".to_vec(),
        }))
    }

    fn large_file() -> Staged {
        Staged::new(OperationBody::FileCreate(FileCreate {
            keys: Vec::new(),
            contents: vec![1; 5000],
            file_memo: None,
        }))
    }

    fn token_with_sentinel() -> Staged {
        Staged::new(OperationBody::TokenCreate(TokenCreate {
            name: "Gold".into(),
            symbol: "GLD".into(),
            token_type: TokenType::FungibleCommon,
            decimals: 2,
            initial_supply: 100,
            supply_type: SupplyType::Infinite,
            max_supply: None,
            treasury_account_id: EntityId::num(2),
            keys: TokenKeys {
                admin_key: Some(KeyValue::OperatorKey),
                ..TokenKeys::default()
            },
            freeze_default: false,
            token_memo: None,
        }))
    }

    fn policy_strategy() -> impl proptest::strategy::Strategy<Value = OperationPolicy> {
        (any::<bool>(), any::<bool>()).prop_map(|(never_schedule, requires_multiple_operations)| {
            OperationPolicy {
                never_schedule,
                requires_multiple_operations,
            }
        })
    }

    proptest! {
        #[test]
        fn never_schedule_kinds_never_schedule_in_bytes_mode(
            schedule in proptest::option::of(any::<bool>()),
            default in any::<bool>(),
        ) {
            let policy = OperationPolicy { never_schedule: true, requires_multiple_operations: false };
            prop_assert_eq!(
                decide(OperatingMode::ReturnBytes, policy, schedule, default),
                super::Strategy::ReturnBytes
            );
        }

        #[test]
        fn multi_step_is_always_rejected_in_bytes_mode(
            never_schedule in any::<bool>(),
            schedule in proptest::option::of(any::<bool>()),
            default in any::<bool>(),
        ) {
            let policy = OperationPolicy { never_schedule, requires_multiple_operations: true };
            prop_assert_eq!(
                decide(OperatingMode::ReturnBytes, policy, schedule, default),
                super::Strategy::RejectMultiStep
            );
        }

        #[test]
        fn autonomous_always_executes(
            policy in policy_strategy(),
            schedule in proptest::option::of(any::<bool>()),
            default in any::<bool>(),
        ) {
            prop_assert_eq!(
                decide(OperatingMode::Autonomous, policy, schedule, default),
                super::Strategy::Execute
            );
        }
    }

    #[test]
    fn explicit_schedule_request_overrides_default() {
        let policy = OperationPolicy::default();
        assert_eq!(
            decide(OperatingMode::ReturnBytes, policy, Some(false), true),
            super::Strategy::ReturnBytes
        );
        assert_eq!(
            decide(OperatingMode::ReturnBytes, policy, Some(true), false),
            super::Strategy::ScheduleCreate
        );
        assert_eq!(
            decide(OperatingMode::ReturnBytes, policy, None, true),
            super::Strategy::ScheduleCreate
        );
    }

    #[tokio::test]
    async fn autonomous_success_returns_receipt_and_id() {
        let h = harness(AgentConfig::default());
        let report = ExecutionResolver::new(h.ctx.clone())
            .execute(topic_message(), &MetaOptions::schedule(true))
            .await;

        let ExecutionOutcome::Executed {
            receipt,
            transaction_id,
        } = &report.outcome
        else {
            panic!("expected execution, got {:?}", report.outcome);
        };
        assert!(receipt.is_success());
        assert_eq!(transaction_id.account_id, EntityId::num(2));
        assert!(report.notes.is_empty());
        assert_eq!(h.ledger.submissions().len(), 1);
    }

    #[tokio::test]
    async fn autonomous_failure_keeps_transaction_id_and_notes() {
        let h = harness(AgentConfig::default());
        h.ledger.fail_next(LedgerError::Rejected {
            status: "INVALID_TOPIC_ID".into(),
        });

        let report = ExecutionResolver::new(h.ctx.clone())
            .execute(topic_message().with_note("defaulted"), &MetaOptions::default())
            .await;

        let record = report.into_record();
        assert!(!record.success);
        assert!(record.error.unwrap().contains("INVALID_TOPIC_ID"));
        assert!(record.transaction_id.is_some());
        assert_eq!(record.notes, vec!["defaulted".to_string()]);
    }

    #[tokio::test]
    async fn bytes_mode_returns_base64_without_submitting() {
        let h = harness(bytes_mode(false));
        let record = ExecutionResolver::new(h.ctx.clone())
            .execute(topic_message(), &MetaOptions::default())
            .await
            .into_record();

        assert!(record.success);
        assert!(record.transaction_bytes.is_some());
        assert_eq!(record.transaction_id.map(|t| t.account_id), Some(EntityId::num(2)));
        assert!(h.ledger.submissions().is_empty());
    }

    #[tokio::test]
    async fn returned_bytes_round_trip_through_the_ledger() {
        let h = harness(bytes_mode(false));
        let staged = token_with_sentinel();
        let original = staged.operation.body.clone();
        let meta = MetaOptions {
            memo: Some("round trip".into()),
            ..MetaOptions::default()
        };

        let record = ExecutionResolver::new(h.ctx.clone())
            .execute(staged, &meta)
            .await
            .into_record();
        let bytes = STANDARD.decode(record.transaction_bytes.unwrap()).unwrap();
        let decoded = codec::decode(&bytes).unwrap();

        assert_eq!(decoded.memo.as_deref(), Some("round trip"));
        assert_eq!(decoded.transaction_id, record.transaction_id);
        let OperationBody::TokenCreate(token) = &decoded.body else {
            panic!("expected token create");
        };
        assert_eq!(token.keys.admin_key, Some(KeyValue::from(key(1))));
        let OperationBody::TokenCreate(before) = original else {
            unreachable!()
        };
        assert_eq!(token.name, before.name);
        assert_eq!(token.initial_supply, before.initial_supply);

        let signer = StaticSigner::new(EntityId::num(2), Some(key(1)));
        let receipt = h.ledger.submit(&decoded, &signer).await.unwrap();
        assert!(receipt.token_id.is_some());
    }

    #[tokio::test]
    async fn multi_step_rejected_in_bytes_mode_regardless_of_meta() {
        let h = harness(bytes_mode(true));
        for meta in [MetaOptions::default(), MetaOptions::schedule(true), MetaOptions::schedule(false)] {
            let record = ExecutionResolver::new(h.ctx.clone())
                .execute(large_file().with_note("n"), &meta)
                .await
                .into_record();
            assert!(!record.success);
            assert_eq!(record.requires_autonomous, Some(true));
            assert_eq!(record.notes, vec!["n".to_string()]);
        }
        assert!(h.ledger.submissions().is_empty());
    }

    #[tokio::test]
    async fn schedule_family_returns_bytes_even_when_scheduling_requested() {
        let h = harness(bytes_mode(true));
        let staged = Staged::new(OperationBody::ScheduleSign(ScheduleTarget {
            schedule_id: EntityId::num(44),
        }));
        let report = ExecutionResolver::new(h.ctx.clone())
            .execute(staged, &MetaOptions::schedule(true))
            .await;
        assert!(matches!(report.outcome, ExecutionOutcome::BytesReturned { .. }));
    }

    #[tokio::test]
    async fn scheduling_with_known_counterparty_gives_joint_control() {
        let mut config = bytes_mode(true);
        config.acting_account = Some(EntityId::num(1001));
        let h = harness(config);
        let directory = StaticDirectory::new();
        directory.insert(EntityId::num(1001), key(9));
        let ctx = h.ctx.clone().with_directory(Arc::new(directory));

        let record = ExecutionResolver::new(ctx)
            .execute(topic_message(), &MetaOptions::default())
            .await
            .into_record();

        assert!(record.success, "{:?}", record.error);
        assert!(record.schedule_id.is_some());
        assert!(record.description.unwrap().contains("0.0.1001"));
        assert!(record.notes.iter().any(|n| n.contains("joint control")));

        let submitted = h.ledger.submissions();
        let OperationBody::ScheduleCreate(schedule) = &submitted[0].body else {
            panic!("expected a schedule create submission");
        };
        let admin = schedule.admin_key.as_ref().and_then(KeyValue::as_key).unwrap();
        assert_eq!(admin.leaf_count(), 2);
        assert!(matches!(*schedule.scheduled, OperationBody::TopicMessageSubmit(_)));
    }

    #[tokio::test]
    async fn missing_schedule_id_is_a_failure() {
        let h = harness(bytes_mode(true));
        h.ledger.withhold_schedule_ids(true);

        let record = ExecutionResolver::new(h.ctx.clone())
            .execute(topic_message(), &MetaOptions::default())
            .await
            .into_record();

        assert!(!record.success);
        assert!(record.error.unwrap().contains("no schedule id"));
        assert!(record.transaction_id.is_some());
        assert!(record.notes.iter().any(|n| n.contains("operator account 0.0.2")));
    }

    #[tokio::test]
    async fn sentinel_without_signer_fails_instead_of_leaking() {
        let h = harness(bytes_mode(false));
        let mut ctx = h.ctx.clone();
        ctx.signer = None;

        let record = ExecutionResolver::new(ctx)
            .execute(token_with_sentinel(), &MetaOptions::default())
            .await
            .into_record();

        assert!(!record.success);
        assert_eq!(record.error.as_deref(), Some(KeyError::SignerUnavailable.to_string().as_str()));
        assert!(record.transaction_bytes.is_none());
    }

    #[tokio::test]
    async fn execute_with_signer_ignores_mode_and_uses_other_identity() {
        let h = harness(bytes_mode(true));
        let other: Arc<dyn Signer> = Arc::new(StaticSigner::new(EntityId::num(3030), Some(key(5))));

        let report = ExecutionResolver::new(h.ctx.clone())
            .execute_with_signer(token_with_sentinel(), &MetaOptions::default(), other)
            .await;

        assert_eq!(
            report.outcome.transaction_id().map(|t| t.account_id),
            Some(EntityId::num(3030))
        );
        let submitted = h.ledger.submissions();
        let OperationBody::TokenCreate(token) = &submitted[0].body else {
            panic!("expected token create");
        };
        assert_eq!(token.keys.admin_key, Some(KeyValue::Key(Key::Single(key(5)))));
    }

    #[tokio::test]
    async fn get_bytes_rejects_multi_step() {
        let h = harness(AgentConfig::default());
        let resolver = ExecutionResolver::new(h.ctx.clone());
        let err = resolver.get_bytes(large_file(), &MetaOptions::default()).unwrap_err();
        assert!(err.requires_autonomous());
        assert!(resolver.get_bytes(topic_message(), &MetaOptions::default()).is_ok());
    }

    struct PanickingLedger {
        panicked: AtomicBool,
    }

    #[async_trait]
    impl LedgerClient for PanickingLedger {
        fn freeze(&self, op: &mut StagedOperation, payer: AccountId) -> Result<TransactionId, LedgerError> {
            let id = TransactionId::generate(payer, &FixedClock::new(NOW));
            op.transaction_id = Some(id);
            Ok(id)
        }

        async fn submit(&self, _op: &StagedOperation, _signer: &dyn Signer) -> Result<Receipt, LedgerError> {
            self.panicked.store(true, Ordering::SeqCst);
            panic!("connection pool poisoned");
        }
    }

    #[tokio::test]
    async fn collaborator_panic_becomes_failed_outcome() {
        let ledger = Arc::new(PanickingLedger {
            panicked: AtomicBool::new(false),
        });
        let ctx = AgentContext::new(AgentConfig::default(), ledger.clone())
            .with_signer(Arc::new(StaticSigner::new(EntityId::num(2), Some(key(1)))));

        let staged = Staged::new(OperationBody::TopicDelete(TopicDelete {
            topic_id: EntityId::num(1),
        }))
        .with_note("kept");
        let record = ExecutionResolver::new(ctx)
            .execute(staged, &MetaOptions::default())
            .await
            .into_record();

        assert!(ledger.panicked.load(Ordering::SeqCst));
        assert!(!record.success);
        assert!(record.error.unwrap().contains("connection pool poisoned"));
        assert_eq!(record.notes, vec!["kept".to_string()]);
    }
    #[tokio::test]
    async fn schedule_without_operator_key_still_succeeds_and_says_so() {
        let h = harness(bytes_mode(true));
        let ctx = h
            .ctx
            .clone()
            .with_signer(Arc::new(StaticSigner::new(EntityId::num(2), None)));

        let record = ExecutionResolver::new(ctx)
            .execute(topic_message(), &MetaOptions::default())
            .await
            .into_record();

        assert!(record.success, "{:?}", record.error);
        assert!(record.schedule_id.is_some());
        assert!(record
            .notes
            .iter()
            .any(|n| n.starts_with("No admin key could be set")));
        let submitted = h.ledger.submissions();
        let OperationBody::ScheduleCreate(schedule) = &submitted[0].body else {
            panic!("expected a schedule create submission");
        };
        assert!(schedule.admin_key.is_none());
    }

    /// Sandbox ledger whose submissions take `delay` to come back.
    struct SlowLedger {
        inner: SandboxLedger,
        delay: Duration,
    }

    #[async_trait]
    impl LedgerClient for SlowLedger {
        fn freeze(&self, op: &mut StagedOperation, payer: AccountId) -> Result<TransactionId, LedgerError> {
            self.inner.freeze(op, payer)
        }

        async fn submit(&self, op: &StagedOperation, signer: &dyn Signer) -> Result<Receipt, LedgerError> {
            tokio::time::sleep(self.delay).await;
            self.inner.submit(op, signer).await
        }
    }

    fn slow_context(config: AgentConfig, delay: Duration) -> (Arc<SlowLedger>, AgentContext) {
        let clock = Arc::new(FixedClock::new(NOW));
        let ledger = Arc::new(SlowLedger {
            inner: SandboxLedger::new(clock.clone()),
            delay,
        });
        let ctx = AgentContext::new(config, ledger.clone())
            .with_clock(clock)
            .with_signer(Arc::new(StaticSigner::new(EntityId::num(2), Some(key(1)))));
        (ledger, ctx)
    }

    #[tokio::test(start_paused = true)]
    async fn submission_past_deadline_fails_with_id_and_notes() {
        let (ledger, ctx) = slow_context(AgentConfig::default(), Duration::from_millis(500));

        let report = ExecutionResolver::new(ctx)
            .with_deadline(Some(20))
            .execute(topic_message().with_note("defaulted"), &MetaOptions::default())
            .await;

        let record = report.into_record();
        assert!(!record.success);
        assert!(record.error.unwrap().contains("within its 20ms deadline"));
        assert_eq!(record.transaction_id.map(|t| t.account_id), Some(EntityId::num(2)));
        assert_eq!(record.notes, vec!["defaulted".to_string()]);
        assert!(ledger.inner.submissions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn submission_within_deadline_executes() {
        let (ledger, ctx) = slow_context(AgentConfig::default(), Duration::from_millis(500));

        let report = ExecutionResolver::new(ctx)
            .with_deadline(Some(2_000))
            .execute(topic_message(), &MetaOptions::default())
            .await;

        assert!(matches!(report.outcome, ExecutionOutcome::Executed { .. }));
        assert_eq!(ledger.inner.submissions().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn schedule_submission_past_deadline_keeps_schedule_notes() {
        let (_, ctx) = slow_context(bytes_mode(true), Duration::from_millis(500));

        let record = ExecutionResolver::new(ctx)
            .with_deadline(Some(20))
            .execute(topic_message(), &MetaOptions::default())
            .await
            .into_record();

        assert!(!record.success);
        assert!(record.schedule_id.is_none());
        assert!(record.transaction_id.is_some());
        assert!(record.notes.iter().any(|n| n.contains("operator account 0.0.2")));
    }
}
