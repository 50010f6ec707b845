//! Wrapping a staged operation into a schedule create.
//!
//! The composer picks the fee payer for the schedule creation and builds a
//! threshold-1 admin key from the operator and, when the agent acts for a
//! user, that user's key as published by the directory. Directory failures
//! degrade the authorization and leave a note; they never fail composition.

use ledgerkit_core::operation::ScheduleCreate;
use ledgerkit_core::{
    AccountId, DirectoryService, Key, KeyInput, KeyList, KeyResolver, KeyValue, OperationBody,
    OperationKind, PublicKey, StagedOperation, TransactionId,
};
use tracing::{info, warn};

use crate::context::AgentContext;
use crate::deadline::{within, Deadline};
use crate::meta::MetaOptions;
use crate::stage::Notes;

/// Schedule-specific options, parsed from [`MetaOptions`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleOptions {
    pub memo: Option<String>,
    pub payer: Option<AccountId>,
    pub admin_key: Option<KeyInput>,
    pub wait_for_expiry: bool,
}

impl ScheduleOptions {
    /// Extracts schedule options; an unparseable payer is logged and dropped.
    #[must_use]
    pub fn from_meta(meta: &MetaOptions) -> Self {
        let payer = meta.schedule_payer.as_deref().and_then(|raw| {
            raw.parse::<AccountId>()
                .inspect_err(|err| warn!(schedule_payer = raw, error = %err, "ignoring malformed schedule payer"))
                .ok()
        });
        Self {
            memo: meta.schedule_memo.clone(),
            payer,
            admin_key: meta.schedule_admin_key.clone(),
            wait_for_expiry: meta.wait_for_expiry.unwrap_or(false),
        }
    }
}

/// Result of a best-effort counterparty key lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CounterpartyKey {
    Resolved(PublicKey),
    Unavailable { reason: String },
}

/// Looks up `account`'s public key, turning any failure (an elapsed
/// deadline included) into `Unavailable`.
pub async fn lookup_counterparty(
    directory: &dyn DirectoryService,
    account: &AccountId,
    deadline: Option<Deadline>,
) -> CounterpartyKey {
    match within(deadline, directory.lookup_public_key(account)).await {
        Ok(Ok(key)) => CounterpartyKey::Resolved(key),
        Err(elapsed) => {
            warn!(account = %account, budget_ms = elapsed.budget_ms, "counterparty key lookup timed out");
            CounterpartyKey::Unavailable {
                reason: format!("lookup timed out: {elapsed}"),
            }
        }
        Ok(Err(err)) => {
            warn!(account = %account, error = %err, "counterparty key lookup failed");
            CounterpartyKey::Unavailable {
                reason: format!("{err:#}"),
            }
        }
    }
}

/// The set of keys that jointly control a schedule; any one of them suffices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleAuthorization {
    keys: Vec<PublicKey>,
}

impl ScheduleAuthorization {
    pub fn push(&mut self, key: PublicKey) {
        if !self.keys.contains(&key) {
            self.keys.push(key);
        }
    }

    #[must_use]
    pub fn keys(&self) -> &[PublicKey] {
        &self.keys
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The threshold-1 key list, or `None` when no key was collected.
    #[must_use]
    pub fn into_key(self) -> Option<Key> {
        if self.keys.is_empty() {
            return None;
        }
        Some(Key::List(KeyList {
            threshold: 1,
            keys: self.keys.into_iter().map(Key::Single).collect(),
        }))
    }
}

/// A composed schedule create, ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedSchedule {
    pub operation: StagedOperation,
    /// Kind of the wrapped operation.
    pub inner_kind: OperationKind,
    /// Account that pays for the wrapped operation once it executes.
    pub inner_payer: AccountId,
    /// Account that pays for creating the schedule.
    pub payer: AccountId,
}

/// Errors that prevent composing a schedule at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("no account available to pay for the schedule: configure a signer or an acting account")]
    NoPayer,
    #[error("{kind} operations cannot be scheduled")]
    Unschedulable { kind: &'static str },
}

/// Builds schedule creates around staged operations.
pub struct ScheduleComposer<'a> {
    ctx: &'a AgentContext,
    resolver: KeyResolver,
    deadline: Option<Deadline>,
}

impl<'a> ScheduleComposer<'a> {
    #[must_use]
    pub fn new(ctx: &'a AgentContext) -> Self {
        Self {
            ctx,
            resolver: ctx.key_resolver(),
            deadline: None,
        }
    }

    /// Bounds the counterparty key lookup.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Option<Deadline>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Wraps `operation` in a schedule create. Notes about payer and
    /// authorization choices are appended to `notes`.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleError::NoPayer` when neither an acting account, an
    /// explicit payer nor an operator is available, and `Unschedulable` for
    /// schedule-family operations.
    pub async fn compose(
        &self,
        operation: StagedOperation,
        options: &ScheduleOptions,
        notes: &mut Notes,
    ) -> Result<ComposedSchedule, ScheduleError> {
        let inner_kind = operation.kind();
        if inner_kind.never_schedule() {
            return Err(ScheduleError::Unschedulable {
                kind: inner_kind.label(),
            });
        }
        let acting = self.ctx.acting_account();
        let operator = self.ctx.operator_account();

        let payer = acting
            .or(options.payer)
            .or(operator)
            .ok_or(ScheduleError::NoPayer)?;
        if acting.is_none() && options.payer.is_none() {
            notes.push(format!(
                "The schedule creation fee is paid by the operator account {payer}."
            ));
        }

        let StagedOperation {
            body,
            transaction_id,
            memo,
            node_account_ids,
        } = operation;
        let scheduled_transaction_id = transaction_id.or_else(|| {
            acting.map(|account| TransactionId {
                scheduled: true,
                ..TransactionId::generate(account, self.ctx.clock.as_ref())
            })
        });
        let inner_payer = scheduled_transaction_id.map_or(payer, |id| id.account_id);

        let admin_key = self.admin_key(options, acting, notes).await;

        let schedule = ScheduleCreate {
            scheduled: Box::new(body),
            scheduled_transaction_id,
            scheduled_memo: memo,
            schedule_memo: options.memo.clone(),
            payer_account_id: payer,
            admin_key,
            wait_for_expiry: options.wait_for_expiry,
        };
        let mut outer = StagedOperation::new(OperationBody::ScheduleCreate(schedule));
        outer.node_account_ids = node_account_ids;

        info!(
            inner = inner_kind.label(),
            payer = %payer,
            inner_payer = %inner_payer,
            "composed schedule create"
        );
        Ok(ComposedSchedule {
            operation: outer,
            inner_kind,
            inner_payer,
            payer,
        })
    }

    async fn admin_key(
        &self,
        options: &ScheduleOptions,
        acting: Option<AccountId>,
        notes: &mut Notes,
    ) -> Option<KeyValue> {
        if let Some(value) = self
            .resolver
            .resolve_optional("scheduleAdminKey", options.admin_key.as_ref())
        {
            return Some(value);
        }

        let authorization = self.authorization(acting, notes).await;
        match authorization.into_key() {
            Some(key) => Some(KeyValue::Key(key)),
            None => {
                notes.push(
                    "No admin key could be set on the schedule; it cannot be deleted before it executes or expires.",
                );
                None
            }
        }
    }

    /// Collects the operator key and, for an acting account, the
    /// counterparty key.
    pub async fn authorization(
        &self,
        acting: Option<AccountId>,
        notes: &mut Notes,
    ) -> ScheduleAuthorization {
        let mut authorization = ScheduleAuthorization::default();
        if let Some(key) = self.ctx.operator_public_key() {
            authorization.push(key);
        }
        let Some(account) = acting else {
            return authorization;
        };
        match lookup_counterparty(self.ctx.directory.as_ref(), &account, self.deadline).await {
            CounterpartyKey::Resolved(key) => {
                authorization.push(key);
                notes.push(format!(
                    "The schedule admin key is a 1-of-{} key list held by the operator and {account}, giving joint control over the schedule.",
                    authorization.keys().len()
                ));
            }
            CounterpartyKey::Unavailable { reason } => {
                notes.push(format!(
                    "Could not resolve the public key of {account} ({reason}); the schedule admin key covers the operator only."
                ));
            }
        }
        authorization
    }
}
