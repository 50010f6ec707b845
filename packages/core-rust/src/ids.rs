//! Ledger entity identifiers and transaction ids.
//!
//! # Wire format
//!
//! Entity ids serialize to `"shard.realm.num"` and transaction ids to
//! `"shard.realm.num@seconds.nanos"`, with an optional `?scheduled` suffix
//! for the inner transaction of a schedule. Both are accepted back by
//! [`FromStr`], so the string form round-trips.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::clock::ClockSource;

/// Errors from parsing identifier strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdParseError {
    #[error("invalid entity id `{0}`: expected `shard.realm.num`")]
    Entity(String),
    #[error("invalid transaction id `{0}`: expected `shard.realm.num@seconds.nanos`")]
    Transaction(String),
}

// A pattern that fails to compile rejects every input.
fn entity_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(\d+)\.(\d+)\.(\d+)$").ok())
        .as_ref()
}

fn transaction_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(\d+\.\d+\.\d+)@(\d+)\.(\d{1,9})(\?scheduled)?$").ok())
        .as_ref()
}

/// A `shard.realm.num` identifier for any ledger entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId {
    pub shard: u64,
    pub realm: u64,
    pub num: u64,
}

/// Account identifier.
pub type AccountId = EntityId;
/// Token identifier.
pub type TokenId = EntityId;
/// Topic identifier.
pub type TopicId = EntityId;
/// File identifier.
pub type FileId = EntityId;
/// Smart-contract identifier.
pub type ContractId = EntityId;
/// Schedule identifier.
pub type ScheduleId = EntityId;
/// Consensus node account identifier.
pub type NodeId = EntityId;

impl EntityId {
    /// Creates an id in shard 0, realm 0.
    #[must_use]
    pub const fn num(num: u64) -> Self {
        Self {
            shard: 0,
            realm: 0,
            num,
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.shard, self.realm, self.num)
    }
}

impl FromStr for EntityId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let caps = entity_pattern()
            .and_then(|p| p.captures(trimmed))
            .ok_or_else(|| IdParseError::Entity(s.to_string()))?;
        let part = |i: usize| {
            caps[i]
                .parse::<u64>()
                .map_err(|_| IdParseError::Entity(s.to_string()))
        };
        Ok(Self {
            shard: part(1)?,
            realm: part(2)?,
            num: part(3)?,
        })
    }
}

impl TryFrom<String> for EntityId {
    type Error = IdParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        id.to_string()
    }
}

/// Identifier of a single transaction: the paying account plus the
/// instant from which the transaction is valid.
///
/// Ordering is by account, then seconds, then nanos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TransactionId {
    pub account_id: AccountId,
    pub valid_start_secs: u64,
    pub valid_start_nanos: u32,
    /// Marks the id of a transaction that executes inside a schedule.
    pub scheduled: bool,
}

impl TransactionId {
    /// Generates a fresh id for `account_id` valid from the clock's current instant.
    #[must_use]
    pub fn generate(account_id: AccountId, clock: &dyn ClockSource) -> Self {
        let now = clock.now_nanos();
        Self {
            account_id,
            valid_start_secs: now / 1_000_000_000,
            #[allow(clippy::cast_possible_truncation)]
            valid_start_nanos: (now % 1_000_000_000) as u32,
            scheduled: false,
        }
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}.{:09}",
            self.account_id, self.valid_start_secs, self.valid_start_nanos
        )?;
        if self.scheduled {
            f.write_str("?scheduled")?;
        }
        Ok(())
    }
}

impl FromStr for TransactionId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || IdParseError::Transaction(s.to_string());
        let caps = transaction_pattern()
            .and_then(|p| p.captures(s.trim()))
            .ok_or_else(err)?;
        let account_id: AccountId = caps[1].parse().map_err(|_| err())?;
        let valid_start_secs = caps[2].parse::<u64>().map_err(|_| err())?;
        // "5" means 5 nanos only when written as "000000005"; pad on the right
        // the way a decimal fraction reads.
        let nanos_text = format!("{:0<9}", &caps[3]);
        let valid_start_nanos = nanos_text.parse::<u32>().map_err(|_| err())?;
        Ok(Self {
            account_id,
            valid_start_secs,
            valid_start_nanos,
            scheduled: caps.get(4).is_some(),
        })
    }
}

impl TryFrom<String> for TransactionId {
    type Error = IdParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TransactionId> for String {
    fn from(id: TransactionId) -> Self {
        id.to_string()
    }
}
