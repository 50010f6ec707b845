//! `Ledgerkit` core: identifiers, keys, amounts, the operation model, and the
//! collaborator traits the staging engine is written against.

pub mod amount;
pub mod clock;
pub mod codec;
pub mod ids;
pub mod key;
pub mod operation;
pub mod receipt;
pub mod resolve;
pub mod traits;

pub use amount::{normalize, to_base_units, AmountError, AmountInput, HBAR_DECIMALS};
pub use clock::{ClockSource, FixedClock, SystemClock};
pub use codec::CodecError;
pub use ids::{
    AccountId, ContractId, EntityId, FileId, IdParseError, NodeId, ScheduleId, TokenId, TopicId,
    TransactionId,
};
pub use key::{Key, KeyAlgorithm, KeyError, KeyInput, KeyList, KeyRole, KeyValue, PublicKey, CURRENT_SIGNER};
pub use operation::{
    OperationBody, OperationKind, OperationPolicy, StagedOperation, DEFAULT_FILE_CHUNK_SIZE,
};
pub use receipt::Receipt;
pub use resolve::KeyResolver;
pub use traits::{DirectoryService, KeyCodec, LedgerClient, LedgerError, Signer};

