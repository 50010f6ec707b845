//! Ledgerkit agent: stages ledger operations and resolves, at submission
//! time, whether each one is executed, returned as unsigned bytes, or
//! wrapped in a schedule.

pub mod agent;
pub mod builders;
pub mod config;
pub mod context;
pub mod deadline;
pub mod directory;
pub mod logging;
pub mod meta;
pub mod outcome;
pub mod resolver;
pub mod sandbox;
pub mod schedule;
pub mod service;
pub mod stage;

pub use agent::Agent;
pub use builders::{BuildContext, BuildError, StageBuilder};
pub use config::{AgentConfig, LoggingConfig, Network, OperatingMode};
pub use context::AgentContext;
pub use deadline::Deadline;
pub use meta::{MetaOptions, MetaOptionsApplier};
pub use outcome::{ExecutionOutcome, ExecutionReport, OutcomeRecord};
pub use resolver::{decide, ExecutionError, ExecutionResolver, Strategy};
pub use schedule::{ScheduleComposer, ScheduleError, ScheduleOptions};
pub use stage::{Notes, OperationStage, Staged, StagingError};
