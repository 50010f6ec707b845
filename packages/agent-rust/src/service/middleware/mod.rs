//! Tower middleware layers for the tool pipeline.
//!
//! - [`admission`]: bounded concurrency, refusals become failed reports
//! - [`budget`]: default time budget for calls without a deadline
//! - [`trace`]: one `tool_call` span per call with its delivery
//! - [`pipeline`]: composes all layers into a single service stack

pub mod admission;
pub mod budget;
pub mod pipeline;
pub mod trace;

pub use admission::{AdmissionLayer, AtCapacity};
pub use budget::BudgetLayer;
pub use pipeline::build_tool_pipeline;
pub use trace::TraceLayer;
