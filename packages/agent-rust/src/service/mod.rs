//! Tool-call routing and execution framework.
//!
//! 1. **Classification** (`classify`): `ToolCall` -> `Result<ToolRequest, ClassifyError>`
//! 2. **Middleware** (`middleware`): Tower layers (load shedding, deadlines, metrics)
//! 3. **Routing** (`router`): dispatch to domain services by domain name
//! 4. **Domain services** (`domain`): stage and execute through a fresh builder

pub mod classify;
pub mod domain;
pub mod middleware;
pub mod operation;
pub mod router;

pub use classify::ToolClassifier;
pub use operation::{
    defaulted_notes, domain_names, ClassifyError, OperationError, ToolAction, ToolCall,
    ToolContext, ToolFuture, ToolRequest, ToolResponse,
};
pub use router::ToolRouter;
