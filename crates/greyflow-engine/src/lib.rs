pub mod broker;
pub mod channel;
pub mod context;
pub mod dispatcher;
pub mod executor;
pub mod handlers;
pub mod scheduler;
pub mod trace;
pub mod validate;

pub use broker::{OperatorBroker, OperatorRequest};
pub use channel::{cancellable, InteractiveResolver, Resolution};
pub use context::{ExecutionContext, NodeResult};
pub use dispatcher::{Collaborators, NodeDispatcher, NodeHandler, NodeRequest, NodeResponse};
pub use executor::{ExecutionResult, RunOutcome, WorkflowExecutor};
pub use validate::{validate, Issue, Severity, ValidationReport};

pub use tokio_util::sync::CancellationToken;
