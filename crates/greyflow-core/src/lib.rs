pub mod config;
pub mod directive;
pub mod error;
pub mod event;
pub mod traits;
pub mod types;
pub mod workflow;

pub use config::AppConfig;
pub use directive::Directive;
pub use error::{GreyflowError, Result};
pub use event::EventBus;
pub use types::*;
pub use workflow::WorkflowDocument;
