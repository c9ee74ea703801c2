//! HTTP collaborator for `api` nodes.

pub mod caller;
pub mod format;
pub mod template;

pub use caller::ApiCaller;
pub use format::{format_response, render_body};
