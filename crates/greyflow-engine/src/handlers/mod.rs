mod api;
mod document;
mod input;
mod output;
mod processor;

pub use api::ApiHandler;
pub use document::DocumentHandler;
pub use input::InputHandler;
pub use output::OutputHandler;
pub use processor::ProcessorHandler;
