pub mod chat;
pub mod retry;

use std::sync::Arc;

use greyflow_core::config::ModelConfig;
use greyflow_core::traits::TextGenerator;

pub use chat::ChatClient;
pub use retry::RetryingGenerator;

/// Build the text generator described by `config`, wrapped in retries when
/// a `[model.retry]` section is present.
pub fn create_generator(config: &ModelConfig) -> Arc<dyn TextGenerator> {
    let client = ChatClient::new(config);
    match &config.retry {
        Some(retry) => Arc::new(RetryingGenerator::new(Box::new(client), retry.clone())),
        None => Arc::new(client),
    }
}
