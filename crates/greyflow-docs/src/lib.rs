//! Document collaborators for `pdf` and `word` nodes: structure free text
//! into typed sections, then lay it out with a per-document-type profile.

pub mod docx;
pub mod layout;
pub mod pdf;
pub mod render;
pub mod structure;

use std::sync::Arc;

use greyflow_core::config::AppConfig;
use greyflow_core::traits::{DocumentStructurer, TextGenerator};

pub use layout::LayoutProfile;
pub use render::FileRenderer;
pub use structure::{HeuristicStructurer, LlmStructurer};

/// Structurer selected by `[documents].structure_with_llm`.
pub fn create_structurer(
    config: &AppConfig,
    generator: Arc<dyn TextGenerator>,
) -> Arc<dyn DocumentStructurer> {
    if config.documents.structure_with_llm {
        Arc::new(LlmStructurer::new(
            generator,
            config.model.endpoint.clone(),
            Some(config.model.model.clone()),
        ))
    } else {
        Arc::new(HeuristicStructurer)
    }
}
