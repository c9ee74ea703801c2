use std::path::{Path, PathBuf};

use futures::future::BoxFuture;
use tracing::info;

use greyflow_core::error::{GreyflowError, Result};
use greyflow_core::traits::DocumentRenderer;
use greyflow_core::types::*;

use crate::docx::render_docx;
use crate::layout::LayoutProfile;
use crate::pdf::render_pdf;

/// Default file name when a node leaves it blank.
pub fn default_filename(format: DocumentFormat) -> String {
    format!("document.{}", format.extension())
}

/// Keep only the final path component and force the format's extension.
pub fn normalize_filename(filename: &str, format: DocumentFormat) -> String {
    let base = Path::new(filename.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_string();
    if base.is_empty() {
        return default_filename(format);
    }
    let ext = format.extension();
    let has_ext = Path::new(&base)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(ext))
        .unwrap_or(false);
    if has_ext {
        base
    } else {
        format!("{}.{}", base, ext)
    }
}

/// Writes rendered documents into a directory.
pub struct FileRenderer {
    output_dir: PathBuf,
}

impl FileRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl DocumentRenderer for FileRenderer {
    fn render(
        &self,
        outline: &DocumentOutline,
        format: DocumentFormat,
        document_type: DocumentType,
        filename: &str,
    ) -> BoxFuture<'_, Result<String>> {
        let outline = outline.clone();
        let filename = normalize_filename(filename, format);
        let path = self.output_dir.join(&filename);

        Box::pin(async move {
            let profile = LayoutProfile::for_type(document_type);
            let bytes = tokio::task::spawn_blocking(move || match format {
                DocumentFormat::Pdf => render_pdf(&outline, profile).map(|(bytes, _)| bytes),
                DocumentFormat::Word => render_docx(&outline, profile),
            })
            .await
            .map_err(|e| GreyflowError::Document(e.to_string()))??;

            tokio::fs::create_dir_all(&self.output_dir).await?;
            tokio::fs::write(&path, &bytes).await?;
            info!(path = %path.display(), bytes = bytes.len(), "Document written");

            Ok(match format {
                DocumentFormat::Pdf => format!("PDF generated: {}", filename),
                DocumentFormat::Word => format!("Word document generated: {}", filename),
            })
        })
    }
}
