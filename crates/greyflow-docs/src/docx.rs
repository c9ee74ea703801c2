use std::io::Cursor;

use docx_rs::{AlignmentType, Docx, LineSpacing, PageMargin, Paragraph, Run};

use greyflow_core::error::{GreyflowError, Result};
use greyflow_core::types::{DocumentOutline, SectionKind};

use crate::layout::LayoutProfile;

/// Twips per millimetre (1440 per inch).
const TWIPS_PER_MM: f32 = 56.692_9;

fn half_points(size_pt: f32) -> usize {
    (size_pt * 2.0).round() as usize
}

fn run(text: &str, size_pt: f32) -> Run {
    Run::new().add_text(text).size(half_points(size_pt))
}

/// Render `outline` to a `.docx` archive in memory.
pub fn render_docx(outline: &DocumentOutline, profile: LayoutProfile) -> Result<Vec<u8>> {
    let margin = (profile.margin_mm * TWIPS_PER_MM).round();
    // Word expresses "auto" line spacing in 240ths of a line.
    let spacing = LineSpacing::new().line((profile.line_spacing * 240.0).round() as _);

    let mut docx = Docx::new().page_margin(
        PageMargin::new()
            .top(margin as _)
            .bottom(margin as _)
            .left(margin as _)
            .right(margin as _),
    );

    for section in &outline.sections {
        let size = profile.size_for(section.kind);
        match section.kind {
            SectionKind::Title => {
                docx = docx.add_paragraph(
                    Paragraph::new()
                        .add_run(run(&section.content, size).bold())
                        .align(AlignmentType::Center),
                );
            }
            SectionKind::Heading | SectionKind::Subheading => {
                docx = docx
                    .add_paragraph(Paragraph::new().add_run(run(&section.content, size).bold()));
            }
            SectionKind::Paragraph => {
                docx = docx.add_paragraph(
                    Paragraph::new()
                        .add_run(run(&section.content, size))
                        .line_spacing(spacing.clone()),
                );
            }
            SectionKind::List => {
                for item in &section.items {
                    docx = docx.add_paragraph(
                        Paragraph::new()
                            .add_run(run(&format!("\u{2022} {}", item), size))
                            .line_spacing(spacing.clone()),
                    );
                }
            }
            SectionKind::Quote => {
                docx = docx.add_paragraph(
                    Paragraph::new()
                        .add_run(run(&section.content, size).italic())
                        .line_spacing(spacing.clone()),
                );
            }
            SectionKind::Code => {
                for line in section.content.lines() {
                    let mono = docx_rs::RunFonts::new().ascii("Courier New");
                    docx =
                        docx.add_paragraph(Paragraph::new().add_run(run(line, size).fonts(mono)));
                }
            }
        }
    }

    let mut buf = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut buf)
        .map_err(|e| GreyflowError::Document(format!("Word: {}", e)))?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use greyflow_core::types::{DocumentMetadata, DocumentType, Section};

    #[test]
    fn produces_zip_archive() {
        let outline = DocumentOutline {
            sections: vec![
                Section::new(SectionKind::Title, "Cover Letter"),
                Section::new(SectionKind::Paragraph, "Dear hiring manager,"),
                Section::list(vec!["Rust".into(), "Tokio".into()]),
                Section::new(SectionKind::Quote, "References on request."),
                Section::new(SectionKind::Code, "cargo build\ncargo test"),
            ],
            metadata: DocumentMetadata {
                title: Some("Cover Letter".into()),
                document_type: DocumentType::Letter,
                word_count: 8,
            },
        };
        let bytes = render_docx(&outline, LayoutProfile::for_type(DocumentType::Letter)).unwrap();
        // .docx is a zip container
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn half_points_round() {
        assert_eq!(half_points(11.0), 22);
        assert_eq!(half_points(11.5), 23);
    }
}
