use printpdf::{
    BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
};

use greyflow_core::error::{GreyflowError, Result};
use greyflow_core::types::{DocumentOutline, SectionKind};

use crate::layout::{wrap_text, LayoutProfile, PT_TO_MM};

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const LIST_INDENT_MM: f32 = 5.0;
const QUOTE_INDENT_MM: f32 = 8.0;

fn pdf_err(e: impl std::fmt::Display) -> GreyflowError {
    GreyflowError::Document(format!("PDF: {}", e))
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
    mono: IndirectFontRef,
}

/// Cursor over A4 pages that starts a new page when text would cross the
/// bottom margin.
struct PageWriter<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    profile: LayoutProfile,
    y: f32,
    pages: usize,
}

impl<'a> PageWriter<'a> {
    fn new(
        doc: &'a PdfDocumentReference,
        layer: PdfLayerReference,
        profile: LayoutProfile,
    ) -> Self {
        Self {
            doc,
            layer,
            profile,
            y: PAGE_HEIGHT_MM - profile.margin_mm,
            pages: 1,
        }
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT_MM - self.profile.margin_mm;
        self.pages += 1;
    }

    fn line(&mut self, text: &str, size: f32, indent: f32, font: &IndirectFontRef) {
        let height = self.profile.line_height_mm(size);
        if self.y - height < self.profile.margin_mm {
            self.new_page();
        }
        self.y -= height;
        self.layer.use_text(text, size, Mm(self.profile.margin_mm + indent), Mm(self.y), font);
    }

    fn gap(&mut self, size: f32) {
        self.y -= size * PT_TO_MM * 0.6;
    }

    fn text_width(&self, indent: f32) -> f32 {
        PAGE_WIDTH_MM - 2.0 * self.profile.margin_mm - indent
    }

    fn block(
        &mut self,
        text: &str,
        size: f32,
        indent: f32,
        font: &IndirectFontRef,
        monospace: bool,
    ) {
        for line in wrap_text(text, size, self.text_width(indent), monospace) {
            self.line(&line, size, indent, font);
        }
    }
}

/// Render `outline` to PDF bytes. Returns the bytes and the page count.
pub fn render_pdf(outline: &DocumentOutline, profile: LayoutProfile) -> Result<(Vec<u8>, usize)> {
    let title = outline.metadata.title.clone().unwrap_or_else(|| "Document".to_string());
    let (doc, page, layer) = PdfDocument::new(
        title.as_str(),
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Layer 1",
    );

    let fonts = Fonts {
        regular: doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_err)?,
        bold: doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_err)?,
        italic: doc.add_builtin_font(BuiltinFont::HelveticaOblique).map_err(pdf_err)?,
        mono: doc.add_builtin_font(BuiltinFont::Courier).map_err(pdf_err)?,
    };

    let first_layer = doc.get_page(page).get_layer(layer);
    let mut writer = PageWriter::new(&doc, first_layer, profile);

    for section in &outline.sections {
        let size = profile.size_for(section.kind);
        match section.kind {
            SectionKind::Title | SectionKind::Heading | SectionKind::Subheading => {
                writer.gap(size);
                writer.block(&section.content, size, 0.0, &fonts.bold, false);
            }
            SectionKind::Paragraph => {
                writer.block(&section.content, size, 0.0, &fonts.regular, false);
            }
            SectionKind::List => {
                for item in &section.items {
                    let lines = wrap_text(item, size, writer.text_width(LIST_INDENT_MM), false);
                    for (i, line) in lines.iter().enumerate() {
                        if i == 0 {
                            writer.line(&format!("- {}", line), size, 0.0, &fonts.regular);
                        } else {
                            writer.line(line, size, LIST_INDENT_MM, &fonts.regular);
                        }
                    }
                }
            }
            SectionKind::Quote => {
                writer.block(&section.content, size, QUOTE_INDENT_MM, &fonts.italic, false);
            }
            SectionKind::Code => {
                writer.block(&section.content, size, 0.0, &fonts.mono, true);
            }
        }
        writer.gap(profile.body_size);
    }

    let pages = writer.pages;
    let bytes = doc.save_to_bytes().map_err(pdf_err)?;
    Ok((bytes, pages))
}
