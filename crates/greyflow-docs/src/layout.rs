use greyflow_core::types::{DocumentType, SectionKind};

/// Font sizes (points), page margin (millimetres) and line spacing for one
/// family of documents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutProfile {
    pub title_size: f32,
    pub heading_size: f32,
    pub subheading_size: f32,
    pub body_size: f32,
    pub margin_mm: f32,
    pub line_spacing: f32,
}

impl LayoutProfile {
    pub fn for_type(document_type: DocumentType) -> Self {
        match document_type {
            // Dense single-page friendly
            DocumentType::Cv => Self {
                title_size: 20.0,
                heading_size: 14.0,
                subheading_size: 12.0,
                body_size: 10.0,
                margin_mm: 15.0,
                line_spacing: 1.2,
            },
            DocumentType::Research => Self {
                title_size: 18.0,
                heading_size: 14.0,
                subheading_size: 12.0,
                body_size: 11.0,
                margin_mm: 25.0,
                line_spacing: 1.5,
            },
            DocumentType::Letter => Self {
                title_size: 14.0,
                heading_size: 12.0,
                subheading_size: 11.0,
                body_size: 11.0,
                margin_mm: 25.0,
                line_spacing: 1.15,
            },
            DocumentType::Report => Self {
                title_size: 22.0,
                heading_size: 16.0,
                subheading_size: 13.0,
                body_size: 11.0,
                margin_mm: 20.0,
                line_spacing: 1.3,
            },
            DocumentType::General | DocumentType::Custom => Self {
                title_size: 20.0,
                heading_size: 15.0,
                subheading_size: 12.0,
                body_size: 11.0,
                margin_mm: 20.0,
                line_spacing: 1.25,
            },
        }
    }

    pub fn size_for(&self, kind: SectionKind) -> f32 {
        match kind {
            SectionKind::Title => self.title_size,
            SectionKind::Heading => self.heading_size,
            SectionKind::Subheading => self.subheading_size,
            SectionKind::Code => (self.body_size - 1.0).max(8.0),
            SectionKind::Paragraph | SectionKind::List | SectionKind::Quote => self.body_size,
        }
    }

    /// Baseline-to-baseline distance in millimetres for text of `size_pt`.
    pub fn line_height_mm(&self, size_pt: f32) -> f32 {
        size_pt * self.line_spacing * PT_TO_MM
    }
}

pub const PT_TO_MM: f32 = 0.352_778;

/// Greedy word wrap by approximate glyph width. Words longer than a line
/// are hard-split.
pub fn wrap_text(text: &str, size_pt: f32, width_mm: f32, monospace: bool) -> Vec<String> {
    // Helvetica averages about half an em per glyph; Courier is fixed at 0.6.
    let glyph_mm = size_pt * PT_TO_MM * if monospace { 0.6 } else { 0.5 };
    let max_chars = ((width_mm / glyph_mm).floor() as usize).max(1);

    let mut lines = Vec::new();
    for raw_line in text.lines() {
        if monospace {
            let chars: Vec<char> = raw_line.chars().collect();
            if chars.is_empty() {
                lines.push(String::new());
            }
            for chunk in chars.chunks(max_chars) {
                lines.push(chunk.iter().collect());
            }
            continue;
        }

        let mut current = String::new();
        for word in raw_line.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > max_chars {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let rest = word.split_off(max_chars);
                lines.push(word.iter().collect());
                word = rest;
            }
            let word: String = word.into_iter().collect();
            let needed = if current.is_empty() {
                word.chars().count()
            } else {
                current.chars().count() + 1 + word.chars().count()
            };
            if needed > max_chars && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&word);
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cv_is_denser_than_research() {
        let cv = LayoutProfile::for_type(DocumentType::Cv);
        let research = LayoutProfile::for_type(DocumentType::Research);
        assert!(cv.margin_mm < research.margin_mm);
        assert!(cv.line_spacing < research.line_spacing);
        assert!(cv.body_size < research.body_size);
    }

    #[test]
    fn custom_matches_general() {
        assert_eq!(
            LayoutProfile::for_type(DocumentType::Custom),
            LayoutProfile::for_type(DocumentType::General)
        );
    }

    #[test]
    fn wrap_respects_width() {
        let text = "the quick brown fox jumps over the lazy dog ".repeat(10);
        let lines = wrap_text(&text, 11.0, 60.0, false);
        assert!(lines.len() > 1);
        let glyph = 11.0 * PT_TO_MM * 0.5;
        let max = (60.0 / glyph).floor() as usize;
        assert!(lines.iter().all(|l| l.chars().count() <= max));
    }

    #[test]
    fn wrap_splits_overlong_words() {
        let word = "a".repeat(100);
        let lines = wrap_text(&word, 11.0, 20.0, false);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), word);
    }

    #[test]
    fn monospace_keeps_blank_lines() {
        let lines = wrap_text("fn main() {\n\n}", 10.0, 170.0, true);
        assert_eq!(lines, vec!["fn main() {", "", "}"]);
    }
}
