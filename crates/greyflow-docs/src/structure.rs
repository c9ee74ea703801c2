use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::{debug, warn};

use greyflow_core::error::Result;
use greyflow_core::traits::{DocumentStructurer, TextGenerator};
use greyflow_core::types::*;

/// Splits markdown-flavoured text into sections without any remote call.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicStructurer;

impl HeuristicStructurer {
    pub fn outline(&self, content: &str, document_type: DocumentType) -> DocumentOutline {
        let sections = parse_sections(content);
        let title = sections
            .iter()
            .find(|s| s.kind == SectionKind::Title)
            .map(|s| s.content.clone());
        DocumentOutline {
            metadata: DocumentMetadata {
                title,
                document_type,
                word_count: content.split_whitespace().count(),
            },
            sections,
        }
    }
}

impl DocumentStructurer for HeuristicStructurer {
    fn structure(
        &self,
        content: &str,
        document_type: DocumentType,
    ) -> BoxFuture<'_, Result<DocumentOutline>> {
        let outline = self.outline(content, document_type);
        Box::pin(async move { Ok(outline) })
    }
}

fn list_item(line: &str) -> Option<&str> {
    if let Some(rest) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
        return Some(rest.trim());
    }
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(item) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
            return Some(item.trim());
        }
    }
    None
}

fn parse_sections(content: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();
    let mut list: Vec<String> = Vec::new();
    let mut quote: Vec<&str> = Vec::new();
    let mut code: Option<Vec<&str>> = None;

    fn flush(
        sections: &mut Vec<Section>,
        paragraph: &mut Vec<&str>,
        list: &mut Vec<String>,
        quote: &mut Vec<&str>,
    ) {
        if !paragraph.is_empty() {
            sections.push(Section::new(SectionKind::Paragraph, paragraph.join(" ")));
            paragraph.clear();
        }
        if !list.is_empty() {
            sections.push(Section::list(std::mem::take(list)));
        }
        if !quote.is_empty() {
            sections.push(Section::new(SectionKind::Quote, quote.join(" ")));
            quote.clear();
        }
    }

    for raw in content.lines() {
        if let Some(block) = code.as_mut() {
            if raw.trim_start().starts_with("```") {
                sections.push(Section::new(SectionKind::Code, block.join("\n")));
                code = None;
            } else {
                block.push(raw);
            }
            continue;
        }

        let line = raw.trim();
        if line.starts_with("```") {
            flush(&mut sections, &mut paragraph, &mut list, &mut quote);
            code = Some(Vec::new());
        } else if line.is_empty() {
            flush(&mut sections, &mut paragraph, &mut list, &mut quote);
        } else if let Some(rest) = line.strip_prefix("### ") {
            flush(&mut sections, &mut paragraph, &mut list, &mut quote);
            sections.push(Section::new(SectionKind::Subheading, rest.trim()));
        } else if let Some(rest) = line.strip_prefix("## ") {
            flush(&mut sections, &mut paragraph, &mut list, &mut quote);
            sections.push(Section::new(SectionKind::Heading, rest.trim()));
        } else if let Some(rest) = line.strip_prefix("# ") {
            flush(&mut sections, &mut paragraph, &mut list, &mut quote);
            sections.push(Section::new(SectionKind::Title, rest.trim()));
        } else if let Some(rest) = line.strip_prefix('>') {
            if !paragraph.is_empty() || !list.is_empty() {
                flush(&mut sections, &mut paragraph, &mut list, &mut Vec::new());
            }
            quote.push(rest.trim());
        } else if let Some(item) = list_item(line) {
            if !paragraph.is_empty() || !quote.is_empty() {
                flush(&mut sections, &mut paragraph, &mut Vec::new(), &mut quote);
            }
            list.push(item.to_string());
        } else {
            if !list.is_empty() || !quote.is_empty() {
                flush(&mut sections, &mut Vec::new(), &mut list, &mut quote);
            }
            paragraph.push(line);
        }
    }

    // Unterminated fence keeps whatever was collected.
    if let Some(block) = code {
        sections.push(Section::new(SectionKind::Code, block.join("\n")));
    }
    flush(&mut sections, &mut paragraph, &mut list, &mut quote);
    sections
}

const STRUCTURE_PROMPT: &str = "You convert raw text into a structured document. \
Reply with JSON only, no prose, in the shape \
{\"title\": string, \"sections\": [{\"type\": one of \"title\", \"heading\", \"subheading\", \
\"paragraph\", \"list\", \"quote\", \"code\", \"content\": string, \"items\": [string]}]}. \
Use \"items\" only for list sections. Keep the author's wording.";

#[derive(Deserialize)]
struct StructuredReply {
    #[serde(default)]
    title: Option<String>,
    sections: Vec<Section>,
}

/// Strip a surrounding ```json fence if the model added one.
pub(crate) fn strip_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Asks the text generator for a section breakdown; falls back to
/// [`HeuristicStructurer`] when the call fails or the reply is not usable.
pub struct LlmStructurer {
    generator: Arc<dyn TextGenerator>,
    endpoint: String,
    model: Option<String>,
}

impl LlmStructurer {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        endpoint: impl Into<String>,
        model: Option<String>,
    ) -> Self {
        Self {
            generator,
            endpoint: endpoint.into(),
            model,
        }
    }
}

impl DocumentStructurer for LlmStructurer {
    fn structure(
        &self,
        content: &str,
        document_type: DocumentType,
    ) -> BoxFuture<'_, Result<DocumentOutline>> {
        let content = content.to_string();
        Box::pin(async move {
            let request = format!("Document type: {}\n\n{}", document_type, content);
            let reply = self
                .generator
                .generate(
                    &self.endpoint,
                    vec![ChatMessage::user(request)],
                    Some(STRUCTURE_PROMPT),
                    self.model.as_deref(),
                )
                .await;

            let parsed = match reply {
                Ok(text) => serde_json::from_str::<StructuredReply>(strip_fences(&text))
                    .map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };

            match parsed {
                Ok(reply) if !reply.sections.is_empty() => {
                    debug!(sections = reply.sections.len(), "Structured document with model");
                    Ok(DocumentOutline {
                        metadata: DocumentMetadata {
                            title: reply.title,
                            document_type,
                            word_count: content.split_whitespace().count(),
                        },
                        sections: reply.sections,
                    })
                }
                Ok(_) => {
                    warn!("Model returned no sections, using heuristic structure");
                    Ok(HeuristicStructurer.outline(&content, document_type))
                }
                Err(error) => {
                    warn!(error = %error, "Model structuring failed, using heuristic structure");
                    Ok(HeuristicStructurer.outline(&content, document_type))
                }
            }
        })
    }
}
