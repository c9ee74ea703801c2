//! Reserved response prefixes a processor's prompt may instruct the model to emit.
//!
//! The prefix strings are matched exactly and case-sensitively; existing
//! workflow prompts depend on them.

pub const MISSING_INFO: &str = "MISSING_INFO:";
pub const SECTION_COMPLETE: &str = "SECTION_COMPLETE:";
pub const COMPLETE: &str = "COMPLETE:";

/// A text-generation response, classified by its leading directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `COMPLETE:` the whole multi-turn task is done; carries the final text.
    Complete(String),
    /// `MISSING_INFO:` pause and ask the operator; carries the request.
    MissingInfo(String),
    /// `SECTION_COMPLETE:` one part is done and more remain; carries the
    /// text shown to the operator before the next part.
    SectionComplete(String),
    /// No directive: the response is the final answer.
    PlainText(String),
}

impl Directive {
    pub fn parse(response: &str) -> Self {
        let trimmed = response.trim_start();
        if let Some(rest) = trimmed.strip_prefix(MISSING_INFO) {
            Self::MissingInfo(rest.trim().to_string())
        } else if let Some(rest) = trimmed.strip_prefix(SECTION_COMPLETE) {
            Self::SectionComplete(rest.trim().to_string())
        } else if let Some(rest) = trimmed.strip_prefix(COMPLETE) {
            Self::Complete(rest.trim().to_string())
        } else {
            Self::PlainText(response.to_string())
        }
    }

    /// Whether the node may finish with this response.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Complete(_) | Self::PlainText(_))
    }
}
