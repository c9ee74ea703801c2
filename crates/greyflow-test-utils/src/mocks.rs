use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;

use greyflow_core::error::{GreyflowError, Result};
use greyflow_core::traits::*;
use greyflow_core::types::*;

// ── ScriptedGenerator ───────────────────────────────────────────

/// One recorded `generate` call.
#[derive(Debug, Clone)]
pub struct GeneratorCall {
    pub endpoint: String,
    pub messages: Vec<ChatMessage>,
    pub system_prompt: Option<String>,
    pub model: Option<String>,
}

#[derive(Default)]
struct GeneratorState {
    script: VecDeque<Result<String>>,
    calls: Vec<GeneratorCall>,
    hang: bool,
}

/// Text generator that replays queued replies, then echoes the last user
/// message once the queue is empty.
#[derive(Clone, Default)]
pub struct ScriptedGenerator {
    state: Arc<Mutex<GeneratorState>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let gen = Self::new();
        for r in replies {
            gen.push_reply(r);
        }
        gen
    }

    /// Never resolves. For cancellation tests.
    pub fn hanging() -> Self {
        let gen = Self::new();
        gen.state.lock().unwrap().hang = true;
        gen
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.state.lock().unwrap().script.push_back(Ok(reply.into()));
    }

    pub fn push_error(&self, error: GreyflowError) {
        self.state.lock().unwrap().script.push_back(Err(error));
    }

    pub fn calls(&self) -> Vec<GeneratorCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }
}

impl TextGenerator for ScriptedGenerator {
    fn generate(
        &self,
        endpoint: &str,
        messages: Vec<ChatMessage>,
        system_prompt: Option<&str>,
        model: Option<&str>,
    ) -> BoxFuture<'_, Result<String>> {
        let (next, hang) = {
            let mut state = self.state.lock().unwrap();
            let echo = messages
                .iter()
                .rev()
                .find(|m| m.role == Role::User)
                .map(|m| m.content.clone())
                .unwrap_or_default();
            state.calls.push(GeneratorCall {
                endpoint: endpoint.to_string(),
                messages,
                system_prompt: system_prompt.map(str::to_string),
                model: model.map(str::to_string),
            });
            let next = state.script.pop_front().unwrap_or(Ok(echo));
            (next, state.hang)
        };
        Box::pin(async move {
            if hang {
                futures::future::pending::<()>().await;
            }
            next
        })
    }
}

// ── ScriptedOperator ────────────────────────────────────────────

#[derive(Default)]
struct OperatorState {
    answers: VecDeque<String>,
    raw_prompts: Vec<String>,
    info_requests: Vec<String>,
    hang: bool,
}

/// Operator channel with canned answers. Once the queue is empty every
/// request is answered with `"more details"`.
#[derive(Clone, Default)]
pub struct ScriptedOperator {
    state: Arc<Mutex<OperatorState>>,
}

impl ScriptedOperator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_answers<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let op = Self::new();
        op.state
            .lock()
            .unwrap()
            .answers
            .extend(answers.into_iter().map(Into::into));
        op
    }

    /// Never answers. For cancellation tests.
    pub fn hanging() -> Self {
        let op = Self::new();
        op.state.lock().unwrap().hang = true;
        op
    }

    pub fn raw_prompts(&self) -> Vec<String> {
        self.state.lock().unwrap().raw_prompts.clone()
    }

    pub fn info_requests(&self) -> Vec<String> {
        self.state.lock().unwrap().info_requests.clone()
    }

    pub fn raw_input_count(&self) -> usize {
        self.state.lock().unwrap().raw_prompts.len()
    }

    pub fn additional_info_count(&self) -> usize {
        self.state.lock().unwrap().info_requests.len()
    }

    fn answer(&self) -> (String, bool) {
        let mut state = self.state.lock().unwrap();
        let answer = state
            .answers
            .pop_front()
            .unwrap_or_else(|| "more details".to_string());
        (answer, state.hang)
    }
}

async fn deliver(answer: String, hang: bool) -> Result<String> {
    if hang {
        futures::future::pending::<()>().await;
    }
    Ok(answer)
}

impl OperatorChannel for ScriptedOperator {
    fn request_raw_input(&self, prompt: &str) -> BoxFuture<'_, Result<String>> {
        self.state.lock().unwrap().raw_prompts.push(prompt.to_string());
        let (answer, hang) = self.answer();
        Box::pin(deliver(answer, hang))
    }

    fn request_additional_info(&self, request: &str) -> BoxFuture<'_, Result<String>> {
        self.state.lock().unwrap().info_requests.push(request.to_string());
        let (answer, hang) = self.answer();
        Box::pin(deliver(answer, hang))
    }
}

// ── StubHttpCaller ──────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct HttpCall {
    pub endpoint: String,
    pub input: String,
    pub config: ApiConfig,
}

#[derive(Default)]
struct HttpState {
    responses: VecDeque<Result<String>>,
    calls: Vec<HttpCall>,
}

/// HTTP caller returning queued responses, or the input once exhausted.
#[derive(Clone, Default)]
pub struct StubHttpCaller {
    state: Arc<Mutex<HttpState>>,
}

impl StubHttpCaller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, body: impl Into<String>) {
        self.state.lock().unwrap().responses.push_back(Ok(body.into()));
    }

    pub fn push_error(&self, error: GreyflowError) {
        self.state.lock().unwrap().responses.push_back(Err(error));
    }

    pub fn calls(&self) -> Vec<HttpCall> {
        self.state.lock().unwrap().calls.clone()
    }
}

impl HttpCaller for StubHttpCaller {
    fn call(
        &self,
        endpoint: &str,
        input: &str,
        config: &ApiConfig,
    ) -> BoxFuture<'_, Result<String>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(HttpCall {
            endpoint: endpoint.to_string(),
            input: input.to_string(),
            config: config.clone(),
        });
        let next = state.responses.pop_front().unwrap_or_else(|| Ok(input.to_string()));
        Box::pin(async move { next })
    }
}

// ── Document collaborators ──────────────────────────────────────

/// Structurer that wraps the whole content in one paragraph section.
#[derive(Clone, Default)]
pub struct StaticStructurer;

impl DocumentStructurer for StaticStructurer {
    fn structure(
        &self,
        content: &str,
        document_type: DocumentType,
    ) -> BoxFuture<'_, Result<DocumentOutline>> {
        let outline = DocumentOutline {
            sections: vec![Section::new(SectionKind::Paragraph, content)],
            metadata: DocumentMetadata {
                title: None,
                document_type,
                word_count: content.split_whitespace().count(),
            },
        };
        Box::pin(async move { Ok(outline) })
    }
}

#[derive(Debug, Clone)]
pub struct RenderCall {
    pub outline: DocumentOutline,
    pub format: DocumentFormat,
    pub document_type: DocumentType,
    pub filename: String,
}

/// Renderer that records what it was asked to write and writes nothing.
#[derive(Clone, Default)]
pub struct RecordingRenderer {
    calls: Arc<Mutex<Vec<RenderCall>>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<RenderCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl DocumentRenderer for RecordingRenderer {
    fn render(
        &self,
        outline: &DocumentOutline,
        format: DocumentFormat,
        document_type: DocumentType,
        filename: &str,
    ) -> BoxFuture<'_, Result<String>> {
        self.calls.lock().unwrap().push(RenderCall {
            outline: outline.clone(),
            format,
            document_type,
            filename: filename.to_string(),
        });
        let message = match format {
            DocumentFormat::Pdf => format!("PDF generated: {}", filename),
            DocumentFormat::Word => format!("Word document generated: {}", filename),
        };
        Box::pin(async move { Ok(message) })
    }
}

// ── RecordingObserver ───────────────────────────────────────────

#[derive(Default)]
struct ObserverState {
    steps: Vec<String>,
    statuses: Vec<(String, NodeStatus)>,
}

/// Observer that keeps every trace line and status transition.
#[derive(Clone, Default)]
pub struct RecordingObserver {
    state: Arc<Mutex<ObserverState>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> Vec<String> {
        self.state.lock().unwrap().steps.clone()
    }

    pub fn statuses(&self) -> Vec<(String, NodeStatus)> {
        self.state.lock().unwrap().statuses.clone()
    }

    /// Every status `node_id` passed through, in order.
    pub fn trail(&self, node_id: &str) -> Vec<NodeStatus> {
        self.state
            .lock()
            .unwrap()
            .statuses
            .iter()
            .filter(|(id, _)| id == node_id)
            .map(|(_, s)| *s)
            .collect()
    }

    /// Last reported status, `Idle` if none was reported.
    pub fn final_status(&self, node_id: &str) -> NodeStatus {
        self.trail(node_id).last().copied().unwrap_or_default()
    }

    pub fn has_step_containing(&self, needle: &str) -> bool {
        self.state.lock().unwrap().steps.iter().any(|s| s.contains(needle))
    }
}

impl ExecutionObserver for RecordingObserver {
    fn on_step(&self, line: &str) {
        self.state.lock().unwrap().steps.push(line.to_string());
    }

    fn on_status_change(&self, node_id: &str, status: NodeStatus) {
        self.state
            .lock()
            .unwrap()
            .statuses
            .push((node_id.to_string(), status));
    }
}
