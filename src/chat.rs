//! Conversation stream controller
//!
//! Owns the ordered message store and the conversation lifecycle: one
//! metadata fetch bootstraps the session, `submit` runs the submission
//! pipeline (lazy chat creation, streaming completion, incremental
//! decode through the render throttle), and `stop` cancels an in-flight
//! stream. UI bindings observe immutable [`ChatSnapshot`]s through a
//! watch channel and feed input back via [`ChatController::set_input`].
//!
//! All store mutations happen inside short lock scopes between await
//! points, so observers always see consistent snapshots: the user turn
//! before the request that answers it, the empty assistant placeholder
//! before any delta, and the final content exactly once at stream end.

mod throttle;

use crate::client::{ApiClient, DEFAULT_BASE_URL};
use crate::error::ChatError;
use crate::protocol::{StreamDecoder, StreamRecord};
use crate::types::{Chatbot, CompletionRequest, Message, Role, WireMessage};
use futures::StreamExt;
use std::sync::{Arc, Mutex, Weak};
use throttle::{FlushDecision, RenderThrottle};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Configuration for a chat controller
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub publish_id: String,
    pub base_url: String,
}

impl ChatConfig {
    pub fn new(publish_id: impl Into<String>) -> Self {
        Self {
            publish_id: publish_id.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the controller at a different API host (self-hosted
    /// deployments, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Session lifecycle as observed by the UI binding.
///
/// `Loading` (no session yet) and `Offline` (session errored) are
/// distinct observable states; only `Ready` with a live chatbot accepts
/// submissions.
#[derive(Debug, Clone)]
pub enum SessionState {
    Loading,
    Ready(Chatbot),
    Offline(ChatError),
}

impl SessionState {
    pub fn is_live(&self) -> bool {
        matches!(self, SessionState::Ready(chatbot) if chatbot.live)
    }
}

/// Submission phase, explicit so illegal transitions are unrepresentable:
/// a second submit finds a non-`Idle` phase, and `stop` can only reach a
/// cancellation token while a stream exists to cancel.
#[derive(Debug)]
enum Phase {
    /// Ready for the next submission
    Idle,
    /// Resolving the chat session id before the streaming request
    CreatingChat,
    /// Completion request or response stream in flight
    Streaming { cancel: CancellationToken },
}

impl Phase {
    fn in_flight(&self) -> bool {
        !matches!(self, Phase::Idle)
    }
}

/// Transient state for one streaming response, destroyed on any
/// termination or when superseded by `stop`.
#[derive(Debug)]
struct StreamState {
    buffer: String,
    throttle: RenderThrottle,
}

impl StreamState {
    fn new() -> Self {
        Self {
            buffer: String::new(),
            throttle: RenderThrottle::new(),
        }
    }
}

struct ChatState {
    session: SessionState,
    messages: Arc<Vec<Message>>,
    input: String,
    chat_id: Option<String>,
    phase: Phase,
    stream: Option<StreamState>,
    /// Bumped per submission; a cancelled pipeline resuming late must not
    /// clobber a newer submission's state.
    seq: u64,
}

impl ChatState {
    /// Replace the content of the active assistant turn on a
    /// copy-on-write snapshot. No-op once the stream state is gone.
    fn set_streaming_content(&mut self, content: String) {
        if self.stream.is_none() {
            return;
        }
        let messages = Arc::make_mut(&mut self.messages);
        if let Some(last) = messages.last_mut() {
            if last.role == Role::Assistant {
                last.content = content;
            }
        }
    }
}

/// Immutable snapshot of the reactive surface, published on every
/// observable change
#[derive(Debug, Clone)]
pub struct ChatSnapshot {
    pub session: SessionState,
    pub messages: Arc<Vec<Message>>,
    pub input: String,
    pub loading: bool,
}

/// Conversation stream controller
pub struct ChatController {
    client: ApiClient,
    publish_id: String,
    state: Mutex<ChatState>,
    updates: watch::Sender<ChatSnapshot>,
    weak: Weak<ChatController>,
}

impl ChatController {
    pub fn new(config: ChatConfig) -> Arc<Self> {
        let state = ChatState {
            session: SessionState::Loading,
            messages: Arc::new(Vec::new()),
            input: String::new(),
            chat_id: None,
            phase: Phase::Idle,
            stream: None,
            seq: 0,
        };
        let (updates, _) = watch::channel(ChatSnapshot {
            session: SessionState::Loading,
            messages: Arc::clone(&state.messages),
            input: String::new(),
            loading: false,
        });

        Arc::new_cyclic(|weak| Self {
            client: ApiClient::new(config.base_url),
            publish_id: config.publish_id,
            state: Mutex::new(state),
            updates,
            weak: weak.clone(),
        })
    }

    /// Observe snapshots; the receiver always holds the latest one.
    pub fn subscribe(&self) -> watch::Receiver<ChatSnapshot> {
        self.updates.subscribe()
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        let st = self.state.lock().unwrap();
        Self::make_snapshot(&st)
    }

    /// Ordered, read-only view of the conversation
    pub fn messages(&self) -> Arc<Vec<Message>> {
        Arc::clone(&self.state.lock().unwrap().messages)
    }

    pub fn set_input(&self, text: impl Into<String>) {
        let mut st = self.state.lock().unwrap();
        st.input = text.into();
        self.notify(&st);
    }

    /// Fetch chatbot metadata and seed the greeting, if configured.
    ///
    /// One attempt, no retry: failure leaves the session `Offline` and
    /// every later submit is a no-op until the caller bootstraps again.
    pub async fn load_chatbot(&self) {
        match self.client.fetch_chatbot(&self.publish_id).await {
            Ok(chatbot) => {
                tracing::debug!(title = %chatbot.title, live = chatbot.live, "chatbot loaded");
                let mut st = self.state.lock().unwrap();
                if let Some(greeting) = &chatbot.messages_initial {
                    Arc::make_mut(&mut st.messages).push(Message::initial_greeting(greeting));
                }
                st.session = SessionState::Ready(chatbot);
                self.notify(&st);
            }
            Err(e) => {
                tracing::warn!(error = %e, publish_id = %self.publish_id, "chatbot bootstrap failed");
                let mut st = self.state.lock().unwrap();
                st.session = SessionState::Offline(e);
                self.notify(&st);
            }
        }
    }

    /// Submit the current input as a user turn and stream the reply.
    ///
    /// Silently does nothing when the input is blank, a submission is
    /// already in flight, or the session is not live. The optimistic
    /// user turn is visible before any request is issued; failures
    /// append one `error` turn; cancellation appends nothing.
    pub async fn submit(&self) {
        let (content, seq) = {
            let mut st = self.state.lock().unwrap();
            if st.phase.in_flight() || !st.session.is_live() {
                return;
            }
            let content = st.input.trim().to_string();
            if content.is_empty() {
                return;
            }
            st.input.clear();
            st.seq += 1;
            st.phase = Phase::CreatingChat;
            Arc::make_mut(&mut st.messages).push(Message::user(content.clone()));
            self.notify(&st);
            (content, st.seq)
        };

        let outcome = self.drive_submission(&content, seq).await;

        // Teardown runs on every exit path, cancellation included: the
        // in-flight phase is cleared and any scheduled flush discarded.
        let mut st = self.state.lock().unwrap();
        if st.seq == seq {
            if let Some(stream) = st.stream.as_mut() {
                stream.throttle.cancel_pending();
            }
            st.stream = None;
            st.phase = Phase::Idle;

            if let Err(e) = outcome {
                if e.is_cancelled() {
                    tracing::debug!(seq, "submission cancelled");
                } else {
                    tracing::warn!(seq, error = %e, "submission failed");
                    Arc::make_mut(&mut st.messages).push(Message::error(e.message));
                }
            }
        }
        self.notify(&st);
    }

    /// Cancel the in-flight stream. No-op when nothing is streaming.
    ///
    /// Buffered but unflushed text is discarded; the assistant turn keeps
    /// whatever had been flushed. A new submit is permitted immediately.
    pub fn stop(&self) {
        let mut st = self.state.lock().unwrap();
        if let Phase::Streaming { cancel } = &st.phase {
            cancel.cancel();
            if let Some(stream) = st.stream.as_mut() {
                stream.throttle.cancel_pending();
            }
            st.stream = None;
            st.phase = Phase::Idle;
            self.notify(&st);
        }
    }

    async fn drive_submission(&self, content: &str, seq: u64) -> Result<(), ChatError> {
        // Lazily create the chat session on the first send; the id is
        // reused for the rest of the conversation.
        let chat_id = {
            let st = self.state.lock().unwrap();
            st.chat_id.clone()
        };
        let chat_id = match chat_id {
            Some(id) => id,
            None => {
                let id = self.client.create_chat(&self.publish_id, content).await?;
                tracing::debug!(chat_id = %id, "chat session created");
                let mut st = self.state.lock().unwrap();
                st.chat_id = Some(id.clone());
                id
            }
        };

        // Full history, including the optimistic user turn.
        let request = {
            let st = self.state.lock().unwrap();
            CompletionRequest {
                id: Uuid::new_v4().to_string(),
                messages: st.messages.iter().map(WireMessage::from).collect(),
            }
        };

        // Attach the cancellation handle before the request goes out so
        // `stop` covers the response await as well as the stream.
        let cancel = CancellationToken::new();
        {
            let mut st = self.state.lock().unwrap();
            st.phase = Phase::Streaming {
                cancel: cancel.clone(),
            };
        }

        let response = tokio::select! {
            r = self.client.start_completion(&self.publish_id, &chat_id, &request) => r?,
            () = cancel.cancelled() => return Err(ChatError::cancelled()),
        };

        // The empty placeholder is visible before any delta lands on it.
        {
            let mut st = self.state.lock().unwrap();
            Arc::make_mut(&mut st.messages).push(Message::assistant(""));
            st.stream = Some(StreamState::new());
            self.notify(&st);
        }

        let mut body = response.bytes_stream();
        let mut decoder = StreamDecoder::new();
        loop {
            let chunk = tokio::select! {
                c = body.next() => c,
                () = cancel.cancelled() => return Err(ChatError::cancelled()),
            };
            match chunk {
                Some(Ok(bytes)) => {
                    for record in decoder.feed(&bytes) {
                        if self.handle_record(seq, record) {
                            return Ok(());
                        }
                    }
                }
                Some(Err(e)) => {
                    return Err(ChatError::network(format!("Stream interrupted: {e}")));
                }
                None => {
                    if let Some(record) = decoder.finish() {
                        if self.handle_record(seq, record) {
                            return Ok(());
                        }
                    }
                    self.final_flush(seq);
                    return Ok(());
                }
            }
        }
    }

    /// Apply one decoded record; returns true at end of stream.
    fn handle_record(&self, seq: u64, record: StreamRecord) -> bool {
        match record {
            StreamRecord::Frame => false,
            StreamRecord::Delta(text) => {
                self.apply_delta(seq, &text);
                false
            }
            StreamRecord::Done => {
                self.final_flush(seq);
                true
            }
        }
    }

    /// Append a delta to the stream buffer and offer it to the throttle.
    fn apply_delta(&self, seq: u64, text: &str) {
        let mut st = self.state.lock().unwrap();
        if st.seq != seq {
            return;
        }
        let decision = match st.stream.as_mut() {
            Some(stream) => {
                stream.buffer.push_str(text);
                stream.throttle.offer()
            }
            None => return,
        };
        match decision {
            FlushDecision::Immediate => {
                let content = st.stream.as_ref().map(|s| s.buffer.clone()).unwrap_or_default();
                st.set_streaming_content(content);
                self.notify(&st);
            }
            FlushDecision::Defer(delay) => {
                let ctrl = self.weak.clone();
                let handle = tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    if let Some(ctrl) = ctrl.upgrade() {
                        ctrl.deferred_flush(seq);
                    }
                });
                if let Some(stream) = st.stream.as_mut() {
                    stream.throttle.set_pending(handle);
                }
            }
        }
    }

    /// A deferred flush firing: applies the latest buffer, not the value
    /// at schedule time.
    fn deferred_flush(&self, seq: u64) {
        let mut st = self.state.lock().unwrap();
        if st.seq != seq {
            return;
        }
        let content = match st.stream.as_mut() {
            Some(stream) => {
                stream.throttle.mark_flushed();
                stream.buffer.clone()
            }
            None => return,
        };
        st.set_streaming_content(content);
        self.notify(&st);
    }

    /// End-of-stream flush, bypassing the throttle.
    fn final_flush(&self, seq: u64) {
        let mut st = self.state.lock().unwrap();
        if st.seq != seq {
            return;
        }
        let content = match st.stream.as_mut() {
            Some(stream) => {
                stream.throttle.cancel_pending();
                stream.buffer.clone()
            }
            None => return,
        };
        st.set_streaming_content(content);
        self.notify(&st);
    }

    fn make_snapshot(st: &ChatState) -> ChatSnapshot {
        ChatSnapshot {
            session: st.session.clone(),
            messages: Arc::clone(&st.messages),
            input: st.input.clone(),
            loading: st.phase.in_flight(),
        }
    }

    fn notify(&self, st: &ChatState) {
        self.updates.send_replace(Self::make_snapshot(st));
    }
}
