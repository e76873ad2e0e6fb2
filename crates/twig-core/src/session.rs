use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use twig_llm::{CompletionRequest, LanguageModel};
use twig_tree::{Attachment, DisplayMessage, NodeId, Role, Tree, flat_messages, history};

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::history::to_chat_messages;
use crate::snapshot::{SessionSnapshot, SessionStatus};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Which neighbour to switch to when navigating between branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

impl Direction {
    pub fn offset(self) -> isize {
        match self {
            Direction::Previous => -1,
            Direction::Next => 1,
        }
    }
}

/// How a request-issuing intent ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The model answered; `assistant_id` is the new reply.
    Completed {
        user_id: NodeId,
        assistant_id: NodeId,
    },
    /// The request failed. `assistant_id` holds the fixed error text.
    Failed {
        user_id: NodeId,
        assistant_id: NodeId,
        error: String,
    },
    /// Stopped by the user (or superseded by a clear). Nothing was appended.
    Cancelled { user_id: NodeId },
}

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

struct PendingRequest {
    seq: u64,
    token: CancellationToken,
}

struct SessionState {
    tree: Tree,
    input_draft: String,
    pending: Option<PendingRequest>,
    next_seq: u64,
}

impl SessionState {
    fn ensure_idle(&self) -> Result<()> {
        match self.pending {
            Some(_) => Err(SessionError::Busy),
            None => Ok(()),
        }
    }

    fn status(&self) -> SessionStatus {
        match self.pending {
            Some(_) => SessionStatus::Submitting,
            None => SessionStatus::Idle,
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            messages: flat_messages(&self.tree),
            status: self.status(),
            input_draft: self.input_draft.clone(),
        }
    }

    fn is_current(&self, seq: u64) -> bool {
        self.pending.as_ref().is_some_and(|p| p.seq == seq)
    }
}

/// A request that has been issued and not yet settled.
struct InFlight {
    seq: u64,
    user_id: NodeId,
    token: CancellationToken,
    request: CompletionRequest,
}

// ---------------------------------------------------------------------------
// ChatSession
// ---------------------------------------------------------------------------

/// Owns one branching conversation and the single completion request that
/// may be outstanding for it.
///
/// All methods take `&self`; wrap the session in an `Arc` to drive it from
/// several tasks (for example, awaiting [`submit`](Self::submit) on one task
/// while another calls [`stop`](Self::stop)). Tree updates happen under a
/// short-lived lock and never span an `.await`.
pub struct ChatSession {
    model: Arc<LanguageModel>,
    config: SessionConfig,
    state: Mutex<SessionState>,
    updates: watch::Sender<SessionSnapshot>,
}

impl ChatSession {
    pub fn new(model: LanguageModel, config: SessionConfig) -> Self {
        let state = SessionState {
            tree: config.initial_tree(),
            input_draft: String::new(),
            pending: None,
            next_seq: 0,
        };
        let (updates, _) = watch::channel(state.snapshot());
        Self {
            model: Arc::new(model),
            config,
            state: Mutex::new(state),
            updates,
        }
    }

    // -- queries --

    pub fn tree(&self) -> Tree {
        self.state.lock().tree.clone()
    }

    pub fn messages(&self) -> Vec<DisplayMessage> {
        flat_messages(&self.state.lock().tree)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.lock().snapshot()
    }

    pub fn status(&self) -> SessionStatus {
        self.state.lock().status()
    }

    pub fn is_loading(&self) -> bool {
        self.status() == SessionStatus::Submitting
    }

    pub fn input_draft(&self) -> String {
        self.state.lock().input_draft.clone()
    }

    /// Receive a fresh [`SessionSnapshot`] after every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.updates.subscribe()
    }

    // -- intents --

    pub fn set_input_draft(&self, text: impl Into<String>) {
        let mut state = self.state.lock();
        state.input_draft = text.into();
        self.publish(&state);
    }

    /// Append a user message after the current leaf and request a reply.
    pub async fn submit(
        &self,
        content: impl Into<String>,
        attachments: Vec<Attachment>,
    ) -> Result<TurnOutcome> {
        let content = content.into();
        if content.trim().is_empty() && attachments.is_empty() {
            return Err(SessionError::EmptyMessage);
        }

        let flight = {
            let mut state = self.state.lock();
            state.ensure_idle()?;

            let parent = state.tree.leaf();
            let (tree, user_id) = state
                .tree
                .add_node(Role::User, content, parent, attachments)?;
            let tree = tree.select(user_id)?;
            state.input_draft.clear();
            self.begin(&mut state, tree, user_id)
        };

        self.run(flight).await
    }

    /// Ask for a new answer to the turn at `index` of the displayed
    /// conversation. `index` may point at the user message or at the
    /// assistant reply that followed it. The previous answer stays in the
    /// tree as a sibling of the new one.
    pub async fn regenerate(&self, index: usize) -> Result<TurnOutcome> {
        let flight = {
            let mut state = self.state.lock();
            state.ensure_idle()?;

            let path = state.tree.selected_path();
            let target = *path.get(index).ok_or(SessionError::IndexOutOfRange {
                index,
                len: path.len(),
            })?;
            let user_index = match state.tree.get(target).map(|n| n.role) {
                Some(Role::User) => index,
                Some(Role::Assistant) => index
                    .checked_sub(1)
                    .ok_or(SessionError::NotRegenerable { index })?,
                _ => return Err(SessionError::NotRegenerable { index }),
            };
            let user_id = path[user_index];
            if state.tree.get(user_id).map(|n| n.role) != Some(Role::User) {
                return Err(SessionError::NotRegenerable { index });
            }

            let tree = state.tree.truncate_path_at(user_id)?;
            self.begin(&mut state, tree, user_id)
        };

        self.run(flight).await
    }

    /// Branch off `message_id` with a rewritten user message and request a
    /// reply to it. The original message and everything below it is kept.
    pub async fn edit_and_resubmit(
        &self,
        message_id: NodeId,
        new_content: impl Into<String>,
    ) -> Result<TurnOutcome> {
        let new_content = new_content.into();
        let flight = {
            let mut state = self.state.lock();
            state.ensure_idle()?;

            let original = state
                .tree
                .get(message_id)
                .ok_or(SessionError::UnknownMessage(message_id))?;
            if original.role != Role::User {
                return Err(SessionError::NotEditable(message_id));
            }
            if new_content.trim().is_empty() && original.attachments.is_empty() {
                return Err(SessionError::EmptyMessage);
            }

            let parent = original.parent_id;
            let attachments = original.attachments.clone();
            let (tree, user_id) =
                state
                    .tree
                    .add_node(Role::User, new_content, parent, attachments)?;
            let tree = tree.select(user_id)?;
            self.begin(&mut state, tree, user_id)
        };

        self.run(flight).await
    }

    /// Switch the displayed branch at `message_id` to its previous or next
    /// sibling. Returns the sibling switched to, or `None` at either end.
    pub fn navigate_message(
        &self,
        message_id: NodeId,
        direction: Direction,
    ) -> Result<Option<NodeId>> {
        let mut state = self.state.lock();
        state.ensure_idle()?;

        if !state.tree.contains(message_id) {
            return Err(SessionError::UnknownMessage(message_id));
        }
        let Some(sibling) = state
            .tree
            .sibling_at_offset(message_id, direction.offset())
        else {
            return Ok(None);
        };

        state.tree = state.tree.select(sibling)?;
        self.publish(&state);
        tracing::debug!(from = %message_id, to = %sibling, "switched branch");
        Ok(Some(sibling))
    }

    /// Abort the in-flight request, if any.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        if let Some(pending) = state.pending.take() {
            pending.token.cancel();
            self.publish(&state);
            tracing::info!(request = pending.seq, "completion request stopped");
        }
    }

    /// Throw the whole tree away and start over from the seed messages.
    /// Cancels the in-flight request, if any.
    pub fn clear_chat(&self) {
        let mut state = self.state.lock();
        if let Some(pending) = state.pending.take() {
            pending.token.cancel();
        }
        state.tree = self.config.initial_tree();
        state.input_draft.clear();
        self.publish(&state);
        tracing::debug!("conversation cleared");
    }

    // -- request lifecycle --

    fn begin(&self, state: &mut SessionState, tree: Tree, user_id: NodeId) -> InFlight {
        let messages = to_chat_messages(&history(&tree, user_id));
        let mut request = twig_llm::request();
        request
            .messages(messages)
            .options(self.config.options.clone());

        state.next_seq += 1;
        let seq = state.next_seq;
        let token = CancellationToken::new();
        state.tree = tree;
        state.pending = Some(PendingRequest {
            seq,
            token: token.clone(),
        });
        self.publish(state);

        tracing::debug!(
            request = seq,
            user = %user_id,
            model = self.model.model_id(),
            "completion request issued"
        );

        InFlight {
            seq,
            user_id,
            token,
            request: request.build(),
        }
    }

    async fn run(&self, flight: InFlight) -> Result<TurnOutcome> {
        let InFlight {
            seq,
            user_id,
            token,
            request,
        } = flight;

        let mut guard = FlightGuard {
            session: self,
            seq,
            armed: true,
        };
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            result = self.model.complete(request) => Some(result),
        };
        guard.armed = false;

        let mut state = self.state.lock();
        let result = match result {
            Some(result) if state.is_current(seq) => result,
            _ => {
                tracing::debug!(request = seq, "completion request cancelled");
                return Ok(TurnOutcome::Cancelled { user_id });
            }
        };
        state.pending = None;

        let (content, error) = match result {
            Ok(completion) => (completion.text, None),
            Err(err) => {
                tracing::warn!(request = seq, error = %err, "completion request failed");
                (self.config.error_message.clone(), Some(err.to_string()))
            }
        };

        let appended = state
            .tree
            .add_node(Role::Assistant, content, Some(user_id), Vec::new())
            .and_then(|(tree, assistant_id)| {
                tree.select(assistant_id)
                    .map(|tree| (tree, assistant_id))
            });
        let (tree, assistant_id) = match appended {
            Ok(appended) => appended,
            Err(err) => {
                self.publish(&state);
                return Err(err.into());
            }
        };
        state.tree = tree;
        self.publish(&state);

        Ok(match error {
            None => {
                tracing::debug!(request = seq, assistant = %assistant_id, "completion request completed");
                TurnOutcome::Completed {
                    user_id,
                    assistant_id,
                }
            }
            Some(error) => TurnOutcome::Failed {
                user_id,
                assistant_id,
                error,
            },
        })
    }

    fn publish(&self, state: &SessionState) {
        self.updates.send_replace(state.snapshot());
    }
}

/// Releases the pending slot if the future driving a request is dropped
/// before the request settles, so the session does not stay busy forever.
struct FlightGuard<'a> {
    session: &'a ChatSession,
    seq: u64,
    armed: bool,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.session.state.lock();
        if state.is_current(self.seq)
            && let Some(pending) = state.pending.take()
        {
            pending.token.cancel();
            self.session.publish(&state);
            tracing::debug!(request = self.seq, "completion request abandoned");
        }
    }
}
