//! The conversation stream client.
//!
//! [`Conversation`] owns the turn log and the text busy flag. It is the only
//! writer of turn content: user turns are appended whole, assistant turns grow
//! fragment by fragment while a stream is open and are frozen when it ends.
//! Opening an exchange does not perform I/O here; [`Conversation::append`]
//! returns a [`StreamRequest`] that the app layer hands to the stream service.

use std::fmt;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::ChatMessage;
use crate::core::message::{Turn, TurnId, TurnRole};

/// Everything needed to open a streaming exchange for the current log.
#[derive(Debug, Clone)]
pub struct StreamRequest {
    pub stream_id: u64,
    pub api_messages: Vec<ChatMessage>,
    pub cancel_token: CancellationToken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationError {
    /// A stream is already open.
    Busy,
    /// The turn would break strict user/assistant alternation.
    OutOfTurn { expected: TurnRole, got: TurnRole },
    /// There is no unanswered user turn to stream a reply for.
    NothingToRetry,
}

impl fmt::Display for ConversationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversationError::Busy => write!(f, "A reply is still streaming"),
            ConversationError::OutOfTurn { expected, got } => {
                write!(f, "Expected a {expected} turn next, got a {got} turn")
            }
            ConversationError::NothingToRetry => {
                write!(f, "There is no unanswered message to retry")
            }
        }
    }
}

impl std::error::Error for ConversationError {}

#[derive(Debug)]
struct OpenStream {
    stream_id: u64,
    reply: Option<TurnId>,
    cancel_token: CancellationToken,
}

#[derive(Debug, Default)]
pub struct Conversation {
    turns: Vec<Turn>,
    open_stream: Option<OpenStream>,
    last_stream_id: u64,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// `busyText`: a streaming exchange is in flight.
    pub fn is_busy(&self) -> bool {
        self.open_stream.is_some()
    }

    pub fn is_current_stream(&self, stream_id: u64) -> bool {
        self.open_stream
            .as_ref()
            .is_some_and(|open| open.stream_id == stream_id)
    }

    /// Text of the most recent assistant turn.
    pub fn last_assistant_text(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|turn| turn.is_assistant())
            .map(Turn::content)
    }

    /// The log ends with a user turn that has no reply and nothing is streaming.
    pub fn can_retry(&self) -> bool {
        !self.is_busy() && self.turns.last().is_some_and(Turn::is_user)
    }

    fn expected_role(&self) -> TurnRole {
        match self.turns.last() {
            Some(turn) if turn.is_user() => TurnRole::Assistant,
            _ => TurnRole::User,
        }
    }

    /// Append a turn. A user turn opens a streaming exchange over the whole log,
    /// described by the returned request.
    pub fn append(
        &mut self,
        role: TurnRole,
        content: impl Into<String>,
    ) -> Result<Option<StreamRequest>, ConversationError> {
        if self.is_busy() {
            return Err(ConversationError::Busy);
        }
        let expected = self.expected_role();
        if role != expected {
            return Err(ConversationError::OutOfTurn {
                expected,
                got: role,
            });
        }

        self.turns.push(Turn::new(role, content));
        if role.is_user() {
            Ok(Some(self.open_stream()))
        } else {
            Ok(None)
        }
    }

    /// Re-open an exchange for an unanswered user turn.
    pub fn retry(&mut self) -> Result<StreamRequest, ConversationError> {
        if self.is_busy() {
            return Err(ConversationError::Busy);
        }
        if !self.can_retry() {
            return Err(ConversationError::NothingToRetry);
        }
        Ok(self.open_stream())
    }

    fn open_stream(&mut self) -> StreamRequest {
        self.last_stream_id += 1;
        let stream_id = self.last_stream_id;
        let cancel_token = CancellationToken::new();
        self.open_stream = Some(OpenStream {
            stream_id,
            reply: None,
            cancel_token: cancel_token.clone(),
        });
        debug!(stream_id, turns = self.turns.len(), "stream opened");

        StreamRequest {
            stream_id,
            api_messages: self.turns.iter().map(Turn::to_api_message).collect(),
            cancel_token,
        }
    }

    /// Append one fragment to the open reply, creating the assistant turn on the
    /// first fragment. Fragments for any other stream are dropped.
    pub fn apply_fragment(&mut self, stream_id: u64, fragment: &str) -> bool {
        let Some(open) = self.open_stream.as_mut() else {
            return false;
        };
        if open.stream_id != stream_id || fragment.is_empty() {
            return false;
        }

        match open.reply.as_ref() {
            Some(reply_id) => match self.turns.last_mut() {
                Some(turn) if turn.id() == reply_id => turn.push_content(fragment),
                _ => {
                    warn!(stream_id, "open reply turn is no longer last; dropping fragment");
                    return false;
                }
            },
            None => {
                let turn = Turn::new(TurnRole::Assistant, fragment);
                open.reply = Some(turn.id().clone());
                self.turns.push(turn);
            }
        }
        true
    }

    /// End-of-stream: freeze the reply and clear the busy flag.
    pub fn complete_stream(&mut self, stream_id: u64) -> bool {
        if !self.is_current_stream(stream_id) {
            return false;
        }
        if let Some(open) = self.open_stream.take() {
            if open.reply.is_none() {
                warn!(stream_id, "stream ended without any reply text");
            }
            debug!(stream_id, turns = self.turns.len(), "stream completed");
        }
        true
    }

    /// Stream failure: discard the incomplete reply and clear the busy flag.
    pub fn fail_stream(&mut self, stream_id: u64) -> bool {
        if !self.is_current_stream(stream_id) {
            return false;
        }
        if let Some(open) = self.open_stream.take() {
            if let Some(reply_id) = open.reply {
                if self.turns.last().is_some_and(|turn| turn.id() == &reply_id) {
                    self.turns.pop();
                }
            }
            open.cancel_token.cancel();
            debug!(stream_id, "stream failed; partial reply discarded");
        }
        true
    }

    /// Stop any in-flight exchange when the session ends.
    pub fn shutdown(&mut self) {
        if let Some(open) = self.open_stream.as_ref() {
            open.cancel_token.cancel();
        }
    }
}
