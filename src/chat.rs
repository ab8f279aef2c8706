//! Dataset chat session state machine.
//!
//! The session owns the ordered message log and serializes exchanges with
//! the remote agent: at most one request is ever in flight. The machine has
//! two states, Idle and Awaiting, modeled as an explicit enum so a future
//! state (e.g. Cancelled) has somewhere to go.
//!
//! The engine is transport-free. `submit` decides what should happen and
//! hands the trimmed text back to the caller, which issues the actual
//! request on a worker thread and feeds the outcome to `resolve`. That
//! keeps every transition unit-testable without a server.

use crate::client::ClientError;

/// Panel title shown above the message log
pub const PANEL_TITLE: &str = "Dataset Agent";
/// Hint shown while the log is empty
pub const EMPTY_LOG_HINT: &str = "Ask a question about this dataset.";
/// Indicator shown while an exchange is in flight
pub const TYPING_INDICATOR: &str = "Agent is typing...";
/// Assistant turn appended when no credential is available at submit time
pub const NOT_LOGGED_IN_REPLY: &str = "You are not logged in. Please log in again.";
/// Assistant turn appended when an exchange fails
pub const EXCHANGE_FAILED_REPLY: &str = "Sorry — I ran into an error while answering that.";
/// Assistant turn appended when the agent returns an empty answer
pub const EMPTY_ANSWER_REPLY: &str = "No response.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// Session state: Idle accepts submissions, Awaiting ignores them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatPhase {
    #[default]
    Idle,
    Awaiting,
}

/// What a submit action decided to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The user turn was appended; the caller must issue exactly one
    /// request carrying this trimmed text, then call `resolve`.
    Dispatched(String),
    /// Empty input or an exchange already in flight; nothing changed
    Ignored,
    /// No credential: the re-login turn was appended, no request goes out
    NotAuthenticated,
}

/// One dataset's conversation. Not persisted: a fresh view (or a dataset
/// switch) starts with an empty log.
#[derive(Default)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    phase: ChatPhase,
    revision: u64,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_awaiting(&self) -> bool {
        self.phase == ChatPhase::Awaiting
    }

    /// Monotonic counter bumped on every log or phase change. The chat
    /// panel compares it against the last revision it rendered to know when
    /// to snap its scroll position to the newest message.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Handle a submit action for the current draft.
    ///
    /// While Awaiting, submissions are ignored outright (not queued). With
    /// no token, the re-login turn is appended and the session stays Idle.
    /// Otherwise the user turn is appended first and the trimmed text is
    /// handed back for dispatch, entering Awaiting.
    pub fn submit(&mut self, draft: &str, token: Option<&str>) -> SubmitOutcome {
        let trimmed = draft.trim();
        if trimmed.is_empty() || self.is_awaiting() {
            return SubmitOutcome::Ignored;
        }

        if token.map(str::trim).filter(|t| !t.is_empty()).is_none() {
            self.push(ChatRole::Assistant, NOT_LOGGED_IN_REPLY.to_string());
            return SubmitOutcome::NotAuthenticated;
        }

        self.push(ChatRole::User, trimmed.to_string());
        self.phase = ChatPhase::Awaiting;
        self.revision += 1;
        SubmitOutcome::Dispatched(trimmed.to_string())
    }

    /// Complete the in-flight exchange.
    ///
    /// Success appends the agent's answer; failure is absorbed into the
    /// conversation as a fixed apology turn and never becomes a page-level
    /// error. A resolve with nothing in flight is a no-op.
    pub fn resolve(&mut self, result: Result<String, ClientError>) {
        if !self.is_awaiting() {
            return;
        }
        self.phase = ChatPhase::Idle;
        self.revision += 1;

        let content = match result {
            Ok(answer) if answer.trim().is_empty() => EMPTY_ANSWER_REPLY.to_string(),
            Ok(answer) => answer,
            Err(_) => EXCHANGE_FAILED_REPLY.to_string(),
        };
        self.push(ChatRole::Assistant, content);
    }

    fn push(&mut self, role: ChatRole, content: String) {
        self.messages.push(ChatMessage { role, content });
        self.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_appends_user_turn_before_dispatch() {
        let mut session = ChatSession::new();
        let outcome = session.submit("  What is the average age?  ", Some("tok"));

        assert_eq!(
            outcome,
            SubmitOutcome::Dispatched("What is the average age?".to_string())
        );
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].role, ChatRole::User);
        assert_eq!(session.messages()[0].content, "What is the average age?");
        assert!(session.is_awaiting());
    }

    #[test]
    fn test_single_flight_ignores_submit_while_awaiting() {
        let mut session = ChatSession::new();
        assert!(matches!(
            session.submit("first", Some("tok")),
            SubmitOutcome::Dispatched(_)
        ));

        let outcome = session.submit("second", Some("tok"));
        assert_eq!(outcome, SubmitOutcome::Ignored);
        assert_eq!(session.messages().len(), 1);
    }

    #[test]
    fn test_empty_draft_is_ignored() {
        let mut session = ChatSession::new();
        assert_eq!(session.submit("   ", Some("tok")), SubmitOutcome::Ignored);
        assert!(session.messages().is_empty());
        assert!(!session.is_awaiting());
    }

    #[test]
    fn test_missing_token_appends_relogin_turn_without_dispatch() {
        let mut session = ChatSession::new();
        let outcome = session.submit("What is the average age?", None);

        assert_eq!(outcome, SubmitOutcome::NotAuthenticated);
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].role, ChatRole::Assistant);
        assert_eq!(session.messages()[0].content, NOT_LOGGED_IN_REPLY);
        assert!(!session.is_awaiting());
    }

    #[test]
    fn test_successful_exchange_orders_user_then_assistant() {
        let mut session = ChatSession::new();
        session.submit("hello", Some("tok"));
        session.resolve(Ok("The mean is 30.".to_string()));

        assert!(!session.is_awaiting());
        let messages = session.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::User);
        assert_eq!(messages[1].role, ChatRole::Assistant);
        assert_eq!(messages[1].content, "The mean is 30.");
    }

    #[test]
    fn test_failure_is_absorbed_as_apology_turn() {
        let mut session = ChatSession::new();
        session.submit("hello", Some("tok"));
        session.resolve(Err(ClientError::Service { status: 500 }));

        let messages = session.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].content, EXCHANGE_FAILED_REPLY);
        assert!(!session.is_awaiting());
    }

    #[test]
    fn test_empty_answer_becomes_fixed_reply() {
        let mut session = ChatSession::new();
        session.submit("hello", Some("tok"));
        session.resolve(Ok("  ".to_string()));
        assert_eq!(session.messages()[1].content, EMPTY_ANSWER_REPLY);
    }

    #[test]
    fn test_resolve_without_in_flight_exchange_is_noop() {
        let mut session = ChatSession::new();
        session.resolve(Ok("spurious".to_string()));
        assert!(session.messages().is_empty());
    }

    #[test]
    fn test_revision_bumps_on_every_change() {
        let mut session = ChatSession::new();
        let initial = session.revision();
        session.submit("hello", Some("tok"));
        let after_submit = session.revision();
        assert!(after_submit > initial);

        session.resolve(Ok("answer".to_string()));
        assert!(session.revision() > after_submit);
    }
}
