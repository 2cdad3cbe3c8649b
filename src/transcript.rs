//! The conversation held by a `%gpt` handler between invocations.

use crate::cli::{SYSTEM_PROMPT, USER_PREFIX};
use crate::openai::{ChatMessage, Role};

/// Role-tagged messages exchanged with the completion API.
///
/// The first message, when there is one, is always the system prompt.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
    max_turns: Option<usize>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transcript that keeps at most `max_turns` user/assistant pairs.
    pub fn bounded(max_turns: Option<usize>) -> Self {
        Transcript {
            messages: Vec::new(),
            max_turns,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn reset(&mut self) {
        self.messages.clear();
    }

    /// The messages to send for `query`, leaving the stored transcript alone.
    pub fn extended(&self, query: &str) -> Vec<ChatMessage> {
        if self.messages.is_empty() {
            return vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(&format!("{} {}", USER_PREFIX, query)),
            ];
        }
        let mut messages = self.messages.clone();
        messages.push(ChatMessage::user(query));
        messages
    }

    /// Store what was sent together with the reply it produced.
    pub fn commit(&mut self, sent: Vec<ChatMessage>, reply: ChatMessage) {
        debug_assert!(sent.first().map_or(false, |m| m.role == Role::System));
        self.messages = sent;
        self.messages.push(reply);
        self.evict();
    }

    fn evict(&mut self) {
        let Some(max_turns) = self.max_turns else {
            return;
        };
        // index 0 is the system prompt, the rest alternate user/assistant
        let turns = (self.messages.len().saturating_sub(1)) / 2;
        if turns > max_turns {
            let drop = (turns - max_turns) * 2;
            self.messages.drain(1..1 + drop);
        }
    }
}
