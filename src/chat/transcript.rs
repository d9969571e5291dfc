use chrono::{DateTime, Utc};

pub const WELCOME_MESSAGE: &str = "👋 Hello! I am your FinAssist AI. I can help you analyze business documents, financial reports, and provide insights. Select a document to begin!";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sender {
    User,
    Assistant,
}

#[derive(Clone, Debug)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

/// Conversation transcript plus the "assistant is typing" indicator
#[derive(Debug, Default)]
pub struct ChatLog {
    messages: Vec<ChatMessage>,
    typing: bool,
}

impl ChatLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sender: Sender, text: impl Into<String>) {
        self.messages.push(ChatMessage {
            sender,
            text: text.into(),
            sent_at: Utc::now(),
        });
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.push(Sender::User, text);
    }

    pub fn push_assistant(&mut self, text: impl Into<String>) {
        self.push(Sender::Assistant, text);
    }

    pub fn push_welcome(&mut self) {
        self.push_assistant(WELCOME_MESSAGE);
    }

    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Messages after the first `count`
    #[must_use]
    pub fn since(&self, count: usize) -> &[ChatMessage] {
        self.messages.get(count..).unwrap_or_default()
    }

    #[must_use]
    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Showing twice still shows a single indicator
    pub fn show_typing(&mut self) {
        self.typing = true;
    }

    pub fn hide_typing(&mut self) {
        self.typing = false;
    }

    #[must_use]
    pub fn is_typing(&self) -> bool {
        self.typing
    }
}
