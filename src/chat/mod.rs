//! Chat assistant: transcript, backend client, reply formatting

mod backend;
pub mod format;
mod session;
mod transcript;

pub use backend::{Attachment, BackendError, ChatBackend, HttpBackend, is_http_url};
pub use format::{Block, Inline, parse_response, render_html, render_plain};
pub use session::{
    ChatSession, NO_ANSWER_MESSAGE, NO_CONTEXT_MESSAGE, SendOutcome, failure_message,
    remote_filename,
};
pub use transcript::{ChatLog, ChatMessage, Sender, WELCOME_MESSAGE};
