pub mod app;
pub mod chat;
pub mod documents;
pub mod library;
pub mod panic_handler;
pub mod settings;
pub mod viewer;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use app::{App, UploadReport};
pub use settings::Settings;
