pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod notify;
pub mod sanitize;
pub mod session;
pub mod state;
pub mod upload;

// Re-export main types for convenience
pub use client::{Backend, BackendClient};
pub use config::Config;
pub use controller::{ChatController, ExchangeJob, UploadJob, EXAMPLE_PROMPTS};
pub use error::{ClientError, SessionError, UploadError};
pub use notify::{Level, Notification, Notifications};
pub use session::{DocumentInfo, ExchangeTicket, Session};
pub use state::{ChatMessage, ChatRequest, ChatResponse, ChatRole, HistoryEntry, UploadReceipt};
pub use upload::{Document, UploadControl};
