//! Page-level controller: owns the session, the upload control and the
//! notifications, and turns user intents into backend jobs.
//!
//! Jobs are split into `start_*` (synchronous state change, returns a job),
//! the job's `run` future (the only part that touches the network, safe to
//! spawn) and `finish_*` (applies the outcome). Front ends with an event loop
//! spawn the job; [`ChatController::upload`] and [`ChatController::ask`]
//! simply await it.

use std::path::PathBuf;
use std::sync::Arc;

use crate::client::Backend;
use crate::error::{ClientError, SessionError, UploadError};
use crate::notify::Notifications;
use crate::session::{ExchangeTicket, Session};
use crate::state::{ChatRequest, UploadReceipt};
use crate::upload::{Document, UploadControl};

pub const EXCHANGE_FAILED: &str = "Failed to get a response from the assistant.";

/// Questions offered when a conversation is empty
pub const EXAMPLE_PROMPTS: [&str; 4] = [
    "Summarize the key financial highlights of the report.",
    "What are the main risks mentioned for the company?",
    "Provide an overview of the revenue and net income for the last fiscal year.",
    "Compare the total assets to total liabilities.",
];

pub struct UploadJob<B: ?Sized> {
    backend: Arc<B>,
    path: PathBuf,
}

impl<B: Backend + ?Sized> UploadJob<B> {
    pub async fn run(self) -> Result<UploadReceipt, UploadError> {
        let document = Document::load(&self.path).await?;
        Ok(self.backend.upload(document).await?)
    }
}

pub struct ExchangeJob<B: ?Sized> {
    backend: Arc<B>,
    request: ChatRequest,
}

impl<B: Backend + ?Sized> ExchangeJob<B> {
    pub fn request(&self) -> &ChatRequest {
        &self.request
    }

    pub async fn run(self) -> Result<String, ClientError> {
        Ok(self.backend.chat(self.request).await?.answer)
    }
}

pub struct ChatController<B: ?Sized> {
    backend: Arc<B>,
    pub session: Session,
    pub upload: UploadControl,
    pub notifications: Notifications,
}

impl<B: Backend + ?Sized> ChatController<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            session: Session::new(),
            upload: UploadControl::new(),
            notifications: Notifications::new(),
        }
    }

    /// Start processing the selected file. With nothing selected this raises
    /// a notification and never touches the backend.
    pub fn start_upload(&mut self) -> Option<UploadJob<B>> {
        match self.upload.begin() {
            Ok(path) => {
                tracing::info!(path = %path.display(), "upload started");
                Some(UploadJob {
                    backend: Arc::clone(&self.backend),
                    path,
                })
            }
            Err(UploadError::NoFileSelected) => {
                self.notifications
                    .error("No file selected", "Please choose a PDF file to process.");
                None
            }
            Err(err) => {
                tracing::debug!(error = %err, "upload ignored");
                None
            }
        }
    }

    pub fn finish_upload(&mut self, outcome: Result<UploadReceipt, UploadError>) {
        self.upload.finish();
        match outcome {
            Ok(receipt) => {
                let name = self
                    .upload
                    .selected_name()
                    .unwrap_or_else(|| receipt.file_name.clone());
                tracing::info!(file = %receipt.file_name, "document processed");
                self.notifications
                    .success("Success!", format!("\"{name}\" processed successfully."));
                self.session.reset_for_document(receipt.into());
            }
            Err(err) => {
                tracing::warn!(error = %err, "upload failed");
                self.notifications.error("Error", err.user_message());
            }
        }
    }

    /// Append `question` tentatively and return the job that asks it.
    /// Blank input and a busy or unready session yield `None`.
    pub fn start_exchange(&mut self, question: &str) -> Option<(ExchangeTicket, ExchangeJob<B>)> {
        match self.session.begin_exchange(question) {
            Ok((ticket, request)) => Some((
                ticket,
                ExchangeJob {
                    backend: Arc::clone(&self.backend),
                    request,
                },
            )),
            Err(SessionError::NotReady) => {
                self.notifications
                    .error("No document", "Process a PDF before asking questions.");
                None
            }
            Err(err) => {
                tracing::debug!(error = %err, "question ignored");
                None
            }
        }
    }

    pub fn finish_exchange(&mut self, ticket: ExchangeTicket, outcome: Result<String, ClientError>) {
        let settled = match outcome {
            Ok(answer) => self.session.commit(ticket, answer),
            Err(err) => {
                tracing::warn!(error = %err, "exchange failed");
                let rolled_back = self.session.rollback(ticket);
                if rolled_back.is_ok() {
                    self.notifications.error("Error", EXCHANGE_FAILED);
                }
                rolled_back
            }
        };
        if let Err(err) = settled {
            tracing::debug!(error = %err, "discarding reply for a previous document");
        }
    }

    /// Run a whole upload in place. Returns whether the document is ready.
    pub async fn upload(&mut self) -> bool {
        let Some(job) = self.start_upload() else {
            return false;
        };
        let outcome = job.run().await;
        let ok = outcome.is_ok();
        self.finish_upload(outcome);
        ok
    }

    /// Run a whole exchange in place. Returns the answer when one was committed.
    pub async fn ask(&mut self, question: &str) -> Option<String> {
        let (ticket, job) = self.start_exchange(question)?;
        let outcome = job.run().await;
        let answer = outcome.as_ref().ok().cloned();
        self.finish_exchange(ticket, outcome);
        answer
    }
}
