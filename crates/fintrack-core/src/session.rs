//! Conversation state for one processed document.
//!
//! A question moves through two phases. [`Session::begin_exchange`] appends
//! the user message tentatively and hands out an [`ExchangeTicket`]; the
//! ticket is then either committed with the backend's answer or rolled back,
//! which truncates the list to exactly its length before the question.

use crate::error::SessionError;
use crate::sanitize;
use crate::state::{ChatMessage, ChatRequest, HistoryEntry, UploadReceipt};

/// The document the backend currently holds for us
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInfo {
    pub file_name: String,
}

impl From<UploadReceipt> for DocumentInfo {
    // The name may come from the backend and ends up on screen.
    fn from(receipt: UploadReceipt) -> Self {
        Self {
            file_name: sanitize::for_display(&receipt.file_name).into_owned(),
        }
    }
}

/// Proof of an outstanding exchange. Only the session that issued it, and
/// only before the next reset, will accept it.
#[derive(Debug, PartialEq, Eq)]
pub struct ExchangeTicket {
    epoch: u64,
    base_len: usize,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    base_len: usize,
}

#[derive(Debug, Default)]
pub struct Session {
    messages: Vec<ChatMessage>,
    document: Option<DocumentInfo>,
    pending: Option<Pending>,
    // Bumped on every reset so tickets from a previous document go stale.
    epoch: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn document(&self) -> Option<&DocumentInfo> {
        self.document.as_ref()
    }

    /// True once a document has been processed
    pub fn is_ready(&self) -> bool {
        self.document.is_some()
    }

    /// True while a question is waiting for its answer
    pub fn is_awaiting_reply(&self) -> bool {
        self.pending.is_some()
    }

    /// A new document replaces the old conversation entirely.
    pub fn reset_for_document(&mut self, document: DocumentInfo) {
        self.messages.clear();
        self.pending = None;
        self.epoch += 1;
        self.document = Some(document);
    }

    /// Tentatively append `question` and build the request for it.
    ///
    /// The request's history is the conversation as it stood before the
    /// question was appended.
    pub fn begin_exchange(
        &mut self,
        question: &str,
    ) -> Result<(ExchangeTicket, ChatRequest), SessionError> {
        if !self.is_ready() {
            return Err(SessionError::NotReady);
        }
        if question.trim().is_empty() {
            return Err(SessionError::EmptyQuestion);
        }
        if self.pending.is_some() {
            return Err(SessionError::ExchangeInFlight);
        }

        let chat_history: Vec<HistoryEntry> = self.messages.iter().map(HistoryEntry::from).collect();
        let base_len = self.messages.len();

        self.messages.push(ChatMessage::user(question));
        self.pending = Some(Pending { base_len });

        let ticket = ExchangeTicket {
            epoch: self.epoch,
            base_len,
        };
        let request = ChatRequest {
            question: question.to_string(),
            chat_history,
        };
        Ok((ticket, request))
    }

    /// Keep the tentative question and append the answer after it.
    pub fn commit(&mut self, ticket: ExchangeTicket, answer: impl Into<String>) -> Result<(), SessionError> {
        self.settle(&ticket)?;
        self.messages.push(ChatMessage::assistant(answer));
        Ok(())
    }

    /// Drop the tentative question; the list returns to its pre-call length.
    pub fn rollback(&mut self, ticket: ExchangeTicket) -> Result<(), SessionError> {
        self.settle(&ticket)?;
        self.messages.truncate(ticket.base_len);
        Ok(())
    }

    fn settle(&mut self, ticket: &ExchangeTicket) -> Result<(), SessionError> {
        match self.pending {
            Some(pending) if ticket.epoch == self.epoch && pending.base_len == ticket.base_len => {
                self.pending = None;
                Ok(())
            }
            _ => Err(SessionError::StaleExchange),
        }
    }
}
