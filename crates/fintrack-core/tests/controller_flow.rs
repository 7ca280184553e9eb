//! Controller behaviour against a scripted in-process backend.

use std::collections::VecDeque;
use std::io::Write;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fintrack_core::{
    Backend, ChatController, ChatMessage, ChatRequest, ChatResponse, ChatRole, ClientError,
    Document, HistoryEntry, Level, UploadReceipt,
};
use reqwest::StatusCode;

#[derive(Default)]
struct ScriptedBackend {
    uploads: Mutex<Vec<String>>,
    requests: Mutex<Vec<ChatRequest>>,
    upload_replies: Mutex<VecDeque<Result<UploadReceipt, ClientError>>>,
    chat_replies: Mutex<VecDeque<Result<String, ClientError>>>,
}

impl ScriptedBackend {
    fn upload_reply(&self, reply: Result<UploadReceipt, ClientError>) {
        self.upload_replies.lock().unwrap().push_back(reply);
    }

    fn chat_reply(&self, reply: Result<&str, ClientError>) {
        self.chat_replies
            .lock()
            .unwrap()
            .push_back(reply.map(str::to_string));
    }

    fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }

    fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn upload(&self, document: Document) -> Result<UploadReceipt, ClientError> {
        self.uploads.lock().unwrap().push(document.file_name.clone());
        self.upload_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(UploadReceipt {
                file_name: document.file_name,
                message: None,
            }))
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ClientError> {
        self.requests.lock().unwrap().push(request);
        let reply = self
            .chat_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("ok".to_string()));
        reply.map(|answer| ChatResponse { answer })
    }
}

fn server_error() -> ClientError {
    ClientError::Backend {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        detail: None,
    }
}

fn pdf_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .prefix("report")
        .suffix(".pdf")
        .tempfile()
        .unwrap();
    file.write_all(b"%PDF-1.7").unwrap();
    file
}

async fn ready_controller(
    backend: &Arc<ScriptedBackend>,
) -> (ChatController<ScriptedBackend>, tempfile::NamedTempFile) {
    let file = pdf_file();
    let mut controller = ChatController::new(Arc::clone(backend));
    controller.upload.select(file.path());
    assert!(controller.upload().await);
    (controller, file)
}

#[tokio::test]
async fn upload_without_selection_never_calls_backend() {
    let backend = Arc::new(ScriptedBackend::default());
    let mut controller = ChatController::new(Arc::clone(&backend));

    assert!(!controller.upload().await);
    assert!(controller.start_upload().is_none());

    assert_eq!(backend.upload_count(), 0);
    assert_eq!(controller.notifications.len(), 2);
    let note = controller.notifications.latest().unwrap();
    assert_eq!(note.level, Level::Error);
    assert_eq!(note.title, "No file selected");
    assert_eq!(note.description, "Please choose a PDF file to process.");
}

#[tokio::test]
async fn successful_upload_resets_conversation() {
    let backend = Arc::new(ScriptedBackend::default());
    let (mut controller, file) = ready_controller(&backend).await;

    assert!(controller.session.is_ready());
    assert!(controller.ask("first question").await.is_some());
    assert_eq!(controller.session.messages().len(), 2);

    assert!(controller.upload().await);
    assert!(controller.session.is_ready());
    assert!(controller.session.messages().is_empty());

    let note = controller.notifications.latest().unwrap();
    assert_eq!(note.level, Level::Success);
    let name = file.path().file_name().unwrap().to_string_lossy().into_owned();
    assert_eq!(note.description, format!("\"{name}\" processed successfully."));
}

#[tokio::test]
async fn failed_upload_keeps_selection_and_reports_detail() {
    let backend = Arc::new(ScriptedBackend::default());
    backend.upload_reply(Err(ClientError::Backend {
        status: StatusCode::BAD_REQUEST,
        detail: Some("Invalid file type. Only PDFs are allowed.".to_string()),
    }));
    backend.upload_reply(Err(server_error()));

    let file = pdf_file();
    let mut controller = ChatController::new(Arc::clone(&backend));
    controller.upload.select(file.path());

    assert!(!controller.upload().await);
    assert!(!controller.session.is_ready());
    assert!(!controller.upload.is_processing());
    assert_eq!(controller.upload.selected(), Some(file.path()));
    assert_eq!(
        controller.notifications.latest().unwrap().description,
        "Invalid file type. Only PDFs are allowed."
    );

    assert!(!controller.upload().await);
    assert_eq!(
        controller.notifications.latest().unwrap().description,
        "An unexpected error occurred."
    );
    assert_eq!(backend.upload_count(), 2);
}

#[tokio::test]
async fn backend_text_is_cleaned_before_display() {
    let backend = Arc::new(ScriptedBackend::default());
    backend.upload_reply(Err(ClientError::Backend {
        status: StatusCode::BAD_REQUEST,
        detail: Some("Invalid\u{1b}[31m file".to_string()),
    }));
    backend.upload_reply(Ok(UploadReceipt {
        file_name: "annual\u{1b}[2J.pdf".to_string(),
        message: None,
    }));

    let file = pdf_file();
    let mut controller = ChatController::new(Arc::clone(&backend));
    controller.upload.select(file.path());

    assert!(!controller.upload().await);
    assert_eq!(controller.notifications.latest().unwrap().description, "Invalid[31m file");

    assert!(controller.upload().await);
    assert_eq!(controller.session.document().unwrap().file_name, "annual[2J.pdf");
}

#[tokio::test]
async fn example_scenario_summary_question() {
    let backend = Arc::new(ScriptedBackend::default());
    backend.chat_reply(Ok("Revenue grew 12%."));
    let (mut controller, _file) = ready_controller(&backend).await;

    let answer = controller
        .ask("Summarize the key financial highlights of the report.")
        .await;
    assert_eq!(answer.as_deref(), Some("Revenue grew 12%."));
    assert_eq!(
        controller.session.messages(),
        &[
            ChatMessage::user("Summarize the key financial highlights of the report."),
            ChatMessage::assistant("Revenue grew 12%."),
        ]
    );
}

#[tokio::test]
async fn n_exchanges_give_2n_alternating_messages() {
    let backend = Arc::new(ScriptedBackend::default());
    let (mut controller, _file) = ready_controller(&backend).await;

    for n in 0..5 {
        controller.ask(&format!("question {n}")).await.unwrap();
    }

    let messages = controller.session.messages();
    assert_eq!(messages.len(), 10);
    assert!(messages.iter().step_by(2).all(|m| m.role == ChatRole::User));
    assert!(messages.iter().skip(1).step_by(2).all(|m| m.role == ChatRole::Assistant));
}

#[tokio::test]
async fn history_sent_matches_prior_messages() {
    let backend = Arc::new(ScriptedBackend::default());
    let (mut controller, _file) = ready_controller(&backend).await;

    let mut snapshots = Vec::new();
    for n in 0..3 {
        let before: Vec<HistoryEntry> = controller
            .session
            .messages()
            .iter()
            .map(HistoryEntry::from)
            .collect();
        snapshots.push(before);
        controller.ask(&format!("question {n}")).await.unwrap();
    }

    let requests = backend.requests();
    assert_eq!(requests.len(), 3);
    for (request, expected) in requests.iter().zip(&snapshots) {
        assert_eq!(&request.chat_history, expected);
    }
    assert_eq!(requests[2].question, "question 2");
}

#[tokio::test]
async fn failed_exchange_rolls_back_exactly() {
    let backend = Arc::new(ScriptedBackend::default());
    backend.chat_reply(Ok("first answer"));
    backend.chat_reply(Err(server_error()));
    let (mut controller, _file) = ready_controller(&backend).await;

    controller.ask("first").await.unwrap();
    let before = controller.session.messages().to_vec();

    assert!(controller.ask("second").await.is_none());
    assert_eq!(controller.session.messages(), before.as_slice());
    assert!(!controller.session.is_awaiting_reply());

    let note = controller.notifications.latest().unwrap();
    assert_eq!(note.level, Level::Error);
    assert_eq!(note.description, "Failed to get a response from the assistant.");
}

#[tokio::test]
async fn timeout_on_first_exchange_returns_to_empty() {
    let backend = Arc::new(ScriptedBackend::default());
    backend.chat_reply(Err(ClientError::Timeout {
        url: "http://127.0.0.1:8000/chat/".to_string(),
    }));
    let (mut controller, _file) = ready_controller(&backend).await;
    let notes_before = controller.notifications.len();

    assert!(controller.ask("anything").await.is_none());
    assert!(controller.session.messages().is_empty());
    assert_eq!(controller.notifications.len(), notes_before + 1);
    assert_eq!(controller.notifications.latest().unwrap().title, "Error");
}

#[tokio::test]
async fn blank_question_is_ignored_without_request() {
    let backend = Arc::new(ScriptedBackend::default());
    let (mut controller, _file) = ready_controller(&backend).await;

    assert!(controller.ask("   ").await.is_none());
    assert!(backend.requests().is_empty());
    assert!(controller.session.messages().is_empty());
}

#[tokio::test]
async fn spawned_exchange_is_exclusive() {
    let backend = Arc::new(ScriptedBackend::default());
    backend.chat_reply(Ok("answer"));
    let (mut controller, _file) = ready_controller(&backend).await;

    let (ticket, job) = controller.start_exchange("first").unwrap();
    assert!(controller.start_exchange("second").is_none());
    assert_eq!(job.request().question, "first");

    let handle = tokio::spawn(job.run());
    let outcome = handle.await.unwrap();
    controller.finish_exchange(ticket, outcome);

    assert_eq!(
        controller.session.messages(),
        &[ChatMessage::user("first"), ChatMessage::assistant("answer")]
    );
}

#[tokio::test]
async fn reply_for_replaced_document_is_discarded() {
    let backend = Arc::new(ScriptedBackend::default());
    backend.chat_reply(Ok("stale answer"));
    let (mut controller, _file) = ready_controller(&backend).await;

    let (ticket, job) = controller.start_exchange("about the old report").unwrap();
    assert!(controller.upload().await);

    let outcome = job.run().await;
    controller.finish_exchange(ticket, outcome);
    assert!(controller.session.messages().is_empty());
}
