use std::path::Path;

use finassist::app::{LOAD_ERROR_MESSAGE, LOCAL_UNAVAILABLE_MESSAGE, LOCAL_UNAVAILABLE_PANEL};
use finassist::chat::{SendOutcome, WELCOME_MESSAGE};
use finassist::documents::{
    BlobStore, ContextFile, DocumentDescriptor, MemoryBlobStore, PDF_CONTENT_TYPE, UploadCandidate,
};
use finassist::settings::{LibraryEntry, Settings};
use finassist::test_utils::test_helpers::*;
use finassist::viewer::DECODE_FAILURE_PANEL;
use finassist::App;
use tempfile::TempDir;

const ANNUAL_URL: &str = "https://files.example/reports/annual.pdf";
const BUDGET_PATH: &str = "/srv/docs/budget.pdf";

fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.documents.library = vec![
        LibraryEntry {
            name: "Annual Report.pdf".to_string(),
            url: ANNUAL_URL.to_string(),
        },
        LibraryEntry {
            name: "Budget".to_string(),
            url: BUDGET_PATH.to_string(),
        },
    ];
    settings
}

fn app_with(
    engine: FakeEngine,
    backend: FakeBackend,
    blobs: MemoryBlobStore,
    context: ContextFile,
) -> App<FakeEngine, FakeBackend> {
    let mut app = App::new(&settings(), engine, backend, Box::new(blobs), context);
    app.startup();
    app
}

fn app() -> App<FakeEngine, FakeBackend> {
    app_with(
        FakeEngine::new(6),
        FakeBackend::new().with_document(ANNUAL_URL, pdf_bytes("annual")),
        MemoryBlobStore::new(),
        ContextFile::ephemeral(),
    )
}

fn id_for_url(app: &App<FakeEngine, FakeBackend>, url: &str) -> String {
    app.registry()
        .list()
        .iter()
        .find(|d| d.url() == Some(url))
        .map(|d| d.id.clone())
        .expect("registered url")
}

fn last_message(app: &App<FakeEngine, FakeBackend>) -> &str {
    &app.chat_log().last().expect("a message").text
}

fn context_file(dir: &Path) -> ContextFile {
    ContextFile::with_file(dir.join("context.json"))
}

#[tokio::test]
async fn startup_lists_uploads_newest_first_above_the_library() {
    let mut blobs = MemoryBlobStore::new();
    blobs.save("local-1-aaaaaa", "old.pdf", &pdf_bytes("old")).unwrap();
    blobs.save("local-2-bbbbbb", "new.pdf", &pdf_bytes("new")).unwrap();

    let mut app = App::new(
        &settings(),
        FakeEngine::new(3),
        FakeBackend::new(),
        Box::new(blobs),
        ContextFile::ephemeral(),
    );
    assert_eq!(app.startup(), 2);

    let names: Vec<_> = app.registry().list().iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["new.pdf", "old.pdf", "Annual Report.pdf", "Budget"]);
    assert_eq!(app.chat_log().messages().len(), 1);
    assert_eq!(last_message(&app), WELCOME_MESSAGE);
    assert!(app.viewer().container().welcome_visible());
}

#[tokio::test]
async fn upload_rejects_bad_files_and_opens_the_first_accepted_one() {
    let mut app = app();
    let oversized = UploadCandidate::new(
        "huge.pdf",
        PDF_CONTENT_TYPE,
        vec![b'%'; 21 * 1024 * 1024],
    );
    let report = app
        .upload(vec![
            UploadCandidate::new("notes.txt", "text/plain", b"hello".to_vec()),
            pdf_upload("Q3 Report.pdf"),
            oversized,
            pdf_upload("Q4 Report.pdf"),
        ])
        .await;

    assert_eq!(report.added.len(), 2);
    assert_eq!(report.rejected.len(), 2);
    let texts: Vec<_> = app.chat_log().since(1).iter().map(|m| m.text.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "❌ Please select PDF files only.",
            "❌ The file is too large (max 20 MB).",
            "📊 Document loaded! I can help you analyze this q3 report.pdf. Ask me about key insights, financial metrics, or business implications.",
        ]
    );

    let first = &report.added[0];
    assert_eq!(app.viewer().open_document_id(), Some(first.as_str()));
    assert_eq!(app.viewer().container().page_numbers(), vec![1, 2, 3]);
    assert_eq!(app.registry().list()[0].name, "Q4 Report.pdf");
    assert!(app.blobs().get(first).unwrap().is_some());
}

#[tokio::test]
async fn undecodable_upload_shows_the_error_panel() {
    let mut app = app();
    app.upload(vec![UploadCandidate::new(
        "broken.pdf",
        PDF_CONTENT_TYPE,
        b"not really a pdf".to_vec(),
    )])
    .await;

    assert_eq!(last_message(&app), LOAD_ERROR_MESSAGE);
    assert_eq!(app.viewer().container().error_panel(), Some(DECODE_FAILURE_PANEL));
    assert!(app.viewer().container().pages().is_empty());
}

#[tokio::test]
async fn local_document_without_bytes_is_reported_unavailable() {
    let mut app = app();
    app.open_document(&id_for_url(&app, BUDGET_PATH)).await;
    assert!(app.viewer().is_open());

    app.registry_mut()
        .add(DocumentDescriptor::local("local-9-zzzzzz", "gone.pdf", None));
    assert!(!app.open_document("local-9-zzzzzz").await);

    assert_eq!(last_message(&app), LOCAL_UNAVAILABLE_MESSAGE);
    assert_eq!(app.viewer().container().error_panel(), Some(LOCAL_UNAVAILABLE_PANEL));
    assert!(app.viewer().container().pages().is_empty());
    assert!(!app.viewer().is_open());
}

#[tokio::test]
async fn remote_documents_are_fetched_or_opened_by_path() {
    let mut app = app();
    assert!(app.open_document(&id_for_url(&app, ANNUAL_URL)).await);
    assert_eq!(app.chat().backend().fetches(), vec![ANNUAL_URL]);
    assert!(last_message(&app).contains("analyze this annual report.pdf."));

    assert!(app.open_document(&id_for_url(&app, BUDGET_PATH)).await);
    assert_eq!(app.chat().backend().fetches().len(), 1);
    assert_eq!(app.viewer().container().page_numbers(), vec![1, 2, 3]);
}

#[tokio::test]
async fn failed_remote_fetch_shows_the_load_error() {
    let mut app = app();
    let id = app.add_remote("Missing", "https://files.example/missing.pdf");
    assert!(!app.open_document(&id).await);

    assert_eq!(last_message(&app), LOAD_ERROR_MESSAGE);
    assert_eq!(app.viewer().container().error_panel(), Some(DECODE_FAILURE_PANEL));
}

#[tokio::test]
async fn deleting_the_open_document_clears_viewer_context_and_store() {
    let mut app = app();
    let report = app.upload(vec![pdf_upload("Q3.pdf")]).await;
    let id = report.added[0].clone();
    assert!(app.add_to_context(&id));

    assert!(app.delete_document(&id));
    assert!(app.registry().get(&id).is_none());
    assert!(!app.context().contains(&id));
    assert!(app.blobs().get(&id).unwrap().is_none());
    assert!(app.viewer().container().welcome_visible());
    assert_eq!(app.viewer().open_document_id(), None);

    assert!(!app.delete_document(&id));
}

#[tokio::test]
async fn context_survives_a_restart_without_local_uploads() {
    let dir = TempDir::new().unwrap();
    let mut first = app_with(
        FakeEngine::new(3),
        FakeBackend::new(),
        MemoryBlobStore::new(),
        context_file(dir.path()),
    );
    let report = first.upload(vec![pdf_upload("mine.pdf")]).await;
    let annual = id_for_url(&first, ANNUAL_URL);
    let budget = id_for_url(&first, BUDGET_PATH);
    assert!(first.add_to_context(&budget));
    assert!(first.add_to_context(&report.added[0]));
    assert!(first.add_to_context(&annual));
    assert!(!first.add_to_context(&annual));
    assert!(first.remove_from_context(&budget));

    let second = app_with(
        FakeEngine::new(3),
        FakeBackend::new(),
        MemoryBlobStore::new(),
        context_file(dir.path()),
    );
    assert_eq!(second.context().ids(), [annual]);
}

#[tokio::test]
async fn questions_carry_the_context_documents() {
    let backend = FakeBackend::new()
        .with_document(ANNUAL_URL, pdf_bytes("annual"))
        .with_answer("Operating margin rose to **18%**.");
    let mut app = app_with(
        FakeEngine::new(3),
        backend,
        MemoryBlobStore::new(),
        ContextFile::ephemeral(),
    );

    assert_eq!(app.send_message("Margins?").await, SendOutcome::NoContext);

    let report = app.upload(vec![pdf_upload("Q3.pdf")]).await;
    app.add_to_context(&report.added[0]);
    let annual = id_for_url(&app, ANNUAL_URL);
    app.add_to_context(&annual);

    assert_eq!(app.send_message("Margins?").await, SendOutcome::Answered);
    assert_eq!(last_message(&app), "Operating margin rose to **18%**.");
    let asks = app.chat().backend().asks();
    assert_eq!(asks.len(), 1);
    assert_eq!(asks[0].filenames(), vec!["Q3.pdf", "Annual Report.pdf"]);
}

#[tokio::test]
async fn viewer_controls_drive_the_open_document() {
    let mut app = app();
    app.open_document(&id_for_url(&app, BUDGET_PATH)).await;

    assert!(app.scroll_to_bottom().await);
    assert_eq!(app.viewer().state().pages_rendered, 5);

    app.zoom_in().await;
    assert_eq!(app.viewer().container().zoom_label(), Some("120%"));
    app.zoom_out().await;
    assert_eq!(app.viewer().container().zoom_label(), Some("100%"));

    app.resize(600.0).await;
    assert_eq!(app.viewer().state().viewport_width, 600.0);
    assert_eq!(app.viewer().container().page_numbers(), vec![1, 2, 3, 4, 5]);
}
