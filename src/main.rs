use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use simplelog::{Config, LevelFilter, WriteLogger};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use finassist::App;
use finassist::chat::{ChatBackend, HttpBackend, Sender, parse_response, render_plain};
use finassist::documents::{ContextFile, DiskBlobStore, UploadCandidate};
use finassist::library::{resolve_data_paths, resolve_log_path};
use finassist::panic_handler::initialize_panic_handler;
use finassist::settings::Settings;
use finassist::viewer::{DefaultEngine, PdfEngine};

#[derive(Parser)]
#[command(name = "finassist", about = "PDF viewer and document Q&A assistant")]
struct Cli {
    /// Settings file (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for stored uploads and chat context
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Question-answering service base URL (overrides the settings file)
    #[arg(long)]
    endpoint: Option<String>,

    /// off, error, warn, info, debug or trace
    #[arg(long, default_value = "info")]
    log_level: String,
}

const HELP: &str = "\
commands:
  list                      list documents (* open, + in context)
  upload <path>...          upload PDF files
  add-url <name> <url>      register a remote document
  open <id|#>               show a document
  scroll [px]               scroll by px, or to the bottom
  zoom-in | zoom-out        change zoom
  resize <width>            set viewport width
  ctx                       show chat context
  ctx add <id|#>            attach a document to questions
  ctx rm <id|#>             detach a document
  ask <question>            ask about the context documents
  delete <id|#>             remove a document
  status                    viewer state
  help | quit";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    initialize_panic_handler();

    let level = cli.log_level.parse().unwrap_or(LevelFilter::Info);
    let log_path = resolve_log_path()?;
    WriteLogger::init(
        level,
        Config::default(),
        File::create(&log_path).with_context(|| format!("Failed to create {log_path:?}"))?,
    )?;
    info!("Starting FinAssist");

    let mut settings = Settings::load_or_create(cli.config.as_deref());
    if let Some(endpoint) = cli.endpoint {
        settings.chat.endpoint = endpoint;
    }

    let paths = resolve_data_paths(cli.data_dir.as_deref())?;
    let blobs = DiskBlobStore::open(&paths.blobs_dir)?;
    let backend = HttpBackend::new(
        &settings.chat.endpoint,
        Duration::from_secs(settings.chat.request_timeout_secs),
    )?;

    let mut app = App::new(
        &settings,
        DefaultEngine::default(),
        backend,
        Box::new(blobs),
        ContextFile::with_file(&paths.context_file),
    );
    app.startup();

    let result = run_repl(&mut app).await;
    if let Err(e) = &result {
        error!("Application error: {e:?}");
    }
    info!("Shutting down FinAssist");
    result
}

async fn run_repl<E: PdfEngine, B: ChatBackend>(app: &mut App<E, B>) -> Result<()> {
    let mut printed = 0;
    print_new_messages(app, &mut printed);

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if !handle_command(app, line.trim()).await {
            break;
        }
        print_new_messages(app, &mut printed);
    }
    Ok(())
}

/// Returns false when the user quits
async fn handle_command<E: PdfEngine, B: ChatBackend>(app: &mut App<E, B>, line: &str) -> bool {
    let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();

    match command {
        "" => {}
        "quit" | "exit" => return false,
        "help" => println!("{HELP}"),
        "list" => print_documents(app),
        "upload" => {
            let mut candidates = Vec::new();
            for path in rest.split_whitespace() {
                match UploadCandidate::from_path(path.as_ref()) {
                    Ok(candidate) => candidates.push(candidate),
                    Err(e) => println!("{e:#}"),
                }
            }
            let report = app.upload(candidates).await;
            println!(
                "{} uploaded, {} rejected",
                report.added.len(),
                report.rejected.len()
            );
        }
        "add-url" => match rest.rsplit_once(' ') {
            Some((name, url)) if !name.trim().is_empty() => {
                let id = app.add_remote(name.trim(), url);
                println!("added {id}");
            }
            _ => println!("usage: add-url <name> <url>"),
        },
        "open" => {
            if let Some(id) = resolve_id(app, rest) {
                app.open_document(&id).await;
                print_status(app);
            }
        }
        "scroll" => {
            let rendered = match rest.parse::<f32>() {
                Ok(delta) => app.scroll_by(delta).await,
                Err(_) => app.scroll_to_bottom().await,
            };
            if !rendered {
                println!("(no new pages)");
            }
            print_status(app);
        }
        "zoom-in" => {
            app.zoom_in().await;
            print_status(app);
        }
        "zoom-out" => {
            app.zoom_out().await;
            print_status(app);
        }
        "resize" => match rest.parse::<f32>() {
            Ok(width) if width > 0.0 => {
                app.resize(width).await;
                print_status(app);
            }
            _ => println!("usage: resize <width>"),
        },
        "ctx" => {
            let (sub, arg) = rest.split_once(' ').unwrap_or((rest, ""));
            match sub {
                "" => {
                    for doc in app.context_documents() {
                        println!("  {}  {}", doc.id, doc.display_name());
                    }
                }
                "add" => {
                    if let Some(id) = resolve_id(app, arg.trim()) {
                        if !app.add_to_context(&id) {
                            println!("{id} is unknown or already in the context");
                        }
                    }
                }
                "rm" => {
                    if let Some(id) = resolve_id(app, arg.trim()) {
                        if !app.remove_from_context(&id) {
                            println!("{id} is not in the context");
                        }
                    }
                }
                _ => println!("usage: ctx [add|rm <id>]"),
            }
        }
        "ask" => {
            app.send_message(rest).await;
        }
        "delete" => {
            if let Some(id) = resolve_id(app, rest) {
                if !app.delete_document(&id) {
                    println!("unknown document {id}");
                }
            }
        }
        "status" => print_status(app),
        other => println!("unknown command `{other}` (try `help`)"),
    }
    true
}

/// Accept either a document id or its 1-based position in `list`
fn resolve_id<E: PdfEngine, B: ChatBackend>(app: &App<E, B>, token: &str) -> Option<String> {
    if token.is_empty() {
        println!("missing document id");
        return None;
    }
    let docs = app.registry().list();
    if let Ok(position) = token.parse::<usize>() {
        if let Some(doc) = position.checked_sub(1).and_then(|idx| docs.get(idx)) {
            return Some(doc.id.clone());
        }
    }
    Some(token.to_string())
}

fn print_documents<E: PdfEngine, B: ChatBackend>(app: &App<E, B>) {
    let open = app.viewer().open_document_id();
    for (idx, doc) in app.registry().list().iter().enumerate() {
        let marker = match (open == Some(doc.id.as_str()), app.context().contains(&doc.id)) {
            (true, true) => "*+",
            (true, false) => "* ",
            (false, true) => " +",
            (false, false) => "  ",
        };
        let origin = doc.url().unwrap_or("uploaded");
        println!(
            "{marker} {:>2}. {:<32}  {}  ({origin})",
            idx + 1,
            doc.display_name(),
            doc.id
        );
    }
}

fn print_status<E: PdfEngine, B: ChatBackend>(app: &App<E, B>) {
    let viewer = app.viewer();
    let container = viewer.container();
    if let Some(panel) = container.error_panel() {
        println!("[viewer] {panel}");
        return;
    }
    if container.welcome_visible() {
        println!("[viewer] no document open");
        return;
    }
    let state = viewer.state();
    println!(
        "[viewer] {}: pages {:?} ({} of {} rendered), zoom {}{}",
        viewer.open_document_id().unwrap_or("-"),
        container.page_numbers(),
        state.pages_rendered,
        state.total_pages,
        container.zoom_label().unwrap_or("-"),
        if container.is_loading() { ", loading" } else { "" }
    );
}

fn print_new_messages<E: PdfEngine, B: ChatBackend>(app: &App<E, B>, printed: &mut usize) {
    let log = app.chat_log();
    for message in log.since(*printed) {
        match message.sender {
            Sender::User => {}
            Sender::Assistant => {
                println!("{}\n", render_plain(&parse_response(&message.text)));
            }
        }
    }
    *printed = log.len();
}
