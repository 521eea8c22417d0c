mod app;
mod catalog;
mod category;
mod config;
mod constants;
mod duration;
mod form;
mod input;
mod session;
mod store;
mod theme;
mod ui;
mod youtube;

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use ratatui::{
  DefaultTerminal,
  crossterm::event::{self, Event, KeyEventKind},
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use app::App;
use catalog::{VideoFields, filter_videos};
use config::Config;
use duration::format_duration;
use session::Session;
use store::VideoStore;
use youtube::MetadataSource;

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about = "Browse and curate a YouTube video directory", long_about = None)]
struct Args {
  /// Path to the video store (default: platform data directory)
  #[arg(long, global = true)]
  store: Option<PathBuf>,

  /// Enable add / edit / delete
  #[arg(long)]
  admin: bool,

  /// Category to select on start
  #[arg(short, long)]
  category: Option<String>,

  /// Initial search text
  #[arg(short, long)]
  search: Option<String>,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Print the catalog, filtered like the interactive view
  List {
    #[arg(short, long, default_value = "All")]
    category: String,
    #[arg(short, long, default_value = "")]
    search: String,
  },
  /// Print the reconciled category list
  Categories,
  /// Suggest categories for a title and optional description
  Detect { title: String, description: Option<String> },
  /// Fetch missing durations and thumbnails for stored videos
  Backfill,
  /// Generate shell completions
  Completions { shell: Shell },
}

// --- Logging ---

/// Interactive mode owns the terminal, so logs go to a daily file in the data
/// directory. Subcommands log to stderr.
fn init_tracing(interactive: bool) -> Option<WorkerGuard> {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("porch=info"));
  if interactive {
    let dir = store::data_dir()?.join("logs");
    let appender = tracing_appender::rolling::daily(dir, "porch.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer).with_ansi(false).init();
    Some(guard)
  } else {
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    None
  }
}

// --- Setup ---

async fn open_store(args: &Args, config: &Config) -> Result<VideoStore> {
  let data_dir = store::data_dir().ok_or_else(|| anyhow!("Could not determine a data directory"))?;
  let session = Session::restore_or_create(&data_dir.join("session.json")).await.context("Anonymous sign-in failed")?;
  let path = args
    .store
    .clone()
    .or_else(|| config.store_path.clone())
    .or_else(VideoStore::default_path)
    .ok_or_else(|| anyhow!("Could not determine a store path"))?;
  let store = VideoStore::open(path, session);
  info!(path = %store.path().display(), "store: opening");
  Ok(store)
}

// --- Subcommands ---

async fn run_command(command: Command, args: &Args, config: &Config) -> Result<()> {
  match command {
    Command::Completions { shell } => {
      clap_complete::generate(shell, &mut Args::command(), "porch", &mut std::io::stdout());
    }
    Command::Detect { title, description } => {
      println!("{}", category::detect(&title, description.as_deref().unwrap_or("")).join(", "));
    }
    Command::Categories => {
      let videos = open_store(args, config).await?.list().await?;
      for name in category::reconcile(&videos) {
        println!("{}", name);
      }
    }
    Command::List { category, search } => {
      let videos = open_store(args, config).await?.list().await?;
      for video in filter_videos(&videos, &category, &search) {
        let duration = format_duration(video.duration.as_deref()).unwrap_or_else(|| "--:--".to_string());
        println!("{:>8}  {:<16}  {}", duration, video.category, video.title);
      }
    }
    Command::Backfill => {
      let store = open_store(args, config).await?;
      let source = MetadataSource::from_config(config);
      let videos = store.list().await?;
      let hits = youtube::backfill(&source, &videos).await;
      let mut updated = 0usize;
      for (id, meta) in hits {
        let Some(video) = videos.iter().find(|v| v.id == id) else { continue };
        let mut fields = VideoFields::from(video);
        if fields.duration.is_none() {
          fields.duration = meta.duration;
        }
        if fields.thumbnail.is_none() {
          fields.thumbnail = meta.thumbnail_url;
        }
        if fields == VideoFields::from(video) {
          continue;
        }
        match store.update(&id, fields).await {
          Ok(()) => updated += 1,
          Err(e) => warn!(id = %id, err = %format!("{:#}", e), "backfill: update failed"),
        }
      }
      println!("Updated {} of {} videos.", updated, videos.len());
    }
  }
  Ok(())
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
  let mut args = Args::parse();
  let config = Config::load();
  let _guard = init_tracing(args.command.is_none());

  if let Some(command) = args.command.take() {
    return run_command(command, &args, &config).await;
  }

  let store = open_store(&args, &config).await?;
  let metadata = MetadataSource::from_config(&config);
  info!(source = metadata.label(), admin = args.admin, "porch: starting");

  let default_hook = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    ratatui::restore();
    default_hook(info);
  }));

  let mut app = App::new(store, metadata, &config, args.admin);
  if let Some(category) = &args.category {
    app.select_category(category);
  }
  if let Some(search) = &args.search {
    app.set_search(search);
  }

  let mut terminal = ratatui::init();
  let result = run(&mut terminal, &mut app).await;
  ratatui::restore();
  app.save_config(config);
  result
}

async fn run(terminal: &mut DefaultTerminal, app: &mut App) -> Result<()> {
  app.trigger_reload();

  loop {
    app.check_pending();
    app.expire_error();

    terminal.draw(|frame| ui::ui(frame, app))?;

    if event::poll(Duration::from_millis(50))? {
      match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
          input::handle_key_event(app, key);
        }
        _ => {}
      }
    }

    if app.should_quit {
      break;
    }
  }

  info!("porch: exiting");
  Ok(())
}
