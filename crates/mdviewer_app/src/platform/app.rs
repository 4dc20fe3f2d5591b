use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use mdviewer_engine::{
    DocumentEngine, EngineConfig, MarkdownRenderer, Surface, UserCommand, ViewSession,
    WatchSettings,
};
use mdviewer_logging::{viewer_debug, viewer_info, viewer_warn};
use tokio::runtime::{Builder, Runtime};
use tokio::sync::mpsc;

use super::args::Args;
use super::commands;
use super::logging;
use super::surface::{HtmlFileSurface, TerminalSurface};

pub fn run_app() -> Result<()> {
    let args = Args::parse();
    logging::initialize(&args)?;

    let background = Builder::new_multi_thread()
        .thread_name("mdviewer-bg")
        .enable_all()
        .build()
        .context("cannot start background runtime")?;
    let ui = Builder::new_current_thread()
        .enable_all()
        .build()
        .context("cannot start UI runtime")?;

    let config = EngineConfig {
        document: args.file.clone(),
        watch: WatchSettings {
            debounce: args.debounce(),
        },
    };
    let engine = DocumentEngine::start(config, background.handle().clone()).with_context(|| {
        match &args.file {
            Some(file) => format!("cannot open {}", file.display()),
            None => "cannot start the viewer".to_string(),
        }
    })?;
    let engine = Arc::new(engine);
    match engine.document() {
        Some(path) => viewer_info!("document: {:?}", path),
        None => viewer_info!("no document given; use `open <path>`"),
    }

    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    commands::spawn_stdin_reader(commands_tx.clone()).context("cannot read commands")?;
    eprintln!("{}", commands::HELP);

    match &args.output {
        Some(target) => {
            viewer_info!("writing rendered page to {:?}", target);
            run_session(&ui, &engine, HtmlFileSurface::new(target), commands_tx, commands_rx);
        }
        None => run_session(
            &ui,
            &engine,
            TerminalSurface::new(io::stdout()),
            commands_tx,
            commands_rx,
        ),
    }

    engine.shutdown();
    background.shutdown_timeout(Duration::from_millis(500));
    Ok(())
}

fn run_session<S: Surface>(
    ui: &Runtime,
    engine: &Arc<DocumentEngine>,
    surface: S,
    commands_tx: mpsc::UnboundedSender<UserCommand>,
    commands_rx: mpsc::UnboundedReceiver<UserCommand>,
) {
    let session = ViewSession::new(engine.clone(), MarkdownRenderer::default(), surface);
    ui.block_on(async move {
        tokio::spawn(close_on_ctrl_c(commands_tx));
        session.run(commands_rx).await;
    });
}

async fn close_on_ctrl_c(commands: mpsc::UnboundedSender<UserCommand>) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            viewer_debug!("ctrl-c received");
            let _ = commands.send(UserCommand::Close);
        }
        Err(err) => viewer_warn!("cannot listen for ctrl-c: {}", err),
    }
}
