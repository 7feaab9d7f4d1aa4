pub mod camera;
pub mod diagnostics;
pub mod hand;
pub mod pipeline;
pub mod preview;
pub mod settings;
pub mod stream;

use std::net::SocketAddr;
use std::sync::Arc;

use log::LevelFilter;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use camera::dummy::SyntheticCamera;
use diagnostics::stats::StreamStats;
use hand::detector::LandmarkSource;
use hand::error::DetectError;
use hand::replay::ReplayLandmarks;
use hand::synthetic::SyntheticHand;
use pipeline::frame_loop::{FrameLoop, LoopExit};
use preview::sink::{DisplaySink, SnapshotSink};
use preview::stop_key::StopKey;
use settings::types::Settings;
use stream::error::ServerError;
use stream::server::StreamServer;
use stream::slot::BoneSink;

/// Top-level failure of a streaming session.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Server(#[from] ServerError),
    #[error(transparent)]
    Detect(#[from] DetectError),
    #[error("task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Initializes logging to stderr.
///
/// This crate logs at *info*, the WebSocket stack at *warn*. `RUST_LOG`
/// overrides both.
pub fn init_logger() {
    env_logger::Builder::new()
        .filter(None, LevelFilter::Warn)
        .filter(Some(env!("CARGO_CRATE_NAME")), LevelFilter::Info)
        .filter(Some("handstream"), LevelFilter::Info)
        .filter(Some("tungstenite"), LevelFilter::Warn)
        .filter(Some("tokio_tungstenite"), LevelFilter::Warn)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Create the landmark source.
///
/// A recorded file when `HANDSTREAM_REPLAY` is set, the synthetic hand
/// otherwise.
fn create_landmark_source(settings: &Settings) -> Result<Box<dyn LandmarkSource>, DetectError> {
    match &settings.replay_path {
        Some(path) => Ok(Box::new(ReplayLandmarks::load(path)?)),
        None => Ok(Box::new(SyntheticHand::new())),
    }
}

fn create_display_sink(settings: &Settings) -> Option<Box<dyn DisplaySink>> {
    let path = settings.preview_path.clone()?;
    let stop_key = if settings.stop_key {
        match StopKey::listen_stdin() {
            Ok(key) => {
                info!("type q and Enter to stop");
                Some(key)
            }
            Err(e) => {
                warn!("stop key unavailable: {e}");
                None
            }
        }
    } else {
        None
    };
    let sink = SnapshotSink::new(path, stop_key);
    info!("writing preview to {}", sink.path().display());
    Some(Box::new(sink))
}

/// A running endpoint plus frame loop.
pub struct Session {
    local_addr: SocketAddr,
    stats: Arc<Mutex<StreamStats>>,
    shutdown: watch::Sender<bool>,
    server: JoinHandle<()>,
    frame_loop: JoinHandle<LoopExit>,
}

impl Session {
    /// Open the landmark source, bind the endpoint and start streaming.
    pub async fn start(settings: &Settings) -> Result<Self, AppError> {
        let detector = create_landmark_source(settings)?;
        let server = StreamServer::bind(settings.listen_addr)
            .await?
            .with_send_timeout(settings.send_timeout);
        let local_addr = server.local_addr()?;
        let slot = server.slot();

        let stats = Arc::new(Mutex::new(StreamStats::new()));
        let (shutdown, shutdown_rx) = watch::channel(false);
        let frame_loop = FrameLoop::new(
            Box::new(SyntheticCamera::new()),
            detector,
            slot as Arc<dyn BoneSink>,
            Arc::clone(&stats),
        )
        .with_display(create_display_sink(settings))
        .report_every(settings.report_every);

        info!("streaming hand bones on ws://{local_addr}");
        let server = tokio::spawn(server.serve(shutdown_rx.clone()));
        let frame_loop = tokio::spawn(frame_loop.run(shutdown_rx));

        Ok(Self {
            local_addr,
            stats,
            shutdown,
            server,
            frame_loop,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Live diagnostics counters.
    pub fn stats(&self) -> Arc<Mutex<StreamStats>> {
        Arc::clone(&self.stats)
    }

    /// Signal shutdown and wait for the loop and the endpoint to finish.
    pub async fn stop(self) -> Result<LoopExit, AppError> {
        let _ = self.shutdown.send(true);
        let exit = self.frame_loop.await?;
        self.server.await?;
        Ok(exit)
    }

    /// Run until the loop stops on its own or Ctrl-C arrives.
    pub async fn wait(mut self) -> Result<LoopExit, AppError> {
        let finished = tokio::select! {
            joined = &mut self.frame_loop => Some(joined?),
            _ = interrupted() => None,
        };
        match finished {
            Some(exit) => {
                let _ = self.shutdown.send(true);
                self.server.await?;
                Ok(exit)
            }
            None => {
                info!("interrupted, shutting down");
                self.stop().await
            }
        }
    }
}

async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("cannot listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}

/// Stream until operator stop, interrupt or capture loss.
pub async fn run(settings: Settings) -> Result<(), AppError> {
    let session = Session::start(&settings).await?;
    let exit = session.wait().await?;
    info!(
        "stopped ({}): {} frames, {} sent, {} dropped",
        exit.reason, exit.stats.frame_count, exit.stats.sent_count, exit.stats.drop_count
    );
    if let Ok(json) = serde_json::to_string(&exit.stats) {
        debug!("final diagnostics: {json}");
    }
    Ok(())
}
