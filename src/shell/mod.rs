pub mod commands;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use image::{ImageFormat, RgbImage};
use log::{info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::analysis::RemoteAnalyzer;
use crate::capture::{CameraProvider, DeviceProvider, ImageDirectoryProvider};
use crate::pipeline::{CaptureStatus, LoopExit, SessionEvent, SystemClock};
use crate::session::{Session, SessionParts};
use crate::settings::{SettingsStore, UserSettings};

use self::commands::{Command, EMPTY_EXPORT_NOTICE};

const DEFAULT_SETTINGS_FILE: &str = "facesentiment.json";

#[derive(Debug, Parser)]
#[command(author, version, about = "Webcam face emotion capture and per-minute logging")]
pub struct Args {
    /// JSON settings file; defaults apply when it is missing.
    #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
    pub settings: PathBuf,
    /// Directory of frames replayed as a capture device instead of the webcam.
    /// Repeat for more devices.
    #[arg(long = "frames-dir")]
    pub frames_dirs: Vec<PathBuf>,
    /// Start over from the first frame when a directory runs out.
    #[arg(long)]
    pub repeat: bool,
    /// Device index to open, overriding the settings file.
    #[arg(long)]
    pub device: Option<u32>,
    /// Base URL of the analyzer service, overriding the settings file.
    #[arg(long)]
    pub analyzer_url: Option<String>,
    /// Keep the latest annotated frame in this JPEG file.
    #[arg(long)]
    pub preview: Option<PathBuf>,
    /// Directory the CSV export is written to, overriding the settings file.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
    /// Start capturing immediately.
    #[arg(long)]
    pub autostart: bool,
}

/// Where frames come from for this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceSource {
    Camera,
    Directories,
}

impl Args {
    pub fn device_source(&self) -> DeviceSource {
        if self.frames_dirs.is_empty() {
            DeviceSource::Camera
        } else {
            DeviceSource::Directories
        }
    }

    pub fn device_provider(&self) -> Arc<dyn DeviceProvider> {
        match self.device_source() {
            DeviceSource::Camera => Arc::new(CameraProvider::new()),
            DeviceSource::Directories => Arc::new(
                ImageDirectoryProvider::new(self.frames_dirs.clone()).repeating(self.repeat),
            ),
        }
    }

    /// Flags win over the settings file for this run only.
    pub fn apply_overrides(&self, settings: &mut UserSettings) {
        if let Some(index) = self.device {
            settings.capture.device_index = index;
        }
        if let Some(url) = &self.analyzer_url {
            settings.analyzer.endpoint = url.clone();
        }
        if let Some(dir) = &self.output_dir {
            settings.export.output_dir = dir.clone();
        }
    }
}

pub async fn run_shell(args: Args) -> Result<()> {
    let store = SettingsStore::new(args.settings.clone())?;
    let mut settings = store.current();
    args.apply_overrides(&mut settings);

    let analyzer = RemoteAnalyzer::new(&settings.analyzer.endpoint, settings.analyzer_timeout());
    info!("using analyzer at {}", analyzer.analyze_url());
    info!("capturing from {:?}", args.device_source());

    let session = Arc::new(Session::new(SessionParts {
        provider: args.device_provider(),
        analyzer: Arc::new(analyzer),
        clock: Arc::new(SystemClock),
        device_index: settings.capture.device_index,
        config: settings.loop_config(),
    }));
    info!("session {} ready", session.id());

    let printer = spawn_event_printer(session.subscribe());
    let preview = args
        .preview
        .clone()
        .map(|path| spawn_preview_writer(session.frames(), path));

    if args.autostart {
        report(commands::start_capture(&session).await);
    }
    println!("commands: toggle (t), start, stop, export (e), status (s), quit (q)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines
        .next_line()
        .await
        .context("Failed to read from stdin")?
    {
        if line.trim().is_empty() {
            continue;
        }
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(err) => {
                eprintln!("{err}");
                continue;
            }
        };

        match command {
            Command::Toggle => report(commands::toggle_capture(&session).await),
            Command::Start => report(commands::start_capture(&session).await),
            Command::Stop => report(commands::stop_capture(&session).await),
            Command::Export => {
                match commands::export_log(&session, &settings.export.output_dir) {
                    Ok(Some(path)) => println!("exported {}", path.display()),
                    Ok(None) => println!("{EMPTY_EXPORT_NOTICE}"),
                    Err(err) => eprintln!("export failed: {err}"),
                }
            }
            Command::Status => match commands::get_status(&session).await {
                Ok(status) => println!("{}", status.summary_line()),
                Err(err) => eprintln!("{err}"),
            },
            Command::Quit => break,
        }
    }

    session.shutdown().await?;
    printer.abort();
    if let Some(preview) = preview {
        preview.abort();
    }
    info!("session {} closed with {} records", session.id(), session.log().len());
    Ok(())
}

fn report(result: Result<CaptureStatus, String>) {
    match result {
        Ok(status) => println!("capture {}", status.as_str()),
        Err(err) => eprintln!("{err}"),
    }
}

fn spawn_event_printer(mut events: broadcast::Receiver<SessionEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SessionEvent::Warning { message }) => eprintln!("warning: {message}"),
                Ok(SessionEvent::SummaryLogged(record)) => println!(
                    "{} - {}: {}",
                    record.start_label(),
                    record.end_label(),
                    record.dominant_emotion
                ),
                Ok(SessionEvent::CaptureStopped {
                    exit: LoopExit::DeviceFailure(_),
                }) => println!("capture Stopped"),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!("event printer missed {missed} events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// Mirror the latest annotated frame into `path`, at most every 200ms.
fn spawn_preview_writer(
    mut frames: watch::Receiver<Option<Arc<RgbImage>>>,
    path: PathBuf,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while frames.changed().await.is_ok() {
            let Some(frame) = frames.borrow_and_update().clone() else {
                continue;
            };
            let target = path.clone();
            let saved = tokio::task::spawn_blocking(move || {
                frame.save_with_format(&target, ImageFormat::Jpeg)
            })
            .await;
            match saved {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!("failed to write preview {}: {}", path.display(), err),
                Err(err) => warn!("preview worker failed: {err}"),
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    })
}
