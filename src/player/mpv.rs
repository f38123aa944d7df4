//! mpv backend
//!
//! Spawns mpv with an IPC socket, forwards commands over it and turns mpv
//! events into [`PlayerEvent`]s.

use serde_json::Value;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::protocol::{MpvCommand, MpvEvent, MpvMessage, OBSERVE_DURATION, OBSERVE_TIME_POS};
use super::{PlaybackError, Player, PlayerEvent};

const CONNECT_ATTEMPTS: u32 = 10;

/// How to launch mpv
#[derive(Debug, Clone)]
pub struct MpvOptions {
    /// Executable, looked up in PATH when relative
    pub program: String,
    pub extra_args: Vec<String>,
    pub socket_path: PathBuf,
}

impl Default for MpvOptions {
    fn default() -> Self {
        Self {
            program: "mpv".to_string(),
            extra_args: Vec::new(),
            socket_path: std::env::temp_dir()
                .join(format!("tvshows-mpv-{}.sock", std::process::id())),
        }
    }
}

/// A running mpv instance
pub struct MpvPlayer {
    child: Child,
    commands: mpsc::UnboundedSender<MpvCommand>,
    socket_path: PathBuf,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl MpvPlayer {
    /// Launch mpv idle and connect to its IPC socket.
    ///
    /// Returns the player and the receiving end of its event channel.
    pub async fn spawn(
        options: &MpvOptions,
    ) -> Result<(Self, mpsc::UnboundedReceiver<PlayerEvent>), PlaybackError> {
        let _ = std::fs::remove_file(&options.socket_path);

        let mut cmd = Command::new(&options.program);
        cmd.arg(format!(
            "--input-ipc-server={}",
            options.socket_path.display()
        ))
        .arg("--idle=yes")
        .arg("--force-window=immediate")
        .arg("--keep-open=no")
        .arg("--no-terminal")
        .args(&options.extra_args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);

        info!(program = %options.program, socket = %options.socket_path.display(), "Spawning mpv");
        let child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PlaybackError::NotFound(options.program.clone())
            } else {
                PlaybackError::StartFailed(e)
            }
        })?;

        let (read_half, write_half) = connect(&options.socket_path).await?;
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let writer = tokio::spawn(writer_loop(write_half, command_rx));
        let reader = tokio::spawn(reader_loop(read_half, event_tx));

        let player = Self {
            child,
            commands: command_tx,
            socket_path: options.socket_path.clone(),
            reader,
            writer,
        };
        player.send(MpvCommand::observe_property(OBSERVE_TIME_POS, "time-pos"))?;
        player.send(MpvCommand::observe_property(OBSERVE_DURATION, "duration"))?;
        Ok((player, event_rx))
    }

    fn send(&self, command: MpvCommand) -> Result<(), PlaybackError> {
        debug!(?command, "Queueing mpv command");
        self.commands
            .send(command)
            .map_err(|_| PlaybackError::Disconnected)
    }

    /// Ask mpv to quit and wait briefly for it to exit
    pub async fn shutdown(mut self) {
        let _ = self.send(MpvCommand::quit());
        if tokio::time::timeout(Duration::from_secs(2), self.child.wait())
            .await
            .is_err()
        {
            let _ = self.child.kill().await;
        }
    }
}

impl Player for MpvPlayer {
    fn load(&mut self, url: &str, speed: f64) -> Result<(), PlaybackError> {
        self.send(MpvCommand::loadfile(url))?;
        self.send(MpvCommand::set_pause(false))?;
        self.send(MpvCommand::set_speed(speed))
    }

    fn set_paused(&mut self, paused: bool) -> Result<(), PlaybackError> {
        self.send(MpvCommand::set_pause(paused))
    }

    fn set_speed(&mut self, speed: f64) -> Result<(), PlaybackError> {
        self.send(MpvCommand::set_speed(speed))
    }

    fn seek(&mut self, position: f64) -> Result<(), PlaybackError> {
        self.send(MpvCommand::seek_absolute(position))
    }

    fn stop(&mut self) -> Result<(), PlaybackError> {
        self.send(MpvCommand::stop())
    }
}

impl Drop for MpvPlayer {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

#[cfg(unix)]
async fn connect(
    path: &std::path::Path,
) -> Result<
    (
        impl AsyncRead + Send + Unpin + 'static,
        impl AsyncWrite + Send + Unpin + 'static,
    ),
    PlaybackError,
> {
    use tokio::net::UnixStream;

    let mut last_error = None;
    for attempt in 0..CONNECT_ATTEMPTS {
        tokio::time::sleep(Duration::from_millis(100 * (attempt as u64 + 1))).await;
        match UnixStream::connect(path).await {
            Ok(stream) => return Ok(stream.into_split()),
            Err(e) => {
                debug!(attempt = attempt + 1, "mpv IPC connect failed: {}", e);
                last_error = Some(e);
            }
        }
    }
    Err(PlaybackError::Ipc(
        last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "socket never appeared".to_string()),
    ))
}

#[cfg(not(unix))]
async fn connect(
    _path: &std::path::Path,
) -> Result<(tokio::io::Empty, tokio::io::Sink), PlaybackError> {
    Err(PlaybackError::Unsupported)
}

async fn writer_loop<W: AsyncWrite + Unpin>(
    mut writer: W,
    mut commands: mpsc::UnboundedReceiver<MpvCommand>,
) {
    let mut request_id = 0;
    while let Some(command) = commands.recv().await {
        request_id += 1;
        let line = match command.to_line(request_id) {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to encode mpv command: {}", e);
                continue;
            }
        };
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            warn!("mpv IPC write failed: {}", e);
            break;
        }
        if let Err(e) = writer.flush().await {
            warn!("mpv IPC flush failed: {}", e);
            break;
        }
    }
}

async fn reader_loop<R: AsyncRead + Unpin>(reader: R, events: mpsc::UnboundedSender<PlayerEvent>) {
    let mut lines = BufReader::new(reader).lines();
    let mut translator = EventTranslator::default();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match MpvMessage::parse(line) {
                    Ok(MpvMessage::Event(event)) => {
                        if let Some(event) = translator.translate(event) {
                            if events.send(event).is_err() {
                                break;
                            }
                        }
                    }
                    Ok(MpvMessage::Response(response)) if !response.is_success() => {
                        warn!(request_id = response.request_id, error = %response.error, "mpv command failed");
                    }
                    Ok(MpvMessage::Response(_)) => {}
                    Err(e) => warn!("Failed to parse mpv message: {} - {}", e, line),
                }
            }
            Ok(None) => {
                info!("mpv IPC connection closed");
                let _ = events.send(PlayerEvent::Closed);
                break;
            }
            Err(e) => {
                warn!("mpv IPC read failed: {}", e);
                let _ = events.send(PlayerEvent::Closed);
                break;
            }
        }
    }
}

/// Folds raw mpv events into player events
#[derive(Debug, Default)]
pub struct EventTranslator {
    duration: f64,
}

impl EventTranslator {
    pub fn translate(&mut self, event: MpvEvent) -> Option<PlayerEvent> {
        match event.event.as_str() {
            "property-change" => {
                let value = event.data.as_ref().and_then(Value::as_f64);
                match event.id {
                    Some(OBSERVE_DURATION) => {
                        self.duration = value.unwrap_or(0.0);
                        None
                    }
                    Some(OBSERVE_TIME_POS) => value.map(|position| PlayerEvent::Progress {
                        position,
                        duration: self.duration,
                    }),
                    _ => None,
                }
            }
            "start-file" => {
                self.duration = 0.0;
                None
            }
            "end-file" => match event.reason.as_deref() {
                Some("eof") => Some(PlayerEvent::Ended),
                Some("error") => Some(PlayerEvent::Failed(
                    event
                        .file_error
                        .unwrap_or_else(|| "unknown playback error".to_string()),
                )),
                Some("quit") => Some(PlayerEvent::Closed),
                // stop / redirect: we replaced the file ourselves
                _ => None,
            },
            _ => None,
        }
    }
}
