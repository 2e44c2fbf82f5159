//! Unix-socket [`CommandSource`] implementation.
//!
//! Lets scripts and the `--simulate` mode drive tabtangle without a
//! browser.  Every line received is parsed as one JSON [`Command`], the
//! same objects the extension sends:
//!
//! ```json
//! {"action":"set_mode","mode":"useless"}
//! {"action":"activate_useless_mode"}
//! {"action":"CLEAR_CHAOS"}
//! ```

use crate::command::Command;
use crate::traits::CommandSource;
use log::{debug, error, info, warn};
use std::io::{BufRead, BufReader};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::mpsc;

/// File name of the socket inside the runtime directory.
pub const SOCKET_NAME: &str = "tabtangle.sock";

/// A [`CommandSource`] that listens on a Unix stream socket for
/// newline-delimited JSON commands.
///
/// Connections are served one at a time.  Malformed lines are logged and
/// skipped; the connection stays open.
pub struct UnixSocketListener {
    path: PathBuf,
}

/// Errors produced by the Unix socket listener.
#[derive(Debug, thiserror::Error)]
pub enum UnixSocketError {
    #[error("could not bind {path}: {source}")]
    Bind {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// `$XDG_RUNTIME_DIR/tabtangle.sock`, or the temp directory when no
/// runtime directory is set.
pub fn default_socket_path() -> PathBuf {
    std::env::var_os("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir)
        .join(SOCKET_NAME)
}

impl UnixSocketListener {
    /// The socket file is created by [`run`](CommandSource::run) and
    /// removed again when it returns.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Forward every command of one connection.  Returns `false` once the
    /// sink is gone.
    fn serve(&self, stream: UnixStream, sink: &mpsc::Sender<Command>) -> bool {
        for line in BufReader::new(stream).lines() {
            let text = match line {
                Ok(text) => text,
                Err(e) => {
                    warn!("read error: {}", e);
                    break;
                }
            };
            if text.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Command>(&text) {
                Ok(cmd) => {
                    debug!("socket: {}", cmd);
                    if sink.send(cmd).is_err() {
                        return false;
                    }
                }
                Err(e) => error!("bad command {:?}: {}", text, e),
            }
        }
        true
    }
}

impl CommandSource for UnixSocketListener {
    type Error = UnixSocketError;

    /// Bind the socket and serve connections until the sink closes.
    fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), Self::Error> {
        // A previous instance may have left its socket behind.
        let _ = std::fs::remove_file(&self.path);

        let listener = UnixListener::bind(&self.path).map_err(|source| UnixSocketError::Bind {
            path: self.path.clone(),
            source,
        })?;
        info!("listening on {}", self.path.display());

        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    debug!("client connected");
                    if !self.serve(stream, &sink) {
                        info!("sink closed, shutting down");
                        break;
                    }
                    debug!("client disconnected");
                }
                Err(e) => error!("accept error: {}", e),
            }
        }
        let _ = std::fs::remove_file(&self.path);
        Ok(())
    }
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Mode, Trigger};
    use std::io::Write;
    use std::time::Duration;

    /// Start a listener on a fresh socket and send `lines` over one
    /// connection; returns whatever arrived.
    fn send_lines(lines: &[&str]) -> Vec<Command> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SOCKET_NAME);
        let (tx, rx) = mpsc::channel();

        let listener_path = path.clone();
        std::thread::spawn(move || {
            let mut listener = UnixSocketListener::new(&listener_path);
            let _ = listener.run(tx);
        });
        std::thread::sleep(Duration::from_millis(150));

        {
            let mut stream = UnixStream::connect(&path).expect("connect");
            for line in lines {
                writeln!(stream, "{}", line).unwrap();
            }
            stream.shutdown(std::net::Shutdown::Write).unwrap();
        }
        std::thread::sleep(Duration::from_millis(150));
        rx.try_iter().collect()
    }

    #[test]
    fn commands_arrive_in_order() {
        let cmds = send_lines(&[
            r#"{"action":"set_mode","mode":"useless"}"#,
            r#"{"action":"activate_useless_mode"}"#,
            "",
            r#"{"action":"CLEAR_CHAOS","trigger":"gesture"}"#,
        ]);
        assert_eq!(
            cmds,
            vec![
                Command::SetMode { mode: Mode::Useless },
                Command::ActivateUselessMode,
                Command::ClearChaos {
                    trigger: Trigger::Gesture
                },
            ]
        );
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let cmds = send_lines(&[
            "not json at all",
            r#"{"action":"EXPLODE"}"#,
            r#"{"action":"organize_windows"}"#,
        ]);
        assert_eq!(cmds, vec![Command::OrganizeWindows]);
    }

    #[test]
    fn default_path_ends_with_socket_name() {
        assert!(default_socket_path().ends_with(SOCKET_NAME));
    }
}
