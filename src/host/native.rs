//! [`WindowHost`] backed by the browser, over Chrome native messaging.
//!
//! The browser starts tabtangle as a native messaging host and talks to it
//! over stdin/stdout.  Every message is one frame: a 4-byte length in
//! native byte order followed by that many bytes of UTF-8 JSON.
//!
//! | Direction           | Payload                                        |
//! |---------------------|------------------------------------------------|
//! | daemon → extension  | `{"id":3,"call":{"method":"windows"}}`         |
//! | extension → daemon  | `{"reply":{"id":3,"ok":[...]}}`                |
//! | extension → daemon  | `{"reply":{"id":3,"error":"No window..."}}`    |
//! | extension → daemon  | `{"command":{"action":"organize_windows"}}`    |
//!
//! One stdin stream carries both replies and commands, so [`NativeSource`]
//! owns the reader: commands go to the dispatcher, replies are handed to
//! the [`NativeHost`] waiting for them.

use crate::command::{
    Command, CreateWindow, DisplayInfo, TabId, WindowId, WindowInfo, WindowUpdate,
};
use crate::traits::{CommandSource, WindowHost};
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::io::{ErrorKind, Read, Write};
use std::sync::mpsc;

/// Largest frame Chrome accepts from a native host.
pub const MAX_OUTBOUND_FRAME: usize = 1024 * 1024;

/// Largest frame we are willing to buffer from the browser.
pub const MAX_INBOUND_FRAME: usize = 64 * 1024 * 1024;

/// Errors produced by the native messaging bridge.
#[derive(Debug, thiserror::Error)]
pub enum NativeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("frame of {0} bytes exceeds the limit")]
    FrameTooLarge(usize),
    /// The extension ran the call and reported an error.
    #[error("browser rejected the call: {0}")]
    Rejected(String),
    #[error("browser disconnected")]
    Disconnected,
}

/// Read one frame.  Returns `Ok(None)` on a clean end of stream, that is
/// when the stream ends before the first header byte.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Option<Vec<u8>>, NativeError> {
    let mut len = [0u8; 4];
    let mut filled = 0;
    while filled < len.len() {
        match reader.read(&mut len[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => {
                return Err(std::io::Error::new(
                    ErrorKind::UnexpectedEof,
                    format!("frame header cut off after {} byte(s)", filled),
                )
                .into())
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    let len = u32::from_ne_bytes(len) as usize;
    if len > MAX_INBOUND_FRAME {
        return Err(NativeError::FrameTooLarge(len));
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    Ok(Some(payload))
}

/// Write one frame and flush it.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<(), NativeError> {
    if payload.len() > MAX_OUTBOUND_FRAME {
        return Err(NativeError::FrameTooLarge(payload.len()));
    }
    writer.write_all(&(payload.len() as u32).to_ne_bytes())?;
    writer.write_all(payload)?;
    writer.flush()?;
    Ok(())
}

/// A window/tab API call, tagged by `method`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum HostCall {
    Displays,
    Windows,
    CreateWindow { spec: CreateWindow },
    UpdateWindow { id: WindowId, update: WindowUpdate },
    RemoveWindow { id: WindowId },
    MoveTab { tab: TabId, window: WindowId },
    ActivateTab { tab: TabId },
}

#[derive(Debug, Serialize)]
struct HostRequest<'a> {
    id: u64,
    call: &'a HostCall,
}

/// The extension's answer to one [`HostCall`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HostReply {
    pub id: u64,
    #[serde(default)]
    pub ok: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Inbound {
    Reply(HostReply),
    Command(Command),
}

/// Issues window/tab calls to the extension and blocks for each reply.
///
/// Calls are strictly sequential; a reply whose id does not match the
/// outstanding call (a leftover from a call that already failed) is
/// dropped.
pub struct NativeHost<W: Write> {
    writer: RefCell<W>,
    next_id: Cell<u64>,
    replies: mpsc::Receiver<HostReply>,
}

impl<W: Write> NativeHost<W> {
    fn call<T: DeserializeOwned>(&self, call: HostCall) -> Result<T, NativeError> {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        let payload = serde_json::to_vec(&HostRequest { id, call: &call })?;
        write_frame(&mut *self.writer.borrow_mut(), &payload)?;

        loop {
            let reply = self.replies.recv().map_err(|_| NativeError::Disconnected)?;
            if reply.id != id {
                debug!("dropping stale reply {} (waiting for {})", reply.id, id);
                continue;
            }
            if let Some(error) = reply.error {
                return Err(NativeError::Rejected(error));
            }
            return Ok(serde_json::from_value(reply.ok.unwrap_or(Value::Null))?);
        }
    }
}

impl<W: Write> WindowHost for NativeHost<W> {
    type Error = NativeError;

    fn displays(&self) -> Result<Vec<DisplayInfo>, NativeError> {
        self.call(HostCall::Displays)
    }

    fn windows(&self) -> Result<Vec<WindowInfo>, NativeError> {
        self.call(HostCall::Windows)
    }

    fn create_window(&self, spec: &CreateWindow) -> Result<WindowInfo, NativeError> {
        self.call(HostCall::CreateWindow { spec: spec.clone() })
    }

    fn update_window(&self, id: WindowId, update: &WindowUpdate) -> Result<(), NativeError> {
        self.call(HostCall::UpdateWindow {
            id,
            update: *update,
        })
    }

    fn remove_window(&self, id: WindowId) -> Result<(), NativeError> {
        self.call(HostCall::RemoveWindow { id })
    }

    fn move_tab(&self, tab: TabId, window: WindowId) -> Result<(), NativeError> {
        self.call(HostCall::MoveTab { tab, window })
    }

    fn activate_tab(&self, tab: TabId) -> Result<(), NativeError> {
        self.call(HostCall::ActivateTab { tab })
    }
}

/// Reads every inbound frame, forwarding commands to the dispatcher and
/// replies to the [`NativeHost`].
pub struct NativeSource<R: Read + Send> {
    reader: R,
    replies: mpsc::Sender<HostReply>,
}

impl<R: Read + Send> CommandSource for NativeSource<R> {
    type Error = NativeError;

    /// Returns when the browser closes the port or the sink is gone.
    fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), NativeError> {
        while let Some(frame) = read_frame(&mut self.reader)? {
            match serde_json::from_slice::<Inbound>(&frame) {
                Ok(Inbound::Reply(reply)) => {
                    if self.replies.send(reply).is_err() {
                        debug!("no host waiting for replies");
                    }
                }
                Ok(Inbound::Command(cmd)) => {
                    debug!("native: {}", cmd);
                    if sink.send(cmd).is_err() {
                        info!("sink closed, shutting down");
                        return Ok(());
                    }
                }
                Err(e) => warn!("bad native message: {}", e),
            }
        }
        info!("browser closed the native messaging port");
        Ok(())
    }
}

/// Split one native messaging connection into its host and its source.
///
/// The source must run on its own thread: the host blocks until the
/// source delivers each reply.
pub fn channel<R: Read + Send, W: Write>(reader: R, writer: W) -> (NativeHost<W>, NativeSource<R>) {
    let (tx, rx) = mpsc::channel();
    let host = NativeHost {
        writer: RefCell::new(writer),
        next_id: Cell::new(0),
        replies: rx,
    };
    (host, NativeSource { reader, replies: tx })
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Bounds, Mode, WindowState};
    use serde_json::json;
    use std::io::Cursor;

    fn frames(messages: &[Value]) -> Cursor<Vec<u8>> {
        let mut buf = Vec::new();
        for m in messages {
            write_frame(&mut buf, &serde_json::to_vec(m).unwrap()).unwrap();
        }
        Cursor::new(buf)
    }

    /// Decode every frame the host wrote.
    fn sent(buf: &[u8]) -> Vec<Value> {
        let mut cursor = Cursor::new(buf);
        let mut out = Vec::new();
        while let Some(frame) = read_frame(&mut cursor).unwrap() {
            out.push(serde_json::from_slice(&frame).unwrap());
        }
        out
    }

    /// Run the source over `inbound` to completion and return the commands
    /// it forwarded.
    fn drain<R: Read + Send>(mut source: NativeSource<R>) -> Vec<Command> {
        let (tx, rx) = mpsc::channel();
        source.run(tx).unwrap();
        rx.try_iter().collect()
    }

    #[test]
    fn frame_length_is_native_endian() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"{}").unwrap();
        assert_eq!(&buf[..4], &2u32.to_ne_bytes());
        assert_eq!(&buf[4..], b"{}");
    }

    #[test]
    fn oversized_outbound_frame_is_rejected() {
        let mut buf = Vec::new();
        let big = vec![b' '; MAX_OUTBOUND_FRAME + 1];
        assert!(matches!(
            write_frame(&mut buf, &big),
            Err(NativeError::FrameTooLarge(n)) if n == MAX_OUTBOUND_FRAME + 1
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn end_of_stream_and_truncation() {
        assert!(read_frame(&mut Cursor::new(Vec::new())).unwrap().is_none());

        for cut in 1..4 {
            let header = &2u32.to_ne_bytes()[..cut];
            assert!(
                matches!(
                    read_frame(&mut Cursor::new(header.to_vec())),
                    Err(NativeError::Io(ref e)) if e.kind() == ErrorKind::UnexpectedEof
                ),
                "{} header byte(s) must not read as a clean end",
                cut
            );
        }

        let mut truncated = 10u32.to_ne_bytes().to_vec();
        truncated.extend_from_slice(b"abc");
        assert!(read_frame(&mut Cursor::new(truncated)).is_err());
    }

    #[test]
    fn call_is_framed_with_method_tag() {
        let request = HostRequest {
            id: 4,
            call: &HostCall::MoveTab { tab: 9, window: 2 },
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"id": 4, "call": {"method": "move_tab", "tab": 9, "window": 2}})
        );
    }

    #[test]
    fn source_splits_commands_and_replies() {
        let inbound = frames(&[
            json!({"command": {"action": "set_mode", "mode": "useful"}}),
            json!({"reply": {"id": 1, "ok": null}}),
            json!({"garbage": true}),
            json!({"command": {"action": "organize_windows"}}),
        ]);
        let mut out = Vec::new();
        let (host, source) = channel(inbound, &mut out);

        let cmds = drain(source);
        assert_eq!(
            cmds,
            vec![Command::SetMode { mode: Mode::Useful }, Command::OrganizeWindows]
        );
        assert!(host.remove_window(3).is_ok());
    }

    #[test]
    fn host_decodes_replies_and_skips_stale_ones() {
        let inbound = frames(&[
            json!({"reply": {"id": 1, "ok": [
                {"isPrimary": true, "workArea": {"left": 0, "top": 25, "width": 1440, "height": 875}}
            ]}}),
            json!({"reply": {"id": 1, "ok": "late duplicate"}}),
            json!({"reply": {"id": 2, "ok": [
                {"id": 5, "bounds": {"left": 0, "top": 0, "width": 800, "height": 600},
                 "state": "maximized",
                 "tabs": [{"id": 11, "windowId": 5, "url": "https://a.example", "active": true}]}
            ]}}),
        ]);
        let mut out = Vec::new();
        {
            let (host, source) = channel(inbound, &mut out);
            drain(source);

            let displays = host.displays().unwrap();
            assert_eq!(displays[0].work_area, Bounds::new(0, 25, 1440, 875));

            let windows = host.windows().unwrap();
            assert_eq!(windows[0].state, WindowState::Maximized);
            assert_eq!(windows[0].tabs[0].window_id, 5);

            assert!(matches!(host.windows(), Err(NativeError::Disconnected)));
        }
        let requests = sent(&out);
        assert_eq!(requests[0], json!({"id": 1, "call": {"method": "displays"}}));
        assert_eq!(requests[1], json!({"id": 2, "call": {"method": "windows"}}));
    }

    #[test]
    fn browser_errors_become_rejections() {
        let inbound = frames(&[json!({"reply": {"id": 1, "error": "No window with id: 5."}})]);
        let mut out = Vec::new();
        let (host, source) = channel(inbound, &mut out);
        drain(source);

        let err = host
            .update_window(5, &WindowUpdate::state(WindowState::Normal))
            .unwrap_err();
        assert!(matches!(err, NativeError::Rejected(ref m) if m.contains("No window")));
    }
}
