//! Core traits that decouple tabtangle from any specific browser or
//! transport mechanism.
//!
//! Every concrete backend (the native-messaging bridge, the in-memory
//! desktop, a Unix-socket listener, …) implements one of these traits.  The
//! [`ActionDispatcher`](crate::dispatcher::ActionDispatcher) only depends on
//! these abstractions.

use crate::command::{
    Command, CreateWindow, DisplayInfo, TabId, WindowId, WindowInfo, WindowUpdate,
};
use std::sync::mpsc;

/// Abstraction over the browser's window and tab management API.
///
/// Every call may be rejected (window already closed, invalid bounds, …);
/// callers treat errors as per-item failures, never as fatal.
pub trait WindowHost {
    /// The error type produced by this host.
    type Error: std::error::Error + Send + 'static;

    /// Return every display with its usable work area.
    fn displays(&self) -> Result<Vec<DisplayInfo>, Self::Error>;

    /// Return every open window, populated with its tabs.
    fn windows(&self) -> Result<Vec<WindowInfo>, Self::Error>;

    /// Create a window and return it as the host now sees it.
    fn create_window(&self, spec: &CreateWindow) -> Result<WindowInfo, Self::Error>;

    /// Apply a partial update to a window.
    fn update_window(&self, id: WindowId, update: &WindowUpdate) -> Result<(), Self::Error>;

    /// Close a window and all its tabs.
    fn remove_window(&self, id: WindowId) -> Result<(), Self::Error>;

    /// Move a tab to the end of `window`.
    fn move_tab(&self, tab: TabId, window: WindowId) -> Result<(), Self::Error>;

    /// Make a tab the active one in its window.
    fn activate_tab(&self, tab: TabId) -> Result<(), Self::Error>;
}

/// A source of [`Command`]s (Unix socket, native-messaging stdin, …).
///
/// Implementations run in their own thread and push commands into the
/// provided channel.  The main loop consumes commands sequentially.
pub trait CommandSource: Send {
    /// The error type produced by this source.
    type Error: std::error::Error + Send + 'static;

    /// Start producing commands, sending each one through `sink`.
    ///
    /// This method is expected to **block** for the lifetime of the source.
    /// It should return `Ok(())` on clean shutdown (e.g. when the sink is
    /// closed) and `Err` on unrecoverable failures.
    fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("mock error")]
    struct MockError;

    /// A test double that emits a fixed sequence of commands.
    struct MockSource {
        commands: Vec<Command>,
    }

    impl CommandSource for MockSource {
        type Error = MockError;

        fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), MockError> {
            for cmd in self.commands.drain(..) {
                let _ = sink.send(cmd);
            }
            Ok(())
        }
    }

    #[test]
    fn mock_source_emits_commands() {
        let mut src = MockSource {
            commands: vec![Command::OrganizeWindows, Command::OpenCamera],
        };
        let (tx, rx) = mpsc::channel();
        src.run(tx).unwrap();
        let cmds: Vec<Command> = rx.try_iter().collect();
        assert_eq!(cmds, vec![Command::OrganizeWindows, Command::OpenCamera]);
    }
}
