//! **tabtangle**: tiles browser tabs into a grid, or buries the user in
//! ever-smaller windows, and cleans up on a hand gesture.
//!
//! # Architecture
//!
//! The crate is organised around two core traits:
//!
//! * [`traits::WindowHost`] abstracts the browser's window and tab API so
//!   the layout and chaos engines are not coupled to a specific browser.
//! * [`traits::CommandSource`] abstracts the transport that delivers
//!   commands (the native messaging port, a Unix socket) so the main loop
//!   is not coupled to any specific IPC mechanism.
//!
//! [`dispatcher::ActionDispatcher`] owns all mutable state and routes each
//! [`command::Command`] to [`layout`], [`chaos`], [`collapse`],
//! [`camera`] or the [`gesture`] state machine.  Concrete hosts live in
//! [`host`], durable state in [`store`].

pub mod camera;
pub mod chaos;
pub mod collapse;
pub mod command;
pub mod config;
pub mod dispatcher;
pub mod gesture;
pub mod grid;
pub mod host;
pub mod ipc;
pub mod layout;
pub mod store;
pub mod traits;
pub mod workarea;

use std::time::Duration;

/// Block for `ms` milliseconds.  Zero returns immediately.
pub(crate) fn pause(ms: u64) {
    if ms > 0 {
        std::thread::sleep(Duration::from_millis(ms));
    }
}
