//! Local command socket.
//!
//! Scripts can connect and send newline-delimited JSON commands, which is
//! how tabtangle is driven without a browser attached.

pub mod listener;
