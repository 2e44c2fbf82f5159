//! [`WindowHost`](crate::traits::WindowHost) backends.
//!
//! * [`native`]: the browser extension, reached over the native-messaging
//!   stdio protocol.  This is what runs in production.
//! * [`memory`]: a simulated desktop kept entirely in memory, used by the
//!   tests and by `tabtangle --simulate`.
//!
//! Nothing outside this module should know how window calls travel.

pub mod memory;
pub mod native;
