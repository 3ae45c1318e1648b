//! MS-DMT compatible TCP harness around the modem core.
//!
//! Split from the binary so integration tests can bind a server on
//! ephemeral ports and drive it over real sockets.

pub mod protocol;
pub mod server;

pub use server::{Server, ServerConfig};
