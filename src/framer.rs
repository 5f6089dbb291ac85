//! NETCONF message framing per [RFC6242](https://tools.ietf.org/html/rfc6242).
//!
//! [`Decoder`] turns the transport byte stream into bounded per-message
//! readers; [`Encoder`] frames outgoing messages. Both start in
//! end-of-message framing and switch to chunked framing exactly once, after
//! the hello exchange.

pub mod decoder;
pub mod encoder;
mod state;

pub use decoder::{Decoder, MessageReader};
pub use encoder::{Encoder, FrameWriter};
pub use state::FramingMode;

/// End-of-message delimiter used by NETCONF 1.0 framing.
pub const NETCONF_1_0_TERMINATOR: &str = "]]>]]>";
/// End-of-chunks marker used by NETCONF 1.1 chunked framing.
pub const NETCONF_1_1_TERMINATOR: &str = "\n##\n";

/// Ceiling on buffered-but-unconsumed transport bytes in the decoder.
pub const MAX_SCAN_BUFFER: usize = 1024 * 1024;
