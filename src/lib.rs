//! # netconf-framer
//!
//! ```toml
//! netconf-framer = "^0.2.0"
//! ```
//!
//! RFC 6242 message framing for NETCONF sessions. The [`framer`] module
//! converts a raw full-duplex byte transport into a sequence of discrete XML
//! messages and back, supporting both the legacy end-of-message framing and
//! the chunked framing negotiated via the `base:1.1` capability. The
//! [`connection`] module drives the hello exchange and switches both codec
//! directions in-flight once the peer advertises chunked support.
//!
pub mod connection;
pub mod error;
pub mod framer;
pub mod message;

pub const NETCONF_URN: &str = "urn:ietf:params:xml:ns:netconf:base:1.0";
pub const NETCONF_BASE_10_CAP: &str = "urn:ietf:params:netconf:base:1.0";
pub const NETCONF_BASE_11_CAP: &str = "urn:ietf:params:netconf:base:1.1";
