//! Viewbridge wire protocol
//!
//! Messages exchanged between the bridge and a remote viewhost are JSON
//! objects. Outbound messages carry a sequence number assigned at send time;
//! inbound messages carry only a type and a payload.
//!
//! # Components
//!
//! - [`Envelope`]: sequenced outbound unit `{type, seqno, payload}`
//! - [`Outbound`]: unsequenced outbound message, built by handlers
//! - [`InboundMessage`]: tagged union of every inbound kind, parsed once
//! - [`payloads`]: typed payloads for inbound and outbound messages
//! - [`viewport`]: viewport shapes, modes and size specifications

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod envelope;
pub mod errors;
pub mod message;
pub mod payloads;
pub mod viewport;

pub use envelope::{Envelope, Outbound, OutboundKind, reply_seqno};
pub use errors::{ProtocolError, Result};
pub use message::InboundMessage;
pub use viewport::{ScreenMode, ViewportMode, ViewportShape, ViewportSpec};
