//! Signed per-recipient token handling.
//!
//! Every tracking link embeds an opaque token plus a signature segment.
//! This module owns both sides: the codec that encodes/decodes the field
//! payload and the keyed signature check that gates decoding.

pub mod codec;
pub mod signature;

pub use codec::{TokenCodec, TokenError, TokenFields};
pub use signature::{sign, verify};
