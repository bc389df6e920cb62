//! Caller identity encoding.
//!
//! The controller counts visits under integer keys. A [`KeyEncoder`] turns a
//! textual identity into such a key. Key `0` is reserved: it marks an identity
//! that could not be encoded and is always denied.

use std::net::Ipv4Addr;

/// The key every unparseable identity maps to.
pub const INVALID_KEY: u64 = 0;

/// Bidirectional mapping between textual identities and integer keys.
pub trait KeyEncoder: Send + Sync {
    /// Encode `text`, returning [`INVALID_KEY`] if it is not a valid identity.
    fn encode(&self, text: &str) -> u64;

    /// Render `key` back to its textual form.
    fn decode(&self, key: u64) -> String;
}

/// Dotted-quad IPv4 addresses, stored as their big-endian `u32` value.
///
/// `0.0.0.0` encodes to [`INVALID_KEY`] and is therefore never admitted.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ipv4KeyEncoder;

impl KeyEncoder for Ipv4KeyEncoder {
    fn encode(&self, text: &str) -> u64 {
        encode_ipv4(text).unwrap_or(INVALID_KEY)
    }

    fn decode(&self, key: u64) -> String {
        decode_ipv4(key)
    }
}

/// Parse a dotted-quad address into its integer key.
///
/// Surrounding whitespace is ignored. Returns `None` for anything that is not a
/// plain IPv4 address.
pub fn encode_ipv4(text: &str) -> Option<u64> {
    text.trim()
        .parse::<Ipv4Addr>()
        .ok()
        .map(|addr| u64::from(u32::from(addr)))
}

/// Render an integer key as a dotted-quad address.
///
/// Only the low 32 bits are used.
pub fn decode_ipv4(key: u64) -> String {
    Ipv4Addr::from(key as u32).to_string()
}
