#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![forbid(unsafe_code)]

mod window_buffer;
pub use window_buffer::*;

mod controller;
pub use controller::*;

pub mod clock;
pub use clock::{Clock, ManualClock, SystemClock};

pub mod key;
pub use key::{INVALID_KEY, Ipv4KeyEncoder, KeyEncoder};

mod error;
pub use error::*;

mod common;
pub use common::{
    ExpectedConcurrency, MAX_DURATION, SweepInterval, SweepReport, VisitLimit, WindowDuration,
};

#[cfg(test)]
mod tests;
