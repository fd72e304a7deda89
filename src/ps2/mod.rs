//! The PS/2 keyboard protocol driver (§4.C) — by far the largest component
//! of this crate (45% of the core implementation budget, per spec §2).
//!
//! Two sibling modules: [`scancode`] is the pure Scan Code Set 2 lookup
//! table (no driver state at all), [`driver`] is the owning `Ps2Driver`
//! instance with the bit-level receive/transmit state machine, the
//! tagged decoder state, and the two ring buffers.

pub mod driver;
pub mod scancode;

pub use driver::{ClkEdge, Ps2Driver, Ps2Error};
