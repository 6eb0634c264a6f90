//! Black-box hardware control core.
//!
//! A leveled, timestamped event log held in an overwrite-oldest ring, an
//! emergency countdown that drives a trigger line, an alarm and an
//! indicator when it expires, direct output-line control, and an MCP3008
//! acquisition path that uses an SPI device node when one exists and a
//! bit-banged bus otherwise.
//!
//! Everything is reachable through [`app::service::CommandDispatcher`].
//! Linux-only adapters (spidev) sit behind the `linux` feature; the rest of
//! the crate runs on any host against the port traits in [`app::ports`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod emergency;
pub mod error;
pub mod log_channel;
pub mod pins;
pub mod protocol;
pub mod sensors;
pub mod sync;
