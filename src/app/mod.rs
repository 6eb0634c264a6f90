//! Device core: the command boundary and its supervisors.
//!
//! The [`CommandDispatcher`](service::CommandDispatcher) is the single entry
//! point to the log channel, the emergency countdown and the output lines.
//! Everything that touches hardware is reached through the **port traits**
//! in [`ports`], so the whole layer runs against recording mocks in tests.

pub mod commands;
pub mod events;
pub mod monitor;
pub mod ports;
pub mod service;
