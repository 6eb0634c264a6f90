//! Integration tests for the hardware core.
//!
//! Each `mod` below exercises one subsystem through its public API against
//! the recording adapters in `mock_hw`. Everything runs on the host.

mod adc_tests;
mod dispatcher_tests;
mod monitor_tests;
