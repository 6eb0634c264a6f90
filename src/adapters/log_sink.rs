//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing supervisor events through the `log`
//! facade. A display or network bridge would implement the same trait.

use log::{error, info};

use crate::app::events::MonitorEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`MonitorEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &MonitorEvent) {
        match event {
            MonitorEvent::CountdownUpdated { formatted, .. } => {
                info!("COUNTDOWN | {}", formatted);
            }
            MonitorEvent::Exploded => {
                error!("COUNTDOWN | reached zero");
            }
            MonitorEvent::Disarmed => {
                info!("COUNTDOWN | disarmed");
            }
            MonitorEvent::AmbientChanged { reading, ambient } => {
                info!("LIGHT | reading={} ambient={:?}", reading, ambient);
            }
            MonitorEvent::AutoModeChanged(enabled) => {
                info!("LIGHT | auto={}", enabled);
            }
        }
    }
}
