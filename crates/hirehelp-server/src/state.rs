use std::sync::Arc;

use hirehelp_bus::EventBus;
use hirehelp_core::{Assistant, VoiceSlot};
use hirehelp_provider::LiveConnector;

/// Shared application state accessible from all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub assistant: Arc<Assistant>,
    /// Source of the SSE stream
    pub bus: Arc<EventBus>,
    pub connector: Arc<dyn LiveConnector>,
    /// One live voice session at a time
    pub voice_slot: VoiceSlot,
}

impl AppState {
    pub fn new(assistant: Arc<Assistant>, bus: Arc<EventBus>, connector: Arc<dyn LiveConnector>) -> Self {
        Self {
            assistant,
            bus,
            connector,
            voice_slot: VoiceSlot::default(),
        }
    }
}
