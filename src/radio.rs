//! Distress radio capability.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::model::{AllClearMessage, DistressMessage, Position};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RadioError {
    #[error("radio unreachable: {0}")]
    Unreachable(String),
}

/// DSC radio and position beacon.
pub trait DistressRadio: Send + Sync {
    fn send_distress(&self, message: &DistressMessage) -> Result<(), RadioError>;

    fn send_all_clear(&self, message: &AllClearMessage) -> Result<(), RadioError>;

    /// Start the AIS-SART style position beacon.
    fn activate_beacon(&self, position: Position) -> Result<(), RadioError>;
}

/// A transmission as issued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "transmission", rename_all = "camelCase")]
pub enum Transmission {
    Distress(DistressMessage),
    AllClear(AllClearMessage),
    Beacon { position: Position },
}

impl Transmission {
    pub fn is_mayday(&self) -> bool {
        matches!(self, Self::Distress(DistressMessage::Mayday { .. }))
    }

    pub fn is_status_update(&self) -> bool {
        matches!(self, Self::Distress(DistressMessage::StatusUpdate { .. }))
    }
}

/// An in-process radio that records transmissions.
///
/// Taking it offline makes every call fail. `fail_next` drops only the next
/// `n` calls, which is how a transient link loss is simulated.
#[derive(Debug, Default)]
pub struct SimulatedRadio {
    offline: AtomicBool,
    fail_next: Mutex<u32>,
    sent: Mutex<Vec<Transmission>>,
}

impl SimulatedRadio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn fail_next(&self, calls: u32) {
        *self.fail_next.lock().unwrap_or_else(PoisonError::into_inner) = calls;
    }

    pub fn transmissions(&self) -> Vec<Transmission> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn mayday_count(&self) -> usize {
        self.transmissions().iter().filter(|t| t.is_mayday()).count()
    }

    fn transmit(&self, transmission: Transmission) -> Result<(), RadioError> {
        if self.offline.load(Ordering::SeqCst) {
            error!("simulated radio offline");
            return Err(RadioError::Unreachable("no carrier".into()));
        }
        {
            let mut remaining = self.fail_next.lock().unwrap_or_else(PoisonError::into_inner);
            if *remaining > 0 {
                *remaining -= 1;
                return Err(RadioError::Unreachable("transmission dropped".into()));
            }
        }
        info!(?transmission, "simulated radio");
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(transmission);
        Ok(())
    }
}

impl DistressRadio for SimulatedRadio {
    fn send_distress(&self, message: &DistressMessage) -> Result<(), RadioError> {
        self.transmit(Transmission::Distress(message.clone()))
    }

    fn send_all_clear(&self, message: &AllClearMessage) -> Result<(), RadioError> {
        self.transmit(Transmission::AllClear(message.clone()))
    }

    fn activate_beacon(&self, position: Position) -> Result<(), RadioError> {
        self.transmit(Transmission::Beacon { position })
    }
}
