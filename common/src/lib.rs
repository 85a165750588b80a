pub mod config;
pub mod engine;
pub mod equipment;
pub mod fan;
pub mod sequencer;
pub mod thermostat;
pub mod topics;
pub mod types;
pub mod usability;

pub use config::{
    ConfigError, EquipmentPolicy, HvacConfig, HvacSettings, NetworkConfig, RuntimeConfig,
};
pub use engine::HvacEngine;
pub use equipment::{CompressorState, Equipment, ValveState};
pub use topics::*;
pub use types::{
    ControllerStatePayload, EquipmentId, EquipmentStatus, FanMode, HardwareMode, HvacAction,
    HvacStatus, ParseError, SystemMode,
};
pub use usability::{UsabilityFlags, UsabilityTable};
