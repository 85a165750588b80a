use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{EquipmentId, FanMode, SystemMode};

pub const SETPOINT_SEPARATION_F: f32 = 2.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid runtime config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HvacConfig {
    pub logic_rate_ms: u64,
    pub fan_lead_ms: u64,
    pub compressor_stagger_ms: u64,
    pub restart_delay_ms: u64,
    pub valve_settle_ms: u64,
}

impl Default for HvacConfig {
    fn default() -> Self {
        Self {
            logic_rate_ms: 30_000,
            fan_lead_ms: 15_000,
            compressor_stagger_ms: 15_000,
            restart_delay_ms: 120_000,
            valve_settle_ms: 60_000,
        }
    }
}

impl HvacConfig {
    pub fn sanitize(&mut self) {
        let defaults = Self::default();
        if self.logic_rate_ms == 0 {
            self.logic_rate_ms = defaults.logic_rate_ms;
        }
        if self.restart_delay_ms == 0 {
            self.restart_delay_ms = defaults.restart_delay_ms;
        }
        if self.valve_settle_ms == 0 {
            self.valve_settle_ms = defaults.valve_settle_ms;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HvacSettings {
    pub heat_setpoint_f: f32,
    pub cool_setpoint_f: f32,
    pub mode: SystemMode,
    pub fan_mode: FanMode,
}

impl Default for HvacSettings {
    fn default() -> Self {
        Self {
            heat_setpoint_f: 70.0,
            cool_setpoint_f: 73.0,
            mode: SystemMode::Off,
            fan_mode: FanMode::Auto,
        }
    }
}

impl HvacSettings {
    pub fn sanitize(&mut self) {
        let defaults = Self::default();
        if !self.heat_setpoint_f.is_finite() {
            self.heat_setpoint_f = defaults.heat_setpoint_f;
        }
        if !self.cool_setpoint_f.is_finite() {
            self.cool_setpoint_f = defaults.cool_setpoint_f;
        }
        if self.cool_setpoint_f - self.heat_setpoint_f < SETPOINT_SEPARATION_F {
            self.cool_setpoint_f = self.heat_setpoint_f + SETPOINT_SEPARATION_F;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EquipmentPolicy {
    pub unavailable: Vec<EquipmentId>,
    pub disabled: Vec<EquipmentId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_user: String,
    pub mqtt_pass: String,
    pub http_port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            mqtt_host: "127.0.0.1".to_string(),
            mqtt_port: 1883,
            mqtt_user: String::new(),
            mqtt_pass: String::new(),
            http_port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub hvac: HvacConfig,
    pub settings: HvacSettings,
    pub equipment: EquipmentPolicy,
    pub network: NetworkConfig,
    pub poll_interval_ms: u64,
    pub state_publish_interval_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            hvac: HvacConfig::default(),
            settings: HvacSettings::default(),
            equipment: EquipmentPolicy::default(),
            network: NetworkConfig::default(),
            poll_interval_ms: 250,
            state_publish_interval_ms: 10_000,
        }
    }
}

impl RuntimeConfig {
    pub fn from_slice(raw: &[u8]) -> Result<Self, ConfigError> {
        let mut config: Self = serde_json::from_slice(raw)?;
        config.sanitize();
        Ok(config)
    }

    pub fn sanitize(&mut self) {
        self.hvac.sanitize();
        self.settings.sanitize();
        self.poll_interval_ms = self.poll_interval_ms.clamp(10, 5_000);
        if self.state_publish_interval_ms == 0 {
            self.state_publish_interval_ms = 10_000;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn sanitize_restores_setpoint_separation() {
        let mut settings = HvacSettings {
            heat_setpoint_f: 72.0,
            cool_setpoint_f: 72.5,
            ..HvacSettings::default()
        };
        settings.sanitize();
        assert_eq!(settings.cool_setpoint_f, 74.0);
        assert_eq!(settings.heat_setpoint_f, 72.0);
    }

    #[test]
    fn sanitize_replaces_non_finite_setpoints() {
        let mut settings = HvacSettings {
            heat_setpoint_f: f32::NAN,
            cool_setpoint_f: f32::INFINITY,
            ..HvacSettings::default()
        };
        settings.sanitize();
        assert_eq!(settings, HvacSettings::default());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let raw = br#"{
            "hvac": { "fan_lead_ms": 5000, "restart_delay_ms": 0 },
            "settings": { "mode": "COOL", "cool_setpoint_f": 76.0 },
            "equipment": { "disabled": ["GAS_HEATER"] },
            "poll_interval_ms": 1
        }"#;

        let config = RuntimeConfig::from_slice(raw).unwrap();

        assert_eq!(config.hvac.fan_lead_ms, 5_000);
        assert_eq!(config.hvac.restart_delay_ms, 120_000);
        assert_eq!(config.hvac.valve_settle_ms, 60_000);
        assert_eq!(config.settings.mode, SystemMode::Cool);
        assert_eq!(config.settings.cool_setpoint_f, 76.0);
        assert_eq!(config.settings.heat_setpoint_f, 70.0);
        assert_eq!(config.equipment.disabled, vec![EquipmentId::GasHeater]);
        assert_eq!(config.poll_interval_ms, 10);
        assert_eq!(config.network.mqtt_port, 1883);
    }

    #[test]
    fn policy_accepts_compressor_wire_names() {
        let raw = br#"{
            "equipment": { "disabled": ["COMPRESSOR_1"], "unavailable": ["COMPRESSOR_2"] }
        }"#;

        let config = RuntimeConfig::from_slice(raw).unwrap();

        assert_eq!(config.equipment.disabled, vec![EquipmentId::Compressor1]);
        assert_eq!(config.equipment.unavailable, vec![EquipmentId::Compressor2]);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            RuntimeConfig::from_slice(b"{ not json"),
            Err(ConfigError::Json(_))
        ));
    }
}
