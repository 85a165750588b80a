use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown system mode '{0}'")]
    SystemMode(String),
    #[error("unknown fan mode '{0}'")]
    FanMode(String),
    #[error("unknown hardware mode '{0}'")]
    HardwareMode(String),
    #[error("unknown equipment '{0}'")]
    Equipment(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SystemMode {
    #[default]
    Off,
    Cool,
    Heat,
    Auto,
}

impl SystemMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::Cool => "COOL",
            Self::Heat => "HEAT",
            Self::Auto => "AUTO",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::Cool => "Cool",
            Self::Heat => "Heat",
            Self::Auto => "Auto",
        }
    }
}

impl FromStr for SystemMode {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "OFF" => Ok(Self::Off),
            "COOL" => Ok(Self::Cool),
            "HEAT" => Ok(Self::Heat),
            "AUTO" => Ok(Self::Auto),
            _ => Err(ParseError::SystemMode(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FanMode {
    #[default]
    Auto,
    Low,
    High,
    Circulate,
}

impl FanMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "AUTO",
            Self::Low => "LOW",
            Self::High => "HIGH",
            Self::Circulate => "CIRCULATE",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Auto => "Auto",
            Self::Low => "Low",
            Self::High => "High",
            Self::Circulate => "Circulate",
        }
    }
}

impl FromStr for FanMode {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "AUTO" => Ok(Self::Auto),
            "LOW" => Ok(Self::Low),
            "HIGH" => Ok(Self::High),
            "CIRCULATE" | "CIRC" => Ok(Self::Circulate),
            _ => Err(ParseError::FanMode(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HardwareMode {
    #[default]
    Off,
    LowCool,
    HighCool,
    LowHeat,
    HighHeat,
    MaxHeat,
}

impl HardwareMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::LowCool => "LOW_COOL",
            Self::HighCool => "HIGH_COOL",
            Self::LowHeat => "LOW_HEAT",
            Self::HighHeat => "HIGH_HEAT",
            Self::MaxHeat => "MAX_HEAT",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::LowCool => "Low Cool",
            Self::HighCool => "High Cool",
            Self::LowHeat => "Low Heat",
            Self::HighHeat => "High Heat",
            Self::MaxHeat => "Max Heat",
        }
    }
}

impl FromStr for HardwareMode {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "OFF" => Ok(Self::Off),
            "LOW_COOL" => Ok(Self::LowCool),
            "HIGH_COOL" => Ok(Self::HighCool),
            "LOW_HEAT" => Ok(Self::LowHeat),
            "HIGH_HEAT" => Ok(Self::HighHeat),
            "MAX_HEAT" => Ok(Self::MaxHeat),
            _ => Err(ParseError::HardwareMode(value.to_string())),
        }
    }
}

// Declaration order is the storage order of the equipment set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EquipmentId {
    #[serde(rename = "COMPRESSOR_1")]
    Compressor1,
    #[serde(rename = "COMPRESSOR_2")]
    Compressor2,
    GasHeater,
    ReversingValve,
    FanLow,
    FanHigh,
    CoachHeatLow,
    CoachHeatHigh,
}

impl EquipmentId {
    pub const COUNT: usize = 8;

    pub const ALL: [EquipmentId; Self::COUNT] = [
        Self::Compressor1,
        Self::Compressor2,
        Self::GasHeater,
        Self::ReversingValve,
        Self::FanLow,
        Self::FanHigh,
        Self::CoachHeatLow,
        Self::CoachHeatHigh,
    ];

    pub fn index(self) -> usize {
        match self {
            Self::Compressor1 => 0,
            Self::Compressor2 => 1,
            Self::GasHeater => 2,
            Self::ReversingValve => 3,
            Self::FanLow => 4,
            Self::FanHigh => 5,
            Self::CoachHeatLow => 6,
            Self::CoachHeatHigh => 7,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Compressor1 => "COMPRESSOR_1",
            Self::Compressor2 => "COMPRESSOR_2",
            Self::GasHeater => "GAS_HEATER",
            Self::ReversingValve => "REVERSING_VALVE",
            Self::FanLow => "FAN_LOW",
            Self::FanHigh => "FAN_HIGH",
            Self::CoachHeatLow => "COACH_HEAT_LOW",
            Self::CoachHeatHigh => "COACH_HEAT_HIGH",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Compressor1 => "Compressor 1",
            Self::Compressor2 => "Compressor 2",
            Self::GasHeater => "Gas Heater",
            Self::ReversingValve => "Reversing Valve",
            Self::FanLow => "Fan Low",
            Self::FanHigh => "Fan High",
            Self::CoachHeatLow => "Coach Heat Low",
            Self::CoachHeatHigh => "Coach Heat High",
        }
    }
}

impl fmt::Display for EquipmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for EquipmentId {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == normalized)
            .ok_or_else(|| ParseError::Equipment(value.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HvacAction {
    SetOutput { equipment: EquipmentId, on: bool },
    FanModeChanged { mode: FanMode },
    HardwareModeChanged { from: HardwareMode, to: HardwareMode },
    NoValidTemperature,
}

#[derive(Debug, Clone, Serialize)]
pub struct EquipmentStatus {
    pub id: EquipmentId,
    pub name: &'static str,
    pub state: &'static str,
    #[serde(rename = "isOn")]
    pub is_on: bool,
    pub available: bool,
    pub disabled: bool,
    #[serde(rename = "startTimeMs")]
    pub start_time_ms: u64,
    #[serde(rename = "runSeconds")]
    pub run_seconds: u64,
    #[serde(rename = "delayRemainingMs")]
    pub delay_remaining_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HvacStatus {
    pub temperature: Option<f32>,
    #[serde(rename = "heatSetpoint")]
    pub heat_setpoint: f32,
    #[serde(rename = "coolSetpoint")]
    pub cool_setpoint: f32,
    pub mode: &'static str,
    #[serde(rename = "fanMode")]
    pub fan_mode: &'static str,
    #[serde(rename = "activeFanMode")]
    pub active_fan_mode: &'static str,
    #[serde(rename = "hardwareMode")]
    pub hardware_mode: &'static str,
    #[serde(rename = "nextEvaluationMs")]
    pub next_evaluation_ms: u64,
    #[serde(rename = "targetChangedMs")]
    pub target_changed_ms: u64,
    pub equipment: Vec<EquipmentStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ControllerStatePayload {
    pub temp: Option<f32>,
    pub heat: f32,
    pub cool: f32,
    pub mode: &'static str,
    pub fan: &'static str,
    pub hardware: &'static str,
    #[serde(rename = "on")]
    pub energized: Vec<EquipmentId>,
}
