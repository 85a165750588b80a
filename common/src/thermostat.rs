use crate::{
    config::{HvacSettings, SETPOINT_SEPARATION_F},
    types::{HardwareMode, HvacAction, SystemMode},
};

#[derive(Debug, Clone)]
pub struct Thermostat {
    temperature_f: Option<f32>,
    heat_setpoint_f: f32,
    cool_setpoint_f: f32,
    mode: SystemMode,
    target: HardwareMode,
    logic_rate_ms: u64,
    next_eval_ms: u64,
    // Re-armed on every target change. Nothing gates on it yet.
    target_changed_ms: u64,
}

impl Thermostat {
    pub fn new(logic_rate_ms: u64, settings: &HvacSettings, now_ms: u64) -> Self {
        let mut settings = settings.clone();
        settings.sanitize();
        Self {
            temperature_f: None,
            heat_setpoint_f: settings.heat_setpoint_f,
            cool_setpoint_f: settings.cool_setpoint_f,
            mode: settings.mode,
            target: HardwareMode::Off,
            logic_rate_ms,
            next_eval_ms: now_ms.saturating_add(logic_rate_ms),
            target_changed_ms: now_ms,
        }
    }

    pub fn set_temperature(&mut self, temp_f: f32) {
        self.temperature_f = Some(temp_f);
    }

    pub fn temperature(&self) -> Option<f32> {
        self.temperature_f
    }

    pub fn set_mode(&mut self, mode: SystemMode) {
        self.mode = mode;
    }

    pub fn mode(&self) -> SystemMode {
        self.mode
    }

    pub fn heat_setpoint(&self) -> f32 {
        self.heat_setpoint_f
    }

    pub fn cool_setpoint(&self) -> f32 {
        self.cool_setpoint_f
    }

    pub fn set_cool_setpoint(&mut self, temp_f: f32) -> bool {
        if !temp_f.is_finite() || temp_f - self.heat_setpoint_f < SETPOINT_SEPARATION_F {
            return false;
        }
        self.cool_setpoint_f = temp_f;
        true
    }

    pub fn set_heat_setpoint(&mut self, temp_f: f32) -> bool {
        if !temp_f.is_finite() || self.cool_setpoint_f - temp_f < SETPOINT_SEPARATION_F {
            return false;
        }
        self.heat_setpoint_f = temp_f;
        true
    }

    pub fn target(&self) -> HardwareMode {
        self.target
    }

    pub fn next_evaluation_ms(&self) -> u64 {
        self.next_eval_ms
    }

    pub fn target_changed_ms(&self) -> u64 {
        self.target_changed_ms
    }

    pub fn evaluate(&mut self, now_ms: u64) -> Option<HvacAction> {
        if now_ms < self.next_eval_ms {
            return None;
        }
        self.next_eval_ms = now_ms.saturating_add(self.logic_rate_ms);

        let Some(temp_f) = self.temperature_f.filter(|temp| temp.is_finite()) else {
            return Some(HvacAction::NoValidTemperature);
        };

        let next = select_mode(self.mode, temp_f, self.heat_setpoint_f, self.cool_setpoint_f);
        self.set_target(next, now_ms)
    }

    fn set_target(&mut self, next: HardwareMode, now_ms: u64) -> Option<HvacAction> {
        if next == self.target {
            return None;
        }
        let from = std::mem::replace(&mut self.target, next);
        self.target_changed_ms = now_ms;
        Some(HvacAction::HardwareModeChanged { from, to: next })
    }
}

// Auto checks the cooling bands first.
pub fn select_mode(mode: SystemMode, temp_f: f32, heat_sp: f32, cool_sp: f32) -> HardwareMode {
    let demand = match mode {
        SystemMode::Off => None,
        SystemMode::Cool => cooling_demand(temp_f, cool_sp),
        SystemMode::Heat => heating_demand(temp_f, heat_sp),
        SystemMode::Auto => {
            cooling_demand(temp_f, cool_sp).or_else(|| heating_demand(temp_f, heat_sp))
        }
    };
    demand.unwrap_or(HardwareMode::Off)
}

fn cooling_demand(temp_f: f32, cool_sp: f32) -> Option<HardwareMode> {
    if temp_f > cool_sp + 1.0 {
        Some(HardwareMode::HighCool)
    } else if temp_f > cool_sp {
        Some(HardwareMode::LowCool)
    } else {
        None
    }
}

fn heating_demand(temp_f: f32, heat_sp: f32) -> Option<HardwareMode> {
    if temp_f < heat_sp - 4.0 {
        Some(HardwareMode::MaxHeat)
    } else if temp_f < heat_sp - 1.0 {
        Some(HardwareMode::HighHeat)
    } else if temp_f < heat_sp {
        Some(HardwareMode::LowHeat)
    } else {
        None
    }
}
