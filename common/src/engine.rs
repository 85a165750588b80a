use crate::{
    config::{HvacConfig, HvacSettings, RuntimeConfig},
    equipment::{Equipment, EquipmentSet},
    fan::FanArbitrator,
    sequencer::Sequencer,
    thermostat::Thermostat,
    types::{
        ControllerStatePayload, EquipmentId, EquipmentStatus, FanMode, HardwareMode, HvacAction,
        HvacStatus, SystemMode,
    },
    usability::{UsabilityFlags, UsabilityTable},
};

#[derive(Debug, Clone)]
pub struct HvacEngine {
    config: HvacConfig,
    equipment: EquipmentSet,
    usability: UsabilityTable,
    fan: FanArbitrator,
    thermostat: Thermostat,
}

impl HvacEngine {
    pub fn new(
        mut config: HvacConfig,
        mut settings: HvacSettings,
        usability: UsabilityTable,
        now_ms: u64,
    ) -> Self {
        config.sanitize();
        settings.sanitize();
        Self {
            equipment: EquipmentSet::new(&config, now_ms),
            usability,
            fan: FanArbitrator::new(settings.fan_mode),
            thermostat: Thermostat::new(config.logic_rate_ms, &settings, now_ms),
            config,
        }
    }

    pub fn from_runtime(runtime: &RuntimeConfig, now_ms: u64) -> Self {
        Self::new(
            runtime.hvac.clone(),
            runtime.settings.clone(),
            UsabilityTable::from_policy(&runtime.equipment),
            now_ms,
        )
    }

    pub fn config(&self) -> &HvacConfig {
        &self.config
    }

    pub fn set_temperature(&mut self, temp_f: f32) {
        self.thermostat.set_temperature(temp_f);
    }

    pub fn temperature(&self) -> Option<f32> {
        self.thermostat.temperature()
    }

    pub fn set_mode(&mut self, mode: SystemMode) {
        self.thermostat.set_mode(mode);
    }

    pub fn mode(&self) -> SystemMode {
        self.thermostat.mode()
    }

    pub fn set_fan_mode(&mut self, mode: FanMode) {
        self.fan.request(mode);
    }

    pub fn fan_mode(&self) -> FanMode {
        self.fan.requested()
    }

    pub fn active_fan_mode(&self) -> FanMode {
        self.fan.active()
    }

    pub fn set_cool_setpoint(&mut self, temp_f: f32) -> bool {
        self.thermostat.set_cool_setpoint(temp_f)
    }

    pub fn set_heat_setpoint(&mut self, temp_f: f32) -> bool {
        self.thermostat.set_heat_setpoint(temp_f)
    }

    pub fn cool_setpoint(&self) -> f32 {
        self.thermostat.cool_setpoint()
    }

    pub fn heat_setpoint(&self) -> f32 {
        self.thermostat.heat_setpoint()
    }

    pub fn target_mode(&self) -> HardwareMode {
        self.thermostat.target()
    }

    pub fn equipment(&self, id: EquipmentId) -> &Equipment {
        self.equipment.get(id)
    }

    pub fn usability(&self, id: EquipmentId) -> UsabilityFlags {
        self.usability.flags(id)
    }

    pub fn is_usable(&self, id: EquipmentId) -> bool {
        self.usability.is_usable(id)
    }

    pub fn set_available(
        &mut self,
        id: EquipmentId,
        available: bool,
        now_ms: u64,
    ) -> Vec<HvacAction> {
        let mut actions = Vec::new();
        if self.usability.set_available(id, available) {
            self.stop_unusable(id, now_ms, &mut actions);
        }
        actions
    }

    pub fn set_disabled(
        &mut self,
        id: EquipmentId,
        disabled: bool,
        now_ms: u64,
    ) -> Vec<HvacAction> {
        let mut actions = Vec::new();
        if self.usability.set_disabled(id, disabled) {
            self.stop_unusable(id, now_ms, &mut actions);
        }
        actions
    }

    fn stop_unusable(&mut self, id: EquipmentId, now_ms: u64, actions: &mut Vec<HvacAction>) {
        // The valve must never change position under a running compressor.
        if id == EquipmentId::ReversingValve {
            self.equipment.stop(EquipmentId::Compressor1, now_ms, actions);
            self.equipment.stop(EquipmentId::Compressor2, now_ms, actions);
        }
        self.equipment.stop(id, now_ms, actions);
    }

    pub fn poll(&mut self, now_ms: u64) -> Vec<HvacAction> {
        let mut actions = Vec::new();
        self.equipment.poll(now_ms, &mut actions);
        actions.extend(self.fan.reconcile());

        Sequencer::new(
            &self.config,
            &mut self.equipment,
            &self.usability,
            self.fan.active(),
            now_ms,
            &mut actions,
        )
        .run(self.thermostat.target());

        actions.extend(self.thermostat.evaluate(now_ms));
        actions
    }

    pub fn reset_run_times(&mut self) {
        self.equipment.reset_run_times();
    }

    pub fn status(&self, now_ms: u64) -> HvacStatus {
        let equipment = self
            .equipment
            .iter()
            .map(|(id, item)| {
                let flags = self.usability(id);
                EquipmentStatus {
                    id,
                    name: id.label(),
                    state: item.state_name(),
                    is_on: item.is_on(),
                    available: flags.available,
                    disabled: !flags.not_disabled,
                    start_time_ms: item.start_time_ms(),
                    run_seconds: item.run_seconds(),
                    delay_remaining_ms: item.delay_remaining_ms(now_ms),
                }
            })
            .collect();

        HvacStatus {
            temperature: self.thermostat.temperature(),
            heat_setpoint: self.thermostat.heat_setpoint(),
            cool_setpoint: self.thermostat.cool_setpoint(),
            mode: self.thermostat.mode().as_str(),
            fan_mode: self.fan_mode().as_str(),
            active_fan_mode: self.active_fan_mode().as_str(),
            hardware_mode: self.thermostat.target().as_str(),
            next_evaluation_ms: self.thermostat.next_evaluation_ms(),
            target_changed_ms: self.thermostat.target_changed_ms(),
            equipment,
        }
    }

    pub fn state_payload(&self) -> ControllerStatePayload {
        ControllerStatePayload {
            temp: self.thermostat.temperature(),
            heat: self.thermostat.heat_setpoint(),
            cool: self.thermostat.cool_setpoint(),
            mode: self.thermostat.mode().as_str(),
            fan: self.active_fan_mode().as_str(),
            hardware: self.thermostat.target().as_str(),
            energized: self
                .equipment
                .iter()
                .filter(|(_, item)| item.is_on())
                .map(|(id, _)| id)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EquipmentPolicy;
    use pretty_assertions::assert_eq;

    fn engine(mode: SystemMode, policy: EquipmentPolicy) -> HvacEngine {
        let settings = HvacSettings {
            mode,
            ..HvacSettings::default()
        };
        HvacEngine::new(
            HvacConfig::default(),
            settings,
            UsabilityTable::from_policy(&policy),
            0,
        )
    }

    fn poll_until(engine: &mut HvacEngine, from_ms: u64, to_ms: u64) -> Vec<HvacAction> {
        let mut actions = Vec::new();
        let mut now_ms = from_ms;
        while now_ms <= to_ms {
            actions.extend(engine.poll(now_ms));
            now_ms += 1_000;
        }
        actions
    }

    fn set_output(equipment: EquipmentId, on: bool) -> HvacAction {
        HvacAction::SetOutput { equipment, on }
    }

    #[test]
    fn cooling_demand_reaches_compressor_after_restart_delay() {
        let mut engine = engine(SystemMode::Cool, EquipmentPolicy::default());
        engine.set_temperature(80.0);

        assert!(engine.poll(0).is_empty());
        assert_eq!(
            engine.poll(30_000),
            vec![HvacAction::HardwareModeChanged {
                from: HardwareMode::Off,
                to: HardwareMode::HighCool
            }]
        );
        assert_eq!(engine.poll(31_000), vec![set_output(EquipmentId::FanHigh, true)]);

        poll_until(&mut engine, 32_000, 119_000);
        assert!(!engine.equipment(EquipmentId::Compressor1).is_on());
        assert_eq!(engine.equipment(EquipmentId::Compressor1).state_name(), "RESTART_DELAY");

        assert_eq!(
            engine.poll(120_000),
            vec![set_output(EquipmentId::Compressor1, true)]
        );
        assert_eq!(
            poll_until(&mut engine, 121_000, 140_000),
            vec![set_output(EquipmentId::Compressor2, true)]
        );
    }

    #[test]
    fn losing_the_valve_stops_compressors_first() {
        let policy = EquipmentPolicy {
            unavailable: vec![EquipmentId::CoachHeatHigh],
            disabled: vec![],
        };
        let mut engine = engine(SystemMode::Heat, policy);
        engine.set_temperature(67.0);

        poll_until(&mut engine, 0, 140_000);
        assert_eq!(engine.target_mode(), HardwareMode::HighHeat);
        assert_eq!(
            engine.state_payload().energized,
            vec![
                EquipmentId::Compressor1,
                EquipmentId::Compressor2,
                EquipmentId::ReversingValve,
                EquipmentId::FanHigh
            ]
        );

        let actions = engine.set_available(EquipmentId::ReversingValve, false, 140_500);
        assert_eq!(
            actions,
            vec![
                set_output(EquipmentId::Compressor1, false),
                set_output(EquipmentId::Compressor2, false)
            ]
        );
        assert_eq!(engine.equipment(EquipmentId::ReversingValve).state_name(), "SETTLE_OFF");

        assert_eq!(
            engine.poll(141_000),
            vec![
                set_output(EquipmentId::GasHeater, true),
                set_output(EquipmentId::FanHigh, false)
            ]
        );
        poll_until(&mut engine, 142_000, 201_000);
        assert!(!engine.equipment(EquipmentId::ReversingValve).is_on());
        assert_eq!(
            engine.state_payload().energized,
            vec![EquipmentId::GasHeater]
        );
    }

    #[test]
    fn disabling_a_running_fan_switches_to_the_other_speed() {
        let mut engine = engine(SystemMode::Off, EquipmentPolicy::default());
        engine.set_fan_mode(FanMode::Low);

        assert_eq!(
            engine.poll(0),
            vec![
                HvacAction::FanModeChanged { mode: FanMode::Low },
                set_output(EquipmentId::FanLow, true)
            ]
        );

        assert_eq!(
            engine.set_disabled(EquipmentId::FanLow, true, 1_000),
            vec![set_output(EquipmentId::FanLow, false)]
        );
        assert!(engine.set_disabled(EquipmentId::FanLow, true, 1_500).is_empty());
        assert_eq!(engine.poll(2_000), vec![set_output(EquipmentId::FanHigh, true)]);

        assert!(engine.set_disabled(EquipmentId::FanLow, false, 3_000).is_empty());
        assert_eq!(
            engine.poll(4_000),
            vec![
                set_output(EquipmentId::FanHigh, false),
                set_output(EquipmentId::FanLow, true)
            ]
        );
    }

    #[test]
    fn fan_request_applies_on_next_poll() {
        let mut engine = engine(SystemMode::Off, EquipmentPolicy::default());
        engine.set_fan_mode(FanMode::Circulate);
        assert_eq!(engine.fan_mode(), FanMode::Circulate);
        assert_eq!(engine.active_fan_mode(), FanMode::Auto);

        engine.poll(0);
        assert_eq!(engine.active_fan_mode(), FanMode::Circulate);
        assert!(engine.equipment(EquipmentId::FanLow).is_on());
    }

    #[test]
    fn construction_sanitizes_config_and_seeds_flags() {
        let config = HvacConfig {
            restart_delay_ms: 0,
            ..HvacConfig::default()
        };
        let policy = EquipmentPolicy {
            unavailable: vec![EquipmentId::GasHeater],
            disabled: vec![EquipmentId::FanHigh],
        };
        let engine = HvacEngine::new(
            config,
            HvacSettings::default(),
            UsabilityTable::from_policy(&policy),
            0,
        );

        assert_eq!(engine.config().restart_delay_ms, 120_000);
        assert!(!engine.usability(EquipmentId::GasHeater).available);
        assert!(!engine.usability(EquipmentId::FanHigh).not_disabled);
        assert!(!engine.is_usable(EquipmentId::FanHigh));
        assert!(engine.is_usable(EquipmentId::FanLow));
    }

    #[test]
    fn rejected_setpoint_leaves_state_untouched() {
        let mut engine = engine(SystemMode::Auto, EquipmentPolicy::default());
        assert!(!engine.set_heat_setpoint(75.0));
        assert!(!engine.set_cool_setpoint(71.0));
        assert_eq!(engine.heat_setpoint(), 70.0);
        assert_eq!(engine.cool_setpoint(), 73.0);

        assert!(engine.set_cool_setpoint(78.0));
        assert!(engine.set_heat_setpoint(75.0));
        assert_eq!(engine.heat_setpoint(), 75.0);
    }

    #[test]
    fn missing_temperature_is_reported_each_interval() {
        let mut engine = engine(SystemMode::Heat, EquipmentPolicy::default());
        let actions = poll_until(&mut engine, 0, 60_000);
        assert_eq!(
            actions,
            vec![HvacAction::NoValidTemperature, HvacAction::NoValidTemperature]
        );
        assert_eq!(engine.target_mode(), HardwareMode::Off);
    }

    #[test]
    fn status_reflects_flags_and_timers() {
        let policy = EquipmentPolicy {
            unavailable: vec![EquipmentId::GasHeater],
            disabled: vec![EquipmentId::Compressor2],
        };
        let mut engine = engine(SystemMode::Heat, policy);
        engine.set_temperature(69.5);
        engine.set_disabled(EquipmentId::CoachHeatLow, true, 0);

        poll_until(&mut engine, 0, 40_000);
        let status = engine.status(40_000);

        assert_eq!(status.mode, "HEAT");
        assert_eq!(status.hardware_mode, "LOW_HEAT");
        assert_eq!(status.temperature, Some(69.5));
        assert_eq!(status.target_changed_ms, 30_000);
        assert_eq!(status.next_evaluation_ms, 60_000);

        let gas = &status.equipment[EquipmentId::GasHeater.index()];
        assert!(!gas.available);
        assert!(!gas.disabled);
        let comp2 = &status.equipment[EquipmentId::Compressor2.index()];
        assert!(comp2.available);
        assert!(comp2.disabled);

        let valve = &status.equipment[EquipmentId::ReversingValve.index()];
        assert_eq!(valve.state, "SETTLE_ON");
        assert!(!valve.is_on);
        assert_eq!(valve.delay_remaining_ms, 51_000);
    }

    #[test]
    fn reset_run_times_clears_accumulated_seconds() {
        let mut engine = engine(SystemMode::Off, EquipmentPolicy::default());
        engine.set_fan_mode(FanMode::High);
        poll_until(&mut engine, 0, 10_000);
        engine.set_fan_mode(FanMode::Auto);
        engine.poll(11_000);

        assert_eq!(engine.equipment(EquipmentId::FanHigh).run_seconds(), 11);
        engine.reset_run_times();
        assert_eq!(engine.equipment(EquipmentId::FanHigh).run_seconds(), 0);
    }
}
