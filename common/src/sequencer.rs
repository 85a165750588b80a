use crate::{
    config::HvacConfig,
    equipment::{Equipment, EquipmentSet},
    types::{EquipmentId, FanMode, HardwareMode, HvacAction},
    usability::UsabilityTable,
};

use EquipmentId::{
    CoachHeatHigh, CoachHeatLow, Compressor1, Compressor2, FanHigh, FanLow, GasHeater,
    ReversingValve,
};

const HEAT_SOURCES: [EquipmentId; 3] = [GasHeater, CoachHeatLow, CoachHeatHigh];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FanSpeed {
    Low,
    High,
}

impl FanSpeed {
    fn id(self) -> EquipmentId {
        match self {
            Self::Low => FanLow,
            Self::High => FanHigh,
        }
    }

    fn other(self) -> Self {
        match self {
            Self::Low => Self::High,
            Self::High => Self::Low,
        }
    }
}

pub struct Sequencer<'a> {
    config: &'a HvacConfig,
    equipment: &'a mut EquipmentSet,
    usability: &'a UsabilityTable,
    fan_mode: FanMode,
    now_ms: u64,
    actions: &'a mut Vec<HvacAction>,
}

impl<'a> Sequencer<'a> {
    pub fn new(
        config: &'a HvacConfig,
        equipment: &'a mut EquipmentSet,
        usability: &'a UsabilityTable,
        fan_mode: FanMode,
        now_ms: u64,
        actions: &'a mut Vec<HvacAction>,
    ) -> Self {
        Self {
            config,
            equipment,
            usability,
            fan_mode,
            now_ms,
            actions,
        }
    }

    pub fn run(mut self, mode: HardwareMode) {
        match mode {
            HardwareMode::Off => self.shut_down(),
            HardwareMode::LowCool => self.cool(false),
            HardwareMode::HighCool => self.cool(true),
            HardwareMode::LowHeat => self.low_heat(),
            HardwareMode::HighHeat => self.high_heat(),
            HardwareMode::MaxHeat => self.max_heat(),
        }
    }

    fn shut_down(&mut self) {
        self.stop_all(HEAT_SOURCES);
        self.stop_compressors();
        if !self.release_valve() {
            return;
        }
        self.idle_fans();
    }

    fn cool(&mut self, staged: bool) {
        self.stop_all(HEAT_SOURCES);
        if !staged {
            self.stop(Compressor2);
        }
        if !self.release_valve() {
            return;
        }

        let preferred = if staged {
            FanSpeed::High
        } else {
            self.requested_speed()
        };
        if !self.engage_fan(preferred) {
            return;
        }
        self.stage_compressors(staged, false);
    }

    fn low_heat(&mut self) {
        if self.usable(CoachHeatLow) {
            self.single_source(CoachHeatLow);
        } else if self.usable(ReversingValve) {
            self.stop_all([Compressor2, GasHeater, CoachHeatHigh, CoachHeatLow]);
            self.heat_pump(false);
        } else {
            self.shut_down();
        }
    }

    fn high_heat(&mut self) {
        if self.usable(CoachHeatHigh) {
            self.single_source(CoachHeatHigh);
        } else if self.usable(ReversingValve) {
            self.stop_all(HEAT_SOURCES);
            self.heat_pump(true);
        } else if self.usable(GasHeater) {
            self.single_source(GasHeater);
        } else {
            self.shut_down();
        }
    }

    fn max_heat(&mut self) {
        if self.usable(CoachHeatHigh) {
            self.stop(CoachHeatLow);
            self.start(CoachHeatHigh);
        } else if self.usable(CoachHeatLow) {
            self.stop(CoachHeatHigh);
            self.start(CoachHeatLow);
        } else {
            self.stop_all([CoachHeatLow, CoachHeatHigh]);
        }

        if self.usable(GasHeater) {
            self.start(GasHeater);
        } else {
            self.stop(GasHeater);
        }

        if self.usable(ReversingValve) {
            self.heat_pump(true);
        } else {
            self.stop_compressors();
            self.release_valve();
            self.stop_fans();
        }
    }

    fn single_source(&mut self, source: EquipmentId) {
        self.stop_compressors();
        if self.compressors_off() {
            self.stop(ReversingValve);
        }
        for id in HEAT_SOURCES {
            if id != source {
                self.stop(id);
            }
        }
        self.start(source);
        self.idle_fans();
    }

    fn heat_pump(&mut self, staged: bool) {
        if !self.item(ReversingValve).is_steady_on() {
            self.stop_compressors();
            if self.compressors_off() {
                self.start(ReversingValve);
            }
            return;
        }

        let preferred = if staged {
            FanSpeed::High
        } else {
            self.requested_speed()
        };
        if !self.engage_fan(preferred) {
            return;
        }
        self.stage_compressors(staged, true);
    }

    // True once the valve is at rest. Compressors stay off until then.
    fn release_valve(&mut self) -> bool {
        if self.item(ReversingValve).is_idle() {
            return true;
        }
        self.stop_compressors();
        if self.compressors_off() {
            self.stop(ReversingValve);
        }
        false
    }

    fn idle_fans(&mut self) {
        if self.fan_mode == FanMode::Auto || !self.any_fan_usable() {
            self.stop_fans();
            return;
        }
        self.select_fan(self.requested_speed());
    }

    fn engage_fan(&mut self, preferred: FanSpeed) -> bool {
        if !self.any_fan_usable() {
            self.stop_compressors();
            self.stop_fans();
            return false;
        }
        self.select_fan(preferred);
        true
    }

    fn select_fan(&mut self, preferred: FanSpeed) {
        let (run, idle) = if self.usable(preferred.id()) {
            (preferred, preferred.other())
        } else {
            (preferred.other(), preferred)
        };
        self.stop(idle.id());
        self.start(run.id());
    }

    fn stage_compressors(&mut self, staged: bool, needs_valve: bool) {
        if !self.fan_lead_met() || !self.any_fan_on() {
            return;
        }
        if needs_valve && !self.item(ReversingValve).is_steady_on() {
            return;
        }

        self.start_if_usable(Compressor1);
        if !staged {
            return;
        }

        let stagger_ms = self.config.compressor_stagger_ms;
        if self.usable(Compressor1) && !self.item(Compressor1).has_run_for(stagger_ms, self.now_ms)
        {
            return;
        }
        self.start_if_usable(Compressor2);
    }

    fn fan_lead_met(&self) -> bool {
        let lead_ms = self.config.fan_lead_ms;
        [FanLow, FanHigh].into_iter().all(|id| {
            let fan = self.item(id);
            !fan.is_on() || fan.has_run_for(lead_ms, self.now_ms)
        })
    }

    fn requested_speed(&self) -> FanSpeed {
        match self.fan_mode {
            FanMode::High => FanSpeed::High,
            FanMode::Auto | FanMode::Low | FanMode::Circulate => FanSpeed::Low,
        }
    }

    fn item(&self, id: EquipmentId) -> &Equipment {
        self.equipment.get(id)
    }

    fn usable(&self, id: EquipmentId) -> bool {
        self.usability.is_usable(id)
    }

    fn any_fan_usable(&self) -> bool {
        self.usable(FanLow) || self.usable(FanHigh)
    }

    fn any_fan_on(&self) -> bool {
        self.equipment.is_on(FanLow) || self.equipment.is_on(FanHigh)
    }

    fn compressors_off(&self) -> bool {
        !self.equipment.is_on(Compressor1) && !self.equipment.is_on(Compressor2)
    }

    fn start(&mut self, id: EquipmentId) {
        self.equipment.start(id, self.now_ms, self.actions);
    }

    fn start_if_usable(&mut self, id: EquipmentId) {
        if !self.equipment.is_on(id) && self.usable(id) {
            self.start(id);
        }
    }

    fn stop(&mut self, id: EquipmentId) {
        self.equipment.stop(id, self.now_ms, self.actions);
    }

    fn stop_all<const N: usize>(&mut self, ids: [EquipmentId; N]) {
        for id in ids {
            self.stop(id);
        }
    }

    fn stop_compressors(&mut self) {
        self.stop_all([Compressor2, Compressor1]);
    }

    fn stop_fans(&mut self) {
        self.stop_all([FanLow, FanHigh]);
    }
}
