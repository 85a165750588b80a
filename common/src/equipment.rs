use crate::{
    config::HvacConfig,
    types::{EquipmentId, HvacAction},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
}

impl Edge {
    pub fn is_on(self) -> bool {
        matches!(self, Self::Rising)
    }
}

#[derive(Debug, Clone, Default)]
struct RunMeter {
    on: bool,
    start_ms: u64,
    run_seconds: u64,
}

impl RunMeter {
    fn energize(&mut self, now_ms: u64) -> Option<Edge> {
        if self.on {
            return None;
        }
        self.on = true;
        self.start_ms = now_ms;
        Some(Edge::Rising)
    }

    fn deenergize(&mut self, now_ms: u64) -> Option<Edge> {
        if !self.on {
            return None;
        }
        self.on = false;
        self.run_seconds += now_ms.saturating_sub(self.start_ms) / 1_000;
        Some(Edge::Falling)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Switch {
    meter: RunMeter,
}

impl Switch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, now_ms: u64) -> Option<Edge> {
        self.meter.energize(now_ms)
    }

    pub fn stop(&mut self, now_ms: u64) -> Option<Edge> {
        self.meter.deenergize(now_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressorState {
    Stopped,
    RestartDelay,
    Running,
}

impl CompressorState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "STOPPED",
            Self::RestartDelay => "RESTART_DELAY",
            Self::Running => "RUNNING",
        }
    }
}

// Restart clock starts at construction.
#[derive(Debug, Clone)]
pub struct Compressor {
    state: CompressorState,
    run_requested: bool,
    last_stop_ms: u64,
    restart_delay_ms: u64,
    meter: RunMeter,
}

impl Compressor {
    pub fn new(restart_delay_ms: u64, now_ms: u64) -> Self {
        Self {
            state: CompressorState::Stopped,
            run_requested: false,
            last_stop_ms: now_ms,
            restart_delay_ms,
            meter: RunMeter::default(),
        }
    }

    pub fn state(&self) -> CompressorState {
        self.state
    }

    pub fn is_requested(&self) -> bool {
        self.run_requested
    }

    pub fn start(&mut self, now_ms: u64) -> Option<Edge> {
        if self.state != CompressorState::Stopped {
            return None;
        }
        self.state = CompressorState::RestartDelay;
        self.run_requested = true;
        self.try_run(now_ms)
    }

    pub fn stop(&mut self, now_ms: u64) -> Option<Edge> {
        self.run_requested = false;
        let previous = std::mem::replace(&mut self.state, CompressorState::Stopped);
        if previous != CompressorState::Running {
            return None;
        }
        self.last_stop_ms = now_ms;
        self.meter.deenergize(now_ms)
    }

    pub fn poll(&mut self, now_ms: u64) -> Option<Edge> {
        match self.state {
            CompressorState::RestartDelay => self.try_run(now_ms),
            _ => None,
        }
    }

    pub fn restart_remaining_ms(&self, now_ms: u64) -> u64 {
        self.last_stop_ms
            .saturating_add(self.restart_delay_ms)
            .saturating_sub(now_ms)
    }

    fn restart_allowed(&self, now_ms: u64) -> bool {
        self.run_requested && now_ms >= self.last_stop_ms.saturating_add(self.restart_delay_ms)
    }

    fn try_run(&mut self, now_ms: u64) -> Option<Edge> {
        if !self.restart_allowed(now_ms) {
            return None;
        }
        self.state = CompressorState::Running;
        self.meter.energize(now_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValveState {
    Stopped,
    SettleOn,
    Running,
    SettleOff,
}

impl ValveState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "STOPPED",
            Self::SettleOn => "SETTLE_ON",
            Self::Running => "RUNNING",
            Self::SettleOff => "SETTLE_OFF",
        }
    }
}

// Output holds its previous level through each settle window.
#[derive(Debug, Clone)]
pub struct ReversingValve {
    state: ValveState,
    run_requested: bool,
    delay_timer_ms: u64,
    settle_ms: u64,
    meter: RunMeter,
}

impl ReversingValve {
    pub fn new(settle_ms: u64) -> Self {
        Self {
            state: ValveState::Stopped,
            run_requested: false,
            delay_timer_ms: 0,
            settle_ms,
            meter: RunMeter::default(),
        }
    }

    pub fn state(&self) -> ValveState {
        self.state
    }

    pub fn is_requested(&self) -> bool {
        self.run_requested
    }

    pub fn start(&mut self, now_ms: u64) -> Option<Edge> {
        match self.state {
            // SettleOff -> SettleOn reverses mid-settle and re-arms the timer.
            ValveState::Stopped | ValveState::SettleOff => {
                self.state = ValveState::SettleOn;
                self.run_requested = true;
                self.delay_timer_ms = now_ms;
                self.try_settle(now_ms)
            }
            ValveState::SettleOn | ValveState::Running => None,
        }
    }

    pub fn stop(&mut self, now_ms: u64) -> Option<Edge> {
        match self.state {
            ValveState::Running | ValveState::SettleOn => {
                self.state = ValveState::SettleOff;
                self.run_requested = false;
                self.delay_timer_ms = now_ms;
                self.try_settle(now_ms)
            }
            ValveState::Stopped | ValveState::SettleOff => None,
        }
    }

    pub fn poll(&mut self, now_ms: u64) -> Option<Edge> {
        match self.state {
            ValveState::SettleOn | ValveState::SettleOff => self.try_settle(now_ms),
            ValveState::Stopped | ValveState::Running => None,
        }
    }

    pub fn settle_remaining_ms(&self, now_ms: u64) -> u64 {
        if !matches!(self.state, ValveState::SettleOn | ValveState::SettleOff) {
            return 0;
        }
        self.delay_timer_ms
            .saturating_add(self.settle_ms)
            .saturating_sub(now_ms)
    }

    fn settled(&self, now_ms: u64) -> bool {
        now_ms >= self.delay_timer_ms.saturating_add(self.settle_ms)
    }

    fn try_settle(&mut self, now_ms: u64) -> Option<Edge> {
        if !self.settled(now_ms) {
            return None;
        }
        match self.state {
            ValveState::SettleOn => {
                self.state = ValveState::Running;
                self.meter.energize(now_ms)
            }
            ValveState::SettleOff => {
                self.state = ValveState::Stopped;
                self.meter.deenergize(now_ms)
            }
            ValveState::Stopped | ValveState::Running => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Equipment {
    Switch(Switch),
    Compressor(Compressor),
    ReversingValve(ReversingValve),
}

impl Equipment {
    pub fn start(&mut self, now_ms: u64) -> Option<Edge> {
        match self {
            Self::Switch(item) => item.start(now_ms),
            Self::Compressor(item) => item.start(now_ms),
            Self::ReversingValve(item) => item.start(now_ms),
        }
    }

    pub fn stop(&mut self, now_ms: u64) -> Option<Edge> {
        match self {
            Self::Switch(item) => item.stop(now_ms),
            Self::Compressor(item) => item.stop(now_ms),
            Self::ReversingValve(item) => item.stop(now_ms),
        }
    }

    pub fn poll(&mut self, now_ms: u64) -> Option<Edge> {
        match self {
            Self::Switch(_) => None,
            Self::Compressor(item) => item.poll(now_ms),
            Self::ReversingValve(item) => item.poll(now_ms),
        }
    }

    pub fn is_on(&self) -> bool {
        self.meter().on
    }

    pub fn is_polling_required(&self) -> bool {
        match self {
            Self::Switch(_) => false,
            Self::Compressor(item) => item.state == CompressorState::RestartDelay,
            Self::ReversingValve(item) => {
                matches!(item.state, ValveState::SettleOn | ValveState::SettleOff)
            }
        }
    }

    pub fn start_time_ms(&self) -> u64 {
        self.meter().start_ms
    }

    pub fn run_seconds(&self) -> u64 {
        self.meter().run_seconds
    }

    pub fn reset_run_time(&mut self) {
        self.meter_mut().run_seconds = 0;
    }

    pub fn has_run_for(&self, duration_ms: u64, now_ms: u64) -> bool {
        self.is_on() && now_ms >= self.start_time_ms().saturating_add(duration_ms)
    }

    pub fn state_name(&self) -> &'static str {
        match self {
            Self::Switch(item) if item.meter.on => "ON",
            Self::Switch(_) => "OFF",
            Self::Compressor(item) => item.state.as_str(),
            Self::ReversingValve(item) => item.state.as_str(),
        }
    }

    pub fn is_steady_on(&self) -> bool {
        self.is_on() && !self.is_polling_required()
    }

    pub fn is_idle(&self) -> bool {
        !self.is_on() && !self.is_polling_required()
    }

    pub fn delay_remaining_ms(&self, now_ms: u64) -> u64 {
        match self {
            Self::Switch(_) => 0,
            Self::Compressor(item) if item.state == CompressorState::RestartDelay => {
                item.restart_remaining_ms(now_ms)
            }
            Self::Compressor(_) => 0,
            Self::ReversingValve(item) => item.settle_remaining_ms(now_ms),
        }
    }

    fn meter(&self) -> &RunMeter {
        match self {
            Self::Switch(item) => &item.meter,
            Self::Compressor(item) => &item.meter,
            Self::ReversingValve(item) => &item.meter,
        }
    }

    fn meter_mut(&mut self) -> &mut RunMeter {
        match self {
            Self::Switch(item) => &mut item.meter,
            Self::Compressor(item) => &mut item.meter,
            Self::ReversingValve(item) => &mut item.meter,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EquipmentSet {
    items: [Equipment; EquipmentId::COUNT],
}

impl EquipmentSet {
    pub fn new(config: &HvacConfig, now_ms: u64) -> Self {
        let items = EquipmentId::ALL.map(|id| match id {
            EquipmentId::Compressor1 | EquipmentId::Compressor2 => {
                Equipment::Compressor(Compressor::new(config.restart_delay_ms, now_ms))
            }
            EquipmentId::ReversingValve => {
                Equipment::ReversingValve(ReversingValve::new(config.valve_settle_ms))
            }
            _ => Equipment::Switch(Switch::new()),
        });
        Self { items }
    }

    pub fn get(&self, id: EquipmentId) -> &Equipment {
        &self.items[id.index()]
    }

    pub fn get_mut(&mut self, id: EquipmentId) -> &mut Equipment {
        &mut self.items[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (EquipmentId, &Equipment)> {
        EquipmentId::ALL.into_iter().zip(self.items.iter())
    }

    pub fn is_on(&self, id: EquipmentId) -> bool {
        self.get(id).is_on()
    }

    pub fn start(&mut self, id: EquipmentId, now_ms: u64, actions: &mut Vec<HvacAction>) {
        let edge = self.get_mut(id).start(now_ms);
        push_edge(id, edge, actions);
    }

    pub fn stop(&mut self, id: EquipmentId, now_ms: u64, actions: &mut Vec<HvacAction>) {
        let edge = self.get_mut(id).stop(now_ms);
        push_edge(id, edge, actions);
    }

    pub fn poll(&mut self, now_ms: u64, actions: &mut Vec<HvacAction>) {
        for (id, item) in EquipmentId::ALL.into_iter().zip(self.items.iter_mut()) {
            let edge = item.poll(now_ms);
            push_edge(id, edge, actions);
        }
    }

    pub fn reset_run_times(&mut self) {
        for item in &mut self.items {
            item.reset_run_time();
        }
    }
}

fn push_edge(id: EquipmentId, edge: Option<Edge>, actions: &mut Vec<HvacAction>) {
    if let Some(edge) = edge {
        actions.push(HvacAction::SetOutput {
            equipment: id,
            on: edge.is_on(),
        });
    }
}
