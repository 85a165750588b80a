use crate::types::{FanMode, HvacAction};

#[derive(Debug, Clone, Default)]
pub struct FanArbitrator {
    requested: FanMode,
    active: FanMode,
}

impl FanArbitrator {
    pub fn new(requested: FanMode) -> Self {
        Self {
            requested,
            active: requested,
        }
    }

    pub fn request(&mut self, mode: FanMode) {
        self.requested = mode;
    }

    pub fn requested(&self) -> FanMode {
        self.requested
    }

    pub fn active(&self) -> FanMode {
        self.active
    }

    pub fn reconcile(&mut self) -> Option<HvacAction> {
        if self.active == self.requested {
            return None;
        }
        self.active = self.requested;
        Some(HvacAction::FanModeChanged { mode: self.active })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_takes_effect_on_reconcile() {
        let mut fan = FanArbitrator::new(FanMode::Auto);
        fan.request(FanMode::High);
        assert_eq!(fan.active(), FanMode::Auto);

        assert_eq!(
            fan.reconcile(),
            Some(HvacAction::FanModeChanged {
                mode: FanMode::High
            })
        );
        assert_eq!(fan.active(), FanMode::High);
        assert_eq!(fan.reconcile(), None);
    }
}
