use crate::{config::EquipmentPolicy, types::EquipmentId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsabilityFlags {
    pub available: bool,
    pub not_disabled: bool,
}

impl Default for UsabilityFlags {
    fn default() -> Self {
        Self {
            available: true,
            not_disabled: true,
        }
    }
}

impl UsabilityFlags {
    pub fn is_usable(self) -> bool {
        self.available && self.not_disabled
    }
}

#[derive(Debug, Clone, Default)]
pub struct UsabilityTable {
    flags: [UsabilityFlags; EquipmentId::COUNT],
}

impl UsabilityTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_policy(policy: &EquipmentPolicy) -> Self {
        let mut table = Self::new();
        for id in &policy.unavailable {
            table.flags[id.index()].available = false;
        }
        for id in &policy.disabled {
            table.flags[id.index()].not_disabled = false;
        }
        table
    }

    pub fn flags(&self, id: EquipmentId) -> UsabilityFlags {
        self.flags[id.index()]
    }

    pub fn is_usable(&self, id: EquipmentId) -> bool {
        self.flags(id).is_usable()
    }

    pub fn set_available(&mut self, id: EquipmentId, available: bool) -> bool {
        let flags = &mut self.flags[id.index()];
        if flags.available == available {
            return false;
        }
        flags.available = available;
        !available
    }

    pub fn set_disabled(&mut self, id: EquipmentId, disabled: bool) -> bool {
        let flags = &mut self.flags[id.index()];
        if flags.not_disabled == !disabled {
            return false;
        }
        flags.not_disabled = !disabled;
        disabled
    }
}
