use crate::core::cartridge::{Mapper, MapperBus, BANK_16K, LAST_BANK};
use crate::core::{Addr, NesTime};

/// UxROM (mapper 2) and its relatives: mapper 94 (UN1ROM, register shifted
/// up two bits) and mapper 180 (the switchable window is $C000 and the fixed
/// bank is the first).
pub struct UxRom {
    code: u32,
    bank: u8,
}

impl UxRom {
    pub fn new(code: u32) -> UxRom {
        UxRom { code, bank: 0 }
    }
}

impl Mapper for UxRom {
    fn mapper_code(&self) -> u32 {
        self.code
    }
    fn reset_state(&mut self) {
        self.bank = 0;
    }
    fn apply_mapping(&mut self, bus: &mut MapperBus) {
        match self.code {
            180 => {
                bus.set_prg_bank(0x8000, BANK_16K, 0);
                bus.set_prg_bank(0xC000, BANK_16K, self.bank as i32);
            }
            _ => {
                bus.set_prg_bank(0x8000, BANK_16K, self.bank as i32);
                bus.set_prg_bank(0xC000, BANK_16K, LAST_BANK);
            }
        }
    }
    fn write(&mut self, bus: &mut MapperBus, _time: NesTime, _addr: Addr, data: u8) {
        self.bank = if self.code == 94 { data >> 2 } else { data };
        self.apply_mapping(bus);
    }
    fn state(&self) -> Vec<u8> {
        vec![self.bank]
    }
    fn load_state(&mut self, data: &[u8]) {
        if let Some(&b) = data.first() {
            self.bank = b;
        }
    }
}
