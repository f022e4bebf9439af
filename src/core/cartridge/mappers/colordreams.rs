use crate::core::cartridge::{Mapper, MapperBus, BANK_32K, BANK_8K};
use crate::core::{Addr, NesTime};

/// Color Dreams (mapper 11): PRG and CHR selected by one register.
#[derive(Default)]
pub struct ColorDreams {
    bank: u8,
}

impl Mapper for ColorDreams {
    fn mapper_code(&self) -> u32 {
        11
    }
    fn reset_state(&mut self) {
        self.bank = 0;
    }
    fn apply_mapping(&mut self, bus: &mut MapperBus) {
        bus.set_prg_bank(0x8000, BANK_32K, (self.bank & 0x03) as i32);
        bus.set_chr_bank(0, BANK_8K, (self.bank >> 4) as i32);
    }
    fn write(&mut self, bus: &mut MapperBus, _time: NesTime, _addr: Addr, data: u8) {
        self.bank = data;
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
