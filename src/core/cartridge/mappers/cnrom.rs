use crate::core::cartridge::{Mapper, MapperBus, BANK_8K};
use crate::core::{Addr, NesTime};

/// CNROM (mapper 3): a single CHR bank register.
#[derive(Default)]
pub struct CnRom {
    bank: u8,
}

impl Mapper for CnRom {
    fn mapper_code(&self) -> u32 {
        3
    }
    fn reset_state(&mut self) {
        self.bank = 0;
    }
    fn apply_mapping(&mut self, bus: &mut MapperBus) {
        bus.set_chr_bank(0, BANK_8K, self.bank as i32);
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
