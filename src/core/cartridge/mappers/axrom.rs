use crate::core::cartridge::{Mapper, MapperBus, BANK_32K};
use crate::core::{Addr, NesTime};

/// AxROM (mapper 7): 32 KiB PRG banks plus one-screen mirroring select.
#[derive(Default)]
pub struct AxRom {
    bank: u8,
}

impl Mapper for AxRom {
    fn mapper_code(&self) -> u32 {
        7
    }
    fn reset_state(&mut self) {
        self.bank = 0;
    }
    fn apply_mapping(&mut self, bus: &mut MapperBus) {
        bus.set_prg_bank(0x8000, BANK_32K, (self.bank & 0x07) as i32);
        bus.mirror_single(((self.bank >> 4) & 1) as usize);
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
