use crate::core::cartridge::{Mapper, MapperBus, BANK_32K, BANK_8K};
use crate::core::{Addr, NesTime};

/// GxROM (mapper 66) and the Jaleco JF-11 (mapper 140), which is the same
/// latch wired to $6000-$7FFF instead.
pub struct GxRom {
    code: u32,
    bank: u8,
}

impl GxRom {
    pub fn new(code: u32) -> GxRom {
        GxRom { code, bank: 0 }
    }
    fn set(&mut self, bus: &mut MapperBus, data: u8) {
        self.bank = data;
        self.apply_mapping(bus);
    }
}

impl Mapper for GxRom {
    fn mapper_code(&self) -> u32 {
        self.code
    }
    fn reset_state(&mut self) {
        self.bank = 0;
    }
    fn apply_mapping(&mut self, bus: &mut MapperBus) {
        bus.set_prg_bank(0x8000, BANK_32K, ((self.bank >> 4) & 0x03) as i32);
        bus.set_chr_bank(0, BANK_8K, (self.bank & 0x03) as i32);
        if self.code == 140 {
            bus.intercept_writes(0x6000, 0x2000);
        }
    }
    fn write(&mut self, bus: &mut MapperBus, _time: NesTime, _addr: Addr, data: u8) {
        if self.code == 66 {
            self.set(bus, data);
        }
    }
    fn write_intercepted(
        &mut self,
        bus: &mut MapperBus,
        _time: NesTime,
        addr: Addr,
        data: u8,
    ) -> bool {
        if self.code == 140 && (0x6000..0x8000).contains(&addr) {
            self.set(bus, data);
            return true;
        }
        false
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
