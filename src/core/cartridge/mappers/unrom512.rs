use crate::core::cartridge::{Mapper, MapperBus, BANK_16K, BANK_8K, LAST_BANK};
use crate::core::{Addr, NesTime};

/// UNROM 512 (mapper 30): UNROM stretched to 512 KiB with CHR RAM banking
/// and an optional one-screen mirroring bit. The flash self-programming of
/// the real board is not emulated.
#[derive(Default)]
pub struct Unrom512 {
    reg: u8,
}

impl Mapper for Unrom512 {
    fn mapper_code(&self) -> u32 {
        30
    }
    fn reset_state(&mut self) {
        self.reg = 0;
    }
    fn apply_mapping(&mut self, bus: &mut MapperBus) {
        bus.set_prg_bank(0x8000, BANK_16K, (self.reg & 0x1F) as i32);
        bus.set_prg_bank(0xC000, BANK_16K, LAST_BANK);
        bus.set_chr_bank(0, BANK_8K, ((self.reg >> 5) & 0x03) as i32);
        if bus.cart.mirroring() & 0x08 != 0 {
            // Four-screen variant uses the register's top bit as a
            // one-screen select
            bus.mirror_single((self.reg >> 7) as usize);
        }
    }
    fn write(&mut self, bus: &mut MapperBus, _time: NesTime, _addr: Addr, data: u8) {
        self.reg = data;
        self.apply_mapping(bus);
    }
    fn state(&self) -> Vec<u8> {
        vec![self.reg]
    }
    fn load_state(&mut self, data: &[u8]) {
        if let Some(&b) = data.first() {
            self.reg = b;
        }
    }
}
