use crate::core::cartridge::{Mapper, MapperBus, BANK_32K, BANK_4K};
use crate::core::{Addr, NesTime};

/// Mapper 34 covers two unrelated boards that share a number: BNROM (32 KiB
/// PRG banking, writes at $8000+) and NINA-001 (registers at $7FFD-$7FFF
/// with 4 KiB CHR banking). CHR ROM presence tells them apart.
#[derive(Default)]
pub struct BnRom {
    prg: u8,
    chr: [u8; 2],
}

impl Mapper for BnRom {
    fn mapper_code(&self) -> u32 {
        34
    }
    fn reset_state(&mut self) {
        self.prg = 0;
        self.chr = [0, 1];
    }
    fn apply_mapping(&mut self, bus: &mut MapperBus) {
        bus.set_prg_bank(0x8000, BANK_32K, self.prg as i32);
        if !bus.cart.chr_is_ram() {
            bus.set_chr_bank(0x0000, BANK_4K, self.chr[0] as i32);
            bus.set_chr_bank(0x1000, BANK_4K, self.chr[1] as i32);
            bus.intercept_writes(0x7800, 0x800);
        }
    }
    fn write(&mut self, bus: &mut MapperBus, _time: NesTime, _addr: Addr, data: u8) {
        self.prg = data;
        self.apply_mapping(bus);
    }
    fn write_intercepted(
        &mut self,
        bus: &mut MapperBus,
        _time: NesTime,
        addr: Addr,
        data: u8,
    ) -> bool {
        if bus.cart.chr_is_ram() {
            return false;
        }
        match addr {
            0x7FFD => self.prg = data,
            0x7FFE => self.chr[0] = data,
            0x7FFF => self.chr[1] = data,
            _ => return false,
        }
        self.apply_mapping(bus);
        true
    }
    fn state(&self) -> Vec<u8> {
        vec![self.prg, self.chr[0], self.chr[1]]
    }
    fn load_state(&mut self, data: &[u8]) {
        if data.len() >= 3 {
            self.prg = data[0];
            self.chr = [data[1], data[2]];
        }
    }
}
