use crate::core::cartridge::{Mapper, MapperBus, BANK_1K, BANK_2K, BANK_8K, LAST_BANK};
use crate::core::{Addr, NesTime};

/// Taito TC0190 (mapper 33).
#[derive(Default)]
pub struct Tc0190 {
    prg: [u8; 2],
    chr: [u8; 6],
    mirror: bool,
}

impl Mapper for Tc0190 {
    fn mapper_code(&self) -> u32 {
        33
    }
    fn reset_state(&mut self) {
        *self = Tc0190::default();
    }
    fn apply_mapping(&mut self, bus: &mut MapperBus) {
        bus.set_prg_bank(0x8000, BANK_8K, (self.prg[0] & 0x3F) as i32);
        bus.set_prg_bank(0xA000, BANK_8K, (self.prg[1] & 0x3F) as i32);
        bus.set_prg_bank(0xC000, BANK_8K, LAST_BANK - 1);
        bus.set_prg_bank(0xE000, BANK_8K, LAST_BANK);
        bus.set_chr_bank(0x0000, BANK_2K, self.chr[0] as i32);
        bus.set_chr_bank(0x0800, BANK_2K, self.chr[1] as i32);
        for i in 0..4 {
            bus.set_chr_bank(0x1000 + i as Addr * 0x400, BANK_1K, self.chr[2 + i] as i32);
        }
        if self.mirror {
            bus.mirror_horiz(0);
        } else {
            bus.mirror_vert(0);
        }
    }
    fn write(&mut self, bus: &mut MapperBus, _time: NesTime, addr: Addr, data: u8) {
        match addr & 0xA003 {
            0x8000 => {
                self.prg[0] = data & 0x3F;
                self.mirror = data & 0x40 != 0;
            }
            0x8001 => self.prg[1] = data,
            0x8002 => self.chr[0] = data,
            0x8003 => self.chr[1] = data,
            0xA000..=0xA003 => self.chr[2 + (addr & 3) as usize] = data,
            _ => return,
        }
        self.apply_mapping(bus);
    }
    fn state(&self) -> Vec<u8> {
        let mut out = vec![self.prg[0], self.prg[1], self.mirror as u8];
        out.extend_from_slice(&self.chr);
        out
    }
    fn load_state(&mut self, data: &[u8]) {
        if data.len() >= 9 {
            self.prg = [data[0], data[1]];
            self.mirror = data[2] != 0;
            self.chr.copy_from_slice(&data[3..9]);
        }
    }
}

/// Taito X1-005 (mapper 207): registers in the $7EF0 window, with the
/// nametable selects riding on the top bit of the first two CHR registers.
#[derive(Default)]
pub struct TaitoX1005 {
    prg: [u8; 3],
    chr: [u8; 6],
    nt: [u8; 2],
}

impl Mapper for TaitoX1005 {
    fn mapper_code(&self) -> u32 {
        207
    }
    fn reset_state(&mut self) {
        *self = TaitoX1005::default();
    }
    fn apply_mapping(&mut self, bus: &mut MapperBus) {
        bus.intercept_writes(0x7000, 0x1000);
        bus.set_prg_bank(0x8000, BANK_8K, (self.prg[0] & 0x3F) as i32);
        bus.set_prg_bank(0xA000, BANK_8K, (self.prg[1] & 0x3F) as i32);
        bus.set_prg_bank(0xC000, BANK_8K, (self.prg[2] & 0x3F) as i32);
        bus.set_prg_bank(0xE000, BANK_8K, LAST_BANK);
        bus.set_chr_bank(0x0000, BANK_2K, (self.chr[0] >> 1) as i32);
        bus.set_chr_bank(0x0800, BANK_2K, (self.chr[1] >> 1) as i32);
        for i in 0..4 {
            bus.set_chr_bank(0x1000 + i as Addr * 0x400, BANK_1K, self.chr[2 + i] as i32);
        }
        let a = (self.nt[0] >> 7) as usize;
        let b = (self.nt[1] >> 7) as usize;
        bus.mirror_manual(a, a, b, b);
    }
    fn write(&mut self, _bus: &mut MapperBus, _time: NesTime, _addr: Addr, _data: u8) {}
    fn write_intercepted(
        &mut self,
        bus: &mut MapperBus,
        _time: NesTime,
        addr: Addr,
        data: u8,
    ) -> bool {
        match addr {
            0x7EF0 | 0x7EF1 => {
                self.chr[(addr & 1) as usize] = data;
                self.nt[(addr & 1) as usize] = data;
            }
            0x7EF2..=0x7EF5 => self.chr[(addr - 0x7EF0) as usize] = data,
            0x7EFA | 0x7EFB => self.prg[0] = data >> 2,
            0x7EFC | 0x7EFD => self.prg[1] = data >> 2,
            0x7EFE | 0x7EFF => self.prg[2] = data >> 2,
            _ => return false,
        }
        self.apply_mapping(bus);
        true
    }
    fn state(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.prg);
        out.extend_from_slice(&self.chr);
        out.extend_from_slice(&self.nt);
        out
    }
    fn load_state(&mut self, data: &[u8]) {
        if data.len() >= 11 {
            self.prg.copy_from_slice(&data[0..3]);
            self.chr.copy_from_slice(&data[3..9]);
            self.nt.copy_from_slice(&data[9..11]);
        }
    }
}
