use crate::core::cartridge::{Mapper, MapperBus, BANK_1K, BANK_8K, LAST_BANK};
use crate::core::{Addr, NesTime};

/// Irem G-101 (mapper 32).
#[derive(Default)]
pub struct G101 {
    prg: [u8; 2],
    chr: [u8; 8],
    ctrl: u8,
}

impl Mapper for G101 {
    fn mapper_code(&self) -> u32 {
        32
    }
    fn reset_state(&mut self) {
        *self = G101::default();
    }
    fn apply_mapping(&mut self, bus: &mut MapperBus) {
        let p0 = (self.prg[0] & 0x1F) as i32;
        if self.ctrl & 0x02 != 0 {
            bus.set_prg_bank(0x8000, BANK_8K, LAST_BANK - 1);
            bus.set_prg_bank(0xC000, BANK_8K, p0);
        } else {
            bus.set_prg_bank(0x8000, BANK_8K, p0);
            bus.set_prg_bank(0xC000, BANK_8K, LAST_BANK - 1);
        }
        bus.set_prg_bank(0xA000, BANK_8K, (self.prg[1] & 0x1F) as i32);
        bus.set_prg_bank(0xE000, BANK_8K, LAST_BANK);
        for i in 0..8 {
            bus.set_chr_bank(i as Addr * 0x400, BANK_1K, self.chr[i] as i32);
        }
        if self.ctrl & 0x01 != 0 {
            bus.mirror_horiz(0);
        } else {
            bus.mirror_vert(0);
        }
    }
    fn write(&mut self, bus: &mut MapperBus, _time: NesTime, addr: Addr, data: u8) {
        match addr & 0xF007 {
            0x8000..=0x8007 => self.prg[0] = data,
            0x9000..=0x9007 => self.ctrl = data,
            0xA000..=0xA007 => self.prg[1] = data,
            0xB000..=0xB007 => self.chr[(addr & 7) as usize] = data,
            _ => return,
        }
        self.apply_mapping(bus);
    }
    fn state(&self) -> Vec<u8> {
        let mut out = vec![self.prg[0], self.prg[1], self.ctrl];
        out.extend_from_slice(&self.chr);
        out
    }
    fn load_state(&mut self, data: &[u8]) {
        if data.len() >= 11 {
            self.prg = [data[0], data[1]];
            self.ctrl = data[2];
            self.chr.copy_from_slice(&data[3..11]);
        }
    }
}
