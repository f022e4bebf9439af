use crate::core::cartridge::{Mapper, MapperBus, BANK_16K, BANK_8K, LAST_BANK};
use crate::core::{Addr, NesTime};

/// K-1029 / 100-in-1 Contra Function 16 (mapper 15). The low address bits
/// select the banking mode, the data byte carries the bank and mirroring.
#[derive(Default)]
pub struct K1029 {
    mode: u8,
    reg: u8,
}

impl Mapper for K1029 {
    fn mapper_code(&self) -> u32 {
        15
    }
    fn reset_state(&mut self) {
        self.mode = 0;
        self.reg = 0;
    }
    fn apply_mapping(&mut self, bus: &mut MapperBus) {
        let bank = (self.reg & 0x3F) as i32;
        let flip = (self.reg >> 7) as i32; // swaps the halves of a 16K bank pair
        match self.mode {
            // 32K contiguous
            0 => {
                bus.set_prg_bank(0x8000, BANK_16K, bank);
                bus.set_prg_bank(0xC000, BANK_16K, bank | 1);
            }
            // 128K UNROM-style
            1 => {
                bus.set_prg_bank(0x8000, BANK_16K, bank);
                bus.set_prg_bank(0xC000, BANK_16K, LAST_BANK);
            }
            // 8K mirrored into all four slots
            2 => {
                let b8 = bank * 2 + flip;
                for i in 0..4 {
                    bus.set_prg_bank(0x8000 + i * 0x2000, BANK_8K, b8);
                }
            }
            // 16K mirrored
            _ => {
                bus.set_prg_bank(0x8000, BANK_16K, bank);
                bus.set_prg_bank(0xC000, BANK_16K, bank);
            }
        }
        if self.reg & 0x40 != 0 {
            bus.mirror_horiz(0);
        } else {
            bus.mirror_vert(0);
        }
    }
    fn write(&mut self, bus: &mut MapperBus, _time: NesTime, addr: Addr, data: u8) {
        self.mode = (addr & 0x03) as u8;
        self.reg = data;
        self.apply_mapping(bus);
    }
    fn state(&self) -> Vec<u8> {
        vec![self.mode, self.reg]
    }
    fn load_state(&mut self, data: &[u8]) {
        if data.len() >= 2 {
            self.mode = data[0] & 3;
            self.reg = data[1];
        }
    }
}

/// Reset-based 4-in-1 (mapper 60): the console reset button steps through
/// four NROM-128 games.
#[derive(Default)]
pub struct ResetFourIn1 {
    game: u8,
}

impl Mapper for ResetFourIn1 {
    fn mapper_code(&self) -> u32 {
        60
    }
    fn soft_reset(&mut self) {
        self.game = (self.game + 1) & 3;
    }
    fn apply_mapping(&mut self, bus: &mut MapperBus) {
        bus.set_prg_bank(0x8000, BANK_16K, self.game as i32);
        bus.set_prg_bank(0xC000, BANK_16K, self.game as i32);
        bus.set_chr_bank(0, BANK_8K, self.game as i32);
    }
    fn write(&mut self, _bus: &mut MapperBus, _time: NesTime, _addr: Addr, _data: u8) {}
    fn state(&self) -> Vec<u8> {
        vec![self.game]
    }
    fn load_state(&mut self, data: &[u8]) {
        if let Some(&g) = data.first() {
            self.game = g & 3;
        }
    }
}
