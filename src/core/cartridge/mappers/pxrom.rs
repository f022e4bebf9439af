use crate::core::cartridge::{Mapper, MapperBus, BANK_16K, BANK_4K, BANK_8K, LAST_BANK};
use crate::core::{Addr, NesTime};

/// MMC2 / PxROM (mapper 9) and MMC4 / FxROM (mapper 10).
///
/// Both keep two CHR banks per pattern table and flip between them with the
/// $FD/$FE tile latch, which lives in the PPU's fetch path. They differ only
/// in PRG arrangement.
pub struct PxRom {
    code: u32,
    prg: u8,
    /// CHR banks selected while the latch is low ($FD) per pattern table.
    chr_fd: [u8; 2],
    /// CHR banks selected while the latch is high ($FE).
    chr_fe: [u8; 2],
    mirror: u8,
}

impl PxRom {
    pub fn new(code: u32) -> PxRom {
        PxRom {
            code,
            prg: 0,
            chr_fd: [0; 2],
            chr_fe: [0; 2],
            mirror: 0,
        }
    }
}

impl Mapper for PxRom {
    fn mapper_code(&self) -> u32 {
        self.code
    }
    fn reset_state(&mut self) {
        self.prg = 0;
        self.chr_fd = [0; 2];
        self.chr_fe = [0; 2];
        self.mirror = 0;
    }
    fn apply_mapping(&mut self, bus: &mut MapperBus) {
        if self.code == 9 {
            bus.set_prg_bank(0x8000, BANK_8K, (self.prg & 0x0F) as i32);
            bus.set_prg_bank(0xA000, BANK_8K, LAST_BANK - 2);
            bus.set_prg_bank(0xC000, BANK_8K, LAST_BANK - 1);
            bus.set_prg_bank(0xE000, BANK_8K, LAST_BANK);
        } else {
            bus.set_prg_bank(0x8000, BANK_16K, (self.prg & 0x0F) as i32);
            bus.set_prg_bank(0xC000, BANK_16K, LAST_BANK);
            bus.enable_sram(true, false);
        }
        bus.set_chr_bank(0x0000, BANK_4K, (self.chr_fd[0] & 0x1F) as i32);
        bus.set_chr_bank(0x1000, BANK_4K, (self.chr_fd[1] & 0x1F) as i32);
        bus.set_chr_bank_ex(0x0000, BANK_4K, (self.chr_fe[0] & 0x1F) as i32);
        bus.set_chr_bank_ex(0x1000, BANK_4K, (self.chr_fe[1] & 0x1F) as i32);
        if self.mirror & 1 != 0 {
            bus.mirror_horiz(0);
        } else {
            bus.mirror_vert(0);
        }
    }
    fn write(&mut self, bus: &mut MapperBus, _time: NesTime, addr: Addr, data: u8) {
        match addr & 0xF000 {
            0xA000 => self.prg = data,
            0xB000 => self.chr_fd[0] = data,
            0xC000 => self.chr_fe[0] = data,
            0xD000 => self.chr_fd[1] = data,
            0xE000 => self.chr_fe[1] = data,
            0xF000 => self.mirror = data,
            _ => return,
        }
        self.apply_mapping(bus);
    }
    fn state(&self) -> Vec<u8> {
        vec![
            self.prg,
            self.chr_fd[0],
            self.chr_fd[1],
            self.chr_fe[0],
            self.chr_fe[1],
            self.mirror,
        ]
    }
    fn load_state(&mut self, data: &[u8]) {
        if data.len() >= 6 {
            self.prg = data[0];
            self.chr_fd = [data[1], data[2]];
            self.chr_fe = [data[3], data[4]];
            self.mirror = data[5];
        }
    }
}
