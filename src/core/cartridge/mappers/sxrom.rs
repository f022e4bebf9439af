use crate::core::cartridge::{Mapper, MapperBus, BANK_16K, BANK_32K, BANK_4K, BANK_8K, LAST_BANK};
use crate::core::{Addr, NesTime};

/// MMC1 / SxROM (mapper 1).
///
/// Registers are loaded serially, five writes of one bit each; a write with
/// bit 7 set resets the shifter and locks PRG mode 3.
pub struct SxRom {
    regs: [u8; 4],
    shift: u8,
    shift_count: u8,
}

impl Default for SxRom {
    fn default() -> Self {
        SxRom {
            regs: [0x0C, 0, 0, 0],
            shift: 0,
            shift_count: 0,
        }
    }
}

impl Mapper for SxRom {
    fn mapper_code(&self) -> u32 {
        1
    }
    fn reset_state(&mut self) {
        self.regs = [0x0C, 0, 0, 0];
        self.shift = 0;
        self.shift_count = 0;
    }
    fn apply_mapping(&mut self, bus: &mut MapperBus) {
        let control = self.regs[0];
        match control & 0x03 {
            0 => bus.mirror_single(0),
            1 => bus.mirror_single(1),
            2 => bus.mirror_vert(0),
            _ => bus.mirror_horiz(0),
        }
        let prg = (self.regs[3] & 0x0F) as i32;
        match (control >> 2) & 0x03 {
            0 | 1 => bus.set_prg_bank(0x8000, BANK_32K, prg >> 1),
            2 => {
                bus.set_prg_bank(0x8000, BANK_16K, 0);
                bus.set_prg_bank(0xC000, BANK_16K, prg);
            }
            _ => {
                bus.set_prg_bank(0x8000, BANK_16K, prg);
                bus.set_prg_bank(0xC000, BANK_16K, LAST_BANK);
            }
        }
        if control & 0x10 != 0 {
            bus.set_chr_bank(0x0000, BANK_4K, (self.regs[1] & 0x1F) as i32);
            bus.set_chr_bank(0x1000, BANK_4K, (self.regs[2] & 0x1F) as i32);
        } else {
            bus.set_chr_bank(0x0000, BANK_8K, ((self.regs[1] & 0x1E) >> 1) as i32);
        }
        // PRG RAM is enabled unless the top bank register disables it
        bus.enable_sram(self.regs[3] & 0x10 == 0, false);
    }
    fn write(&mut self, bus: &mut MapperBus, _time: NesTime, addr: Addr, data: u8) {
        if data & 0x80 != 0 {
            self.shift = 0;
            self.shift_count = 0;
            self.regs[0] |= 0x0C;
            self.apply_mapping(bus);
            return;
        }
        self.shift |= (data & 1) << self.shift_count;
        self.shift_count += 1;
        if self.shift_count == 5 {
            let reg = ((addr >> 13) & 0x03) as usize;
            self.regs[reg] = self.shift;
            self.shift = 0;
            self.shift_count = 0;
            self.apply_mapping(bus);
        }
    }
    fn state(&self) -> Vec<u8> {
        vec![
            self.regs[0],
            self.regs[1],
            self.regs[2],
            self.regs[3],
            self.shift,
            self.shift_count,
        ]
    }
    fn load_state(&mut self, data: &[u8]) {
        if data.len() >= 6 {
            self.regs.copy_from_slice(&data[..4]);
            self.shift = data[4];
            self.shift_count = data[5].min(4);
        }
    }
}
