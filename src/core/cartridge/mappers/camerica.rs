use crate::core::cartridge::{Mapper, MapperBus, BANK_16K, LAST_BANK};
use crate::core::{Addr, NesTime};

/// Camerica BF9093 (mapper 71) and the Quattro multicarts (mapper 232).
///
/// 71 is UNROM with the register at $C000 and a one-screen mirroring latch at
/// $8000 used by Fire Hawk. 232 splits the bank into a block register at
/// $8000-$BFFF and a page register at $C000-$FFFF.
pub struct Camerica {
    code: u32,
    block: u8,
    bank: u8,
}

impl Camerica {
    pub fn new(code: u32) -> Camerica {
        Camerica {
            code,
            block: 0,
            bank: 0,
        }
    }
}

impl Mapper for Camerica {
    fn mapper_code(&self) -> u32 {
        self.code
    }
    fn reset_state(&mut self) {
        self.block = 0;
        self.bank = 0;
    }
    fn apply_mapping(&mut self, bus: &mut MapperBus) {
        if self.code == 232 {
            let block = ((self.block >> 3) & 0x03) as i32 * 4;
            bus.set_prg_bank(0x8000, BANK_16K, block + (self.bank & 0x03) as i32);
            bus.set_prg_bank(0xC000, BANK_16K, block + 3);
        } else {
            bus.set_prg_bank(0x8000, BANK_16K, self.bank as i32);
            bus.set_prg_bank(0xC000, BANK_16K, LAST_BANK);
        }
    }
    fn write(&mut self, bus: &mut MapperBus, _time: NesTime, addr: Addr, data: u8) {
        if addr < 0xC000 {
            if self.code == 232 {
                self.block = data;
            } else if addr >= 0x9000 {
                // Fire Hawk mirroring latch
                bus.mirror_single(((data >> 4) & 1) as usize);
                return;
            } else {
                return;
            }
        } else {
            self.bank = data;
        }
        self.apply_mapping(bus);
    }
    fn state(&self) -> Vec<u8> {
        vec![self.block, self.bank]
    }
    fn load_state(&mut self, data: &[u8]) {
        if data.len() >= 2 {
            self.block = data[0];
            self.bank = data[1];
        }
    }
}
