use crate::core::cartridge::{Mapper, MapperBus, BANK_1K, BANK_2K, BANK_8K, LAST_BANK};
use crate::core::{Addr, NesTime, NO_IRQ};

/// MMC3 / TxROM (mapper 4) and the register-compatible Namco 108 family:
/// mapper 206 (no IRQ or mirroring control), mapper 88 (CHR A16 split) and
/// mapper 154 (88 plus one-screen mirroring from the select register).
///
/// The scanline counter is driven two ways: `a12_clocked` for manual
/// $2006/$2007 accesses, and a per-scanline schedule derived from the PPU's
/// frame phase for the rises produced by rendering itself.
pub struct TxRom {
    code: u32,
    bank_select: u8,
    banks: [u8; 8],
    mirror: u8,
    ram_protect: u8,
    irq_latch: u8,
    irq_counter: u8,
    irq_enabled: bool,
    irq_reload: bool,
    irq_flag: bool,
    // Scanline schedule, rebuilt each frame
    next_scanline: i32,
    burst_phase: i32,
    rendering: bool,
}

impl TxRom {
    pub fn new(code: u32) -> TxRom {
        TxRom {
            code,
            bank_select: 0,
            banks: [0; 8],
            mirror: 0,
            ram_protect: 0,
            irq_latch: 0,
            irq_counter: 0,
            irq_enabled: false,
            irq_reload: false,
            irq_flag: false,
            next_scanline: 0,
            burst_phase: 0,
            rendering: false,
        }
    }

    fn is_mmc3(&self) -> bool {
        self.code == 4
    }

    /// Time of the in-render A12 rise on `scanline` this frame.
    fn line_time(&self, scanline: i32) -> NesTime {
        (scanline * 341 + 260 - self.burst_phase + 2).div_euclid(3)
    }

    fn clock_counter(&mut self) {
        if self.irq_counter == 0 || self.irq_reload {
            self.irq_counter = self.irq_latch;
            self.irq_reload = false;
        } else {
            self.irq_counter -= 1;
        }
        if self.irq_counter == 0 && self.irq_enabled {
            self.irq_flag = true;
        }
    }
}

impl Mapper for TxRom {
    fn mapper_code(&self) -> u32 {
        self.code
    }
    fn reset_state(&mut self) {
        self.bank_select = 0;
        self.banks = [0, 2, 4, 5, 6, 7, 0, 1];
        self.mirror = 0;
        self.ram_protect = 0;
        self.irq_latch = 0;
        self.irq_counter = 0;
        self.irq_enabled = false;
        self.irq_reload = false;
        self.irq_flag = false;
        self.next_scanline = 0;
    }
    fn apply_mapping(&mut self, bus: &mut MapperBus) {
        let prg_mask = if self.code == 206 { 0x0F } else { 0x3F };
        let p6 = (self.banks[6] & prg_mask) as i32;
        let p7 = (self.banks[7] & prg_mask) as i32;
        if self.is_mmc3() && self.bank_select & 0x40 != 0 {
            bus.set_prg_bank(0x8000, BANK_8K, LAST_BANK - 1);
            bus.set_prg_bank(0xA000, BANK_8K, p7);
            bus.set_prg_bank(0xC000, BANK_8K, p6);
        } else {
            bus.set_prg_bank(0x8000, BANK_8K, p6);
            bus.set_prg_bank(0xA000, BANK_8K, p7);
            bus.set_prg_bank(0xC000, BANK_8K, LAST_BANK - 1);
        }
        bus.set_prg_bank(0xE000, BANK_8K, LAST_BANK);

        // Mapper 88 wires CHR A16 so the 1 KiB registers address the upper
        // 64 KiB half
        let hi = if self.code == 88 || self.code == 154 { 0x40 } else { 0 };
        let (pat2k, pat1k) = if self.is_mmc3() && self.bank_select & 0x80 != 0 {
            (0x1000, 0x0000)
        } else {
            (0x0000, 0x1000)
        };
        bus.set_chr_bank(pat2k, BANK_2K, (self.banks[0] >> 1) as i32);
        bus.set_chr_bank(pat2k + 0x800, BANK_2K, (self.banks[1] >> 1) as i32);
        for i in 0..4 {
            bus.set_chr_bank(
                pat1k + i as Addr * 0x400,
                BANK_1K,
                (self.banks[2 + i] | hi) as i32,
            );
        }

        if self.code == 154 {
            bus.mirror_single(((self.bank_select >> 6) & 1) as usize);
        } else if self.is_mmc3() && bus.cart.mirroring() & 8 == 0 {
            if self.mirror & 1 != 0 {
                bus.mirror_horiz(0);
            } else {
                bus.mirror_vert(0);
            }
        }
        if self.is_mmc3() {
            bus.enable_sram(self.ram_protect & 0x80 != 0, self.ram_protect & 0x40 != 0);
        }
    }
    fn write(&mut self, bus: &mut MapperBus, _time: NesTime, addr: Addr, data: u8) {
        self.rendering = bus.ppu.rendering_enabled();
        if !self.is_mmc3() {
            match addr & 0x8001 {
                0x8000 => self.bank_select = data,
                _ => self.banks[(self.bank_select & 7) as usize] = data,
            }
            self.apply_mapping(bus);
            return;
        }
        match addr & 0xE001 {
            0x8000 => {
                self.bank_select = data;
                self.apply_mapping(bus);
            }
            0x8001 => {
                self.banks[(self.bank_select & 7) as usize] = data;
                self.apply_mapping(bus);
            }
            0xA000 => {
                self.mirror = data;
                self.apply_mapping(bus);
            }
            0xA001 => {
                self.ram_protect = data;
                self.apply_mapping(bus);
            }
            0xC000 => self.irq_latch = data,
            0xC001 => self.irq_reload = true,
            0xE000 => {
                self.irq_enabled = false;
                self.irq_flag = false;
                bus.irq_changed();
            }
            _ => {
                self.irq_enabled = true;
                bus.irq_changed();
            }
        }
    }
    fn next_irq(&self, present: NesTime) -> NesTime {
        if self.irq_flag {
            return present;
        }
        if !self.is_mmc3() || !self.irq_enabled || !self.rendering {
            return NO_IRQ;
        }
        let mut counter = self.irq_counter;
        let mut reload = self.irq_reload;
        let mut s = self.next_scanline;
        while s <= 239 {
            if counter == 0 || reload {
                counter = self.irq_latch;
                reload = false;
            } else {
                counter -= 1;
            }
            if counter == 0 {
                return self.line_time(s).max(present);
            }
            s += 1;
        }
        NO_IRQ
    }
    fn run_until(&mut self, bus: &mut MapperBus, time: NesTime) {
        if !self.is_mmc3() {
            return;
        }
        self.burst_phase = bus.ppu.burst_phase as i32;
        self.rendering = bus.ppu.rendering_enabled();
        while self.next_scanline <= 239 && bus.ppu.scanline_clock_time(self.next_scanline) <= time
        {
            if self.rendering {
                self.clock_counter();
            }
            self.next_scanline += 1;
        }
    }
    fn end_frame(&mut self, bus: &mut MapperBus, length: NesTime) {
        self.run_until(bus, length);
        self.next_scanline = 0;
        self.rendering = bus.ppu.rendering_enabled();
    }
    fn a12_clocked(&mut self) {
        if self.is_mmc3() {
            self.clock_counter();
        }
    }
    fn state(&self) -> Vec<u8> {
        let mut out = vec![self.bank_select];
        out.extend_from_slice(&self.banks);
        out.push(self.mirror);
        out.push(self.ram_protect);
        out.push(self.irq_latch);
        out.push(self.irq_counter);
        let mut flags = 0u8;
        if self.irq_enabled {
            flags |= 0x01;
        }
        if self.irq_reload {
            flags |= 0x02;
        }
        if self.irq_flag {
            flags |= 0x04;
        }
        out.push(flags);
        out.push(0);
        out
    }
    fn load_state(&mut self, data: &[u8]) {
        if data.len() < 14 {
            return;
        }
        self.bank_select = data[0];
        self.banks.copy_from_slice(&data[1..9]);
        self.mirror = data[9];
        self.ram_protect = data[10];
        self.irq_latch = data[11];
        self.irq_counter = data[12];
        let flags = data[13];
        self.irq_enabled = flags & 0x01 != 0;
        self.irq_reload = flags & 0x02 != 0;
        self.irq_flag = flags & 0x04 != 0;
        self.next_scanline = 0;
    }
}
