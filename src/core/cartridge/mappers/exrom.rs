use log::*;

use crate::core::cartridge::{Mapper, MapperBus, BANK_16K, BANK_1K, BANK_2K, BANK_32K, BANK_4K, BANK_8K};
use crate::core::{Addr, NesTime, NO_IRQ};

/// MMC5 / ExROM (mapper 5).
///
/// Covers the register set games actually lean on: PRG/CHR mode switching,
/// nametable mapping with ExRAM, fill mode, the multiplier, and the scanline
/// IRQ. The 8x16-sprite split of the CHR register sets and vertical split
/// mode are approximated with the A register set.
pub struct ExRom {
    prg_mode: u8,
    chr_mode: u8,
    prg_banks: [u8; 5],
    chr_banks: [u8; 12],
    chr_upper: u8,
    nt_mapping: u8,
    fill_tile: u8,
    fill_attr: u8,
    exram_mode: u8,
    mul: [u8; 2],
    irq_line: u8,
    irq_enabled: bool,
    irq_pending: bool,
    exram: [u8; 0x400],
    // Scanline schedule
    next_scanline: i32,
    burst_phase: i32,
    rendering: bool,
}

impl Default for ExRom {
    fn default() -> Self {
        ExRom {
            prg_mode: 3,
            chr_mode: 0,
            prg_banks: [0, 0, 0, 0, 0xFF],
            chr_banks: [0; 12],
            chr_upper: 0,
            nt_mapping: 0,
            fill_tile: 0,
            fill_attr: 0,
            exram_mode: 0,
            mul: [0xFF, 0xFF],
            irq_line: 0,
            irq_enabled: false,
            irq_pending: false,
            exram: [0; 0x400],
            next_scanline: 0,
            burst_phase: 0,
            rendering: false,
        }
    }
}

impl ExRom {
    fn line_time(&self, scanline: i32) -> NesTime {
        (scanline * 341 + 260 - self.burst_phase + 2).div_euclid(3)
    }
}

impl Mapper for ExRom {
    fn mapper_code(&self) -> u32 {
        5
    }
    fn reset_state(&mut self) {
        let exram = self.exram;
        *self = ExRom::default();
        // ExRAM contents survive a register reset
        self.exram = exram;
    }
    fn apply_mapping(&mut self, bus: &mut MapperBus) {
        bus.intercept_writes(0x5000, 0x1000);
        bus.intercept_reads(0x5000, 0x1000);
        bus.enable_sram(true, false);

        let p = &self.prg_banks;
        match self.prg_mode & 3 {
            0 => bus.set_prg_bank(0x8000, BANK_32K, ((p[4] & 0x7F) >> 2) as i32),
            1 => {
                bus.set_prg_bank(0x8000, BANK_16K, ((p[2] & 0x7F) >> 1) as i32);
                bus.set_prg_bank(0xC000, BANK_16K, ((p[4] & 0x7F) >> 1) as i32);
            }
            2 => {
                bus.set_prg_bank(0x8000, BANK_16K, ((p[2] & 0x7F) >> 1) as i32);
                bus.set_prg_bank(0xC000, BANK_8K, (p[3] & 0x7F) as i32);
                bus.set_prg_bank(0xE000, BANK_8K, (p[4] & 0x7F) as i32);
            }
            _ => {
                bus.set_prg_bank(0x8000, BANK_8K, (p[1] & 0x7F) as i32);
                bus.set_prg_bank(0xA000, BANK_8K, (p[2] & 0x7F) as i32);
                bus.set_prg_bank(0xC000, BANK_8K, (p[3] & 0x7F) as i32);
                bus.set_prg_bank(0xE000, BANK_8K, (p[4] & 0x7F) as i32);
            }
        }

        let hi = (self.chr_upper as i32 & 3) << 8;
        let c = &self.chr_banks;
        match self.chr_mode & 3 {
            0 => bus.set_chr_bank(0, BANK_8K, hi >> 3 | c[7] as i32),
            1 => {
                bus.set_chr_bank(0x0000, BANK_4K, hi >> 2 | c[3] as i32);
                bus.set_chr_bank(0x1000, BANK_4K, hi >> 2 | c[7] as i32);
            }
            2 => {
                for i in 0..4 {
                    bus.set_chr_bank(i as Addr * 0x800, BANK_2K, hi >> 1 | c[i * 2 + 1] as i32);
                }
            }
            _ => {
                for i in 0..8 {
                    bus.set_chr_bank(i as Addr * 0x400, BANK_1K, hi | c[i] as i32);
                }
            }
        }

        // Quadrant sources: 0/1 CIRAM, 2 ExRAM, 3 fill mode. ExRAM and fill
        // land in the upper VRAM banks.
        let nt = self.nt_mapping;
        let pick = |q: u8| -> usize {
            match (nt >> (q * 2)) & 3 {
                0 => 0,
                1 => 1,
                2 => 2,
                _ => 3,
            }
        };
        bus.mirror_manual(pick(0), pick(1), pick(2), pick(3));
    }
    fn read(&mut self, _bus: &mut MapperBus, _time: NesTime, addr: Addr) -> Option<u8> {
        match addr {
            0x5204 => {
                let v = (self.irq_pending as u8) << 7 | (self.rendering as u8) << 6;
                self.irq_pending = false;
                Some(v)
            }
            0x5205 => Some((self.mul[0] as u16 * self.mul[1] as u16) as u8),
            0x5206 => Some(((self.mul[0] as u16 * self.mul[1] as u16) >> 8) as u8),
            0x5C00..=0x5FFF => Some(self.exram[(addr & 0x3FF) as usize]),
            _ => None,
        }
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
            0x5100 => self.prg_mode = data,
            0x5101 => self.chr_mode = data,
            0x5102 | 0x5103 => {} // PRG RAM protect
            0x5104 => self.exram_mode = data,
            0x5105 => self.nt_mapping = data,
            0x5106 => self.fill_tile = data,
            0x5107 => self.fill_attr = data,
            0x5113..=0x5117 => self.prg_banks[(addr - 0x5113) as usize] = data,
            0x5120..=0x512B => self.chr_banks[(addr - 0x5120) as usize] = data,
            0x5130 => self.chr_upper = data,
            0x5203 => self.irq_line = data,
            0x5204 => {
                self.irq_enabled = data & 0x80 != 0;
                bus.irq_changed();
            }
            0x5205 => self.mul[0] = data,
            0x5206 => self.mul[1] = data,
            0x5C00..=0x5FFF => self.exram[(addr & 0x3FF) as usize] = data,
            _ => {
                debug!("Unhandled MMC5 write {:04X} <- {:02X}", addr, data);
                return false;
            }
        }
        match addr {
            0x5203..=0x5206 | 0x5C00..=0x5FFF => {}
            _ => self.apply_mapping(bus),
        }
        true
    }
    fn next_irq(&self, present: NesTime) -> NesTime {
        if self.irq_pending && self.irq_enabled {
            return present;
        }
        if !self.irq_enabled || !self.rendering || self.irq_line == 0 || self.irq_line as i32 > 239
        {
            return NO_IRQ;
        }
        let line = self.irq_line as i32;
        if line < self.next_scanline {
            return NO_IRQ;
        }
        self.line_time(line).max(present)
    }
    fn run_until(&mut self, bus: &mut MapperBus, time: NesTime) {
        self.burst_phase = bus.ppu.burst_phase as i32;
        self.rendering = bus.ppu.rendering_enabled();
        while self.next_scanline <= 239 && bus.ppu.scanline_clock_time(self.next_scanline) <= time
        {
            if self.rendering && self.next_scanline == self.irq_line as i32 {
                self.irq_pending = true;
            }
            self.next_scanline += 1;
        }
    }
    fn end_frame(&mut self, bus: &mut MapperBus, length: NesTime) {
        self.run_until(bus, length);
        self.next_scanline = 0;
        self.burst_phase = bus.ppu.burst_phase as i32;
    }
    fn state(&self) -> Vec<u8> {
        let mut out = vec![
            self.prg_mode,
            self.chr_mode,
            self.chr_upper,
            self.nt_mapping,
            self.fill_tile,
            self.fill_attr,
            self.exram_mode,
            self.irq_line,
            (self.irq_enabled as u8) | ((self.irq_pending as u8) << 1),
            self.mul[0],
            self.mul[1],
            0,
        ];
        out.extend_from_slice(&self.prg_banks);
        out.extend_from_slice(&self.chr_banks);
        out.extend_from_slice(&self.exram);
        out
    }
    fn load_state(&mut self, data: &[u8]) {
        if data.len() < 12 + 5 + 12 + 0x400 {
            return;
        }
        self.prg_mode = data[0];
        self.chr_mode = data[1];
        self.chr_upper = data[2];
        self.nt_mapping = data[3];
        self.fill_tile = data[4];
        self.fill_attr = data[5];
        self.exram_mode = data[6];
        self.irq_line = data[7];
        self.irq_enabled = data[8] & 1 != 0;
        self.irq_pending = data[8] & 2 != 0;
        self.mul = [data[9], data[10]];
        self.prg_banks.copy_from_slice(&data[12..17]);
        self.chr_banks.copy_from_slice(&data[17..29]);
        self.exram.copy_from_slice(&data[29..29 + 0x400]);
        self.next_scanline = 0;
    }
}
