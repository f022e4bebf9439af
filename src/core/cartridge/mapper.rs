use log::*;

use crate::core::nes::MemMap;
use crate::core::{Addr, Cart, Cpu, MemSource, NesTime, Ppu, NO_IRQ};

/// Bank size exponents: `1 << BANK_8K` bytes and so on.
pub const BANK_1K: u32 = 10;
pub const BANK_2K: u32 = 11;
pub const BANK_4K: u32 = 12;
pub const BANK_8K: u32 = 13;
pub const BANK_16K: u32 = 14;
pub const BANK_32K: u32 = 15;

/// Negative bank indices count back from the last bank.
pub const LAST_BANK: i32 = -1;

/// Everything a mapper may touch outside its own registers: the code map,
/// the PPU's CHR and nametable banking, the SRAM window, and the scheduler
/// notification flags.
pub struct MapperBus<'a> {
    pub cpu: &'a mut Cpu,
    pub ppu: &'a mut Ppu,
    pub cart: &'a Cart,
    pub(crate) map: &'a mut MemMap,
    /// Current CPU time, for render flushes.
    pub clock: NesTime,
    pub(crate) notify_irq: bool,
    pub(crate) notify_event: bool,
}

impl<'a> MapperBus<'a> {
    /// Map a PRG bank at `addr`. Negative indices count from the end and
    /// out-of-range indices wrap around the bank count.
    pub fn set_prg_bank(&mut self, addr: Addr, bank_bits: u32, bank: i32) {
        let bank_count = ((self.cart.prg_size() >> bank_bits) as i32).max(1);
        let mut bank = bank;
        if bank < 0 {
            bank += bank_count;
        }
        let bank = bank.rem_euclid(bank_count) as usize;
        self.cpu
            .map_code(addr, 1 << bank_bits, MemSource::Prg, bank << bank_bits);
        if (0x6000..0x8000).contains(&addr) {
            self.enable_prg_6000();
        }
    }

    /// Map a CHR bank. Forces pending scanlines out first so pixels already
    /// rasterised keep the old mapping.
    pub fn set_chr_bank(&mut self, addr: Addr, bank_bits: u32, bank: i32) {
        self.ppu.render_until(self.clock, self.cart);
        let bank = bank.max(0) as usize;
        self.ppu.set_chr_bank(addr, 1 << bank_bits, bank << bank_bits);
    }

    /// The MMC2/MMC4 alternate bank set, selected while the tile latch is
    /// raised.
    pub fn set_chr_bank_ex(&mut self, addr: Addr, bank_bits: u32, bank: i32) {
        self.ppu.render_until(self.clock, self.cart);
        let bank = bank.max(0) as usize;
        self.ppu.set_chr_bank_ex(addr, 1 << bank_bits, bank << bank_bits);
    }

    pub fn mirror_manual(&mut self, p0: usize, p1: usize, p2: usize, p3: usize) {
        self.ppu.render_bg_until(self.clock, self.cart);
        self.ppu.set_nt_banks(p0, p1, p2, p3);
    }
    pub fn mirror_horiz(&mut self, p: usize) {
        self.mirror_manual(p, p, p ^ 1, p ^ 1);
    }
    pub fn mirror_vert(&mut self, p: usize) {
        self.mirror_manual(p, p ^ 1, p, p ^ 1);
    }
    pub fn mirror_single(&mut self, p: usize) {
        self.mirror_manual(p, p, p, p);
    }
    pub fn mirror_full(&mut self) {
        self.mirror_manual(0, 1, 2, 3);
    }

    /// Enable the 8 KiB of RAM at $6000-$7FFF.
    pub fn enable_sram(&mut self, enabled: bool, read_only: bool) {
        self.map.sram_writable = 0;
        if enabled {
            if !self.map.sram_present {
                self.map.sram_present = true;
                self.map.sram.fill(0xFF);
            }
            self.map.sram_readable = 0x8000;
            if !read_only {
                self.map.sram_writable = 0x8000;
            }
            self.cpu.map_code(0x6000, 0x2000, MemSource::Sram, 0);
        } else {
            self.map.sram_readable = 0;
            self.cpu.map_code(0x6000, 0x2000, MemSource::Unmapped, 0);
        }
    }

    /// Expose PRG ROM (not RAM) at $6000-$7FFF.
    pub fn enable_prg_6000(&mut self) {
        self.map.sram_writable = 0;
        self.map.sram_readable = 0;
        self.map.lrom_readable = 0x8000;
    }

    /// Route CPU writes in the range through the mapper. The range may be
    /// rounded out to page boundaries.
    pub fn intercept_writes(&mut self, addr: Addr, size: usize) {
        self.map.add_intercept(addr, size, false, true);
    }
    /// Route CPU reads in the range through the mapper. Instruction fetches
    /// and low RAM are never intercepted.
    pub fn intercept_reads(&mut self, addr: Addr, size: usize) {
        self.map.add_intercept(addr, size, true, false);
    }

    /// Whether the PPU is currently rendering (background enabled).
    pub fn ppu_enabled(&self) -> bool {
        self.ppu.w2001 & 0x08 != 0
    }

    /// Must be called when `next_irq` moved earlier than the current
    /// scheduler deadline.
    pub fn irq_changed(&mut self) {
        self.notify_irq = true;
    }
    pub fn event_changed(&mut self) {
        self.notify_event = true;
    }
}

/// One cartridge board family.
///
/// State registered through [Mapper::state] is saved verbatim into the MAPR
/// snapshot block; a load zeroes the state, copies the payload back and then
/// calls [Mapper::apply_mapping], which must rebuild the code map and CHR
/// banks from registers alone.
pub trait Mapper {
    fn mapper_code(&self) -> u32;

    /// Reset registers to their power-up values. The shared reset behaviour
    /// (mirroring, first/last PRG banks, CHR bank 0, write intercepts) is
    /// applied by the core before this runs.
    fn reset_state(&mut self) {}

    /// Console reset button, for boards that watch it.
    fn soft_reset(&mut self) {}

    /// Rebuild the code map and CHR bank table from the current register
    /// state. Must be idempotent.
    fn apply_mapping(&mut self, bus: &mut MapperBus);

    /// Intercepted read; `None` falls through to the normal bus dispatch.
    fn read(&mut self, _bus: &mut MapperBus, _time: NesTime, _addr: Addr) -> Option<u8> {
        None
    }

    /// Write to $8000-$FFFF.
    fn write(&mut self, bus: &mut MapperBus, time: NesTime, addr: Addr, data: u8);

    /// Intercepted write below $8000; `false` falls through.
    fn write_intercepted(
        &mut self,
        _bus: &mut MapperBus,
        _time: NesTime,
        _addr: Addr,
        _data: u8,
    ) -> bool {
        false
    }

    /// Time the next IRQ fires, or [NO_IRQ].
    fn next_irq(&self, _present: NesTime) -> NesTime {
        NO_IRQ
    }

    /// Catch internal counters up to `time`.
    fn run_until(&mut self, _bus: &mut MapperBus, _time: NesTime) {}

    /// A video frame of `length` CPU cycles ended; rebase internal times.
    fn end_frame(&mut self, _bus: &mut MapperBus, _length: NesTime) {}

    /// Bit 12 of the PPU address rose during a $2006/$2007 access.
    fn a12_clocked(&mut self) {}

    /// The register block stored in the MAPR snapshot payload.
    fn state(&self) -> Vec<u8> {
        Vec::new()
    }
    fn load_state(&mut self, _data: &[u8]) {}
}

/// Shared power-up mapping: mirroring from the cart, first 8 KiB CHR, first
/// and last 16 KiB PRG, writes to the upper half intercepted, registers
/// zeroed.
pub(crate) fn default_reset(mapper: &mut dyn Mapper, bus: &mut MapperBus) {
    let mirroring = bus.cart.mirroring();
    if mirroring & 8 != 0 {
        bus.mirror_full();
    } else if mirroring & 1 != 0 {
        bus.mirror_vert(0);
    } else {
        bus.mirror_horiz(0);
    }
    bus.set_chr_bank(0, BANK_8K, 0);
    bus.set_prg_bank(0x8000, BANK_16K, 0);
    bus.set_prg_bank(0xC000, BANK_16K, LAST_BANK);
    bus.intercept_writes(0x8000, 0x8000);
    mapper.reset_state();
}

/// Build the mapper for an iNES mapper number.
pub fn make_mapper(code: u32) -> Result<Box<dyn Mapper>, String> {
    use super::mappers::*;
    debug!("Creating mapper {}", code);
    let mapper: Box<dyn Mapper> = match code {
        0 => Box::new(NRom::default()),
        1 => Box::new(SxRom::default()),
        2 | 94 | 180 => Box::new(UxRom::new(code)),
        3 => Box::new(CnRom::default()),
        4 | 88 | 154 | 206 => Box::new(TxRom::new(code)),
        5 => Box::new(ExRom::default()),
        7 => Box::new(AxRom::default()),
        9 | 10 => Box::new(PxRom::new(code)),
        11 => Box::new(ColorDreams::default()),
        15 => Box::new(K1029::default()),
        19 => Box::new(Namco163::default()),
        21 | 22 | 23 | 25 => Box::new(Vrc24::new(code)),
        24 | 26 => Box::new(Vrc6::new(code)),
        30 => Box::new(Unrom512::default()),
        32 => Box::new(G101::default()),
        33 => Box::new(Tc0190::default()),
        34 => Box::new(BnRom::default()),
        60 => Box::new(ResetFourIn1::default()),
        66 => Box::new(GxRom::new(code)),
        69 => Box::new(Fme7::default()),
        70 | 152 => Box::new(Bandai74161::new(code)),
        71 | 232 => Box::new(Camerica::new(code)),
        73 => Box::new(Vrc3::default()),
        75 => Box::new(Vrc1::default()),
        78 => Box::new(Jaleco78::default()),
        79 | 113 => Box::new(Nina03::new(code)),
        85 => Box::new(Vrc7::default()),
        86 => Box::new(JalecoJf13::default()),
        87 => Box::new(Jaleco87::default()),
        89 | 93 => Box::new(Sunsoft2::new(code)),
        97 => Box::new(TamS1::default()),
        140 => Box::new(GxRom::new(code)),
        156 => Box::new(Daou306::default()),
        184 => Box::new(Sunsoft1::default()),
        190 => Box::new(MagicKid::default()),
        193 => Box::new(Ntdec112::default()),
        207 => Box::new(TaitoX1005::default()),
        240 => Box::new(Mapper240::default()),
        241 => Box::new(Mapper241::default()),
        244 => Box::new(Mapper244::default()),
        246 => Box::new(Mapper246::default()),
        _ => return Err(format!("Unsupported mapper: {}", code)),
    };
    Ok(mapper)
}
