use log::*;

use crate::core::cartridge::mapper::{default_reset, MapperBus};
use crate::core::cpu::{code_fetch, ST_I, ST_R};
use crate::core::ppu::{FX_A12_RISE, FX_NMI_CHANGED};
use crate::core::{
    make_mapper, Addr, Apu, Cart, ControllerKind, Cpu, CpuResult, CycleKind, InputParser, Mapper,
    NesTime, Ppu, IRQ_VECTOR, NMI_VECTOR, PAGE_BITS, PAGE_COUNT, PAGE_SIZE, RESET_VECTOR,
};

/// The bus windows and intercept bitmaps, plus the SRAM they guard.
pub(crate) struct MemMap {
    pub sram: Box<[u8; 0x2000]>,
    pub sram_present: bool,
    /// Exclusive upper bound of SRAM-readable addresses, or 0.
    pub sram_readable: Addr,
    pub sram_writable: Addr,
    /// Exclusive upper bound of the low-ROM window at $6000, or 0.
    pub lrom_readable: Addr,
    pub read_intercept: [bool; PAGE_COUNT + 1],
    pub write_intercept: [bool; PAGE_COUNT + 1],
}

impl MemMap {
    fn new() -> MemMap {
        MemMap {
            sram: Box::new([0xFF; 0x2000]),
            sram_present: false,
            sram_readable: 0,
            sram_writable: 0,
            lrom_readable: 0,
            read_intercept: [false; PAGE_COUNT + 1],
            write_intercept: [false; PAGE_COUNT + 1],
        }
    }

    pub(crate) fn add_intercept(&mut self, addr: Addr, size: usize, read: bool, write: bool) {
        let end = (addr as usize + size + PAGE_SIZE - 1) >> PAGE_BITS;
        for page in (addr as usize >> PAGE_BITS)..end.min(PAGE_COUNT + 1) {
            if read {
                self.read_intercept[page] = true;
            }
            if write {
                self.write_intercept[page] = true;
            }
        }
    }
}

/// Joypad shift registers and strobe.
#[derive(Clone, Copy, Default)]
pub(crate) struct JoypadState {
    pub latches: [u32; 2],
    pub w4016: u8,
}

/// The NES.
///
/// Owns the CPU, PPU, APU, the inserted cartridge and its mapper, and keeps
/// them in lock-step against one CPU clock. One call to
/// [Nes::emulate_frame] (or [Nes::advance] with a wire-format input token)
/// produces exactly one video frame, deterministically.
pub struct Nes {
    /// CPU of the NES.
    pub cpu: Cpu,
    /// PPU of the NES.
    pub ppu: Ppu,
    /// APU of the NES.
    pub apu: Apu,
    pub(crate) cart: Cart,
    pub(crate) mapper: Box<dyn Mapper>,
    pub(crate) map: MemMap,
    pub(crate) joypad: JoypadState,
    pub(crate) current_joypad: [u32; 2],
    /// CPU-clock residue carried between frames.
    pub(crate) timestamp: NesTime,
    pub(crate) frame_count: u32,
    /// Current absolute CPU time; 0 outside of a frame.
    pub(crate) clock: NesTime,
    cpu_time_offset: NesTime,
    /// Absolute time after which a `$2002` read must go through the slow
    /// path.
    ppu_2002_time: NesTime,
    input: InputParser,
    pub(crate) disabled_blocks: Vec<String>,
}

impl Default for Nes {
    fn default() -> Self {
        Self::new()
    }
}

impl Nes {
    /// A NES with a blank NROM cartridge inserted. The reset vector points
    /// at zeroed ROM, so this is only useful for poking at the machine.
    /// ```
    /// let mut nes = renes::core::Nes::new();
    /// nes.cpu.low_mem[0x10] = 0x55;
    /// assert_eq!(nes.peek(0x0810), 0x55);
    /// ```
    pub fn new() -> Nes {
        let mut image = b"NES\x1A".to_vec();
        image.extend_from_slice(&[1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        image.resize(16 + 0x4000 + 0x2000, 0);
        Nes::with_cartridge(Cart::from_ines(&image).expect("blank image is valid"))
            .expect("NROM is supported")
    }

    /// Power the console on with `cart` inserted.
    ///
    /// Fails when the cartridge needs a mapper outside the supported set.
    /// ```rust,ignore
    /// let cart = Cart::from_ines(include_bytes!("game.nes"))?;
    /// let mut nes = Nes::with_cartridge(cart)?;
    /// ```
    pub fn with_cartridge(cart: Cart) -> Result<Nes, String> {
        let mapper = make_mapper(cart.mapper_code())?;
        let mut nes = Nes {
            cpu: Cpu::new(),
            ppu: Ppu::new(),
            apu: Apu::new(),
            cart,
            mapper,
            map: MemMap::new(),
            joypad: JoypadState::default(),
            current_joypad: [0; 2],
            timestamp: 0,
            frame_count: 0,
            clock: 0,
            cpu_time_offset: 0,
            ppu_2002_time: 0,
            input: InputParser::default(),
            disabled_blocks: Vec::new(),
        };
        nes.ppu.open_chr(&nes.cart);
        nes.reset(true, true);
        info!("Powered on, PC = {:#06X}", nes.cpu.r.pc);
        Ok(nes)
    }

    /// Reset the console.
    ///
    /// A full reset is power-off/power-on: low RAM returns to its power-up
    /// pattern, joypad latches and the frame counter clear, and battery RAM
    /// is erased when `erase_battery_ram` is set (or the cart has none). A
    /// partial reset is the console's reset button: memory survives, the
    /// CPU restarts from the reset vector.
    pub fn reset(&mut self, full_reset: bool, erase_battery_ram: bool) {
        if full_reset {
            self.cpu.reset();
            self.cpu_time_offset = -1;
            self.clock = 0;

            self.cpu.low_mem = [0xFF; 0x800];
            self.cpu.low_mem[8] = 0xF7;
            self.cpu.low_mem[9] = 0xEF;
            self.cpu.low_mem[10] = 0xDF;
            self.cpu.low_mem[15] = 0xBF;

            self.map.lrom_readable = 0;
            self.map.sram_present = true;
            self.map.read_intercept = [false; PAGE_COUNT + 1];
            self.map.write_intercept = [false; PAGE_COUNT + 1];
            self.with_mapper(|_, bus| bus.enable_sram(false, false));
            if !self.cart.has_battery_ram() || erase_battery_ram {
                self.map.sram.fill(0xFF);
            }

            self.joypad = JoypadState::default();
            self.frame_count = 0;
        }

        self.ppu.reset(full_reset);
        self.apu.reset();

        self.with_mapper(|m, bus| {
            if !full_reset {
                m.soft_reset();
            }
            default_reset(m, bus);
            m.apply_mapping(bus);
        });

        self.cpu.r.pc = self.read_vector(RESET_VECTOR);
        self.cpu.r.sp = 0xFD;
        self.cpu.r.a = 0;
        self.cpu.r.x = 0;
        self.cpu.r.y = 0;
        self.cpu.r.status = ST_I;
        self.cpu.error_count = 0;
        self.timestamp = 0;
    }

    // ---- accessors ----

    pub fn cart(&self) -> &Cart {
        &self.cart
    }
    pub(crate) fn mem_map(&self) -> &MemMap {
        &self.map
    }
    /// The 2 KiB of internal RAM.
    pub fn low_mem(&self) -> &[u8] {
        &self.cpu.low_mem
    }
    /// The 8 KiB SRAM window at $6000-$7FFF.
    pub fn high_mem(&self) -> &[u8] {
        &self.map.sram[..]
    }
    /// The 4 KiB of nametable RAM.
    pub fn nametable_mem(&self) -> &[u8] {
        &self.ppu.nt_ram
    }
    /// Pattern-table memory: CHR RAM when the cart has it, CHR ROM
    /// otherwise.
    pub fn chr_mem(&self) -> &[u8] {
        if self.ppu.chr_is_writable {
            &self.ppu.chr_ram
        } else {
            self.cart.chr()
        }
    }
    /// Whether battery-backed RAM is live.
    pub fn sram_present(&self) -> bool {
        self.map.sram_present
    }
    /// The last rendered frame, one NES colour byte per pixel.
    pub fn framebuffer(&self) -> &[u8] {
        self.ppu.framebuffer()
    }
    /// Frames emulated since power-up.
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }
    /// Undocumented-opcode halts since power-up or the last state load.
    pub fn error_count(&self) -> u32 {
        self.cpu.error_count
    }
    /// Read a byte without side effects, through the code map.
    pub fn peek(&self, addr: Addr) -> u8 {
        self.code_byte(addr & 0xFFFF)
    }

    /// Configure how an input token's controller field is decoded for a
    /// port, 0 or 1.
    pub fn set_controller_kind(&mut self, port: usize, kind: ControllerKind) {
        self.input.set_kind(port, kind);
    }
    pub fn controller_kind(&self, port: usize) -> ControllerKind {
        self.input.kind(port)
    }

    /// Parse one wire-format input token and run one frame.
    ///
    /// A reset flag in the token presses the reset button before the frame;
    /// the power flag is rejected.
    pub fn advance(&mut self, token: &str) -> Result<NesTime, String> {
        let input = self.input.parse(token)?;
        if input.power {
            return Err(format!("Power button pressed, but not supported: '{}'", token));
        }
        if input.reset {
            self.reset(false, false);
        }
        Ok(self.emulate_frame(input.port1, input.port2))
    }

    /// The three replay-loop shapes, provided so a harness can keep its
    /// loop declarative: `Simple` advances, `Rerecord` restores then
    /// advances, `Full` advances, restores and advances again.
    pub fn run_cycle(&mut self, kind: CycleKind, token: &str, state: &mut Vec<u8>) -> Result<(), String> {
        match kind {
            CycleKind::Simple => {
                self.advance(token)?;
            }
            CycleKind::Rerecord => {
                self.deserialize(state)?;
                self.advance(token)?;
                *state = self.serialize();
            }
            CycleKind::Full => {
                self.advance(token)?;
                self.deserialize(state)?;
                self.advance(token)?;
                *state = self.serialize();
            }
        }
        Ok(())
    }

    // ---- mapper plumbing ----

    pub(crate) fn with_mapper<R>(
        &mut self,
        f: impl FnOnce(&mut dyn Mapper, &mut MapperBus) -> R,
    ) -> R {
        let Nes {
            mapper,
            cpu,
            ppu,
            cart,
            map,
            clock,
            ..
        } = self;
        let mut bus = MapperBus {
            cpu,
            ppu,
            cart,
            map,
            clock: *clock,
            notify_irq: false,
            notify_event: false,
        };
        let r = f(mapper.as_mut(), &mut bus);
        let (irq, event) = (bus.notify_irq, bus.notify_event);
        if irq {
            self.irq_changed();
        }
        if event {
            self.event_changed();
        }
        r
    }

    pub(crate) fn irq_changed(&mut self) {
        let t = self.earliest_irq(self.cpu_time());
        self.cpu_set_irq_time(t);
    }

    pub(crate) fn event_changed(&mut self) {
        let present = self.cpu_time();
        let t = self.earliest_event(present);
        self.cpu_set_end_time(t);
    }

    // ---- timing ----

    fn cpu_time(&self) -> NesTime {
        self.clock + 1
    }
    fn cpu_set_irq_time(&mut self, t: NesTime) {
        self.cpu.set_irq_time(t - 1 - self.cpu_time_offset);
    }
    fn cpu_set_end_time(&mut self, t: NesTime) {
        self.cpu.set_end_time(t - 1 - self.cpu_time_offset);
    }
    pub(crate) fn cpu_adjust_time(&mut self, n: NesTime) {
        self.cpu_time_offset += n;
        self.cpu.reduce_limit(n);
    }

    fn earliest_irq(&self, present: NesTime) -> NesTime {
        self.apu
            .earliest_irq(present)
            .min(self.mapper.next_irq(present))
    }

    fn ppu_frame_length(&mut self, present: NesTime) -> NesTime {
        let t = self.ppu.frame_length();
        if t > present {
            return t;
        }
        let clock = self.clock;
        let Nes { ppu, cart, .. } = self;
        ppu.render_bg_until(clock, cart);
        ppu.frame_length()
    }

    fn earliest_event(&mut self, present: NesTime) -> NesTime {
        let mut t = self.ppu_frame_length(present);
        t = t.min(self.apu.next_dmc_read_time() + 1);
        t = t.min(self.ppu.nmi_time());
        t
    }

    /// Advance the APU (and collect DMC wait states) up to absolute time
    /// `t`.
    fn run_apu_to(&mut self, t: NesTime) {
        let wait = {
            let Nes {
                apu, cpu, cart, map, ..
            } = self;
            let mut fetch = |a: u16| code_fetch(cpu, cart, map, a as Addr);
            apu.run_until(t, &mut fetch)
        };
        if wait > 0 {
            self.cpu_adjust_time(wait as NesTime);
        }
    }

    fn vector_interrupt(&mut self, vector: Addr) {
        let pc = self.cpu.r.pc & 0xFFFF;
        self.cpu.push_byte((pc >> 8) as u8);
        self.cpu.push_byte(pc as u8);
        let p = self.cpu.r.status | ST_R;
        self.cpu.push_byte(p);
        self.cpu_adjust_time(7);
        self.cpu.r.status |= ST_I;
        self.cpu.update_clock_limit();
        self.cpu.r.pc = self.read_vector(vector);
    }

    // ---- the frame scheduler ----

    /// Emulate one video frame with the given controller port values.
    /// Returns the frame's length in CPU cycles.
    pub fn emulate_frame(&mut self, joypad1: u32, joypad2: u32) -> NesTime {
        self.current_joypad = [joypad1, joypad2];

        // The burst phase is a function of the frame counter so a restored
        // snapshot sees the same frame lengths as a straight run
        self.ppu.burst_phase = (self.frame_count % 3) as u8;
        self.cpu_time_offset = self.ppu.begin_frame(self.timestamp) - 1;
        self.ppu_2002_time = 0;
        self.clock = self.cpu_time_offset;

        self.emulate_frame_loop();

        // Flush the APU through the frame tail in two passes: DMC fetches in
        // the first pass insert wait states, so the clock is resynced and
        // the flush repeated before the final length is read
        let t0 = self.cpu_time();
        self.run_apu_to(t0);
        self.clock = self.cpu_time_offset;
        let t1 = self.cpu_time();
        self.run_apu_to(t1);
        self.clock = self.cpu_time_offset;

        let ppu_frame_length = self.ppu.frame_length();
        let length = self.cpu_time();
        self.timestamp = {
            let Nes { ppu, cart, .. } = self;
            ppu.end_frame(length, cart)
        };
        self.with_mapper(|m, bus| m.end_frame(bus, length));
        self.apu.end_frame(ppu_frame_length);

        self.clock = 0;
        self.frame_count += 1;
        ppu_frame_length
    }

    fn emulate_frame_loop(&mut self) {
        let mut last_result = CpuResult::Cycles;
        let mut extra_instructions = 0;
        loop {
            // Accumulate DMC wait states before reading the clock
            let t = self.cpu_time();
            self.run_apu_to(t);
            self.clock = self.cpu_time_offset;

            let present = self.cpu_time();
            if present >= self.ppu_frame_length(present) {
                self.ppu.poll_vbl(present);
                if self.ppu.nmi_time() <= present {
                    // If the NMI would fire normally next frame ($2000.7 and
                    // $2002.7 both set) let it; otherwise vector it now and
                    // carry its seven cycles into the frame length
                    if self.ppu.w2000 & 0x80 & self.ppu.r2002 == 0 {
                        self.vector_interrupt(NMI_VECTOR);
                        self.clock = self.cpu_time_offset;
                    }
                    return;
                }
                if extra_instructions > 2 {
                    return;
                }
                if last_result != CpuResult::Cli
                    && last_result != CpuResult::Sei
                    && (self.ppu.nmi_time() >= 0x10000
                        || self.ppu.w2000 & 0x80 & self.ppu.r2002 != 0)
                {
                    return;
                }
                // A delayed SEI/CLI needs one more instruction to settle
                extra_instructions += 1;
            }

            // NMI
            if present >= self.ppu.nmi_time() {
                self.ppu.acknowledge_nmi();
                self.vector_interrupt(NMI_VECTOR);
                last_result = CpuResult::Cycles;
            }

            // IRQ
            let present = self.cpu_time();
            let irq_time = self.earliest_irq(present);
            self.cpu_set_irq_time(irq_time);
            if present >= irq_time
                && (self.cpu.r.status & ST_I == 0 || last_result == CpuResult::Sei)
            {
                if last_result != CpuResult::Cli {
                    self.with_mapper(|m, bus| m.run_until(bus, present));
                    self.vector_interrupt(IRQ_VECTOR);
                } else {
                    // CLI delays the IRQ one instruction
                    self.cpu_set_irq_time(present + 1);
                }
            }

            // CPU
            let present = self.cpu_time();
            let mut end_time = self.earliest_event(present);
            if extra_instructions > 0 {
                end_time = present + 1;
            }
            last_result = self.run_cpu(end_time - self.cpu_time_offset - 1);
            let ran = self.cpu.clock_count;
            self.cpu.clock_count = 0;
            self.cpu_adjust_time(ran);
            self.clock = self.cpu_time_offset;

            if last_result == CpuResult::BadOp {
                warn!(
                    "Undocumented opcode {:#04X} at {:#06X}, ending frame",
                    self.code_byte(self.cpu.r.pc),
                    self.cpu.r.pc
                );
                return;
            }
        }
    }

    // ---- bus dispatch ----

    pub(crate) fn cpu_read(&mut self, addr: Addr, time: NesTime) -> u8 {
        if addr & 0xE000 == 0 {
            return self.cpu.low_mem[(addr & 0x7FF) as usize];
        }
        if addr > 0x7FFF {
            return self.code_byte(addr);
        }

        let time = time + self.cpu_time_offset;
        if addr < 0x4000 {
            if addr & 7 == 2 {
                // $2002 is polled hundreds of times a frame; serve it from
                // the cached value while nothing can have changed
                self.ppu.second_write = false;
                if time >= self.ppu_2002_time {
                    let v = {
                        let Nes { ppu, cart, .. } = self;
                        ppu.read_2002(time, cart)
                    };
                    self.ppu_2002_time = self.ppu.next_2002_change;
                    return v;
                }
                return self.ppu.r2002;
            }
            let (v, fx) = {
                let Nes { ppu, cart, .. } = self;
                ppu.read(addr, time, cart)
            };
            if fx & FX_A12_RISE != 0 {
                self.mapper.a12_clocked();
            }
            return v;
        }

        self.clock = time;
        if self.map.read_intercept[(addr >> PAGE_BITS) as usize] {
            if let Some(v) = self.with_mapper(|m, bus| m.read(bus, time, addr)) {
                return v;
            }
        }
        if addr < 0x6000 {
            return self.read_io(addr);
        }
        if addr < self.map.sram_readable {
            return self.map.sram[(addr & 0x1FFF) as usize];
        }
        if addr < self.map.lrom_readable {
            return self.code_byte(addr);
        }
        (addr >> 8) as u8 // open bus
    }

    pub(crate) fn cpu_write(&mut self, addr: Addr, data: u8, time: NesTime) {
        if addr & 0xE000 == 0 {
            self.cpu.low_mem[(addr & 0x7FF) as usize] = data;
            return;
        }

        let time = time + self.cpu_time_offset;
        if addr < 0x4000 {
            if addr & 7 == 7 {
                if self.ppu.write_2007(data) & 0x1000 != 0 {
                    self.mapper.a12_clocked();
                }
            } else {
                let fx = {
                    let Nes { ppu, cart, .. } = self;
                    ppu.write(time, addr, data, cart)
                };
                if fx & FX_A12_RISE != 0 {
                    self.mapper.a12_clocked();
                }
                if fx & FX_NMI_CHANGED != 0 {
                    self.event_changed();
                }
            }
            return;
        }

        self.clock = time;
        if self.map.write_intercept[(addr >> PAGE_BITS) as usize]
            && self.with_mapper(|m, bus| m.write_intercepted(bus, time, addr, data))
        {
            return;
        }
        if addr < 0x6000 {
            self.write_io(addr, data);
            return;
        }
        if addr < self.map.sram_writable {
            self.map.sram[(addr & 0x1FFF) as usize] = data;
            return;
        }
        if addr > 0x7FFF {
            let clock = self.clock;
            self.with_mapper(|m, bus| m.write(bus, clock, addr, data));
        }
    }

    fn read_io(&mut self, addr: Addr) -> u8 {
        if addr & 0xFFFE == 0x4016 {
            let i = (addr & 1) as usize;
            let result = self.joypad.latches[i];
            if self.joypad.w4016 & 1 == 0 {
                self.joypad.latches[i] = (result >> 1) | 0x8000_0000;
            }
            return (result & 1) as u8;
        }
        if addr == 0x4015 {
            let clock = self.clock;
            let (v, wait) = {
                let Nes {
                    apu, cpu, cart, map, ..
                } = self;
                let mut fetch = |a: u16| code_fetch(cpu, cart, map, a as Addr);
                apu.read_status(clock, &mut fetch)
            };
            if wait > 0 {
                self.cpu_adjust_time(wait as NesTime);
            }
            self.irq_changed();
            return v;
        }
        (addr >> 8) as u8 // open bus
    }

    fn write_io(&mut self, addr: Addr, data: u8) {
        // Sprite DMA: 256 bytes out of CPU space into OAM, 513 cycles
        if addr == 0x4014 {
            let base = (data as Addr) << 8;
            let mut buf = [0u8; 0x100];
            for (i, b) in buf.iter_mut().enumerate() {
                *b = self.code_byte(base + i as Addr);
            }
            let clock = self.clock;
            {
                let Nes { ppu, cart, .. } = self;
                ppu.dma_sprites(clock, cart, &buf);
            }
            self.cpu_adjust_time(513);
            return;
        }
        // Joypad strobe: the falling edge captures the ports
        if addr == 0x4016 {
            if self.joypad.w4016 & 1 != 0 && data & 1 == 0 {
                self.joypad.latches = self.current_joypad;
            }
            self.joypad.w4016 = data;
            return;
        }
        if (0x4000..=0x4017).contains(&addr) {
            let clock = self.clock;
            let wait = {
                let Nes {
                    apu, cpu, cart, map, ..
                } = self;
                let mut fetch = |a: u16| code_fetch(cpu, cart, map, a as Addr);
                apu.write_register(clock, addr, data, &mut fetch)
            };
            if wait > 0 {
                self.cpu_adjust_time(wait as NesTime);
            }
            // Starting or retiming the DMC moves the next fetch event
            if addr == 0x4010 || (addr == 0x4015 && data & 0x10 != 0) {
                let t = self.clock + 1;
                self.run_apu_to(t);
                self.event_changed();
            }
            if addr == 0x4017 {
                self.irq_changed();
            }
        }
    }
}
