//! The audio processor: five built-in channels and the frame counter.
//!
//! Channels are advanced lazily with [Apu::run_until] and emit amplitude
//! deltas into a shared [Blip] buffer that is drained into a sample queue
//! once per frame. The timing side (frame IRQs, DMC fetch wait-states)
//! drives the scheduler; the sample output is a convenience for hosts that
//! want sound.
mod blip;
pub use blip::Blip;
mod pulse;
pub use pulse::Pulse;
mod triangle;
pub use triangle::Triangle;
mod noise;
pub use noise::Noise;
mod dmc;
pub use dmc::{Dmc, DMC_PERIOD_TABLE};
mod vrc6;
pub use vrc6::Vrc6Audio;
mod fme7;
pub use fme7::Fme7Audio;
mod namco163;
pub use namco163::Namco163Audio;

use std::collections::VecDeque;

use crate::core::{Addr, NesTime, NO_IRQ};

pub(crate) const LENGTH_TABLE: [u8; 32] = [
    10, 254, 20, 2, 40, 4, 80, 6, 160, 8, 60, 10, 14, 12, 26, 14, 12, 16, 24, 18, 48, 20, 96, 22,
    192, 24, 72, 26, 16, 28, 32, 30,
];

/// The shared envelope unit of the pulse and noise channels.
#[derive(Clone, Default)]
pub struct Envelope {
    pub period: u8,
    pub constant: bool,
    pub loop_flag: bool,
    pub start: bool,
    pub divider: u8,
    pub decay: u8,
}

impl Envelope {
    pub fn write(&mut self, data: u8) {
        self.period = data & 0x0F;
        self.constant = data & 0x10 != 0;
        self.loop_flag = data & 0x20 != 0;
    }
    pub fn volume(&self) -> u8 {
        if self.constant {
            self.period
        } else {
            self.decay
        }
    }
    pub fn clock(&mut self) {
        if self.start {
            self.start = false;
            self.decay = 15;
            self.divider = self.period;
        } else if self.divider == 0 {
            self.divider = self.period;
            if self.decay > 0 {
                self.decay -= 1;
            } else if self.loop_flag {
                self.decay = 15;
            }
        } else {
            self.divider -= 1;
        }
    }
}

#[derive(Clone, Default)]
pub struct LengthCounter {
    pub counter: u8,
    pub halt: bool,
}

impl LengthCounter {
    pub fn load(&mut self, index: u8) {
        self.counter = LENGTH_TABLE[(index & 0x1F) as usize];
    }
    pub fn muted(&self) -> bool {
        self.counter == 0
    }
    pub fn clock(&mut self) {
        if !self.halt && self.counter > 0 {
            self.counter -= 1;
        }
    }
}

// Cycles from each frame-counter step to the next, 4- and 5-step modes
const STEP4: [NesTime; 4] = [7457, 7456, 7458, 7458];
const STEP5: [NesTime; 5] = [7457, 7456, 7458, 7458, 7452];

#[derive(Clone, Default)]
struct FrameCounter {
    mode5: bool,
    irq_inhibit: bool,
    irq_flag: bool,
    /// Index of the next step to fire.
    step: u8,
    /// Cycles from the channel cursor until it fires.
    delay: NesTime,
}

/// The APU register file and mixer.
pub struct Apu {
    pub pulse: [Pulse; 2],
    pub triangle: Triangle,
    pub noise: Noise,
    pub dmc: Dmc,
    frame: FrameCounter,
    /// Absolute time the channels are caught up to.
    last_time: NesTime,
    blip: Blip,
    samples: VecDeque<f32>,
}

impl Default for Apu {
    fn default() -> Self {
        Self::new()
    }
}

impl Apu {
    pub fn new() -> Apu {
        let mut apu = Apu {
            pulse: [Pulse::default(), Pulse::default()],
            triangle: Triangle::default(),
            noise: Noise::default(),
            dmc: Dmc::default(),
            frame: FrameCounter::default(),
            last_time: 0,
            blip: Blip::new(),
            samples: VecDeque::new(),
        };
        apu.reset();
        apu
    }

    pub fn reset(&mut self) {
        self.pulse = [Pulse::default(), Pulse::default()];
        self.pulse[1].complement = true;
        self.triangle = Triangle::default();
        self.noise = Noise::default();
        self.dmc = Dmc::default();
        self.frame = FrameCounter {
            delay: STEP4[0],
            ..FrameCounter::default()
        };
        self.last_time = 0;
        self.blip.clear();
    }

    fn frame_step(&mut self) {
        let step = self.frame.step as usize;
        if self.frame.mode5 {
            // Steps 0,1,2,4 clock quarters; 1 and 4 clock halves
            if step != 3 {
                self.quarter_clock();
            }
            if step == 1 || step == 4 {
                self.half_clock();
            }
            self.frame.step = ((step + 1) % 5) as u8;
            self.frame.delay = STEP5[self.frame.step as usize];
        } else {
            self.quarter_clock();
            if step == 1 || step == 3 {
                self.half_clock();
            }
            if step == 3 && !self.frame.irq_inhibit {
                self.frame.irq_flag = true;
            }
            self.frame.step = ((step + 1) % 4) as u8;
            self.frame.delay = STEP4[self.frame.step as usize];
        }
    }

    fn quarter_clock(&mut self) {
        self.pulse[0].quarter_clock();
        self.pulse[1].quarter_clock();
        self.triangle.quarter_clock();
        self.noise.quarter_clock();
    }
    fn half_clock(&mut self) {
        self.pulse[0].half_clock();
        self.pulse[1].half_clock();
        self.triangle.half_clock();
        self.noise.half_clock();
    }

    /// Render all channels up to `time`. Returns the CPU wait-state cycles
    /// accumulated by DMC fetches.
    pub(crate) fn run_until(&mut self, time: NesTime, fetch: &mut dyn FnMut(u16) -> u8) -> u32 {
        let mut wait = 0;
        while self.last_time < time {
            let boundary = self.last_time + self.frame.delay;
            let target = time.min(boundary);
            let from = self.last_time;
            self.pulse[0].run(from, target, &mut self.blip);
            self.pulse[1].run(from, target, &mut self.blip);
            self.triangle.run(from, target, &mut self.blip);
            self.noise.run(from, target, &mut self.blip);
            self.dmc.run(from, target, &mut self.blip, fetch, &mut wait);
            self.frame.delay -= target - from;
            self.last_time = target;
            if self.frame.delay == 0 {
                self.frame_step();
            }
        }
        wait
    }

    /// Write a `$4000-$4017` register. Returns DMC wait-state cycles.
    pub(crate) fn write_register(
        &mut self,
        time: NesTime,
        addr: Addr,
        data: u8,
        fetch: &mut dyn FnMut(u16) -> u8,
    ) -> u32 {
        let mut wait = self.run_until(time, fetch);
        match addr {
            0x4000..=0x4003 => self.pulse[0].write_reg(addr & 3, data),
            0x4004..=0x4007 => self.pulse[1].write_reg(addr & 3, data),
            0x4008..=0x400B => self.triangle.write_reg(addr & 3, data),
            0x400C..=0x400F => self.noise.write_reg(addr & 3, data),
            0x4010..=0x4013 => self.dmc.write_reg(addr & 3, data),
            0x4015 => {
                self.pulse[0].set_enabled(data & 0x01 != 0);
                self.pulse[1].set_enabled(data & 0x02 != 0);
                self.triangle.set_enabled(data & 0x04 != 0);
                self.noise.set_enabled(data & 0x08 != 0);
                self.dmc.set_enabled(data & 0x10 != 0);
                if data & 0x10 != 0 {
                    self.dmc.fill_if_empty(fetch, &mut wait);
                }
            }
            0x4017 => {
                self.frame.mode5 = data & 0x80 != 0;
                self.frame.irq_inhibit = data & 0x40 != 0;
                if self.frame.irq_inhibit {
                    self.frame.irq_flag = false;
                }
                self.frame.step = 0;
                // Restart lands a few cycles after the write
                self.frame.delay = 3 + if self.frame.mode5 { STEP5[0] } else { STEP4[0] };
                if self.frame.mode5 {
                    self.quarter_clock();
                    self.half_clock();
                }
            }
            _ => {}
        }
        wait
    }

    /// Read `$4015`. Clears the frame IRQ flag.
    pub(crate) fn read_status(
        &mut self,
        time: NesTime,
        fetch: &mut dyn FnMut(u16) -> u8,
    ) -> (u8, u32) {
        let wait = self.run_until(time, fetch);
        let mut v = 0;
        if !self.pulse[0].length.muted() {
            v |= 0x01;
        }
        if !self.pulse[1].length.muted() {
            v |= 0x02;
        }
        if !self.triangle.length.muted() {
            v |= 0x04;
        }
        if !self.noise.length.muted() {
            v |= 0x08;
        }
        if self.dmc.bytes_remaining > 0 {
            v |= 0x10;
        }
        if self.frame.irq_flag {
            v |= 0x40;
        }
        if self.dmc.irq_flag {
            v |= 0x80;
        }
        self.frame.irq_flag = false;
        (v, wait)
    }

    /// Earliest frame or DMC IRQ, or far-future.
    pub fn earliest_irq(&self, present: NesTime) -> NesTime {
        if self.frame.irq_flag || self.dmc.irq_flag {
            return present;
        }
        let mut t = self.dmc.irq_time(self.last_time);
        if !self.frame.mode5 && !self.frame.irq_inhibit {
            let mut ft = self.last_time + self.frame.delay;
            let mut s = self.frame.step;
            // Walk forward to step 3, where the frame IRQ fires
            while s != 3 {
                s = (s + 1) % 4;
                ft += STEP4[s as usize];
            }
            t = t.min(ft);
        }
        t
    }

    /// When the DMC will next steal the bus for a sample fetch.
    pub fn next_dmc_read_time(&self) -> NesTime {
        if self.dmc.bytes_remaining == 0 {
            NO_IRQ
        } else {
            self.dmc.next_read_time(self.last_time)
        }
    }

    /// Commit the frame's audio and rebase the channel cursor by `length`
    /// cycles. A negative length shifts the cursor forward, used when a
    /// snapshot restores mid-stream.
    pub(crate) fn end_frame(&mut self, length: NesTime) {
        if length > 0 {
            self.blip.end_frame(length, &mut self.samples);
        }
        self.last_time -= length;
    }

    /// Drain the audio rendered so far, normalised to roughly -1..1.
    pub fn sample_queue(&mut self) -> Vec<f32> {
        self.samples.drain(..).collect()
    }

    // ---- snapshot payload ----

    pub(crate) const STATE_SIZE: usize = 80;

    pub(crate) fn save_state(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::STATE_SIZE);
        for p in &self.pulse {
            let mut flags = 0u8;
            if p.enabled {
                flags |= 0x01;
            }
            if p.length.halt {
                flags |= 0x02;
            }
            if p.envelope.constant {
                flags |= 0x04;
            }
            if p.sweep_enabled {
                flags |= 0x08;
            }
            if p.sweep_negate {
                flags |= 0x10;
            }
            if p.sweep_reload {
                flags |= 0x20;
            }
            if p.envelope.start {
                flags |= 0x40;
            }
            if p.envelope.loop_flag {
                flags |= 0x80;
            }
            out.push(p.duty);
            out.extend_from_slice(&p.period.to_le_bytes());
            out.push(flags);
            out.push(p.envelope.period);
            out.push(p.envelope.divider);
            out.push(p.envelope.decay);
            out.push(p.length.counter);
            out.push(p.sweep_period);
            out.push(p.sweep_shift);
            out.push(p.sweep_divider);
            out.extend_from_slice(&(p.delay as u16).to_le_bytes());
            out.push(p.seq);
            out.extend_from_slice(&[0, 0]);
        }
        let t = &self.triangle;
        let mut flags = 0u8;
        if t.enabled {
            flags |= 0x01;
        }
        if t.control {
            flags |= 0x02;
        }
        if t.linear_reload_flag {
            flags |= 0x04;
        }
        out.extend_from_slice(&t.period.to_le_bytes());
        out.extend_from_slice(&(t.delay as u16).to_le_bytes());
        out.push(t.seq);
        out.push(t.length.counter);
        out.push(t.linear_counter);
        out.push(t.linear_reload);
        out.push(flags);
        out.extend_from_slice(&[0, 0, 0]);
        let n = &self.noise;
        let mut flags = 0u8;
        if n.enabled {
            flags |= 0x01;
        }
        if n.short_mode {
            flags |= 0x02;
        }
        if n.length.halt {
            flags |= 0x04;
        }
        if n.envelope.constant {
            flags |= 0x08;
        }
        if n.envelope.start {
            flags |= 0x10;
        }
        if n.envelope.loop_flag {
            flags |= 0x20;
        }
        out.push(n.period_index);
        out.push(flags);
        out.extend_from_slice(&n.lfsr.to_le_bytes());
        out.extend_from_slice(&(n.delay as u16).to_le_bytes());
        out.push(n.envelope.period);
        out.push(n.envelope.divider);
        out.push(n.envelope.decay);
        out.push(n.length.counter);
        out.extend_from_slice(&[0, 0]);
        let d = &self.dmc;
        let mut flags = 0u8;
        if d.irq_enabled {
            flags |= 0x01;
        }
        if d.irq_flag {
            flags |= 0x02;
        }
        if d.loop_flag {
            flags |= 0x04;
        }
        if d.buffer_full {
            flags |= 0x08;
        }
        if d.silent {
            flags |= 0x10;
        }
        out.push(flags);
        out.push(d.period_index);
        out.push(d.addr_reg);
        out.push(d.len_reg);
        out.extend_from_slice(&d.current_addr.to_le_bytes());
        out.extend_from_slice(&d.bytes_remaining.to_le_bytes());
        out.push(d.buffer);
        out.push(d.shift);
        out.push(d.bits_remaining);
        out.push(d.output);
        out.extend_from_slice(&(d.delay as u16).to_le_bytes());
        out.extend_from_slice(&[0, 0]);
        let f = &self.frame;
        let mut flags = 0u8;
        if f.mode5 {
            flags |= 0x01;
        }
        if f.irq_inhibit {
            flags |= 0x02;
        }
        if f.irq_flag {
            flags |= 0x04;
        }
        out.push(flags);
        out.push(f.step);
        out.extend_from_slice(&(f.delay as u16).to_le_bytes());
        out.extend_from_slice(&[0, 0, 0, 0]);
        debug_assert_eq!(out.len(), Self::STATE_SIZE);
        out
    }

    pub(crate) fn load_state(&mut self, data: &[u8]) -> Result<(), String> {
        if data.len() != Self::STATE_SIZE {
            return Err(format!("Bad APUR block size: {}", data.len()));
        }
        let u16_at = |i: usize| u16::from_le_bytes([data[i], data[i + 1]]);
        for (pi, base) in [(0usize, 0usize), (1, 16)] {
            let p = &mut self.pulse[pi];
            p.duty = data[base] & 3;
            p.period = u16_at(base + 1) & 0x7FF;
            let flags = data[base + 3];
            p.enabled = flags & 0x01 != 0;
            p.length.halt = flags & 0x02 != 0;
            p.envelope.constant = flags & 0x04 != 0;
            p.sweep_enabled = flags & 0x08 != 0;
            p.sweep_negate = flags & 0x10 != 0;
            p.sweep_reload = flags & 0x20 != 0;
            p.envelope.start = flags & 0x40 != 0;
            p.envelope.loop_flag = flags & 0x80 != 0;
            p.envelope.period = data[base + 4] & 0x0F;
            p.envelope.divider = data[base + 5];
            p.envelope.decay = data[base + 6] & 0x0F;
            p.length.counter = data[base + 7];
            p.sweep_period = data[base + 8] & 0x07;
            p.sweep_shift = data[base + 9] & 0x07;
            p.sweep_divider = data[base + 10];
            p.delay = u16_at(base + 11) as NesTime;
            p.seq = data[base + 13] & 7;
            p.last_amp = 0;
            p.complement = pi == 1;
        }
        let t = &mut self.triangle;
        t.period = u16_at(32) & 0x7FF;
        t.delay = u16_at(34) as NesTime;
        t.seq = data[36] & 0x1F;
        t.length.counter = data[37];
        t.linear_counter = data[38] & 0x7F;
        t.linear_reload = data[39] & 0x7F;
        let flags = data[40];
        t.enabled = flags & 0x01 != 0;
        t.control = flags & 0x02 != 0;
        t.length.halt = t.control;
        t.linear_reload_flag = flags & 0x04 != 0;
        t.last_amp = 0;
        let n = &mut self.noise;
        n.period_index = data[44] & 0x0F;
        let flags = data[45];
        n.enabled = flags & 0x01 != 0;
        n.short_mode = flags & 0x02 != 0;
        n.length.halt = flags & 0x04 != 0;
        n.envelope.constant = flags & 0x08 != 0;
        n.envelope.start = flags & 0x10 != 0;
        n.envelope.loop_flag = flags & 0x20 != 0;
        n.lfsr = (u16_at(46) & 0x7FFF).max(1);
        n.delay = u16_at(48) as NesTime;
        n.envelope.period = data[50] & 0x0F;
        n.envelope.divider = data[51];
        n.envelope.decay = data[52] & 0x0F;
        n.length.counter = data[53];
        n.last_amp = 0;
        let d = &mut self.dmc;
        let flags = data[56];
        d.irq_enabled = flags & 0x01 != 0;
        d.irq_flag = flags & 0x02 != 0;
        d.loop_flag = flags & 0x04 != 0;
        d.buffer_full = flags & 0x08 != 0;
        d.silent = flags & 0x10 != 0;
        d.period_index = data[57] & 0x0F;
        d.addr_reg = data[58];
        d.len_reg = data[59];
        d.current_addr = u16_at(60);
        d.bytes_remaining = u16_at(62);
        d.buffer = data[64];
        d.shift = data[65];
        d.bits_remaining = data[66];
        d.output = data[67] & 0x7F;
        d.delay = u16_at(68) as NesTime;
        d.last_amp = 0;
        let flags = data[72];
        self.frame.mode5 = flags & 0x01 != 0;
        self.frame.irq_inhibit = flags & 0x02 != 0;
        self.frame.irq_flag = flags & 0x04 != 0;
        self.frame.step = data[73];
        self.frame.delay = (u16_at(74) as NesTime).max(1);
        self.last_time = 0;
        self.blip.clear();
        Ok(())
    }
}
