use crate::core::apu::Vrc6Audio;
use crate::core::cartridge::{Mapper, MapperBus, BANK_16K, BANK_1K, BANK_8K, LAST_BANK};
use crate::core::{Addr, NesTime};

use super::vrc::VrcIrq;

/// VRC6 (mappers 24 and 26): banking, the VRC IRQ unit, and the expansion
/// pulse/saw channels. Mapper 26 swaps the two register address lines.
pub struct Vrc6 {
    code: u32,
    prg16: u8,
    prg8: u8,
    chr: [u8; 8],
    ctrl: u8,
    irq: VrcIrq,
    audio: Vrc6Audio,
}

impl Vrc6 {
    pub fn new(code: u32) -> Vrc6 {
        Vrc6 {
            code,
            prg16: 0,
            prg8: 0,
            chr: [0; 8],
            ctrl: 0,
            irq: VrcIrq::default(),
            audio: Vrc6Audio::default(),
        }
    }
    fn sub(&self, addr: Addr) -> Addr {
        if self.code == 26 {
            ((addr & 1) << 1) | ((addr >> 1) & 1)
        } else {
            addr & 3
        }
    }
}

impl Mapper for Vrc6 {
    fn mapper_code(&self) -> u32 {
        self.code
    }
    fn reset_state(&mut self) {
        self.prg16 = 0;
        self.prg8 = 0;
        self.chr = [0; 8];
        self.ctrl = 0;
        self.irq = VrcIrq::default();
        self.audio.reset();
    }
    fn apply_mapping(&mut self, bus: &mut MapperBus) {
        bus.set_prg_bank(0x8000, BANK_16K, (self.prg16 & 0x0F) as i32);
        bus.set_prg_bank(0xC000, BANK_8K, (self.prg8 & 0x1F) as i32);
        bus.set_prg_bank(0xE000, BANK_8K, LAST_BANK);
        for i in 0..8 {
            bus.set_chr_bank(i as Addr * 0x400, BANK_1K, self.chr[i] as i32);
        }
        match (self.ctrl >> 2) & 3 {
            0 => bus.mirror_vert(0),
            1 => bus.mirror_horiz(0),
            2 => bus.mirror_single(0),
            _ => bus.mirror_single(1),
        }
        bus.enable_sram(true, false);
    }
    fn write(&mut self, bus: &mut MapperBus, time: NesTime, addr: Addr, data: u8) {
        let sub = self.sub(addr);
        match addr & 0xF000 {
            0x8000 => self.prg16 = data,
            0x9000 | 0xA000 if sub < 3 => {
                let osc = if addr & 0xF000 == 0x9000 { 0 } else { 1 };
                self.audio.write_osc(time, osc, sub as usize, data);
                return;
            }
            0xB000 => {
                if sub == 3 {
                    self.ctrl = data;
                } else {
                    self.audio.write_osc(time, 2, sub as usize, data);
                    return;
                }
            }
            0xC000 => self.prg8 = data,
            0xD000 => self.chr[sub as usize] = data,
            0xE000 => self.chr[4 + sub as usize] = data,
            0xF000 => {
                match sub {
                    0 => self.irq.write_latch(data),
                    1 => self.irq.write_control(time, data),
                    _ => self.irq.write_ack(time),
                }
                bus.irq_changed();
                return;
            }
            _ => return,
        }
        self.apply_mapping(bus);
    }
    fn next_irq(&self, present: NesTime) -> NesTime {
        self.irq.next_irq(present)
    }
    fn run_until(&mut self, _bus: &mut MapperBus, time: NesTime) {
        self.irq.run_until(time);
        self.audio.run_until(time);
    }
    fn end_frame(&mut self, _bus: &mut MapperBus, length: NesTime) {
        self.irq.end_frame(length);
        self.audio.end_frame(length);
    }
    fn state(&self) -> Vec<u8> {
        let mut out = vec![self.prg16, self.prg8, self.ctrl, 0];
        out.extend_from_slice(&self.chr);
        self.irq.save(&mut out);
        self.audio.save_state(&mut out);
        out
    }
    fn load_state(&mut self, data: &[u8]) {
        if data.len() < 16 + Vrc6Audio::STATE_SIZE {
            return;
        }
        self.prg16 = data[0];
        self.prg8 = data[1];
        self.ctrl = data[2];
        self.chr.copy_from_slice(&data[4..12]);
        self.irq.load(&data[12..16]);
        self.audio.load_state(&data[16..]);
    }
}
