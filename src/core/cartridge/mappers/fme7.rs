use crate::core::apu::Fme7Audio;
use crate::core::cartridge::{Mapper, MapperBus, BANK_1K, BANK_8K, LAST_BANK};
use crate::core::{Addr, NesTime, NO_IRQ};

/// Sunsoft FME-7 / 5B (mapper 69): command/parameter register file, a
/// CPU-clocked 16-bit IRQ down-counter, and the 5B sound channels.
pub struct Fme7 {
    command: u8,
    prg_banks: [u8; 4],
    chr_banks: [u8; 8],
    prg_6000: u8,
    mirror: u8,
    irq_enable: bool,
    irq_count_enable: bool,
    irq_flag: bool,
    irq_counter: u16,
    /// Time `irq_counter` was last observed.
    base_time: NesTime,
    audio: Fme7Audio,
}

impl Default for Fme7 {
    fn default() -> Self {
        Fme7 {
            command: 0,
            prg_banks: [0; 4],
            chr_banks: [0; 8],
            prg_6000: 0,
            mirror: 0,
            irq_enable: false,
            irq_count_enable: false,
            irq_flag: false,
            irq_counter: 0,
            base_time: 0,
            audio: Fme7Audio::default(),
        }
    }
}

impl Fme7 {
    fn count_to(&mut self, time: NesTime) {
        if self.irq_count_enable {
            let elapsed = (time - self.base_time).max(0) as u32;
            let old = self.irq_counter as u32;
            if elapsed > old && self.irq_enable {
                self.irq_flag = true;
            }
            self.irq_counter = old.wrapping_sub(elapsed) as u16;
        }
        self.base_time = time;
    }
}

impl Mapper for Fme7 {
    fn mapper_code(&self) -> u32 {
        69
    }
    fn reset_state(&mut self) {
        let base = self.base_time;
        *self = Fme7::default();
        self.base_time = base;
        self.audio.reset();
    }
    fn apply_mapping(&mut self, bus: &mut MapperBus) {
        // Command 8 maps $6000: bit 6 selects RAM, bit 7 enables it
        if self.prg_6000 & 0x40 != 0 {
            bus.enable_sram(self.prg_6000 & 0x80 != 0, false);
        } else {
            bus.set_prg_bank(0x6000, BANK_8K, (self.prg_6000 & 0x3F) as i32);
        }
        bus.set_prg_bank(0x8000, BANK_8K, (self.prg_banks[1] & 0x3F) as i32);
        bus.set_prg_bank(0xA000, BANK_8K, (self.prg_banks[2] & 0x3F) as i32);
        bus.set_prg_bank(0xC000, BANK_8K, (self.prg_banks[3] & 0x3F) as i32);
        bus.set_prg_bank(0xE000, BANK_8K, LAST_BANK);
        for i in 0..8 {
            bus.set_chr_bank(i as Addr * 0x400, BANK_1K, self.chr_banks[i] as i32);
        }
        match self.mirror & 3 {
            0 => bus.mirror_vert(0),
            1 => bus.mirror_horiz(0),
            2 => bus.mirror_single(0),
            _ => bus.mirror_single(1),
        }
    }
    fn write(&mut self, bus: &mut MapperBus, time: NesTime, addr: Addr, data: u8) {
        match addr & 0xE000 {
            0x8000 => self.command = data & 0x0F,
            0xA000 => {
                match self.command {
                    0..=7 => self.chr_banks[self.command as usize] = data,
                    8 => self.prg_6000 = data,
                    9..=0xB => self.prg_banks[(self.command - 8) as usize] = data,
                    0xC => self.mirror = data,
                    0xD => {
                        self.count_to(time);
                        self.irq_enable = data & 0x01 != 0;
                        self.irq_count_enable = data & 0x80 != 0;
                        self.irq_flag = false;
                        bus.irq_changed();
                    }
                    0xE => {
                        self.count_to(time);
                        self.irq_counter = (self.irq_counter & 0xFF00) | data as u16;
                        bus.irq_changed();
                    }
                    _ => {
                        self.count_to(time);
                        self.irq_counter = (self.irq_counter & 0x00FF) | ((data as u16) << 8);
                        bus.irq_changed();
                    }
                }
                self.apply_mapping(bus);
            }
            0xC000 => self.audio.write_latch(data),
            _ => self.audio.write_data(time, data),
        }
    }
    fn next_irq(&self, present: NesTime) -> NesTime {
        if self.irq_flag {
            return present;
        }
        if !self.irq_enable || !self.irq_count_enable {
            return NO_IRQ;
        }
        self.base_time + self.irq_counter as NesTime + 1
    }
    fn run_until(&mut self, _bus: &mut MapperBus, time: NesTime) {
        self.count_to(time);
        self.audio.run_until(time);
    }
    fn end_frame(&mut self, _bus: &mut MapperBus, length: NesTime) {
        self.count_to(length);
        self.base_time -= length;
        self.audio.end_frame(length);
    }
    fn state(&self) -> Vec<u8> {
        let mut out = vec![self.command, self.prg_6000, self.mirror];
        out.extend_from_slice(&self.prg_banks);
        out.extend_from_slice(&self.chr_banks);
        let mut flags = 0u8;
        if self.irq_enable {
            flags |= 0x01;
        }
        if self.irq_count_enable {
            flags |= 0x02;
        }
        if self.irq_flag {
            flags |= 0x04;
        }
        out.push(flags);
        out.extend_from_slice(&self.irq_counter.to_le_bytes());
        out.push(0);
        out.push(0);
        self.audio.save_state(&mut out);
        out
    }
    fn load_state(&mut self, data: &[u8]) {
        if data.len() < 20 + Fme7Audio::STATE_SIZE {
            return;
        }
        self.command = data[0];
        self.prg_6000 = data[1];
        self.mirror = data[2];
        self.prg_banks.copy_from_slice(&data[3..7]);
        self.chr_banks.copy_from_slice(&data[7..15]);
        let flags = data[15];
        self.irq_enable = flags & 0x01 != 0;
        self.irq_count_enable = flags & 0x02 != 0;
        self.irq_flag = flags & 0x04 != 0;
        self.irq_counter = u16::from_le_bytes([data[16], data[17]]);
        self.base_time = 0;
        self.audio.load_state(&data[20..]);
    }
}
