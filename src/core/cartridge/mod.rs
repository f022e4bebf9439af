pub(crate) mod mapper;
pub use mapper::{make_mapper, Mapper, MapperBus, BANK_16K, BANK_1K, BANK_2K, BANK_32K, BANK_4K, BANK_8K, LAST_BANK};
pub mod mappers;

use log::*;

/// An NES cartridge: the PRG and CHR data plus the identity of the board it
/// was soldered to.
///
/// The ROM contents are immutable once loaded. A cartridge with no CHR ROM
/// carries 8 KiB of CHR RAM instead, which lives in the [Ppu][crate::core::Ppu]
/// and is written through the mapper.
#[derive(Debug)]
pub struct Cart {
    prg: Vec<u8>,
    chr: Vec<u8>,
    // Combined iNES flag bytes 6 and 7, kept raw: mirroring, battery and
    // four-screen bits live in the low byte, the mapper high nibble in the
    // high byte.
    mapper: u32,
    submapper: u8,
}

impl Cart {
    /// Parse an iNES or NES 2.0 image.
    ///
    /// Returns a descriptive error when the image is malformed or needs
    /// hardware this emulator does not provide.
    /// ```
    /// use renes::core::Cart;
    /// let mut image = vec![b'N', b'E', b'S', 0x1A, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
    /// image.resize(16 + 0x4000 + 0x2000, 0);
    /// let cart = Cart::from_ines(&image).unwrap();
    /// assert_eq!(cart.mapper_code(), 0);
    /// ```
    pub fn from_ines(bytes: &[u8]) -> Result<Cart, String> {
        if bytes.len() < 16 {
            return Err("Not an iNES file".to_string());
        }
        if &bytes[0..4] != b"NES\x1A" {
            return Err("Not an iNES file".to_string());
        }
        let flags = bytes[6];
        let flags2 = bytes[7];
        let ex_mapper = bytes[8];
        let ex_rom = bytes[9];
        debug!("Cartridge header: {:X?}", &bytes[0..16]);

        // Only a plain NES image is emulated, no Vs. System or Playchoice
        if flags2 & 0x03 != 0 {
            return Err("Unsupported console type".to_string());
        }

        let is_nes2 = flags2 & 0x0C == 0x08;
        let mut flags = flags;
        if is_nes2 {
            // A non-zero submapper usually means default iNES behaviour is
            // wrong for this image. Submapper 48 on mapper 50/24 (Pac-Man
            // Championship Edition) is known to work regardless.
            if ex_mapper != 0 && !(flags == 50 && flags2 == 24 && ex_mapper == 48) {
                return Err("Unsupported mapper".to_string());
            }

            // PRG RAM is hardwired to 8 KiB here; NES 2.0 images asking for
            // more cannot be honoured
            let prg_ram = bytes[10];
            let mut prg_ram_size = 0u32;
            if prg_ram & 0x0F != 0 {
                prg_ram_size += 64 << (prg_ram & 0x0F);
            }
            if prg_ram & 0xF0 != 0 {
                prg_ram_size += 64 << (prg_ram >> 4);
            }
            if prg_ram_size > 0x2000 {
                return Err("Unsupported mapper".to_string());
            }
            // A declared PRG NVRAM implies a battery even if bit 1 is unset
            if prg_ram & 0xF0 != 0 {
                flags |= 0x02;
            }

            let chr_ram = bytes[11];
            let mut chr_ram_size = 0u32;
            if chr_ram & 0x0F != 0 {
                chr_ram_size += 64 << (chr_ram & 0x0F);
            }
            if chr_ram & 0xF0 != 0 {
                chr_ram_size += 64 << (chr_ram >> 4);
            }
            if chr_ram_size > 0x2000 {
                return Err("Unsupported mapper".to_string());
            }
            // CHR RAM alongside CHR ROM is outside plain iNES behaviour
            if chr_ram_size != 0 && (bytes[5] != 0 || ex_rom & 0xF0 != 0) {
                return Err("Unsupported mapper".to_string());
            }

            // Only NTSC timing is emulated
            if bytes[12] & 0x01 != 0 {
                return Err("Unsupported region".to_string());
            }
            if bytes[14] > 0 {
                return Err("Unsupported mapper".to_string());
            }
        }

        let (prg_count, chr_count) = if is_nes2 {
            // Exponent-multiplier ROM sizes can't be expressed in the bank map
            if ex_rom & 0x0F == 0x0F || ex_rom & 0xF0 == 0xF0 {
                return Err("Unsupported ROM size".to_string());
            }
            (
                (((ex_rom & 0x0F) as usize) << 8) | bytes[4] as usize,
                (((ex_rom & 0xF0) as usize) << 4) | bytes[5] as usize,
            )
        } else {
            (
                if bytes[4] == 0 { 256 } else { bytes[4] as usize },
                bytes[5] as usize,
            )
        };

        let prg_size = prg_count * 0x4000;
        let chr_size = chr_count * 0x2000;
        let mut start = 16;
        if flags & 0x04 != 0 {
            // 512 byte trainer, skipped
            start += 512;
        }
        if prg_size == 0 || start + prg_size + chr_size > bytes.len() {
            return Err("Malformed iNES file".to_string());
        }

        let prg = bytes[start..start + prg_size].to_vec();
        let chr = bytes[start + prg_size..start + prg_size + chr_size].to_vec();
        let cart = Cart {
            prg,
            chr,
            mapper: (flags2 as u32) * 0x100 + flags as u32,
            submapper: if is_nes2 { ex_mapper >> 4 } else { 0 },
        };
        info!(
            "Loaded cartridge: mapper {}, {:#X} bytes PRG, {:#X} bytes CHR{}{}",
            cart.mapper_code(),
            cart.prg_size(),
            cart.chr_size(),
            if cart.has_battery_ram() { ", battery" } else { "" },
            if cart.chr_is_ram() { ", CHR RAM" } else { "" },
        );
        Ok(cart)
    }

    /// The mapper number, combining the low and high nibbles of the two iNES
    /// flag bytes.
    pub fn mapper_code(&self) -> u32 {
        ((self.mapper >> 8) & 0xF0) | ((self.mapper >> 4) & 0x0F)
    }
    /// The NES 2.0 submapper number, 0 for plain iNES images.
    pub fn submapper(&self) -> u8 {
        self.submapper
    }
    /// Whether the cartridge declares battery-backed RAM at $6000-$7FFF.
    pub fn has_battery_ram(&self) -> bool {
        self.mapper & 0x02 != 0
    }
    /// Initial mirroring nibble: bit 0 is vertical, bit 3 four-screen.
    pub fn mirroring(&self) -> u32 {
        self.mapper & 0x09
    }
    /// Program ROM.
    pub fn prg(&self) -> &[u8] {
        &self.prg
    }
    /// Character ROM. Empty when the cartridge uses CHR RAM.
    pub fn chr(&self) -> &[u8] {
        &self.chr
    }
    pub fn prg_size(&self) -> usize {
        self.prg.len()
    }
    pub fn chr_size(&self) -> usize {
        self.chr.len()
    }
    /// Whether the pattern tables are writable (no CHR ROM on the board).
    pub fn chr_is_ram(&self) -> bool {
        self.chr.is_empty()
    }
}
