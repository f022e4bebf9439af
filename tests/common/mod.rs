#![allow(dead_code)]

use std::sync::Once;

use renes::core::{Cart, Nes};

static LOG: Once = Once::new();

/// Install a logger once so failing movies can be debugged with RUST_LOG.
pub fn init_logging() {
    LOG.call_once(|| {
        let _ = simplelog::SimpleLogger::init(
            simplelog::LevelFilter::Warn,
            simplelog::Config::default(),
        );
    });
}

/// Build an iNES image in memory.
pub fn ines_image(mapper: u32, prg: &[u8], chr: &[u8], battery: bool) -> Vec<u8> {
    assert_eq!(prg.len() % 0x4000, 0);
    assert_eq!(chr.len() % 0x2000, 0);
    let mut image = vec![
        b'N',
        b'E',
        b'S',
        0x1A,
        (prg.len() / 0x4000) as u8,
        (chr.len() / 0x2000) as u8,
        ((mapper as u8) << 4) | if battery { 0x02 } else { 0x00 },
        (mapper as u8) & 0xF0,
        0,
        0,
        0,
        0,
        0,
        0,
        0,
        0,
    ];
    image.extend_from_slice(prg);
    image.extend_from_slice(chr);
    image
}

/// A 16 KiB PRG bank with `code` at its start and the reset vector pointing
/// at $8000. The NMI and IRQ vectors point at an RTI.
pub fn prg_bank_with_code(code: &[u8]) -> Vec<u8> {
    let mut prg = vec![0xEA; 0x4000];
    prg[..code.len()].copy_from_slice(code);
    // RTI stub for stray interrupts
    prg[0x3FF0] = 0x40;
    prg[0x3FFA] = 0xF0; // NMI -> $FFF0
    prg[0x3FFB] = 0xFF;
    prg[0x3FFC] = 0x00; // reset -> $8000
    prg[0x3FFD] = 0x80;
    prg[0x3FFE] = 0xF0; // IRQ/BRK -> $FFF0
    prg[0x3FFF] = 0xFF;
    prg
}

/// An NROM console running `code` from $8000.
pub fn nes_with_program(code: &[u8]) -> Nes {
    init_logging();
    let image = ines_image(0, &prg_bank_with_code(code), &[0; 0x2000], false);
    Nes::with_cartridge(Cart::from_ines(&image).unwrap()).unwrap()
}

/// Advance a number of frames with no buttons held.
pub fn run_frames(nes: &mut Nes, frames: u32) {
    for _ in 0..frames {
        nes.emulate_frame(!0xFF, 0);
    }
}
