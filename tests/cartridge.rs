mod common;

use common::init_logging;
use renes::core::Cart;

fn header(bytes: [u8; 16], prg_banks: usize, chr_banks: usize) -> Vec<u8> {
    let mut image = bytes.to_vec();
    image.resize(16 + prg_banks * 0x4000 + chr_banks * 0x2000, 0);
    image
}

#[test]
fn test_rejects_bad_signature() {
    init_logging();
    assert!(Cart::from_ines(b"NOPE").is_err());
    let image = header([b'N', b'E', b'Z', 0x1A, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0], 1, 0);
    assert_eq!(Cart::from_ines(&image).unwrap_err(), "Not an iNES file");
}

#[test]
fn test_rejects_console_types() {
    // Vs. System and Playchoice bits in flag byte 7
    let image = header([b'N', b'E', b'S', 0x1A, 1, 0, 0, 0x01, 0, 0, 0, 0, 0, 0, 0, 0], 1, 0);
    assert_eq!(Cart::from_ines(&image).unwrap_err(), "Unsupported console type");
}

#[test]
fn test_rejects_large_prg_ram() {
    // NES 2.0 marker with a 16 KiB PRG RAM request
    let image = header(
        [b'N', b'E', b'S', 0x1A, 1, 0, 0, 0x08, 0, 0, 0x08, 0, 0, 0, 0, 0],
        1,
        0,
    );
    assert_eq!(Cart::from_ines(&image).unwrap_err(), "Unsupported mapper");
}

#[test]
fn test_rejects_exponent_rom_size() {
    let image = header(
        [b'N', b'E', b'S', 0x1A, 1, 0, 0, 0x08, 0, 0x0F, 0, 0, 0, 0, 0, 0],
        1,
        0,
    );
    assert_eq!(Cart::from_ines(&image).unwrap_err(), "Unsupported ROM size");
}

#[test]
fn test_rejects_pal_region() {
    let image = header(
        [b'N', b'E', b'S', 0x1A, 1, 0, 0, 0x08, 0, 0, 0, 0, 0x01, 0, 0, 0],
        1,
        0,
    );
    assert_eq!(Cart::from_ines(&image).unwrap_err(), "Unsupported region");
}

#[test]
fn test_rejects_misc_roms() {
    let image = header(
        [b'N', b'E', b'S', 0x1A, 1, 0, 0, 0x08, 0, 0, 0, 0, 0, 0, 1, 0],
        1,
        0,
    );
    assert_eq!(Cart::from_ines(&image).unwrap_err(), "Unsupported mapper");
}

#[test]
fn test_rejects_truncated_image() {
    let mut image = header([b'N', b'E', b'S', 0x1A, 2, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0], 2, 1);
    image.truncate(image.len() - 1);
    assert_eq!(Cart::from_ines(&image).unwrap_err(), "Malformed iNES file");
}

// NES 2.0 submappers are rejected, except the known-good Pac-Man CE image
#[test]
fn test_submapper_whitelist() {
    // Flag bytes 50/24 with submapper byte 48
    let ok = header(
        [b'N', b'E', b'S', 0x1A, 1, 1, 50, 24, 48, 0, 0, 0, 0, 0, 0, 0],
        1,
        1,
    );
    let cart = Cart::from_ines(&ok).unwrap();
    assert_eq!(cart.mapper_code(), 19);

    let bad = header(
        [b'N', b'E', b'S', 0x1A, 1, 1, 50, 24, 0x10, 0, 0, 0, 0, 0, 0, 0],
        1,
        1,
    );
    assert_eq!(Cart::from_ines(&bad).unwrap_err(), "Unsupported mapper");
}

// A 512-byte trainer is skipped when present
#[test]
fn test_trainer_is_skipped() {
    let mut image = vec![b'N', b'E', b'S', 0x1A, 1, 0, 0x04, 0, 0, 0, 0, 0, 0, 0, 0, 0];
    image.extend_from_slice(&[0xAA; 512]);
    let mut prg = vec![0u8; 0x4000];
    prg[0] = 0x5C;
    image.extend_from_slice(&prg);
    let cart = Cart::from_ines(&image).unwrap();
    assert_eq!(cart.prg()[0], 0x5C);
    assert!(cart.chr_is_ram());
}

#[test]
fn test_battery_and_mirroring_flags() {
    let image = header([b'N', b'E', b'S', 0x1A, 1, 1, 0x03, 0, 0, 0, 0, 0, 0, 0, 0, 0], 1, 1);
    let cart = Cart::from_ines(&image).unwrap();
    assert!(cart.has_battery_ram());
    assert_eq!(cart.mirroring() & 1, 1);
    assert!(!cart.chr_is_ram());
    assert_eq!(cart.prg_size(), 0x4000);
    assert_eq!(cart.chr_size(), 0x2000);
}
