mod common;

use assert_hex::assert_eq_hex;
use common::{nes_with_program, run_frames};

// Writing the mirrored palette entries lands in the base entries
#[test]
fn test_palette_mirroring() {
    let mut nes = nes_with_program(&[
        0xA9, 0x3F, // LDA #$3F
        0x8D, 0x06, 0x20, // STA $2006
        0xA9, 0x10, // LDA #$10
        0x8D, 0x06, 0x20, // STA $2006 (address $3F10)
        0xA9, 0x2A, // LDA #$2A
        0x8D, 0x07, 0x20, // STA $2007
        0xA9, 0x3F, // LDA #$3F
        0x8D, 0x06, 0x20, // STA $2006
        0xA9, 0x00, // LDA #$00
        0x8D, 0x06, 0x20, // STA $2006 (address $3F00)
        0xAD, 0x07, 0x20, // LDA $2007 (palette reads skip the buffer)
        0x85, 0x50, // STA $50
        0x4C, 0x1E, 0x80, // JMP self
    ]);
    run_frames(&mut nes, 1);
    assert_eq_hex!(nes.low_mem()[0x50], 0x2A);
    assert_eq_hex!(nes.ppu.palette[0x00], 0x2A);
    // The alias itself reads back through entry 0
    assert_eq_hex!(nes.ppu.palette[0x10], 0x00);
}

#[test]
fn test_vram_write_read_buffered() {
    let mut nes = nes_with_program(&[
        0xA9, 0x21, // LDA #$21
        0x8D, 0x06, 0x20, // STA $2006
        0xA9, 0x08, // LDA #$08
        0x8D, 0x06, 0x20, // STA $2006 (address $2108)
        0xA9, 0x77, // LDA #$77
        0x8D, 0x07, 0x20, // STA $2007
        // Read it back: reset address, prime the buffer, then read
        0xA9, 0x21, 0x8D, 0x06, 0x20, //
        0xA9, 0x08, 0x8D, 0x06, 0x20, //
        0xAD, 0x07, 0x20, // LDA $2007 (stale buffer)
        0xAD, 0x07, 0x20, // LDA $2007 (the byte)
        0x85, 0x51, // STA $51
        0x4C, 0x21, 0x80, // JMP self
    ]);
    run_frames(&mut nes, 1);
    assert_eq_hex!(nes.low_mem()[0x51], 0x77);
}

// Polling $2002 sees the VBlank flag rise once per frame
#[test]
fn test_vblank_flag_polling() {
    let mut nes = nes_with_program(&[
        0xAD, 0x02, 0x20, // LDA $2002
        0x10, 0xFB, // BPL back (wait for bit 7)
        0xE6, 0x60, // INC $60
        0xAD, 0x02, 0x20, // LDA $2002 (flag now clear)
        0x10, 0xFB, // BPL back: spin until next frame
        0xE6, 0x60, // INC $60
        0x4C, 0x0E, 0x80, // JMP self
    ]);
    run_frames(&mut nes, 1);
    assert_eq!(nes.low_mem()[0x60], 1);
    run_frames(&mut nes, 1);
    assert_eq!(nes.low_mem()[0x60], 2);
}

// Enabling the NMI delivers it every frame
#[test]
fn test_nmi_counts_frames() {
    common::init_logging();
    let mut code = vec![
        0xA9, 0x80, // LDA #$80
        0x8D, 0x00, 0x20, // STA $2000 (NMI on)
        0x4C, 0x05, 0x80, // JMP self
    ];
    // NMI handler at $8030: INC $70, RTI
    code.resize(0x30, 0xEA);
    code.extend_from_slice(&[0xE6, 0x70, 0x40]);
    let mut prg = common::prg_bank_with_code(&code);
    prg[0x3FFA] = 0x30;
    prg[0x3FFB] = 0x80;
    let image = common::ines_image(0, &prg, &[0; 0x2000], false);
    let mut nes =
        renes::core::Nes::with_cartridge(renes::core::Cart::from_ines(&image).unwrap()).unwrap();
    run_frames(&mut nes, 5);
    assert_eq!(nes.low_mem()[0x70], 5);
}

// The low-RAM mirrors all resolve to the same 2 KiB
#[test]
fn test_low_ram_mirroring() {
    let mut nes = nes_with_program(&[
        0xA9, 0x99, // LDA #$99
        0x8D, 0x23, 0x08, // STA $0823
        0x4C, 0x05, 0x80, // JMP self
    ]);
    run_frames(&mut nes, 1);
    assert_eq_hex!(nes.low_mem()[0x23], 0x99);
    assert_eq_hex!(nes.peek(0x0023), 0x99);
    assert_eq_hex!(nes.peek(0x1823), 0x99);
}

// OAM DMA copies a page into sprite RAM and costs its wait states
#[test]
fn test_sprite_dma() {
    let mut nes = nes_with_program(&[
        0xA9, 0x5A, // LDA #$5A
        0x8D, 0x00, 0x03, // STA $0300
        0xA9, 0xC3, // LDA #$C3
        0x8D, 0xFF, 0x03, // STA $03FF
        0xA9, 0x00, // LDA #$00
        0x8D, 0x03, 0x20, // STA $2003 (OAM address 0)
        0xA9, 0x03, // LDA #$03
        0x8D, 0x14, 0x40, // STA $4014 (DMA from $0300)
        0x4C, 0x14, 0x80, // JMP self
    ]);
    run_frames(&mut nes, 1);
    assert_eq_hex!(nes.ppu.spr_ram[0x00], 0x5A);
    assert_eq_hex!(nes.ppu.spr_ram[0xFF], 0xC3);
}
