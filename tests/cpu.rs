mod common;

use assert_hex::assert_eq_hex;
use common::{nes_with_program, run_frames};

// Arithmetic, logic and flag behaviour, observed through RAM after a frame
#[test]
fn test_alu_and_flags() {
    let mut nes = nes_with_program(&[
        0xA9, 0x38, // LDA #$38
        0x18, // CLC
        0x69, 0x12, // ADC #$12
        0x85, 0x00, // STA $00
        0xA9, 0xFF, // LDA #$FF
        0x29, 0x0F, // AND #$0F
        0x85, 0x01, // STA $01
        0xA2, 0x05, // LDX #$05
        0xE8, // INX
        0x86, 0x02, // STX $02
        0xA9, 0x80, // LDA #$80
        0x0A, // ASL A
        0x85, 0x03, // STA $03
        0x08, // PHP
        0x68, // PLA
        0x85, 0x04, // STA $04
        0x4C, 0x1B, 0x80, // JMP self
    ]);
    run_frames(&mut nes, 1);
    assert_eq_hex!(nes.low_mem()[0x00], 0x4A);
    assert_eq_hex!(nes.low_mem()[0x01], 0x0F);
    assert_eq_hex!(nes.low_mem()[0x02], 0x06);
    assert_eq_hex!(nes.low_mem()[0x03], 0x00);
    // C and Z from the shift, I from reset, plus the pushed B and R bits
    assert_eq_hex!(nes.low_mem()[0x04], 0x37);
}

#[test]
fn test_signed_overflow() {
    let mut nes = nes_with_program(&[
        0xA9, 0x50, // LDA #$50
        0x18, // CLC
        0x69, 0x50, // ADC #$50 -> $A0, V set
        0x85, 0x00, // STA $00
        0x08, 0x68, 0x85, 0x01, // PHP / PLA / STA $01
        0x38, // SEC
        0xA9, 0x00, // LDA #$00
        0xE9, 0x01, // SBC #$01 -> $FF, C clear
        0x85, 0x02, // STA $02
        0x4C, 0x12, 0x80, // JMP self
    ]);
    run_frames(&mut nes, 1);
    assert_eq_hex!(nes.low_mem()[0x00], 0xA0);
    assert_eq!(nes.low_mem()[0x01] & 0x40, 0x40, "V should be set");
    assert_eq!(nes.low_mem()[0x01] & 0x80, 0x80, "N should be set");
    assert_eq_hex!(nes.low_mem()[0x02], 0xFF);
}

#[test]
fn test_indexing_and_indirection() {
    let mut nes = nes_with_program(&[
        0xA9, 0x12, // LDA #$12
        0x8D, 0x00, 0x02, // STA $0200
        0xA2, 0x01, // LDX #$01
        0x9D, 0xFF, 0x02, // STA $02FF,X -> $0300
        0xA9, 0x00, // LDA #$00
        0x85, 0x10, // STA $10 (pointer low)
        0xA9, 0x03, // LDA #$03
        0x85, 0x11, // STA $11 (pointer high -> $0300)
        0xA0, 0x04, // LDY #$04
        0xA9, 0x34, // LDA #$34
        0x91, 0x10, // STA ($10),Y -> $0304
        0x4C, 0x18, 0x80, // JMP self
    ]);
    run_frames(&mut nes, 1);
    assert_eq_hex!(nes.peek(0x0200), 0x12);
    assert_eq_hex!(nes.peek(0x0300), 0x12);
    assert_eq_hex!(nes.peek(0x0304), 0x34);
}

#[test]
fn test_jsr_rts() {
    let mut nes = nes_with_program(&[
        0x20, 0x0B, 0x80, // JSR $800B
        0xA9, 0x01, // LDA #$01
        0x85, 0x30, // STA $30
        0x4C, 0x07, 0x80, // JMP self
        0xEA, // pad
        0xA9, 0x42, // $800B: LDA #$42
        0x85, 0x31, // STA $31
        0x60, // RTS
    ]);
    run_frames(&mut nes, 1);
    assert_eq_hex!(nes.low_mem()[0x30], 0x01);
    assert_eq_hex!(nes.low_mem()[0x31], 0x42);
}

#[test]
fn test_branch_loop() {
    let mut nes = nes_with_program(&[
        0xA2, 0x00, // LDX #$00
        0xE8, // INX
        0xE0, 0x05, // CPX #$05
        0xD0, 0xFB, // BNE -5
        0x86, 0x40, // STX $40
        0x4C, 0x09, 0x80, // JMP self
    ]);
    run_frames(&mut nes, 1);
    assert_eq_hex!(nes.low_mem()[0x40], 0x05);
}

// An undocumented opcode stops the interpreter, bumps the error counter
// exactly once per frame, and leaves the registers inspectable
#[test]
fn test_illegal_opcode_halts() {
    let mut nes = nes_with_program(&[0xD2; 0x100]);
    assert_eq!(nes.error_count(), 0);
    run_frames(&mut nes, 1);
    assert_eq!(nes.error_count(), 1);
    assert_eq_hex!(nes.cpu.r.pc, 0x8000);
    assert_eq_hex!(nes.cpu.r.sp, 0xFD);
    run_frames(&mut nes, 1);
    assert_eq!(nes.error_count(), 2);
}

// BRK vectors through $FFFE with B set; RTI returns past the padding byte
#[test]
fn test_brk_rti() {
    let mut nes = nes_with_program(&[
        0xA9, 0x07, // LDA #$07
        0x85, 0x00, // STA $00
        0x00, // BRK (vector is an RTI stub)
        0xEA, // padding byte skipped by the pushed return address
        0xE6, 0x00, // INC $00
        0x4C, 0x08, 0x80, // JMP self
    ]);
    run_frames(&mut nes, 1);
    assert_eq_hex!(nes.low_mem()[0x00], 0x08);
}
