mod common;

use assert_hex::assert_eq_hex;
use common::{ines_image, nes_with_program, prg_bank_with_code, run_frames};
use renes::core::{Cart, ControllerKind, CycleKind, Nes};

// A program whose RAM state changes continuously, for determinism checks
fn counter_nes() -> Nes {
    nes_with_program(&[
        0xE6, 0x00, // INC $00
        0xD0, 0xFC, // BNE -4
        0xE6, 0x01, // INC $01
        0x4C, 0x00, 0x80, // JMP $8000
    ])
}

#[test]
fn test_frame_length_bound() {
    let mut nes = counter_nes();
    for _ in 0..10 {
        let length = nes.emulate_frame(!0xFF, 0);
        assert!(
            (29780..=29781).contains(&length),
            "frame length {} out of bounds",
            length
        );
    }
    assert_eq!(nes.frame_count(), 10);
}

#[test]
fn test_determinism_across_runs() {
    let mut a = counter_nes();
    let mut b = counter_nes();
    run_frames(&mut a, 60);
    run_frames(&mut b, 60);
    assert_eq!(a.low_mem(), b.low_mem());
    assert_eq!(a.ppu.framebuffer(), b.ppu.framebuffer());
    assert_eq!(a.serialize(), b.serialize());
}

// Running zero inputs leaves low RAM identical to the snapshot taken at
// power-on
#[test]
fn test_empty_sequence() {
    let mut nes = counter_nes();
    let s0 = nes.serialize();
    let ram0 = nes.low_mem().to_vec();
    let mut other = counter_nes();
    other.deserialize(&s0).unwrap();
    assert_eq!(other.low_mem(), &ram0[..]);
}

// Snapshot mid-sequence, keep running, rewind, rerun: the tail must replay
// to the same state as the straight run
#[test]
fn test_snapshot_replay_consistency() {
    let mut nes = counter_nes();
    run_frames(&mut nes, 3);
    let snapshot = nes.serialize();
    run_frames(&mut nes, 2);
    let straight = nes.serialize();
    let straight_ram = nes.low_mem().to_vec();

    nes.deserialize(&snapshot).unwrap();
    run_frames(&mut nes, 2);
    assert_eq!(nes.low_mem(), &straight_ram[..]);
    assert_eq!(nes.serialize(), straight);
}

#[test]
fn test_cycle_kinds_agree() {
    let tokens = ["|..|........|"; 8];

    let mut simple = counter_nes();
    let mut state = simple.serialize();
    for t in tokens {
        simple.run_cycle(CycleKind::Simple, t, &mut state).unwrap();
    }

    let mut rerecord = counter_nes();
    let mut state = rerecord.serialize();
    for t in tokens {
        rerecord
            .run_cycle(CycleKind::Rerecord, t, &mut state)
            .unwrap();
    }

    // Rerecord restores the previous state before each advance, so both
    // loops have run the same frames from the same origins
    assert_eq!(simple.low_mem(), rerecord.low_mem());
}

// Soft reset: PC reloads from $FFFC, low RAM survives, SRAM stays mapped
#[test]
fn test_soft_reset() {
    let mut nes = counter_nes();
    run_frames(&mut nes, 2);
    nes.cpu.low_mem[0x123] = 0xAB;
    nes.advance("|.r|........|").unwrap();
    assert_eq_hex!(nes.low_mem()[0x123], 0xAB);
    assert!(nes.sram_present());
    assert!(nes.error_count() == 0);
}

#[test]
fn test_power_button_rejected() {
    let mut nes = counter_nes();
    assert!(nes.advance("|P.|........|").is_err());
}

// The strobe latches the port and the shifter returns one button per read
#[test]
fn test_joypad_shifter() {
    let mut nes = nes_with_program(&[
        0xA9, 0x01, // LDA #$01
        0x8D, 0x16, 0x40, // STA $4016 (strobe high)
        0xA9, 0x00, // LDA #$00
        0x8D, 0x16, 0x40, // STA $4016 (falling edge latches)
        0xA2, 0x00, // LDX #$00
        0xAD, 0x16, 0x40, // LDA $4016
        0x29, 0x01, // AND #$01
        0x9D, 0x60, 0x00, // STA $0060,X
        0xE8, // INX
        0xE0, 0x08, // CPX #$08
        0xD0, 0xF3, // BNE read loop
        0x4C, 0x19, 0x80, // JMP self
    ]);
    // A and Start held on player 1
    nes.emulate_frame(0x01 | 0x08 | !0xFF, 0);
    let buttons: Vec<u8> = nes.low_mem()[0x60..0x68].to_vec();
    // Read order: A, B, Select, Start, Up, Down, Left, Right
    assert_eq!(buttons, vec![1, 0, 0, 1, 0, 0, 0, 0]);
}

#[test]
fn test_advance_presses_buttons() {
    let mut nes = nes_with_program(&[
        0xA9, 0x01, 0x8D, 0x16, 0x40, // strobe high
        0xA9, 0x00, 0x8D, 0x16, 0x40, // latch
        0xAD, 0x16, 0x40, // LDA $4016 (A button)
        0x29, 0x01, // AND #$01
        0x85, 0x50, // STA $50
        0x4C, 0x00, 0x80, // JMP $8000, poll forever
    ]);
    nes.set_controller_kind(0, ControllerKind::Joypad);
    nes.advance("|..|.......A|").unwrap();
    assert_eq!(nes.low_mem()[0x50], 1);
    nes.advance("|..|........|").unwrap();
    assert_eq!(nes.low_mem()[0x50], 0);
}

// A battery cart carries its SRAM contents through a snapshot
#[test]
fn test_battery_sram_round_trip() {
    common::init_logging();
    let code = [
        0xA9, 0x5A, // LDA #$5A
        0x8D, 0x00, 0x60, // STA $6000
        0x4C, 0x05, 0x80, // JMP self
    ];
    // SxROM maps SRAM at $6000; the fixed last bank holds the vectors
    let mut last_bank = vec![0xEA; 0x4000];
    last_bank[0x3FF0] = 0x40; // RTI stub
    last_bank[0x3FFA] = 0xF0;
    last_bank[0x3FFB] = 0xFF;
    last_bank[0x3FFC] = 0x00; // reset -> $8000
    last_bank[0x3FFD] = 0x80;
    last_bank[0x3FFE] = 0xF0;
    last_bank[0x3FFF] = 0xFF;
    let image = ines_image(
        1,
        &[prg_bank_with_code(&code), last_bank].concat(),
        &[0; 0x2000],
        true,
    );
    let mut nes = Nes::with_cartridge(Cart::from_ines(&image).unwrap()).unwrap();
    run_frames(&mut nes, 1);
    assert_eq_hex!(nes.high_mem()[0], 0x5A);

    let snapshot = nes.serialize();
    let mut other = Nes::with_cartridge(Cart::from_ines(&image).unwrap()).unwrap();
    other.deserialize(&snapshot).unwrap();
    assert_eq_hex!(other.high_mem()[0], 0x5A);
}
