mod common;

use common::{nes_with_program, run_frames};
use renes::core::DifferentialConfig;

fn counter_nes() -> renes::core::Nes {
    nes_with_program(&[
        0xE6, 0x00, // INC $00
        0xD0, 0xFC, // BNE -4
        0xE6, 0x01, // INC $01
        0x4C, 0x00, 0x80, // JMP $8000
    ])
}

#[test]
fn test_full_round_trip() {
    let mut nes = counter_nes();
    run_frames(&mut nes, 5);
    let snapshot = nes.serialize();
    assert_eq!(snapshot.len(), nes.state_size());

    // Disturb the machine, then restore
    run_frames(&mut nes, 7);
    assert_ne!(nes.serialize(), snapshot);
    nes.deserialize(&snapshot).unwrap();
    assert_eq!(nes.serialize(), snapshot);
}

#[test]
fn test_stream_shape() {
    let nes = counter_nes();
    let s = nes.serialize();
    assert_eq!(&s[0..4], b"NESS");
    assert_eq!(&s[4..8], &0xFFFF_FFFFu32.to_le_bytes());
    assert_eq!(&s[s.len() - 8..s.len() - 4], b"gend");
    // Canonical write order
    let order: Vec<&[u8]> = find_tags(&s);
    assert_eq!(
        order,
        // No CHRR (the test cart has CHR ROM), SRAM always present
        vec![
            &b"TIME"[..],
            &b"CPUR"[..],
            &b"PPUR"[..],
            &b"APUR"[..],
            &b"CTRL"[..],
            &b"MAPR"[..],
            &b"LRAM"[..],
            &b"SPRT"[..],
            &b"NTAB"[..],
            &b"SRAM"[..],
        ]
    );
}

// Walk a stream's block list
fn find_tags(s: &[u8]) -> Vec<&[u8]> {
    let mut tags = Vec::new();
    let mut pos = 8;
    while &s[pos..pos + 4] != b"gend" {
        tags.push(&s[pos..pos + 4]);
        let len = u32::from_le_bytes([s[pos + 4], s[pos + 5], s[pos + 6], s[pos + 7]]) as usize;
        pos += 8 + len;
    }
    tags
}

#[test]
fn test_lite_snapshot_omits_blocks() {
    let mut nes = counter_nes();
    let full_size = nes.state_size();
    nes.disable_state_block("SRAM");
    nes.disable_state_block("SPRT");
    let lite = nes.serialize();
    assert!(lite.len() < full_size);
    assert!(!find_tags(&lite).contains(&&b"SRAM"[..]));
    assert!(!find_tags(&lite).contains(&&b"SPRT"[..]));
    // And a lite stream still loads
    nes.deserialize(&lite).unwrap();

    nes.enable_state_block("SRAM");
    nes.enable_state_block("SPRT");
    assert_eq!(nes.state_size(), full_size);
}

#[test]
fn test_high_is_an_alias_for_sram() {
    let mut nes = counter_nes();
    nes.disable_state_block("HIGH");
    assert!(!find_tags(&nes.serialize()).contains(&&b"SRAM"[..]));
}

#[test]
fn test_unknown_tags_are_skipped() {
    let mut nes = counter_nes();
    let s = nes.serialize();
    // Splice an unknown block in front of gend
    let mut spliced = s[..s.len() - 8].to_vec();
    spliced.extend_from_slice(b"XTRA");
    spliced.extend_from_slice(&4u32.to_le_bytes());
    spliced.extend_from_slice(&[1, 2, 3, 4]);
    spliced.extend_from_slice(&s[s.len() - 8..]);
    nes.deserialize(&spliced).unwrap();
    assert_eq!(nes.serialize(), s);
}

#[test]
fn test_truncated_stream_is_an_error() {
    let mut nes = counter_nes();
    let s = nes.serialize();
    assert!(nes.deserialize(&s[..s.len() - 12]).is_err());
    assert!(nes.deserialize(&s[..20]).is_err());
    assert!(nes.deserialize(b"not a snapshot").is_err());
}

#[test]
fn test_mapr_size_mismatch_is_fatal() {
    let mut nes = counter_nes();
    let s = nes.serialize();
    // Rebuild the stream, growing the MAPR payload by one byte
    let mut bad = Vec::new();
    bad.extend_from_slice(&s[..8]);
    let mut pos = 8;
    while &s[pos..pos + 4] != b"gend" {
        let tag = &s[pos..pos + 4];
        let len = u32::from_le_bytes([s[pos + 4], s[pos + 5], s[pos + 6], s[pos + 7]]) as usize;
        if tag == b"MAPR" {
            bad.extend_from_slice(tag);
            bad.extend_from_slice(&((len + 1) as u32).to_le_bytes());
            bad.extend_from_slice(&s[pos + 8..pos + 8 + len]);
            bad.push(0);
        } else {
            bad.extend_from_slice(&s[pos..pos + 8 + len]);
        }
        pos += 8 + len;
    }
    bad.extend_from_slice(&s[pos..]);
    assert!(nes.deserialize(&bad).is_err());
}

#[test]
fn test_differential_round_trip() {
    let config = DifferentialConfig {
        enabled: true,
        max_differences: 0x10000,
        use_zlib: false,
    };
    let mut nes = counter_nes();
    run_frames(&mut nes, 2);
    let reference = nes.serialize();
    run_frames(&mut nes, 1);
    let target = nes.serialize();

    let diff = nes.serialize_differential(&reference, &config).unwrap();
    assert!(diff.len() < target.len());

    nes.deserialize(&reference).unwrap();
    nes.deserialize_differential(&reference, &diff, &config).unwrap();
    assert_eq!(nes.serialize(), target);
}

#[test]
fn test_differential_round_trip_zlib() {
    let config = DifferentialConfig {
        enabled: true,
        max_differences: 0x10000,
        use_zlib: true,
    };
    let mut nes = counter_nes();
    run_frames(&mut nes, 2);
    let reference = nes.serialize();
    run_frames(&mut nes, 3);
    let target = nes.serialize();

    let diff = nes.serialize_differential(&reference, &config).unwrap();
    nes.deserialize_differential(&reference, &diff, &config).unwrap();
    assert_eq!(nes.serialize(), target);
}

#[test]
fn test_differential_identity() {
    let config = DifferentialConfig::default();
    let mut nes = counter_nes();
    let reference = nes.serialize();
    // Diffing a state against itself produces no changed bytes
    let diff = nes.serialize_differential(&reference, &config).unwrap();
    nes.deserialize_differential(&reference, &diff, &config).unwrap();
    assert_eq!(nes.serialize(), reference);
}

// Exceeding the byte budget is an error; the caller falls back to a full
// snapshot
#[test]
fn test_differential_budget() {
    let config = DifferentialConfig {
        enabled: true,
        max_differences: 4,
        use_zlib: false,
    };
    let mut nes = counter_nes();
    run_frames(&mut nes, 1);
    let reference = nes.serialize();
    run_frames(&mut nes, 1);
    assert!(nes.serialize_differential(&reference, &config).is_err());
}
