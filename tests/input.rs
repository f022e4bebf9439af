use assert_hex::assert_eq_hex;
use renes::core::{format_joypad, joypad_code, ControllerKind, InputParser};
use test_case::test_case;

#[test_case(0x00, "........")]
#[test_case(0x01, ".......A")]
#[test_case(0x02, "......B.")]
#[test_case(0x04, ".....s..")]
#[test_case(0x08, "....S...")]
#[test_case(0x10, "U.......")]
#[test_case(0x20, ".D......")]
#[test_case(0x40, "..L.....")]
#[test_case(0x80, "...R....")]
#[test_case(0xFF, "UDLRSsBA")]
fn test_joypad_round_trip(code: u8, text: &str) {
    assert_eq!(format_joypad(code), text);
    assert_eq!(joypad_code(text).unwrap(), code);
}

#[test]
fn test_joypad_code_rejects_garbage() {
    assert!(joypad_code("xxxxxxxx").is_err());
    assert!(joypad_code("......").is_err());
    // Letters in the wrong position are invalid
    assert!(joypad_code("A.......").is_err());
}

#[test]
fn test_parse_standard_joypad() {
    let p = InputParser::new(ControllerKind::Joypad, ControllerKind::None);
    let input = p.parse("|..|.......A|").unwrap();
    assert!(!input.power);
    assert!(!input.reset);
    // Bits past the first eight read as 1s from the shifter
    assert_eq_hex!(input.port1, 0xFFFF_FF01);
    assert_eq_hex!(input.port2, 0);
}

#[test]
fn test_parse_console_flags() {
    let p = InputParser::new(ControllerKind::Joypad, ControllerKind::None);
    assert!(p.parse("|.r|........|").unwrap().reset);
    assert!(p.parse("|P.|........|").unwrap().power);
    let both = p.parse("|Pr|........|").unwrap();
    assert!(both.power && both.reset);
}

// Four-score half 1: two joypad bytes in bits 0-15, half select in bit 19,
// signature in the top byte
#[test]
fn test_four_score_encoding() {
    let p = InputParser::new(ControllerKind::FourScore1, ControllerKind::None);
    let input = p.parse("|..|.......A|........|").unwrap();
    assert_eq_hex!(input.port1, 0xFF08_0001);
    assert_eq_hex!(input.port2, 0);

    let p = InputParser::new(ControllerKind::FourScore2, ControllerKind::None);
    let input = p.parse("|..|........|......B.|").unwrap();
    assert_eq_hex!(input.port1, 0xFF04_0200);
}

#[test]
fn test_two_joypads() {
    let p = InputParser::new(ControllerKind::Joypad, ControllerKind::Joypad);
    let input = p.parse("|..|U.......|.......A|").unwrap();
    assert_eq_hex!(input.port1 & 0xFF, 0x10);
    assert_eq_hex!(input.port2 & 0xFF, 0x01);
}

#[test]
fn test_parse_errors() {
    let p = InputParser::new(ControllerKind::Joypad, ControllerKind::None);
    assert!(p.parse("").is_err());
    assert!(p.parse("|..|").is_err());
    assert!(p.parse("..|........|").is_err());
    assert!(p.parse("|..|.......A").is_err());
    assert!(p.parse("|..|.......A|trailing").is_err());
    assert!(p.parse("|x.|........|").is_err());
}

#[test]
fn test_none_port_has_no_field() {
    let p = InputParser::new(ControllerKind::None, ControllerKind::None);
    let input = p.parse("|..|").unwrap();
    assert_eq!(input.port1, 0);
    assert_eq!(input.port2, 0);
}
