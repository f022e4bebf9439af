use serde::{Deserialize, Serialize};

/// What is plugged into a controller port.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerKind {
    /// Nothing; the port reads all zeroes.
    None,
    /// A standard joypad.
    Joypad,
    /// First half of a four-score adapter.
    FourScore1,
    /// Second half of a four-score adapter.
    FourScore2,
}

/// One decoded input token: the console buttons plus both port shift values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InputState {
    pub power: bool,
    pub reset: bool,
    pub port1: u32,
    pub port2: u32,
}

/// Parse an eight-character `UDLRSsBA` joypad group into its port bits.
/// ```
/// assert_eq!(renes::core::joypad_code(".......A").unwrap(), 0x01);
/// assert_eq!(renes::core::joypad_code("U..R....").unwrap(), 0x90);
/// ```
pub fn joypad_code(group: &str) -> Result<u8, String> {
    let bytes = group.as_bytes();
    if bytes.len() != 8 {
        return Err(format!("Could not decode joypad group: '{}'", group));
    }
    let mut code = 0;
    for (i, (&c, &(letter, bit))) in bytes
        .iter()
        .zip(&[
            (b'U', 0x10u8),
            (b'D', 0x20),
            (b'L', 0x40),
            (b'R', 0x80),
            (b'S', 0x08),
            (b's', 0x04),
            (b'B', 0x02),
            (b'A', 0x01),
        ])
        .enumerate()
    {
        if c == letter {
            code |= bit;
        } else if c != b'.' {
            return Err(format!(
                "Could not decode joypad group: '{}' (position {})",
                group, i
            ));
        }
    }
    Ok(code)
}

/// Format a joypad byte back into its eight-character group.
/// ```
/// assert_eq!(renes::core::format_joypad(0x01), ".......A");
/// ```
pub fn format_joypad(code: u8) -> String {
    [
        (0x10u8, 'U'),
        (0x20, 'D'),
        (0x40, 'L'),
        (0x80, 'R'),
        (0x08, 'S'),
        (0x04, 's'),
        (0x02, 'B'),
        (0x01, 'A'),
    ]
    .iter()
    .map(|&(bit, letter)| if code & bit != 0 { letter } else { '.' })
    .collect()
}

/// Decoder for the pipe-delimited per-frame input format:
/// `|PR|P1[|P2]|`, where `PR` is the power and reset buttons and each
/// controller field is empty, one joypad group, or two groups for a
/// four-score half.
#[derive(Clone, Copy, Debug)]
pub struct InputParser {
    kinds: [ControllerKind; 2],
}

impl Default for InputParser {
    fn default() -> Self {
        InputParser {
            kinds: [ControllerKind::Joypad, ControllerKind::None],
        }
    }
}

impl InputParser {
    pub fn new(port1: ControllerKind, port2: ControllerKind) -> InputParser {
        InputParser {
            kinds: [port1, port2],
        }
    }

    pub fn set_kind(&mut self, port: usize, kind: ControllerKind) {
        self.kinds[port & 1] = kind;
    }
    pub fn kind(&self, port: usize) -> ControllerKind {
        self.kinds[port & 1]
    }

    /// Decode one token.
    /// ```
    /// use renes::core::{ControllerKind, InputParser};
    /// let p = InputParser::new(ControllerKind::Joypad, ControllerKind::None);
    /// let input = p.parse("|..|.......A|").unwrap();
    /// assert_eq!(input.port1 & 0xFF, 0x01);
    /// assert!(!input.reset);
    /// ```
    pub fn parse(&self, token: &str) -> Result<InputState, String> {
        let bad = || format!("Could not decode input string: '{}'", token);
        let mut rest = token.strip_prefix('|').ok_or_else(bad)?;

        // Console field: power and reset
        let console = rest.get(..2).ok_or_else(bad)?;
        let mut input = InputState::default();
        match console.as_bytes()[0] {
            b'P' => input.power = true,
            b'.' => {}
            _ => return Err(bad()),
        }
        match console.as_bytes()[1] {
            b'r' => input.reset = true,
            b'.' => {}
            _ => return Err(bad()),
        }
        rest = &rest[2..];

        input.port1 = Self::parse_port(self.kinds[0], &mut rest, token)?;
        input.port2 = Self::parse_port(self.kinds[1], &mut rest, token)?;

        if rest != "|" {
            return Err(bad());
        }
        Ok(input)
    }

    fn parse_port(kind: ControllerKind, rest: &mut &str, token: &str) -> Result<u32, String> {
        let bad = || format!("Could not decode input string: '{}'", token);
        if kind == ControllerKind::None {
            return Ok(0);
        }
        let body = rest.strip_prefix('|').ok_or_else(bad)?;
        match kind {
            ControllerKind::Joypad => {
                let group = body.get(..8).ok_or_else(bad)?;
                *rest = &body[8..];
                // The shifter reads 1s after the eighth bit
                Ok(joypad_code(group)? as u32 | !0xFF)
            }
            _ => {
                let group1 = body.get(..8).ok_or_else(bad)?;
                let body = body[8..].strip_prefix('|').ok_or_else(bad)?;
                let group2 = body.get(..8).ok_or_else(bad)?;
                *rest = &body[8..];
                let mut port = joypad_code(group1)? as u32;
                port |= (joypad_code(group2)? as u32) << 8;
                // Four-score signature: which half in bits 18/19, then the
                // fixed pattern in the top byte
                if kind == ControllerKind::FourScore1 {
                    port |= 1 << 19;
                } else {
                    port |= 1 << 18;
                }
                port |= 0xFF00_0000;
                Ok(port)
            }
        }
    }
}
