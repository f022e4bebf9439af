//! The emulation core, provided as a library.
//!
//! A deterministic emulation of the Nintendo Entertainment System, built for
//! headless batch replay: the same cartridge and the same input sequence always
//! produce the same machine state, byte for byte. The machine is advanced one
//! video frame at a time, and the full state can be captured and restored
//! through a block-tagged snapshot stream, either whole or as a run-length
//! compressed difference against an earlier snapshot.
//! ```
//! use renes::core::{Nes, ControllerKind};
//! // The actual state of the NES
//! let mut nes = Nes::new();
//! nes.set_controller_kind(0, ControllerKind::Joypad);
//! // Advance the NES by one frame, pressing A on player 1's controller
//! nes.advance("|..|.......A|").unwrap();
//! // Capture the whole machine
//! let state = nes.serialize();
//! // Read the 2 KiB of internal RAM, e.g. to hash it
//! let low_ram = nes.low_mem();
//! println!(
//!     "Ran {} frames, {} bytes of state, {:#04X} at $0000",
//!     nes.frame_count(),
//!     state.len(),
//!     low_ram[0]
//! );
//! ```
mod nes;
pub use nes::Nes;
mod cpu;
pub use cpu::{Cpu, CpuResult, MemSource, PAGE_BITS, PAGE_COUNT, PAGE_SIZE};
pub mod opcodes;
mod ppu;
pub use ppu::{Ppu, HV_TO_RGB, IMAGE_HEIGHT, IMAGE_WIDTH};
mod apu;
pub use apu::Apu;
mod cartridge;
pub use cartridge::*;
mod input;
pub use input::{format_joypad, joypad_code, ControllerKind, InputParser, InputState};
mod snapshot;
pub use snapshot::DifferentialConfig;
mod script;
pub use script::{CycleKind, TestScript};

/// CPU clock count. One unit is one NTSC CPU cycle (three PPU dots).
pub type NesTime = i32;
/// A CPU address. Wider than 16 bits so the program counter can run past
/// 0xFFFF and be caught.
pub type Addr = u32;

/// Far-future timestamp meaning "no pending interrupt".
pub const NO_IRQ: NesTime = i32::MAX / 2;

/// The approximate clock speed of an NTSC NES, in hertz.
pub const CLOCK_RATE: u32 = 1_789_773;
/// The location of the cartridge/APU interrupt vector.
pub const IRQ_VECTOR: Addr = 0xFFFE;
/// The location of the reset vector.
pub const RESET_VECTOR: Addr = 0xFFFC;
/// The location of the non-maskable interrupt's vector.
pub const NMI_VECTOR: Addr = 0xFFFA;
