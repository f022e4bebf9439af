use crate::core::cartridge::{Mapper, MapperBus};
use crate::core::{Addr, NesTime};

/// NROM (mapper 0): no banking at all, the shared reset mapping is the whole
/// story.
#[derive(Default)]
pub struct NRom;

impl Mapper for NRom {
    fn mapper_code(&self) -> u32 {
        0
    }
    fn apply_mapping(&mut self, _bus: &mut MapperBus) {}
    fn write(&mut self, _bus: &mut MapperBus, _time: NesTime, _addr: Addr, _data: u8) {}
}
