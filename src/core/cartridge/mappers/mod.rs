//! The cartridge board family.
//! See [Mapper][super::Mapper].
mod nrom;
pub use nrom::NRom;
mod sxrom;
pub use sxrom::SxRom;
mod uxrom;
pub use uxrom::UxRom;
mod cnrom;
pub use cnrom::CnRom;
mod txrom;
pub use txrom::TxRom;
mod exrom;
pub use exrom::ExRom;
mod axrom;
pub use axrom::AxRom;
mod pxrom;
pub use pxrom::PxRom;
mod colordreams;
pub use colordreams::ColorDreams;
mod multicart;
pub use multicart::{K1029, ResetFourIn1};
mod namco163;
pub use namco163::Namco163;
mod vrc;
pub use vrc::{Vrc1, Vrc24, Vrc3, Vrc7};
mod vrc6;
pub use vrc6::Vrc6;
mod unrom512;
pub use unrom512::Unrom512;
mod g101;
pub use g101::G101;
mod taito;
pub use taito::{TaitoX1005, Tc0190};
mod bnrom;
pub use bnrom::BnRom;
mod gxrom;
pub use gxrom::GxRom;
mod fme7;
pub use fme7::Fme7;
mod camerica;
pub use camerica::Camerica;
mod discrete;
pub use discrete::{
    Bandai74161, Daou306, Jaleco78, Jaleco87, JalecoJf13, MagicKid, Mapper240, Mapper241,
    Mapper244, Mapper246, Nina03, Ntdec112, Sunsoft1, Sunsoft2, TamS1,
};
