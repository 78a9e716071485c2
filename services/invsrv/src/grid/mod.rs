//! Grid codec: cell matrix to typed rows and back, plus A1 geometry

pub mod a1;
pub mod codec;

pub use codec::{decode, encode, DecodeOptions};
