//! Cryptographic primitives for payment confirmation and store keys.

pub mod digest;
pub mod verify;
