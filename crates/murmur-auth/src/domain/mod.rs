//! Pure authorization logic: entities, errors, trust-chain checks, and
//! effective-limit arithmetic. No I/O happens in this layer.

pub mod entities;
pub mod errors;
pub mod limits;
pub mod trust;
