//! Port definitions: the inbound authorization API and the outbound
//! capabilities this subsystem depends on.

pub mod inbound;
pub mod outbound;
