//! # Murmur Authorization Subsystem
//!
//! The trust-and-authorization core of the Murmur broker: verifies the
//! operator → account → user credential chain, resolves account claims
//! through a pluggable store, applies cross-account subject sharing
//! (imports/exports gated by activation tokens), keeps shadow
//! subscriptions consistent with claim updates, enforces per-account
//! resource limits, and expires credentials on schedule.
//!
//! ## Architecture
//!
//! This subsystem follows hexagonal architecture:
//! - **Domain Layer** (`domain/`): Pure verification and limit logic, no I/O
//! - **Ports Layer** (`ports/`): Trait definitions for inbound/outbound interfaces
//! - **Adapters Layer** (`adapters/`): In-memory and HTTP-backed resolver backends
//! - **Service Layer** (`service/`): Account registry, import resolution,
//!   shadow reconciliation, expiration scheduling
//!
//! ## Concurrency
//!
//! One worker per connection; shared state is guarded by a registry lock
//! plus one lock per account and per connection. Lock order is always
//! registry → account → connection. Resolver and token fetches are
//! awaited I/O and never run while a lock is held.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

pub use config::AuthConfig;
pub use domain::entities::{
    Account, ClientHandle, CloseReason, Connection, ResolvedImport, ShadowRecord, ShadowSub,
    Subscription,
};
pub use domain::errors::AuthError;
pub use ports::inbound::{AuthApi, AuthRequest};
pub use ports::outbound::{AccountResolver, ActivationFetcher, ResolverError, RouteSink};
pub use service::{generate_nonce, AuthService};
