//! Domain ports
//!
//! Trait boundaries between the reconciler and the external systems it
//! drives. Adapters implement these traits to provide concrete providers.

pub mod ports;
