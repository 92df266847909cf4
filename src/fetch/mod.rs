//! External data collectors.
//!
//! Thin HTTP clients for the upstream APIs. They hand the core
//! unit-tagged in-memory values and raise only on transport or HTTP
//! failures; everything downstream is the pipeline's concern.

pub mod defillama;
pub mod fred;

pub use defillama::{DefiLlamaClient, SupplyBreakdown};
pub use fred::{FredClient, FredObservation};
