//! fxroute Common Types
//!
//! This crate contains the value types shared by the fee providers and the
//! route planner: currencies and their classification, currency pairs
//! and FX rates.

pub mod monetary;

pub use monetary::*;
