//! Ordered provider chains
//!
//! Each resolver walks its providers strictly in order and only moves to the
//! next one after the previous attempt has definitively failed.

pub mod current;
pub mod historical;

pub use current::CurrentPriceResolver;
pub use historical::HistoricalPriceResolver;
