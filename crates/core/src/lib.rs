//! `cartledger-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod aggregate;
pub mod clock;
pub mod error;
pub mod fold;
pub mod id;

pub use aggregate::{Aggregate, ExpectedRevision};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{FoldError, InvalidId};
pub use fold::{StreamAggregator, replay};
pub use id::AggregateId;
