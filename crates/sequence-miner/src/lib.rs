//! Sequential Pattern Miner
//!
//! Mines frequent subsequences (gaps allowed) from event sequences under
//! aggregate constraints on per-event numeric attributes, and turns the mined
//! patterns into one-hot membership features per sequence.
//!
//! ```ignore
//! let db = SequenceDatabase::new(sessions).with_attribute("price", prices)?;
//! let miner = Miner::new(&db, vec![Constraint::average("price").between(3.0, 4.0)], MiningConfig::default())?;
//! let patterns = miner.mine()?;
//! let features = miner.one_hot(&patterns);
//! ```

mod cancel;
mod config;
mod constraint;
mod database;
mod error;
mod miner;
mod pattern;

pub use cancel::CancellationToken;
pub use config::{MinFrequency, MiningConfig};
pub use constraint::{Aggregate, Constraint};
pub use database::{Attribute, ItemId, SequenceDatabase};
pub use error::MiningError;
pub use miner::Miner;
pub use pattern::Pattern;
