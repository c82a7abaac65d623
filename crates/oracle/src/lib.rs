//! PegBank Price Oracle
//!
//! Wraps raw price feeds and refuses prices older than the staleness timeout.
//! A stale price is fatal to the calling operation: there is no cached or
//! default fallback.

mod adapter;
mod clock;
mod error;
mod mock;
mod types;

pub use adapter::{normalize_price, FreshPrice, OracleAdapter};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::OracleError;
pub use mock::MockFeed;
pub use types::{PriceFeed, PriceRound};
