//! The 20 core entities of spec §3 and their construction-time invariants.
//!
//! Cyclic model graphs (Match <-> Odds, Portfolio <-> Position, Watchlist <->
//! WatchlistItem) are stored as separate flat structs keyed by parent id; nothing
//! here embeds a bidirectional pointer (design notes, spec §9). Joins happen at
//! the repository query site.

pub mod ids;
pub mod entities;

pub use ids::*;
pub use entities::*;
