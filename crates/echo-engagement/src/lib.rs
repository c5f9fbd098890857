//! Engagement rules for Echo.
//!
//! Pure functions over post and group snapshots handed in by the storage
//! layer. Nothing here reads the clock, the environment or the database:
//! callers pass `now`, the acting user or chat session, and the latest
//! snapshot, and persist whatever comes back.
//!
//! - [`ledger`]: one reaction per user per post, with aggregate counts
//! - [`trending`]: engagement ranking of posts
//! - [`lifecycle`]: inactivity detection and pruning of group chats
//! - [`message_reactions`]: per-session reaction toggles on chat messages
//! - [`content`]: boundary validation and construction of new entities
//! - [`feed`]: category, search and live views over posts
//!
//! # Caller obligations
//!
//! Every operation assumes it was given the freshest snapshot. Two users
//! reacting to the same post at once is a read-modify-write race that this
//! crate cannot see; the store must read the snapshot, call the rule and
//! write the result as one atomic step (for example inside a transaction
//! that holds the write lock) or knowingly accept last-writer-wins.

pub mod content;
pub mod error;
pub mod feed;
pub mod ledger;
pub mod lifecycle;
pub mod message_reactions;
pub mod trending;

pub use error::{EngagementError, Result};
