//! One-shot partner-matching engine: an indexed participant store, a composite
//! scoring function, an atomic find-best-and-consume search, a pairing-history
//! cooldown table, and a background expiry sweeper — composed behind a single
//! cloneable handle, [`MatchingEngine`].
//!
//! A caller constructs one handle with [`MatchingEngine::new`], calls
//! [`MatchingEngine::configure`] once at startup, then drives `create`/`delete`/
//! `search` from as many threads as it likes. This crate has no transport, no
//! process bootstrap, and no persistence — it is a library a host binary embeds.

mod config;
mod engine;
mod history;
mod models;
mod scoring;
mod store;

pub use config::EngineConfig;
pub use engine::MatchingEngine;
pub use models::Participant;

pub use matching_shared::{EngineError, EngineResult};
