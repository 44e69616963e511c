//! Siddu pulse feed with optimistic engagement
//!
//! - `client` - `SidduClient`, the REST client for pulses, comments and review votes
//! - `models` - wire formats and their conversion to `siddu-api` types
//! - `remote` - the `EngagementRemote` trait the engine talks to
//! - `engine` - `FeedEngine`: dispatch, reconciliation, pagination
//! - `fake` - in-memory `EngagementRemote` for tests and offline use
//! - `notice` - user-facing failure notices
//! - `text` - hashtag/mention parsing and pulse validation
//! - `config` - YAML + environment configuration

pub mod client;
pub mod config;
pub mod engine;
pub mod fake;
pub mod models;
pub mod notice;
pub mod remote;
pub mod text;

pub use client::SidduClient;
pub use config::SidduConfig;
pub use engine::{DispatchOutcome, FeedEngine};
pub use fake::{FakeRemote, RemoteOp};
pub use models::ReactionSnapshot;
pub use notice::{Notice, NoticeKind, NoticeReceiver};
pub use remote::EngagementRemote;
pub use text::{parse_pulse_content, prepare_pulse, validate_pulse, ParsedContent};
