//! Client for the Vizzle virtual try-on backend.
//!
//! - [`api`]: HTTP transport, wire types and endpoint bindings.
//! - [`jobs`]: job families, the per-job state machine and the progress poller.
//! - [`session`]: [`TryOnSession`], which ties uploads and jobs together.
//! - [`store`]: the key-value handoff between runs.

pub mod api;
pub mod config;
pub mod error;
pub mod jobs;
pub mod session;
pub mod store;

pub use config::VizzleConfig;
pub use error::VizzleError;
pub use session::{TryOnOptions, TryOnSession, VideoOptions};
