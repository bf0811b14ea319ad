//! # SKIRMISH Client - Prediction & Interpolation Core
//!
//! The client-local mirror of the arena. Two time domains, both
//! single-threaded and cooperative:
//!
//! - **Render/prediction loop** (per frame): advances the locally
//!   controlled avatar from directional input and eases every remote
//!   entity toward its authoritative position
//! - **Network loop** (per server tick): ingests snapshots and pushes the
//!   predicted position back as the authoritative one for our entity
//!
//! The position model is client-authoritative: the server takes our word
//! for where we are, and we take its word for where everyone else is.
//!
//! Rendering is the embedder's job; [`view::ClientWorld::render_entities`]
//! hands it everything it needs to draw a frame.

pub mod interpolation;
pub mod prediction;
pub mod view;

// Re-exports for convenience
pub use interpolation::RemoteSmoother;
pub use prediction::{InputState, LocalAvatar};
pub use view::{ClientWorld, RenderEntity};
