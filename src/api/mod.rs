// src/api/mod.rs
// =============================================================================
// Remote API layer.
//
// Submodules:
// - client: The VideoApi trait, wire types, and the reqwest-backed
//           YouTube Data API v3 implementation
// - scanner: Paginated enumeration + batched detail fetching on top of it
// =============================================================================

mod client;
mod scanner;

pub use client::{
    Privacy, VideoApi, VideoDetail, VideoPage, VideoRef, YouTubeClient, DETAIL_BATCH_SIZE,
};
pub use scanner::Scanner;
