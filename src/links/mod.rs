// src/links/mod.rs
// =============================================================================
// Link handling: extraction from description text and health probing.
//
// Submodules:
// - extract: Pulls http/https URLs out of free-form text (pure, no network)
// - probe: Checks whether URLs are alive, with caching and concurrency
// =============================================================================

mod extract;
mod probe;

pub use extract::extract;
pub use probe::{LinkChecker, ProbeResult};
