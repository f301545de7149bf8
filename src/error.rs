// src/error.rs
// =============================================================================
// Structured error types for the editor core.
//
// The binary (main.rs) uses anyhow for easy propagation, but the library
// modules return this typed enum so callers can tell the difference between
// "your token is missing" (give up), "the remote is down" (abort this scan)
// and "the remote rejected one write" (roll that one item back, keep going).
//
// Rust concepts:
// - thiserror: Derive macro that implements std::error::Error + Display
// - #[from]: Automatic conversion so the ? operator works on io/json errors
// =============================================================================

use thiserror::Error;

// Every failure mode the core can surface to a caller.
//
// Link-probe failures are deliberately NOT here: a dead link is a recorded
// result (see links::probe::ProbeResult), never an error that aborts a batch.
#[derive(Debug, Error)]
pub enum EditorError {
    /// No credential material available. Fatal for the whole session;
    /// the core never tries to acquire or refresh credentials itself.
    #[error("no access token available - pass --token or set YOUTUBE_ACCESS_TOKEN")]
    AuthenticationMissing,

    /// Transient network/HTTP failure while reading from the remote.
    /// Aborts the current scan; previously committed backups are untouched.
    #[error("remote API unavailable: {0}")]
    RemoteUnavailable(String),

    /// The remote rejected a write (quota exhausted, permission denied).
    /// This is what triggers the rollback path in the orchestrator.
    #[error("remote rejected the write: {0}")]
    QuotaOrPermission(String),

    /// A restore was requested for a video we never backed up.
    /// Reported to the operator, not fatal.
    #[error("no backup found for video {0}")]
    NoBackupFound(String),

    /// The backup file could not be read or written.
    #[error("backup store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backup file exists but does not contain valid JSON.
    #[error("backup store is corrupt: {0}")]
    Json(#[from] serde_json::Error),
}
