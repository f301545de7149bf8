// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Resolve the access token (flag, then environment, .env honored)
// 3. Dispatch to the appropriate subcommand handler
// 4. Long operations run on a worker task; the main task polls for the
//    result at a short interval while drawing progress updates
// 5. Exit with a proper code (0 = clean, 1 = broken links / failed updates,
//    2 = error)
//
// Rust concepts used:
// - async/await: Scans and updates are network-bound
// - tokio::select!: Wait on the worker result and the progress tick at once
// - Arc: Share the engine with the spawned worker task
// =============================================================================

// Module declarations - tells Rust about our other source files
mod api;          // src/api/ - remote client + channel scanner
mod backup;       // src/backup.rs - durable pre-edit description backups
mod cli;          // src/cli.rs - command-line parsing
mod engine;       // src/engine.rs - facade wiring everything together
mod error;        // src/error.rs - typed error kinds
mod links;        // src/links/ - link extraction and health probing
mod orchestrator; // src/orchestrator.rs - backup/update/rollback driver
mod pattern;      // src/pattern.rs - literal find/replace
mod report;       // src/report.rs - link report rows

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use api::YouTubeClient;
use backup::{BackupRecord, BackupStore};
use cli::{Cli, Commands};
use engine::{Engine, MatchCandidate, ScanPhase};
use error::EditorError;
use orchestrator::{UpdateOutcome, UpdateStatus, UpdateSummary};
use report::{LinkReportRow, LinkScanSummary};

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Returns:
//   Ok(0) = clean run
//   Ok(1) = broken links found / some updates failed
//   Ok(2) = could not start (missing token, empty selection, ...)
async fn run() -> Result<i32> {
    // Pick up YOUTUBE_ACCESS_TOKEN from a .env file if one exists.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        // The backups listing is purely local - no token needed.
        Commands::Backups => {
            let store = BackupStore::new(&cli.backup_file);
            println!("📋 Backups in {}\n", store.path().display());
            print_backups(&store.load()?);
            Ok(0)
        }
        command => {
            let token = resolve_token(cli.token.clone())?;
            let client = YouTubeClient::new(token)?;
            let engine = Arc::new(Engine::new(client, cli.backup_file.clone()));

            match command {
                Commands::Scan { pattern, json } => handle_scan(engine, pattern, json).await,
                Commands::Update {
                    pattern,
                    replacement,
                    all,
                    ids,
                    yes,
                    json,
                } => handle_update(engine, pattern, replacement, all, ids, yes, json).await,
                Commands::Links { json, concurrency } => {
                    handle_links(engine, json, concurrency).await
                }
                Commands::Restore { video_id, yes } => {
                    handle_restore(engine, video_id, yes).await
                }
                Commands::Backups => unreachable!("handled above"),
            }
        }
    }
}

// The token is opaque to us: we pass it through as a bearer credential and
// never try to acquire or refresh one.
fn resolve_token(flag: Option<String>) -> Result<String, EditorError> {
    pick_token(flag, std::env::var("YOUTUBE_ACCESS_TOKEN").ok())
}

// Flag wins over environment; blank values count as absent. The env lookup
// lives in resolve_token so tests can pass both sources in directly instead
// of mutating process environment (which races across parallel tests).
fn pick_token(flag: Option<String>, env_token: Option<String>) -> Result<String, EditorError> {
    flag.or(env_token)
        .filter(|t| !t.trim().is_empty())
        .ok_or(EditorError::AuthenticationMissing)
}

// -----------------------------------------------------------------------------
// Worker handoff
// -----------------------------------------------------------------------------

struct ProgressUpdate {
    label: &'static str,
    current: usize,
    total: usize,
}

type ProgressSender = mpsc::UnboundedSender<ProgressUpdate>;

// Runs a long engine operation on a worker task while this task polls for
// the result at a fixed short interval, redrawing the latest progress line.
// The worker and this loop communicate only through the two channels -
// the progress sender and the join handle acting as the result slot.
//
// Updates carry their label so multi-stage operations (list, fetch details,
// probe) each get a fresh line; a label change finishes the previous line
// instead of redrawing over a counter with a different total.
async fn run_on_worker<T: Send + 'static>(
    spawn: impl FnOnce(ProgressSender) -> JoinHandle<T>,
) -> Result<T> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut handle = spawn(tx);
    let mut tick = tokio::time::interval(Duration::from_millis(100));
    let mut drawn_label: Option<&'static str> = None;

    loop {
        tokio::select! {
            result = &mut handle => {
                if drawn_label.is_some() {
                    println!();
                }
                return result.map_err(|e| anyhow!("worker task failed: {}", e));
            }
            _ = tick.tick() => {
                // Drain to the most recent update; intermediate ones are
                // stale the moment a newer one exists.
                let mut latest = None;
                while let Ok(update) = rx.try_recv() {
                    latest = Some(update);
                }
                if let Some(update) = latest {
                    if drawn_label.is_some() && drawn_label != Some(update.label) {
                        println!();
                    }
                    print!("\r  {} ({}/{})    ", update.label, update.current, update.total);
                    io::stdout().flush().ok();
                    drawn_label = Some(update.label);
                }
            }
        }
    }
}

fn progress_fn(tx: ProgressSender, label: &'static str) -> impl Fn(usize, usize) {
    move |current, total| {
        let _ = tx.send(ProgressUpdate { label, current, total });
    }
}

// Maps the engine's scan phases onto labeled progress updates.
fn phase_progress_fn(tx: ProgressSender) -> impl Fn(ScanPhase, usize, usize) {
    move |phase, current, total| {
        let label = match phase {
            ScanPhase::Listing => "Listing videos",
            ScanPhase::Details => "Fetching details",
            ScanPhase::Probing => "Checking links",
        };
        let _ = tx.send(ProgressUpdate { label, current, total });
    }
}

// -----------------------------------------------------------------------------
// Subcommand handlers
// -----------------------------------------------------------------------------

async fn handle_scan(
    engine: Arc<Engine<YouTubeClient>>,
    pattern: String,
    json: bool,
) -> Result<i32> {
    require_pattern(&pattern)?;
    println!("🔍 Scanning channel for \"{}\"", preview(&pattern, 50));

    let candidates = scan_on_worker(engine, pattern).await??;

    if json {
        println!("{}", serde_json::to_string_pretty(&candidates)?);
        return Ok(0);
    }

    if candidates.is_empty() {
        println!("✅ No videos contain the pattern");
    } else {
        print_candidates(&candidates);
        println!("\n📊 {} video(s) match", candidates.len());
    }
    Ok(0)
}

async fn handle_update(
    engine: Arc<Engine<YouTubeClient>>,
    pattern: String,
    replacement: String,
    all: bool,
    ids: Vec<String>,
    yes: bool,
    json: bool,
) -> Result<i32> {
    require_pattern(&pattern)?;

    println!("🔍 Scanning channel for \"{}\"", preview(&pattern, 50));
    let mut candidates = scan_on_worker(engine.clone(), pattern.clone()).await??;

    if candidates.is_empty() {
        println!("✅ No videos contain the pattern - nothing to update");
        return Ok(0);
    }
    print_candidates(&candidates);

    // Selection is an explicit operator action; the scan never selects.
    if all {
        for candidate in &mut candidates {
            candidate.selected = true;
        }
    } else if !ids.is_empty() {
        for candidate in &mut candidates {
            candidate.selected = ids.contains(&candidate.detail.id);
        }
        for id in &ids {
            if !candidates.iter().any(|c| &c.detail.id == id) {
                eprintln!("⚠️  --ids {}: not among the matching videos, skipping", id);
            }
        }
    } else {
        eprintln!("\nNo selection given - pass --all or --ids id1,id2,...");
        return Ok(2);
    }

    let selected: Vec<MatchCandidate> =
        candidates.into_iter().filter(|c| c.selected).collect();
    if selected.is_empty() {
        eprintln!("No videos selected - nothing to update");
        return Ok(2);
    }

    if !yes {
        let question = format!(
            "Update {} video(s)? Backups will be written before any video is touched.",
            selected.len()
        );
        if !confirm(&question)? {
            println!("Aborted.");
            return Ok(0);
        }
    }

    let (outcomes, summary) = run_on_worker(|tx| {
        let engine = engine.clone();
        let pattern = pattern.clone();
        let replacement = replacement.clone();
        tokio::spawn(async move {
            engine
                .run_updates(&selected, &pattern, &replacement, progress_fn(tx, "Updating videos"))
                .await
        })
    })
    .await?;

    if json {
        let output = serde_json::json!({ "outcomes": outcomes, "summary": summary });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_outcomes(&outcomes, &summary);
    }

    Ok(if summary.failed > 0 { 1 } else { 0 })
}

async fn handle_links(
    engine: Arc<Engine<YouTubeClient>>,
    json: bool,
    concurrency: usize,
) -> Result<i32> {
    println!("🔍 Auditing links across the channel");

    let (rows, summary) = run_on_worker(|tx| {
        let engine = engine.clone();
        tokio::spawn(
            async move { engine.scan_all_links(concurrency, phase_progress_fn(tx)).await },
        )
    })
    .await??;

    if json {
        let output = serde_json::json!({ "rows": rows, "summary": summary });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_link_report(&rows, &summary);
    }

    Ok(if summary.links_broken > 0 { 1 } else { 0 })
}

async fn handle_restore(
    engine: Arc<Engine<YouTubeClient>>,
    video_id: String,
    yes: bool,
) -> Result<i32> {
    if !yes && !confirm(&format!("Restore the backed-up description of {}?", video_id))? {
        println!("Aborted.");
        return Ok(0);
    }

    match engine.restore_from_backup(&video_id).await {
        Ok(message) => {
            println!("✅ {}", message);
            Ok(0)
        }
        Err(e @ EditorError::NoBackupFound(_)) => {
            eprintln!("❌ {}", e);
            Ok(1)
        }
        Err(e) => Err(e.into()),
    }
}

// Scan runs on the worker for both `scan` and `update`.
async fn scan_on_worker(
    engine: Arc<Engine<YouTubeClient>>,
    pattern: String,
) -> Result<Result<Vec<MatchCandidate>, EditorError>> {
    run_on_worker(|tx| {
        tokio::spawn(
            async move { engine.scan_for_pattern(&pattern, phase_progress_fn(tx)).await },
        )
    })
    .await
}

fn require_pattern(pattern: &str) -> Result<()> {
    if pattern.is_empty() {
        // An empty pattern never matches (and would otherwise invite a
        // whole-channel replacement), so refuse it up front.
        Err(anyhow!("the find-pattern must not be empty"))
    } else {
        Ok(())
    }
}

fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(matches!(line.trim().to_lowercase().as_str(), "y" | "yes"))
}

// -----------------------------------------------------------------------------
// Table printing
// -----------------------------------------------------------------------------

fn print_candidates(candidates: &[MatchCandidate]) {
    println!("\n{:<15} {:<70}", "VIDEO ID", "TITLE");
    println!("{}", "=".repeat(86));
    for candidate in candidates {
        println!(
            "{:<15} {:<70}",
            candidate.detail.id,
            preview(&candidate.detail.title, 67)
        );
    }
}

fn print_outcomes(outcomes: &[UpdateOutcome], summary: &UpdateSummary) {
    println!("\n{:<15} {:<12} {:<45} {:<30}", "VIDEO ID", "STATUS", "TITLE", "DETAIL");
    println!("{}", "=".repeat(105));
    for outcome in outcomes {
        println!(
            "{:<15} {:<12} {:<45} {:<30}",
            outcome.video_id,
            format_status(outcome.status),
            preview(&outcome.title, 42),
            outcome.detail.as_deref().unwrap_or("")
        );
    }

    println!();
    println!("📊 Summary:");
    println!("   ✅ Succeeded: {}", summary.succeeded);
    println!("   ❌ Failed: {}", summary.failed);
}

fn format_status(status: UpdateStatus) -> &'static str {
    match status {
        UpdateStatus::Updated => "✅ UPDATED",
        UpdateStatus::Unchanged => "✅ UP-TO-DATE",
        UpdateStatus::RolledBack => "🔄 ROLLED BACK",
        UpdateStatus::Failed => "❌ FAILED",
    }
}

fn print_link_report(rows: &[LinkReportRow], summary: &LinkScanSummary) {
    println!("\n{:<40} {:<55} {:<7} {:<30}", "VIDEO", "LINK", "STATUS", "NOTE");
    println!("{}", "=".repeat(135));
    for row in rows {
        println!(
            "{:<40} {:<55} {:<7} {:<30}",
            preview(&row.title, 37),
            preview(&row.link, 52),
            row.status,
            row.error.as_deref().unwrap_or("")
        );
    }

    println!();
    println!("📊 Summary:");
    println!("   📋 Videos scanned: {}", summary.videos_scanned);
    println!("   🔗 Videos with links: {}", summary.videos_with_links);
    println!("   🌐 Links checked: {}", summary.links_checked);
    println!("   ❌ Broken: {}", summary.links_broken);
}

fn print_backups(backups: &BTreeMap<String, BackupRecord>) {
    if backups.is_empty() {
        println!("No backups stored.");
        return;
    }

    println!("{:<15} {:<50} {:<25}", "VIDEO ID", "TITLE", "BACKED UP");
    println!("{}", "=".repeat(92));
    for (id, record) in backups {
        println!(
            "{:<15} {:<50} {:<25}",
            id,
            preview(&record.title, 47),
            record.backup_time.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    println!("\n📋 {} backup(s)", backups.len());
}

// Truncates a string for table display, adding an ellipsis when cut.
fn preview(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why Arc<Engine<...>>?
//    - The worker task needs its own handle to the engine, and tasks must
//      own their data ('static). Arc gives shared ownership with cheap
//      clones (it's just a reference count).
//
// 2. What is tokio::select!?
//    - Waits on several async things at once and runs the branch for
//      whichever finishes first. Here: the worker's result vs. the next
//      progress tick.
//
// 3. Why poll the JoinHandle instead of just .await-ing it?
//    - Awaiting it directly would block until the scan finishes, and the
//      progress updates would never be drawn. The select! loop lets us keep
//      the display fresh while the worker runs.
// -----------------------------------------------------------------------------
