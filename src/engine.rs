// src/engine.rs
// =============================================================================
// The facade the presentation layer talks to.
//
// Wires the scanner, pattern matcher, link checker, backup store and update
// orchestrator together behind four operations:
// - scan_for_pattern: Which videos contain the find-text?
// - run_updates:      Apply the edit to the operator's selection
// - scan_all_links:   Extract and health-check every link on the channel
// - restore_from_backup: Push one backed-up description back to the remote
//
// The engine is generic over VideoApi so tests drive it with a fake remote;
// main.rs instantiates it with YouTubeClient and runs the long operations on
// a worker task, feeding the progress callbacks into a channel.
// =============================================================================

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;

use serde::Serialize;

use crate::api::{Scanner, VideoApi, VideoDetail, VideoRef};
use crate::backup::{BackupRecord, BackupStore};
use crate::error::EditorError;
use crate::links::{self, LinkChecker};
use crate::orchestrator::{Orchestrator, UpdateOutcome, UpdateSummary};
use crate::pattern;
use crate::report::{self, LinkReportRow, LinkScanSummary};

/// Which stage of a multi-stage scan a progress report belongs to. Each
/// stage has its own total (videos listed, details fetched, URLs probed),
/// so the presentation layer labels and draws them separately instead of
/// showing one counter that jumps backward between stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Listing,
    Details,
    Probing,
}

/// A video whose description contains the find-pattern. `selected` belongs
/// to the presentation layer: the scan always leaves it false, and only an
/// explicit selection step (--all / --ids) flips it.
#[derive(Debug, Clone, Serialize)]
pub struct MatchCandidate {
    pub detail: VideoDetail,
    pub issues: Vec<String>,
    pub selected: bool,
}

pub struct Engine<A: VideoApi> {
    api: A,
    backups: BackupStore,
}

impl<A: VideoApi> Engine<A> {
    pub fn new(api: A, backup_path: PathBuf) -> Self {
        Self {
            api,
            backups: BackupStore::new(backup_path),
        }
    }

    /// Enumerates the channel and returns every video whose description
    /// contains `find`, in channel order, none of them selected.
    pub async fn scan_for_pattern(
        &self,
        find: &str,
        progress: impl Fn(ScanPhase, usize, usize) + Sync,
    ) -> Result<Vec<MatchCandidate>, EditorError> {
        let scanner = Scanner::new(&self.api);
        let refs = scanner
            .enumerate_all(&|current, total| progress(ScanPhase::Listing, current, total))
            .await?;
        let details = scanner
            .fetch_details_batched(&refs, &|current, total| {
                progress(ScanPhase::Details, current, total)
            })
            .await?;

        // Keep channel order by walking refs, not the detail map.
        let mut candidates = Vec::new();
        for video in &refs {
            // Missing from the detail map means deleted/restricted: skip.
            let Some(detail) = details.get(&video.id) else {
                continue;
            };
            if pattern::matches(&detail.description, find) {
                candidates.push(MatchCandidate {
                    detail: detail.clone(),
                    issues: vec!["Contains pattern to replace".to_string()],
                    selected: false,
                });
            }
        }

        Ok(candidates)
    }

    /// Runs the backup/update/rollback transaction over the selected
    /// candidates, sequentially, and reports per-item outcomes.
    pub async fn run_updates(
        &self,
        selected: &[MatchCandidate],
        find: &str,
        replace_with: &str,
        progress: impl Fn(usize, usize) + Sync,
    ) -> (Vec<UpdateOutcome>, UpdateSummary) {
        let refs: Vec<VideoRef> = selected
            .iter()
            .map(|c| VideoRef {
                id: c.detail.id.clone(),
                title: c.detail.title.clone(),
            })
            .collect();

        Orchestrator::new(&self.api, &self.backups)
            .run_updates(&refs, find, replace_with, &progress)
            .await
    }

    /// Extracts every link from every description on the channel and probes
    /// each distinct URL once. Probe failures are report rows, never errors;
    /// only enumeration/detail-fetch failures abort the audit.
    pub async fn scan_all_links(
        &self,
        concurrency: usize,
        progress: impl Fn(ScanPhase, usize, usize) + Sync,
    ) -> Result<(Vec<LinkReportRow>, LinkScanSummary), EditorError> {
        let scanner = Scanner::new(&self.api);
        let refs = scanner
            .enumerate_all(&|current, total| progress(ScanPhase::Listing, current, total))
            .await?;
        let details = scanner
            .fetch_details_batched(&refs, &|current, total| {
                progress(ScanPhase::Details, current, total)
            })
            .await?;

        // Pair each video with its extracted links, preserving channel order.
        let mut videos: Vec<(VideoDetail, Vec<String>)> = Vec::new();
        let mut distinct_urls: Vec<String> = Vec::new();
        let mut seen = HashSet::new();
        for video in &refs {
            let Some(detail) = details.get(&video.id) else {
                continue;
            };
            let found = links::extract(&detail.description);
            for url in &found {
                if seen.insert(url.clone()) {
                    distinct_urls.push(url.clone());
                }
            }
            videos.push((detail.clone(), found));
        }

        // One checker per audit: the cache lives exactly as long as the run.
        let checker = LinkChecker::new();
        let probed = checker
            .probe_all(distinct_urls, concurrency, &|current, total| {
                progress(ScanPhase::Probing, current, total)
            })
            .await;
        let results: HashMap<String, _> =
            probed.into_iter().map(|r| (r.url.clone(), r)).collect();

        Ok(report::assemble(&videos, &results))
    }

    /// Restores one video's description from its backup. The record is kept
    /// after a successful restore, so restoring is repeatable.
    pub async fn restore_from_backup(&self, video_id: &str) -> Result<String, EditorError> {
        let record = self.backups.get(video_id)?;

        let mut details = self
            .api
            .fetch_details(std::slice::from_ref(&video_id.to_string()))
            .await?;
        let detail = details.remove(video_id).ok_or_else(|| {
            EditorError::RemoteUnavailable(format!("could not fetch details for {}", video_id))
        })?;

        self.api
            .update_description(&detail, &record.description)
            .await?;

        Ok(format!(
            "restored \"{}\" to its description from {}",
            record.title, record.backup_time
        ))
    }

    /// All live backup records, in id order, for the `backups` listing.
    pub fn list_backups(&self) -> Result<BTreeMap<String, BackupRecord>, EditorError> {
        self.backups.load()
    }
}
