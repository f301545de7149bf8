// src/report.rs
// =============================================================================
// Flattens per-video link-check results into report rows.
//
// Pure transform: no network, no storage. One row per link occurrence;
// videos with zero links contribute no rows (but the engine still counts
// them in the summary). Rows go to the presentation layer as-is - table,
// JSON, or a spreadsheet renderer downstream.
// =============================================================================

use std::collections::HashMap;

use serde::Serialize;
use url::Url;

use crate::api::VideoDetail;
use crate::links::ProbeResult;

/// One checked link in one video's description.
#[derive(Debug, Clone, Serialize)]
pub struct LinkReportRow {
    pub title: String,
    pub video_url: String,
    pub privacy: String,
    pub link: String,
    pub healthy: bool,
    /// The HTTP status code, or "Unreachable" when no response arrived.
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Whole-audit counts, computed over every scanned video (including the
/// ones that produced no rows).
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct LinkScanSummary {
    pub videos_scanned: usize,
    pub videos_with_links: usize,
    pub links_checked: usize,
    pub links_broken: usize,
}

/// Builds report rows from each video's extracted links plus the probe
/// results keyed by URL. Links missing from `results` (probe never ran)
/// are reported as unreachable rather than dropped.
pub fn assemble(
    videos: &[(VideoDetail, Vec<String>)],
    results: &HashMap<String, ProbeResult>,
) -> (Vec<LinkReportRow>, LinkScanSummary) {
    let mut rows = Vec::new();
    let mut summary = LinkScanSummary {
        videos_scanned: videos.len(),
        ..Default::default()
    };

    for (video, links) in videos {
        if links.is_empty() {
            continue;
        }
        summary.videos_with_links += 1;

        for link in links {
            summary.links_checked += 1;
            let row = match results.get(link) {
                Some(result) => {
                    if !result.is_healthy() {
                        summary.links_broken += 1;
                    }
                    LinkReportRow {
                        title: video.title.clone(),
                        video_url: watch_url(&video.id),
                        privacy: video.privacy.to_string(),
                        link: link.clone(),
                        healthy: result.is_healthy(),
                        status: result.status_display(),
                        error: result.error.clone(),
                    }
                }
                None => {
                    summary.links_broken += 1;
                    LinkReportRow {
                        title: video.title.clone(),
                        video_url: watch_url(&video.id),
                        privacy: video.privacy.to_string(),
                        link: link.clone(),
                        healthy: false,
                        status: "Unreachable".to_string(),
                        error: Some("link was never probed".to_string()),
                    }
                }
            };
            rows.push(row);
        }
    }

    (rows, summary)
}

// Canonical watch URL for a video id.
fn watch_url(video_id: &str) -> String {
    Url::parse_with_params("https://www.youtube.com/watch", &[("v", video_id)])
        .expect("static base URL is valid")
        .to_string()
}
