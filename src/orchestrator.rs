// src/orchestrator.rs
// =============================================================================
// Drives the backup -> mutate -> verify -> rollback transaction per video.
//
// Per selected item, strictly in order:
//   Fetching -> Backing-up -> Mutating -> {Updated | Unchanged | RolledBack | Failed}
//
// The one invariant everything else hangs off: a mutation is NEVER attempted
// without a durable backup of the pre-mutation description. If the write then
// fails, the just-written backup is pushed straight back to the remote; only
// when that restore ALSO fails do we report the double failure, because at
// that point the remote may disagree with both the backup and the intended
// edit and the operator needs to know.
//
// Items are processed one at a time, on purpose. Parallel mutation would need
// per-item transaction bookkeeping to keep backups and in-flight writes
// paired up; update volume per run is small enough that serial is fine.
// Per-item failures are recorded and the batch moves on - the orchestrator
// classifies instead of raising wherever it can.
// =============================================================================

use serde::Serialize;

use crate::api::{VideoApi, VideoRef};
use crate::backup::BackupStore;
use crate::error::EditorError;
use crate::pattern;

/// Terminal state of one selected video after an orchestration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateStatus {
    /// Description rewritten on the remote.
    Updated,
    /// The replacement produced identical text; nothing was written.
    /// Counted as success ("already up to date"), not as a no-op error.
    Unchanged,
    /// The write failed but the original description was restored intact.
    RolledBack,
    /// The item could not be processed; see `detail`. When both the write
    /// and the restore failed, `detail` carries both messages.
    Failed,
}

/// One per selected video per run; never mutated after creation.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateOutcome {
    pub video_id: String,
    pub title: String,
    pub status: UpdateStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Aggregate counts across a run. Updated and Unchanged both count as
/// succeeded; RolledBack and Failed count as failed.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct UpdateSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl UpdateSummary {
    fn record(&mut self, status: UpdateStatus) {
        match status {
            UpdateStatus::Updated | UpdateStatus::Unchanged => self.succeeded += 1,
            UpdateStatus::RolledBack | UpdateStatus::Failed => self.failed += 1,
        }
    }
}

/// Sequential update driver over any VideoApi, writing backups through the
/// given store before every mutation.
pub struct Orchestrator<'a, A: VideoApi> {
    api: &'a A,
    backups: &'a BackupStore,
}

impl<'a, A: VideoApi> Orchestrator<'a, A> {
    pub fn new(api: &'a A, backups: &'a BackupStore) -> Self {
        Self { api, backups }
    }

    /// Applies the find/replace to every selected video, one at a time.
    /// Returns outcomes in selection order plus aggregate counts.
    /// `progress(i + 1, selected.len())` fires as each item completes.
    pub async fn run_updates(
        &self,
        selected: &[VideoRef],
        find: &str,
        replace_with: &str,
        progress: &(dyn Fn(usize, usize) + Sync),
    ) -> (Vec<UpdateOutcome>, UpdateSummary) {
        let mut outcomes = Vec::with_capacity(selected.len());
        let mut summary = UpdateSummary::default();

        for (i, video) in selected.iter().enumerate() {
            let outcome = self.update_one(video, find, replace_with).await;
            summary.record(outcome.status);
            outcomes.push(outcome);
            progress(i + 1, selected.len());
        }

        (outcomes, summary)
    }

    // The per-item state machine. Infallible by design: every failure mode
    // becomes a recorded outcome so one bad video cannot abort the batch.
    async fn update_one(&self, video: &VideoRef, find: &str, replace_with: &str) -> UpdateOutcome {
        // Fetching: always work from a fresh snapshot. The remote can reject
        // writes built from stale details, and the description may have
        // changed since the scan.
        let detail = match self.api.fetch_details(std::slice::from_ref(&video.id)).await {
            Ok(mut details) => match details.remove(&video.id) {
                Some(detail) => detail,
                None => {
                    // Vanished between scan and update: terminal, no backup
                    // taken, no mutation attempted.
                    return outcome(video, UpdateStatus::Failed, Some("video no longer available".into()));
                }
            },
            Err(e) => {
                return outcome(video, UpdateStatus::Failed, Some(format!("could not fetch details: {}", e)));
            }
        };

        // Backing-up: must be durably written before any mutation.
        if let Err(e) = self.backups.save(&video.id, &video.title, &detail.description) {
            return outcome(video, UpdateStatus::Failed, Some(format!("backup failed, update not attempted: {}", e)));
        }

        let (new_description, changed) = pattern::apply(&detail.description, find, replace_with);
        if !changed {
            return outcome(video, UpdateStatus::Unchanged, None);
        }

        // Mutating.
        match self.api.update_description(&detail, &new_description).await {
            Ok(()) => outcome(video, UpdateStatus::Updated, None),
            Err(update_err) => self.rollback(video, &detail, update_err).await,
        }
    }

    // The write failed; push the just-written backup straight back.
    async fn rollback(
        &self,
        video: &VideoRef,
        detail: &crate::api::VideoDetail,
        update_err: EditorError,
    ) -> UpdateOutcome {
        let record = match self.backups.get(&video.id) {
            Ok(record) => record,
            Err(restore_err) => {
                // Should be unreachable (we just saved it), but if the store
                // went bad in between, surface the double failure.
                return outcome(
                    video,
                    UpdateStatus::Failed,
                    Some(format!("update failed: {}; restore also failed: {}", update_err, restore_err)),
                );
            }
        };

        match self.api.update_description(detail, &record.description).await {
            Ok(()) => outcome(
                video,
                UpdateStatus::RolledBack,
                Some(format!("update failed, original restored: {}", update_err)),
            ),
            Err(restore_err) => outcome(
                video,
                UpdateStatus::Failed,
                Some(format!("update failed: {}; restore also failed: {}", update_err, restore_err)),
            ),
        }
    }
}

fn outcome(video: &VideoRef, status: UpdateStatus, detail: Option<String>) -> UpdateOutcome {
    UpdateOutcome {
        video_id: video.id.clone(),
        title: video.title.clone(),
        status,
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Privacy, VideoDetail, VideoPage};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::tempdir;

    // Fake remote holding live descriptions in memory. Writes whose new text
    // appears in `deny_descriptions` fail with a quota error - that lets one
    // test fail the mutation ("abc789") while allowing the restore
    // ("abc123"), and another deny both.
    struct FakeApi {
        store: Mutex<HashMap<String, VideoDetail>>,
        deny_descriptions: Vec<String>,
    }

    impl FakeApi {
        fn with_video(id: &str, description: &str) -> Self {
            let detail = VideoDetail {
                id: id.to_string(),
                title: format!("title of {}", id),
                description: description.to_string(),
                tags: vec!["tag".to_string()],
                category_id: "22".to_string(),
                privacy: Privacy::Public,
            };
            let mut store = HashMap::new();
            store.insert(id.to_string(), detail);
            Self {
                store: Mutex::new(store),
                deny_descriptions: Vec::new(),
            }
        }

        fn deny(mut self, description: &str) -> Self {
            self.deny_descriptions.push(description.to_string());
            self
        }

        fn live_description(&self, id: &str) -> String {
            self.store.lock().unwrap()[id].description.clone()
        }
    }

    impl VideoApi for FakeApi {
        async fn list_page(&self, _page_token: Option<&str>) -> Result<VideoPage, EditorError> {
            unreachable!("orchestrator never enumerates");
        }

        async fn fetch_details(
            &self,
            ids: &[String],
        ) -> Result<HashMap<String, VideoDetail>, EditorError> {
            let store = self.store.lock().unwrap();
            Ok(ids
                .iter()
                .filter_map(|id| store.get(id).map(|d| (id.clone(), d.clone())))
                .collect())
        }

        async fn update_description(
            &self,
            detail: &VideoDetail,
            new_description: &str,
        ) -> Result<(), EditorError> {
            if self.deny_descriptions.iter().any(|d| d == new_description) {
                return Err(EditorError::QuotaOrPermission("quotaExceeded".to_string()));
            }
            let mut store = self.store.lock().unwrap();
            store
                .get_mut(&detail.id)
                .expect("updating unknown video")
                .description = new_description.to_string();
            Ok(())
        }
    }

    fn video_ref(id: &str) -> VideoRef {
        VideoRef {
            id: id.to_string(),
            title: format!("title of {}", id),
        }
    }

    fn store_in(dir: &tempfile::TempDir) -> BackupStore {
        BackupStore::new(dir.path().join("backups.json"))
    }

    #[tokio::test]
    async fn test_successful_update_backs_up_then_writes() {
        let dir = tempdir().unwrap();
        let backups = store_in(&dir);
        let api = FakeApi::with_video("v1", "abc123");

        let (outcomes, summary) = Orchestrator::new(&api, &backups)
            .run_updates(&[video_ref("v1")], "123", "789", &|_, _| {})
            .await;

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].status, UpdateStatus::Updated);
        assert_eq!(api.live_description("v1"), "abc789");
        // The backup holds the pre-mutation text.
        assert_eq!(backups.get("v1").unwrap().description, "abc123");
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 0);
    }

    #[tokio::test]
    async fn test_no_occurrence_reports_unchanged_without_write() {
        let dir = tempdir().unwrap();
        let backups = store_in(&dir);
        let api = FakeApi::with_video("v1", "nothing to replace");

        let (outcomes, summary) = Orchestrator::new(&api, &backups)
            .run_updates(&[video_ref("v1")], "123", "789", &|_, _| {})
            .await;

        assert_eq!(outcomes[0].status, UpdateStatus::Unchanged);
        assert_eq!(api.live_description("v1"), "nothing to replace");
        assert_eq!(summary.succeeded, 1);
    }

    #[tokio::test]
    async fn test_failed_write_rolls_back_to_original() {
        let dir = tempdir().unwrap();
        let backups = store_in(&dir);
        // The mutated text is denied, the restore text is not.
        let api = FakeApi::with_video("v1", "abc123").deny("abc789");

        let (outcomes, summary) = Orchestrator::new(&api, &backups)
            .run_updates(&[video_ref("v1")], "123", "789", &|_, _| {})
            .await;

        assert_eq!(outcomes[0].status, UpdateStatus::RolledBack);
        // Live state unchanged from the original.
        assert_eq!(api.live_description("v1"), "abc123");
        assert_eq!(summary.failed, 1);
    }

    #[tokio::test]
    async fn test_double_failure_surfaces_both_messages() {
        let dir = tempdir().unwrap();
        let backups = store_in(&dir);
        // Both the mutation and the restore are denied.
        let api = FakeApi::with_video("v1", "abc123").deny("abc789").deny("abc123");

        let (outcomes, _) = Orchestrator::new(&api, &backups)
            .run_updates(&[video_ref("v1")], "123", "789", &|_, _| {})
            .await;

        assert_eq!(outcomes[0].status, UpdateStatus::Failed);
        let detail = outcomes[0].detail.as_deref().unwrap();
        assert!(detail.contains("update failed"));
        assert!(detail.contains("restore also failed"));
    }

    #[tokio::test]
    async fn test_vanished_video_fails_without_backup() {
        let dir = tempdir().unwrap();
        let backups = store_in(&dir);
        let api = FakeApi::with_video("v1", "abc123");

        let (outcomes, _) = Orchestrator::new(&api, &backups)
            .run_updates(&[video_ref("gone")], "123", "789", &|_, _| {})
            .await;

        assert_eq!(outcomes[0].status, UpdateStatus::Failed);
        // No backup was taken for a video we never fetched.
        assert!(matches!(backups.get("gone"), Err(EditorError::NoBackupFound(_))));
    }

    // One bad item never aborts the rest of the batch.
    #[tokio::test]
    async fn test_batch_continues_past_failures() {
        let dir = tempdir().unwrap();
        let backups = store_in(&dir);
        let mut api = FakeApi::with_video("v1", "abc123");
        {
            let mut store = api.store.lock().unwrap();
            store.insert(
                "v2".to_string(),
                VideoDetail {
                    id: "v2".to_string(),
                    title: "title of v2".to_string(),
                    description: "xyz123".to_string(),
                    tags: Vec::new(),
                    category_id: "22".to_string(),
                    privacy: Privacy::Public,
                },
            );
        }
        api.deny_descriptions.push("abc789".to_string());
        api.deny_descriptions.push("abc123".to_string());

        let (outcomes, summary) = Orchestrator::new(&api, &backups)
            .run_updates(
                &[video_ref("v1"), video_ref("v2")],
                "123",
                "789",
                &|_, _| {},
            )
            .await;

        assert_eq!(outcomes[0].status, UpdateStatus::Failed);
        assert_eq!(outcomes[1].status, UpdateStatus::Updated);
        assert_eq!(api.live_description("v2"), "xyz789");
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
    }

    #[tokio::test]
    async fn test_progress_fires_per_item() {
        let dir = tempdir().unwrap();
        let backups = store_in(&dir);
        let api = FakeApi::with_video("v1", "abc123");

        let seen = Mutex::new(Vec::new());
        Orchestrator::new(&api, &backups)
            .run_updates(&[video_ref("v1"), video_ref("missing")], "123", "789", &|c, t| {
                seen.lock().unwrap().push((c, t));
            })
            .await;

        assert_eq!(*seen.lock().unwrap(), vec![(1, 2), (2, 2)]);
    }
}
