// src/api/scanner.rs
// =============================================================================
// Enumerates the whole channel and fetches details with minimal quota spend.
//
// Two phases, matching how the remote prices its calls:
// 1. enumerate_all: Page through the uploads listing (cheap - ids and titles
//    only) until the remote stops handing out page tokens
// 2. fetch_details_batched: Pull full details in chunks of 50 ids per call,
//    turning O(n) detail requests into O(n/50)
//
// A page failure is a hard error: we never return a silently-truncated
// channel listing, the caller discards partial results and reports the scan
// as failed.
// =============================================================================

use std::collections::HashMap;

use crate::api::client::{VideoApi, VideoDetail, VideoRef, DETAIL_BATCH_SIZE};
use crate::error::EditorError;

/// Paginated enumeration and batched detail retrieval over any VideoApi.
pub struct Scanner<'a, A: VideoApi> {
    api: &'a A,
}

impl<'a, A: VideoApi> Scanner<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Lists every video on the channel, in arrival order.
    ///
    /// `progress(count, count)` fires after each page; the total is unknown
    /// until the last page, so current and total track together during
    /// enumeration (the original tool displayed it the same way).
    pub async fn enumerate_all(
        &self,
        progress: &(dyn Fn(usize, usize) + Sync),
    ) -> Result<Vec<VideoRef>, EditorError> {
        let mut videos = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self.api.list_page(page_token.as_deref()).await?;
            videos.extend(page.items);
            progress(videos.len(), videos.len());

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(videos)
    }

    /// Fetches full details for `refs` in chunks of DETAIL_BATCH_SIZE.
    ///
    /// Ids the remote does not acknowledge (deleted or restricted videos)
    /// are absent from the returned map; callers treat a missing id as
    /// "skip" rather than failing the batch.
    pub async fn fetch_details_batched(
        &self,
        refs: &[VideoRef],
        progress: &(dyn Fn(usize, usize) + Sync),
    ) -> Result<HashMap<String, VideoDetail>, EditorError> {
        let total = refs.len();
        let mut details = HashMap::with_capacity(total);

        for (i, chunk) in refs.chunks(DETAIL_BATCH_SIZE).enumerate() {
            let ids: Vec<String> = chunk.iter().map(|r| r.id.clone()).collect();
            let batch = self.api.fetch_details(&ids).await?;
            details.extend(batch);

            let fetched_through = (i * DETAIL_BATCH_SIZE + chunk.len()).min(total);
            progress(fetched_through, total);
        }

        Ok(details)
    }
}
