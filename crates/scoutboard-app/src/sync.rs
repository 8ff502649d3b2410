// Resync: the full re-fetch that is the only way the List Store is refreshed.
//
// Fetches the list summaries, then every list's detail in parallel. The
// refresh succeeds only if every detail call succeeds; a partial snapshot is
// never written.

use futures_util::future::try_join_all;
use tracing::{debug, info, warn};

use scoutboard_core::api::PipelineApi;
use scoutboard_core::error::PipelineError;
use scoutboard_core::model::PlayerListDetail;
use scoutboard_core::store::SharedStore;

/// Fetch every list and its items without touching the store.
pub async fn fetch_all(api: &dyn PipelineApi) -> Result<Vec<PlayerListDetail>, PipelineError> {
    let summaries = api.list_lists().await?;
    debug!(lists = summaries.len(), "fetched list summaries");

    let details = try_join_all(summaries.iter().map(|list| api.get_list(list.id))).await?;
    Ok(details)
}

/// Fetch everything and replace the store's snapshot.
///
/// Overlapping resyncs are not sequenced: whichever finishes last wins.
pub async fn resync(api: &dyn PipelineApi, store: &SharedStore) -> Result<(), PipelineError> {
    let lists = match fetch_all(api).await {
        Ok(lists) => lists,
        Err(e) => {
            warn!(error = %e, "resync failed, keeping previous snapshot");
            return Err(e);
        }
    };

    let mut guard = store.write().await;
    guard.replace(lists);
    info!(
        lists = guard.lists().len(),
        items = guard.item_count(),
        revision = guard.revision(),
        "list store refreshed"
    );
    Ok(())
}
