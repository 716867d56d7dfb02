//! `newsdeck watch`: keep items live and reprint them when they change.
//!
//! Every id is observed through the live registry; a periodic forced
//! refresh pushes new upstream data through the cache to the observers.

use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{self, FusedFuture, FutureExt};
use tokio_stream::StreamExt;

use newsdeck_core::{Item, ItemId, NewsClient};

use crate::cli::{GlobalOpts, WatchArgs};
use crate::commands::item::item_row;
use crate::error::CliError;
use crate::output;

pub async fn handle(client: &NewsClient, args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    if args.interval == 0 {
        return Err(CliError::Validation {
            field: "--interval".into(),
            reason: "must be at least 1 second".into(),
        });
    }
    let ids: Vec<ItemId> = args.ids.into_iter().map(ItemId).collect();
    let mut updates = client.observe_many(&ids).into_stream();

    let mut ticker = tokio::time::interval(Duration::from_secs(args.interval));
    // The first tick fires immediately and the initial load covers it.
    ticker.tick().await;

    // Runs alongside the loop so a slow refresh never holds up printing.
    let mut refreshing = pin!(future::Fuse::terminated());
    let mut printed = 0usize;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                break;
            }
            next = updates.next() => {
                let Some(snapshot) = next else { break };
                let items: Vec<Arc<Item>> = snapshot.into_iter().flatten().collect();
                let out = output::render_list(&global.output, &items, item_row, |i| i.id.to_string())?;
                output::print_output(&out, global.quiet);

                printed += 1;
                if args.count.is_some_and(|max| printed >= max) {
                    break;
                }
            }
            () = &mut refreshing => {}
            _ = ticker.tick() => {
                if refreshing.is_terminated() {
                    refreshing.set(refresh_all(client, &ids).fuse());
                } else {
                    tracing::debug!("previous refresh still running, skipping tick");
                }
            }
        }
    }
    Ok(())
}

/// Force-refresh every id at once; the loader batches them.
async fn refresh_all(client: &NewsClient, ids: &[ItemId]) {
    tracing::debug!(count = ids.len(), "refreshing watched items");
    let results = future::join_all(ids.iter().map(|&id| async move { (id, client.refresh(id).await) })).await;
    for (id, result) in results {
        if let Err(e) = result {
            tracing::warn!(%id, error = %e, "refresh failed");
        }
    }
}
