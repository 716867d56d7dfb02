//! `newsdeck feed`: one page of a ranked story list.

use std::sync::Arc;

use newsdeck_core::{Feed, Item, NewsClient};

use crate::cli::{FeedArgs, FeedKind, GlobalOpts};
use crate::commands::item::item_row;
use crate::error::CliError;
use crate::output;

impl From<FeedKind> for Feed {
    fn from(kind: FeedKind) -> Self {
        match kind {
            FeedKind::Top => Feed::Top,
            FeedKind::New => Feed::New,
            FeedKind::Best => Feed::Best,
            FeedKind::Ask => Feed::Ask,
            FeedKind::Show => Feed::Show,
            FeedKind::Job => Feed::Job,
        }
    }
}

pub async fn handle(client: &NewsClient, args: FeedArgs, global: &GlobalOpts) -> Result<(), CliError> {
    if args.limit == 0 {
        return Err(CliError::Validation {
            field: "--limit".into(),
            reason: "must be at least 1".into(),
        });
    }
    let feed = Feed::from(args.feed);
    if args.refresh {
        client.feed(feed, true).await?;
    }

    let page = client.feed_page(feed, args.page, args.limit).await?;
    let items: Vec<Arc<Item>> = page.into_iter().flatten().collect();
    tracing::debug!(%feed, page = args.page, shown = items.len(), "feed page loaded");

    let out = output::render_list(&global.output, &items, item_row, |i| i.id.to_string())?;
    output::print_output(&out, global.quiet);
    Ok(())
}
