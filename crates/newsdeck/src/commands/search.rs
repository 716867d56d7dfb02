//! `newsdeck search`: full-text search over stories and comments.

use tabled::Tabled;

use newsdeck_core::{NewsClient, SearchHit, SearchQuery};

use crate::cli::{GlobalOpts, SearchArgs};
use crate::commands::item::plain_text;
use crate::error::CliError;
use crate::output::{self, relative_time, truncate};

#[derive(Tabled)]
struct HitRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Author")]
    author: String,
    #[tabled(rename = "Points")]
    points: String,
    #[tabled(rename = "Comments")]
    comments: String,
    #[tabled(rename = "Age")]
    age: String,
}

fn hit_row(hit: &SearchHit) -> HitRow {
    let title = hit
        .title
        .clone()
        .or_else(|| hit.text.as_deref().map(plain_text))
        .unwrap_or_default();
    HitRow {
        id: hit.id.to_string(),
        title: truncate(&title, 60),
        author: hit.author.clone().unwrap_or_else(|| "-".into()),
        points: hit.points.map_or_else(|| "-".into(), |p| p.to_string()),
        comments: hit.num_comments.map_or_else(|| "-".into(), |n| n.to_string()),
        age: relative_time(hit.created),
    }
}

fn build_query(args: &SearchArgs) -> SearchQuery {
    let mut query = SearchQuery::new(args.query.clone()).with_page(args.page);
    query.hits_per_page = args.limit;
    if let Some(ref tags) = args.tags {
        query = query.with_tags(tags.clone());
    }
    if args.by_date {
        query = query.by_date();
    }
    query
}

pub async fn handle(client: &NewsClient, args: SearchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    if args.query.trim().is_empty() {
        return Err(CliError::Validation {
            field: "query".into(),
            reason: "must not be empty".into(),
        });
    }
    let results = client.search(&build_query(&args)).await?;
    tracing::debug!(
        total = results.total,
        page = results.page,
        pages = results.pages,
        "search finished"
    );

    let out = output::render_list(&global.output, &results.hits, hit_row, |h| h.id.to_string())?;
    output::print_output(&out, global.quiet);
    Ok(())
}
