//! `newsdeck item`: show items by id.

use std::sync::Arc;

use tabled::Tabled;

use newsdeck_core::{Item, ItemId, NewsClient};

use crate::cli::{GlobalOpts, ItemArgs};
use crate::error::CliError;
use crate::output::{self, bold, dim, relative_time, should_color, truncate};

/// One table row per item.
#[derive(Tabled)]
pub struct ItemRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Type")]
    pub kind: String,
    #[tabled(rename = "Title")]
    pub title: String,
    #[tabled(rename = "By")]
    pub by: String,
    #[tabled(rename = "Points")]
    pub score: String,
    #[tabled(rename = "Comments")]
    pub comments: String,
    #[tabled(rename = "Age")]
    pub age: String,
}

pub fn item_row(item: &Arc<Item>) -> ItemRow {
    ItemRow {
        id: item.id.to_string(),
        kind: item.kind.to_string(),
        title: truncate(&headline(item), 60),
        by: item.by.clone().unwrap_or_else(|| "-".into()),
        score: item.score.map_or_else(|| "-".into(), |s| s.to_string()),
        comments: item.descendants.map_or_else(|| "-".into(), |d| d.to_string()),
        age: relative_time(item.time),
    }
}

/// Title for stories, a text excerpt for comments, a marker when gone.
pub fn headline(item: &Item) -> String {
    if !item.is_visible() {
        return "[deleted]".into();
    }
    if let Some(ref title) = item.title {
        return match item.domain() {
            Some(domain) => format!("{title} ({domain})"),
            None => title.clone(),
        };
    }
    item.text
        .as_deref()
        .map(plain_text)
        .unwrap_or_default()
}

/// Strip markup from HN comment HTML for terminal display.
pub fn plain_text(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.replace("<p>", " ").chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.replace("&#x27;", "'")
        .replace("&quot;", "\"")
        .replace("&#x2F;", "/")
        .replace("&gt;", ">")
        .replace("&lt;", "<")
        .replace("&amp;", "&")
}

fn detail(item: &Arc<Item>, color: bool) -> String {
    let mut lines = vec![bold(&headline(item), color)];
    let mut meta = vec![format!("{} {}", item.kind, item.id)];
    if let Some(score) = item.score {
        meta.push(format!("{score} points"));
    }
    if let Some(ref by) = item.by {
        meta.push(format!("by {by}"));
    }
    meta.push(relative_time(item.time));
    if let Some(n) = item.descendants {
        meta.push(format!("{n} comments"));
    }
    lines.push(dim(&meta.join(" | "), color));
    if let Some(ref url) = item.url {
        lines.push(url.clone());
    }
    if item.title.is_some() {
        if let Some(ref text) = item.text {
            lines.push(String::new());
            lines.push(plain_text(text));
        }
    }
    lines.join("\n")
}

pub async fn handle(client: &NewsClient, args: ItemArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let ids: Vec<ItemId> = args.ids.into_iter().map(ItemId).collect();

    let found = if args.refresh {
        let mut out = Vec::with_capacity(ids.len());
        for &id in &ids {
            out.push(client.refresh(id).await?);
        }
        out
    } else {
        client.items(&ids).await?
    };

    // A single missing item is an error; in a list it is just skipped.
    if let [only] = ids.as_slice() {
        let Some(item) = found.into_iter().next().flatten() else {
            return Err(CliError::not_found("Item", only));
        };
        let color = should_color(&global.color);
        let out = output::render_single(
            &global.output,
            &item,
            |i| detail(i, color),
            |i| i.id.to_string(),
        )?;
        output::print_output(&out, global.quiet);
        return Ok(());
    }

    let items: Vec<Arc<Item>> = ids
        .iter()
        .zip(found)
        .filter_map(|(id, item)| {
            if item.is_none() {
                tracing::warn!(%id, "item not found");
            }
            item
        })
        .collect();
    let out = output::render_list(&global.output, &items, item_row, |i| i.id.to_string())?;
    output::print_output(&out, global.quiet);
    Ok(())
}
