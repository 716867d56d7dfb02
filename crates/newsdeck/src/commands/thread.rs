//! `newsdeck thread`: a story with its whole comment tree.

use std::sync::Arc;

use serde::Serialize;

use newsdeck_core::{Item, ItemId, NewsClient, ThreadSnapshot};

use crate::cli::{GlobalOpts, OutputFormat, ThreadArgs};
use crate::commands::item::{headline, plain_text};
use crate::error::CliError;
use crate::output::{self, dim, relative_time, should_color};

/// One node of the thread in display order.
#[derive(Debug, Serialize)]
struct ThreadLine {
    depth: usize,
    item: Arc<Item>,
}

/// Pre-order walk from the root, cut off below `max_depth`.
fn walk(snapshot: &ThreadSnapshot, max_depth: Option<usize>) -> Vec<ThreadLine> {
    let Some(root) = snapshot.root_item() else {
        return Vec::new();
    };
    let mut lines = Vec::with_capacity(snapshot.len());
    let mut stack = vec![(0, Arc::clone(root))];
    while let Some((depth, item)) = stack.pop() {
        if max_depth.is_none_or(|max| depth < max) {
            let children = snapshot.children_of(item.id);
            stack.extend(children.into_iter().rev().map(|c| (depth + 1, Arc::clone(c))));
        }
        lines.push(ThreadLine { depth, item });
    }
    lines
}

fn render_tree(lines: &[ThreadLine], color: bool) -> String {
    let mut out = Vec::with_capacity(lines.len());
    for line in lines {
        let indent = "  ".repeat(line.depth);
        let item = &line.item;
        let meta = format!(
            "{} {} {}",
            item.by.as_deref().unwrap_or("[deleted]"),
            relative_time(item.time),
            dim(&format!("#{}", item.id), color),
        );
        out.push(format!("{indent}{}", dim(&meta, color)));
        let body = if line.depth == 0 {
            headline(item)
        } else if item.is_visible() {
            item.text.as_deref().map(plain_text).unwrap_or_default()
        } else {
            "[deleted]".into()
        };
        out.push(format!("{indent}{body}"));
        out.push(String::new());
    }
    out.join("\n").trim_end().to_owned()
}

pub async fn handle(client: &NewsClient, args: ThreadArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let id = ItemId(args.id);
    let snapshot = client
        .thread(id)
        .await?
        .ok_or_else(|| CliError::not_found("Thread", id))?;
    let lines = walk(&snapshot, args.depth);
    tracing::debug!(%id, nodes = snapshot.len(), shown = lines.len(), "thread loaded");

    let out = match global.output {
        OutputFormat::Table => render_tree(&lines, should_color(&global.color)),
        _ => output::render_single(
            &global.output,
            &lines,
            |_| String::new(),
            |ls| {
                ls.iter()
                    .map(|l| l.item.id.to_string())
                    .collect::<Vec<_>>()
                    .join("\n")
            },
        )?,
    };
    output::print_output(&out, global.quiet);
    Ok(())
}
