// ── Threads ──
//
// A whole discussion fetched in one call, and its flattened form.

use std::collections::HashMap;
use std::sync::Arc;

use super::{Item, ItemId};

/// An item with its nested replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemTree {
    pub item: Item,
    pub children: Vec<ItemTree>,
}

impl ItemTree {
    /// Number of nodes including the root.
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(ItemTree::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Pre-order flattening. Each item's `kids` lists its children in order.
    pub fn flatten(self) -> Vec<Item> {
        let mut out = Vec::with_capacity(self.len());
        let mut stack = vec![self];
        while let Some(ItemTree { mut item, children }) = stack.pop() {
            item.kids = children.iter().map(|c| c.item.id).collect();
            out.push(item);
            stack.extend(children.into_iter().rev());
        }
        out
    }
}

/// A flattened thread: every node keyed by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadSnapshot {
    pub root: ItemId,
    pub items: HashMap<ItemId, Arc<Item>>,
}

impl ThreadSnapshot {
    pub fn root_item(&self) -> Option<&Arc<Item>> {
        self.items.get(&self.root)
    }

    /// Direct replies of `id`, in display order. Unknown kids are skipped.
    pub fn children_of(&self, id: ItemId) -> Vec<&Arc<Item>> {
        self.items
            .get(&id)
            .map(|item| item.kids.iter().filter_map(|k| self.items.get(k)).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
