// ── Items ──
//
// Stories, comments, jobs, polls and poll options share one shape upstream;
// `ItemKind` tells them apart.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Numeric identifier of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl ItemId {
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ItemId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl From<u64> for ItemId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ItemKind {
    #[default]
    Story,
    Comment,
    Job,
    Poll,
    #[strum(serialize = "pollopt")]
    #[serde(rename = "pollopt")]
    PollOpt,
}

/// A story, comment, job, poll or poll option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub kind: ItemKind,
    pub by: Option<String>,
    pub time: Option<DateTime<Utc>>,
    pub text: Option<String>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub score: Option<i64>,
    pub descendants: Option<u64>,
    pub parent: Option<ItemId>,
    #[serde(default)]
    pub kids: Vec<ItemId>,
    #[serde(default)]
    pub dead: bool,
    #[serde(default)]
    pub deleted: bool,
    pub poll: Option<ItemId>,
    #[serde(default)]
    pub parts: Vec<ItemId>,
}

impl Item {
    /// A minimal item of the given kind, mostly useful for tests and fixtures.
    pub fn new(id: impl Into<ItemId>, kind: ItemKind) -> Self {
        Self {
            id: id.into(),
            kind,
            by: None,
            time: None,
            text: None,
            url: None,
            title: None,
            score: None,
            descendants: None,
            parent: None,
            kids: Vec::new(),
            dead: false,
            deleted: false,
            poll: None,
            parts: Vec::new(),
        }
    }

    /// Deleted and dead items render as unavailable.
    pub fn is_visible(&self) -> bool {
        !self.deleted && !self.dead
    }

    /// Host part of the story URL, e.g. `example.com`.
    pub fn domain(&self) -> Option<String> {
        let url = url::Url::parse(self.url.as_deref()?).ok()?;
        let host = url.host_str()?;
        Some(host.strip_prefix("www.").unwrap_or(host).to_owned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn item_id_parses_and_displays() {
        let id: ItemId = " 8863 ".parse().unwrap();
        assert_eq!(id, ItemId(8863));
        assert_eq!(id.to_string(), "8863");
        assert!("abc".parse::<ItemId>().is_err());
    }

    #[test]
    fn kind_round_trips_through_strings() {
        assert_eq!(ItemKind::PollOpt.to_string(), "pollopt");
        assert_eq!("comment".parse::<ItemKind>().unwrap(), ItemKind::Comment);
        let json = serde_json::to_string(&ItemKind::PollOpt).unwrap();
        assert_eq!(json, "\"pollopt\"");
    }

    #[test]
    fn domain_strips_www() {
        let mut item = Item::new(1, ItemKind::Story);
        item.url = Some("https://www.example.com/a/b".into());
        assert_eq!(item.domain().as_deref(), Some("example.com"));
    }

    #[test]
    fn deleted_items_are_not_visible() {
        let mut item = Item::new(1, ItemKind::Comment);
        assert!(item.is_visible());
        item.deleted = true;
        assert!(!item.is_visible());
    }
}
