use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// A ranked story list.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Feed {
    #[default]
    Top,
    New,
    Best,
    Ask,
    Show,
    Job,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn feeds_parse_from_their_names() {
        for feed in Feed::iter() {
            assert_eq!(feed.to_string().parse::<Feed>().unwrap(), feed);
        }
    }
}
