use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ItemId;

/// A user profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub created: Option<DateTime<Utc>>,
    pub karma: i64,
    pub about: Option<String>,
    #[serde(default)]
    pub submitted: Vec<ItemId>,
}
