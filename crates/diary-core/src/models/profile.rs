//! Profile record model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One profile per identity, stored under the identity id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}
