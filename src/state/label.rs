use serde::{Deserialize, Serialize};
use std::fmt;

/// Selects which branch of the page state machine a request runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Label {
    /// A listing page: item cards plus an optional next-page control
    List,

    /// An item detail page that yields one record
    Detail,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::List => "LIST",
            Self::Detail => "DETAIL",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
