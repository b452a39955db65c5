use std::{fmt, path::PathBuf, str::FromStr};

use tutor::schema::Resource;

/// One file headed for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub resource: Resource,
    pub path: PathBuf,
}

impl FromStr for Upload {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        crate::utils::parse_upload(raw)
    }
}

impl fmt::Display for Upload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.resource, self.path.display())
    }
}

#[derive(Debug, Default)]
pub struct Summary {
    pub rows: usize,
    pub files: usize,
    pub failed: Vec<(Upload, String)>,
}
