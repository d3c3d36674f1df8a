use std::path::Path;

use super::session::SessionId;

/// Identity of an imported table: owning session plus logical base name.
///
/// All downstream query code resolves tables by exact `<session>_<base>`
/// match, so this is the single place the name is formatted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub session: SessionId,
    pub base: String,
}

impl TableRef {
    pub fn new(session: SessionId, base: impl Into<String>) -> Self {
        Self {
            session,
            base: base.into(),
        }
    }

    /// Derives the logical base name from a converter output file.
    pub fn from_output_file(session: SessionId, path: &Path) -> Option<Self> {
        let base = path.file_stem()?.to_string_lossy().into_owned();
        Some(Self::new(session, base))
    }

    /// Canonical table name: `<session>_<base>` with hyphens mapped to
    /// underscores.
    pub fn table_name(&self) -> String {
        format!("{}_{}", self.session, self.base).replace('-', "_")
    }
}
