//! Task path decomposition: `Folder\Sub\Task` <-> (`Folder\Sub`, `Task`).

/// Separator used by the scheduler tool between folder segments.
pub const SEPARATOR: char = '\\';

/// Root folder as understood by the scheduler tool.
pub const ROOT: &str = "\\";

/// A task path split into its folder and leaf name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplodedPath {
    /// Every segment before the last one, joined with [`SEPARATOR`].
    ///
    /// Empty when the path had no separator. [`ROOT`] when the only
    /// separator was a leading one (`\Task`).
    pub folder: String,
    /// Last path segment.
    pub name: String,
}

impl ExplodedPath {
    /// Rebuild the full path. Inverse of [`explode`].
    pub fn full_path(&self) -> String {
        join(&self.folder, &self.name)
    }
}

/// Split `full_path` on the last separator.
pub fn explode(full_path: &str) -> ExplodedPath {
    match full_path.rsplit_once(SEPARATOR) {
        Some(("", name)) => ExplodedPath {
            folder: ROOT.to_owned(),
            name: name.to_owned(),
        },
        Some((folder, name)) => ExplodedPath {
            folder: folder.to_owned(),
            name: name.to_owned(),
        },
        None => ExplodedPath {
            folder: String::new(),
            name: full_path.to_owned(),
        },
    }
}

/// Join a folder and a leaf name; an empty folder yields `name` unchanged.
pub fn join(folder: &str, name: &str) -> String {
    if folder.is_empty() {
        name.to_owned()
    } else if folder.ends_with(SEPARATOR) {
        format!("{folder}{name}")
    } else {
        format!("{folder}{SEPARATOR}{name}")
    }
}
