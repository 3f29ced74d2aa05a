//! Persistent store for cloned repositories, argument files and command output.
//!
//! The store lives in one directory next to the aux file. [`Files`] maps
//! realm/name pairs to stable paths and remembers them across runs in a
//! cache file. [`Repos`] clones git repositories into the `git` realm and
//! [`Store`] keeps command output in further realms.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use anyhow::{anyhow, Result};

pub use files::{Files, Kind};
pub use fix::replace_base_path;
pub use git::Repository;
pub use process::Store;
pub use repos::{GitPath, Repos};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Limits {
    pub clone: Duration,
    pub query: Duration,
    pub exec:  Duration,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            clone: Duration::from_secs(600),
            query: Duration::from_secs(120),
            exec:  Duration::from_secs(3600),
        }
    }
}

/// Resolve a relative path below `root` without touching the file system.
pub fn resolve_inside(root: &Path, relative: &str) -> Result<PathBuf> {
    let mut parts = Vec::new();

    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir       => continue,
            Component::ParentDir    => {
                parts.pop().ok_or_else(|| anyhow!("{} escapes {}", relative, root.display()))?;
            },
            _ => return Err(anyhow!("{} is not a relative path", relative)),
        }
    }

    Ok(parts.into_iter().fold(root.to_owned(), |path, part| path.join(part)))
}

mod files;
mod fix;
mod git;
mod process;
mod repos;
