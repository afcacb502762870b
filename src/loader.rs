//! Resolves template names to `.dust` files on disk.

use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing::debug;
use walkdir::WalkDir;

/// Finds template files by name.
///
/// A name is first tried as a path, relative to the including template and
/// then to the working directory. Failing that, it is matched as a path
/// suffix against every `.dust` file under the configured directories. The
/// directory listing is built on first use and kept until a directory is
/// added.
#[derive(Debug, Default)]
pub(crate) struct Loader {
    directories: Vec<PathBuf>,
    index: OnceCell<Vec<PathBuf>>,
}

impl Loader {
    pub fn add_directory(&mut self, dir: PathBuf) {
        self.directories.push(dir);
        self.index = OnceCell::new();
    }

    /// Returns the canonical path of the template file for `name`.
    pub fn resolve(&self, name: &str, base: Option<&Path>) -> Option<PathBuf> {
        let mut file = name.to_owned();
        if !file.ends_with(".dust") {
            file.push_str(".dust");
        }
        let path = Path::new(&file);

        let direct = base
            .filter(|_| path.is_relative())
            .map(|base| base.join(path))
            .into_iter()
            .chain(Some(path.to_path_buf()));
        for candidate in direct {
            if candidate.is_file() {
                return candidate.canonicalize().ok();
            }
        }

        let normalized = normalize(path);
        let suffix = format!(
            "/{}",
            normalized.trim_start_matches("./").trim_start_matches('/')
        );
        self.index()
            .iter()
            .find(|p| normalize(p).ends_with(&suffix))
            .cloned()
    }

    fn index(&self) -> &[PathBuf] {
        self.index.get_or_init(|| {
            let mut files = Vec::new();
            for dir in &self.directories {
                let dir = match dir.canonicalize() {
                    Ok(dir) => dir,
                    Err(err) => {
                        debug!(dir = %dir.display(), "skipping template directory: {err}");
                        continue;
                    }
                };
                let walker = WalkDir::new(&dir).follow_links(true).sort_by_file_name();
                for entry in walker.into_iter().filter_map(|e| e.ok()) {
                    let path = entry.path();
                    if path.is_file() && path.extension().map_or(false, |ext| ext == "dust") {
                        files.push(path.to_path_buf());
                    }
                }
            }
            debug!(templates = files.len(), "built template index");
            files
        })
    }
}

fn normalize(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
