use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use anyhow::Context;

/// Size and modification time of a servable file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMetadata {
    pub size: u64,
    pub modified: SystemTime,
}

/// A file that exists, is readable, and lies inside the document root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    /// The target joined onto the root, symlinks left in place, so the
    /// requested name decides the content type.
    pub path: PathBuf,
    pub metadata: FileMetadata,
}

/// Resolves request targets to files under a fixed document root.
#[derive(Debug, Clone)]
pub struct FileResolver {
    doc_root: PathBuf,
}

impl FileResolver {
    /// The root is canonicalised once so that containment checks compare
    /// like with like.
    pub fn new(doc_root: impl AsRef<Path>) -> anyhow::Result<Self> {
        let doc_root = doc_root.as_ref();
        let canonical = std::fs::canonicalize(doc_root)
            .with_context(|| format!("cannot resolve document root {}", doc_root.display()))?;
        if !canonical.is_dir() {
            anyhow::bail!("document root {} is not a directory", canonical.display());
        }
        Ok(Self {
            doc_root: canonical,
        })
    }

    pub fn doc_root(&self) -> &Path {
        &self.doc_root
    }

    /// Joins `target` onto the document root, resolving `.` and `..`
    /// lexically, and returns the result only if it is still inside the root.
    pub fn join(&self, target: &str) -> Option<PathBuf> {
        let joined = clean_join(&self.doc_root, target);
        joined.starts_with(&self.doc_root).then_some(joined)
    }

    /// Looks up the file for `target`. `None` means Not Found, whatever the cause.
    pub async fn resolve(&self, target: &str) -> Option<ResolvedFile> {
        let Some(joined) = self.join(target) else {
            tracing::debug!("target" = target, "target escapes document root");
            return None;
        };

        let canonical = match tokio::fs::canonicalize(&joined).await {
            Ok(path) => path,
            Err(e) => {
                tracing::debug!(path = %joined.display(), error = %e, "file not found");
                return None;
            }
        };
        if !canonical.starts_with(&self.doc_root) {
            tracing::debug!(path = %canonical.display(), "symlink escapes document root");
            return None;
        }

        let meta = tokio::fs::metadata(&canonical).await.ok()?;
        if !meta.is_file() {
            return None;
        }
        if let Err(e) = tokio::fs::File::open(&canonical).await {
            tracing::debug!(path = %canonical.display(), error = %e, "file not readable");
            return None;
        }

        Some(ResolvedFile {
            path: joined,
            metadata: FileMetadata {
                size: meta.len(),
                modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            },
        })
    }
}

/// Appends the components of `target` to `root`, applying `..` as a pop.
///
/// `..` may climb above `root`; callers decide whether the result is acceptable.
fn clean_join(root: &Path, target: &str) -> PathBuf {
    let mut out = root.to_path_buf();
    for component in Path::new(target).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    out
}
