use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::constants::WORKSPACE_PREFIX;

/// Ephemeral working directory for a single execution.
///
/// The directory name carries a fresh UUID, so concurrent executions never
/// share a path. It is removed when the guard is dropped, whichever way the
/// execution ends.
#[derive(Debug)]
pub struct Workspace {
    dir: PathBuf,
}

impl Workspace {
    pub async fn create(root: &Path) -> std::io::Result<Self> {
        let dir = root.join(format!("{}-{}", WORKSPACE_PREFIX, Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await?;
        tracing::trace!("Created workspace {}", dir.display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub async fn write_file(&self, file_name: &str, content: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.join(file_name);
        tokio::fs::write(&path, content).await?;
        Ok(path)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.dir) {
            tracing::warn!("Failed to remove workspace {}: {}", self.dir.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_workspace_is_removed_on_drop() {
        let root = std::env::temp_dir();
        let workspace = Workspace::create(&root).await.unwrap();
        let file = workspace.write_file("main.py", "print(1)").await.unwrap();
        let dir = workspace.path().to_path_buf();

        assert!(file.exists());
        drop(workspace);
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_workspaces_never_collide() {
        let root = std::env::temp_dir();
        let a = Workspace::create(&root).await.unwrap();
        let b = Workspace::create(&root).await.unwrap();

        assert_ne!(a.path(), b.path());
    }

    #[tokio::test]
    async fn test_unwritable_root_fails() {
        // /proc is read-only
        let result = Workspace::create(Path::new("/proc")).await;

        assert!(result.is_err());
    }
}
