use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Atomically write content to a file with the given permission mode
///
/// Writes to a temporary file in the same directory, syncs it to disk,
/// then renames it over the target path. The mode is applied to the
/// temporary file before any content is written.
pub fn atomic_write(path: &Path, content: &[u8], mode: u32) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }

    let temp_path = path.with_extension("tmp");

    {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(mode);
        }

        let mut file = options.open(&temp_path).with_context(|| {
            format!("Failed to create temporary file: {}", temp_path.display())
        })?;

        // A leftover temp file keeps its old mode; creation mode only applies to new files
        set_file_permissions(&temp_path, mode)?;

        file.write_all(content)
            .context("Failed to write to temporary file")?;

        file.sync_all().context("Failed to sync file to disk")?;
    }

    std::fs::rename(&temp_path, path).with_context(|| {
        format!(
            "Failed to rename {} to {}",
            temp_path.display(),
            path.display()
        )
    })?;

    Ok(())
}

/// Set file permissions to a specific mode (Unix only)
pub fn set_file_permissions(path: &Path, mode: u32) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let metadata = std::fs::metadata(path)
            .with_context(|| format!("Failed to get metadata for: {}", path.display()))?;

        let mut permissions = metadata.permissions();
        permissions.set_mode(mode);

        std::fs::set_permissions(path, permissions)
            .with_context(|| format!("Failed to set permissions for: {}", path.display()))?;
    }

    #[cfg(not(unix))]
    {
        // No POSIX modes; the file inherits the directory ACL
        let _ = (path, mode);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn atomic_write_creates_parents_and_content() {
        let temp_dir = tempdir().unwrap();
        let target = temp_dir.path().join("nested").join("path").join("config.toml");

        atomic_write(&target, b"nested content", 0o644).unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"nested content");
        assert!(!target.with_extension("tmp").exists());
    }

    #[test]
    fn atomic_write_replaces_existing_file() {
        let temp_dir = tempdir().unwrap();
        let target = temp_dir.path().join("config.toml");

        atomic_write(&target, b"first", 0o644).unwrap();
        atomic_write(&target, b"second", 0o644).unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "second");
    }

    #[cfg(unix)]
    #[test]
    fn set_file_permissions_applies_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempdir().unwrap();
        let target = temp_dir.path().join("secret");
        atomic_write(&target, b"token", 0o644).unwrap();

        set_file_permissions(&target, 0o600).unwrap();
        let mode = std::fs::metadata(&target).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn atomic_write_restricts_leftover_temp_file() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempdir().unwrap();
        let target = temp_dir.path().join("config.toml");
        let stale = target.with_extension("tmp");
        std::fs::write(&stale, b"stale").unwrap();
        set_file_permissions(&stale, 0o644).unwrap();

        atomic_write(&target, b"token = \"secret\"", 0o600).unwrap();

        let mode = std::fs::metadata(&target).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "token = \"secret\"");
    }
}
