use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Atomically write content to a file
///
/// Writes a hidden temporary file next to the target, syncs it, then renames
/// it over the target. Readers such as a running agent never observe a
/// half-written catalog or state file.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    // Create parent directory if it doesn't exist
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_directory_exists(parent)?;
    }

    let temp_path = temp_path_for(path)?;

    {
        let mut file = File::create(&temp_path)
            .with_context(|| format!("Failed to create temporary file: {}", temp_path.display()))?;

        file.write_all(content).context("Failed to write to temporary file")?;

        file.sync_all().context("Failed to sync file to disk")?;
    }

    // Rename to target path (atomic operation)
    std::fs::rename(&temp_path, path).with_context(|| {
        format!("Failed to rename {} to {}", temp_path.display(), path.display())
    })?;

    Ok(())
}

/// `.<name>.tmp` in the same directory, so the rename never crosses filesystems
fn temp_path_for(path: &Path) -> Result<PathBuf> {
    let name = path
        .file_name()
        .with_context(|| format!("Not a file path: {}", path.display()))?;

    let mut temp_name = std::ffi::OsString::from(".");
    temp_name.push(name);
    temp_name.push(".tmp");

    Ok(path.with_file_name(temp_name))
}

/// Ensure a directory exists, creating it and all parents if needed.
///
/// Newly created directories are private to the user.
pub fn ensure_directory_exists(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }

    std::fs::create_dir_all(path)
        .with_context(|| format!("Failed to create directory: {}", path.display()))?;

    set_file_permissions(path, 0o700)
}

/// Set file permissions to a specific mode (Unix only, no-op elsewhere)
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
        let _ = (path, mode);
    }

    Ok(())
}
