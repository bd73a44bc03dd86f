/*
 * Hands the merged artifact to the platform's PDF path and schedules its
 * removal. The core stops at producing the artifact; this module is the
 * thin, platform-specific edge: the document is opened with the OS default
 * viewer (whose print action takes over from there), and the temporary file
 * is deleted after a fixed delay on a detached thread. This is best-effort,
 * not guaranteed if the process exits first.
 */
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;
use std::time::Duration;

/// Delay before the dispatched artifact is removed from disk.
pub const ARTIFACT_CLEANUP_DELAY: Duration = Duration::from_secs(30);

#[cfg(target_os = "macos")]
pub fn open_with_default_viewer(path: &Path) -> io::Result<()> {
    Command::new("open").arg(path).spawn()?;
    Ok(())
}

#[cfg(target_os = "windows")]
pub fn open_with_default_viewer(path: &Path) -> io::Result<()> {
    Command::new("cmd")
        .args(["/C", "start", ""])
        .arg(path)
        .spawn()?;
    Ok(())
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub fn open_with_default_viewer(path: &Path) -> io::Result<()> {
    Command::new("xdg-open").arg(path).spawn()?;
    Ok(())
}

/*
 * Deletes `path` after `delay` on a detached thread. Deletion errors are
 * logged, not surfaced: by then the print job has been handed off and
 * there is nobody left to ask.
 */
pub fn remove_after_delay(path: PathBuf, delay: Duration) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        thread::sleep(delay);
        if !path.exists() {
            return;
        }
        match fs::remove_file(&path) {
            Ok(()) => log::debug!("Dispatch: Removed artifact {path:?}."),
            Err(e) => log::warn!("Dispatch: Failed to remove artifact {path:?}: {e}"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_remove_after_delay_deletes_the_artifact() {
        let dir = tempdir().unwrap();
        let artifact = dir.path().join("combined.pdf");
        fs::write(&artifact, b"%PDF").unwrap();

        let handle = remove_after_delay(artifact.clone(), Duration::from_millis(10));
        handle.join().unwrap();

        assert!(!artifact.exists());
    }

    #[test]
    fn test_remove_after_delay_tolerates_missing_file() {
        let dir = tempdir().unwrap();
        let artifact = dir.path().join("never_written.pdf");

        let handle = remove_after_delay(artifact, Duration::from_millis(1));

        handle.join().unwrap();
    }
}
