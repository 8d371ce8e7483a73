//! Trigger installers: the user crontab entry and the desktop autostart hook.
//!
//! Cron runs `run-daily` at 06:00 on weekdays but does not fire while the
//! machine is off; the autostart entry runs `run-on-startup` at login so a
//! missed tick is recovered.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use devmemory_core::{DevMemoryError, Result};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Marker appended to the crontab line so it can be found again.
pub const CRON_MARKER: &str = "# devmemory:run-daily";

/// Weekdays at 06:00.
pub const CRON_SCHEDULE: &str = "0 6 * * 1-5";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed,
    AlreadyInstalled,
    Removed,
    NotFound,
}

/// The crontab line that runs the daily job.
pub fn cron_line(exe: &Path) -> String {
    format!("{CRON_SCHEDULE} {} run-daily {CRON_MARKER}", exe.display())
}

/// Append `line` unless a marked entry already exists. Returns the new
/// crontab text, or `None` when nothing changes.
pub fn add_cron_line(existing: &str, line: &str) -> Option<String> {
    if existing.lines().any(|l| l.contains(CRON_MARKER)) {
        return None;
    }
    let mut lines: Vec<&str> = existing
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty())
        .collect();
    lines.push(line);
    Some(lines.join("\n") + "\n")
}

/// Drop every marked entry. Returns `None` when no entry was present.
pub fn remove_cron_lines(existing: &str) -> Option<String> {
    let total = existing.lines().count();
    let kept: Vec<&str> = existing
        .lines()
        .filter(|l| !l.contains(CRON_MARKER))
        .collect();
    if kept.len() == total {
        return None;
    }
    let body: Vec<&str> = kept
        .into_iter()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty())
        .collect();
    if body.is_empty() {
        Some(String::new())
    } else {
        Some(body.join("\n") + "\n")
    }
}

async fn read_crontab() -> Result<String> {
    let output = Command::new("crontab")
        .arg("-l")
        .output()
        .await
        .map_err(|e| DevMemoryError::Config(format!("crontab command not available: {e}")))?;
    // `crontab -l` exits non-zero when the user has no crontab yet.
    if !output.status.success() {
        return Ok(String::new());
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

async fn write_crontab(content: &str) -> Result<()> {
    let mut child = Command::new("crontab")
        .arg("-")
        .stdin(Stdio::piped())
        .spawn()
        .map_err(|e| DevMemoryError::Config(format!("crontab command not available: {e}")))?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(content.as_bytes()).await?;
    }
    let status = child.wait().await?;
    if !status.success() {
        return Err(DevMemoryError::Config(format!("crontab exited with {status}")));
    }
    Ok(())
}

pub async fn install_cron_job(exe: &Path) -> Result<InstallOutcome> {
    let existing = read_crontab().await?;
    match add_cron_line(&existing, &cron_line(exe)) {
        Some(updated) => {
            write_crontab(&updated).await?;
            tracing::info!("⏰ Cron job installed: {}", cron_line(exe));
            Ok(InstallOutcome::Installed)
        }
        None => Ok(InstallOutcome::AlreadyInstalled),
    }
}

pub async fn remove_cron_job() -> Result<InstallOutcome> {
    let existing = read_crontab().await?;
    match remove_cron_lines(&existing) {
        Some(updated) => {
            write_crontab(&updated).await?;
            tracing::info!("🗑️ Cron job removed");
            Ok(InstallOutcome::Removed)
        }
        None => Ok(InstallOutcome::NotFound),
    }
}

/// Default autostart entry (~/.config/autostart/devmemory.desktop).
pub fn startup_entry_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("autostart")
        .join("devmemory.desktop")
}

pub fn desktop_entry(exe: &Path) -> String {
    [
        "[Desktop Entry]".to_string(),
        "Type=Application".to_string(),
        format!("Exec={} run-on-startup", exe.display()),
        "Hidden=false".to_string(),
        "NoDisplay=false".to_string(),
        "X-GNOME-Autostart-enabled=true".to_string(),
        "Name=DevMemory Startup".to_string(),
        String::new(),
    ]
    .join("\n")
}

pub fn install_startup_hook(entry_path: &Path, exe: &Path) -> Result<InstallOutcome> {
    let content = desktop_entry(exe);
    if std::fs::read_to_string(entry_path).is_ok_and(|current| current == content) {
        return Ok(InstallOutcome::AlreadyInstalled);
    }
    if let Some(parent) = entry_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(entry_path, content)?;
    tracing::info!("🔌 Startup hook installed at {}", entry_path.display());
    Ok(InstallOutcome::Installed)
}

pub fn remove_startup_hook(entry_path: &Path) -> Result<InstallOutcome> {
    if !entry_path.exists() {
        return Ok(InstallOutcome::NotFound);
    }
    std::fs::remove_file(entry_path)?;
    tracing::info!("🗑️ Startup hook removed");
    Ok(InstallOutcome::Removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXE: &str = "/usr/local/bin/devmemory";

    #[test]
    fn test_add_is_idempotent() {
        let line = cron_line(Path::new(EXE));
        let first = add_cron_line("MAILTO=me\n\n", &line).unwrap();
        assert_eq!(first, format!("MAILTO=me\n{line}\n"));
        assert!(add_cron_line(&first, &line).is_none());
    }

    #[test]
    fn test_cron_line_format() {
        assert_eq!(
            cron_line(Path::new(EXE)),
            "0 6 * * 1-5 /usr/local/bin/devmemory run-daily # devmemory:run-daily"
        );
    }

    #[test]
    fn test_remove_when_missing() {
        assert!(remove_cron_lines("").is_none());
        assert!(remove_cron_lines("0 1 * * * backup\n").is_none());
    }

    #[test]
    fn test_remove_keeps_other_entries() {
        let existing = format!("0 1 * * * backup\n{}\n", cron_line(Path::new(EXE)));
        assert_eq!(remove_cron_lines(&existing).unwrap(), "0 1 * * * backup\n");
        assert_eq!(remove_cron_lines(&cron_line(Path::new(EXE))).unwrap(), "");
    }

    #[test]
    fn test_startup_hook_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let entry = dir.path().join("autostart").join("devmemory.desktop");
        let exe = Path::new(EXE);

        assert_eq!(install_startup_hook(&entry, exe).unwrap(), InstallOutcome::Installed);
        assert_eq!(
            install_startup_hook(&entry, exe).unwrap(),
            InstallOutcome::AlreadyInstalled
        );
        let content = std::fs::read_to_string(&entry).unwrap();
        assert!(content.contains("Exec=/usr/local/bin/devmemory run-on-startup"));

        assert_eq!(remove_startup_hook(&entry).unwrap(), InstallOutcome::Removed);
        assert_eq!(remove_startup_hook(&entry).unwrap(), InstallOutcome::NotFound);
    }
}
