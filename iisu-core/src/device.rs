//! Copy generated output to an Android device over `adb`.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{ArtError, Result};

/// Where the iiSU launcher reads per-game media on device.
pub const DEFAULT_DEVICE_BASE: &str =
    "/sdcard/Android/media/com.iisulauncher/iiSULauncher/assets/media/roms/consoles";

const DEVICES_TIMEOUT: Duration = Duration::from_secs(10);
const MKDIR_TIMEOUT: Duration = Duration::from_secs(30);
const PUSH_TIMEOUT: Duration = Duration::from_secs(60);

/// One file to copy, grouped by its remote game directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushOp {
    /// Source file under the output directory.
    pub local: PathBuf,
    /// Device directory that must exist before the push.
    pub remote_dir: String,
    /// Full device path of the copied file.
    pub remote: String,
}

/// Counts from a device push.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushReport {
    /// Files pushed successfully.
    pub copied: usize,
    /// Failed `mkdir` or `push` calls.
    pub errors: usize,
}

fn sorted_children(dir: &Path, want_dirs: bool) -> Vec<PathBuf> {
    let mut out: Vec<PathBuf> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .flatten()
                .map(|e| e.path())
                .filter(|p| p.is_dir() == want_dirs && (want_dirs || p.is_file()))
                .collect()
        })
        .unwrap_or_default();
    out.sort();
    out
}

fn name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Every `{platform}/{game}/{file}` under `output_dir`, mapped below `base`.
pub fn plan_push(output_dir: &Path, base: &str) -> Vec<PushOp> {
    let base = base.trim_end_matches('/');
    let mut ops = Vec::new();
    for platform in sorted_children(output_dir, true) {
        for game in sorted_children(&platform, true) {
            let remote_dir = format!("{base}/{}/{}", name_of(&platform), name_of(&game));
            for file in sorted_children(&game, false) {
                ops.push(PushOp {
                    remote: format!("{remote_dir}/{}", name_of(&file)),
                    remote_dir: remote_dir.clone(),
                    local: file,
                });
            }
        }
    }
    ops
}

/// Serials of devices in the `device` state from `adb devices` output.
pub fn parse_devices(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .skip(1)
        .filter_map(|line| {
            let mut cols = line.split_whitespace();
            match (cols.next(), cols.next()) {
                (Some(serial), Some("device")) => Some(serial.to_string()),
                _ => None,
            }
        })
        .collect()
}

fn platform_tools_dirs() -> Vec<PathBuf> {
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from);
    let Some(home) = home else {
        return Vec::new();
    };
    vec![
        home.join("Android/Sdk/platform-tools"),
        home.join(".android/platform-tools"),
        home.join("Library/Android/sdk/platform-tools"),
        home.join("Library/Android/platform-tools"),
        home.join("AppData/Local/Android/Sdk/platform-tools"),
    ]
}

/// Handle to a located `adb` binary.
#[derive(Debug, Clone)]
pub struct Adb {
    path: PathBuf,
}

impl Adb {
    /// Wrap an `adb` binary at `path`.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// `adb` on `PATH`, else in the usual platform-tools folders.
    pub fn locate() -> Result<Self> {
        if let Ok(path) = which::which("adb") {
            return Ok(Self::new(path));
        }
        let exe = if cfg!(windows) { "adb.exe" } else { "adb" };
        platform_tools_dirs()
            .into_iter()
            .map(|dir| dir.join(exe))
            .find(|p| p.is_file())
            .map(Self::new)
            .ok_or_else(|| ArtError::NotFound("adb (install Android platform-tools)".into()))
    }

    /// Path of the `adb` binary.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn run<I, S>(&self, args: I, timeout: Duration) -> Result<Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&self.path);
        cmd.args(args).kill_on_drop(true);
        match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(output) => Ok(output?),
            Err(_) => Err(ArtError::Internal(format!(
                "adb timed out after {}s",
                timeout.as_secs()
            ))),
        }
    }

    /// Serials of devices in the `device` state.
    pub async fn devices(&self) -> Result<Vec<String>> {
        let output = self.run(["devices"], DEVICES_TIMEOUT).await?;
        Ok(parse_devices(&String::from_utf8_lossy(&output.stdout)))
    }

    /// Push every generated game folder to `base` on the connected device.
    pub async fn push_output(&self, output_dir: &Path, base: &str) -> Result<PushReport> {
        let devices = self.devices().await?;
        if devices.is_empty() {
            return Err(ArtError::NotFound(
                "connected adb device (enable USB debugging)".into(),
            ));
        }
        info!("[device] {} device(s) connected", devices.len());
        if !output_dir.is_dir() {
            return Err(ArtError::NotFound(format!(
                "output directory {}",
                output_dir.display()
            )));
        }

        let mut report = PushReport::default();
        let mut last_dir: Option<String> = None;
        let mut dir_ok = false;
        for op in plan_push(output_dir, base) {
            if last_dir.as_deref() != Some(op.remote_dir.as_str()) {
                dir_ok = match self
                    .run(["shell", "mkdir", "-p", op.remote_dir.as_str()], MKDIR_TIMEOUT)
                    .await
                {
                    Ok(_) => true,
                    Err(err) => {
                        warn!("[device] mkdir {} failed: {}", op.remote_dir, err);
                        report.errors += 1;
                        false
                    }
                };
                last_dir = Some(op.remote_dir.clone());
            }
            if !dir_ok {
                continue;
            }

            let pushed = self
                .run(
                    [OsStr::new("push"), op.local.as_os_str(), OsStr::new(&op.remote)],
                    PUSH_TIMEOUT,
                )
                .await;
            match pushed {
                Ok(output) if output.status.success() => {
                    debug!("[device] pushed {}", op.remote);
                    report.copied += 1;
                }
                Ok(output) => {
                    warn!(
                        "[device] push {} failed: {}",
                        op.local.display(),
                        String::from_utf8_lossy(&output.stderr).trim()
                    );
                    report.errors += 1;
                }
                Err(err) => {
                    warn!("[device] push {} failed: {}", op.local.display(), err);
                    report.errors += 1;
                }
            }
        }
        info!(
            "[device] copied {} files ({} errors)",
            report.copied, report.errors
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_only_ready_devices() {
        let out = "List of devices attached\nR58M12345\tdevice\nemulator-5554\toffline\n0123\tunauthorized\n\n";
        assert_eq!(parse_devices(out), vec!["R58M12345"]);
        assert!(parse_devices("List of devices attached\n").is_empty());
    }

    #[test]
    fn plans_platform_game_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let game = dir.path().join("nes/Metroid");
        std::fs::create_dir_all(&game).unwrap();
        std::fs::write(game.join("icon.jpg"), b"x").unwrap();
        std::fs::write(game.join("title.jpg"), b"x").unwrap();
        std::fs::write(dir.path().join("stray.txt"), b"x").unwrap();

        let ops = plan_push(dir.path(), "/sdcard/roms/");
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].remote_dir, "/sdcard/roms/nes/Metroid");
        assert_eq!(ops[0].remote, "/sdcard/roms/nes/Metroid/icon.jpg");
        assert_eq!(ops[1].local, game.join("title.jpg"));
    }
}
