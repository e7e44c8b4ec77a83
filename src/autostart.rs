//! Start-at-login registration
//!
//! Linux uses an XDG autostart `.desktop` entry, macOS a LaunchAgent plist,
//! Windows a script in the user's Startup folder. Registration is "the entry
//! file exists".

use crate::constants::{APP_NAME, LAUNCH_AGENT_LABEL};
use anyhow::{bail, Context, Result};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// OS collaborator the settings surface drives
pub trait Autostart {
    fn is_registered(&self) -> bool;
    fn set_registered(&mut self, enabled: bool) -> Result<()>;
}

/// Kind of entry written for the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryFormat {
    DesktopEntry,
    LaunchAgent,
    StartupScript,
}

impl EntryFormat {
    pub fn current() -> Option<Self> {
        if cfg!(target_os = "linux") {
            Some(Self::DesktopEntry)
        } else if cfg!(target_os = "macos") {
            Some(Self::LaunchAgent)
        } else if cfg!(target_os = "windows") {
            Some(Self::StartupScript)
        } else {
            None
        }
    }

    /// Default location of the entry for this format
    pub fn default_path(self) -> Option<PathBuf> {
        match self {
            Self::DesktopEntry => {
                dirs::config_dir().map(|d| d.join("autostart").join("standup.desktop"))
            }
            Self::LaunchAgent => dirs::home_dir().map(|d| {
                d.join("Library")
                    .join("LaunchAgents")
                    .join(format!("{}.plist", LAUNCH_AGENT_LABEL))
            }),
            Self::StartupScript => dirs::data_dir().map(|d| {
                d.join("Microsoft")
                    .join("Windows")
                    .join("Start Menu")
                    .join("Programs")
                    .join("Startup")
                    .join("standup.cmd")
            }),
        }
    }

    /// File contents that launch `executable` at login
    pub fn contents(self, executable: &Path) -> String {
        let exe = executable.display();
        match self {
            Self::DesktopEntry => format!(
                "[Desktop Entry]\n\
                 Type=Application\n\
                 Exec=\"{exe}\"\n\
                 Hidden=false\n\
                 NoDisplay=false\n\
                 X-GNOME-Autostart-enabled=true\n\
                 Name={APP_NAME}\n"
            ),
            Self::LaunchAgent => format!(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>{LAUNCH_AGENT_LABEL}</string>
    <key>ProgramArguments</key>
    <array>
        <string>{exe}</string>
    </array>
    <key>RunAtLoad</key>
    <true/>
</dict>
</plist>
"#
            ),
            Self::StartupScript => format!("@echo off\r\nstart \"\" \"{exe}\"\r\n"),
        }
    }
}

/// Autostart backed by the platform's login-item file
#[derive(Debug, Clone)]
pub struct SystemAutostart {
    format: EntryFormat,
    entry_path: Option<PathBuf>,
    executable: PathBuf,
}

impl SystemAutostart {
    /// Entry for the running executable at the platform's default location
    pub fn new() -> Result<Self> {
        let executable =
            std::env::current_exe().context("Failed to locate the running executable")?;
        let format = EntryFormat::current().unwrap_or(EntryFormat::DesktopEntry);
        let entry_path = EntryFormat::current().and_then(EntryFormat::default_path);
        if entry_path.is_none() {
            warn!("Autostart is not available on this platform");
        }
        Ok(Self {
            format,
            entry_path,
            executable,
        })
    }

    /// Entry at an explicit location
    pub fn with_path(format: EntryFormat, entry_path: PathBuf, executable: PathBuf) -> Self {
        Self {
            format,
            entry_path: Some(entry_path),
            executable,
        }
    }

    pub fn entry_path(&self) -> Option<&Path> {
        self.entry_path.as_deref()
    }
}

impl Autostart for SystemAutostart {
    fn is_registered(&self) -> bool {
        self.entry_path.as_deref().is_some_and(Path::exists)
    }

    fn set_registered(&mut self, enabled: bool) -> Result<()> {
        let Some(path) = self.entry_path.as_deref() else {
            bail!("Autostart is not supported on this platform");
        };

        if enabled {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create autostart directory: {}", parent.display())
                })?;
            }
            fs::write(path, self.format.contents(&self.executable)).with_context(|| {
                format!("Failed to write autostart entry: {}", path.display())
            })?;
            info!("Autostart registered: {}", path.display());
        } else if path.exists() {
            fs::remove_file(path).with_context(|| {
                format!("Failed to remove autostart entry: {}", path.display())
            })?;
            info!("Autostart removed: {}", path.display());
        }
        Ok(())
    }
}
