//! Scheduler-relevant configuration: overclock enable/factor and the
//! sync-GPU-on-idle-skip flag, plus the determinism flag netplay/replay
//! sets. Stored as JSON in `<config_dir>/core-timing/config.json`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimingConfig {
    /// Whether the overclock factor below should be applied at all.
    /// When false, `oc_factor` is always latched to 1.0.
    pub overclock_enabled: bool,
    /// IPC scaling factor; > 1.0 means more instructions per cycle.
    pub overclock_factor: f32,
    /// If true, `Idle()` synchronously flushes the video FIFO before
    /// accounting for idle cycles, so VI timing doesn't desync.
    pub sync_gpu_on_idle_skip: bool,
    /// True while netplay/movie record-or-replay is active. Off-thread
    /// scheduling is a known desync hazard when this is set.
    pub determinism_required: bool,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            overclock_enabled: false,
            overclock_factor: 1.0,
            sync_gpu_on_idle_skip: false,
            determinism_required: false,
        }
    }
}

impl TimingConfig {
    /// Path to the config file, or `None` if no config directory is
    /// resolvable on this platform.
    pub fn config_path() -> Option<PathBuf> {
        dirs_config_dir().map(|d| d.join("core-timing").join("config.json"))
    }

    /// Load from disk, falling back to defaults if the file is missing
    /// or cannot be parsed. A parse failure is logged, never fatal.
    pub fn load() -> Self {
        let path = match Self::config_path() {
            Some(p) => p,
            None => return Self::default(),
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(cfg) => cfg,
                Err(e) => {
                    log::warn!("core-timing: cannot parse config, using defaults: {e}");
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("core-timing: cannot read config, using defaults: {e}");
                Self::default()
            }
        }
    }

    /// Save to disk, creating the config directory if needed. Errors are
    /// logged and swallowed; a failed save is not a reason to abort.
    pub fn save(&self) {
        let Some(path) = Self::config_path() else {
            return;
        };
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::warn!("core-timing: cannot create config dir: {e}");
                return;
            }
        }
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    log::warn!("core-timing: cannot write config: {e}");
                }
            }
            Err(e) => log::warn!("core-timing: cannot serialize config: {e}"),
        }
    }

    /// The effective overclock factor for a single Advance: 1.0 if
    /// overclocking is disabled, else the configured factor.
    pub fn effective_oc_factor(&self) -> f32 {
        if self.overclock_enabled {
            self.overclock_factor
        } else {
            1.0
        }
    }
}

/// Minimal stand-in for a directories/XDG crate: `$HOME/.config` on Unix,
/// `%APPDATA%` on Windows. The teacher resolves its config dir the same
/// way without pulling in the `dirs` crate.
fn dirs_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(PathBuf::from)
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_disables_overclock() {
        let cfg = TimingConfig::default();
        assert_eq!(cfg.effective_oc_factor(), 1.0);
    }

    #[test]
    fn effective_factor_respects_enable_flag() {
        let mut cfg = TimingConfig::default();
        cfg.overclock_factor = 2.0;
        assert_eq!(cfg.effective_oc_factor(), 1.0);
        cfg.overclock_enabled = true;
        assert_eq!(cfg.effective_oc_factor(), 2.0);
    }

    #[test]
    fn round_trips_through_json() {
        let cfg = TimingConfig {
            overclock_enabled: true,
            overclock_factor: 1.5,
            sync_gpu_on_idle_skip: true,
            determinism_required: true,
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: TimingConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }
}
