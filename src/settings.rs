use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use crate::aggregation::AggregationConfig;
use crate::annotate::OverlayStyle;
use crate::pipeline::LoopConfig;

const DEBUG_ENV: &str = "FACESENTIMENT_DEBUG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    pub device_index: u32,
    pub frame_delay_ms: u64,
    pub aggregation_interval_secs: u64,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            device_index: 0,
            frame_delay_ms: 50,
            aggregation_interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerSettings {
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:5005".into(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlaySettings {
    pub banner_height: u32,
    pub banner_opacity: f32,
    pub line_pitch: i32,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        let style = OverlayStyle::default();
        Self {
            banner_height: style.banner_height,
            banner_opacity: style.banner_opacity,
            line_pitch: style.line_pitch,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub output_dir: PathBuf,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub capture: CaptureSettings,
    pub analyzer: AnalyzerSettings,
    pub overlay: OverlaySettings,
    pub export: ExportSettings,
}

impl UserSettings {
    pub fn aggregation_config(&self) -> AggregationConfig {
        AggregationConfig::with_interval_secs(self.capture.aggregation_interval_secs)
    }

    pub fn overlay_style(&self) -> OverlayStyle {
        OverlayStyle {
            banner_height: self.overlay.banner_height,
            banner_opacity: self.overlay.banner_opacity.clamp(0.0, 1.0),
            line_pitch: self.overlay.line_pitch,
            ..OverlayStyle::default()
        }
    }

    pub fn analyzer_timeout(&self) -> Duration {
        Duration::from_secs(self.analyzer.timeout_secs)
    }

    /// Loop settings; `FACESENTIMENT_DEBUG=1` logs timings for every frame.
    pub fn loop_config(&self) -> LoopConfig {
        let mut config = LoopConfig {
            frame_delay: Duration::from_millis(self.capture.frame_delay_ms),
            aggregation: self.aggregation_config(),
            overlay: self.overlay_style(),
            ..LoopConfig::default()
        };
        if std::env::var(DEBUG_ENV).map(|v| v == "1").unwrap_or(false) {
            config.timings_every = 1;
        }
        config
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!(
                    "ignoring unreadable settings in {}: {}",
                    path.display(),
                    err
                );
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn current(&self) -> UserSettings {
        self.read().clone()
    }

    /// Apply `change` and persist the result.
    pub fn update<F>(&self, change: F) -> Result<UserSettings>
    where
        F: FnOnce(&mut UserSettings),
    {
        let mut guard = self.write();
        let mut next = guard.clone();
        change(&mut next);
        self.persist(&next)?;
        *guard = next.clone();
        Ok(next)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: UserSettings = serde_json::from_str(&contents)
            .with_context(|| format!("Invalid settings in {}", self.path.display()))?;
        *self.write() = data;
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        self.data
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
