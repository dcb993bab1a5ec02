//! TOML-based application configuration.
//!
//! Stores user preferences:
//! - Metronome tempo and meter a new metronome starts with
//! - Pomodoro durations and long-break cadence
//! - Sound on/off and volume
//!
//! Configuration is stored at `~/.config/tempodoro/config.toml`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::{ConfigError, Result};
use crate::metronome::{MetronomeEngine, DEFAULT_BEATS_PER_MEASURE, DEFAULT_BPM};
use crate::timer::{PomodoroEngine, PomodoroSettings};

/// Metronome defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetronomeConfig {
    #[serde(default = "default_bpm")]
    pub bpm: u32,
    #[serde(default = "default_beats_per_measure")]
    pub beats_per_measure: u32,
}

/// Pomodoro durations in minutes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PomodoroConfig {
    #[serde(default = "default_work_minutes")]
    pub work_minutes: u32,
    #[serde(default = "default_break_minutes")]
    pub break_minutes: u32,
    #[serde(default = "default_long_break_minutes")]
    pub long_break_minutes: u32,
    #[serde(default = "default_sessions_before_long_break")]
    pub sessions_before_long_break: u32,
}

/// Sound configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 0-100, scales every tone's gain.
    #[serde(default = "default_volume")]
    pub volume: u32,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/tempodoro/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub metronome: MetronomeConfig,
    #[serde(default)]
    pub pomodoro: PomodoroConfig,
    #[serde(default)]
    pub sound: SoundConfig,
}

// Default functions
fn default_bpm() -> u32 {
    DEFAULT_BPM
}
fn default_beats_per_measure() -> u32 {
    DEFAULT_BEATS_PER_MEASURE
}
fn default_work_minutes() -> u32 {
    25
}
fn default_break_minutes() -> u32 {
    5
}
fn default_long_break_minutes() -> u32 {
    15
}
fn default_sessions_before_long_break() -> u32 {
    4
}
fn default_true() -> bool {
    true
}
fn default_volume() -> u32 {
    100
}

impl Default for MetronomeConfig {
    fn default() -> Self {
        Self {
            bpm: default_bpm(),
            beats_per_measure: default_beats_per_measure(),
        }
    }
}

impl Default for PomodoroConfig {
    fn default() -> Self {
        Self {
            work_minutes: default_work_minutes(),
            break_minutes: default_break_minutes(),
            long_break_minutes: default_long_break_minutes(),
            sessions_before_long_break: default_sessions_before_long_break(),
        }
    }
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            volume: default_volume(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
                    ),
                    serde_json::Value::Number(_) => {
                        let n = value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                        serde_json::Value::Number(n.into())
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        return Err(invalid("not a leaf value".to_string()));
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing the defaults on first run.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Self::parse(&content)?),
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Parse TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<()> {
        let path = Self::path()?;
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, content).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value in memory by dot-separated key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not parse
    /// as the key's type.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self)
            .map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Set a config value by key and persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.apply(key, value)?;
        self.save()
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default configuration");
            Self::default()
        })
    }

    /// Pomodoro settings, clamped to the supported ranges.
    pub fn pomodoro_settings(&self) -> PomodoroSettings {
        PomodoroSettings::new(
            self.pomodoro.work_minutes,
            self.pomodoro.break_minutes,
            self.pomodoro.long_break_minutes,
            self.pomodoro.sessions_before_long_break,
        )
    }

    /// A fresh Pomodoro engine with the configured durations.
    pub fn pomodoro_engine(&self) -> PomodoroEngine {
        PomodoroEngine::new(self.pomodoro_settings())
    }

    /// A stopped metronome with the configured tempo. An unsupported meter
    /// in the file falls back to the default meter.
    pub fn metronome_engine(&self) -> MetronomeEngine {
        MetronomeEngine::with_tempo(self.metronome.bpm, self.metronome.beats_per_measure)
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "ignoring configured meter");
                let mut engine = MetronomeEngine::new();
                engine.set_bpm(self.metronome.bpm);
                engine
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed = Config::parse(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
        assert_eq!(parsed.metronome.bpm, 120);
        assert_eq!(parsed.pomodoro.work_minutes, 25);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let cfg = Config::parse("[pomodoro]\nwork_minutes = 50\n").unwrap();
        assert_eq!(cfg.pomodoro.work_minutes, 50);
        assert_eq!(cfg.pomodoro.break_minutes, 5);
        assert_eq!(cfg.metronome.beats_per_measure, 4);
        assert!(cfg.sound.enabled);
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(matches!(
            Config::parse("metronome = 3 = 4"),
            Err(ConfigError::ParseFailed(_))
        ));
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("sound.enabled").as_deref(), Some("true"));
        assert_eq!(cfg.get("pomodoro.work_minutes").as_deref(), Some("25"));
        assert!(cfg.get("sound.missing_key").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn apply_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.apply("sound.enabled", "false").unwrap();
        cfg.apply("metronome.bpm", "96").unwrap();
        assert!(!cfg.sound.enabled);
        assert_eq!(cfg.metronome.bpm, 96);
    }

    #[test]
    fn apply_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.apply("sound.nonexistent_key", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(cfg.apply("sound", "1"), Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn apply_rejects_invalid_type() {
        let mut cfg = Config::default();
        assert!(cfg.apply("sound.enabled", "not_a_bool").is_err());
        assert!(cfg.apply("metronome.bpm", "-5").is_err());
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn engines_follow_config() {
        let mut cfg = Config::default();
        cfg.pomodoro.work_minutes = 90;
        cfg.metronome.bpm = 72;
        cfg.metronome.beats_per_measure = 5;

        let pomodoro = cfg.pomodoro_engine();
        assert_eq!(pomodoro.settings().work_minutes, 60);
        assert_eq!(pomodoro.time_left_secs(), 3600);

        let metronome = cfg.metronome_engine();
        assert_eq!(metronome.bpm(), 72);
        assert_eq!(metronome.beats_per_measure(), 4);
    }
}
