use std::fs;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

/// Pacing and error parameters for a single typing run.
///
/// Percentages are in `[0, 100]`. Duration ranges are `(min, max)` in seconds.
/// Unknown keys in a settings file are ignored; missing keys take the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub total_minutes: f64,
    pub wpm: f64,
    pub error_rate: f64,
    pub correction_delay: f64,
    pub thinking_chance: f64,
    pub thinking_duration: (f64, f64),
    pub afk_chance: f64,
    pub afk_duration: (f64, f64),
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            total_minutes: 20.0,
            wpm: 65.0,
            error_rate: 4.0,
            correction_delay: 50.0,
            thinking_chance: 5.0,
            thinking_duration: (2.0, 6.0),
            afk_chance: 2.0,
            afk_duration: (30.0, 180.0),
        }
    }
}

impl Settings {
    pub fn total_seconds(&self) -> f64 {
        self.total_minutes * 60.0
    }

    /// Copy every profile parameter over `self`, keeping the target duration.
    pub fn with_profile(self, profile: Profile) -> Self {
        Self {
            total_minutes: self.total_minutes,
            ..profile.settings()
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.total_minutes.is_finite(), "total_minutes must be finite");
        ensure!(self.total_minutes > 0.0, "total_minutes must be > 0");
        ensure!(self.wpm.is_finite(), "wpm must be finite");
        ensure!(self.wpm > 0.0, "wpm must be > 0");

        for (name, value) in [
            ("error_rate", self.error_rate),
            ("correction_delay", self.correction_delay),
            ("thinking_chance", self.thinking_chance),
            ("afk_chance", self.afk_chance),
        ] {
            ensure!(
                (0.0..=100.0).contains(&value),
                "{name} must be between 0 and 100"
            );
        }

        for (name, (min, max)) in [
            ("thinking_duration", self.thinking_duration),
            ("afk_duration", self.afk_duration),
        ] {
            ensure!(
                min.is_finite() && max.is_finite(),
                "{name} bounds must be finite"
            );
            ensure!(min >= 0.0, "{name} minimum must be >= 0");
            ensure!(min <= max, "{name} minimum must be <= maximum");
        }

        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json =
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("failed to parse settings JSON in {}", path.display()))
    }
}

/// Built-in typing personalities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Profile {
    CarefulStudent,
    SloppyRusher,
    MethodicalWriter,
}

impl Profile {
    pub const ALL: [Profile; 3] = [
        Profile::CarefulStudent,
        Profile::SloppyRusher,
        Profile::MethodicalWriter,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Profile::CarefulStudent => "The Careful Student",
            Profile::SloppyRusher => "The Sloppy Rusher",
            Profile::MethodicalWriter => "The Methodical Writer",
        }
    }

    pub fn settings(self) -> Settings {
        let base = Settings::default();
        match self {
            Profile::CarefulStudent => Settings {
                wpm: 55.0,
                error_rate: 2.0,
                correction_delay: 0.0,
                thinking_chance: 5.0,
                thinking_duration: (2.0, 5.0),
                afk_chance: 2.0,
                afk_duration: (30.0, 90.0),
                ..base
            },
            Profile::SloppyRusher => Settings {
                wpm: 110.0,
                error_rate: 10.0,
                correction_delay: 0.0,
                thinking_chance: 1.0,
                thinking_duration: (1.0, 2.0),
                afk_chance: 0.0,
                afk_duration: (0.0, 0.0),
                ..base
            },
            Profile::MethodicalWriter => Settings {
                wpm: 70.0,
                error_rate: 5.0,
                correction_delay: 50.0,
                thinking_chance: 10.0,
                thinking_duration: (4.0, 10.0),
                afk_chance: 5.0,
                afk_duration: (60.0, 180.0),
                ..base
            },
        }
    }
}
