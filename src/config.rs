// SPDX-License-Identifier: GPL-3.0-only

//! Scanner options and config file loading
//!
//! [`ScannerOptions`] is what callers (and the JSON config file) provide;
//! every field has a default. It is resolved once against the decode
//! engine's [`SymbologyTable`] into an immutable [`ResolvedOptions`].

use crate::backends::camera::types::{Facing, MediaConstraints};
use crate::constants::{
    DEFAULT_DECODE_MAX_DIMENSION, DEFAULT_FPS, DEFAULT_MAX_ENGINE_ERRORS, MAX_FPS, timing,
};
use crate::errors::ConfigError;
use crate::frame_processor::{DecodeHints, Symbology, SymbologyTable};
use crate::media::PixelRect;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Config directory name under the user's config dir
const CONFIG_DIR: &str = "codescan";
const CONFIG_FILE: &str = "config.json";

/// Centered crop, as percentages of the frame size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetRegion {
    /// Width in percent of the frame width, in (0, 100]
    pub width: f64,
    /// Height in percent of the frame height, in (0, 100]
    pub height: f64,
}

impl TargetRegion {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    fn is_valid(&self) -> bool {
        let valid = |pct: f64| pct.is_finite() && pct > 0.0 && pct <= 100.0;
        valid(self.width) && valid(self.height)
    }

    /// Pixel rectangle of this region in a `frame_width` x `frame_height` frame
    pub fn crop_rect(&self, frame_width: u32, frame_height: u32) -> PixelRect {
        let scaled = |pct: f64, dim: u32| {
            ((pct / 100.0 * dim as f64).round() as u32).clamp(1, dim.max(1))
        };
        let width = scaled(self.width, frame_width);
        let height = scaled(self.height, frame_height);

        PixelRect {
            x: frame_width.saturating_sub(width) / 2,
            y: frame_height.saturating_sub(height) / 2,
            width,
            height,
        }
    }
}

impl std::str::FromStr for TargetRegion {
    type Err = ConfigError;

    /// Parse `WxH`, e.g. `60x40`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidRegion {
            width: f64::NAN,
            height: f64::NAN,
        };
        let (w, h) = s.split_once(['x', 'X']).ok_or_else(invalid)?;
        let width = w.trim().parse().map_err(|_| invalid())?;
        let height = h.trim().parse().map_err(|_| invalid())?;
        Ok(Self { width, height })
    }
}

/// Caller-supplied scanner options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerOptions {
    /// Decode attempts per second; rates above 60 are clamped to 60
    pub fps: f64,
    /// Camera orientation to prefer when no device is pinned
    pub preferred_camera: Facing,
    /// Symbologies to report; `None` means all the engine supports
    pub formats: Option<Vec<Symbology>>,
    /// Strip AIM prefixes, control characters and whitespace from results
    pub auto_normalize: bool,
    /// Raw constraints; these win over `preferred_camera`
    pub constraints: Option<MediaConstraints>,
    /// Only decode a centered part of the frame
    pub target_region: Option<TargetRegion>,
    /// Keep scanning after a hit instead of stopping at the first code
    pub continuous: bool,
    /// Consecutive engine errors before the error callback fires
    pub max_engine_errors: u32,
    /// How long to wait for the first frame, in milliseconds
    pub ready_timeout_ms: u64,
    /// Decode engine working size
    pub decode_max_dimension: u32,
    /// Let the engine spend extra passes per frame
    pub try_harder: bool,
}

impl Default for ScannerOptions {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            preferred_camera: Facing::default(),
            formats: None,
            auto_normalize: true,
            constraints: None,
            target_region: None,
            continuous: false,
            max_engine_errors: DEFAULT_MAX_ENGINE_ERRORS,
            ready_timeout_ms: timing::SURFACE_READY_TIMEOUT.as_millis() as u64,
            decode_max_dimension: DEFAULT_DECODE_MAX_DIMENSION,
            try_harder: false,
        }
    }
}

impl ScannerOptions {
    /// Validate and freeze these options for one scanner
    pub fn resolve(&self, table: &SymbologyTable) -> Result<ResolvedOptions, ConfigError> {
        if !self.fps.is_finite() || self.fps <= 0.0 {
            return Err(ConfigError::InvalidFps(self.fps));
        }
        let fps = if self.fps > MAX_FPS {
            debug!(requested = self.fps, max = MAX_FPS, "Clamping sampling rate");
            MAX_FPS
        } else {
            self.fps
        };

        if let Some(region) = self.target_region
            && !region.is_valid()
        {
            return Err(ConfigError::InvalidRegion {
                width: region.width,
                height: region.height,
            });
        }

        let formats = table.resolve(self.formats.as_deref())?;

        let facing = MediaConstraints::facing(self.preferred_camera);
        let constraints = match &self.constraints {
            Some(overrides) => facing.merged_with(overrides),
            None => facing,
        };

        debug!(
            fps,
            formats = formats.len(),
            region = ?self.target_region,
            "Resolved scanner options"
        );

        Ok(ResolvedOptions {
            fps,
            formats,
            auto_normalize: self.auto_normalize,
            constraints,
            target_region: self.target_region,
            continuous: self.continuous,
            max_engine_errors: self.max_engine_errors.max(1),
            ready_timeout: Duration::from_millis(self.ready_timeout_ms),
            hints: DecodeHints {
                try_harder: self.try_harder,
                max_dimension: self.decode_max_dimension,
            },
        })
    }
}

/// Options after validation
///
/// Built once at scanner construction; never changes afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedOptions {
    fps: f64,
    formats: Vec<Symbology>,
    auto_normalize: bool,
    constraints: MediaConstraints,
    target_region: Option<TargetRegion>,
    continuous: bool,
    max_engine_errors: u32,
    ready_timeout: Duration,
    hints: DecodeHints,
}

impl ResolvedOptions {
    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Delay between the end of one decode and the next sample
    pub fn interval(&self) -> Duration {
        Duration::from_micros((1_000_000.0 / self.fps).round() as u64)
    }

    /// Symbologies the engine may report
    pub fn formats(&self) -> &[Symbology] {
        &self.formats
    }

    pub fn auto_normalize(&self) -> bool {
        self.auto_normalize
    }

    /// Constraints handed to the capture provider
    pub fn constraints(&self) -> &MediaConstraints {
        &self.constraints
    }

    pub fn target_region(&self) -> Option<TargetRegion> {
        self.target_region
    }

    pub fn continuous(&self) -> bool {
        self.continuous
    }

    pub fn max_engine_errors(&self) -> u32 {
        self.max_engine_errors
    }

    pub fn ready_timeout(&self) -> Duration {
        self.ready_timeout
    }

    pub fn hints(&self) -> &DecodeHints {
        &self.hints
    }
}

/// Default config file location (`~/.config/codescan/config.json`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
}

/// Load options from a JSON file
///
/// Missing fields take their defaults.
pub fn load_options(path: &Path) -> Result<ScannerOptions, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let options = serde_json::from_str(&contents)?;
    debug!(path = %path.display(), "Loaded scanner options");
    Ok(options)
}
