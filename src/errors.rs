// SPDX-License-Identifier: MPL-2.0

//! Error types for the scan orchestrator

use std::fmt;

/// Result type alias using ScannerError
pub type ScannerResult<T> = Result<T, ScannerError>;

/// Main scanner error type
#[derive(Debug, Clone, PartialEq)]
pub enum ScannerError {
    /// Camera stream could not be acquired
    Acquisition(AcquisitionError),
    /// The capture surface never reported its dimensions
    ReadinessTimeout,
    /// `start` was called while a session is already starting or scanning
    AlreadyScanning,
    /// A newer `start`/`stop` overtook this call before it finished
    Superseded,
    /// One-shot image decoding failed
    FileDecode(FileDecodeError),
    /// The decode engine kept failing during continuous scanning
    Engine(String),
    /// Invalid options or unreadable configuration
    Config(ConfigError),
    /// Rasterization or encoding of a frame failed
    Media(String),
}

/// Camera acquisition errors reported by a media capture provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionError {
    /// Access to the camera was refused
    PermissionDenied(String),
    /// No camera matched the request
    NoDevice,
    /// The device cannot produce the requested format
    ConstraintsUnsatisfiable(String),
    /// The stream stopped delivering frames after it was opened
    StreamEnded,
    /// Any other backend failure
    Backend(String),
}

/// Errors from `scan_image`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileDecodeError {
    /// The image decoded fine but contained no recognizable code
    NoCodeFound,
    /// The file could not be read or is not an image
    Unreadable(String),
    /// The engine failed while looking at the image
    Engine(String),
}

/// Option validation and config file errors
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Frame rate must be a positive, finite number
    InvalidFps(f64),
    /// Target region percentages must be in (0, 100]
    InvalidRegion { width: f64, height: f64 },
    /// Requested symbology has no mapping in the decode engine
    UnsupportedSymbology(String),
    /// The resolved symbology set is empty
    NoSymbologies,
    /// Config file could not be read
    Io(String),
    /// Config file is not valid JSON for the options schema
    Parse(String),
}

impl fmt::Display for ScannerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScannerError::Acquisition(e) => write!(f, "Camera acquisition failed: {}", e),
            ScannerError::ReadinessTimeout => write!(f, "Video surface did not become ready"),
            ScannerError::AlreadyScanning => write!(f, "Scanner is already running"),
            ScannerError::Superseded => write!(f, "Start was superseded by a later request"),
            ScannerError::FileDecode(e) => write!(f, "Image scan failed: {}", e),
            ScannerError::Engine(msg) => write!(f, "Decode engine error: {}", msg),
            ScannerError::Config(e) => write!(f, "Configuration error: {}", e),
            ScannerError::Media(msg) => write!(f, "Frame processing error: {}", msg),
        }
    }
}

impl fmt::Display for AcquisitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquisitionError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            AcquisitionError::NoDevice => write!(f, "No camera device found"),
            AcquisitionError::ConstraintsUnsatisfiable(msg) => {
                write!(f, "Constraints cannot be satisfied: {}", msg)
            }
            AcquisitionError::StreamEnded => write!(f, "Camera stream ended"),
            AcquisitionError::Backend(msg) => write!(f, "Backend error: {}", msg),
        }
    }
}

impl fmt::Display for FileDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileDecodeError::NoCodeFound => write!(f, "No code found in image"),
            FileDecodeError::Unreadable(msg) => write!(f, "Unreadable image: {}", msg),
            FileDecodeError::Engine(msg) => write!(f, "Engine error: {}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidFps(fps) => write!(f, "Invalid frame rate: {}", fps),
            ConfigError::InvalidRegion { width, height } => {
                write!(f, "Invalid target region: {}% x {}%", width, height)
            }
            ConfigError::UnsupportedSymbology(name) => {
                write!(f, "Symbology not supported by decode engine: {}", name)
            }
            ConfigError::NoSymbologies => write!(f, "No symbologies enabled"),
            ConfigError::Io(msg) => write!(f, "Failed to read config: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Failed to parse config: {}", msg),
        }
    }
}

impl std::error::Error for ScannerError {}
impl std::error::Error for AcquisitionError {}
impl std::error::Error for FileDecodeError {}
impl std::error::Error for ConfigError {}

impl From<AcquisitionError> for ScannerError {
    fn from(err: AcquisitionError) -> Self {
        ScannerError::Acquisition(err)
    }
}

impl From<FileDecodeError> for ScannerError {
    fn from(err: FileDecodeError) -> Self {
        ScannerError::FileDecode(err)
    }
}

impl From<ConfigError> for ScannerError {
    fn from(err: ConfigError) -> Self {
        ScannerError::Config(err)
    }
}

impl From<std::io::Error> for AcquisitionError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => {
                AcquisitionError::PermissionDenied(err.to_string())
            }
            std::io::ErrorKind::NotFound => AcquisitionError::NoDevice,
            _ => AcquisitionError::Backend(err.to_string()),
        }
    }
}

impl From<std::io::Error> for FileDecodeError {
    fn from(err: std::io::Error) -> Self {
        FileDecodeError::Unreadable(err.to_string())
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_io_error_maps_to_acquisition_kind() {
        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "EACCES");
        assert!(matches!(
            AcquisitionError::from(denied),
            AcquisitionError::PermissionDenied(_)
        ));

        let missing = io::Error::new(io::ErrorKind::NotFound, "ENOENT");
        assert_eq!(AcquisitionError::from(missing), AcquisitionError::NoDevice);
    }

    #[test]
    fn test_timeout_message_is_distinct() {
        let timeout = ScannerError::ReadinessTimeout.to_string();
        let denied = ScannerError::from(AcquisitionError::PermissionDenied("x".into())).to_string();
        assert_ne!(timeout, denied);
        assert!(timeout.contains("did not become ready"));
    }
}
