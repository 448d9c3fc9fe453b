// SPDX-License-Identifier: GPL-3.0-only

//! Symbology names and the engine mapping table

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Barcode / 2D code encoding schemes the scanner knows by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Symbology {
    QrCode,
    MicroQrCode,
    Aztec,
    DataMatrix,
    Pdf417,
    Code128,
    Code39,
    Code93,
    Codabar,
    Ean13,
    Ean8,
    UpcA,
    UpcE,
    Itf,
}

impl Symbology {
    /// All named symbologies
    pub const ALL: [Symbology; 14] = [
        Symbology::QrCode,
        Symbology::MicroQrCode,
        Symbology::Aztec,
        Symbology::DataMatrix,
        Symbology::Pdf417,
        Symbology::Code128,
        Symbology::Code39,
        Symbology::Code93,
        Symbology::Codabar,
        Symbology::Ean13,
        Symbology::Ean8,
        Symbology::UpcA,
        Symbology::UpcE,
        Symbology::Itf,
    ];

    /// Stable snake_case name, same as the serde representation
    pub fn name(&self) -> &'static str {
        match self {
            Symbology::QrCode => "qr_code",
            Symbology::MicroQrCode => "micro_qr_code",
            Symbology::Aztec => "aztec",
            Symbology::DataMatrix => "data_matrix",
            Symbology::Pdf417 => "pdf417",
            Symbology::Code128 => "code128",
            Symbology::Code39 => "code39",
            Symbology::Code93 => "code93",
            Symbology::Codabar => "codabar",
            Symbology::Ean13 => "ean13",
            Symbology::Ean8 => "ean8",
            Symbology::UpcA => "upc_a",
            Symbology::UpcE => "upc_e",
            Symbology::Itf => "itf",
        }
    }
}

impl std::fmt::Display for Symbology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Symbology {
    type Err = ConfigError;

    /// Accepts the snake_case name, case-insensitively, with `-` for `_`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Symbology::ALL
            .into_iter()
            .find(|sym| sym.name() == wanted)
            .ok_or_else(|| ConfigError::UnsupportedSymbology(s.to_string()))
    }
}

/// Bidirectional mapping between [`Symbology`] and a decode engine's own
/// format identifiers
///
/// Owned by the engine adapter. The scanner validates requested symbologies
/// against it when it is constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbologyTable {
    entries: Vec<(Symbology, &'static str)>,
}

impl SymbologyTable {
    /// Build a table; later duplicates of a symbology or identifier are ignored
    pub fn new(entries: &[(Symbology, &'static str)]) -> Self {
        let mut table = Self {
            entries: Vec::with_capacity(entries.len()),
        };
        for &(symbology, engine_id) in entries {
            if table.engine_id(symbology).is_none() && table.symbology(engine_id).is_none() {
                table.entries.push((symbology, engine_id));
            }
        }
        table
    }

    /// Engine identifier for a symbology
    pub fn engine_id(&self, symbology: Symbology) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(sym, _)| *sym == symbology)
            .map(|(_, id)| *id)
    }

    /// Symbology for an engine identifier
    pub fn symbology(&self, engine_id: &str) -> Option<Symbology> {
        self.entries
            .iter()
            .find(|(_, id)| *id == engine_id)
            .map(|(sym, _)| *sym)
    }

    /// Every symbology the engine can report
    pub fn supported(&self) -> Vec<Symbology> {
        self.entries.iter().map(|(sym, _)| *sym).collect()
    }

    /// Resolve the caller's symbology request against this table
    ///
    /// `None` means everything the engine supports. Any requested symbology
    /// without a mapping fails instead of being dropped.
    pub fn resolve(&self, requested: Option<&[Symbology]>) -> Result<Vec<Symbology>, ConfigError> {
        let resolved = match requested {
            None => self.supported(),
            Some(requested) => {
                let mut resolved: Vec<Symbology> = Vec::with_capacity(requested.len());
                for &sym in requested {
                    if self.engine_id(sym).is_none() {
                        return Err(ConfigError::UnsupportedSymbology(sym.name().to_string()));
                    }
                    if !resolved.contains(&sym) {
                        resolved.push(sym);
                    }
                }
                resolved
            }
        };

        if resolved.is_empty() {
            return Err(ConfigError::NoSymbologies);
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SymbologyTable {
        SymbologyTable::new(&[
            (Symbology::QrCode, "QR_CODE"),
            (Symbology::Ean13, "EAN_13"),
            (Symbology::Ean13, "EAN13_DUP"),
        ])
    }

    #[test]
    fn test_lookup_both_directions() {
        let table = table();
        assert_eq!(table.engine_id(Symbology::QrCode), Some("QR_CODE"));
        assert_eq!(table.symbology("EAN_13"), Some(Symbology::Ean13));
        assert_eq!(table.symbology("EAN13_DUP"), None);
        assert_eq!(table.engine_id(Symbology::Aztec), None);
    }

    #[test]
    fn test_resolve_defaults_to_supported() {
        let resolved = table().resolve(None).unwrap();
        assert_eq!(resolved, vec![Symbology::QrCode, Symbology::Ean13]);
    }

    #[test]
    fn test_resolve_rejects_unknown() {
        let err = table().resolve(Some(&[Symbology::QrCode, Symbology::Pdf417])).unwrap_err();
        assert_eq!(err, ConfigError::UnsupportedSymbology("pdf417".to_string()));
    }

    #[test]
    fn test_resolve_rejects_empty() {
        assert_eq!(table().resolve(Some(&[])), Err(ConfigError::NoSymbologies));
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("QR_CODE".parse::<Symbology>().unwrap(), Symbology::QrCode);
        assert_eq!("upc-a".parse::<Symbology>().unwrap(), Symbology::UpcA);
        assert!("bogus".parse::<Symbology>().is_err());
        for sym in Symbology::ALL {
            assert_eq!(sym.name().parse::<Symbology>().unwrap(), sym);
        }
    }
}
