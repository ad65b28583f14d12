//! Palette types: 256 ordered RGBA entries with components in [0, 1].

use serde::{Deserialize, Serialize};

/// Number of entries in every palette.
pub const PALETTE_SIZE: usize = 256;

/// A single palette entry, components normalized to [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    #[serde(default = "default_alpha")]
    pub a: f64,
}

fn default_alpha() -> f64 {
    1.0
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::new(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Rgba = Rgba::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color from RGB.
    pub const fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self::new(r, g, b, 1.0)
    }

    pub fn channels(&self) -> [f64; 3] {
        [self.r, self.g, self.b]
    }
}

/// A 256-entry palette owned by a genome.
///
/// The entry count is fixed by the type; palettes are copied wholesale,
/// never partially aliased.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PaletteRepr", into = "PaletteRepr")]
pub struct Palette {
    /// Display name (may be empty).
    pub name: String,
    /// Index in the catalog the palette came from, if any.
    pub index: Option<usize>,
    entries: Box<[Rgba; PALETTE_SIZE]>,
}

impl Default for Palette {
    fn default() -> Self {
        Self::white()
    }
}

impl Palette {
    /// Build from exactly 256 entries.
    pub fn from_entries(name: impl Into<String>, entries: Vec<Rgba>) -> Result<Self, PaletteError> {
        let len = entries.len();
        let entries: Box<[Rgba; PALETTE_SIZE]> = entries
            .into_boxed_slice()
            .try_into()
            .map_err(|_| PaletteError::WrongSize(len))?;
        Ok(Self {
            name: name.into(),
            index: None,
            entries,
        })
    }

    /// Palette with every entry set to `color`.
    pub fn filled(name: impl Into<String>, color: Rgba) -> Self {
        Self {
            name: name.into(),
            index: None,
            entries: Box::new([color; PALETTE_SIZE]),
        }
    }

    /// The all-white fallback palette.
    pub fn white() -> Self {
        Self::filled("white", Rgba::WHITE)
    }

    /// Linear gradient through the given stops (at least one).
    pub fn gradient(name: impl Into<String>, stops: &[Rgba]) -> Self {
        let mut palette = Self::filled(name, stops.first().copied().unwrap_or(Rgba::WHITE));
        if stops.len() < 2 {
            return palette;
        }

        let segments = (stops.len() - 1) as f64;
        for (i, entry) in palette.entries.iter_mut().enumerate() {
            let t = i as f64 / (PALETTE_SIZE - 1) as f64 * segments;
            let k = (t.floor() as usize).min(stops.len() - 2);
            let f = t - k as f64;
            let (c0, c1) = (stops[k], stops[k + 1]);
            *entry = Rgba::new(
                c0.r + (c1.r - c0.r) * f,
                c0.g + (c1.g - c0.g) * f,
                c0.b + (c1.b - c0.b) * f,
                1.0,
            );
        }
        palette
    }

    pub fn entries(&self) -> &[Rgba; PALETTE_SIZE] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut [Rgba; PALETTE_SIZE] {
        &mut self.entries
    }

    #[inline]
    pub fn get(&self, index: usize) -> Rgba {
        self.entries[index % PALETTE_SIZE]
    }

    #[inline]
    pub fn set(&mut self, index: usize, color: Rgba) {
        self.entries[index % PALETTE_SIZE] = color;
    }

    /// Look up a continuous color index in [0, 1], linearly blending neighbours.
    pub fn lookup(&self, index: f64) -> Rgba {
        let pos = index.clamp(0.0, 1.0) * (PALETTE_SIZE - 1) as f64;
        let i0 = pos.floor() as usize;
        let i1 = (i0 + 1).min(PALETTE_SIZE - 1);
        let f = pos - i0 as f64;
        let (c0, c1) = (self.entries[i0], self.entries[i1]);
        Rgba::new(
            c0.r + (c1.r - c0.r) * f,
            c0.g + (c1.g - c0.g) * f,
            c0.b + (c1.b - c0.b) * f,
            c0.a + (c1.a - c0.a) * f,
        )
    }

    /// Check that every component lies in [0, 1].
    pub fn validate(&self) -> Result<(), PaletteError> {
        for (i, e) in self.entries.iter().enumerate() {
            for v in [e.r, e.g, e.b, e.a] {
                if !(0.0..=1.0).contains(&v) {
                    return Err(PaletteError::OutOfRange { entry: i, value: v });
                }
            }
        }
        Ok(())
    }
}

/// Serialized form of a palette. Accepts either float entries or a packed
/// hex string of 256 `RRGGBB` triples.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PaletteRepr {
    #[serde(default)]
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    index: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    entries: Vec<Rgba>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hex: Option<String>,
}

impl TryFrom<PaletteRepr> for Palette {
    type Error = PaletteError;

    fn try_from(repr: PaletteRepr) -> Result<Self, Self::Error> {
        let entries = match repr.hex {
            Some(hex) => parse_hex_entries(&hex)?,
            None => repr.entries,
        };
        let mut palette = Palette::from_entries(repr.name, entries)?;
        palette.index = repr.index;
        palette.validate()?;
        Ok(palette)
    }
}

impl From<Palette> for PaletteRepr {
    fn from(palette: Palette) -> Self {
        Self {
            name: palette.name,
            index: palette.index,
            entries: palette.entries.to_vec(),
            hex: None,
        }
    }
}

/// Parse 256 hex-packed `RRGGBB` triples, ignoring whitespace.
fn parse_hex_entries(hex: &str) -> Result<Vec<Rgba>, PaletteError> {
    let digits: Vec<u8> = hex.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    if digits.len() % 6 != 0 {
        return Err(PaletteError::MalformedHex);
    }

    digits
        .chunks(6)
        .map(|triple| {
            let text = std::str::from_utf8(triple).map_err(|_| PaletteError::MalformedHex)?;
            let v = u32::from_str_radix(text, 16).map_err(|_| PaletteError::MalformedHex)?;
            Ok(Rgba::rgb(
                ((v >> 16) & 0xff) as f64 / 255.0,
                ((v >> 8) & 0xff) as f64 / 255.0,
                (v & 0xff) as f64 / 255.0,
            ))
        })
        .collect()
}

/// Palette errors.
#[derive(Debug, thiserror::Error)]
pub enum PaletteError {
    #[error("Palette must have exactly 256 entries, got {0}")]
    WrongSize(usize),
    #[error("Palette entry {entry} has component {value} outside [0, 1]")]
    OutOfRange { entry: usize, value: f64 },
    #[error("Malformed hex palette data")]
    MalformedHex,
    #[error("Palette catalog is empty")]
    EmptyCatalog,
    #[error("Palette index {0} not in catalog")]
    UnknownIndex(usize),
    #[error("Failed to parse palette catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrong_size_rejected() {
        let err = Palette::from_entries("short", vec![Rgba::WHITE; 10]).unwrap_err();
        assert!(matches!(err, PaletteError::WrongSize(10)));
    }

    #[test]
    fn test_gradient_endpoints() {
        let p = Palette::gradient("bw", &[Rgba::BLACK, Rgba::WHITE]);
        assert_eq!(p.get(0), Rgba::BLACK);
        assert!((p.get(255).r - 1.0).abs() < 1e-12);
        assert!(p.get(128).r > 0.4 && p.get(128).r < 0.6);
    }

    #[test]
    fn test_hex_palette_parses() {
        let hex = "ff0000".repeat(256);
        let json = format!(r#"{{"name":"red","hex":"{}"}}"#, hex);
        let p: Palette = serde_json::from_str(&json).unwrap();
        assert_eq!(p.get(42), Rgba::rgb(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_json_round_trip_keeps_entries() {
        let p = Palette::gradient("g", &[Rgba::rgb(0.1, 0.2, 0.3), Rgba::rgb(0.9, 0.5, 0.1)]);
        let json = serde_json::to_string(&p).unwrap();
        let back: Palette = serde_json::from_str(&json).unwrap();
        assert_eq!(p, back);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut entries = vec![Rgba::WHITE; 256];
        entries[3].g = 1.5;
        let json = serde_json::to_string(&PaletteRepr {
            name: String::new(),
            index: None,
            entries,
            hex: None,
        })
        .unwrap();
        assert!(serde_json::from_str::<Palette>(&json).is_err());
    }
}
