//! Palette catalog: an explicitly constructed, read-only palette list.

use serde::Deserialize;

use crate::schema::{Palette, PaletteError, Rgba};

use super::RandomSource;

#[derive(Debug, Default)]
pub struct PaletteCatalog {
    palettes: Vec<Palette>,
}

#[derive(Deserialize)]
struct CatalogFile {
    palettes: Vec<Palette>,
}

impl PaletteCatalog {
    /// Build from palettes; each is stamped with its catalog index.
    pub fn new(palettes: Vec<Palette>) -> Self {
        let palettes = palettes
            .into_iter()
            .enumerate()
            .map(|(i, mut p)| {
                p.index = Some(i);
                p
            })
            .collect();
        Self { palettes }
    }

    /// Parse `{"palettes": [...]}`. Entry counts and ranges are validated.
    pub fn from_json(json: &str) -> Result<Self, PaletteError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        if file.palettes.is_empty() {
            return Err(PaletteError::EmptyCatalog);
        }
        Ok(Self::new(file.palettes))
    }

    /// A small set of generated gradients.
    pub fn builtin() -> Self {
        let stops: [(&str, &[Rgba]); 8] = [
            ("fire", &[Rgba::BLACK, Rgba::rgb(0.8, 0.1, 0.0), Rgba::rgb(1.0, 0.8, 0.2), Rgba::WHITE]),
            ("ocean", &[Rgba::rgb(0.0, 0.05, 0.2), Rgba::rgb(0.0, 0.4, 0.7), Rgba::rgb(0.6, 0.9, 1.0)]),
            ("forest", &[Rgba::rgb(0.05, 0.1, 0.0), Rgba::rgb(0.2, 0.5, 0.1), Rgba::rgb(0.9, 0.9, 0.5)]),
            ("violet", &[Rgba::rgb(0.1, 0.0, 0.2), Rgba::rgb(0.6, 0.1, 0.8), Rgba::rgb(1.0, 0.7, 1.0)]),
            ("rainbow", &[
                Rgba::rgb(1.0, 0.0, 0.0),
                Rgba::rgb(1.0, 1.0, 0.0),
                Rgba::rgb(0.0, 1.0, 0.0),
                Rgba::rgb(0.0, 1.0, 1.0),
                Rgba::rgb(0.0, 0.0, 1.0),
                Rgba::rgb(1.0, 0.0, 1.0),
            ]),
            ("ember", &[Rgba::rgb(0.2, 0.0, 0.0), Rgba::rgb(1.0, 0.4, 0.0), Rgba::rgb(0.3, 0.0, 0.1)]),
            ("ice", &[Rgba::WHITE, Rgba::rgb(0.5, 0.8, 1.0), Rgba::rgb(0.0, 0.2, 0.5)]),
            ("grey", &[Rgba::BLACK, Rgba::WHITE]),
        ];

        Self::new(
            stops
                .iter()
                .map(|(name, s)| Palette::gradient(*name, s))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.palettes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.palettes.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&Palette, PaletteError> {
        self.palettes
            .get(index)
            .ok_or(PaletteError::UnknownIndex(index))
    }

    pub fn by_name(&self, name: &str) -> Option<&Palette> {
        self.palettes.iter().find(|p| p.name == name)
    }

    /// Copy of a uniformly chosen palette.
    pub fn random_palette(&self, rng: &mut RandomSource) -> Result<Palette, PaletteError> {
        if self.palettes.is_empty() {
            return Err(PaletteError::EmptyCatalog);
        }
        let index = rng.next_index(self.palettes.len());
        self.get(index).cloned()
    }
}
