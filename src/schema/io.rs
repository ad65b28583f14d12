//! Reading and writing genome documents as JSON.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{EditRecord, Genome, Palette};

/// A file holding zero or more genomes, an optional shared palette and
/// an optional lineage record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenomeDocument {
    pub genomes: Vec<Genome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub palette: Option<Palette>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edits: Option<EditRecord>,
}

impl GenomeDocument {
    pub fn new(genomes: Vec<Genome>) -> Self {
        Self {
            genomes,
            ..Default::default()
        }
    }

    /// Genomes with the shared palette (if any) installed in each.
    pub fn into_genomes(self) -> Vec<Genome> {
        match self.palette {
            Some(palette) => self
                .genomes
                .into_iter()
                .map(|mut g| {
                    g.palette = palette.clone();
                    g
                })
                .collect(),
            None => self.genomes,
        }
    }
}

/// Load a genome document from a JSON file.
pub fn read_document<P: AsRef<Path>>(path: P) -> Result<GenomeDocument, GenomeIoError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Write a genome document as pretty JSON.
pub fn write_document<P: AsRef<Path>>(path: P, doc: &GenomeDocument) -> Result<(), GenomeIoError> {
    let text = serde_json::to_string_pretty(doc)?;
    fs::write(path, text)?;
    Ok(())
}

/// Genome file errors.
#[derive(Debug, thiserror::Error)]
pub enum GenomeIoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed genome document: {0}")]
    Json(#[from] serde_json::Error),
}
