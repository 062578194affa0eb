//! JSON persistence for genomes and populations.
//!
//! Populations are stored as a pretty-printed JSON array of genomes. Node
//! kinds and activations are written as lowercase names; the integer codes of
//! older files are accepted on read.

use std::io::{Read, Write};

use crate::error::Result;
use crate::genome::Genome;
use crate::population::{Population, PopulationConfig};
use crate::random::RandomSource;

/// Write genomes as an indented JSON array followed by a newline.
///
/// # Errors
///
/// [`NeatError::Serialization`](crate::NeatError::Serialization) if encoding
/// fails, [`NeatError::Io`](crate::NeatError::Io) if the final write fails.
pub fn save_population<W: Write>(mut writer: W, genomes: &[Genome]) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, genomes)?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// Read a JSON array of genomes. Gene order is normalized on read; no other
/// validation happens here.
///
/// # Errors
///
/// [`NeatError::Serialization`](crate::NeatError::Serialization) for
/// malformed JSON, unknown activation or kind tags, or a read failure.
pub fn load_population<R: Read>(reader: R) -> Result<Vec<Genome>> {
    let mut genomes: Vec<Genome> = serde_json::from_reader(reader)?;
    for genome in &mut genomes {
        genome.sort_genes();
    }
    Ok(genomes)
}

impl<R: RandomSource> Population<R> {
    /// Write the current generation with [`save_population`].
    ///
    /// # Errors
    ///
    /// See [`save_population`].
    pub fn save<W: Write>(&self, writer: W) -> Result<()> {
        save_population(writer, &self.genomes)
    }

    /// Load genomes and resume a run from them.
    ///
    /// Every genome is validated and the innovation tracker is rebuilt from
    /// the loaded connections, so new innovations continue the saved numbering.
    ///
    /// # Errors
    ///
    /// Decoding errors from [`load_population`], plus everything
    /// [`Population::new`] rejects.
    pub fn load<Rd: Read>(reader: Rd, rng: R, config: PopulationConfig) -> Result<Self> {
        let genomes = load_population(reader)?;
        Self::new(rng, config, genomes)
    }
}
