//! Token embedding lookup
//!
//! Two sources are supported:
//! - a word-vector text file (`word v1 .. vd` per line, optional
//!   fastText-style `count dim` header), loaded once at construction;
//! - hashed vectors: each token seeds a PRNG through a stable FNV-1a hash,
//!   so the same token always maps to the same vector without any file.

use crate::components::params::ComponentParams;
use crate::errors::{PipelineError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Default dimensionality of hashed vectors
pub const DEFAULT_HASHED_DIM: usize = 300;

#[derive(Debug, Clone)]
enum EmbeddingSource {
    Hashed,
    Table(HashMap<String, Vec<f32>>),
}

/// Maps tokens to fixed-size vectors
#[derive(Debug, Clone)]
pub struct WordEmbedder {
    source: EmbeddingSource,
    dim: usize,
}

impl WordEmbedder {
    /// Deterministic hashed vectors of the given size
    pub fn hashed(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(PipelineError::InvalidArgument(
                "embedding dimension must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            source: EmbeddingSource::Hashed,
            dim,
        })
    }

    /// Load a word-vector text file
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PipelineError::MissingResource {
                path: path.to_path_buf(),
            });
        }
        let contents = fs::read_to_string(path)?;
        let embedder = Self::from_text(&contents).map_err(|e| match e {
            PipelineError::MalformedSource(reason) => {
                PipelineError::MalformedSource(format!("{}: {}", path.display(), reason))
            }
            other => other,
        })?;
        tracing::info!(
            path = %path.display(),
            words = embedder.vocabulary_size(),
            dim = embedder.dim,
            "Loaded word vectors"
        );
        Ok(embedder)
    }

    /// Parse word vectors from text
    pub fn from_text(contents: &str) -> Result<Self> {
        let mut table = HashMap::new();
        let mut dim = None;

        for (line_no, line) in contents.lines().enumerate() {
            let mut fields = line.split_whitespace();
            let word = match fields.next() {
                Some(word) => word,
                None => continue,
            };
            let numbers: Vec<&str> = fields.collect();

            // fastText header: "<count> <dim>"
            if line_no == 0
                && numbers.len() == 1
                && word.parse::<usize>().is_ok()
                && numbers[0].parse::<usize>().is_ok()
            {
                continue;
            }

            let vector = numbers
                .iter()
                .map(|n| n.parse::<f32>())
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| {
                    PipelineError::MalformedSource(format!("line {}: {}", line_no + 1, e))
                })?;
            if vector.iter().any(|x| !x.is_finite()) {
                return Err(PipelineError::MalformedSource(format!(
                    "line {}: word '{}' has a non-finite value",
                    line_no + 1,
                    word
                )));
            }

            match dim {
                None if vector.is_empty() => {
                    return Err(PipelineError::MalformedSource(format!(
                        "line {}: word '{}' has no vector",
                        line_no + 1,
                        word
                    )))
                }
                None => dim = Some(vector.len()),
                Some(d) if d != vector.len() => {
                    return Err(PipelineError::MalformedSource(format!(
                        "line {}: expected {} values, found {}",
                        line_no + 1,
                        d,
                        vector.len()
                    )))
                }
                Some(_) => {}
            }
            table.insert(word.to_string(), vector);
        }

        let dim = dim.ok_or_else(|| {
            PipelineError::MalformedSource("word vector source is empty".to_string())
        })?;

        Ok(Self {
            source: EmbeddingSource::Table(table),
            dim,
        })
    }

    /// Build from stage parameters: `load_path` selects a vector file,
    /// otherwise hashed vectors of size `dim`
    pub fn from_params(params: &ComponentParams) -> Result<Self> {
        match params.load_path() {
            Some(path) => {
                let embedder = Self::from_file(path)?;
                if let Some(dim) = params.get_positive("dim")? {
                    if dim != embedder.dim {
                        return Err(PipelineError::DimensionMismatch(format!(
                            "configured dim {} but {} holds {}-dimensional vectors",
                            dim,
                            path.display(),
                            embedder.dim
                        )));
                    }
                }
                Ok(embedder)
            }
            None => Self::hashed(params.get_positive("dim")?.unwrap_or(DEFAULT_HASHED_DIM)),
        }
    }

    /// Vector dimensionality
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of words in a loaded table (0 for hashed vectors)
    pub fn vocabulary_size(&self) -> usize {
        match &self.source {
            EmbeddingSource::Hashed => 0,
            EmbeddingSource::Table(table) => table.len(),
        }
    }

    /// Vector for one token, `None` when a table lacks the word
    pub fn embed_token(&self, token: &str) -> Option<Vec<f32>> {
        match &self.source {
            EmbeddingSource::Hashed => {
                let mut rng = StdRng::seed_from_u64(fnv1a(token));
                Some((0..self.dim).map(|_| rng.gen_range(-1.0f32..1.0)).collect())
            }
            EmbeddingSource::Table(table) => table.get(token).cloned(),
        }
    }

    /// Vectors for a token sequence; unknown words are skipped
    pub fn embed(&self, tokens: &[String]) -> Vec<Vec<f32>> {
        let vectors: Vec<Vec<f32>> = tokens
            .iter()
            .filter_map(|token| self.embed_token(token))
            .collect();
        if vectors.is_empty() && !tokens.is_empty() {
            tracing::warn!(total = tokens.len(), "No token has a word vector");
        } else if vectors.len() < tokens.len() {
            tracing::debug!(
                known = vectors.len(),
                total = tokens.len(),
                "Skipped out-of-vocabulary tokens"
            );
        }
        vectors
    }
}

/// 64-bit FNV-1a; stable across platforms and toolchains
fn fnv1a(text: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in text.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}
