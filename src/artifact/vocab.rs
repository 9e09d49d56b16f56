//! Token vocabulary: string-to-ID mapping with reserved sentinel IDs.

use crate::artifact::{UNK_ID, UNK_TOKEN};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VocabError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid vocabulary: {0}")]
    Invalid(String),
}

/// Token string to token ID mapping. IDs 1..=N are assigned in alphabetical
/// token order so identical phrase sets produce identical vocabularies; ID 0
/// is the `<UNK>` sentinel and `separator_id` is reserved for the automaton.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vocabulary {
    pub tokens: BTreeMap<String, u32>,
    pub special_tokens: BTreeMap<String, u32>,
    pub vocab_size: usize,
    pub separator_id: u32,
}

impl Vocabulary {
    /// Build a vocabulary from the distinct tokens of a phrase set. Fails if
    /// the dense ID range would reach `separator_id`.
    pub fn from_phrases<'a, I>(phrases: I, separator_id: u32) -> Result<Self, VocabError>
    where
        I: IntoIterator<Item = &'a [String]>,
    {
        let mut distinct: BTreeSet<&str> = BTreeSet::new();
        for tokens in phrases {
            for token in tokens {
                distinct.insert(token.as_str());
            }
        }

        if distinct.len() as u64 >= separator_id as u64 {
            return Err(VocabError::Invalid(format!(
                "vocabulary of {} tokens collides with separator_id {}",
                distinct.len(),
                separator_id
            )));
        }

        let tokens: BTreeMap<String, u32> = distinct
            .into_iter()
            .zip(1u32..)
            .map(|(token, id)| (token.to_string(), id))
            .collect();

        let mut special_tokens = BTreeMap::new();
        special_tokens.insert(UNK_TOKEN.to_string(), UNK_ID);

        let vocab_size = tokens.len() + special_tokens.len();

        Ok(Self {
            tokens,
            special_tokens,
            vocab_size,
            separator_id,
        })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, VocabError> {
        let file = File::open(path)?;
        let vocab: Vocabulary = serde_json::from_reader(BufReader::new(file))?;

        if vocab.separator_id == 0 {
            return Err(VocabError::Invalid(
                "separator_id must be non-zero".to_string(),
            ));
        }

        Ok(vocab)
    }

    /// ID of the unknown-token sentinel.
    pub fn unk_id(&self) -> u32 {
        self.special_tokens.get(UNK_TOKEN).copied().unwrap_or(UNK_ID)
    }

    /// Look up a single already-normalized token.
    pub fn token_id(&self, token: &str) -> Option<u32> {
        self.tokens.get(token).copied()
    }

    /// Number of real (non-special) tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Encode token strings to IDs: lowercase-normalize, then map misses to
    /// the `<UNK>` sentinel.
    pub fn encode<S: AsRef<str>>(&self, tokens: &[S]) -> Vec<u32> {
        let unk = self.unk_id();
        tokens
            .iter()
            .map(|token| {
                let normalized = token.as_ref().to_lowercase();
                self.tokens.get(&normalized).copied().unwrap_or(unk)
            })
            .collect()
    }
}
