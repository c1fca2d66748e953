//! Character vocabulary for CTC recognition models.

use crate::core::{OCRError, OcrResult};

/// Ordered characters a model can emit, excluding the CTC blank.
///
/// Class index `i < len()` maps to the `i`-th character; the blank class is
/// index `len()`, so a model over this vocabulary has `len() + 1` outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    characters: Vec<char>,
}

impl Vocabulary {
    /// Builds a vocabulary from the characters of `vocab`, in order.
    ///
    /// # Errors
    ///
    /// Returns `OCRError::ConfigError` when `vocab` is empty.
    pub fn new(vocab: &str) -> OcrResult<Self> {
        if vocab.is_empty() {
            return Err(OCRError::config_error("vocabulary must not be empty"));
        }
        let characters: Vec<char> = vocab.chars().collect();

        let mut sorted = characters.clone();
        sorted.sort_unstable();
        sorted.dedup();
        if sorted.len() != characters.len() {
            tracing::warn!(
                "Vocabulary contains {} duplicate characters; decoding uses the first class order",
                characters.len() - sorted.len()
            );
        }

        Ok(Self { characters })
    }

    /// Number of real characters (V).
    pub fn len(&self) -> usize {
        self.characters.len()
    }

    /// Always false for a constructed vocabulary.
    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    /// Index of the CTC blank class (V).
    pub fn blank_index(&self) -> usize {
        self.characters.len()
    }

    /// Number of model output classes (V + 1).
    pub fn class_count(&self) -> usize {
        self.characters.len() + 1
    }

    /// Character for a class index; `None` for the blank and anything beyond.
    pub fn get(&self, index: usize) -> Option<char> {
        self.characters.get(index).copied()
    }

    /// Class index of a character, if present.
    pub fn index_of(&self, c: char) -> Option<usize> {
        self.characters.iter().position(|&ch| ch == c)
    }

    /// The characters in class order.
    pub fn characters(&self) -> &[char] {
        &self.characters
    }

    /// Checks that a model's output class count matches this vocabulary.
    ///
    /// # Errors
    ///
    /// Returns `OCRError::ConfigError` naming both counts on mismatch.
    pub fn ensure_class_count(&self, output_classes: usize) -> OcrResult<()> {
        if output_classes != self.class_count() {
            return Err(OCRError::config_error(format!(
                "model outputs {} classes but vocabulary of {} characters requires {} (vocabulary + blank)",
                output_classes,
                self.len(),
                self.class_count()
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for Vocabulary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.characters.iter().try_for_each(|c| write!(f, "{c}"))
    }
}
