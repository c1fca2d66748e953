//! CTC (Connectionist Temporal Classification) greedy decoding.
//!
//! A CTC model emits one score vector per time step over the vocabulary plus
//! a trailing blank class. Greedy ("best path") decoding picks the arg-max
//! class at every step, collapses runs of the same class into one, drops the
//! blanks and maps what remains through the vocabulary.

use super::vocabulary::Vocabulary;
use crate::core::Tensor3D;
use ndarray::{ArrayView1, ArrayView2, Axis};

/// Greedy best-path decoder for CTC outputs whose blank is the last class.
pub struct CTCLabelDecode {
    vocabulary: Vocabulary,
}

impl std::fmt::Debug for CTCLabelDecode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CTCLabelDecode")
            .field("character_count", &self.vocabulary.len())
            .field("blank_index", &self.vocabulary.blank_index())
            .finish()
    }
}

impl CTCLabelDecode {
    /// Creates a decoder over the given vocabulary.
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self { vocabulary }
    }

    /// The vocabulary this decoder maps through.
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Gets the index of the blank token.
    pub fn blank_index(&self) -> usize {
        self.vocabulary.blank_index()
    }

    /// Picks the highest-scoring class at every time step of a (T, C) matrix.
    ///
    /// Ties resolve to the lowest index. NaN scores never win; a row without
    /// any comparable score yields the blank.
    pub fn best_path(&self, matrix: ArrayView2<'_, f32>) -> Vec<usize> {
        matrix
            .outer_iter()
            .map(|row| argmax(row).unwrap_or(self.blank_index()))
            .collect()
    }

    /// Collapses consecutive repeats, then drops blanks and out-of-vocabulary
    /// indices, returning the surviving class indices in time order.
    pub fn collapse(&self, path: &[usize]) -> Vec<usize> {
        let mut previous = None;
        let mut kept = Vec::with_capacity(path.len());
        for &idx in path {
            if previous != Some(idx) && idx < self.blank_index() {
                kept.push(idx);
            }
            previous = Some(idx);
        }
        kept
    }

    /// Decodes a best path of class indices into text.
    pub fn decode_path(&self, path: &[usize]) -> String {
        self.collapse(path)
            .into_iter()
            .filter_map(|idx| self.vocabulary.get(idx))
            .collect()
    }

    /// Decodes a single (T, V + 1) score matrix into text.
    ///
    /// An all-blank path decodes to the empty string.
    pub fn decode(&self, matrix: ArrayView2<'_, f32>) -> String {
        self.decode_path(&self.best_path(matrix))
    }

    /// Decodes every item of a (batch, T, V + 1) tensor.
    pub fn apply(&self, pred: &Tensor3D) -> Vec<String> {
        if pred.is_empty() {
            return Vec::new();
        }

        let texts: Vec<String> = pred
            .axis_iter(Axis(0))
            .map(|matrix| self.decode(matrix))
            .collect();

        let with_text = texts.iter().filter(|t| !t.is_empty()).count();
        tracing::debug!(
            "CTC decode summary: batch_size={}, batches_with_text={}, empty_batches={}",
            texts.len(),
            with_text,
            texts.len() - with_text
        );

        texts
    }
}

fn argmax(row: ArrayView1<'_, f32>) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, &score) in row.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((idx, score)),
        }
    }
    best.map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn decoder(vocab: &str) -> CTCLabelDecode {
        CTCLabelDecode::new(Vocabulary::new(vocab).unwrap())
    }

    /// One-hot style matrix whose best path is exactly `path`.
    fn matrix_for_path(path: &[usize], classes: usize) -> Array2<f32> {
        let mut m = Array2::from_elem((path.len(), classes), 0.01);
        for (t, &idx) in path.iter().enumerate() {
            m[[t, idx]] = 0.9;
        }
        m
    }

    #[test]
    fn test_collapses_runs_then_drops_blanks() {
        let dec = decoder("ab");
        let m = matrix_for_path(&[0, 0, 2, 1, 1, 1, 2], 3);
        assert_eq!(dec.best_path(m.view()), vec![0, 0, 2, 1, 1, 1, 2]);
        assert_eq!(dec.collapse(&[0, 0, 2, 1, 1, 1, 2]), vec![0, 1]);
        assert_eq!(dec.decode(m.view()), "ab");
    }

    #[test]
    fn test_blank_separates_repeated_characters() {
        let dec = decoder("ab");
        assert_eq!(dec.decode_path(&[0, 0, 2, 0, 1]), "aab");
        assert_eq!(dec.decode_path(&[0, 0, 0, 1]), "ab");
    }

    #[test]
    fn test_all_blank_decodes_to_empty() {
        let dec = decoder("abc");
        let m = matrix_for_path(&[3; 12], 4);
        assert_eq!(dec.decode(m.view()), "");
    }

    #[test]
    fn test_repetition_does_not_change_text() {
        let dec = decoder("0123456789");
        let path = [3, 10, 1, 4, 10, 1, 5, 9, 10];
        let expected = dec.decode_path(&path);
        for k in 1..=4 {
            let repeated: Vec<usize> = path
                .iter()
                .flat_map(|&idx| std::iter::repeat_n(idx, k))
                .collect();
            let m = matrix_for_path(&repeated, 11);
            assert_eq!(dec.decode(m.view()), expected, "k={k}");
        }
    }

    #[test]
    fn test_decode_is_deterministic() {
        let dec = decoder("xyz");
        let m = Array2::from_shape_fn((16, 4), |(t, c)| ((t * 7 + c * 3) % 5) as f32);
        let first = dec.decode(m.view());
        let second = dec.decode(m.view());
        assert_eq!(first, second);
    }

    #[test]
    fn test_ties_pick_lowest_index() {
        let dec = decoder("ab");
        let m = Array2::from_shape_vec((2, 3), vec![0.5, 0.5, 0.0, 0.2, 0.4, 0.4]).unwrap();
        assert_eq!(dec.best_path(m.view()), vec![0, 1]);
    }

    #[test]
    fn test_nan_scores_never_win() {
        let dec = decoder("ab");
        let m = Array2::from_shape_vec(
            (2, 3),
            vec![f32::NAN, 0.1, 0.2, f32::NAN, f32::NAN, f32::NAN],
        )
        .unwrap();
        assert_eq!(dec.best_path(m.view()), vec![2, 2]);
        assert_eq!(dec.decode(m.view()), "");
    }

    #[test]
    fn test_logits_decode_like_probabilities() {
        let dec = decoder("ab");
        let m = Array2::from_shape_vec((3, 3), vec![-1.0, -7.5, -9.0, -8.0, -0.3, -2.0, -4.0, -3.0, -0.1])
            .unwrap();
        assert_eq!(dec.decode(m.view()), "ab");
    }

    #[test]
    fn test_indices_past_blank_produce_nothing() {
        let dec = decoder("ab");
        assert_eq!(dec.decode_path(&[0, 5, 1]), "ab");
    }

    #[test]
    fn test_apply_decodes_each_batch_item() {
        let dec = decoder("ab");
        let mut pred = Tensor3D::from_elem((2, 3, 3), 0.0);
        for (t, idx) in [0usize, 2, 1].into_iter().enumerate() {
            pred[[0, t, idx]] = 1.0;
        }
        for t in 0..3 {
            pred[[1, t, 2]] = 1.0;
        }
        assert_eq!(dec.apply(&pred), vec!["ab".to_string(), String::new()]);
        assert!(dec.apply(&Tensor3D::zeros((0, 3, 3))).is_empty());
    }
}
