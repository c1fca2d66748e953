//! Scoring predictions against ground-truth labels.

/// Levenshtein distance between two strings, counted in characters.
pub fn edit_distance(prediction: &str, label: &str) -> usize {
    strsim::levenshtein(prediction, label)
}

/// Character error rate: edit distance divided by the label length.
///
/// An empty label scores 0.0 against an empty prediction and 1.0 otherwise.
pub fn character_error_rate(prediction: &str, label: &str) -> f64 {
    let label_len = label.chars().count();
    if label_len == 0 {
        return if prediction.is_empty() { 0.0 } else { 1.0 };
    }
    edit_distance(prediction, label) as f64 / label_len as f64
}
