//! Vector similarity scoring.

use biograph_core::{Error, Result};

/// Calculate cosine similarity between two vectors.
///
/// Output is in [-1, 1]; callers rank candidates by descending value. A zero
/// vector on either side yields 0 rather than a division by zero.
///
/// # Errors
/// Returns a validation error if either vector is empty or the lengths
/// differ.
pub fn cosine_similarity(vector_a: &[f32], vector_b: &[f32]) -> Result<f32> {
    if vector_a.is_empty() || vector_b.is_empty() {
        return Err(Error::Validation(
            "cosine similarity requires non-empty vectors".to_owned(),
        ));
    }
    if vector_a.len() != vector_b.len() {
        return Err(Error::Validation(format!(
            "vector length mismatch: {} vs {}",
            vector_a.len(),
            vector_b.len()
        )));
    }

    let dot_product: f32 = vector_a
        .iter()
        .zip(vector_b.iter())
        .map(|(left, right)| left * right)
        .sum();
    let magnitude_a = vector_a.iter().map(|value| value * value).sum::<f32>().sqrt();
    let magnitude_b = vector_b.iter().map(|value| value * value).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot_product / (magnitude_a * magnitude_b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_vectors_score_one() {
        let vector = vec![0.3, -0.5, 0.8, 0.1];
        let score = cosine_similarity(&vector, &vector).unwrap();
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_opposite_vectors_score_negative_one() {
        let vector = vec![1.0, 2.0, 3.0];
        let negated: Vec<f32> = vector.iter().map(|value| -value).collect();
        let score = cosine_similarity(&vector, &negated).unwrap();
        assert!((score + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_orthogonal_vectors_score_zero() {
        let score = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap();
        assert!(score.abs() < 1e-6);
    }

    #[test]
    fn test_zero_vector_yields_zero_not_error() {
        let score = cosine_similarity(&[0.0, 0.0, 0.0], &[1.0, 2.0, 3.0]).unwrap();
        assert!((score - 0.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        let error = cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(error, Error::Validation(_)));
    }

    #[test]
    fn test_empty_vectors_are_rejected() {
        let error = cosine_similarity(&[], &[]).unwrap_err();
        assert!(matches!(error, Error::Validation(_)));
    }

    #[test]
    fn test_scores_stay_in_bounds() {
        let vector_a = vec![0.9, -0.2, 0.4, 0.7, -0.6];
        let vector_b = vec![-0.1, 0.8, 0.3, -0.9, 0.5];
        let score = cosine_similarity(&vector_a, &vector_b).unwrap();
        assert!((-1.0..=1.0).contains(&score));
    }
}
