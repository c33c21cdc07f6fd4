/// Cosine similarity mapped onto `[0, 1]`.
///
/// Identical directions score 1.0, orthogonal vectors 0.5, opposite
/// directions 0.0. Length mismatches, empty vectors and zero norms all
/// score 0.0, so unembedded nodes sink to the bottom of a ranking instead
/// of poisoning it.
pub fn cosine_score(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    ((dot / (norm_a * norm_b) + 1.0) / 2.0).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_identical_vectors_score_one() {
        let v = [0.3, -0.7, 0.2];
        assert!((cosine_score(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_orthogonal_vectors_score_half() {
        assert_eq!(cosine_score(&[1.0, 0.0], &[0.0, 1.0]), 0.5);
    }

    #[test]
    fn test_opposite_vectors_score_zero() {
        let score = cosine_score(&[1.0, 2.0], &[-1.0, -2.0]);
        assert!(score.abs() < 1e-6);
    }

    #[test]
    fn test_degenerate_inputs_score_zero() {
        assert_eq!(cosine_score(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_score(&[], &[]), 0.0);
        assert_eq!(cosine_score(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_scale_invariance() {
        let a = [0.5, 1.5, -2.0];
        let b = [1.0, 3.0, -4.0];
        assert!((cosine_score(&a, &b) - 1.0).abs() < 1e-6);
    }

    fn same_length_vectors() -> impl Strategy<Value = (Vec<f32>, Vec<f32>)> {
        (1usize..16).prop_flat_map(|len| {
            (
                proptest::collection::vec(-100.0f32..100.0, len),
                proptest::collection::vec(-100.0f32..100.0, len),
            )
        })
    }

    proptest! {
        #[test]
        fn test_score_stays_within_unit_interval((a, b) in same_length_vectors()) {
            let score = cosine_score(&a, &b);
            prop_assert!((0.0..=1.0).contains(&score));
        }

        #[test]
        fn test_score_is_symmetric((a, b) in same_length_vectors()) {
            prop_assert_eq!(cosine_score(&a, &b), cosine_score(&b, &a));
        }
    }
}
