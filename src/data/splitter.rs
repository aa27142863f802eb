// ============================================================
// Layer 4 — Stratified Train/Validation/Test Splitter
// ============================================================
// Partitions the full dataset into three disjoint subsets while
// preserving each class's relative frequency in every subset.
//
// Split order matches the two-stage convention:
//   1. carve `test_size` of every class out as the test set
//   2. carve `val_size` of every remaining class out as validation
//   3. what is left is the training set
//
// Both carves shuffle per class with a seeded RNG, so the same
// (data, seed) pair always produces the same partition.
//
// A class that cannot contribute at least one sample to each side
// of a carve aborts the run with DataError::Stratification.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use std::collections::BTreeMap;

use crate::data::DataError;

/// One split's parallel text/label columns
#[derive(Debug, Clone)]
pub struct SplitPart {
    pub texts:  Vec<String>,
    pub labels: Vec<usize>,
}

impl SplitPart {
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }
}

/// The three disjoint subsets produced by `stratified_split`
#[derive(Debug, Clone)]
pub struct DataSplits {
    pub train: SplitPart,
    pub val:   SplitPart,
    pub test:  SplitPart,
}

/// Partition (texts, labels) into train/validation/test subsets,
/// stratified on the label.
///
/// `test_size` is the fraction of the whole set carved out first;
/// `val_size` is the fraction of the remainder carved out second.
pub fn stratified_split(
    texts:     Vec<String>,
    labels:    Vec<usize>,
    test_size: f64,
    val_size:  f64,
    seed:      u64,
) -> Result<DataSplits, DataError> {
    debug_assert_eq!(texts.len(), labels.len());

    let mut rng = StdRng::seed_from_u64(seed);

    // Index the samples per class. BTreeMap keeps class order stable,
    // which keeps the shuffle sequence (and thus the split) deterministic.
    let mut by_label: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (idx, &label) in labels.iter().enumerate() {
        by_label.entry(label).or_default().push(idx);
    }

    // Stage 1: test carve over the full set
    let (remainder, test_idx) = carve(by_label, test_size, &mut rng)?;

    // Stage 2: validation carve over the remainder
    let (train_groups, val_idx) = carve(remainder, val_size, &mut rng)?;
    let train_idx: Vec<usize> = train_groups.into_values().flatten().collect();

    let splits = DataSplits {
        train: collect_part(&texts, &labels, &train_idx),
        val:   collect_part(&texts, &labels, &val_idx),
        test:  collect_part(&texts, &labels, &test_idx),
    };

    tracing::debug!(
        "Stratified split: {} train, {} validation, {} test",
        splits.train.len(),
        splits.val.len(),
        splits.test.len(),
    );

    Ok(splits)
}

/// Carve `fraction` of every class's indices out of `groups`.
/// Returns (kept per-class groups, carved-out flat indices).
///
/// Every class must keep at least one sample and give up at least
/// one sample; a class too small for that fails the whole carve.
fn carve(
    groups:   BTreeMap<usize, Vec<usize>>,
    fraction: f64,
    rng:      &mut StdRng,
) -> Result<(BTreeMap<usize, Vec<usize>>, Vec<usize>), DataError> {
    let mut kept = BTreeMap::new();
    let mut held = Vec::new();

    for (label, mut indices) in groups {
        let count = indices.len();
        if count < 2 {
            return Err(DataError::Stratification { label, count });
        }

        indices.shuffle(rng);

        // Round to the nearest sample, but always leave both sides
        // of the carve non-empty
        let take = ((count as f64) * fraction).round() as usize;
        let take = take.clamp(1, count - 1);

        held.extend(indices.split_off(count - take));
        kept.insert(label, indices);
    }

    Ok((kept, held))
}

/// Materialise one split from the original parallel columns.
fn collect_part(texts: &[String], labels: &[usize], indices: &[usize]) -> SplitPart {
    SplitPart {
        texts:  indices.iter().map(|&i| texts[i].clone()).collect(),
        labels: indices.iter().map(|&i| labels[i]).collect(),
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Build a labelled corpus with the given per-class sizes.
    /// Texts are unique so set operations can track identity.
    fn corpus(class_sizes: &[usize]) -> (Vec<String>, Vec<usize>) {
        let mut texts = Vec::new();
        let mut labels = Vec::new();
        for (label, &size) in class_sizes.iter().enumerate() {
            for i in 0..size {
                texts.push(format!("comment-{label}-{i}"));
                labels.push(label);
            }
        }
        (texts, labels)
    }

    fn proportion(labels: &[usize], label: usize) -> f64 {
        labels.iter().filter(|&&l| l == label).count() as f64 / labels.len() as f64
    }

    #[test]
    fn test_splits_are_disjoint_and_cover_input() {
        let (texts, labels) = corpus(&[40, 30, 20, 10]);
        let total = texts.len();

        let splits = stratified_split(texts.clone(), labels, 0.2, 0.1, 42).unwrap();

        let train: HashSet<_> = splits.train.texts.iter().cloned().collect();
        let val:   HashSet<_> = splits.val.texts.iter().cloned().collect();
        let test:  HashSet<_> = splits.test.texts.iter().cloned().collect();

        assert!(train.is_disjoint(&val));
        assert!(train.is_disjoint(&test));
        assert!(val.is_disjoint(&test));

        let union: HashSet<_> = train.union(&val).cloned().collect();
        let union: HashSet<_> = union.union(&test).cloned().collect();
        assert_eq!(union.len(), total);
        assert_eq!(union, texts.into_iter().collect());
    }

    #[test]
    fn test_class_proportions_are_preserved() {
        let (texts, labels) = corpus(&[500, 250, 150, 100]);

        let splits = stratified_split(texts, labels.clone(), 0.2, 0.1, 42).unwrap();

        for label in 0..4 {
            let full = proportion(&labels, label);
            for part in [&splits.train, &splits.val, &splits.test] {
                let got = proportion(&part.labels, label);
                assert!(
                    (got - full).abs() < 0.03,
                    "label {label}: full {full:.3} vs split {got:.3}",
                );
            }
        }
    }

    #[test]
    fn test_same_seed_same_partition() {
        let (texts, labels) = corpus(&[30, 30, 30, 30]);

        let a = stratified_split(texts.clone(), labels.clone(), 0.2, 0.1, 7).unwrap();
        let b = stratified_split(texts, labels, 0.2, 0.1, 7).unwrap();

        assert_eq!(a.train.texts, b.train.texts);
        assert_eq!(a.val.texts, b.val.texts);
        assert_eq!(a.test.texts, b.test.texts);
    }

    #[test]
    fn test_tiny_class_fails_stratification() {
        let (mut texts, mut labels) = corpus(&[30, 30, 30]);
        // A single sample of class 3 cannot appear in every split
        texts.push("comment-3-0".to_string());
        labels.push(3);

        let err = stratified_split(texts, labels, 0.2, 0.1, 42).unwrap_err();
        assert!(matches!(
            err,
            DataError::Stratification { label: 3, count: 1 }
        ));
    }
}
