use crate::errors::{Result, SeverityError};
use crate::feature::FeatureVector;

#[cfg(feature = "train")]
use crate::feature::WeightedVector;
#[cfg(feature = "train")]
use crate::record::Severity;

/// Dictionary indices of the attributes kept after feature selection, in
/// ascending order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionMask(Vec<u32>);

impl SelectionMask {
    /// Creates a mask.
    ///
    /// # Errors
    ///
    /// [`SeverityError::InvalidModel`] will be returned if the indices are not
    /// strictly ascending.
    pub fn new(indices: Vec<u32>) -> Result<Self> {
        if indices.windows(2).any(|w| w[0] >= w[1]) {
            return Err(SeverityError::invalid_model(
                "selection mask is not strictly ascending",
            ));
        }
        Ok(Self(indices))
    }

    /// Creates a mask keeping every attribute of a dictionary of size `n`.
    pub fn all(n: usize) -> Result<Self> {
        Ok(Self((0..u32::try_from(n)?).collect()))
    }

    pub fn indices(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Checks whether a dictionary index is kept.
    pub fn contains(&self, index: usize) -> bool {
        u32::try_from(index).map_or(false, |i| self.0.binary_search(&i).is_ok())
    }

    /// Reduces a feature vector to the kept attribute counts.
    ///
    /// # Errors
    ///
    /// [`SeverityError::InvalidModel`] will be returned if the mask refers to
    /// an attribute the vector does not have.
    pub fn apply(&self, vector: &FeatureVector) -> Result<Vec<f64>> {
        let counts = vector.counts();
        let mut reduced = Vec::with_capacity(self.0.len());
        for &i in &self.0 {
            let count = counts.get(usize::try_from(i)?).ok_or_else(|| {
                SeverityError::invalid_model(format!(
                    "selected attribute {i} is out of range for a vector of {} attributes",
                    counts.len()
                ))
            })?;
            reduced.push(*count);
        }
        Ok(reduced)
    }
}

/// Chooses which attributes of the training vectors are kept.
#[cfg_attr(docsrs, doc(cfg(feature = "train")))]
#[cfg(feature = "train")]
pub trait AttributeSelector {
    /// Selects at most `n_attributes` attributes. Zero keeps every attribute.
    fn select(&self, examples: &[WeightedVector], n_attributes: usize) -> Result<SelectionMask>;
}

/// Ranks attributes by the information gain of their presence with respect to
/// the class, using instance weights.
#[cfg_attr(docsrs, doc(cfg(feature = "train")))]
#[cfg(feature = "train")]
#[derive(Clone, Copy, Debug, Default)]
pub struct InfoGainRanker;

#[cfg(feature = "train")]
impl InfoGainRanker {
    fn entropy(dist: &[f64; Severity::N_CODES]) -> f64 {
        let total: f64 = dist.iter().sum();
        if total <= 0.0 {
            return 0.0;
        }
        dist.iter()
            .filter(|&&w| w > 0.0)
            .map(|&w| {
                let p = w / total;
                -p * p.log2()
            })
            .sum()
    }

    /// Computes the information gain of every attribute.
    pub fn gains(&self, examples: &[WeightedVector]) -> Vec<f64> {
        let n_attributes = examples
            .first()
            .map_or(0, |e| e.vector().counts().len());
        let mut class_dist = [0.0; Severity::N_CODES];
        // Weighted class distribution of the documents containing each attribute.
        let mut present_dist = vec![[0.0; Severity::N_CODES]; n_attributes];
        for example in examples {
            let cls = usize::from(example.label().code());
            class_dist[cls] += example.weight();
            for (dist, &count) in present_dist.iter_mut().zip(example.vector().counts()) {
                if count > 0.0 {
                    dist[cls] += example.weight();
                }
            }
        }
        let total: f64 = class_dist.iter().sum();
        let class_entropy = Self::entropy(&class_dist);
        present_dist
            .iter()
            .map(|present| {
                let mut absent = class_dist;
                for (a, p) in absent.iter_mut().zip(present) {
                    *a -= p;
                }
                let present_total: f64 = present.iter().sum();
                let absent_total = total - present_total;
                let conditional = if total > 0.0 {
                    (present_total * Self::entropy(present)
                        + absent_total * Self::entropy(&absent))
                        / total
                } else {
                    0.0
                };
                class_entropy - conditional
            })
            .collect()
    }
}

#[cfg(feature = "train")]
impl AttributeSelector for InfoGainRanker {
    fn select(&self, examples: &[WeightedVector], n_attributes: usize) -> Result<SelectionMask> {
        let gains = self.gains(examples);
        let n_total = gains.len();
        if n_attributes == 0 || n_attributes >= n_total {
            return SelectionMask::all(n_total);
        }
        let mut ranked: Vec<usize> = (0..n_total).collect();
        // Stable sort keeps lower indices first among equal gains.
        ranked.sort_by(|&a, &b| gains[b].total_cmp(&gains[a]));
        let mut selected = ranked[..n_attributes]
            .iter()
            .map(|&i| u32::try_from(i))
            .collect::<Result<Vec<_>, _>>()?;
        selected.sort_unstable();
        log::info!("Selected {} of {} attributes", selected.len(), n_total);
        SelectionMask::new(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::dictionary::DictionaryBuilder;
    use crate::record::Severity;

    #[test]
    fn test_mask_apply() {
        let mut builder = DictionaryBuilder::new(1).sort_by_frequency(false);
        builder.add_tokens(&["a", "b", "c", "d"]);
        let dict = builder.build();
        let v = FeatureVector::encode(&["a", "c", "c", "d"], &dict, Severity::Mild);
        let mask = SelectionMask::new(vec![0, 2]).unwrap();

        assert_eq!(vec![1.0, 2.0], mask.apply(&v).unwrap());
        assert!(mask.contains(2));
        assert!(!mask.contains(1));
    }

    #[test]
    fn test_mask_apply_out_of_range() {
        let mut builder = DictionaryBuilder::new(1);
        builder.add_tokens(&["a"]);
        let dict = builder.build();
        let v = FeatureVector::encode(&["a"], &dict, Severity::Mild);
        let mask = SelectionMask::new(vec![0, 1]).unwrap();

        assert!(matches!(
            mask.apply(&v),
            Err(SeverityError::InvalidModel(_))
        ));
    }

    #[test]
    fn test_mask_not_ascending() {
        assert!(SelectionMask::new(vec![1, 1]).is_err());
        assert!(SelectionMask::new(vec![2, 1]).is_err());
        assert!(SelectionMask::new(vec![]).is_ok());
    }

    #[cfg(feature = "train")]
    fn example(counts: &[f64], label: Severity, weight: f64) -> WeightedVector {
        let mut builder = DictionaryBuilder::new(1).sort_by_frequency(false);
        let tokens: Vec<String> = (0..counts.len()).map(|i| format!("t{i}")).collect();
        builder.add_tokens(&tokens);
        let dict = builder.build();
        let mut stream = vec![];
        for (i, &c) in counts.iter().enumerate() {
            for _ in 0..c as usize {
                stream.push(format!("t{i}"));
            }
        }
        WeightedVector::new(FeatureVector::encode(&stream, &dict, label), label, weight)
    }

    #[cfg(feature = "train")]
    #[test]
    fn test_info_gain_ranks_discriminative_attribute() {
        // t0 appears everywhere, t1 only in severe documents, t2 in one of each.
        let examples = vec![
            example(&[1.0, 2.0, 1.0], Severity::Severe, 1.0),
            example(&[1.0, 1.0, 0.0], Severity::Severe, 1.0),
            example(&[3.0, 0.0, 1.0], Severity::Absent, 1.0),
            example(&[1.0, 0.0, 0.0], Severity::Absent, 1.0),
        ];
        let gains = InfoGainRanker.gains(&examples);

        assert!(gains[0].abs() < 1e-12);
        assert!((gains[1] - 1.0).abs() < 1e-12);
        assert!(gains[2].abs() < 1e-12);

        let mask = InfoGainRanker.select(&examples, 1).unwrap();
        assert_eq!(&[1], mask.indices());
    }

    #[cfg(feature = "train")]
    #[test]
    fn test_info_gain_keeps_lower_index_on_ties() {
        let examples = vec![
            example(&[1.0, 1.0, 1.0], Severity::Mild, 1.0),
            example(&[0.0, 0.0, 0.0], Severity::Severe, 1.0),
        ];
        let mask = InfoGainRanker.select(&examples, 2).unwrap();

        assert_eq!(&[0, 1], mask.indices());
    }

    #[cfg(feature = "train")]
    #[test]
    fn test_info_gain_keeps_all() {
        let examples = vec![example(&[1.0, 0.0], Severity::Mild, 0.3)];

        assert_eq!(&[0, 1], InfoGainRanker.select(&examples, 0).unwrap().indices());
        assert_eq!(&[0, 1], InfoGainRanker.select(&examples, 5).unwrap().indices());
    }
}
