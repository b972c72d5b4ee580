use crate::dictionary::Dictionary;
use crate::record::Severity;

/// Fixed-schema count vector of a document.
///
/// Index 0 holds the class code; index `1 + i` holds the number of
/// occurrences of the dictionary token with index `i`.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    /// Encodes a token stream against a frozen dictionary.
    ///
    /// Tokens missing from the dictionary are skipped. Stop words never enter
    /// the dictionary, so they are skipped as well.
    pub fn encode<S>(tokens: &[S], dictionary: &Dictionary, label: Severity) -> Self
    where
        S: AsRef<str>,
    {
        let mut values = vec![0.0; dictionary.len() + 1];
        values[0] = f64::from(label.code());
        for token in tokens {
            if let Some(id) = dictionary.get(token.as_ref()) {
                values[id + 1] += 1.0;
            }
        }
        Self(values)
    }

    /// Gets the class code stored at index 0.
    pub fn class_code(&self) -> f64 {
        self.0[0]
    }

    /// Gets the occurrence counts, indexed by dictionary index.
    pub fn counts(&self) -> &[f64] {
        &self.0[1..]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// A feature vector with its instance weight.
#[derive(Clone, Debug, PartialEq)]
pub struct WeightedVector {
    pub(crate) vector: FeatureVector,
    pub(crate) label: Severity,
    pub(crate) weight: f64,
}

impl WeightedVector {
    pub const fn new(vector: FeatureVector, label: Severity, weight: f64) -> Self {
        Self {
            vector,
            label,
            weight,
        }
    }

    pub const fn vector(&self) -> &FeatureVector {
        &self.vector
    }

    pub const fn label(&self) -> Severity {
        self.label
    }

    pub const fn weight(&self) -> f64 {
        self.weight
    }
}
