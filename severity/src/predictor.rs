use crate::classifier::Distribution;
use crate::errors::Result;
use crate::feature::FeatureVector;
use crate::model::TrainedModel;
use crate::record::{Document, Record, RecordExtractor, Severity, METADATA_KEY};

/// Selects the label with the highest score.
///
/// Scores are scanned in increasing class order and a later score equal to the
/// current best replaces it, so ties resolve to the more severe class.
pub fn select_label(dist: &[f64]) -> Severity {
    let mut best = Severity::Unknown;
    let mut max = f64::NEG_INFINITY;
    for (cls, &score) in Severity::ALL.iter().zip(dist) {
        if score >= max {
            max = score;
            best = *cls;
        }
    }
    best
}

/// Predictor.
///
/// A predictor holds no mutable state, so a single instance can be shared by
/// any number of threads.
///
/// # Examples
///
/// ```no_run
/// use std::fs::File;
/// use std::io::BufReader;
///
/// use severity::{Predictor, TrainedModel};
///
/// let f = BufReader::new(File::open("model.bin").unwrap());
/// let model = TrainedModel::read(f).unwrap();
/// let predictor = Predictor::new(model).unwrap();
///
/// let label = predictor.predict(r#"|Patient in severe distress.[report_end]"#).unwrap();
/// println!("{}", label);
/// ```
pub struct Predictor {
    model: TrainedModel,
    extractor: RecordExtractor,
}

impl Predictor {
    /// Creates a new predictor.
    ///
    /// # Arguments
    ///
    /// * `model` - A trained model.
    ///
    /// # Returns
    ///
    /// A new predictor.
    ///
    /// # Errors
    ///
    /// Returns an error only if the record patterns fail to compile.
    pub fn new(model: TrainedModel) -> Result<Self> {
        Ok(Self {
            model,
            extractor: RecordExtractor::new()?,
        })
    }

    pub const fn model(&self) -> &TrainedModel {
        &self.model
    }

    /// Encodes a record against the model dictionary.
    pub fn encode(&self, record: &Record) -> FeatureVector {
        FeatureVector::encode(&record.tokens(), &self.model.dictionary, record.label())
    }

    /// Computes the score distribution of a record.
    ///
    /// # Errors
    ///
    /// [`SeverityError::InvalidModel`](crate::SeverityError::InvalidModel) will
    /// be returned if the encoded vector does not fit the selection mask.
    pub fn distribution(&self, record: &Record) -> Result<Distribution> {
        let vector = self.encode(record);
        let reduced = self.model.mask.apply(&vector)?;
        self.model.classifier.distribution(&reduced)
    }

    /// Predicts the severity of a record.
    pub fn predict_record(&self, record: &Record) -> Result<Severity> {
        Ok(select_label(&self.distribution(record)?))
    }

    /// Predicts the severity of raw report text.
    pub fn predict(&self, text: &str) -> Result<Severity> {
        self.predict_record(&self.extractor.extract(text))
    }

    /// Predicts the severity of a document and attaches it to the metadata.
    pub fn annotate(&self, document: &mut Document) -> Result<Severity> {
        let label = self.predict(document.text())?;
        document.put_metadata(METADATA_KEY, label.as_str());
        Ok(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::thread;

    use crate::classifier::LinearModel;
    use crate::dictionary::Dictionary;
    use crate::selection::SelectionMask;
    use crate::SeverityError;

    fn predictor() -> Predictor {
        let dictionary = Dictionary::from_tokens(vec![
            "distress".to_string(),
            "mild".to_string(),
            "severe".to_string(),
        ])
        .unwrap();
        let mask = SelectionMask::new(vec![1, 2]).unwrap();
        let classifier = LinearModel::new(
            vec![Severity::Absent, Severity::Mild, Severity::Severe],
            vec![0.5, 0.0, 0.0],
            vec![vec![-1.0, -1.0], vec![2.0, -1.0], vec![-1.0, 2.0]],
            2,
        )
        .unwrap();
        Predictor::new(TrainedModel::new(dictionary, mask, classifier).unwrap()).unwrap()
    }

    #[test]
    fn test_select_label_tie_prefers_higher_class() {
        assert_eq!(Severity::Mild, select_label(&[0.4, 0.4, 0.1, 0.05, 0.05]));
        assert_eq!(Severity::Severe, select_label(&[0.0, 0.5, 0.0, 0.5, 0.0]));
        assert_eq!(Severity::Unknown, select_label(&[0.2; 5]));
    }

    #[test]
    fn test_select_label_max() {
        assert_eq!(Severity::Absent, select_label(&[0.7, 0.1, 0.1, 0.1, 0.0]));
        assert_eq!(Severity::Moderate, select_label(&[0.1, 0.1, 0.6, 0.2, 0.0]));
    }

    #[test]
    fn test_predict() {
        let predictor = predictor();

        assert_eq!(Severity::Severe, predictor.predict("|Severe distress[report_end]").unwrap());
        assert_eq!(Severity::Mild, predictor.predict("mild, MILD").unwrap());
        assert_eq!(Severity::Absent, predictor.predict("nothing").unwrap());
    }

    #[test]
    fn test_predict_ignores_gold_label() {
        let predictor = predictor();
        let text = r#"score="ABSENT" |severe[report_end]"#;

        assert_eq!(Severity::Severe, predictor.predict(text).unwrap());
    }

    #[test]
    fn test_distribution_unseen_tokens() {
        let predictor = predictor();
        let record = Record::new(Severity::Unknown, 1.0, "fever chills");
        let dist = predictor.distribution(&record).unwrap();

        assert_eq!(0.0, dist[2]);
        assert_eq!(0.0, dist[4]);
        assert!(dist[0] > dist[1]);
        assert_eq!(3, predictor.model().dictionary().len());
    }

    #[test]
    fn test_annotate() {
        let predictor = predictor();
        let mut doc = Document::new("|mild[report_end]");

        assert_eq!(Severity::Mild, predictor.annotate(&mut doc).unwrap());
        assert_eq!(Some("MILD"), doc.metadata(METADATA_KEY));
    }

    #[test]
    fn test_predict_concurrently() {
        let predictor = predictor();
        let texts = ["severe", "mild", "none", "severe severe mild"];
        let expected: Vec<_> = texts.iter().map(|t| predictor.predict(t).unwrap()).collect();

        let predictor = &predictor;
        thread::scope(|s| {
            let handles: Vec<_> = texts
                .iter()
                .map(|t| s.spawn(move || predictor.predict(t).unwrap()))
                .collect();
            let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
            assert_eq!(expected, results);
        });
    }

    #[test]
    fn test_inconsistent_mask_is_fatal() {
        let dictionary = Dictionary::from_tokens(vec!["a".to_string()]).unwrap();
        let model = TrainedModel {
            dictionary,
            mask: SelectionMask::new(vec![3]).unwrap(),
            classifier: LinearModel::constant(Severity::Mild, 1),
        };
        let predictor = Predictor::new(model).unwrap();

        assert!(matches!(
            predictor.predict("a"),
            Err(SeverityError::InvalidModel(_))
        ));
    }
}
