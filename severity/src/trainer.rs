use crate::classifier::Learner;
use crate::dictionary::{DictionaryBuilder, StopWords};
use crate::errors::{Result, SeverityError};
use crate::feature::{FeatureVector, WeightedVector};
use crate::model::TrainedModel;
use crate::record::{Record, RecordExtractor, Severity};
use crate::selection::AttributeSelector;

struct TrainingDocument {
    tokens: Vec<String>,
    label: Severity,
    weight: f64,
}

/// Trainer.
///
/// Documents are accumulated first; the dictionary, the vectors and the
/// classifier are all built by [`Trainer::train()`], which consumes the
/// trainer.
///
/// # Examples
///
/// ```no_run
/// use std::fs::{self, File};
/// use std::io::BufWriter;
///
/// use severity::{InfoGainRanker, LiblinearLearner, StopWords, Trainer};
///
/// let mut trainer = Trainer::new(2)
///     .unwrap()
///     .stop_words(StopWords::load("stopwords.txt"))
///     .attributes_to_keep(1000);
/// for entry in fs::read_dir("corpus").unwrap() {
///     let text = fs::read_to_string(entry.unwrap().path()).unwrap();
///     trainer.push_text(&text);
/// }
///
/// let model = trainer.train(&InfoGainRanker, &LiblinearLearner::default()).unwrap();
/// let f = BufWriter::new(File::create("model.bin").unwrap());
/// model.write(f).unwrap();
/// ```
#[cfg_attr(docsrs, doc(cfg(feature = "train")))]
pub struct Trainer {
    extractor: RecordExtractor,
    min_term_count: usize,
    sort_by_frequency: bool,
    attributes_to_keep: usize,
    stop_words: StopWords,
    documents: Vec<TrainingDocument>,
    n_dropped: usize,
}

impl Trainer {
    /// Creates a new trainer.
    ///
    /// # Arguments
    ///
    /// * `min_term_count` - Tokens occurring fewer times than this in the whole
    ///                      corpus are left out of the dictionary.
    ///
    /// # Errors
    ///
    /// If `min_term_count` is zero, an error variant will be returned.
    pub fn new(min_term_count: usize) -> Result<Self> {
        if min_term_count == 0 {
            return Err(SeverityError::invalid_argument(
                "min_term_count",
                "must be at least 1",
            ));
        }
        Ok(Self {
            extractor: RecordExtractor::new()?,
            min_term_count,
            sort_by_frequency: true,
            attributes_to_keep: 0,
            stop_words: StopWords::new(),
            documents: vec![],
            n_dropped: 0,
        })
    }

    /// Sets tokens left out of the dictionary.
    pub fn stop_words(mut self, stop_words: StopWords) -> Self {
        self.stop_words = stop_words;
        self
    }

    /// Orders the dictionary by descending corpus frequency (the default)
    /// instead of first occurrence.
    pub fn sort_by_frequency(mut self, sort_by_frequency: bool) -> Self {
        self.sort_by_frequency = sort_by_frequency;
        self
    }

    /// Sets the number of attributes kept by feature selection. Zero (the
    /// default) keeps every attribute.
    pub fn attributes_to_keep(mut self, attributes_to_keep: usize) -> Self {
        self.attributes_to_keep = attributes_to_keep;
        self
    }

    /// Adds raw report text to the corpus.
    ///
    /// # Returns
    ///
    /// `false` if the document has no known label and was dropped.
    pub fn push_text(&mut self, text: &str) -> bool {
        let record = self.extractor.extract(text);
        self.push_record(&record)
    }

    /// Adds a record to the corpus.
    ///
    /// # Returns
    ///
    /// `false` if the record has no known label and was dropped.
    pub fn push_record(&mut self, record: &Record) -> bool {
        if !record.label().is_known() {
            log::warn!("Added document with unknown class during training; will ignore!");
            self.n_dropped += 1;
            return false;
        }
        self.documents.push(TrainingDocument {
            tokens: record.tokens(),
            label: record.label(),
            weight: record.weight(),
        });
        true
    }

    /// Gets the number of documents in the corpus.
    pub fn n_documents(&self) -> usize {
        self.documents.len()
    }

    /// Gets the number of documents dropped for lack of a known label.
    pub const fn n_dropped(&self) -> usize {
        self.n_dropped
    }

    /// Trains a model from the accumulated corpus.
    ///
    /// # Arguments
    ///
    /// * `selector` - Feature selection applied to the encoded corpus.
    /// * `learner` - Classifier fitted to the selected attributes.
    ///
    /// # Returns
    ///
    /// A trained model.
    ///
    /// # Errors
    ///
    /// [`SeverityError::Training`] will be returned if the corpus is empty or
    /// the learner fails.
    pub fn train<S, L>(self, selector: &S, learner: &L) -> Result<TrainedModel>
    where
        S: AttributeSelector + ?Sized,
        L: Learner + ?Sized,
    {
        if self.documents.is_empty() {
            return Err(SeverityError::training(
                "no document with a known class in the corpus",
            ));
        }

        let mut builder = DictionaryBuilder::new(self.min_term_count)
            .stop_words(&self.stop_words)
            .sort_by_frequency(self.sort_by_frequency);
        for doc in &self.documents {
            builder.add_tokens(&doc.tokens);
        }
        let dictionary = builder.build();

        let examples: Vec<WeightedVector> = self
            .documents
            .iter()
            .map(|doc| {
                WeightedVector::new(
                    FeatureVector::encode(&doc.tokens, &dictionary, doc.label),
                    doc.label,
                    doc.weight,
                )
            })
            .collect();

        let mask = selector.select(&examples, self.attributes_to_keep)?;
        let mut xs = Vec::with_capacity(examples.len());
        for example in &examples {
            xs.push(mask.apply(example.vector())?);
        }
        let weights: Vec<f64> = examples.iter().map(WeightedVector::weight).collect();
        let labels: Vec<Severity> = examples.iter().map(WeightedVector::label).collect();
        let classifier = learner.fit(&xs, &weights, &labels)?;

        TrainedModel::new(dictionary, mask, classifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::classifier::{LiblinearLearner, LinearModel};
    use crate::predictor::Predictor;
    use crate::selection::{InfoGainRanker, SelectionMask};

    // Scores each class by how many attributes its training documents share
    // with the input.
    struct OverlapLearner;

    impl Learner for OverlapLearner {
        fn fit(
            &self,
            xs: &[Vec<f64>],
            _weights: &[f64],
            labels: &[Severity],
        ) -> Result<LinearModel> {
            let n_features = xs[0].len();
            let mut classes: Vec<Severity> = vec![];
            let mut weights: Vec<Vec<f64>> = vec![];
            for (x, &label) in xs.iter().zip(labels) {
                let i = match classes.iter().position(|&c| c == label) {
                    Some(i) => i,
                    None => {
                        classes.push(label);
                        weights.push(vec![0.0; n_features]);
                        classes.len() - 1
                    }
                };
                for (w, &v) in weights[i].iter_mut().zip(x) {
                    if v > 0.0 {
                        *w = 1.0;
                    }
                }
            }
            let biases = vec![0.0; classes.len()];
            LinearModel::new(classes, biases, weights, n_features)
        }
    }

    // Keeps a fixed prefix of the dictionary.
    struct PrefixSelector;

    impl AttributeSelector for PrefixSelector {
        fn select(
            &self,
            examples: &[WeightedVector],
            n_attributes: usize,
        ) -> Result<SelectionMask> {
            let n = examples[0].vector().counts().len().min(n_attributes);
            SelectionMask::all(n)
        }
    }

    const CORPUS: [&str; 4] = [
        r#"<T score="MILD" />|mild pain noted[report_end]"#,
        r#"<T score="SEVERE" />|severe distress observed[report_end]"#,
        r#"<T score="ABSENT" />|no symptoms absent[report_end]"#,
        r#"|patient stable[report_end]"#,
    ];

    fn trainer() -> Trainer {
        let mut trainer = Trainer::new(1).unwrap().attributes_to_keep(100);
        let kept: Vec<bool> = CORPUS.iter().map(|t| trainer.push_text(t)).collect();
        assert_eq!(vec![true, true, true, false], kept);
        trainer
    }

    #[test]
    fn test_unknown_label_dropped() {
        let trainer = trainer();

        assert_eq!(3, trainer.n_documents());
        assert_eq!(1, trainer.n_dropped());
    }

    #[test]
    fn test_train_dictionary() {
        let model = trainer().train(&InfoGainRanker, &OverlapLearner).unwrap();
        let dict = model.dictionary();

        // 3 documents × (3 unigrams + 2 bigrams); "patient" was dropped.
        assert_eq!(15, dict.len());
        assert_eq!(None, dict.get("patient"));
        assert_eq!(Some(0), dict.get("symptoms_absent"));
        assert_eq!(15, model.selection_mask().len());
    }

    #[test]
    fn test_train_min_term_count() {
        let mut trainer = Trainer::new(2).unwrap();
        trainer.push_text(r#"score="MILD" |pain pain fever[report_end]"#);
        trainer.push_text(r#"score="SEVERE" |fever cough[report_end]"#);
        let model = trainer.train(&InfoGainRanker, &OverlapLearner).unwrap();

        assert_eq!(&["pain", "fever"], model.dictionary().tokens());
    }

    #[test]
    fn test_train_stop_words() {
        let mut trainer = Trainer::new(1)
            .unwrap()
            .stop_words(["the", "the_pain"].into_iter().collect());
        trainer.push_text(r#"score="MILD" |the pain[report_end]"#);
        let model = trainer.train(&InfoGainRanker, &OverlapLearner).unwrap();

        assert_eq!(&["pain"], model.dictionary().tokens());
    }

    #[test]
    fn test_train_with_selection() {
        let mut trainer = trainer().attributes_to_keep(4);
        trainer.push_text(r#"score="SEVERE" |severe pain[report_end]"#);
        let model = trainer.train(&PrefixSelector, &OverlapLearner).unwrap();

        assert_eq!(&[0, 1, 2, 3], model.selection_mask().indices());
        assert_eq!(4, model.classifier().n_features());
    }

    #[test]
    fn test_train_empty_corpus() {
        let mut trainer = Trainer::new(1).unwrap();
        trainer.push_text("no label");

        assert!(matches!(
            trainer.train(&InfoGainRanker, &OverlapLearner),
            Err(SeverityError::Training(_))
        ));
    }

    #[test]
    fn test_invalid_min_term_count() {
        assert!(matches!(
            Trainer::new(0),
            Err(SeverityError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_end_to_end() {
        let model = trainer().train(&InfoGainRanker, &OverlapLearner).unwrap();
        let predictor = Predictor::new(model).unwrap();

        assert_eq!(
            Severity::Severe,
            predictor.predict("|severe distress[report_end]").unwrap()
        );
    }

    #[test]
    fn test_end_to_end_liblinear() {
        let model = trainer()
            .train(&InfoGainRanker, &LiblinearLearner::default())
            .unwrap();
        let predictor = Predictor::new(model).unwrap();

        assert_eq!(
            Severity::Severe,
            predictor.predict("|severe distress[report_end]").unwrap()
        );
    }

    #[test]
    fn test_round_trip_keeps_prediction() {
        let model = trainer()
            .train(&InfoGainRanker, &LiblinearLearner::default())
            .unwrap();
        let mut buf = vec![];
        model.write(&mut buf).unwrap();
        let reloaded = TrainedModel::read(buf.as_slice()).unwrap();
        assert_eq!(model, reloaded);

        let text = r#"annotated_by="2" |Mild pain, no distress.[report_end]"#;
        let p1 = Predictor::new(model).unwrap();
        let p2 = Predictor::new(reloaded).unwrap();
        assert_eq!(p1.predict(text).unwrap(), p2.predict(text).unwrap());
        let r = RecordExtractor::new().unwrap().extract(text);
        assert_eq!(p1.distribution(&r).unwrap(), p2.distribution(&r).unwrap());
    }
}
