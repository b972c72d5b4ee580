#![cfg_attr(docsrs, feature(doc_cfg))]

//! # Severity
//!
//! Classifies clinical narrative text by symptom severity (`ABSENT`, `MILD`,
//! `MODERATE`, `SEVERE`) using bag-of-words unigram and bigram counts.
//!
//! ## Examples
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::{prelude::*, stdin, BufReader};
//!
//! use severity::{Predictor, TrainedModel};
//!
//! let f = BufReader::new(File::open("model.bin").unwrap());
//! let model = TrainedModel::read(f).unwrap();
//! let predictor = Predictor::new(model).unwrap();
//!
//! let mut text = String::new();
//! stdin().read_to_string(&mut text).unwrap();
//! println!("{}", predictor.predict(&text).unwrap());
//! ```
//!
//! Training requires **crate feature** `train`. For more details, see [`Trainer`].

mod classifier;
mod dictionary;
mod feature;
mod model;
mod predictor;
mod record;
mod selection;
mod tokenizer;

#[cfg(feature = "train")]
mod trainer;

pub mod errors;

pub use classifier::{Distribution, LinearModel};
pub use dictionary::{Dictionary, DictionaryBuilder, StopWords};
pub use errors::{Result, SeverityError};
pub use feature::{FeatureVector, WeightedVector};
pub use model::{TrainedModel, FORMAT_VERSION};
pub use predictor::{select_label, Predictor};
pub use record::{Document, Record, RecordExtractor, Severity, CLASS_WEIGHTS, METADATA_KEY};
pub use selection::SelectionMask;
pub use tokenizer::tokenize;

#[cfg(feature = "train")]
pub use classifier::{Learner, LiblinearLearner, SolverType};
#[cfg(feature = "train")]
pub use selection::{AttributeSelector, InfoGainRanker};
#[cfg(feature = "train")]
pub use trainer::Trainer;
