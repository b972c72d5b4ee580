use std::io::{Read, Write};
use std::mem;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::errors::{Result, SeverityError};
use crate::record::Severity;

#[cfg(feature = "train")]
use std::str::FromStr;

#[cfg(feature = "train")]
use liblinear::LibLinearModel;

/// Score distribution over the five class codes.
pub type Distribution = [f64; Severity::N_CODES];

/// Linear classifier parameters over the selected attributes.
///
/// Each trained class has a bias and one weight per selected attribute. Class
/// codes that were absent from the training corpus always score zero.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearModel {
    pub(crate) classes: Vec<Severity>,
    pub(crate) biases: Vec<f64>,
    pub(crate) weights: Vec<Vec<f64>>,
    pub(crate) n_features: usize,
}

impl LinearModel {
    const TYPE_ID_LINEAR: u8 = 0;

    /// Creates a model.
    ///
    /// # Errors
    ///
    /// [`SeverityError::InvalidModel`] will be returned if the shapes of the
    /// arguments disagree or a class appears twice.
    pub fn new(
        classes: Vec<Severity>,
        biases: Vec<f64>,
        weights: Vec<Vec<f64>>,
        n_features: usize,
    ) -> Result<Self> {
        if classes.is_empty() {
            return Err(SeverityError::invalid_model("classifier has no class"));
        }
        if classes.len() != biases.len() || classes.len() != weights.len() {
            return Err(SeverityError::invalid_model(
                "classifier classes, biases and weights differ in length",
            ));
        }
        if weights.iter().any(|w| w.len() != n_features) {
            return Err(SeverityError::invalid_model(format!(
                "classifier weights must have {n_features} entries",
            )));
        }
        for (i, cls) in classes.iter().enumerate() {
            if classes[..i].contains(cls) {
                return Err(SeverityError::invalid_model(format!(
                    "duplicated classifier class: {cls}"
                )));
            }
        }
        Ok(Self {
            classes,
            biases,
            weights,
            n_features,
        })
    }

    /// Creates a model that always prefers `class`.
    pub fn constant(class: Severity, n_features: usize) -> Self {
        Self {
            classes: vec![class],
            biases: vec![0.0],
            weights: vec![vec![0.0; n_features]],
            n_features,
        }
    }

    pub fn classes(&self) -> &[Severity] {
        &self.classes
    }

    pub const fn n_features(&self) -> usize {
        self.n_features
    }

    /// Gets the weights of a class, if it was trained.
    pub fn class_weights(&self, class: Severity) -> Option<&[f64]> {
        self.classes
            .iter()
            .position(|&c| c == class)
            .map(|i| self.weights[i].as_slice())
    }

    /// Computes the decision value of every trained class.
    pub fn decision_values(&self, xs: &[f64]) -> Result<Vec<f64>> {
        if xs.len() != self.n_features {
            return Err(SeverityError::invalid_model(format!(
                "classifier expects {} attributes, but got {}",
                self.n_features,
                xs.len()
            )));
        }
        Ok(self
            .weights
            .iter()
            .zip(&self.biases)
            .map(|(ws, bias)| ws.iter().zip(xs).fold(*bias, |acc, (w, x)| acc + w * x))
            .collect())
    }

    /// Computes a probability distribution over the five class codes.
    ///
    /// Decision values of the trained classes are normalized with softmax.
    pub fn distribution(&self, xs: &[f64]) -> Result<Distribution> {
        let ys = self.decision_values(xs)?;
        let max = ys.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = ys.iter().map(|y| (y - max).exp()).collect();
        let total: f64 = exps.iter().sum();
        let mut dist = [0.0; Severity::N_CODES];
        for (cls, e) in self.classes.iter().zip(exps) {
            dist[usize::from(cls.code())] = e / total;
        }
        Ok(dist)
    }

    pub fn serialize<W>(&self, mut buf: W) -> Result<usize>
    where
        W: Write,
    {
        buf.write_u8(Self::TYPE_ID_LINEAR)?;
        buf.write_u32::<LittleEndian>(self.classes.len().try_into()?)?;
        buf.write_u32::<LittleEndian>(self.n_features.try_into()?)?;
        for ((cls, bias), weights) in self.classes.iter().zip(&self.biases).zip(&self.weights) {
            buf.write_u8(cls.code())?;
            buf.write_f64::<LittleEndian>(*bias)?;
            for &w in weights {
                buf.write_f64::<LittleEndian>(w)?;
            }
        }
        Ok(mem::size_of::<u8>()
            + mem::size_of::<u32>() * 2
            + self.classes.len()
                * (mem::size_of::<u8>() + mem::size_of::<f64>() * (1 + self.n_features)))
    }

    pub fn deserialize<R>(mut buf: R) -> Result<Self>
    where
        R: Read,
    {
        let type_id = buf.read_u8()?;
        if type_id != Self::TYPE_ID_LINEAR {
            return Err(SeverityError::invalid_model(
                "invalid type_id of classifier",
            ));
        }
        let n_classes = usize::try_from(buf.read_u32::<LittleEndian>()?)?;
        let n_features = usize::try_from(buf.read_u32::<LittleEndian>()?)?;
        if n_classes > Severity::N_CODES {
            return Err(SeverityError::invalid_model("too many classifier classes"));
        }
        let mut classes = Vec::with_capacity(n_classes);
        let mut biases = Vec::with_capacity(n_classes);
        let mut weights = Vec::with_capacity(n_classes);
        for _ in 0..n_classes {
            let code = buf.read_u8()?;
            let cls = Severity::from_code(code)
                .filter(|cls| cls.is_known())
                .ok_or_else(|| {
                    SeverityError::invalid_model(format!("invalid classifier class: {code}"))
                })?;
            classes.push(cls);
            biases.push(buf.read_f64::<LittleEndian>()?);
            let mut ws = Vec::with_capacity(n_features.min(1 << 16));
            for _ in 0..n_features {
                ws.push(buf.read_f64::<LittleEndian>()?);
            }
            weights.push(ws);
        }
        Self::new(classes, biases, weights, n_features)
    }
}

/// Fits classifier parameters to reduced training vectors.
#[cfg_attr(docsrs, doc(cfg(feature = "train")))]
#[cfg(feature = "train")]
pub trait Learner {
    /// Fits a model.
    ///
    /// # Arguments
    ///
    /// * `xs` - Reduced feature vectors, all of the same length.
    /// * `weights` - Instance weights.
    /// * `labels` - Known classes of the vectors.
    fn fit(&self, xs: &[Vec<f64>], weights: &[f64], labels: &[Severity]) -> Result<LinearModel>;
}

/// Solver type.
#[cfg_attr(docsrs, doc(cfg(feature = "train")))]
#[cfg(feature = "train")]
#[derive(Clone, Copy, Debug)]
pub enum SolverType {
    /// L2-regularized logistic regression (primal).
    L2RegularizedLogistic = 0,

    /// L2-regularized L2-loss support vector classification (dual).
    L2RegularizedL2LossSVCDual = 1,

    /// L2-regularized L2-loss support vector classification (primal).
    L2RegularizedL2LossSVC = 2,

    /// L2-regularized L1-loss support vector classification (dual)
    L2RegularizedL1LossSVCDual = 3,

    /// support vector classification by Crammer and Singer
    CrammerSingerSVC = 4,

    /// L1-regularized L2-loss support vector classification
    L1RegularizedL2LossSVC = 5,

    /// L1-regularized logistic regression
    L1RegularizedLogistic = 6,

    /// L2-regularized logistic regression (dual).
    L2RegularizedLogisticDual = 7,
}

#[cfg(feature = "train")]
impl FromStr for SolverType {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0" => Ok(Self::L2RegularizedLogistic),
            "1" => Ok(Self::L2RegularizedL2LossSVCDual),
            "2" => Ok(Self::L2RegularizedL2LossSVC),
            "3" => Ok(Self::L2RegularizedL1LossSVCDual),
            "4" => Ok(Self::CrammerSingerSVC),
            "5" => Ok(Self::L1RegularizedL2LossSVC),
            "6" => Ok(Self::L1RegularizedLogistic),
            "7" => Ok(Self::L2RegularizedLogisticDual),
            _ => Err("Unsupported solver type."),
        }
    }
}

#[cfg(feature = "train")]
impl From<SolverType> for liblinear::SolverType {
    fn from(solver: SolverType) -> Self {
        match solver {
            SolverType::L2RegularizedLogistic => Self::L2R_LR,
            SolverType::L2RegularizedL2LossSVCDual => Self::L2R_L2LOSS_SVC_DUAL,
            SolverType::L2RegularizedL2LossSVC => Self::L2R_L2LOSS_SVC,
            SolverType::L2RegularizedL1LossSVCDual => Self::L2R_L1LOSS_SVC_DUAL,
            SolverType::CrammerSingerSVC => Self::MCSVM_CS,
            SolverType::L1RegularizedL2LossSVC => Self::L1R_L2LOSS_SVC,
            SolverType::L1RegularizedLogistic => Self::L1R_LR,
            SolverType::L2RegularizedLogisticDual => Self::L2R_LR_DUAL,
        }
    }
}

/// Learner backed by LIBLINEAR.
///
/// LIBLINEAR has no per-instance weights, so the instance weights of each
/// class are averaged into that class's cost penalty. Documents of the same
/// class are therefore trained with equal weight: a per-document adjustment,
/// such as halving the weight of one annotator's documents, only moves the
/// class mean. Implement [`Learner`] directly to use the instance weights as
/// given.
#[cfg_attr(docsrs, doc(cfg(feature = "train")))]
#[cfg(feature = "train")]
#[derive(Clone, Copy, Debug)]
pub struct LiblinearLearner {
    epsilon: f64,
    cost: f64,
    solver: SolverType,
}

#[cfg(feature = "train")]
impl LiblinearLearner {
    /// Creates a learner.
    ///
    /// # Arguments
    ///
    /// * `epsilon` - The tolerance of the termination criterion.
    /// * `cost` - The parameter C.
    /// * `solver` - Solver type.
    pub const fn new(epsilon: f64, cost: f64, solver: SolverType) -> Self {
        Self {
            epsilon,
            cost,
            solver,
        }
    }
}

#[cfg(feature = "train")]
impl Default for LiblinearLearner {
    fn default() -> Self {
        Self::new(0.01, 1.0, SolverType::L2RegularizedLogistic)
    }
}

#[cfg(feature = "train")]
impl Learner for LiblinearLearner {
    fn fit(&self, xs: &[Vec<f64>], weights: &[f64], labels: &[Severity]) -> Result<LinearModel> {
        if xs.len() != labels.len() || xs.len() != weights.len() {
            return Err(SeverityError::invalid_argument(
                "xs",
                "vectors, weights and labels differ in length",
            ));
        }
        let n_features = xs.first().map_or(0, Vec::len);

        // Mean instance weight per class, in order of first appearance.
        let mut classes: Vec<Severity> = vec![];
        let mut weight_sums: Vec<(f64, usize)> = vec![];
        for (&label, &weight) in labels.iter().zip(weights) {
            if let Some(i) = classes.iter().position(|&c| c == label) {
                weight_sums[i].0 += weight;
                weight_sums[i].1 += 1;
            } else {
                classes.push(label);
                weight_sums.push((weight, 1));
            }
        }
        match classes.as_slice() {
            [] => return Err(SeverityError::training("no training vectors")),
            [cls] => return Ok(LinearModel::constant(*cls, n_features)),
            _ => {}
        }

        let ys = labels.iter().map(|l| f64::from(l.code())).collect();
        let mut sparse_xs = Vec::with_capacity(xs.len());
        for x in xs {
            let mut feature_vec = vec![];
            for (i, &v) in x.iter().enumerate() {
                if v != 0.0 {
                    feature_vec.push((u32::try_from(i + 1)?, v));
                }
            }
            sparse_xs.push(feature_vec);
        }

        let mut builder = liblinear::Builder::new();
        let training_input = liblinear::util::TrainingInput::from_sparse_features(ys, sparse_xs)
            .map_err(|e| SeverityError::training(format!("liblinear error: {e:?}")))?;
        builder.problem().input_data(training_input).bias(1.0);
        builder
            .parameters()
            .solver_type(self.solver.into())
            .stopping_criterion(self.epsilon)
            .constraints_violation_cost(self.cost)
            .cost_penalty_labels(classes.iter().map(|c| i32::from(c.code())).collect())
            .cost_penalty_weights(
                weight_sums
                    .iter()
                    .map(|&(sum, n)| sum / n as f64)
                    .collect(),
            );
        liblinear::toggle_liblinear_stdout_output(false);
        let model = builder.build_model();
        liblinear::toggle_liblinear_stdout_output(true);
        let model = model.map_err(|e| SeverityError::training(e.to_string()))?;

        let mut trained_classes = vec![];
        let mut biases = vec![];
        let mut class_weights = vec![];
        for (i, &cls) in model.labels().iter().enumerate() {
            let label_idx = i32::try_from(i)?;
            let cls = u8::try_from(cls)
                .ok()
                .and_then(Severity::from_code)
                .ok_or_else(|| SeverityError::training(format!("unexpected label: {cls}")))?;
            trained_classes.push(cls);
            biases.push(model.label_bias(label_idx));
            let mut ws = Vec::with_capacity(n_features);
            for fid in 0..n_features {
                // Attributes beyond the last non-zero one are unknown to LIBLINEAR.
                ws.push(if fid < model.num_features() {
                    model.feature_coefficient(i32::try_from(fid + 1)?, label_idx)
                } else {
                    0.0
                });
            }
            class_weights.push(ws);
        }
        LinearModel::new(trained_classes, biases, class_weights, n_features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> LinearModel {
        LinearModel::new(
            vec![Severity::Absent, Severity::Severe],
            vec![0.5, -0.5],
            vec![vec![-1.0, 0.0], vec![1.0, 2.0]],
            2,
        )
        .unwrap()
    }

    #[test]
    fn test_decision_values() {
        assert_eq!(vec![-0.5, 3.5], model().decision_values(&[1.0, 1.0]).unwrap());
    }

    #[test]
    fn test_distribution() {
        let dist = model().distribution(&[0.0, 0.0]).unwrap();
        let e = (-1.0f64).exp();

        assert!((dist[0] - 1.0 / (1.0 + e)).abs() < 1e-12);
        assert!((dist[3] - e / (1.0 + e)).abs() < 1e-12);
        assert_eq!(0.0, dist[1]);
        assert_eq!(0.0, dist[2]);
        assert_eq!(0.0, dist[4]);
    }

    #[test]
    fn test_distribution_wrong_length() {
        assert!(matches!(
            model().distribution(&[1.0]),
            Err(SeverityError::InvalidModel(_))
        ));
    }

    #[test]
    fn test_new_invalid_shapes() {
        assert!(LinearModel::new(vec![], vec![], vec![], 0).is_err());
        assert!(LinearModel::new(vec![Severity::Mild], vec![0.0], vec![vec![0.0]], 2).is_err());
        assert!(LinearModel::new(
            vec![Severity::Mild, Severity::Mild],
            vec![0.0, 0.0],
            vec![vec![], vec![]],
            0
        )
        .is_err());
    }

    #[test]
    fn test_serialize() {
        let model = model();
        let mut buf = vec![];
        let size = model.serialize(&mut buf).unwrap();

        assert_eq!(buf.len(), size);
        assert_eq!(model, LinearModel::deserialize(buf.as_slice()).unwrap());
    }

    #[test]
    fn test_deserialize_truncated() {
        let mut buf = vec![];
        model().serialize(&mut buf).unwrap();
        buf.truncate(buf.len() - 3);

        assert!(LinearModel::deserialize(buf.as_slice()).is_err());
    }

    #[test]
    fn test_deserialize_unknown_class() {
        let mut buf = vec![];
        LinearModel::constant(Severity::Mild, 0)
            .serialize(&mut buf)
            .unwrap();
        buf[9] = Severity::Unknown.code();

        assert!(matches!(
            LinearModel::deserialize(buf.as_slice()),
            Err(SeverityError::InvalidModel(_))
        ));
    }

    #[cfg(feature = "train")]
    #[test]
    fn test_liblinear_separates_classes() {
        let xs = vec![
            vec![2.0, 0.0, 1.0],
            vec![1.0, 0.0, 0.0],
            vec![0.0, 2.0, 1.0],
            vec![0.0, 1.0, 0.0],
        ];
        let weights = vec![1.0, 1.0, 3.0, 3.0];
        let labels = vec![
            Severity::Absent,
            Severity::Absent,
            Severity::Severe,
            Severity::Severe,
        ];
        let model = LiblinearLearner::default()
            .fit(&xs, &weights, &labels)
            .unwrap();

        assert_eq!(3, model.n_features());
        let dist = model.distribution(&[0.0, 3.0, 0.0]).unwrap();
        assert!(dist[3] > dist[0]);
        let dist = model.distribution(&[3.0, 0.0, 0.0]).unwrap();
        assert!(dist[0] > dist[3]);
    }

    #[cfg(feature = "train")]
    #[test]
    fn test_liblinear_single_class() {
        let model = LiblinearLearner::default()
            .fit(&[vec![1.0]], &[0.3], &[Severity::Mild])
            .unwrap();

        assert_eq!(&[Severity::Mild], model.classes());
        assert_eq!(1.0, model.distribution(&[5.0]).unwrap()[1]);
    }

    #[cfg(feature = "train")]
    #[test]
    fn test_liblinear_uses_class_mean_weight() {
        let xs = vec![
            vec![2.0, 0.0, 1.0],
            vec![1.0, 0.0, 0.0],
            vec![0.0, 2.0, 1.0],
            vec![0.0, 1.0, 0.0],
        ];
        let labels = vec![
            Severity::Absent,
            Severity::Absent,
            Severity::Severe,
            Severity::Severe,
        ];
        let learner = LiblinearLearner::default();
        let uneven = learner
            .fit(&xs, &[0.5, 1.5, 1.5, 4.5], &labels)
            .unwrap();
        let even = learner
            .fit(&xs, &[1.0, 1.0, 3.0, 3.0], &labels)
            .unwrap();

        assert_eq!(even, uneven);
    }
}
