//! Pre-trained classifier artifact.
//!
//! The supervised branch treats the classifier as an opaque model that can
//! enumerate its class labels, possibly produce class probabilities, and
//! report the feature width it was trained against. Two serialized shapes are
//! supported: a multinomial linear model (probabilities via softmax, binary
//! models via the sigmoid of a single margin) and a nearest-centroid model
//! which predicts a label but has no probability output.

use serde::{Deserialize, Serialize};

use crate::error::ArtifactError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierArtifact {
    Linear {
        classes: Vec<String>,
        /// `n_classes × dim` coefficients, or `1 × dim` for a binary model.
        coef: Vec<Vec<f32>>,
        intercept: Vec<f32>,
        #[serde(default)]
        n_features_in: Option<usize>,
    },
    NearestCentroid {
        classes: Vec<String>,
        centroids: Vec<Vec<f32>>,
        #[serde(default)]
        n_features_in: Option<usize>,
    },
}

impl ClassifierArtifact {
    pub fn classes(&self) -> &[String] {
        match self {
            ClassifierArtifact::Linear { classes, .. } => classes,
            ClassifierArtifact::NearestCentroid { classes, .. } => classes,
        }
    }

    /// Feature width the model expects: the explicit attribute when present,
    /// otherwise inferred from the coefficient or centroid row width.
    pub fn expected_input_dim(&self) -> Option<usize> {
        match self {
            ClassifierArtifact::Linear {
                n_features_in, coef, ..
            } => n_features_in.or_else(|| coef.first().map(Vec::len)),
            ClassifierArtifact::NearestCentroid {
                n_features_in,
                centroids,
                ..
            } => n_features_in.or_else(|| centroids.first().map(Vec::len)),
        }
    }

    /// Class probabilities for `x`, in class order. `None` when the model has
    /// no probability output or the input does not fit its coefficients.
    pub fn predict_proba(&self, x: &[f32]) -> Option<Vec<f32>> {
        match self {
            ClassifierArtifact::Linear {
                classes,
                coef,
                intercept,
                ..
            } => {
                if coef.is_empty() || intercept.len() != coef.len() {
                    return None;
                }
                if coef.iter().any(|row| row.len() != x.len()) {
                    return None;
                }
                let scores: Vec<f32> = coef
                    .iter()
                    .zip(intercept.iter())
                    .map(|(row, b)| dot(row, x) + b)
                    .collect();

                // Binary models carry a single margin row.
                if coef.len() == 1 && classes.len() == 2 {
                    let p1 = 1.0 / (1.0 + (-scores[0]).exp());
                    return Some(vec![1.0 - p1, p1]);
                }
                if scores.len() != classes.len() {
                    return None;
                }
                Some(softmax(&scores))
            }
            ClassifierArtifact::NearestCentroid { .. } => None,
        }
    }

    /// Best label for `x`, without probabilities. `None` when the input does
    /// not fit the model.
    pub fn predict(&self, x: &[f32]) -> Option<String> {
        match self {
            ClassifierArtifact::Linear { classes, .. } => {
                let proba = self.predict_proba(x)?;
                let idx = argmax(&proba)?;
                classes.get(idx).cloned()
            }
            ClassifierArtifact::NearestCentroid {
                classes, centroids, ..
            } => {
                if centroids.len() != classes.len() || centroids.is_empty() {
                    return None;
                }
                if centroids.iter().any(|c| c.len() != x.len()) {
                    return None;
                }
                let idx = centroids
                    .iter()
                    .enumerate()
                    .min_by(|(_, a), (_, b)| {
                        dist_sq(a, x)
                            .partial_cmp(&dist_sq(b, x))
                            .unwrap_or(std::cmp::Ordering::Equal)
                    })
                    .map(|(i, _)| i)?;
                classes.get(idx).cloned()
            }
        }
    }

    /// Load-time consistency checks; a failing artifact is discarded and the
    /// supervised branch degrades to its "unknown" response.
    pub fn validate(&self) -> Result<(), ArtifactError> {
        match self {
            ClassifierArtifact::Linear {
                classes,
                coef,
                intercept,
                ..
            } => {
                if classes.is_empty() {
                    return Err(ArtifactError::Shape("classifier has no classes".into()));
                }
                if coef.is_empty() {
                    return Err(ArtifactError::Shape("linear classifier has no coefficients".into()));
                }
                let width = coef[0].len();
                if width == 0 || coef.iter().any(|row| row.len() != width) {
                    return Err(ArtifactError::Shape(
                        "linear coefficient rows have inconsistent widths".into(),
                    ));
                }
                if intercept.len() != coef.len() {
                    return Err(ArtifactError::Shape(format!(
                        "intercept length {} does not match coefficient rows {}",
                        intercept.len(),
                        coef.len()
                    )));
                }
                let binary = coef.len() == 1 && classes.len() == 2;
                if !binary && coef.len() != classes.len() {
                    return Err(ArtifactError::Shape(format!(
                        "{} coefficient rows for {} classes",
                        coef.len(),
                        classes.len()
                    )));
                }
                Ok(())
            }
            ClassifierArtifact::NearestCentroid {
                classes, centroids, ..
            } => {
                if classes.is_empty() {
                    return Err(ArtifactError::Shape("classifier has no classes".into()));
                }
                if centroids.len() != classes.len() {
                    return Err(ArtifactError::Shape(format!(
                        "{} centroids for {} classes",
                        centroids.len(),
                        classes.len()
                    )));
                }
                let width = centroids[0].len();
                if width == 0 || centroids.iter().any(|row| row.len() != width) {
                    return Err(ArtifactError::Shape(
                        "centroid rows have inconsistent widths".into(),
                    ));
                }
                Ok(())
            }
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn dist_sq(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

fn argmax(v: &[f32]) -> Option<usize> {
    v.iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_class_linear() -> ClassifierArtifact {
        ClassifierArtifact::Linear {
            classes: vec!["a".into(), "b".into(), "c".into()],
            coef: vec![
                vec![1.0, 0.0],
                vec![0.0, 1.0],
                vec![-1.0, -1.0],
            ],
            intercept: vec![0.0, 0.0, 0.0],
            n_features_in: None,
        }
    }

    #[test]
    fn linear_proba_sums_to_one() {
        let clf = three_class_linear();
        let proba = clf.predict_proba(&[2.0, -1.0]).unwrap();
        assert_eq!(proba.len(), 3);
        let sum: f32 = proba.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }

    #[test]
    fn linear_predicts_dominant_class() {
        let clf = three_class_linear();
        assert_eq!(clf.predict(&[5.0, 0.0]).unwrap(), "a");
        assert_eq!(clf.predict(&[0.0, 5.0]).unwrap(), "b");
        assert_eq!(clf.predict(&[-5.0, -5.0]).unwrap(), "c");
    }

    #[test]
    fn binary_linear_uses_sigmoid_margin() {
        let clf = ClassifierArtifact::Linear {
            classes: vec!["neg".into(), "pos".into()],
            coef: vec![vec![1.0, 1.0]],
            intercept: vec![0.0],
            n_features_in: None,
        };
        let proba = clf.predict_proba(&[10.0, 10.0]).unwrap();
        assert!(proba[1] > 0.99);
        assert_eq!(clf.predict(&[10.0, 10.0]).unwrap(), "pos");
        assert_eq!(clf.predict(&[-10.0, -10.0]).unwrap(), "neg");
    }

    #[test]
    fn dimension_mismatch_yields_none() {
        let clf = three_class_linear();
        assert!(clf.predict_proba(&[1.0, 2.0, 3.0]).is_none());
        assert!(clf.predict(&[1.0]).is_none());
    }

    #[test]
    fn nearest_centroid_has_no_proba() {
        let clf = ClassifierArtifact::NearestCentroid {
            classes: vec!["x".into(), "y".into()],
            centroids: vec![vec![0.0, 0.0], vec![1.0, 1.0]],
            n_features_in: None,
        };
        assert!(clf.predict_proba(&[0.1, 0.1]).is_none());
        assert_eq!(clf.predict(&[0.1, 0.1]).unwrap(), "x");
        assert_eq!(clf.predict(&[0.9, 0.8]).unwrap(), "y");
    }

    #[test]
    fn expected_dim_prefers_explicit_attribute() {
        let clf = ClassifierArtifact::Linear {
            classes: vec!["a".into(), "b".into()],
            coef: vec![vec![0.0; 4]],
            intercept: vec![0.0],
            n_features_in: Some(8),
        };
        assert_eq!(clf.expected_input_dim(), Some(8));

        let clf = three_class_linear();
        assert_eq!(clf.expected_input_dim(), Some(2));
    }

    #[test]
    fn validate_rejects_inconsistent_shapes() {
        let clf = ClassifierArtifact::Linear {
            classes: vec!["a".into(), "b".into(), "c".into()],
            coef: vec![vec![1.0], vec![2.0]],
            intercept: vec![0.0, 0.0],
            n_features_in: None,
        };
        assert!(clf.validate().is_err());

        let clf = ClassifierArtifact::NearestCentroid {
            classes: vec!["a".into()],
            centroids: vec![],
            n_features_in: None,
        };
        assert!(clf.validate().is_err());
    }

    #[test]
    fn serde_roundtrip_tagged() {
        let clf = three_class_linear();
        let json = serde_json::to_string(&clf).unwrap();
        assert!(json.contains("\"kind\":\"linear\""));
        let back: ClassifierArtifact = serde_json::from_str(&json).unwrap();
        assert_eq!(clf, back);
    }
}
