use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{ForecastError, Result};
use crate::prediction::feature_vector::FeatureVector;

/// Black-box scorer the prediction pipeline calls into.
///
/// Implementations must be safe to call from many threads at once.
pub trait ModelAdapter: Send + Sync {
    /// Feature names in the order the model was trained on.
    fn schema(&self) -> &[String];

    /// Scores one feature vector already aligned to `schema()`.
    fn score(&self, features: &FeatureVector) -> Result<f64>;
}

// ---------- XGBoost JSON model ----------

#[derive(Deserialize)]
struct XgbModelFile {
    learner: XgbLearner,
}

#[derive(Deserialize)]
struct XgbLearner {
    #[serde(default)]
    feature_names: Vec<String>,
    learner_model_param: XgbLearnerParam,
    gradient_booster: XgbBooster,
}

#[derive(Deserialize)]
struct XgbLearnerParam {
    base_score: String,
}

#[derive(Deserialize)]
struct XgbBooster {
    name: String,
    model: Option<XgbForest>,
}

#[derive(Deserialize)]
struct XgbForest {
    trees: Vec<XgbTree>,
}

/// `default_left` is written as booleans by older exporters and 0/1 by newer ones.
#[derive(Deserialize, Clone, Copy)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(u8),
}

impl Flag {
    fn is_set(self) -> bool {
        match self {
            Flag::Bool(b) => b,
            Flag::Int(i) => i != 0,
        }
    }
}

#[derive(Deserialize)]
struct XgbTree {
    left_children: Vec<i32>,
    right_children: Vec<i32>,
    split_indices: Vec<u32>,
    split_conditions: Vec<f64>,
    default_left: Vec<Flag>,
}

/// Thresholds and leaves are kept in single precision, as XGBoost evaluates them.
#[derive(Debug, Clone)]
enum Node {
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
        default_left: bool,
    },
    Leaf(f32),
}

#[derive(Debug, Clone)]
struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    fn from_xgb(tree: XgbTree, index: usize) -> Result<Self> {
        let n = tree.left_children.len();
        if [
            tree.right_children.len(),
            tree.split_indices.len(),
            tree.split_conditions.len(),
            tree.default_left.len(),
        ]
        .iter()
        .any(|&len| len != n)
            || n == 0
        {
            return Err(ForecastError::Configuration(format!(
                "tree {} has inconsistent node arrays",
                index
            )));
        }

        let child = |c: i32| -> Result<usize> {
            usize::try_from(c)
                .ok()
                .filter(|&c| c < n)
                .ok_or_else(|| {
                    ForecastError::Configuration(format!(
                        "tree {} has child index {} out of range",
                        index, c
                    ))
                })
        };

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            if tree.left_children[i] == -1 {
                // leaf values live in split_conditions
                nodes.push(Node::Leaf(tree.split_conditions[i] as f32));
            } else {
                nodes.push(Node::Split {
                    feature: tree.split_indices[i] as usize,
                    threshold: tree.split_conditions[i] as f32,
                    left: child(tree.left_children[i])?,
                    right: child(tree.right_children[i])?,
                    default_left: tree.default_left[i].is_set(),
                });
            }
        }
        Ok(Self { nodes })
    }

    fn max_feature(&self) -> Option<usize> {
        self.nodes
            .iter()
            .filter_map(|node| match node {
                Node::Split { feature, .. } => Some(*feature),
                Node::Leaf(_) => None,
            })
            .max()
    }

    fn predict(&self, x: &[f64]) -> Result<f32> {
        let mut idx = 0;
        // A well-formed tree reaches a leaf within nodes.len() steps.
        for _ in 0..=self.nodes.len() {
            match &self.nodes[idx] {
                Node::Leaf(value) => return Ok(*value),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    default_left,
                } => {
                    let value = x[*feature] as f32;
                    idx = if value.is_nan() {
                        if *default_left {
                            *left
                        } else {
                            *right
                        }
                    } else if value < *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
        Err(ForecastError::Scoring("tree walk did not reach a leaf".to_string()))
    }
}

/// Gradient-boosted regression trees exported with XGBoost's `save_model`
/// in JSON format (`gbtree` booster, squared-error objective).
#[derive(Debug, Clone)]
pub struct TreeEnsembleModel {
    schema: Vec<String>,
    base_score: f32,
    trees: Vec<RegressionTree>,
}

fn parse_base_score(raw: &str) -> Result<f32> {
    // XGBoost 2.x writes a vector like "[5E-1]"
    raw.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<f32>()
        .map_err(|_| ForecastError::Configuration(format!("invalid base_score '{}'", raw)))
}

/// Reads a JSON array of feature names.
pub fn load_feature_list(path: &Path) -> Result<Vec<String>> {
    let data = fs::read_to_string(path).map_err(|e| {
        ForecastError::Configuration(format!("cannot read feature list {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&data).map_err(|e| {
        ForecastError::Configuration(format!("invalid feature list {}: {}", path.display(), e))
    })
}

impl TreeEnsembleModel {
    /// Parses a model from JSON text. `schema_override` replaces the feature
    /// names stored in the model file.
    pub fn from_json(json: &str, schema_override: Option<Vec<String>>) -> Result<Self> {
        let file: XgbModelFile = serde_json::from_str(json)
            .map_err(|e| ForecastError::Configuration(format!("invalid model file: {}", e)))?;
        let learner = file.learner;

        if learner.gradient_booster.name != "gbtree" {
            return Err(ForecastError::Configuration(format!(
                "unsupported booster '{}'",
                learner.gradient_booster.name
            )));
        }
        let forest = learner
            .gradient_booster
            .model
            .ok_or_else(|| ForecastError::Configuration("model has no trees".to_string()))?;

        let schema = match schema_override {
            Some(names) => names,
            None if !learner.feature_names.is_empty() => learner.feature_names,
            None => {
                return Err(ForecastError::Configuration(
                    "model file carries no feature names and no feature list was given".to_string(),
                ))
            }
        };

        let trees = forest
            .trees
            .into_iter()
            .enumerate()
            .map(|(i, tree)| RegressionTree::from_xgb(tree, i))
            .collect::<Result<Vec<_>>>()?;

        if let Some(max) = trees.iter().filter_map(RegressionTree::max_feature).max() {
            if max >= schema.len() {
                return Err(ForecastError::Configuration(format!(
                    "trees split on feature {} but the schema has {} features",
                    max,
                    schema.len()
                )));
            }
        }

        Ok(Self {
            schema,
            base_score: parse_base_score(&learner.learner_model_param.base_score)?,
            trees,
        })
    }

    pub fn load(model_path: &Path, features_path: Option<&Path>) -> Result<Self> {
        let json = fs::read_to_string(model_path).map_err(|e| {
            ForecastError::Configuration(format!(
                "cannot read model {}: {}",
                model_path.display(),
                e
            ))
        })?;
        let schema_override = features_path.map(load_feature_list).transpose()?;
        let model = Self::from_json(&json, schema_override)?;
        log::info!(
            "Loaded model {} with {} trees; features {:?}",
            model_path.display(),
            model.tree_count(),
            model.schema
        );
        Ok(model)
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }
}

impl ModelAdapter for TreeEnsembleModel {
    fn schema(&self) -> &[String] {
        &self.schema
    }

    fn score(&self, features: &FeatureVector) -> Result<f64> {
        if features.len() != self.schema.len()
            || !features.names().eq(self.schema.iter().map(String::as_str))
        {
            return Err(ForecastError::Configuration(format!(
                "feature vector {:?} does not match model schema {:?}",
                features.names().collect::<Vec<_>>(),
                self.schema
            )));
        }
        let x = features.values();
        let mut total = self.base_score;
        for tree in &self.trees {
            total += tree.predict(&x)?;
        }
        Ok(f64::from(total))
    }
}
