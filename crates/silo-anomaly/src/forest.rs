//! 孤立森林（Isolation Forest）
//!
//! 分数约定：`score_samples` 越低越异常；`decision_function` 以训练集的
//! contamination 分位数为零点，负值判定为异常。

use crate::error::{AnomalyError, Result};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// 特征维度：温度、湿度、CO₂ 估算、气体原始值
pub const FEATURES: usize = 4;

const EULER_GAMMA: f64 = 0.577_215_664_9;

/// 训练参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    /// 树的数量
    pub n_estimators: usize,
    /// 每棵树的最大子样本数
    pub max_samples: usize,
    /// 预期异常比例（0, 0.5]
    pub contamination: f64,
    /// 随机种子
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_samples: 256,
            contamination: 0.01,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn path_length(&self, sample: &[f64; FEATURES]) -> f64 {
        let mut node = self;
        let mut depth = 0.0;
        loop {
            match node {
                Node::Leaf { size } => return depth + average_path_length(*size),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if sample[*feature] < *threshold { left } else { right };
                    depth += 1.0;
                }
            }
        }
    }
}

/// 二叉搜索树中失败查找的平均路径长度 c(n)
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

fn build_tree(
    samples: &[[f64; FEATURES]],
    depth: usize,
    height_limit: usize,
    rng: &mut StdRng,
) -> Node {
    if depth >= height_limit || samples.len() <= 1 {
        return Node::Leaf {
            size: samples.len(),
        };
    }

    // 只在子集中取值不唯一的特征上切分
    let splittable: Vec<(usize, f64, f64)> = (0..FEATURES)
        .filter_map(|feature| {
            let (min, max) = samples.iter().fold(
                (f64::INFINITY, f64::NEG_INFINITY),
                |(min, max), s| (min.min(s[feature]), max.max(s[feature])),
            );
            (max > min).then_some((feature, min, max))
        })
        .collect();

    if splittable.is_empty() {
        return Node::Leaf {
            size: samples.len(),
        };
    }

    let (feature, min, max) = splittable[rng.gen_range(0..splittable.len())];
    let threshold = rng.gen_range(min..max);

    let (left, right): (Vec<[f64; FEATURES]>, Vec<[f64; FEATURES]>) =
        samples.iter().copied().partition(|s| s[feature] < threshold);

    Node::Split {
        feature,
        threshold,
        left: Box::new(build_tree(&left, depth + 1, height_limit, rng)),
        right: Box::new(build_tree(&right, depth + 1, height_limit, rng)),
    }
}

/// 线性插值分位数（q ∈ [0, 100]）
fn percentile(values: &[f64], q: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (q / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;

    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

/// 已训练的孤立森林
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationForest {
    trees: Vec<Node>,
    max_samples: usize,
    offset: f64,
}

impl IsolationForest {
    /// 在样本上训练
    pub fn fit(samples: &[[f64; FEATURES]], params: &ForestParams) -> Result<Self> {
        if samples.is_empty() {
            return Err(AnomalyError::EmptyTrainingSet);
        }
        if params.n_estimators == 0 || params.max_samples == 0 {
            return Err(AnomalyError::InvalidParams(
                "n_estimators and max_samples must be positive".to_string(),
            ));
        }
        if !(params.contamination > 0.0 && params.contamination <= 0.5) {
            return Err(AnomalyError::InvalidParams(format!(
                "contamination must be in (0, 0.5], got {}",
                params.contamination
            )));
        }

        let max_samples = params.max_samples.min(samples.len());
        let height_limit = (max_samples.max(2) as f64).log2().ceil() as usize;
        let mut rng = StdRng::seed_from_u64(params.seed);

        let trees = (0..params.n_estimators)
            .map(|_| {
                let subsample: Vec<[f64; FEATURES]> =
                    index::sample(&mut rng, samples.len(), max_samples)
                        .into_iter()
                        .map(|i| samples[i])
                        .collect();
                build_tree(&subsample, 0, height_limit, &mut rng)
            })
            .collect();

        let mut forest = Self {
            trees,
            max_samples,
            offset: 0.0,
        };

        let scores: Vec<f64> = samples.iter().map(|s| forest.score_sample(s)).collect();
        forest.offset = percentile(&scores, params.contamination * 100.0);

        Ok(forest)
    }

    /// 原始异常分数，取值 [-1, 0)，越低越异常
    pub fn score_sample(&self, sample: &[f64; FEATURES]) -> f64 {
        let mean_path = self
            .trees
            .iter()
            .map(|tree| tree.path_length(sample))
            .sum::<f64>()
            / self.trees.len() as f64;

        let normalizer = average_path_length(self.max_samples);
        if normalizer == 0.0 {
            return -1.0;
        }

        -(2f64.powf(-mean_path / normalizer))
    }

    pub fn score_samples(&self, samples: &[[f64; FEATURES]]) -> Vec<f64> {
        samples.iter().map(|s| self.score_sample(s)).collect()
    }

    /// 决策分数：负值为异常
    pub fn decision_function(&self, sample: &[f64; FEATURES]) -> f64 {
        self.score_sample(sample) - self.offset
    }

    pub fn predict(&self, sample: &[f64; FEATURES]) -> bool {
        self.decision_function(sample) < 0.0
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn n_estimators(&self) -> usize {
        self.trees.len()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
