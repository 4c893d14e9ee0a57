//! Prioritization weights.
//!
//! Eight criteria steer the downstream allocator. Their relative weights can
//! be entered four ways:
//!
//! | Method | Raw weight of a criterion |
//! |--------|---------------------------|
//! | Sliders | the slider value |
//! | Ranking | `n - position` (first place gets `n`) |
//! | Pairwise | row sum of the comparison matrix |
//! | Preset | fixed profile |
//!
//! Raw weights are exported normalized so that they sum to 1.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// An allocation criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Criterion {
    Fulfillment,
    Fairness,
    PriorityLevel,
    Efficiency,
    SkillMatch,
    CostOptimization,
    Timeline,
    Quality,
}

impl Criterion {
    /// Every criterion in display order.
    pub const ALL: [Criterion; 8] = [
        Criterion::Fulfillment,
        Criterion::Fairness,
        Criterion::PriorityLevel,
        Criterion::Efficiency,
        Criterion::SkillMatch,
        Criterion::CostOptimization,
        Criterion::Timeline,
        Criterion::Quality,
    ];

    /// Serialized identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fulfillment => "fulfillment",
            Self::Fairness => "fairness",
            Self::PriorityLevel => "priorityLevel",
            Self::Efficiency => "efficiency",
            Self::SkillMatch => "skillMatch",
            Self::CostOptimization => "costOptimization",
            Self::Timeline => "timeline",
            Self::Quality => "quality",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Fulfillment => "Request Fulfillment",
            Self::Fairness => "Fair Distribution",
            Self::PriorityLevel => "Priority Compliance",
            Self::Efficiency => "Resource Efficiency",
            Self::SkillMatch => "Skill Matching",
            Self::CostOptimization => "Cost Optimization",
            Self::Timeline => "Timeline Adherence",
            Self::Quality => "Quality Assurance",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Invalid weight input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WeightsError {
    #[error("weight for {criterion} must not be negative, got {value}")]
    Negative { criterion: Criterion, value: f64 },

    #[error("weight for {criterion} must be finite")]
    NonFinite { criterion: Criterion },

    #[error("ranking must list every criterion exactly once")]
    InvalidRanking,

    #[error("comparison of {a} and {b} must be a positive finite number, got {value}")]
    InvalidComparison { a: Criterion, b: Criterion, value: f64 },
}

/// Named weight profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Preset {
    MaximizeFulfillment,
    FairDistribution,
    PriorityDriven,
    EfficiencyFocused,
    CostConscious,
    Balanced,
}

impl Preset {
    pub const ALL: [Preset; 6] = [
        Preset::MaximizeFulfillment,
        Preset::FairDistribution,
        Preset::PriorityDriven,
        Preset::EfficiencyFocused,
        Preset::CostConscious,
        Preset::Balanced,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::MaximizeFulfillment => "Maximize Fulfillment",
            Self::FairDistribution => "Fair Distribution",
            Self::PriorityDriven => "Priority-Driven",
            Self::EfficiencyFocused => "Efficiency Focused",
            Self::CostConscious => "Cost-Conscious",
            Self::Balanced => "Balanced Approach",
        }
    }

    /// Profile weights, in [`Criterion::ALL`] order. Each row sums to 1.
    fn table(&self) -> [f64; 8] {
        match self {
            Self::MaximizeFulfillment => [0.3, 0.1, 0.2, 0.1, 0.1, 0.05, 0.1, 0.05],
            Self::FairDistribution => [0.15, 0.3, 0.15, 0.1, 0.1, 0.05, 0.1, 0.05],
            Self::PriorityDriven => [0.2, 0.1, 0.4, 0.1, 0.1, 0.05, 0.1, 0.05],
            Self::EfficiencyFocused => [0.15, 0.1, 0.15, 0.3, 0.1, 0.1, 0.1, 0.05],
            Self::CostConscious => [0.15, 0.1, 0.15, 0.15, 0.1, 0.3, 0.1, 0.05],
            Self::Balanced => [0.125; 8],
        }
    }

    pub fn weights(&self) -> PriorityWeights {
        PriorityWeights {
            values: self.table(),
        }
    }
}

/// Reciprocal pairwise comparison matrix.
///
/// Starts as the identity: every criterion compared with itself is 1 and
/// all other cells are 0 until set.
#[derive(Debug, Clone, PartialEq)]
pub struct PairwiseMatrix {
    cells: [[f64; 8]; 8],
}

impl Default for PairwiseMatrix {
    fn default() -> Self {
        let mut cells = [[0.0; 8]; 8];
        for (i, row) in cells.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        Self { cells }
    }
}

impl PairwiseMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `a` is `value` times as important as `b`.
    ///
    /// The mirrored cell receives `1 / value`.
    pub fn compare(mut self, a: Criterion, b: Criterion, value: f64) -> Result<Self, WeightsError> {
        if !value.is_finite() || value <= 0.0 {
            return Err(WeightsError::InvalidComparison { a, b, value });
        }
        self.cells[a.index()][b.index()] = value;
        self.cells[b.index()][a.index()] = 1.0 / value;
        Ok(self)
    }

    pub fn get(&self, a: Criterion, b: Criterion) -> f64 {
        self.cells[a.index()][b.index()]
    }

    fn row_sum(&self, a: Criterion) -> f64 {
        self.cells[a.index()].iter().sum()
    }
}

/// Weights per criterion.
///
/// Serializes as a map from criterion identifier to weight.
#[derive(Debug, Clone, PartialEq)]
pub struct PriorityWeights {
    values: [f64; 8],
}

impl Default for PriorityWeights {
    /// Every criterion at 1, the initial slider position.
    fn default() -> Self {
        Self { values: [1.0; 8] }
    }
}

impl PriorityWeights {
    /// Slider input. Criteria not listed keep their default of 1.
    pub fn from_sliders(
        sliders: impl IntoIterator<Item = (Criterion, f64)>,
    ) -> Result<Self, WeightsError> {
        let mut weights = Self::default();
        for (criterion, value) in sliders {
            check(criterion, value)?;
            weights.values[criterion.index()] = value;
        }
        Ok(weights)
    }

    /// Ranking input, most important first.
    pub fn from_ranking(ranking: &[Criterion]) -> Result<Self, WeightsError> {
        let n = Criterion::ALL.len();
        if ranking.len() != n {
            return Err(WeightsError::InvalidRanking);
        }
        let mut values = [0.0; 8];
        let mut seen = [false; 8];
        for (position, criterion) in ranking.iter().enumerate() {
            let i = criterion.index();
            if seen[i] {
                return Err(WeightsError::InvalidRanking);
            }
            seen[i] = true;
            values[i] = (n - position) as f64;
        }
        Ok(Self { values })
    }

    /// Pairwise input: each weight is the row sum of the matrix.
    pub fn from_pairwise(matrix: &PairwiseMatrix) -> Self {
        let mut values = [0.0; 8];
        for criterion in Criterion::ALL {
            values[criterion.index()] = matrix.row_sum(criterion);
        }
        Self { values }
    }

    pub fn get(&self, criterion: Criterion) -> f64 {
        self.values[criterion.index()]
    }

    /// Sum of all weights.
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Scaled copy summing to 1. An all-zero vector is returned unchanged.
    pub fn normalized(&self) -> Self {
        let total = self.total();
        if total == 0.0 {
            return self.clone();
        }
        let mut values = self.values;
        for v in &mut values {
            *v /= total;
        }
        Self { values }
    }

    /// The highest-weighted criterion; ties go to the earlier one.
    pub fn dominant(&self) -> Criterion {
        let mut best = Criterion::ALL[0];
        for criterion in Criterion::ALL {
            if self.get(criterion) > self.get(best) {
                best = criterion;
            }
        }
        best
    }

    /// `(criterion, weight)` pairs in display order.
    pub fn iter(&self) -> impl Iterator<Item = (Criterion, f64)> + '_ {
        Criterion::ALL.into_iter().map(move |c| (c, self.get(c)))
    }
}

fn check(criterion: Criterion, value: f64) -> Result<(), WeightsError> {
    if !value.is_finite() {
        return Err(WeightsError::NonFinite { criterion });
    }
    if value < 0.0 {
        return Err(WeightsError::Negative { criterion, value });
    }
    Ok(())
}

impl Serialize for PriorityWeights {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let map: BTreeMap<Criterion, f64> = self.iter().collect();
        map.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PriorityWeights {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = BTreeMap::<Criterion, f64>::deserialize(deserializer)?;
        PriorityWeights::from_sliders(map).map_err(serde::de::Error::custom)
    }
}
