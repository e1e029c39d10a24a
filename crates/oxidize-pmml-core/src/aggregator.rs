use std::collections::{BTreeMap, BTreeSet};

use crate::error::{PmmlError, PmmlResult};
use crate::number::Number;
use crate::value::Value;

/// Aggregates numeric contributions.
///
/// Sums, averages and the maximum stream in O(1) memory. Medians need every
/// contribution, so they are only available when the aggregator was created
/// with [`ValueAggregator::buffered`].
#[derive(Debug, Clone)]
pub struct ValueAggregator<N: Number> {
    count: usize,
    sum: N,
    weighted_sum: N,
    weight_sum: N,
    max: Option<N>,
    buffer: Option<(Vec<N>, Vec<N>)>,
}

impl<N: Number> ValueAggregator<N> {
    pub fn streaming() -> Self {
        ValueAggregator {
            count: 0,
            sum: N::ZERO,
            weighted_sum: N::ZERO,
            weight_sum: N::ZERO,
            max: None,
            buffer: None,
        }
    }

    pub fn buffered() -> Self {
        ValueAggregator {
            buffer: Some((Vec::new(), Vec::new())),
            ..ValueAggregator::streaming()
        }
    }

    pub fn add(&mut self, value: N) {
        self.add_weighted(value, N::ONE);
    }

    pub fn add_weighted(&mut self, value: N, weight: N) {
        self.count += 1;
        self.sum += value;
        self.weighted_sum += weight * value;
        self.weight_sum += weight;
        self.max = Some(match self.max {
            Some(max) => max.max(value),
            None => value,
        });
        if let Some((values, weights)) = &mut self.buffer {
            values.push(value);
            weights.push(weight);
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn sum(&self) -> Option<Value<N>> {
        (self.count > 0).then(|| Value::new(self.sum))
    }

    pub fn average(&self) -> Option<Value<N>> {
        (self.count > 0).then(|| Value::new(self.sum / N::from_usize(self.count)))
    }

    pub fn weighted_sum(&self) -> Option<Value<N>> {
        (self.count > 0).then(|| Value::new(self.weighted_sum))
    }

    pub fn weighted_average(&self) -> Option<Value<N>> {
        (self.count > 0).then(|| Value::new(self.weighted_sum / self.weight_sum))
    }

    pub fn max(&self) -> Option<Value<N>> {
        self.max.map(Value::new)
    }

    pub fn median(&self) -> PmmlResult<Option<Value<N>>> {
        let (values, _) = self.require_buffer("median")?;
        Ok(Value::median(values))
    }

    pub fn weighted_median(&self) -> PmmlResult<Option<Value<N>>> {
        let (values, weights) = self.require_buffer("weightedMedian")?;
        Ok(Value::weighted_median(values, weights))
    }

    fn require_buffer(&self, what: &str) -> PmmlResult<(&[N], &[N])> {
        self.buffer
            .as_ref()
            .map(|(v, w)| (v.as_slice(), w.as_slice()))
            .ok_or_else(|| PmmlError::InvalidArgument(format!("{} requires a buffered aggregator", what)))
    }
}

/// Category -> accumulated vote weight.
///
/// Ties on vote weight go to the category with the larger accumulated
/// training record count, then to the lexicographically smallest category.
#[derive(Debug, Clone, Default)]
pub struct VoteAggregator<N: Number> {
    votes: BTreeMap<String, (N, N)>,
}

impl<N: Number> VoteAggregator<N> {
    pub fn new() -> Self {
        VoteAggregator { votes: BTreeMap::new() }
    }

    /// One vote (weight 1).
    pub fn add(&mut self, category: &str) {
        self.add_weighted(category, N::ONE, N::ZERO);
    }

    /// A vote of `weight`, backed by `record_count` training records.
    pub fn add_weighted(&mut self, category: &str, weight: N, record_count: N) {
        let entry = self.votes.entry(category.to_string()).or_insert((N::ZERO, N::ZERO));
        entry.0 += weight;
        entry.1 += record_count;
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    pub fn winner(&self) -> Option<String> {
        let mut best: Option<(&String, N, N)> = None;
        // BTreeMap iterates in ascending key order, so keeping the first of
        // equal candidates yields the lexicographically smallest.
        for (category, &(votes, records)) in &self.votes {
            let better = match best {
                None => true,
                Some((_, best_votes, best_records)) => {
                    votes > best_votes || (votes == best_votes && records > best_records)
                }
            };
            if better {
                best = Some((category, votes, records));
            }
        }
        best.map(|(category, _, _)| category.clone())
    }

    pub fn votes(&self) -> BTreeMap<String, N> {
        self.votes.iter().map(|(k, &(v, _))| (k.clone(), v)).collect()
    }
}

/// Aggregates per-category probability distributions independently.
///
/// A category absent from one contribution counts as zero there. The
/// aggregated distribution is not renormalized.
#[derive(Debug, Clone, Default)]
pub struct ProbabilityAggregator<N: Number> {
    contributions: Vec<(BTreeMap<String, N>, N)>,
}

impl<N: Number> ProbabilityAggregator<N> {
    pub fn new() -> Self {
        ProbabilityAggregator { contributions: Vec::new() }
    }

    pub fn add(&mut self, distribution: BTreeMap<String, N>) {
        self.add_weighted(distribution, N::ONE);
    }

    pub fn add_weighted(&mut self, distribution: BTreeMap<String, N>, weight: N) {
        self.contributions.push((distribution, weight));
    }

    pub fn is_empty(&self) -> bool {
        self.contributions.is_empty()
    }

    pub fn average(&self) -> BTreeMap<String, N> {
        self.reduce(|v, _| Value::average(v))
    }

    pub fn weighted_average(&self) -> BTreeMap<String, N> {
        self.reduce(Value::weighted_average)
    }

    pub fn median(&self) -> BTreeMap<String, N> {
        self.reduce(|v, _| Value::median(v))
    }

    pub fn max(&self) -> BTreeMap<String, N> {
        self.reduce(|v, _| {
            v.iter().copied().reduce(|a, b| a.max(b)).map(Value::new)
        })
    }

    fn reduce<F>(&self, f: F) -> BTreeMap<String, N>
    where
        F: Fn(&[N], &[N]) -> Option<Value<N>>,
    {
        let categories: BTreeSet<&String> = self.contributions.iter().flat_map(|(d, _)| d.keys()).collect();
        let weights: Vec<N> = self.contributions.iter().map(|(_, w)| *w).collect();

        let mut result = BTreeMap::new();
        for category in categories {
            let values: Vec<N> = self
                .contributions
                .iter()
                .map(|(d, _)| d.get(category).copied().unwrap_or(N::ZERO))
                .collect();
            if let Some(v) = f(&values, &weights) {
                result.insert(category.clone(), v.get());
            }
        }
        result
    }
}
