use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::{PmmlError, PmmlResult};
use crate::number::Number;

/// Neuron activation functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Activation {
    Threshold,
    Logistic,
    Tanh,
    Identity,
    Exponential,
    Reciprocal,
    Square,
    Gauss,
    Sine,
    Cosine,
    Elliott,
    Arctan,
    Rectifier,
    RadialBasis,
}

/// A mutable numeric accumulator.
///
/// Arithmetic happens in place and returns `&mut Self` so steps chain.
/// `Value` is deliberately not `Copy`; use `clone()` for a copy.
#[derive(Debug, Clone, PartialEq, PartialOrd, Default)]
pub struct Value<N: Number> {
    value: N,
}

// ─── Construction ───────────────────────────────────────────────────────────

impl<N: Number> Value<N> {
    pub fn new(value: N) -> Self {
        Value { value }
    }

    pub fn zero() -> Self {
        Value { value: N::ZERO }
    }

    pub fn from_f64(value: f64) -> Self {
        Value { value: N::from_f64(value) }
    }

    pub fn get(&self) -> N {
        self.value
    }

    pub fn to_f64(&self) -> f64 {
        self.value.to_f64()
    }

    // ─── Arithmetic ─────────────────────────────────────────────────────────

    pub fn add(&mut self, v: N) -> &mut Self {
        self.value += v;
        self
    }

    pub fn add_value(&mut self, v: &Value<N>) -> &mut Self {
        self.value += v.value;
        self
    }

    /// `self += coefficient * factor`.
    pub fn add_product(&mut self, coefficient: N, factor: N) -> &mut Self {
        self.value += coefficient * factor;
        self
    }

    pub fn subtract(&mut self, v: N) -> &mut Self {
        self.value -= v;
        self
    }

    pub fn multiply(&mut self, v: N) -> &mut Self {
        self.value *= v;
        self
    }

    pub fn divide(&mut self, v: N) -> &mut Self {
        self.value /= v;
        self
    }

    /// `self = 1 - self`.
    pub fn residual(&mut self) -> &mut Self {
        self.value = N::ONE - self.value;
        self
    }

    pub fn power(&mut self, exponent: N) -> &mut Self {
        self.value = self.value.powf(exponent);
        self
    }

    pub fn square(&mut self) -> &mut Self {
        self.value = self.value * self.value;
        self
    }

    pub fn exp(&mut self) -> &mut Self {
        self.value = self.value.exp();
        self
    }

    pub fn reciprocal(&mut self) -> &mut Self {
        self.value = self.value.recip();
        self
    }

    // ─── Link functions ─────────────────────────────────────────────────────

    pub fn inverse_logit(&mut self) -> &mut Self {
        self.value = N::ONE / (N::ONE + (-self.value).exp());
        self
    }

    pub fn inverse_cloglog(&mut self) -> &mut Self {
        self.value = N::ONE - (-self.value.exp()).exp();
        self
    }

    pub fn inverse_loglog(&mut self) -> &mut Self {
        self.value = (-(-self.value).exp()).exp();
        self
    }

    pub fn inverse_cauchit(&mut self) -> &mut Self {
        self.value = N::HALF + self.value.atan() / N::PI;
        self
    }

    /// Apply a neuron activation function. `threshold` only matters for
    /// [`Activation::Threshold`].
    pub fn activate(&mut self, activation: Activation, threshold: N) -> PmmlResult<&mut Self> {
        let z = self.value;
        self.value = match activation {
            Activation::Threshold => if z > threshold { N::ONE } else { N::ZERO },
            Activation::Logistic => N::ONE / (N::ONE + (-z).exp()),
            Activation::Tanh => z.tanh(),
            Activation::Identity => z,
            Activation::Exponential => z.exp(),
            Activation::Reciprocal => z.recip(),
            Activation::Square => z * z,
            Activation::Gauss => (-(z * z)).exp(),
            Activation::Sine => z.sin(),
            Activation::Cosine => z.cos(),
            Activation::Elliott => z / (N::ONE + z.abs()),
            Activation::Arctan => N::TWO * z.atan() / N::PI,
            Activation::Rectifier => z.max(N::ZERO),
            Activation::RadialBasis => return Err(PmmlError::unsupported("activationFunction", activation)),
        };
        Ok(self)
    }

    // ─── One-shot reductions ────────────────────────────────────────────────

    pub fn sum(values: &[N]) -> Option<Value<N>> {
        if values.is_empty() {
            return None;
        }
        Some(Value::new(values.iter().copied().sum()))
    }

    pub fn average(values: &[N]) -> Option<Value<N>> {
        let mut sum = Value::sum(values)?;
        sum.divide(N::from_usize(values.len()));
        Some(sum)
    }

    pub fn weighted_sum(values: &[N], weights: &[N]) -> Option<Value<N>> {
        if values.is_empty() || values.len() != weights.len() {
            return None;
        }
        let mut result = Value::zero();
        for (&v, &w) in values.iter().zip(weights) {
            result.add_product(w, v);
        }
        Some(result)
    }

    pub fn weighted_average(values: &[N], weights: &[N]) -> Option<Value<N>> {
        let mut result = Value::weighted_sum(values, weights)?;
        let total: N = weights.iter().copied().sum();
        result.divide(total);
        Some(result)
    }

    /// Middle element of the sorted values; the mean of the two middle
    /// elements for even counts.
    pub fn median(values: &[N]) -> Option<Value<N>> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / N::TWO
        } else {
            sorted[mid]
        };
        Some(Value::new(median))
    }

    /// Smallest value whose cumulative weight reaches half the total weight.
    pub fn weighted_median(values: &[N], weights: &[N]) -> Option<Value<N>> {
        if values.is_empty() || values.len() != weights.len() {
            return None;
        }
        let mut pairs: Vec<(N, N)> = values.iter().copied().zip(weights.iter().copied()).collect();
        pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

        let total: N = weights.iter().copied().sum();
        let half = total * N::HALF;
        let mut cumulative = N::ZERO;
        for &(value, weight) in &pairs {
            cumulative += weight;
            if cumulative >= half {
                return Some(Value::new(value));
            }
        }
        pairs.last().map(|&(value, _)| Value::new(value))
    }

    // ─── Layer normalization ────────────────────────────────────────────────

    pub fn softmax(values: &mut [Value<N>]) {
        if values.is_empty() {
            return;
        }
        let max = values.iter().map(|v| v.value).fold(values[0].value, |a, b| a.max(b));
        let mut sum = N::ZERO;
        for v in values.iter_mut() {
            v.value = (v.value - max).exp();
            sum += v.value;
        }
        for v in values.iter_mut() {
            v.value /= sum;
        }
    }

    pub fn simplemax(values: &mut [Value<N>]) {
        let sum: N = values.iter().map(|v| v.value).sum();
        if sum == N::ZERO {
            return;
        }
        for v in values.iter_mut() {
            v.value /= sum;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const SEGMENTS: [f64; 3] = [2.0, 4.0, 6.0];
    const WEIGHTS: [f64; 3] = [1.0, 2.0, 3.0];

    #[test]
    fn test_reductions() {
        assert_abs_diff_eq!(Value::sum(&SEGMENTS).unwrap().get(), 12.0);
        assert_abs_diff_eq!(Value::average(&SEGMENTS).unwrap().get(), 4.0);
        assert_abs_diff_eq!(Value::median(&SEGMENTS).unwrap().get(), 4.0);
        assert_abs_diff_eq!(
            Value::weighted_average(&SEGMENTS, &WEIGHTS).unwrap().get(),
            28.0 / 6.0,
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(Value::weighted_sum(&SEGMENTS, &WEIGHTS).unwrap().get(), 28.0);
    }

    #[test]
    fn test_median_even_count() {
        assert_abs_diff_eq!(Value::median(&[4.0, 1.0, 3.0, 2.0]).unwrap().get(), 2.5);
    }

    #[test]
    fn test_weighted_median() {
        // Cumulative shares: 1/6, 3/6 -> 4.0 is the first to reach one half.
        assert_abs_diff_eq!(Value::weighted_median(&SEGMENTS, &WEIGHTS).unwrap().get(), 4.0);
        assert_abs_diff_eq!(Value::weighted_median(&[1.0, 2.0, 3.0], &[1.0, 1.0, 10.0]).unwrap().get(), 3.0);
    }

    #[test]
    fn test_empty_reductions() {
        assert!(Value::<f64>::sum(&[]).is_none());
        assert!(Value::<f64>::median(&[]).is_none());
        assert!(Value::<f64>::weighted_median(&[1.0], &[]).is_none());
    }

    #[test]
    fn test_chained_arithmetic() {
        let mut v = Value::new(3.0f64);
        v.multiply(2.0).add(1.0).residual();
        assert_abs_diff_eq!(v.get(), -6.0);
    }

    #[test]
    fn test_activations() {
        let mut v = Value::new(0.0f64);
        v.activate(Activation::Logistic, 0.0).unwrap();
        assert_abs_diff_eq!(v.get(), 0.5);

        let mut v = Value::new(-2.0f64);
        v.activate(Activation::Rectifier, 0.0).unwrap();
        assert_abs_diff_eq!(v.get(), 0.0);

        let mut v = Value::new(0.3f64);
        v.activate(Activation::Threshold, 0.5).unwrap();
        assert_abs_diff_eq!(v.get(), 0.0);

        let mut v = Value::new(1.0f64);
        assert!(v.activate(Activation::RadialBasis, 0.0).is_err());
    }

    #[test]
    fn test_link_functions() {
        let mut v = Value::new(0.0f64);
        v.inverse_cauchit();
        assert_abs_diff_eq!(v.get(), 0.5);

        let mut v = Value::new(0.0f64);
        v.inverse_cloglog();
        assert_abs_diff_eq!(v.get(), 1.0 - (-1.0f64).exp(), epsilon = 1e-12);
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let mut values = vec![Value::new(1.0f32), Value::new(2.0), Value::new(3.0)];
        Value::softmax(&mut values);
        let total: f32 = values.iter().map(|v| v.get()).sum();
        assert_abs_diff_eq!(total, 1.0, epsilon = 1e-6);
        assert!(values[2] > values[1]);
    }
}
