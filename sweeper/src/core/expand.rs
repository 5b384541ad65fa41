//! Sweep expansion: one concrete configuration per combination.
//!
//! Directive-bearing entries (`@sweep`, `@uniform`, `@loguniform`) become
//! dimensions of a cartesian product. Combinations are produced with the last
//! dimension varying fastest, and distribution samples are drawn while each
//! combination is built, so a given seed always yields the same job list.

use indexmap::IndexMap;
use rand::SeedableRng;
use rand::distributions::{Distribution, Standard};
use rand::rngs::StdRng;

use crate::core::directive::{Sampling, parse_key};
use crate::core::error::CompileError;
use crate::core::value::{Config, DistributionKind, DistributionToken, Value};

/// Seeded random source for one compile.
///
/// Constructed once per compile and passed by `&mut` through expansion; draws
/// happen in a single deterministic traversal.
#[derive(Debug, Clone)]
pub struct SampleSource {
    rng: StdRng,
}

impl SampleSource {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Uniform draw in `[0, 1)`.
    pub fn unit(&mut self) -> f64 {
        Standard.sample(&mut self.rng)
    }

    pub fn draw(&mut self, token: &DistributionToken) -> f64 {
        token.sample(self.unit())
    }
}

/// Upper bound on the jobs one entry may expand into, and on the samples a
/// single distribution may draw.
pub const MAX_COMBINATIONS: usize = 1_000_000;

/// Candidate values for each dimension, keyed by residual key in insertion order.
pub type Dimensions = IndexMap<String, Vec<Value>>;

/// Collect the sweep dimensions of a merged configuration.
///
/// Two directives with the same residual key collapse into one dimension;
/// the later directive's candidates win.
pub fn collect_dimensions(merged: &Config) -> Result<Dimensions, CompileError> {
    let mut dimensions = Dimensions::new();
    for (key, value) in merged {
        let parsed = parse_key(key);
        let Some(sampling) = parsed.sampling() else {
            continue;
        };
        let candidates = match sampling {
            Sampling::Sweep => sweep_candidates(key, value)?,
            Sampling::Distribution(kind) => distribution_candidates(key, kind, value)?,
        };
        dimensions.insert(parsed.residual_key(), candidates);
    }
    Ok(dimensions)
}

fn sweep_candidates(key: &str, value: &Value) -> Result<Vec<Value>, CompileError> {
    match value {
        Value::List(items) => Ok(items.clone()),
        other => Err(CompileError::invalid_value(
            key,
            format!("sweep values must be a list, got {}", other.type_name()),
        )),
    }
}

fn distribution_candidates(
    key: &str,
    kind: DistributionKind,
    value: &Value,
) -> Result<Vec<Value>, CompileError> {
    let params = value.as_list().ok_or_else(|| {
        CompileError::invalid_distribution(
            key,
            format!("expected [low, high, count], got {}", value.type_name()),
        )
    })?;
    let [low, high, count] = params else {
        return Err(CompileError::invalid_distribution(
            key,
            format!("expected [low, high, count], got {} elements", params.len()),
        ));
    };
    let low = low
        .as_f64()
        .ok_or_else(|| CompileError::invalid_distribution(key, "low bound must be numeric"))?;
    let high = high
        .as_f64()
        .ok_or_else(|| CompileError::invalid_distribution(key, "high bound must be numeric"))?;
    let count = match count {
        Value::Integer(count) if *count >= 0 => usize::try_from(*count).unwrap_or(usize::MAX),
        other => {
            return Err(CompileError::invalid_distribution(
                key,
                format!("count must be a non-negative integer, got {other}"),
            ));
        }
    };
    if count > MAX_COMBINATIONS {
        return Err(CompileError::invalid_distribution(
            key,
            format!("count {count} exceeds the limit of {MAX_COMBINATIONS} samples"),
        ));
    }
    if kind == DistributionKind::LogUniform && (low <= 0.0 || high <= 0.0) {
        return Err(CompileError::invalid_distribution(
            key,
            format!("loguniform bounds must be positive, got [{low}, {high}]"),
        ));
    }
    let token = DistributionToken { kind, low, high };
    Ok(vec![Value::Distribution(token); count])
}

/// Number of combinations the dimensions produce (1 when there are none).
///
/// Fails on the first dimension that pushes the product past
/// [`MAX_COMBINATIONS`].
pub fn combination_count(dimensions: &Dimensions) -> Result<usize, CompileError> {
    let mut total: usize = 1;
    for (key, candidates) in dimensions {
        total = total
            .checked_mul(candidates.len())
            .filter(|total| *total <= MAX_COMBINATIONS)
            .ok_or_else(|| {
                CompileError::invalid_value(
                    key,
                    format!("sweep expands to more than {MAX_COMBINATIONS} combinations"),
                )
            })?;
    }
    Ok(total)
}

/// Expand a merged configuration into concrete configurations.
pub fn expand(merged: &Config, source: &mut SampleSource) -> Result<Vec<Config>, CompileError> {
    let dimensions = collect_dimensions(merged)?;
    let total = combination_count(&dimensions)?;
    let mut outputs = Vec::with_capacity(total);
    let mut indices = vec![0usize; dimensions.len()];
    for _ in 0..total {
        let chosen = choose(&dimensions, &indices, source);
        outputs.push(build_concrete(merged, &dimensions, &chosen));
        advance(&mut indices, &dimensions);
    }
    Ok(outputs)
}

/// Pick one candidate per dimension, sampling distribution tokens.
fn choose(dimensions: &Dimensions, indices: &[usize], source: &mut SampleSource) -> Config {
    dimensions
        .iter()
        .zip(indices)
        .map(|((key, candidates), index)| {
            let value = match &candidates[*index] {
                Value::Distribution(token) => Value::Float(source.draw(token)),
                other => other.clone(),
            };
            (key.clone(), value)
        })
        .collect()
}

/// Odometer step: the last dimension varies fastest.
fn advance(indices: &mut [usize], dimensions: &Dimensions) {
    for (index, candidates) in indices.iter_mut().zip(dimensions.values()).rev() {
        *index += 1;
        if *index < candidates.len() {
            return;
        }
        *index = 0;
    }
}

/// Replace directive entries in place with the chosen values.
///
/// A plain key shadowed by a directive's residual key is dropped.
fn build_concrete(merged: &Config, dimensions: &Dimensions, chosen: &Config) -> Config {
    let mut concrete = Config::with_capacity(merged.len());
    for (key, value) in merged {
        let parsed = parse_key(key);
        if parsed.sampling().is_some() {
            let residual = parsed.residual_key();
            if let Some(choice) = chosen.get(&residual) {
                concrete.insert(residual, choice.clone());
            }
        } else if !dimensions.contains_key(key) {
            concrete.insert(key.clone(), value.clone());
        }
    }
    concrete
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::config;
    use std::collections::BTreeSet;

    fn ints(values: &[i64]) -> Value {
        Value::List(values.iter().copied().map(Value::Integer).collect())
    }

    #[test]
    fn no_directives_yields_single_copy() {
        let merged = config(&[("a", Value::Integer(1)), ("b", "x".into())]);
        let mut source = SampleSource::from_seed(0);
        let expanded = expand(&merged, &mut source).expect("expand");
        assert_eq!(expanded, vec![merged]);
    }

    #[test]
    fn sweep_product_covers_every_combination_once() {
        let merged = config(&[
            ("@sweep.a", ints(&[1, 2, 3])),
            ("plain", "p".into()),
            ("@sweep.b", ints(&[10, 20])),
        ]);
        let mut source = SampleSource::from_seed(0);
        let expanded = expand(&merged, &mut source).expect("expand");
        assert_eq!(expanded.len(), 6);

        let pairs: BTreeSet<(String, String)> = expanded
            .iter()
            .map(|cfg| (cfg["a"].to_string(), cfg["b"].to_string()))
            .collect();
        assert_eq!(pairs.len(), 6);
        for a in ["1", "2", "3"] {
            for b in ["10", "20"] {
                assert!(pairs.contains(&(a.to_string(), b.to_string())));
            }
        }
    }

    #[test]
    fn last_dimension_varies_fastest() {
        let merged = config(&[("@sweep.a", ints(&[1, 2])), ("@sweep.b", ints(&[3, 4]))]);
        let mut source = SampleSource::from_seed(0);
        let expanded = expand(&merged, &mut source).expect("expand");
        let order: Vec<String> = expanded
            .iter()
            .map(|cfg| format!("{}{}", cfg["a"], cfg["b"]))
            .collect();
        assert_eq!(order, vec!["13", "14", "23", "24"]);
    }

    #[test]
    fn concrete_value_takes_directive_slot() {
        let merged = config(&[
            ("@program", "echo".into()),
            ("@sweep.x", ints(&[1])),
            ("msg", "hi".into()),
        ]);
        let mut source = SampleSource::from_seed(0);
        let expanded = expand(&merged, &mut source).expect("expand");
        let keys: Vec<&str> = expanded[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["@program", "x", "msg"]);
    }

    #[test]
    fn directive_shadows_plain_key_of_same_name() {
        let merged = config(&[("x", Value::Integer(0)), ("@sweep.x", ints(&[5, 6]))]);
        let mut source = SampleSource::from_seed(0);
        let expanded = expand(&merged, &mut source).expect("expand");
        assert_eq!(expanded.len(), 2);
        assert_eq!(expanded[0].len(), 1);
        assert_eq!(expanded[0]["x"], Value::Integer(5));
        assert_eq!(expanded[1]["x"], Value::Integer(6));
    }

    #[test]
    fn env_marker_survives_sweep() {
        let merged = config(&[("@env.@sweep.GPU", ints(&[0, 1]))]);
        let mut source = SampleSource::from_seed(0);
        let expanded = expand(&merged, &mut source).expect("expand");
        assert_eq!(expanded[1]["@env.GPU"], Value::Integer(1));
    }

    #[test]
    fn distribution_draws_count_samples_within_bounds() {
        let merged = config(&[(
            "@uniform.lr",
            Value::List(vec![Value::Float(0.5), Value::Float(1.5), Value::Integer(4)]),
        )]);
        let mut source = SampleSource::from_seed(7);
        let expanded = expand(&merged, &mut source).expect("expand");
        assert_eq!(expanded.len(), 4);
        for cfg in &expanded {
            let lr = cfg["lr"].as_f64().expect("float");
            assert!((0.5..1.5).contains(&lr), "lr = {lr}");
        }
    }

    #[test]
    fn loguniform_samples_stay_within_bounds() {
        let merged = config(&[(
            "@loguniform.lr",
            Value::List(vec![Value::Float(1e-5), Value::Float(1e-1), Value::Integer(16)]),
        )]);
        let mut source = SampleSource::from_seed(3);
        for cfg in expand(&merged, &mut source).expect("expand") {
            let lr = cfg["lr"].as_f64().expect("float");
            assert!((1e-5..1e-1).contains(&lr), "lr = {lr}");
        }
    }

    #[test]
    fn same_seed_gives_identical_samples() {
        let merged = config(&[
            ("@sweep.a", ints(&[1, 2])),
            (
                "@uniform.b",
                Value::List(vec![Value::Integer(0), Value::Integer(1), Value::Integer(3)]),
            ),
        ]);
        let first = expand(&merged, &mut SampleSource::from_seed(11)).expect("expand");
        let second = expand(&merged, &mut SampleSource::from_seed(11)).expect("expand");
        let other = expand(&merged, &mut SampleSource::from_seed(12)).expect("expand");
        assert_eq!(first, second);
        assert_ne!(first, other);
    }

    #[test]
    fn empty_sweep_list_yields_no_combinations() {
        let merged = config(&[("@sweep.a", ints(&[])), ("@sweep.b", ints(&[1, 2]))]);
        let expanded = expand(&merged, &mut SampleSource::from_seed(0)).expect("expand");
        assert!(expanded.is_empty());
    }

    #[test]
    fn rejects_malformed_distribution() {
        let merged = config(&[(
            "@uniform.lr",
            Value::List(vec![Value::Float(0.1), Value::Float(1.0)]),
        )]);
        let err = expand(&merged, &mut SampleSource::from_seed(0)).expect_err("two params");
        assert!(matches!(err, CompileError::InvalidDistribution { ref key, .. } if key == "@uniform.lr"));
    }

    #[test]
    fn rejects_non_positive_loguniform_bounds() {
        let merged = config(&[(
            "@loguniform.lr",
            Value::List(vec![Value::Float(0.0), Value::Float(1.0), Value::Integer(2)]),
        )]);
        let err = expand(&merged, &mut SampleSource::from_seed(0)).expect_err("zero bound");
        assert!(err.to_string().contains("positive"));
    }

    #[test]
    fn rejects_scalar_sweep() {
        let merged = config(&[("@sweep.a", Value::Integer(3))]);
        let err = expand(&merged, &mut SampleSource::from_seed(0)).expect_err("scalar");
        assert!(err.to_string().contains("@sweep.a"));
    }

    #[test]
    fn rejects_oversized_distribution_count() {
        let merged = config(&[(
            "@uniform.lr",
            Value::List(vec![
                Value::Float(0.1),
                Value::Float(0.5),
                Value::Integer(4_611_686_018_427_387_903),
            ]),
        )]);
        let err = expand(&merged, &mut SampleSource::from_seed(0)).expect_err("huge count");
        assert!(matches!(err, CompileError::InvalidDistribution { ref key, .. } if key == "@uniform.lr"));
    }

    #[test]
    fn rejects_product_over_limit() {
        let wide = Value::List(vec![Value::Float(0.1), Value::Float(0.5), Value::Integer(1_000)]);
        let merged = config(&[
            ("@uniform.a", wide.clone()),
            ("@uniform.b", wide.clone()),
            ("@uniform.c", wide),
        ]);
        let err = expand(&merged, &mut SampleSource::from_seed(0)).expect_err("too many");
        assert!(matches!(err, CompileError::InvalidValue { ref key, .. } if key == "c"));
    }

    #[test]
    fn product_at_limit_is_counted() {
        let mut dimensions = Dimensions::new();
        dimensions.insert("a".to_string(), vec![Value::Integer(0); 1_000]);
        dimensions.insert("b".to_string(), vec![Value::Integer(0); 1_000]);
        assert_eq!(combination_count(&dimensions).expect("count"), MAX_COMBINATIONS);
    }
}
