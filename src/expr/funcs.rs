//! Built-in math and statistics functions
//!
//! Functions come in three shapes, dispatched through the closed
//! [`MathFunc`] enum:
//!
//! - **Component**: applied element-wise (`sin`, `sqrt`, `round`, ...).
//!   The evaluator classifies every non-finite output as a math error.
//! - **Scalar**: reduce the vector to a single number (`mean`, `median`,
//!   `sum`, ...). Non-finite elements are skipped, so a vector that mixes
//!   data with NaN holes still yields usable statistics.
//! - **Vector**: rewrite the vector in place, preserving length
//!   (`sort`, `norm`).
//!
//! The reductions are also used directly by the special statistic indices
//! (`min`, `max`, `mean`, `sum`, `prod`) in [`crate::index`].

/// A built-in function and its application shape.
#[derive(Clone, Copy)]
pub(crate) enum MathFunc {
    Component(fn(f64) -> f64),
    Scalar(fn(&[f64]) -> f64),
    Vector(fn(&mut Vec<f64>)),
}

/// Resolve a function name. Returns `None` for unknown names, which the
/// evaluator then treats as vector names.
pub(crate) fn lookup(name: &str) -> Option<MathFunc> {
    Some(match name {
        "abs" => MathFunc::Component(f64::abs),
        "acos" => MathFunc::Component(f64::acos),
        "asin" => MathFunc::Component(f64::asin),
        "atan" => MathFunc::Component(f64::atan),
        "ceil" => MathFunc::Component(f64::ceil),
        "cos" => MathFunc::Component(f64::cos),
        "cosh" => MathFunc::Component(f64::cosh),
        "exp" => MathFunc::Component(f64::exp),
        "floor" => MathFunc::Component(f64::floor),
        "log" => MathFunc::Component(f64::ln),
        "log10" => MathFunc::Component(f64::log10),
        "random" => MathFunc::Component(random),
        "round" => MathFunc::Component(f64::round),
        "sin" => MathFunc::Component(f64::sin),
        "sinh" => MathFunc::Component(f64::sinh),
        "sqrt" => MathFunc::Component(f64::sqrt),
        "tan" => MathFunc::Component(f64::tan),
        "tanh" => MathFunc::Component(f64::tanh),

        "adev" => MathFunc::Scalar(adev),
        "kurtosis" => MathFunc::Scalar(kurtosis),
        "length" => MathFunc::Scalar(length),
        "max" => MathFunc::Scalar(vec_max),
        "mean" => MathFunc::Scalar(mean),
        "median" => MathFunc::Scalar(median),
        "min" => MathFunc::Scalar(vec_min),
        "nz" => MathFunc::Scalar(nz),
        "prod" => MathFunc::Scalar(prod),
        "q1" => MathFunc::Scalar(q1),
        "q3" => MathFunc::Scalar(q3),
        "sdev" => MathFunc::Scalar(sdev),
        "skew" => MathFunc::Scalar(skew),
        "sum" => MathFunc::Scalar(sum),
        "var" => MathFunc::Scalar(var),

        "norm" => MathFunc::Vector(norm),
        "sort" => MathFunc::Vector(sort),

        _ => return None,
    })
}

/// Uniform sample in `[0, 1)`; the argument is ignored.
fn random(_x: f64) -> f64 {
    rand::random::<f64>()
}

fn finite(values: &[f64]) -> impl Iterator<Item = f64> + '_ {
    values.iter().copied().filter(|x| x.is_finite())
}

fn finite_count(values: &[f64]) -> usize {
    finite(values).count()
}

// ===== Reductions =====

pub(crate) fn sum(values: &[f64]) -> f64 {
    finite(values).sum()
}

/// Product of the finite elements (1.0 for an empty vector, the usual
/// empty-product identity).
pub(crate) fn prod(values: &[f64]) -> f64 {
    finite(values).product()
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    let count = finite_count(values);
    if count == 0 {
        return 0.0;
    }
    sum(values) / count as f64
}

pub(crate) fn vec_min(values: &[f64]) -> f64 {
    finite(values).fold(None, |best: Option<f64>, x| {
        Some(match best {
            Some(b) if b <= x => b,
            _ => x,
        })
    })
    .unwrap_or(0.0)
}

pub(crate) fn vec_max(values: &[f64]) -> f64 {
    finite(values).fold(None, |best: Option<f64>, x| {
        Some(match best {
            Some(b) if b >= x => b,
            _ => x,
        })
    })
    .unwrap_or(0.0)
}

fn length(values: &[f64]) -> f64 {
    values.len() as f64
}

/// Count of nonzero finite elements.
fn nz(values: &[f64]) -> f64 {
    finite(values).filter(|&x| x != 0.0).count() as f64
}

/// Sample variance (n - 1 denominator); 0.0 with fewer than two elements.
fn var(values: &[f64]) -> f64 {
    let count = finite_count(values);
    if count < 2 {
        return 0.0;
    }
    let mean = mean(values);
    let sum2: f64 = finite(values).map(|x| (x - mean) * (x - mean)).sum();
    sum2 / (count - 1) as f64
}

fn sdev(values: &[f64]) -> f64 {
    var(values).sqrt()
}

/// Average absolute deviation from the mean.
fn adev(values: &[f64]) -> f64 {
    let count = finite_count(values);
    if count == 0 {
        return 0.0;
    }
    let mean = mean(values);
    finite(values).map(|x| (x - mean).abs()).sum::<f64>() / count as f64
}

fn skew(values: &[f64]) -> f64 {
    let count = finite_count(values);
    let sdev = sdev(values);
    if count == 0 || sdev == 0.0 {
        return 0.0;
    }
    let mean = mean(values);
    let sum3: f64 = finite(values).map(|x| (x - mean).powi(3)).sum();
    sum3 / (count as f64 * sdev.powi(3))
}

/// Excess kurtosis (a normal distribution scores 0).
fn kurtosis(values: &[f64]) -> f64 {
    let count = finite_count(values);
    let var = var(values);
    if count == 0 || var == 0.0 {
        return 0.0;
    }
    let mean = mean(values);
    let sum4: f64 = finite(values).map(|x| (x - mean).powi(4)).sum();
    sum4 / (count as f64 * var * var) - 3.0
}

fn sorted_finite(values: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = finite(values).collect();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Median of an already sorted slice, averaging the two middle elements
/// when the count is even.
fn median_of(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        0.0
    } else if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

fn median(values: &[f64]) -> f64 {
    median_of(&sorted_finite(values))
}

/// First quartile: median of the half below the median (the middle element
/// of an odd-length vector belongs to neither half).
fn q1(values: &[f64]) -> f64 {
    let sorted = sorted_finite(values);
    median_of(&sorted[..sorted.len() / 2])
}

/// Third quartile: median of the half above the median.
fn q3(values: &[f64]) -> f64 {
    let sorted = sorted_finite(values);
    median_of(&sorted[(sorted.len() + 1) / 2..])
}

// ===== In-place vector functions =====

/// Ascending sort via an index sort and gather. The index sort is what lets
/// the command layer co-sort auxiliary vectors with the same permutation.
pub(crate) fn sort(values: &mut Vec<f64>) {
    let order = sort_order(values);
    let gathered: Vec<f64> = order.iter().map(|&i| values[i]).collect();
    *values = gathered;
}

/// The ascending permutation of `values`. Tie order is unspecified.
pub(crate) fn sort_order(values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    order
}

/// Rescale all elements linearly into `[0, 1]`. A constant vector maps to
/// all zeros.
pub(crate) fn norm(values: &mut Vec<f64>) {
    let min = vec_min(values);
    let max = vec_max(values);
    let range = max - min;
    if range > 0.0 {
        for value in values.iter_mut() {
            *value = (*value - min) / range;
        }
    } else {
        for value in values.iter_mut() {
            *value = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_reductions() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(sum(&v), 10.0);
        assert_eq!(mean(&v), 2.5);
        assert_eq!(prod(&v), 24.0);
        assert_eq!(vec_min(&v), 1.0);
        assert_eq!(vec_max(&v), 4.0);
        assert_eq!(nz(&[0.0, 1.0, 0.0, 2.0]), 2.0);
    }

    #[test]
    fn test_reductions_skip_non_finite() {
        let v = [1.0, f64::NAN, 3.0, f64::INFINITY];
        assert_eq!(sum(&v), 4.0);
        assert_eq!(mean(&v), 2.0);
    }

    #[test]
    fn test_median_and_quartiles() {
        assert_eq!(median(&[1.0, 2.0, 3.0, 4.0]), 2.5);
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);

        // Odd count: the median element belongs to neither half
        let v = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        assert_eq!(q1(&v), 2.0);
        assert_eq!(q3(&v), 6.0);

        // Even halves interpolate
        let w = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(q1(&w), 1.5);
        assert_eq!(q3(&w), 3.5);
    }

    #[test]
    fn test_variance_family() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert!((var(&v) - 5.0 / 3.0).abs() < 1e-12);
        assert!((sdev(&v) - (5.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert_eq!(skew(&v), 0.0);
        assert_eq!(adev(&v), 1.0);
    }

    #[test]
    fn test_sort_and_norm() {
        let mut v = vec![3.0, 1.0, 2.0];
        sort(&mut v);
        assert_eq!(v, vec![1.0, 2.0, 3.0]);

        let mut w = vec![2.0, 4.0, 6.0];
        norm(&mut w);
        assert_eq!(w, vec![0.0, 0.5, 1.0]);

        let mut flat = vec![5.0, 5.0];
        norm(&mut flat);
        assert_eq!(flat, vec![0.0, 0.0]);
    }

    #[test]
    fn test_sort_order_permutation() {
        let v = [30.0, 10.0, 20.0];
        assert_eq!(sort_order(&v), vec![1, 2, 0]);
    }
}
