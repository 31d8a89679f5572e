//! Column-oriented numeric series with explicit missing values.
//!
//! Window operations follow the usual dataframe conventions: a rolling
//! statistic is missing until a full window of present values is available,
//! and any missing value inside the window makes the result missing.
//! Non-finite results (division by zero, constant columns) are stored as
//! missing rather than NaN or infinity.

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series(Vec<Option<f64>>);

impl Series {
    pub fn new(values: Vec<Option<f64>>) -> Self {
        Self(
            values
                .into_iter()
                .map(|v| v.filter(|x| x.is_finite()))
                .collect(),
        )
    }

    pub fn from_values(values: &[f64]) -> Self {
        values.iter().map(|&v| Some(v)).collect()
    }

    pub fn missing(len: usize) -> Self {
        Self(vec![None; len])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.0.get(index).copied().flatten()
    }

    pub fn last(&self) -> Option<f64> {
        self.0.last().copied().flatten()
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        self.0.iter().copied()
    }

    /// Present values in order, missing ones dropped.
    pub fn present(&self) -> Vec<f64> {
        self.0.iter().flatten().copied().collect()
    }

    pub fn map(&self, f: impl Fn(f64) -> f64) -> Series {
        self.iter().map(|v| v.map(&f)).collect()
    }

    /// Applies `f` to every full window of `window` present values.
    pub fn rolling_apply(&self, window: usize, f: impl Fn(&[f64]) -> Option<f64>) -> Series {
        if window == 0 {
            return Series::missing(self.len());
        }
        let mut buf = Vec::with_capacity(window);
        (0..self.len())
            .map(|i| {
                if i + 1 < window {
                    return None;
                }
                buf.clear();
                for v in &self.0[i + 1 - window..=i] {
                    buf.push((*v)?);
                }
                f(&buf)
            })
            .collect()
    }

    pub fn rolling_mean(&self, window: usize) -> Series {
        self.rolling_apply(window, mean)
    }

    /// Rolling sample standard deviation (n - 1 denominator).
    pub fn rolling_std(&self, window: usize) -> Series {
        self.rolling_apply(window, sample_std)
    }

    /// x[i] - x[i - lag]
    pub fn diff(&self, lag: usize) -> Series {
        (0..self.len())
            .map(|i| {
                if i < lag {
                    return None;
                }
                Some(self.get(i)? - self.get(i - lag)?)
            })
            .collect()
    }

    /// x[i] / x[i - 1] - 1
    pub fn pct_change(&self) -> Series {
        (0..self.len())
            .map(|i| {
                if i == 0 {
                    return None;
                }
                Some(self.get(i)? / self.get(i - 1)? - 1.0)
            })
            .collect()
    }

    /// Element-wise self / other.
    pub fn ratio(&self, other: &Series) -> Series {
        self.iter()
            .zip(other.iter())
            .map(|(a, b)| Some(a? / b?))
            .collect()
    }

    pub fn mean(&self) -> Option<f64> {
        mean(&self.present())
    }

    pub fn std(&self) -> Option<f64> {
        sample_std(&self.present())
    }
}

impl FromIterator<Option<f64>> for Series {
    fn from_iter<I: IntoIterator<Item = Option<f64>>>(iter: I) -> Self {
        Series::new(iter.into_iter().collect())
    }
}

impl From<Vec<Option<f64>>> for Series {
    fn from(values: Vec<Option<f64>>) -> Self {
        Series::new(values)
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation; needs at least two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Least-squares slope of `y` against x = 0, 1, 2, ...
pub fn linear_slope(y: &[f64]) -> Option<f64> {
    let n = y.len();
    if n < 2 {
        return None;
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = mean(y)?;
    let mut num = 0.0;
    let mut den = 0.0;
    for (i, v) in y.iter().enumerate() {
        let dx = i as f64 - x_mean;
        num += dx * (v - y_mean);
        den += dx * dx;
    }
    let slope = num / den;
    slope.is_finite().then_some(slope)
}
