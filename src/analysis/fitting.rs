// ---------------------------------------------------------------------------
// Ordinary least squares over an index subset
// ---------------------------------------------------------------------------

/// Outcome of one linear regression `y = slope·x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitResult {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    /// False when there were too few points; the numbers are then zero.
    pub is_valid: bool,
}

impl FitResult {
    pub const INVALID: FitResult = FitResult {
        slope: 0.0,
        intercept: 0.0,
        r_squared: 0.0,
        is_valid: false,
    };

    pub fn eval(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Gather `x[i], y[i]` for each index. Indices past either slice are skipped.
pub fn extract_subset(x: &[f64], y: &[f64], indices: &[usize]) -> (Vec<f64>, Vec<f64>) {
    indices
        .iter()
        .filter_map(|&i| Some((*x.get(i)?, *y.get(i)?)))
        .unzip()
}

/// Fit a line through the selected points (all points when `indices` is `None`).
///
/// Fewer than two points, or points that all share one `x`, give
/// [`FitResult::INVALID`]. `r_squared` is the squared Pearson correlation.
pub fn fit_subset(x: &[f64], y: &[f64], indices: Option<&[usize]>) -> FitResult {
    let (xs, ys) = match indices {
        Some(idx) => extract_subset(x, y, idx),
        None => {
            let n = x.len().min(y.len());
            (x[..n].to_vec(), y[..n].to_vec())
        }
    };
    if xs.len() < 2 {
        return FitResult::INVALID;
    }

    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for (&xi, &yi) in xs.iter().zip(&ys) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    if sxx == 0.0 {
        return FitResult::INVALID;
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    let r_squared = if syy == 0.0 {
        0.0
    } else {
        let r = (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0);
        r * r
    };

    FitResult {
        slope,
        intercept,
        r_squared,
        is_valid: true,
    }
}
