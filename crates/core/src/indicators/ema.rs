/// Exponential moving average, seeded with the simple average of the first
/// `period` defined values and smoothed with `k = 2 / (period + 1)`.
///
/// Rows before the seed are `None`. A missing input row yields `None` for that
/// row and leaves the running average untouched, so later rows keep going.
pub fn ema(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    assert!(period > 0, "EMA period must be > 0");

    let k = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut seed_sum = 0.0;
    let mut seen = 0usize;
    let mut prev: Option<f64> = None;

    for value in values {
        let Some(x) = *value else {
            out.push(None);
            continue;
        };

        prev = match prev {
            Some(p) => Some(x * k + p * (1.0 - k)),
            None => {
                seed_sum += x;
                seen += 1;
                (seen == period).then(|| seed_sum / period as f64)
            }
        };
        out.push(prev);
    }

    out
}
