/// Wilder's relative strength index over `period` price changes.
///
/// The first row has no predecessor and contributes a change of zero, so the
/// first value appears at row `period - 1`. Values lie in `[0, 100]`.
pub fn rsi(closes: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    assert!(period > 0, "RSI period must be > 0");

    let n = period as f64;
    let mut out = Vec::with_capacity(closes.len());
    let mut prev_close: Option<f64> = None;
    let mut changes = 0usize;
    let mut gain_sum = 0.0;
    let mut loss_sum = 0.0;
    let mut avg: Option<(f64, f64)> = None;

    for close in closes {
        let Some(close) = *close else {
            out.push(None);
            continue;
        };

        let change = prev_close.map_or(0.0, |p| close - p);
        prev_close = Some(close);
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);

        avg = match avg {
            Some((g, l)) => Some(((g * (n - 1.0) + gain) / n, (l * (n - 1.0) + loss) / n)),
            None => {
                gain_sum += gain;
                loss_sum += loss;
                changes += 1;
                (changes == period).then(|| (gain_sum / n, loss_sum / n))
            }
        };

        out.push(avg.map(|(g, l)| strength_index(g, l)));
    }

    out
}

fn strength_index(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_gain == 0.0 && avg_loss == 0.0 {
        return 50.0;
    }
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(v: impl IntoIterator<Item = f64>) -> Vec<Option<f64>> {
        v.into_iter().map(Some).collect()
    }

    #[test]
    fn first_thirteen_rows_are_undefined() {
        let closes = some((0..40).map(|i| 100.0 + ((i * 7) % 11) as f64));
        let out = rsi(&closes, 14);
        assert!(out[..13].iter().all(Option::is_none));
        assert!(out[13..].iter().all(Option::is_some));
    }

    #[test]
    fn values_stay_in_range() {
        let closes = some((0..200).map(|i| 50.0 + (i as f64 * 0.37).sin() * 10.0 + i as f64 * 0.05));
        for v in rsi(&closes, 14).into_iter().flatten() {
            assert!((0.0..=100.0).contains(&v), "{v}");
        }
    }

    #[test]
    fn monotonic_series_hit_the_bounds() {
        let up = rsi(&some((0..20).map(f64::from)), 14);
        assert_eq!(up[19], Some(100.0));

        let down = rsi(&some((0..20).map(|i| 100.0 - f64::from(i))), 14);
        assert_eq!(down[19], Some(0.0));
    }

    #[test]
    fn flat_series_is_neutral() {
        let out = rsi(&some(std::iter::repeat(10.0).take(16)), 14);
        assert_eq!(out[15], Some(50.0));
    }

    #[test]
    fn known_seed_value() {
        // Zero first change, twelve +1 changes, then one -1.
        let mut closes: Vec<f64> = (0..14).map(f64::from).collect();
        closes[13] = 11.0;
        let out = rsi(&some(closes), 14);
        // avg gain 12/14, avg loss 1/14 -> rs 12 -> 100 - 100/13
        let expected = 100.0 - 100.0 / 13.0;
        assert!((out[13].unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn missing_close_is_skipped() {
        let mut closes = some((0..20).map(f64::from));
        closes[15] = None;
        let out = rsi(&closes, 14);
        assert_eq!(out[15], None);
        assert_eq!(out[16], Some(100.0));
    }
}
