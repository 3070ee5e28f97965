use super::ema::ema;

#[derive(Debug, Clone, PartialEq)]
pub struct Macd {
    pub line: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

/// Moving average convergence/divergence: `line = EMA(fast) - EMA(slow)`,
/// `signal = EMA(signal) of line`, `histogram = line - signal`.
pub fn macd(closes: &[Option<f64>], fast: usize, slow: usize, signal: usize) -> Macd {
    assert!(fast < slow, "MACD fast period must be shorter than slow period");

    let fast_ema = ema(closes, fast);
    let slow_ema = ema(closes, slow);

    let line: Vec<Option<f64>> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();
    let signal = ema(&line, signal);
    let histogram = line
        .iter()
        .zip(&signal)
        .map(|(l, s)| Some((*l)? - (*s)?))
        .collect();

    Macd {
        line,
        signal,
        histogram,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn closes(n: usize) -> Vec<Option<f64>> {
        (0..n)
            .map(|i| Some(100.0 + (i as f64 * 0.3).sin() * 5.0 + i as f64 * 0.1))
            .collect()
    }

    #[test]
    fn warmup_lengths() {
        let m = macd(&closes(60), 12, 26, 9);
        assert!(m.line[..25].iter().all(Option::is_none));
        assert!(m.line[25..].iter().all(Option::is_some));
        assert!(m.signal[..33].iter().all(Option::is_none));
        assert!(m.signal[33..].iter().all(Option::is_some));
        assert!(m.histogram[..33].iter().all(Option::is_none));
    }

    #[test]
    fn histogram_is_line_minus_signal() {
        let m = macd(&closes(120), 12, 26, 9);
        for i in 0..120 {
            if let (Some(l), Some(s)) = (m.line[i], m.signal[i]) {
                let h = m.histogram[i].unwrap();
                assert!((h - (l - s)).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn constant_series_has_zero_macd() {
        let flat = vec![Some(42.0); 50];
        let m = macd(&flat, 12, 26, 9);
        assert!(m.line[49].unwrap().abs() < 1e-9);
        assert!(m.histogram[49].unwrap().abs() < 1e-9);
    }

    #[test]
    fn short_series_is_all_missing() {
        let m = macd(&closes(20), 12, 26, 9);
        assert!(m.line.iter().chain(&m.signal).chain(&m.histogram).all(Option::is_none));
    }
}
