/// Exponential moving average with smoothing `2 / (span + 1)`, seeded with
/// the simple mean of the first `span` values. Earlier entries are `None`.
pub fn ema(values: &[f64], span: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if span == 0 || values.len() < span {
        return out;
    }

    let alpha = 2.0 / (span as f64 + 1.0);
    let seed = values[..span].iter().sum::<f64>() / span as f64;
    out[span - 1] = Some(seed);

    let mut prev = seed;
    for (i, &value) in values.iter().enumerate().skip(span) {
        prev = alpha * value + (1.0 - alpha) * prev;
        out[i] = Some(prev);
    }

    out
}
