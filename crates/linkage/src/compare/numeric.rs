use tracing::debug;

fn number(value: &str) -> Option<f64> {
    match value.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => Some(n),
        _ => {
            debug!(value, "non-numeric value treated as missing");
            None
        }
    }
}

pub(super) fn percentage(x: &str, y: &str, max_perc_diff: f64) -> Option<f64> {
    let (nx, ny) = (number(x)?, number(y)?);
    if nx == ny {
        return Some(0.0);
    }
    let perc = 100.0 * (nx - ny).abs() / nx.abs().max(ny.abs());
    Some(perc / max_perc_diff)
}

pub(super) fn absolute(x: &str, y: &str, max_abs_diff: f64) -> Option<f64> {
    let (nx, ny) = (number(x)?, number(y)?);
    Some((nx - ny).abs() / max_abs_diff)
}
