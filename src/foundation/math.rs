/// Absolute tolerance used when comparing accumulated second values.
pub const SECS_EPSILON: f64 = 1e-6;

/// Format seconds the way the compositor's command line expects them.
///
/// Millisecond precision; `-0.000` never appears.
pub fn fmt_secs(secs: f64) -> String {
    let s = format!("{secs:.3}");
    if s == "-0.000" { "0.000".to_string() } else { s }
}

pub(crate) fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= SECS_EPSILON
}
