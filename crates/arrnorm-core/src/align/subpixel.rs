use ndarray::Array2;

/// Refine peak location using paraboloid fitting on the 3x3 neighborhood.
///
/// Returns (delta_row, delta_col) as fractional pixel offsets from the integer peak.
pub fn refine_peak_paraboloid(
    correlation: &Array2<f64>,
    peak_row: usize,
    peak_col: usize,
) -> (f64, f64) {
    let (h, w) = correlation.dim();

    // Need 3x3 neighborhood; a peak on the border is left unrefined
    if peak_row == 0 || peak_row + 1 >= h || peak_col == 0 || peak_col + 1 >= w {
        return (0.0, 0.0);
    }

    let delta_row = parabola_vertex(
        correlation[[peak_row - 1, peak_col]],
        correlation[[peak_row, peak_col]],
        correlation[[peak_row + 1, peak_col]],
    );
    let delta_col = parabola_vertex(
        correlation[[peak_row, peak_col - 1]],
        correlation[[peak_row, peak_col]],
        correlation[[peak_row, peak_col + 1]],
    );

    (delta_row.clamp(-0.5, 0.5), delta_col.clamp(-0.5, 0.5))
}

/// Vertex offset of the parabola through (-1, prev), (0, curr), (1, next).
fn parabola_vertex(prev: f64, curr: f64, next: f64) -> f64 {
    let denom = prev - 2.0 * curr + next;
    if denom.abs() > 1e-12 {
        (prev - next) / (2.0 * denom)
    } else {
        0.0
    }
}
