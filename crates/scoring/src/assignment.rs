//! Maximum-weight bipartite assignment (Hungarian / Kuhn-Munkres).

use pathfinding::kuhn_munkres::kuhn_munkres;
use pathfinding::matrix::Matrix;

/// Fixed-point scale; similarities are in [0, 1] and the solver needs
/// integer weights.
const SCALE: f64 = 1_000_000.0;

/// Find the one-to-one assignment of rows to columns that maximizes total
/// weight. Returns `min(rows, cols)` `(row, col)` pairs sorted by row.
///
/// `weights` must be rectangular; an empty side yields no pairs.
pub fn max_weight_assignment(weights: &[Vec<f64>]) -> Vec<(usize, usize)> {
    let rows = weights.len();
    let cols = weights.first().map_or(0, Vec::len);
    if rows == 0 || cols == 0 {
        return Vec::new();
    }

    let fixed = |w: f64| (w * SCALE).round() as i64;

    // The solver requires rows <= columns; solve the transpose otherwise.
    let mut pairs: Vec<(usize, usize)> = if rows <= cols {
        let mut m = Matrix::new(rows, cols, 0i64);
        for (r, row) in weights.iter().enumerate() {
            for (c, &w) in row.iter().enumerate().take(cols) {
                m[(r, c)] = fixed(w);
            }
        }
        let (_, assign) = kuhn_munkres(&m);
        assign.into_iter().enumerate().collect()
    } else {
        let mut m = Matrix::new(cols, rows, 0i64);
        for (r, row) in weights.iter().enumerate() {
            for (c, &w) in row.iter().enumerate().take(cols) {
                m[(c, r)] = fixed(w);
            }
        }
        let (_, assign) = kuhn_munkres(&m);
        assign.into_iter().enumerate().map(|(c, r)| (r, c)).collect()
    };

    pairs.sort_unstable();
    pairs
}
