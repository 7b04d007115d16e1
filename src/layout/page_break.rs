//! # Page Break Decisions
//!
//! Rows are unbreakable fixed-height bands, so the only question is whether
//! the next band still fits above the bottom margin.

/// Tolerance for comparing accumulated point positions.
pub const EPSILON: f64 = 1e-9;

/// What to do with the next band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakDecision {
    /// The band fits at the current cursor.
    Place,
    /// The band would cross the limit: open a new page first.
    NewPage,
}

/// Decide whether a band of `height` placed at `cursor` stays above `limit`.
pub fn decide_row_break(cursor: f64, height: f64, limit: f64) -> BreakDecision {
    if fits_after(cursor, height, limit) {
        BreakDecision::Place
    } else {
        BreakDecision::NewPage
    }
}

/// Whether `cursor + height` stays at or above `limit`.
pub fn fits_after(cursor: f64, height: f64, limit: f64) -> bool {
    cursor + height <= limit + EPSILON
}

/// How many bands of `row_height` fit into `body_height`.
pub fn rows_per_page(body_height: f64, row_height: f64) -> usize {
    if row_height <= 0.0 || body_height <= 0.0 {
        return 0;
    }
    ((body_height + EPSILON) / row_height).floor() as usize
}
