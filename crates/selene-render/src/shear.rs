//! Screen shear table used to fake camera roll.
//!
//! Each row holds one vertical pixel offset per screen column for a discrete
//! roll angle. Row 0 and the last row are the extreme rolls; the middle row is
//! level.

/// Default number of discrete roll angles. Odd, so level flight has its own row.
pub const DEFAULT_SHEAR_ROWS: usize = 51;

#[derive(Clone, Debug, PartialEq)]
pub struct ShearTable {
    rows: usize,
    width: u32,
    maximum_roll: f32,
    offsets: Vec<f32>,
}

impl ShearTable {
    /// Build a table for a raster `width` columns wide. An even `rows` is
    /// bumped to the next odd number.
    pub fn new(width: u32, maximum_roll: f32, rows: usize) -> Self {
        let rows = rows.max(1) | 1;
        let half = (rows / 2) as f32;
        let center = width as f32 / 2.0;
        let mut offsets = Vec::with_capacity(rows * width as usize);

        for i in 0..rows {
            let angle = if half == 0.0 {
                0.0
            } else {
                (i as f32 - half) * maximum_roll / half
            };
            let slope = angle.tan();
            offsets.extend((0..width).map(|h| slope * (h as f32 - center + 0.5)));
        }

        Self {
            rows,
            width,
            maximum_roll,
            offsets,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn maximum_roll(&self) -> f32 {
        self.maximum_roll
    }

    /// Nearest row for `roll`, clamped to `±maximum_roll`.
    pub fn row_for_roll(&self, roll: f32) -> usize {
        let half = self.rows / 2;
        if self.maximum_roll <= 0.0 || !roll.is_finite() {
            return half;
        }
        let roll = roll.clamp(-self.maximum_roll, self.maximum_roll);
        let index = (roll / self.maximum_roll * half as f32).round() as i64 + half as i64;
        index.clamp(0, self.rows as i64 - 1) as usize
    }

    /// Per-column offsets of `row`.
    pub fn row(&self, row: usize) -> &[f32] {
        let width = self.width as usize;
        &self.offsets[row * width..(row + 1) * width]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_middle_row_is_level() {
        let table = ShearTable::new(64, 0.35, DEFAULT_SHEAR_ROWS);
        assert_eq!(table.rows(), 51);
        assert!(table.row(25).iter().all(|&offset| offset == 0.0));
    }

    #[test]
    fn test_rows_are_antisymmetric() {
        let table = ShearTable::new(40, 0.3, DEFAULT_SHEAR_ROWS);
        for i in 0..table.rows() {
            let mirror = table.rows() - 1 - i;
            for (a, b) in table.row(i).iter().zip(table.row(mirror)) {
                assert!((a + b).abs() < 1e-4, "row {i}: {a} vs {b}");
            }
        }
        // Within a row, columns mirror around the center.
        let extreme = table.row(0);
        assert!((extreme[0] + extreme[39]).abs() < 1e-4);
    }

    #[test]
    fn test_extreme_row_offsets() {
        let table = ShearTable::new(4, 0.25, 5);
        let expected = 0.25f32.tan() * (3.0 - 2.0 + 0.5);
        assert!((table.row(4)[3] - expected).abs() < 1e-6);
    }

    #[test]
    fn test_nearest_row_lookup() {
        let table = ShearTable::new(8, 0.5, 51);
        assert_eq!(table.row_for_roll(0.0), 25);
        assert_eq!(table.row_for_roll(0.5), 50);
        assert_eq!(table.row_for_roll(-0.5), 0);
        assert_eq!(table.row_for_roll(9.0), 50);
        // 0.019 / 0.5 * 25 = 0.95, rounds to one row up.
        assert_eq!(table.row_for_roll(0.019), 26);
        assert_eq!(table.row_for_roll(-0.019), 24);
        assert_eq!(table.row_for_roll(0.009), 25);
    }

    #[test]
    fn test_even_row_count_made_odd() {
        assert_eq!(ShearTable::new(4, 0.1, 50).rows(), 51);
    }
}
