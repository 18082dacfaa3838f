//! 设备阵列展开
//!
//! 把生成式的 [`EquipmentArray`] 物化为逐台的 [`Equipment`]。

use crate::model::{Equipment, EquipmentArray};
use std::collections::HashSet;

/// 单个阵列允许的最大格位数（行 × 列）
pub const MAX_ARRAY_CELLS: u64 = 100_000;

impl EquipmentArray {
    /// 第 `col` 列左边缘的 x 坐标（米）
    pub fn column_offset(&self, col: u32) -> f64 {
        let corridors = self.corridor_after_col.iter().filter(|&&c| c < col).count() as f64;
        self.start_position.x
            + f64::from(col) * (self.equipment_width + self.spacing_x)
            + corridors * self.corridor_width_x
    }

    /// 第 `row` 行上边缘的 z 坐标（米）
    pub fn row_offset(&self, row: u32) -> f64 {
        let corridors = self.corridor_after_row.iter().filter(|&&r| r < row).count() as f64;
        self.start_position.z
            + f64::from(row) * (self.equipment_depth + self.spacing_z)
            + corridors * self.corridor_width_z
    }

    /// 格位总数（行 × 列），不会溢出
    pub fn cell_count(&self) -> u64 {
        u64::from(self.rows) * u64::from(self.cols)
    }

    pub fn is_oversized(&self) -> bool {
        self.cell_count() > MAX_ARRAY_CELLS
    }

    /// 展开后的设备数量（不含被排除的位置）
    pub fn instance_count(&self) -> u64 {
        let excluded = self
            .excluded_positions
            .iter()
            .filter(|p| self.in_range(p))
            .collect::<HashSet<_>>()
            .len() as u64;
        self.cell_count().saturating_sub(excluded)
    }

    /// 按行优先顺序展开，跳过被排除的位置
    ///
    /// `array_index` 用于生成在整个布局内唯一的设备 ID。
    /// 超过 [`MAX_ARRAY_CELLS`] 的阵列不展开。
    pub fn expand(&self, array_index: usize) -> Vec<Equipment> {
        if self.is_oversized() {
            tracing::warn!(
                "Array {} has {} cells (max {}), not expanded",
                array_index,
                self.cell_count(),
                MAX_ARRAY_CELLS
            );
            return Vec::new();
        }
        let mut result = Vec::new();
        for row in 0..self.rows {
            let y = self.row_offset(row);
            for col in 0..self.cols {
                if self.is_excluded(row, col) {
                    continue;
                }
                let id = format!("arr{}-r{}-c{}", array_index, row, col);
                result.push(
                    Equipment::new(id, self.column_offset(col), y, self.equipment_width, self.equipment_depth)
                        .with_name(format!("R{}C{}", row + 1, col + 1)),
                );
            }
        }
        result
    }
}

/// 展开全部阵列
pub fn expand_all(arrays: &[EquipmentArray]) -> Vec<Equipment> {
    arrays
        .iter()
        .enumerate()
        .flat_map(|(i, array)| array.expand(i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::EPSILON;
    use crate::model::{FloorPoint, GridPosition};

    #[test]
    fn test_expand_grid() {
        let array = EquipmentArray::new(FloorPoint::new(1.0, 2.0), 2, 3, 0.6, 1.2).with_spacing(0.1, 0.5);
        let items = array.expand(0);
        assert_eq!(items.len(), 6);

        let last = &items[5];
        assert_eq!(last.id, "arr0-r1-c2");
        assert_eq!(last.name, "R2C3");
        assert!((last.x - (1.0 + 2.0 * 0.7)).abs() < EPSILON);
        assert!((last.y - (2.0 + 1.7)).abs() < EPSILON);
    }

    #[test]
    fn test_expand_skips_excluded() {
        let array = EquipmentArray::new(FloorPoint::default(), 2, 2, 1.0, 1.0)
            .with_excluded([GridPosition::new(0, 1), GridPosition::new(5, 5)]);
        let items = array.expand(3);
        assert_eq!(items.len(), 3);
        assert_eq!(array.instance_count(), 3);
        assert!(items.iter().all(|e| e.id != "arr3-r0-c1"));
    }

    #[test]
    fn test_corridor_insertion() {
        let array = EquipmentArray::new(FloorPoint::default(), 3, 3, 1.0, 1.0)
            .with_col_corridor(0, 1.5)
            .with_row_corridor(1, 2.0);

        assert!((array.column_offset(0) - 0.0).abs() < EPSILON);
        assert!((array.column_offset(1) - 2.5).abs() < EPSILON);
        assert!((array.column_offset(2) - 3.5).abs() < EPSILON);

        assert!((array.row_offset(1) - 1.0).abs() < EPSILON);
        assert!((array.row_offset(2) - 4.0).abs() < EPSILON);
    }

    #[test]
    fn test_expand_all_unique_ids() {
        let a = EquipmentArray::new(FloorPoint::default(), 1, 2, 1.0, 1.0);
        let b = EquipmentArray::new(FloorPoint::new(5.0, 0.0), 1, 2, 1.0, 1.0);
        let items = expand_all(&[a, b]);
        let ids: HashSet<_> = items.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn test_oversized_array_not_expanded() {
        let huge = EquipmentArray::new(FloorPoint::default(), 4_000_000_000, 4_000_000_000, 1.0, 1.0);
        assert!(huge.is_oversized());
        assert_eq!(huge.cell_count(), 16_000_000_000_000_000_000);
        assert!(huge.expand(0).is_empty());

        let edge = EquipmentArray::new(FloorPoint::default(), 100, 1000, 1.0, 1.0);
        assert!(!edge.is_oversized());
    }
}
