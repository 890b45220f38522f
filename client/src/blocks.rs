use pixelgrid_shared::{Cell, GridPos};

use crate::viewport::GridRange;

/// A coordinate resolved to the block that owns it.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedBlock<'a> {
    /// The origin cell, or the cell itself for a standalone coordinate.
    pub cell: &'a Cell,
    pub origin: GridPos,
    pub width: i32,
    pub height: i32,
}

impl ResolvedBlock<'_> {
    pub fn footprint(&self) -> GridRange {
        GridRange {
            min_col: self.origin.x,
            max_col: self.origin.x + self.width - 1,
            min_row: self.origin.y,
            max_row: self.origin.y + self.height - 1,
        }
    }
}

/// Row-major slot of an in-bounds `pos`, computed in `usize` so large grids cannot
/// overflow `i32`.
fn slot_index(cols: i32, pos: GridPos) -> usize {
    pos.y as usize * cols as usize + pos.x as usize
}

/// Dense `cols × rows` lookup from coordinate to cell, with block resolution.
/// Rebuilt only when the snapshot is replaced.
#[derive(Debug)]
pub struct BlockIndex {
    cols: i32,
    rows: i32,
    cells: Vec<Cell>,
    slots: Vec<Option<u32>>,
    discarded: usize,
}

impl BlockIndex {
    pub fn empty(cols: i32, rows: i32) -> Self {
        Self::build(cols, rows, Vec::new())
    }

    pub fn build(cols: i32, rows: i32, snapshot: Vec<Cell>) -> Self {
        let cols = cols.max(0);
        let rows = rows.max(0);
        let mut slots = vec![None; cols as usize * rows as usize];
        let mut cells = Vec::with_capacity(snapshot.len());
        let mut discarded = 0usize;
        let mut duplicates = 0usize;

        for cell in snapshot {
            if cell.x < 0 || cell.y < 0 || cell.x >= cols || cell.y >= rows {
                discarded += 1;
                continue;
            }
            let slot = &mut slots[slot_index(cols, cell.pos())];
            match *slot {
                // Later records for the same coordinate win.
                Some(existing) => {
                    duplicates += 1;
                    cells[existing as usize] = cell;
                }
                None => {
                    *slot = Some(cells.len() as u32);
                    cells.push(cell);
                }
            }
        }

        if discarded > 0 {
            tracing::warn!(discarded, cols, rows, "discarded out-of-range cells from snapshot");
        }
        if duplicates > 0 {
            tracing::warn!(duplicates, "snapshot contained duplicate coordinates");
        }
        tracing::debug!(cells = cells.len(), "rebuilt block index");

        Self {
            cols,
            rows,
            cells,
            slots,
            discarded,
        }
    }

    pub fn cols(&self) -> i32 {
        self.cols
    }

    pub fn rows(&self) -> i32 {
        self.rows
    }

    pub fn in_bounds(&self, pos: GridPos) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.cols && pos.y < self.rows
    }

    /// Number of populated coordinates.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Snapshot records rejected for lying outside the grid.
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// The raw record at `pos`, without block resolution.
    pub fn cell_at(&self, pos: GridPos) -> Option<&Cell> {
        if !self.in_bounds(pos) {
            return None;
        }
        let idx = self.slots[slot_index(self.cols, pos)]?;
        self.cells.get(idx as usize)
    }

    /// Resolve `pos` to its block. Members resolve to their origin; a member whose
    /// origin is missing (or does not cover it) behaves as a standalone 1×1 cell.
    pub fn resolve(&self, pos: GridPos) -> Option<ResolvedBlock<'_>> {
        let cell = self.cell_at(pos)?;
        let standalone = ResolvedBlock {
            cell,
            origin: pos,
            width: 1,
            height: 1,
        };
        let Some(block) = cell.block else {
            return Some(standalone);
        };
        if block.width <= 0 || block.height <= 0 || !block.contains(pos) {
            return Some(standalone);
        }
        let origin = block.origin();
        let Some(origin_cell) = self.cell_at(origin) else {
            return Some(standalone);
        };

        Some(ResolvedBlock {
            cell: origin_cell,
            origin,
            width: block.width.min(self.cols - origin.x),
            height: block.height.min(self.rows - origin.y),
        })
    }

    /// Origin of the block covering `pos`; `pos` itself for standalone or empty cells.
    pub fn origin_of(&self, pos: GridPos) -> GridPos {
        self.resolve(pos).map_or(pos, |resolved| resolved.origin)
    }

    /// Resolved cell for `pos`, or an empty unowned cell when nothing is recorded there.
    /// `None` only outside the grid.
    pub fn resolved_or_empty(&self, pos: GridPos) -> Option<Cell> {
        if !self.in_bounds(pos) {
            return None;
        }
        Some(
            self.resolve(pos)
                .map_or_else(|| Cell::empty(pos.x, pos.y), |resolved| resolved.cell.clone()),
        )
    }

    /// Footprint of the block covering `pos` (1×1 when standalone or empty).
    pub fn footprint(&self, pos: GridPos) -> GridRange {
        self.resolve(pos)
            .map_or_else(|| GridRange::single(pos), |resolved| resolved.footprint())
    }
}

#[cfg(test)]
mod tests {
    use pixelgrid_shared::BlockRef;

    use super::*;

    fn block_cells(origin: (i32, i32), w: i32, h: i32, owner: &str) -> Vec<Cell> {
        let block = BlockRef {
            origin_x: origin.0,
            origin_y: origin.1,
            width: w,
            height: h,
        };
        let mut out = Vec::new();
        for y in origin.1..origin.1 + h {
            for x in origin.0..origin.0 + w {
                let mut cell = Cell::empty(x, y);
                cell.owner = Some(owner.to_string());
                cell.block = Some(block);
                if (x, y) == origin {
                    cell.title = Some("origin".to_string());
                }
                out.push(cell);
            }
        }
        out
    }

    #[test]
    fn member_resolves_to_the_same_origin_cell() {
        let index = BlockIndex::build(100, 100, block_cells((5, 5), 3, 2, "alice"));
        let origin = index.resolve(GridPos::new(5, 5)).unwrap();
        let member = index.resolve(GridPos::new(6, 6)).unwrap();

        assert!(std::ptr::eq(origin.cell, member.cell));
        assert_eq!(member.origin, GridPos::new(5, 5));
        assert_eq!((member.width, member.height), (3, 2));
        assert_eq!(member.cell.title.as_deref(), Some("origin"));
        assert_eq!(
            index.footprint(GridPos::new(7, 6)),
            GridRange::from_corners(GridPos::new(5, 5), GridPos::new(7, 6))
        );
    }

    #[test]
    fn missing_origin_falls_back_to_standalone() {
        let cells: Vec<_> = block_cells((5, 5), 3, 2, "alice")
            .into_iter()
            .filter(|c| (c.x, c.y) != (5, 5))
            .collect();
        let index = BlockIndex::build(100, 100, cells);
        let member = index.resolve(GridPos::new(6, 6)).unwrap();
        assert_eq!(member.origin, GridPos::new(6, 6));
        assert_eq!((member.width, member.height), (1, 1));
    }

    #[test]
    fn block_footprint_is_clamped_to_grid() {
        let index = BlockIndex::build(10, 10, block_cells((8, 8), 4, 4, "edge"));
        let resolved = index.resolve(GridPos::new(9, 9)).unwrap();
        assert_eq!((resolved.width, resolved.height), (2, 2));
    }

    #[test]
    fn unpopulated_coordinates_resolve_to_empty_cells() {
        let index = BlockIndex::empty(10, 10);
        assert!(index.resolve(GridPos::new(3, 3)).is_none());
        assert_eq!(index.resolved_or_empty(GridPos::new(3, 3)), Some(Cell::empty(3, 3)));
        assert_eq!(index.resolved_or_empty(GridPos::new(10, 3)), None);
        assert_eq!(index.origin_of(GridPos::new(3, 3)), GridPos::new(3, 3));
    }

    #[test]
    fn out_of_range_cells_are_discarded_and_duplicates_replace() {
        let mut first = Cell::empty(1, 1);
        first.owner = Some("first".into());
        let mut second = Cell::empty(1, 1);
        second.owner = Some("second".into());
        let index = BlockIndex::build(
            4,
            4,
            vec![Cell::empty(-1, 0), Cell::empty(4, 0), first, second],
        );

        assert_eq!(index.discarded(), 2);
        assert_eq!(index.len(), 1);
        assert_eq!(
            index.cell_at(GridPos::new(1, 1)).and_then(|c| c.owner.as_deref()),
            Some("second")
        );
    }

    #[test]
    fn oversized_block_width_falls_back_to_standalone() {
        let mut broken = Cell::empty(6, 5);
        broken.block = Some(BlockRef {
            origin_x: 5,
            origin_y: 5,
            width: i32::MAX,
            height: 1,
        });
        let mut good = Cell::empty(1, 1);
        good.owner = Some("ok".into());
        let index = BlockIndex::build(20, 20, vec![good, broken]);

        let resolved = index.resolve(GridPos::new(6, 5)).unwrap();
        assert_eq!(resolved.origin, GridPos::new(6, 5));
        assert_eq!((resolved.width, resolved.height), (1, 1));
        assert!(index.resolve(GridPos::new(1, 1)).is_some());
    }

    #[test]
    fn oversized_block_with_origin_is_clamped_to_grid() {
        let block = BlockRef {
            origin_x: 5,
            origin_y: 5,
            width: i32::MAX,
            height: i32::MAX,
        };
        let mut origin = Cell::empty(5, 5);
        origin.block = Some(block);
        let mut member = Cell::empty(19, 19);
        member.block = Some(block);
        let index = BlockIndex::build(20, 20, vec![origin, member]);

        let resolved = index.resolve(GridPos::new(19, 19)).unwrap();
        assert_eq!(resolved.origin, GridPos::new(5, 5));
        assert_eq!((resolved.width, resolved.height), (15, 15));
        assert_eq!(
            index.footprint(GridPos::new(19, 19)),
            GridRange::from_corners(GridPos::new(5, 5), GridPos::new(19, 19))
        );
    }

    #[test]
    fn slot_index_is_row_major_in_usize() {
        assert_eq!(slot_index(2048, GridPos::new(3, 2)), 2 * 2048 + 3);
        assert_eq!(
            slot_index(i32::MAX, GridPos::new(1, 2)),
            2 * i32::MAX as usize + 1
        );
    }

    #[test]
    #[tracing_test::traced_test]
    fn discarded_cells_are_logged() {
        BlockIndex::build(4, 4, vec![Cell::empty(9, 9)]);
        assert!(logs_contain("discarded out-of-range cells"));
    }
}
