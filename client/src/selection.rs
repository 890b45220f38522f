use std::collections::HashSet;

use pixelgrid_shared::{Cell, GridPos, Reservation};
use serde::{Deserialize, Serialize};

use crate::blocks::BlockIndex;
use crate::viewport::GridRange;

/// Which cells a rectangular selection keeps, after reserved cells are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "owner")]
pub enum SelectionFilter {
    /// Only coordinates nobody owns (buying land).
    #[default]
    Unowned,
    /// Only owned coordinates.
    Owned,
    /// Only coordinates owned by this identifier.
    OwnedBy(String),
    Any,
}

impl SelectionFilter {
    /// `cell` is the resolved record, or `None` for an unpopulated coordinate.
    pub fn accepts(&self, cell: Option<&Cell>) -> bool {
        let owner = cell.and_then(|c| c.owner.as_deref()).filter(|o| !o.is_empty());
        match self {
            Self::Unowned => owner.is_none(),
            Self::Owned => owner.is_some(),
            Self::OwnedBy(who) => owner == Some(who.as_str()),
            Self::Any => true,
        }
    }
}

/// Count and price of a selection. `total` is `None` unless every cell has a price.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SelectionSummary {
    pub count: usize,
    pub total: Option<f64>,
}

impl SelectionSummary {
    /// Price each cell at its sale price, else `unit_price`.
    pub fn of(cells: &[Cell], unit_price: Option<f64>) -> Self {
        let total = cells
            .iter()
            .map(|cell| cell.sale_price().or(unit_price))
            .sum::<Option<f64>>();
        Self {
            count: cells.len(),
            total: if cells.is_empty() { None } else { total },
        }
    }

    /// "3 cells selected / $7.50" style label.
    pub fn label(&self) -> String {
        let noun = if self.count == 1 { "cell" } else { "cells" };
        match self.total {
            Some(total) => format!("{} {noun} selected / ${total:.2}", self.count),
            None => format!("{} {noun} selected", self.count),
        }
    }
}

/// The cell a click at `pos` selects: `None` for a miss or a reserved coordinate.
pub fn point_cell(index: &BlockIndex, reservation: &dyn Reservation, pos: Option<GridPos>) -> Option<Cell> {
    let pos = pos?;
    if !index.in_bounds(pos) || reservation.is_reserved(pos.x, pos.y) {
        return None;
    }
    index.resolved_or_empty(pos)
}

/// Every coordinate in `range` (clamped to the grid) that is not reserved and passes
/// `filter`, resolved to its block origin. Block duplicates are kept.
pub fn region_cells(
    index: &BlockIndex,
    reservation: &dyn Reservation,
    filter: &SelectionFilter,
    range: GridRange,
) -> Vec<Cell> {
    let Some(range) = range.clamp_to(index.cols(), index.rows()) else {
        return Vec::new();
    };
    range
        .iter()
        .filter(|pos| !reservation.is_reserved(pos.x, pos.y))
        .filter_map(|pos| {
            let resolved = index.resolve(pos);
            filter
                .accepts(resolved.as_ref().map(|r| r.cell))
                .then(|| index.resolved_or_empty(pos))
                .flatten()
        })
        .collect()
}

/// Collapse cells of the same block to one entry, keeping first-seen order.
pub fn dedup_by_block_origin(cells: &[Cell]) -> Vec<Cell> {
    let mut seen = HashSet::new();
    cells
        .iter()
        .filter(|cell| {
            let key = cell.block.map_or(cell.pos(), |block| block.origin());
            seen.insert(key)
        })
        .cloned()
        .collect()
}

/// Owns the selected cells. Every mutator returns whether the selection changed so
/// the caller can emit exactly one change event per completed gesture.
#[derive(Debug, Default)]
pub struct SelectionController {
    cells: Vec<Cell>,
    filter: SelectionFilter,
}

impl SelectionController {
    pub fn selected(&self) -> &[Cell] {
        &self.cells
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn filter(&self) -> &SelectionFilter {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: SelectionFilter) {
        self.filter = filter;
    }

    /// Click semantics: replace with the resolved cell, or clear on miss/reserved.
    pub fn select_point(
        &mut self,
        pos: Option<GridPos>,
        index: &BlockIndex,
        reservation: &dyn Reservation,
    ) -> bool {
        let next: Vec<Cell> = point_cell(index, reservation, pos).into_iter().collect();
        self.replace(next)
    }

    /// Box semantics, including for a box that covers a single cell. Zero-area boxes
    /// never get here: the gesture layer turns them into clicks.
    pub fn select_region(
        &mut self,
        range: GridRange,
        index: &BlockIndex,
        reservation: &dyn Reservation,
    ) -> bool {
        let next = region_cells(index, reservation, &self.filter, range);
        self.replace(next)
    }

    pub fn clear(&mut self) -> bool {
        self.replace(Vec::new())
    }

    /// Drop entries that fall outside a resized grid.
    pub fn retain_in_bounds(&mut self, cols: i32, rows: i32) -> bool {
        let before = self.cells.len();
        self.cells
            .retain(|cell| cell.x >= 0 && cell.y >= 0 && cell.x < cols && cell.y < rows);
        before != self.cells.len()
    }

    pub fn summary(&self, unit_price: Option<f64>) -> SelectionSummary {
        SelectionSummary::of(&self.cells, unit_price)
    }

    fn replace(&mut self, next: Vec<Cell>) -> bool {
        if next == self.cells {
            return false;
        }
        self.cells = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use pixelgrid_shared::{BlockRef, NoReservation, ReservedSet, SaleInfo};

    use super::*;

    fn owned(x: i32, y: i32, owner: &str) -> Cell {
        let mut cell = Cell::empty(x, y);
        cell.owner = Some(owner.to_string());
        cell
    }

    fn coords(cells: &[Cell]) -> Vec<(i32, i32)> {
        cells.iter().map(|c| (c.x, c.y)).collect()
    }

    #[test]
    fn region_skips_reserved_and_owned() {
        let index = BlockIndex::build(100, 100, vec![owned(2, 2, "alice")]);
        let reserved = ReservedSet::from_coords([(1, 1)]);
        let cells = region_cells(
            &index,
            &reserved,
            &SelectionFilter::Unowned,
            GridRange::from_corners(GridPos::new(0, 0), GridPos::new(2, 2)),
        );
        assert_eq!(
            coords(&cells),
            vec![(0, 0), (1, 0), (2, 0), (0, 1), (2, 1), (0, 2), (1, 2)]
        );
    }

    #[test]
    fn owned_filter_keeps_block_duplicates() {
        let block = BlockRef {
            origin_x: 0,
            origin_y: 0,
            width: 2,
            height: 1,
        };
        let mut a = owned(0, 0, "bob");
        a.block = Some(block);
        let mut b = owned(1, 0, "bob");
        b.block = Some(block);
        let index = BlockIndex::build(10, 10, vec![a, b]);

        let cells = region_cells(
            &index,
            &NoReservation,
            &SelectionFilter::Owned,
            GridRange::from_corners(GridPos::new(0, 0), GridPos::new(3, 0)),
        );
        assert_eq!(coords(&cells), vec![(0, 0), (0, 0)]);
        assert_eq!(coords(&dedup_by_block_origin(&cells)), vec![(0, 0)]);
    }

    #[test]
    fn owned_by_filter_matches_owner() {
        let index = BlockIndex::build(10, 10, vec![owned(0, 0, "bob"), owned(1, 0, "eve")]);
        let cells = region_cells(
            &index,
            &NoReservation,
            &SelectionFilter::OwnedBy("eve".into()),
            GridRange::from_corners(GridPos::new(0, 0), GridPos::new(4, 4)),
        );
        assert_eq!(coords(&cells), vec![(1, 0)]);
    }

    #[test]
    fn point_on_reserved_or_outside_clears() {
        let index = BlockIndex::empty(10, 10);
        let reserved = ReservedSet::from_coords([(3, 3)]);
        let mut selection = SelectionController::default();

        assert!(selection.select_point(Some(GridPos::new(4, 4)), &index, &reserved));
        assert_eq!(coords(selection.selected()), vec![(4, 4)]);

        assert!(selection.select_point(Some(GridPos::new(3, 3)), &index, &reserved));
        assert!(selection.is_empty());

        selection.select_point(Some(GridPos::new(4, 4)), &index, &reserved);
        assert!(selection.select_point(Some(GridPos::new(10, 0)), &index, &reserved));
        assert!(selection.is_empty());
        assert!(!selection.select_point(None, &index, &reserved));
    }

    #[test]
    fn point_selects_owned_block_origin() {
        let block = BlockRef {
            origin_x: 5,
            origin_y: 5,
            width: 3,
            height: 2,
        };
        let mut origin = owned(5, 5, "alice");
        origin.block = Some(block);
        let mut member = owned(7, 6, "alice");
        member.block = Some(block);
        let index = BlockIndex::build(100, 100, vec![origin.clone(), member]);

        let mut selection = SelectionController::default();
        selection.select_point(Some(GridPos::new(7, 6)), &index, &NoReservation);
        assert_eq!(selection.selected(), &[origin]);
    }

    #[test]
    fn single_cell_region_still_applies_the_filter() {
        let index = BlockIndex::build(10, 10, vec![owned(2, 2, "alice")]);
        let mut by_region = SelectionController::default();
        let mut by_point = SelectionController::default();

        by_region.select_region(GridRange::single(GridPos::new(2, 2)), &index, &NoReservation);
        by_point.select_point(Some(GridPos::new(2, 2)), &index, &NoReservation);

        assert!(by_region.is_empty());
        assert_eq!(coords(by_point.selected()), vec![(2, 2)]);

        by_region.set_filter(SelectionFilter::Owned);
        by_region.select_region(GridRange::single(GridPos::new(2, 2)), &index, &NoReservation);
        assert_eq!(by_region.selected(), by_point.selected());
    }

    #[test]
    fn region_outside_grid_is_empty_and_never_out_of_bounds() {
        let index = BlockIndex::empty(5, 5);
        let mut selection = SelectionController::default();
        selection.select_region(
            GridRange::from_corners(GridPos::new(3, 3), GridPos::new(8, 8)),
            &index,
            &NoReservation,
        );
        assert_eq!(selection.selected().len(), 4);
        assert!(selection.selected().iter().all(|c| c.x < 5 && c.y < 5));

        selection.select_region(
            GridRange::from_corners(GridPos::new(10, 10), GridPos::new(12, 12)),
            &index,
            &NoReservation,
        );
        assert!(selection.is_empty());
    }

    #[test]
    fn unchanged_selection_reports_no_change() {
        let index = BlockIndex::empty(5, 5);
        let mut selection = SelectionController::default();
        assert!(selection.select_point(Some(GridPos::new(1, 1)), &index, &NoReservation));
        assert!(!selection.select_point(Some(GridPos::new(1, 1)), &index, &NoReservation));
        assert!(selection.clear());
        assert!(!selection.clear());
    }

    #[test]
    fn summary_uses_sale_price_then_unit_price() {
        let mut listed = owned(0, 0, "bob");
        listed.sale = Some(SaleInfo {
            for_sale: true,
            price: Some(10.0),
        });
        let cells = vec![listed, Cell::empty(1, 0)];

        let priced = SelectionSummary::of(&cells, Some(2.5));
        assert_eq!(priced.count, 2);
        assert_eq!(priced.total, Some(12.5));
        assert_eq!(priced.label(), "2 cells selected / $12.50");

        let unpriced = SelectionSummary::of(&cells, None);
        assert_eq!(unpriced.total, None);
        assert_eq!(unpriced.label(), "2 cells selected");
        assert_eq!(SelectionSummary::of(&cells[1..], Some(1.0)).label(), "1 cell selected / $1.00");
    }

    #[test]
    fn filter_deserializes_from_tagged_json() {
        let filter: SelectionFilter =
            serde_json::from_str(r#"{"kind": "owned_by", "owner": "0xabc"}"#).unwrap();
        assert_eq!(filter, SelectionFilter::OwnedBy("0xabc".into()));
        let filter: SelectionFilter = serde_json::from_str(r#"{"kind": "any"}"#).unwrap();
        assert_eq!(filter, SelectionFilter::Any);
    }
}
