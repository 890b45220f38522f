use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::cell::GridPos;

/// Classifies coordinates as system-reserved land.
///
/// Implemented for plain closures so a domain layer can pass `|x, y| ...` directly.
pub trait Reservation {
    fn is_reserved(&self, x: i32, y: i32) -> bool;
}

impl<F> Reservation for F
where
    F: Fn(i32, i32) -> bool,
{
    fn is_reserved(&self, x: i32, y: i32) -> bool {
        self(x, y)
    }
}

/// Nothing is reserved.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReservation;

impl Reservation for NoReservation {
    fn is_reserved(&self, _x: i32, _y: i32) -> bool {
        false
    }
}

/// A reservation map that can be shipped as data: an explicit coordinate list plus an
/// optional border band of `border` cells around a `cols × rows` grid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReservedSet {
    #[serde(default)]
    pub coords: HashSet<GridPos>,
    #[serde(default)]
    pub border: Option<BorderBand>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorderBand {
    pub cols: i32,
    pub rows: i32,
    pub width: i32,
}

impl BorderBand {
    fn contains(&self, x: i32, y: i32) -> bool {
        x < self.width || y < self.width || x >= self.cols - self.width || y >= self.rows - self.width
    }
}

impl ReservedSet {
    pub fn from_coords(coords: impl IntoIterator<Item = (i32, i32)>) -> Self {
        Self {
            coords: coords.into_iter().map(GridPos::from).collect(),
            border: None,
        }
    }

    pub fn with_border(mut self, band: BorderBand) -> Self {
        self.border = Some(band);
        self
    }
}

impl Reservation for ReservedSet {
    fn is_reserved(&self, x: i32, y: i32) -> bool {
        self.coords.contains(&GridPos::new(x, y))
            || self.border.is_some_and(|band| band.contains(x, y))
    }
}
