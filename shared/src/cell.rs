use serde::{Deserialize, Serialize};

/// Integer grid coordinate (column, row).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for GridPos {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// Block membership: every cell of a merged block points at the same origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRef {
    pub origin_x: i32,
    pub origin_y: i32,
    pub width: i32,
    pub height: i32,
}

impl BlockRef {
    pub const fn origin(&self) -> GridPos {
        GridPos::new(self.origin_x, self.origin_y)
    }

    /// True when `pos` lies inside the block footprint. Offsets are taken in `i64`
    /// so an oversized block from untrusted data cannot overflow.
    pub const fn contains(&self, pos: GridPos) -> bool {
        let dx = pos.x as i64 - self.origin_x as i64;
        let dy = pos.y as i64 - self.origin_y as i64;
        dx >= 0 && dy >= 0 && dx < self.width as i64 && dy < self.height as i64
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SaleInfo {
    #[serde(default)]
    pub for_sale: bool,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

/// One grid coordinate's record as supplied by the data layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<BlockRef>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale: Option<SaleInfo>,
}

impl Cell {
    /// An unowned coordinate with no payload.
    pub fn empty(x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            owner: None,
            color: None,
            image: None,
            title: None,
            block: None,
            sale: None,
        }
    }

    pub const fn pos(&self) -> GridPos {
        GridPos::new(self.x, self.y)
    }

    pub fn is_owned(&self) -> bool {
        self.owner.as_deref().is_some_and(|owner| !owner.is_empty())
    }

    pub fn is_for_sale(&self) -> bool {
        self.sale.as_ref().is_some_and(|sale| sale.for_sale)
    }

    pub fn sale_price(&self) -> Option<f64> {
        self.sale
            .as_ref()
            .filter(|sale| sale.for_sale)
            .and_then(|sale| sale.price)
    }

    /// True for a member of a multi-cell block that is not the block's origin.
    pub fn is_block_member(&self) -> bool {
        self.block
            .as_ref()
            .is_some_and(|block| block.origin() != self.pos())
    }
}

pub type CellSnapshot = Vec<Cell>;

/// Parse a JSON array of cell records.
pub fn parse_snapshot(json: &str) -> Result<CellSnapshot, serde_json::Error> {
    serde_json::from_str(json)
}
