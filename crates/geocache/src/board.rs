use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn offset(self, d_lat: f64, d_lng: f64) -> Self {
        Self {
            lat: self.lat + d_lat,
            lng: self.lng + d_lng,
        }
    }
}

/// Integer grid cell. `i` indexes latitude rows, `j` longitude columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub i: i32,
    pub j: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellBounds {
    pub min: LatLng,
    pub max: LatLng,
}

impl CellBounds {
    pub fn contains(&self, point: LatLng) -> bool {
        point.lat >= self.min.lat
            && point.lat < self.max.lat
            && point.lng >= self.min.lng
            && point.lng < self.max.lng
    }
}

/// Largest cell index a point resolves to on either axis. Points further out
/// land on the edge cell.
pub const MAX_CELL_INDEX: i32 = 1 << 30;
/// Largest supported visibility radius. Keeps `index ± radius` inside `i32`.
pub const MAX_VISIBILITY_RADIUS: i32 = 1 << 12;

/// Board origin convention:
/// - `origin` is the south-west corner of cell (0,0).
/// - Cell (i,j) spans `origin + (i, j) * tile_degrees` to `origin + (i + 1, j + 1) * tile_degrees`.
/// - Indices from `cell_for_point` are clamped to `±MAX_CELL_INDEX`; the radius to
///   `0..=MAX_VISIBILITY_RADIUS`.
#[derive(Debug)]
pub struct Board {
    tile_degrees: f64,
    visibility_radius: i32,
    origin: LatLng,
    known_cells: HashMap<Cell, Rc<Cell>>,
}

impl Board {
    pub fn new(tile_degrees: f64, visibility_radius: i32, origin: LatLng) -> Self {
        Self {
            tile_degrees,
            visibility_radius: visibility_radius.clamp(0, MAX_VISIBILITY_RADIUS),
            origin,
            known_cells: HashMap::new(),
        }
    }

    pub fn tile_degrees(&self) -> f64 {
        self.tile_degrees
    }

    pub fn visibility_radius(&self) -> i32 {
        self.visibility_radius
    }

    pub fn origin(&self) -> LatLng {
        self.origin
    }

    /// Returns the single shared instance for `(i, j)`, registering it on first use.
    pub fn canonical_cell(&mut self, i: i32, j: i32) -> Rc<Cell> {
        let key = Cell { i, j };
        Rc::clone(
            self.known_cells
                .entry(key)
                .or_insert_with(|| Rc::new(key)),
        )
    }

    pub fn cell_for_point(&mut self, point: LatLng) -> Rc<Cell> {
        let i = self.index_for(point.lat - self.origin.lat);
        let j = self.index_for(point.lng - self.origin.lng);
        self.canonical_cell(i, j)
    }

    fn index_for(&self, offset_degrees: f64) -> i32 {
        let limit = f64::from(MAX_CELL_INDEX);
        // NaN casts to 0.
        (offset_degrees / self.tile_degrees).floor().clamp(-limit, limit) as i32
    }

    pub fn cell_bounds(&self, cell: &Cell) -> CellBounds {
        let min = LatLng {
            lat: self.origin.lat + f64::from(cell.i) * self.tile_degrees,
            lng: self.origin.lng + f64::from(cell.j) * self.tile_degrees,
        };
        let max = LatLng {
            lat: self.origin.lat + (f64::from(cell.i) + 1.0) * self.tile_degrees,
            lng: self.origin.lng + (f64::from(cell.j) + 1.0) * self.tile_degrees,
        };
        CellBounds { min, max }
    }

    pub fn cell_center(&self, cell: &Cell) -> LatLng {
        let bounds = self.cell_bounds(cell);
        LatLng {
            lat: (bounds.min.lat + bounds.max.lat) * 0.5,
            lng: (bounds.min.lng + bounds.max.lng) * 0.5,
        }
    }

    /// Square neighborhood around the cell holding `point`, row-major.
    pub fn cells_near_point(&mut self, point: LatLng) -> Vec<Rc<Cell>> {
        let center = self.cell_for_point(point);
        let radius = self.visibility_radius;
        let side = (2 * radius + 1) as usize;
        let mut cells = Vec::with_capacity(side * side);
        for di in -radius..=radius {
            for dj in -radius..=radius {
                cells.push(self.canonical_cell(center.i + di, center.j + dj));
            }
        }
        cells
    }

    pub fn known_cell_count(&self) -> usize {
        self.known_cells.len()
    }
}
