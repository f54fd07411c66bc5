/// Turns a drawn digit into the network's 784-value input.
///
/// The drawing surface is square RGBA with white strokes on black; only the
/// red channel is read. It is block-averaged down to a 28×28 grid, shifted so
/// its intensity centroid sits at the grid centre, and mapped into the value
/// range the network was trained on.
use crate::error::PreprocessError;

pub const GRID_SIZE: usize = 28;
pub const GRID_CELLS: usize = GRID_SIZE * GRID_SIZE;

/// `value' = value / 255 * NORM_SCALE + NORM_OFFSET`, the training-time
/// normalization.
pub const NORM_SCALE: f32 = 3.24;
pub const NORM_OFFSET: f32 = -0.42;

const CHANNELS: usize = 4;
const INTENSITY_CHANNEL: usize = 0;

/// Square RGBA pixel surface, row-major, 4 interleaved channels per pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    side: usize,
    rgba: Vec<u8>,
}

impl Surface {
    pub fn new(side: usize, rgba: Vec<u8>) -> Result<Surface, PreprocessError> {
        if side == 0 {
            return Err(PreprocessError::EmptySurface);
        }
        let expected = side * side * CHANNELS;
        if rgba.len() != expected {
            return Err(PreprocessError::SurfaceLength { side, expected, actual: rgba.len() });
        }
        Ok(Surface { side, rgba })
    }

    /// An opaque black surface, i.e. a cleared canvas.
    pub fn blank(side: usize) -> Surface {
        let mut rgba = vec![0u8; side * side * CHANNELS];
        for px in rgba.chunks_exact_mut(CHANNELS) {
            px[3] = 255;
        }
        Surface { side, rgba }
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    /// Sets every channel of pixel (x, y) to `value` (alpha stays opaque).
    pub fn set_gray(&mut self, x: usize, y: usize, value: u8) {
        let idx = (y * self.side + x) * CHANNELS;
        self.rgba[idx..idx + 3].fill(value);
        self.rgba[idx + 3] = 255;
    }

    fn intensity(&self, x: usize, y: usize) -> f32 {
        self.rgba[(y * self.side + x) * CHANNELS + INTENSITY_CHANNEL] as f32
    }
}

/// A `GRID_SIZE`×`GRID_SIZE` grid of floats, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    cells: Vec<f32>,
}

impl Grid {
    pub fn zeros() -> Grid {
        Grid { cells: vec![0.0; GRID_CELLS] }
    }

    /// Returns `None` unless `cells.len() == GRID_CELLS`.
    pub fn from_cells(cells: Vec<f32>) -> Option<Grid> {
        (cells.len() == GRID_CELLS).then_some(Grid { cells })
    }

    pub fn from_fn(mut f: impl FnMut(usize, usize) -> f32) -> Grid {
        let mut grid = Grid::zeros();
        for y in 0..GRID_SIZE {
            for x in 0..GRID_SIZE {
                grid.cells[y * GRID_SIZE + x] = f(x, y);
            }
        }
        grid
    }

    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.cells[y * GRID_SIZE + x]
    }

    pub fn set(&mut self, x: usize, y: usize, value: f32) {
        self.cells[y * GRID_SIZE + x] = value;
    }

    pub fn cells(&self) -> &[f32] {
        &self.cells
    }

    pub fn into_cells(self) -> Vec<f32> {
        self.cells
    }

    pub fn mass(&self) -> f32 {
        self.cells.iter().sum()
    }

    fn map(&self, f: impl Fn(f32) -> f32) -> Grid {
        Grid { cells: self.cells.iter().map(|&v| f(v)).collect() }
    }
}

/// Averages blocks of `(side / GRID_SIZE)²` red-channel samples into each
/// grid cell. Fractional scales sample `floor(dst * scale + d)` for every
/// integer `d < scale`.
pub fn downscale(surface: &Surface) -> Grid {
    let side = surface.side();
    if side == 0 {
        return Grid::zeros();
    }
    let scale = side as f32 / GRID_SIZE as f32;
    let steps = scale.ceil() as usize;
    let last = side - 1;

    Grid::from_fn(|x, y| {
        let mut sum = 0.0f32;
        let mut count = 0u32;
        for dy in 0..steps {
            let sy = ((y as f32 * scale + dy as f32).floor() as usize).min(last);
            for dx in 0..steps {
                let sx = ((x as f32 * scale + dx as f32).floor() as usize).min(last);
                sum += surface.intensity(sx, sy);
                count += 1;
            }
        }
        sum / count as f32
    })
}

/// Intensity-weighted centroid `(x, y)`, or `None` when the grid has no mass.
pub fn center_of_mass(grid: &Grid) -> Option<(f32, f32)> {
    let mut mass = 0.0f64;
    let mut mx = 0.0f64;
    let mut my = 0.0f64;
    for (i, &v) in grid.cells().iter().enumerate() {
        let v = v as f64;
        mass += v;
        mx += v * (i % GRID_SIZE) as f64;
        my += v * (i / GRID_SIZE) as f64;
    }
    if mass == 0.0 {
        return None;
    }
    Some(((mx / mass) as f32, (my / mass) as f32))
}

/// Integer shift moving the centroid to the grid centre:
/// `round(GRID_SIZE / 2 - centroid)`, halves rounding up.
pub fn centering_offset(grid: &Grid) -> Option<(i32, i32)> {
    let (cx, cy) = center_of_mass(grid)?;
    let half = (GRID_SIZE / 2) as f32;
    let round = |v: f32| (v + 0.5).floor() as i32;
    Some((round(half - cx), round(half - cy)))
}

/// Moves every cell by `(dx, dy)`. Cells landing outside the grid are
/// dropped; cells nothing lands on stay zero.
pub fn shift(grid: &Grid, dx: i32, dy: i32) -> Grid {
    let mut out = Grid::zeros();
    let size = GRID_SIZE as i32;
    for y in 0..size {
        let ny = y + dy;
        if !(0..size).contains(&ny) {
            continue;
        }
        for x in 0..size {
            let nx = x + dx;
            if (0..size).contains(&nx) {
                out.set(nx as usize, ny as usize, grid.get(x as usize, y as usize));
            }
        }
    }
    out
}

/// Shifts the grid so its centroid is centred; a massless grid is returned
/// unchanged.
pub fn recenter(grid: &Grid) -> Grid {
    match centering_offset(grid) {
        Some((dx, dy)) => shift(grid, dx, dy),
        None => grid.clone(),
    }
}

pub fn normalize(grid: &Grid) -> Grid {
    grid.map(|v| (v / 255.0) * NORM_SCALE + NORM_OFFSET)
}

/// `normalize(recenter(downscale(surface)))`.
pub fn preprocess(surface: &Surface) -> Grid {
    normalize(&recenter(&downscale(surface)))
}
