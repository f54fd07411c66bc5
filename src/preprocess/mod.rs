pub mod grid;

pub use grid::{
    center_of_mass, centering_offset, downscale, normalize, preprocess, recenter, shift, Grid, Surface,
    GRID_CELLS, GRID_SIZE, NORM_OFFSET, NORM_SCALE,
};
