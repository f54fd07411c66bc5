use ferrite_digit::preprocess::{
    center_of_mass, downscale, normalize, preprocess, recenter, shift, Grid, Surface, GRID_CELLS, GRID_SIZE,
};
use ferrite_digit::PreprocessError;

#[test]
fn black_canvas_becomes_constant_offset() {
    let grid = preprocess(&Surface::blank(280));
    assert_eq!(grid.cells().len(), GRID_CELLS);
    for &v in grid.cells() {
        assert!((v - -0.42).abs() < 1e-6, "expected -0.42, got {}", v);
    }
}

#[test]
fn white_cell_normalizes_to_upper_bound() {
    let mut grid = Grid::zeros();
    grid.set(0, 0, 255.0);
    let n = normalize(&grid);
    assert!((n.get(0, 0) - 2.82).abs() < 1e-5);
    assert!((n.get(1, 0) - -0.42).abs() < 1e-6);
}

#[test]
fn downscale_averages_blocks_of_red_channel() {
    // 56×56 surface: each grid cell covers a 2×2 block.
    let mut surface = Surface::blank(56);
    surface.set_gray(0, 0, 200);
    surface.set_gray(1, 1, 100);
    surface.set_gray(55, 55, 40);

    let grid = downscale(&surface);
    assert!((grid.get(0, 0) - 75.0).abs() < 1e-5);
    assert!((grid.get(27, 27) - 10.0).abs() < 1e-5);
    assert_eq!(grid.get(1, 0), 0.0);
}

#[test]
fn downscale_ignores_other_channels() {
    let mut rgba = vec![0u8; 28 * 28 * 4];
    for px in rgba.chunks_exact_mut(4) {
        px[1] = 255;
        px[2] = 255;
        px[3] = 255;
    }
    let grid = downscale(&Surface::new(28, rgba).unwrap());
    assert_eq!(grid.mass(), 0.0);
}

#[test]
fn surface_length_is_checked() {
    assert!(matches!(
        Surface::new(10, vec![0; 10]),
        Err(PreprocessError::SurfaceLength { expected: 400, actual: 10, .. })
    ));
    assert!(matches!(Surface::new(0, vec![]), Err(PreprocessError::EmptySurface)));
}

#[test]
fn zero_mass_grid_is_unchanged() {
    let grid = Grid::zeros();
    assert_eq!(center_of_mass(&grid), None);
    assert_eq!(recenter(&grid), grid);
}

#[test]
fn centered_grid_is_unchanged() {
    // Symmetric blob around (14, 14): centroid is exactly the grid centre.
    let mut grid = Grid::zeros();
    for (x, y) in [(13, 14), (15, 14), (14, 13), (14, 15), (14, 14)] {
        grid.set(x, y, 128.0);
    }
    assert_eq!(center_of_mass(&grid), Some((14.0, 14.0)));
    assert_eq!(recenter(&grid), grid);
}

#[test]
fn off_center_digit_is_moved_to_center() {
    let mut grid = Grid::zeros();
    grid.set(3, 5, 255.0);
    grid.set(4, 5, 255.0);
    grid.set(3, 6, 255.0);
    grid.set(4, 6, 255.0);

    let centered = recenter(&grid);
    assert!((centered.mass() - grid.mass()).abs() < 1e-3);
    let (cx, cy) = center_of_mass(&centered).unwrap();
    assert!((cx - GRID_SIZE as f32 / 2.0).abs() <= 0.5);
    assert!((cy - GRID_SIZE as f32 / 2.0).abs() <= 0.5);
}

#[test]
fn shifted_out_cells_are_dropped() {
    let mut grid = Grid::zeros();
    grid.set(1, 1, 10.0);
    grid.set(20, 20, 5.0);
    let moved = shift(&grid, -2, 0);
    assert_eq!(moved.get(18, 20), 5.0);
    assert_eq!(moved.mass(), 5.0);
}

#[test]
fn preprocess_output_range() {
    let mut surface = Surface::blank(280);
    for y in 100..180 {
        for x in 130..150 {
            surface.set_gray(x, y, 255);
        }
    }
    let grid = preprocess(&surface);
    for &v in grid.cells() {
        assert!((-0.42 - 1e-5..=2.82 + 1e-5).contains(&v));
    }
    assert!(grid.cells().iter().any(|&v| v > 2.8));
}
