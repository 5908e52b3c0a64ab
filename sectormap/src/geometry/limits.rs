// Ingestion limits to harden map loading against untrusted input

// Map size caps
pub const MAX_VERTICES: usize = 200_000;
pub const MAX_EDGES: usize = 300_000;
pub const MAX_SECTORS: usize = 100_000;
pub const MAX_MOBS: usize = 50_000;
pub const MAX_PATH_STOPS: usize = 50_000;
pub const MAX_TEXTURE_NAME: usize = 1_024;

// Numeric bounds
pub const COORD_MIN: f32 = -10_000_000.0;
pub const COORD_MAX: f32 =  10_000_000.0;

#[inline]
pub fn in_coord_bounds(x: f32) -> bool { x.is_finite() && x >= COORD_MIN && x <= COORD_MAX }
