// Tolerances shared by the geometry code, in world units

pub const EPS_POS: f32 = 1e-4;            // point coincidence threshold
pub const EPS_DENOM: f32 = 1e-8;          // denominator guard for line intersection
pub const EPS_SECTOR_AREA: f32 = 1e-2;    // smallest drawable sector area (units^2)
pub const EPS_ON_LINE: f32 = 1e-3;        // "vertex lies on a drawn line" slack

#[inline] pub fn clamp01(x: f32) -> f32 { x.max(0.0).min(1.0) }
