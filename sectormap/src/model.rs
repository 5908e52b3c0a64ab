use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Vec2 { x, y }
    }
    #[inline]
    pub fn dist_sq(self, o: Vec2) -> f32 {
        let dx = self.x - o.x;
        let dy = self.y - o.y;
        dx * dx + dy * dy
    }
    #[inline]
    pub fn dist(self, o: Vec2) -> f32 {
        self.dist_sq(o).sqrt()
    }
    #[inline]
    pub fn midpoint(self, o: Vec2) -> Vec2 {
        Vec2::new((self.x + o.x) * 0.5, (self.y + o.y) * 0.5)
    }
    /// Direction angle of the ray self -> o, in radians.
    #[inline]
    pub fn angle_to(self, o: Vec2) -> f32 {
        (o.y - self.y).atan2(o.x - self.x)
    }
    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

macro_rules! handle {
    ($name:ident, $label:literal) => {
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, " {}"), self.0)
            }
        }
    };
}

handle!(VertexId, "vertex");
handle!(EdgeId, "edge");
handle!(SectorId, "sector");

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Vertex {
    pub pos: Vec2,
    pub edges: Vec<EdgeId>,
}

/// Straight segment between two vertices.
///
/// `sectors[0]` lies to the left of `vertices[0] -> vertices[1]`, `sectors[1]`
/// to the right. `None` is the void.
#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    pub vertices: [VertexId; 2],
    pub sectors: [Option<SectorId>; 2],
}

impl Edge {
    #[inline]
    pub fn has_vertex(&self, v: VertexId) -> bool {
        self.vertices[0] == v || self.vertices[1] == v
    }
    #[inline]
    pub fn other_vertex(&self, v: VertexId) -> VertexId {
        if self.vertices[0] == v {
            self.vertices[1]
        } else {
            self.vertices[0]
        }
    }
    #[inline]
    pub fn has_sector(&self, s: Option<SectorId>) -> bool {
        self.sectors[0] == s || self.sectors[1] == s
    }
    /// Side that lies to the left (or right) of walking the edge starting at `from`.
    #[inline]
    pub fn side_facing(&self, from: VertexId, left: bool) -> usize {
        let forward = self.vertices[0] == from;
        if forward == left {
            0
        } else {
            1
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectorType {
    #[default]
    Normal,
    Blocking,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Sector {
    pub edges: Vec<EdgeId>,
    pub z: f32,
    pub texture: String,
    pub kind: SectorType,
    pub brightness: u8,
    pub is_bottomless_pit: bool,
    pub fade: bool,
    pub bbox: Option<(f32, f32, f32, f32)>, // minx,miny,maxx,maxy
}

impl Default for Sector {
    fn default() -> Self {
        Sector {
            edges: Vec::new(),
            z: 0.0,
            texture: String::new(),
            kind: SectorType::Normal,
            brightness: 255,
            is_bottomless_pit: false,
            fade: false,
            bbox: None,
        }
    }
}

impl Sector {
    /// Empty sector carrying the attributes of `self`.
    pub fn blank_copy(&self) -> Sector {
        Sector {
            edges: Vec::new(),
            bbox: None,
            texture: self.texture.clone(),
            ..*self
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MobCategory {
    Leader,
    #[default]
    Enemy,
    Treasure,
    Bridge,
    Decoration,
}

/// Object spawn point placed on the map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MobGen {
    pub pos: Vec2,
    pub category: MobCategory,
    pub radius: f32,
}

/// Node of the navigation network; `links` are outgoing connections.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PathStop {
    pub pos: Vec2,
    pub links: Vec<u32>,
}
