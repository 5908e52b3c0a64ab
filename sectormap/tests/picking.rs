use sectormap::algorithms::picking::{
    nearest_edge_under_point, nearest_vertex_except, nearest_vertex_within, point_in_sector,
    sector_contains, segments_intersect, snap_point, SnapMode,
};
use sectormap::{AreaMap, SectorId, Vec2, VertexId};

fn v(x: f32, y: f32) -> Vec2 {
    Vec2::new(x, y)
}

fn square(map: &mut AreaMap, (x0, y0, x1, y1): (f32, f32, f32, f32), inside: SectorId, outside: Option<SectorId>) {
    let vs: Vec<VertexId> = [v(x0, y0), v(x1, y0), v(x1, y1), v(x0, y1)]
        .iter()
        .map(|&p| map.add_vertex(p))
        .collect();
    for i in 0..4 {
        let e = map.add_edge(vs[i], vs[(i + 1) % 4]).expect("edge");
        map.connect_edge_to_sector(e, 0, Some(inside)).expect("side");
        map.connect_edge_to_sector(e, 1, outside).expect("side");
    }
    map.update_sector_bbox(inside);
}

#[test]
fn containment_skips_holes() {
    let mut map = AreaMap::new();
    let outer = map.add_sector(None);
    let inner = map.add_sector(None);
    square(&mut map, (0.0, 0.0, 100.0, 100.0), outer, None);
    square(&mut map, (40.0, 40.0, 60.0, 60.0), inner, Some(outer));
    map.update_sector_bbox(outer);

    assert_eq!(point_in_sector(&map, v(20.0, 20.0)), Some(outer));
    assert_eq!(point_in_sector(&map, v(50.0, 50.0)), Some(inner));
    assert!(!sector_contains(&map, outer, v(50.0, 50.0)));
    assert_eq!(point_in_sector(&map, v(200.0, 50.0)), None);
}

#[test]
fn nearest_vertex_ties_go_to_the_older_one() {
    let mut map = AreaMap::new();
    let a = map.add_vertex(v(0.0, 0.0));
    let b = map.add_vertex(v(10.0, 0.0));
    assert_eq!(nearest_vertex_within(&map, v(5.0, 0.0), 6.0), Some(a));
    assert_eq!(nearest_vertex_within(&map, v(8.0, 0.0), 6.0), Some(b));
    assert_eq!(nearest_vertex_within(&map, v(5.0, 0.0), 4.0), None);
    assert_eq!(nearest_vertex_except(&map, v(5.0, 0.0), 6.0, Some(a)), Some(b));
}

#[test]
fn edges_under_a_point_can_be_walked() {
    let mut map = AreaMap::new();
    let vs: Vec<VertexId> = [v(0.0, 0.0), v(100.0, 0.0), v(0.0, 2.0), v(100.0, 2.0)]
        .iter()
        .map(|&p| map.add_vertex(p))
        .collect();
    let low = map.add_edge(vs[0], vs[1]).expect("edge");
    let high = map.add_edge(vs[2], vs[3]).expect("edge");

    let p = v(50.0, 1.0);
    assert_eq!(nearest_edge_under_point(&map, p, 1.5, None), Some(low));
    assert_eq!(nearest_edge_under_point(&map, p, 1.5, Some(low)), Some(high));
    assert_eq!(nearest_edge_under_point(&map, p, 1.5, Some(high)), None);
    assert_eq!(nearest_edge_under_point(&map, v(50.0, 10.0), 1.5, None), None);
}

#[test]
fn crossing_segments_meet_in_the_middle() {
    let p = segments_intersect(v(0.0, 0.0), v(2.0, 2.0), v(0.0, 2.0), v(2.0, 0.0)).expect("cross");
    assert!((p.x - 1.0).abs() < 1e-5 && (p.y - 1.0).abs() < 1e-5);
    assert_eq!(segments_intersect(v(0.0, 0.0), v(1.0, 0.0), v(1.0, 0.0), v(1.0, 1.0)), None);
}

#[test]
fn snapping_modes() {
    let mut map = AreaMap::new();
    let a = map.add_vertex(v(0.0, 0.0));
    let b = map.add_vertex(v(100.0, 0.0));
    map.add_edge(a, b).expect("edge");

    assert_eq!(snap_point(&map, v(40.0, 20.0), SnapMode::Grid, 32.0, 5.0, None), v(32.0, 32.0));
    assert_eq!(snap_point(&map, v(40.0, 20.0), SnapMode::Grid, 0.0, 5.0, None), v(40.0, 20.0));
    assert_eq!(snap_point(&map, v(40.0, 20.0), SnapMode::Nothing, 32.0, 5.0, None), v(40.0, 20.0));

    assert_eq!(snap_point(&map, v(2.0, 1.0), SnapMode::Vertices, 32.0, 5.0, None), v(0.0, 0.0));
    assert_eq!(snap_point(&map, v(2.0, 1.0), SnapMode::Vertices, 32.0, 5.0, Some(a)), v(2.0, 1.0));

    assert_eq!(snap_point(&map, v(50.0, 3.0), SnapMode::Edges, 32.0, 5.0, None), v(50.0, 0.0));
    assert_eq!(snap_point(&map, v(50.0, 3.0), SnapMode::Edges, 32.0, 2.0, None), v(50.0, 3.0));
    // the dragged vertex's own edges do not attract it
    assert_eq!(snap_point(&map, v(50.0, 3.0), SnapMode::Edges, 32.0, 5.0, Some(a)), v(50.0, 3.0));
}
