use sectormap::algorithms::drawing::{create_sector, split_sector, DrawingNode};
use sectormap::algorithms::picking::point_in_sector;
use sectormap::algorithms::topology::{
    delete_edges, merge_vertices, move_vertex, split_edge, MoveOutcome,
};
use sectormap::config::EditorConfig;
use sectormap::validate::{check_intersecting_edges, check_malformed_sectors};
use sectormap::{AreaMap, EditError, EdgeId, SectorId, Vec2, VertexId};

fn v(x: f32, y: f32) -> Vec2 {
    Vec2::new(x, y)
}

/// Edge from `a` to `b` with `left` and `right` on its two sides.
fn edge(map: &mut AreaMap, a: VertexId, b: VertexId, left: Option<SectorId>, right: Option<SectorId>) -> EdgeId {
    let e = map.add_edge(a, b).expect("edge");
    map.connect_edge_to_sector(e, 0, left).expect("left");
    map.connect_edge_to_sector(e, 1, right).expect("right");
    e
}

/// Counter-clockwise ring with `inside` on its left and `outside` on its right.
fn ring(map: &mut AreaMap, pts: &[(f32, f32)], inside: SectorId, outside: Option<SectorId>) -> Vec<VertexId> {
    let vs: Vec<VertexId> = pts.iter().map(|&(x, y)| map.add_vertex(v(x, y))).collect();
    for i in 0..vs.len() {
        edge(map, vs[i], vs[(i + 1) % vs.len()], Some(inside), outside);
    }
    map.update_sector_bbox(inside);
    vs
}

fn square(map: &mut AreaMap, x0: f32, y0: f32, x1: f32, y1: f32, inside: SectorId, outside: Option<SectorId>) -> Vec<VertexId> {
    ring(map, &[(x0, y0), (x1, y0), (x1, y1), (x0, y1)], inside, outside)
}

fn node(map: &AreaMap, x: f32, y: f32) -> DrawingNode {
    DrawingNode::resolve(map, v(x, y), v(x, y), 1.0)
}

fn assert_clean(map: &AreaMap) {
    let cfg = EditorConfig::default();
    assert_eq!(check_intersecting_edges(map, &cfg), None);
    assert_eq!(check_malformed_sectors(map, &cfg), None);
}

#[test]
fn split_then_merge_restores_counts() {
    let mut map = AreaMap::new();
    let s = map.add_sector(None);
    let vs = square(&mut map, 0.0, 0.0, 100.0, 100.0, s, None);
    let bottom = map.edge_between(vs[0], vs[1]).expect("bottom");

    let (nv, ne) = split_edge(&mut map, bottom, v(10.0, 3.0)).expect("split");
    assert_eq!(map.vertex_pos(nv), Some(v(10.0, 0.0)));
    assert_eq!(map.vertex_count(), 5);
    assert_eq!(map.edge_count(), 5);
    assert_eq!(map.edge(ne).map(|e| e.sectors), map.edge(bottom).map(|e| e.sectors));
    assert_eq!(map.edge(bottom).map(|e| e.vertices), Some([vs[0], nv]));
    assert_eq!(map.edge(ne).map(|e| e.vertices), Some([nv, vs[1]]));

    let touched = merge_vertices(&mut map, nv, vs[0]).expect("merge");
    assert!(touched.contains(&s));
    assert_eq!(map.vertex_count(), 4);
    assert_eq!(map.edge_count(), 4);
    assert!(map.edge_between(vs[0], vs[1]).is_some());
    assert_clean(&map);
}

#[test]
fn split_at_an_endpoint_is_degenerate() {
    let mut map = AreaMap::new();
    let s = map.add_sector(None);
    let vs = square(&mut map, 0.0, 0.0, 100.0, 100.0, s, None);
    let bottom = map.edge_between(vs[0], vs[1]).expect("bottom");
    let before = map.clone();
    let err = split_edge(&mut map, bottom, v(-5.0, 0.0)).unwrap_err();
    assert!(matches!(err, EditError::DegenerateGeometry(_)));
    assert_eq!(map, before);
}

#[test]
fn parallel_edges_fold_into_one() {
    // S1 sits on a thin sliver S2 whose apex R is merged down onto the base.
    let mut map = AreaMap::new();
    let s1 = map.add_sector(None);
    let s2 = map.add_sector(None);
    let p = map.add_vertex(v(0.0, 0.0));
    let q = map.add_vertex(v(100.0, 0.0));
    let r = map.add_vertex(v(50.0, 5.0));
    let t = map.add_vertex(v(50.0, 100.0));
    let pq = edge(&mut map, p, q, Some(s2), None);
    edge(&mut map, p, r, Some(s1), Some(s2));
    edge(&mut map, r, q, Some(s1), Some(s2));
    edge(&mut map, q, t, Some(s1), None);
    edge(&mut map, t, p, Some(s1), None);
    map.update_sector_bbox(s1);
    map.update_sector_bbox(s2);
    assert_clean(&map);

    let (m, mq) = split_edge(&mut map, pq, v(50.0, 0.0)).expect("split");
    let touched = merge_vertices(&mut map, r, m).expect("merge");

    assert_eq!(touched.into_iter().collect::<Vec<_>>(), vec![s1]);
    assert!(map.sector(s2).is_none(), "sliver disappears");
    assert!(map.vertex(r).is_none());
    assert_eq!(map.vertex_count(), 4);
    assert_eq!(map.edge_count(), 4);
    assert_eq!(map.edge(pq).map(|e| e.sectors), Some([Some(s1), None]));
    assert_eq!(map.edge(mq).map(|e| e.sectors), Some([Some(s1), None]));
    assert_eq!(map.sector(s1).map(|s| s.edges.len()), Some(4));
    assert_clean(&map);
}

#[test]
fn merging_adjacent_vertices_drops_the_collapsed_edge() {
    let mut map = AreaMap::new();
    let s = map.add_sector(None);
    let vs = ring(
        &mut map,
        &[(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0), (0.0, 5.0)],
        s,
        None,
    );
    let collapsed = map.edge_between(vs[4], vs[0]).expect("edge");
    merge_vertices(&mut map, vs[4], vs[0]).expect("merge");
    assert!(map.edge(collapsed).is_none());
    assert_eq!(map.vertex(vs[0]).map(|x| x.edges.len()), Some(2));
    assert_clean(&map);
}

#[test]
fn merging_a_vertex_into_itself_is_refused() {
    let mut map = AreaMap::new();
    let a = map.add_vertex(v(0.0, 0.0));
    assert!(matches!(merge_vertices(&mut map, a, a), Err(EditError::DegenerateGeometry(_))));
}

#[test]
fn cut_splits_a_square_in_two() {
    let mut map = AreaMap::new();
    let s = map.add_sector(None);
    square(&mut map, 0.0, 0.0, 100.0, 100.0, s, None);
    let nodes = [node(&map, 50.0, 0.0), node(&map, 50.0, 100.0)];
    assert!(nodes.iter().all(|n| n.on_geometry()));

    let split = split_sector(&mut map, &nodes).expect("split");
    assert_eq!(split.working, Some(s));
    assert_eq!(split.cut_edges.len(), 1);
    assert_eq!(map.sector_count(), 2);
    // the part on the right of the cut's end is split off
    assert_eq!(point_in_sector(&map, v(75.0, 50.0)), Some(split.new_sector));
    assert_eq!(point_in_sector(&map, v(25.0, 50.0)), Some(s));
    let cut = map.edge(split.cut_edges[0]).expect("cut edge");
    assert!(cut.has_sector(Some(s)) && cut.has_sector(Some(split.new_sector)));
    assert_eq!(map.sector(s).map(|x| x.edges.len()), Some(4));
    assert_eq!(map.sector(split.new_sector).map(|x| x.edges.len()), Some(4));
    assert_clean(&map);
}

#[test]
fn cut_keeps_the_hole_with_the_side_that_surrounds_it() {
    let mut map = AreaMap::new();
    let s = map.add_sector(None);
    let hole = map.add_sector(None);
    square(&mut map, 0.0, 0.0, 100.0, 100.0, s, None);
    square(&mut map, 30.0, 30.0, 70.0, 70.0, hole, Some(s));

    let nodes = [node(&map, 20.0, 0.0), node(&map, 20.0, 100.0)];
    let split = split_sector(&mut map, &nodes).expect("split");

    assert_eq!(map.sector_count(), 3);
    assert_eq!(point_in_sector(&map, v(10.0, 50.0)), Some(s));
    assert_eq!(point_in_sector(&map, v(85.0, 50.0)), Some(split.new_sector));
    assert_eq!(point_in_sector(&map, v(50.0, 50.0)), Some(hole));
    let hole_edges = map.sector(hole).map(|x| x.edges.clone()).expect("hole");
    for e in hole_edges {
        assert!(map.edge(e).expect("edge").has_sector(Some(split.new_sector)));
    }
    assert_clean(&map);
}

#[test]
fn drawn_sector_takes_over_every_edge_of_the_hole_inside_it() {
    let mut map = AreaMap::new();
    let s = map.add_sector(None);
    let hole = map.add_sector(None);
    square(&mut map, 0.0, 0.0, 100.0, 100.0, s, None);
    square(&mut map, 40.0, 40.0, 60.0, 60.0, hole, Some(s));

    let nodes = [node(&map, 20.0, 20.0), node(&map, 80.0, 20.0), node(&map, 80.0, 80.0), node(&map, 20.0, 80.0)];
    let made = create_sector(&mut map, &nodes).expect("create");
    assert_eq!(made.outer, Some(s));

    let hole_edges = map.sector(hole).map(|x| x.edges.clone()).expect("hole");
    assert_eq!(hole_edges.len(), 4);
    for e in hole_edges {
        let edge = map.edge(e).expect("edge");
        assert!(edge.has_sector(Some(made.sector)), "{e} still borders the old outer sector");
        assert!(!edge.has_sector(Some(s)));
    }
    assert_eq!(point_in_sector(&map, v(10.0, 50.0)), Some(s));
    assert_eq!(point_in_sector(&map, v(30.0, 50.0)), Some(made.sector));
    assert_eq!(point_in_sector(&map, v(50.0, 50.0)), Some(hole));
    assert_clean(&map);
}

#[test]
fn cut_to_a_hole_is_rolled_back() {
    let mut map = AreaMap::new();
    let s = map.add_sector(None);
    let hole = map.add_sector(None);
    square(&mut map, 0.0, 0.0, 100.0, 100.0, s, None);
    square(&mut map, 30.0, 30.0, 70.0, 70.0, hole, Some(s));
    let before = map.clone();

    let nodes = [node(&map, 50.0, 0.0), node(&map, 50.0, 30.0)];
    let err = split_sector(&mut map, &nodes).unwrap_err();
    assert!(matches!(err, EditError::InvalidSplit(_)));
    assert_eq!(map, before);
}

#[test]
fn cut_must_start_on_the_border() {
    let mut map = AreaMap::new();
    let s = map.add_sector(None);
    square(&mut map, 0.0, 0.0, 100.0, 100.0, s, None);
    let nodes = [node(&map, 50.0, 50.0), node(&map, 50.0, 100.0)];
    assert!(matches!(split_sector(&mut map, &nodes), Err(EditError::InvalidSplit(_))));
}

#[test]
fn deleting_a_shared_edge_joins_the_sectors() {
    let mut map = AreaMap::new();
    let left = map.add_sector(None);
    let right = map.add_sector(None);
    let a = map.add_vertex(v(0.0, 0.0));
    let b = map.add_vertex(v(100.0, 0.0));
    let c = map.add_vertex(v(200.0, 0.0));
    let d = map.add_vertex(v(200.0, 100.0));
    let e = map.add_vertex(v(100.0, 100.0));
    let f = map.add_vertex(v(0.0, 100.0));
    edge(&mut map, a, b, Some(left), None);
    edge(&mut map, b, c, Some(right), None);
    edge(&mut map, c, d, Some(right), None);
    edge(&mut map, d, e, Some(right), None);
    edge(&mut map, e, f, Some(left), None);
    edge(&mut map, f, a, Some(left), None);
    let shared = edge(&mut map, b, e, Some(left), Some(right));
    map.update_sector_bbox(left);
    map.update_sector_bbox(right);

    delete_edges(&mut map, &[shared]).expect("delete");
    assert!(map.edge(shared).is_none());
    assert_eq!(map.sector_count(), 1);
    assert_eq!(map.edge_count(), 6);
    let kept = map.sector_ids().next().expect("sector");
    assert_eq!(map.sector_polygons(kept).map(|r| r.len()), Ok(1));
    assert_eq!(map.sector_bbox(kept), Some((0.0, 0.0, 200.0, 100.0)));
}

#[test]
fn deleting_an_outer_edge_dissolves_a_lone_sector() {
    let mut map = AreaMap::new();
    let s = map.add_sector(None);
    let vs = square(&mut map, 0.0, 0.0, 100.0, 100.0, s, None);
    let bottom = map.edge_between(vs[0], vs[1]).expect("bottom");
    delete_edges(&mut map, &[bottom]).expect("delete");
    // every edge bordered the void, so the whole sector merges into it
    assert_eq!(map.sector_count(), 0);
    assert_eq!(map.edge_count(), 0);
    assert_eq!(map.vertex_count(), 0);
}

#[test]
fn move_that_crosses_an_edge_is_refused() {
    let mut map = AreaMap::new();
    let s = map.add_sector(None);
    let vs = square(&mut map, 0.0, 0.0, 100.0, 100.0, s, None);
    let before = map.clone();
    let err = move_vertex(&mut map, vs[2], v(-50.0, 50.0), 10.0, 8.0).unwrap_err();
    assert!(matches!(err, EditError::IntersectingMove));
    assert_eq!(map, before);
}

#[test]
fn vertex_dropped_on_an_edge_splits_it() {
    let mut map = AreaMap::new();
    let a = map.add_sector(None);
    let b = map.add_sector(None);
    let avs = square(&mut map, 0.0, 0.0, 100.0, 100.0, a, None);
    let bvs = square(&mut map, 200.0, 0.0, 300.0, 100.0, b, None);
    let a_right = map.edge_between(avs[1], avs[2]).expect("right edge");

    let outcome = move_vertex(&mut map, bvs[0], v(100.0, 50.0), 10.0, 8.0).expect("move");
    let MoveOutcome::SplitAndMerged { edge, vertex } = outcome else {
        panic!("expected a split, got {outcome:?}");
    };
    assert_eq!(edge, a_right);
    assert_eq!(map.vertex_pos(vertex), Some(v(100.0, 50.0)));
    assert!(map.vertex(bvs[0]).is_none());
    assert_eq!(map.vertex_count(), 8);
    assert_eq!(map.edge_count(), 9);
    assert_eq!(map.sector(a).map(|s| s.edges.len()), Some(5));
    assert_eq!(map.vertex(vertex).map(|x| x.edges.len()), Some(4));
    assert_clean(&map);
}
