use proptest::prelude::*;
use sectormap::algorithms::picking::SnapMode;
use sectormap::config::EditorConfig;
use sectormap::editor::{Editor, EditorState};
use sectormap::{AreaMap, EdgeId, Vec2, VertexId};

#[derive(Clone, Debug)]
enum Op {
    Rect { x: u8, y: u8, w: u8, h: u8 },
    SplitEdge { idx: u16, t: u8 },
    MoveVertex { idx: u16, dx: i8, dy: i8 },
    DeleteEdge { idx: u16 },
    MergeVertices { a: u16, b: u16 },
    Undo,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u8..16, 0u8..16, 1u8..8, 1u8..8).prop_map(|(x, y, w, h)| Op::Rect { x, y, w, h }),
        1 => (any::<u16>(), 1u8..9).prop_map(|(idx, t)| Op::SplitEdge { idx, t }),
        1 => (any::<u16>(), any::<i8>(), any::<i8>()).prop_map(|(idx, dx, dy)| Op::MoveVertex {
            idx,
            dx,
            dy,
        }),
        1 => any::<u16>().prop_map(|idx| Op::DeleteEdge { idx }),
        1 => (any::<u16>(), any::<u16>()).prop_map(|(a, b)| Op::MergeVertices { a, b }),
        1 => Just(Op::Undo),
    ]
}

const CELL: f32 = 20.0;

fn pick<T: Copy>(items: &[T], idx: u16) -> Option<T> {
    if items.is_empty() {
        None
    } else {
        Some(items[idx as usize % items.len()])
    }
}

fn draw_rect(ed: &mut Editor, x: u8, y: u8, w: u8, h: u8) {
    let (x0, y0) = (x as f32 * CELL, y as f32 * CELL);
    let (x1, y1) = ((x + w) as f32 * CELL, (y + h) as f32 * CELL);
    if ed.begin_sector_draw().is_err() {
        return;
    }
    for (px, py) in [(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)] {
        if ed.add_drawing_node(Vec2::new(px, py)).is_err() || ed.state() == EditorState::Idle {
            break;
        }
    }
    ed.cancel_drawing();
}

/// Runs one command. A refused command must leave the map exactly as it was.
fn apply_op(ed: &mut Editor, op: Op) {
    let verts: Vec<VertexId> = ed.map().vertex_ids().collect();
    let edges: Vec<EdgeId> = ed.map().edge_ids().collect();
    let before = ed.map().clone();
    let refused = match op {
        Op::Rect { x, y, w, h } => {
            draw_rect(ed, x, y, w, h);
            return;
        }
        Op::Undo => {
            let _ = ed.undo();
            return;
        }
        Op::SplitEdge { idx, t } => {
            let Some((a, b)) = pick(&edges, idx).and_then(|e| ed.map().edge_points(e)) else {
                return;
            };
            let t = t as f32 / 10.0;
            let at = Vec2::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t);
            ed.split_edge_at(at).is_err()
        }
        Op::MoveVertex { idx, dx, dy } => {
            let Some(v) = pick(&verts, idx) else { return };
            let Some(p) = ed.map().vertex_pos(v) else { return };
            let to = Vec2::new(p.x + dx as f32 * 0.25, p.y + dy as f32 * 0.25);
            ed.move_vertex(v, to).is_err()
        }
        Op::DeleteEdge { idx } => {
            let Some(e) = pick(&edges, idx) else { return };
            ed.delete_edges(&[e]).is_err()
        }
        Op::MergeVertices { a, b } => {
            let (Some(src), Some(dst)) = (pick(&verts, a), pick(&verts, b)) else {
                return;
            };
            let Some(target) = ed.map().vertex_pos(dst) else { return };
            ed.merge_under_cursor(src, target).is_err()
        }
    };
    if refused {
        assert_eq!(ed.map(), &before, "refused {op:?} changed the map");
    }
}

fn assert_invariants(map: &AreaMap) {
    for e in map.edge_ids() {
        let edge = map.edge(e).expect("live edge");
        assert_ne!(edge.vertices[0], edge.vertices[1], "{e} is a loop");
        for v in edge.vertices {
            let vx = map.vertex(v).unwrap_or_else(|| panic!("{e} points at dead {v}"));
            assert!(vx.edges.contains(&e), "{v} does not list {e}");
        }
        for s in edge.sectors.into_iter().flatten() {
            let sec = map.sector(s).unwrap_or_else(|| panic!("{e} points at dead {s}"));
            assert!(sec.edges.contains(&e), "{s} does not list {e}");
        }
    }
    for v in map.vertex_ids() {
        let vx = map.vertex(v).expect("live vertex");
        assert!(vx.pos.is_finite());
        for &e in &vx.edges {
            let edge = map.edge(e).unwrap_or_else(|| panic!("{v} lists dead {e}"));
            assert!(edge.has_vertex(v), "{v} lists {e} which does not touch it");
        }
    }
    for s in map.sector_ids() {
        for &e in &map.sector(s).expect("live sector").edges {
            let edge = map.edge(e).unwrap_or_else(|| panic!("{s} lists dead {e}"));
            assert!(edge.has_sector(Some(s)), "{s} lists {e} which does not border it");
        }
    }
}

fn sequence_strategy() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(op_strategy(), 5..25)
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]
    #[test]
    fn map_edit_invariants(seq in sequence_strategy()) {
        let mut ed = Editor::new(EditorConfig {
            snap_mode: SnapMode::Nothing,
            ..EditorConfig::default()
        });
        for op in seq {
            apply_op(&mut ed, op);
            prop_assert_eq!(ed.state(), EditorState::Idle);
            assert_invariants(ed.map());
        }
        let _ = ed.find_problems();

        let doc = ed.map().to_json_value();
        let mut reloaded = AreaMap::new();
        prop_assert!(reloaded.from_json_value(doc).is_ok());
        assert_invariants(&reloaded);
    }
}
