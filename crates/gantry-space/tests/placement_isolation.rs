//! Isolation properties of the placement manager.
//!
//! No two live reservations may overlap, every reservation stays inside
//! the grid, and every frame maps its structure inside its own region.

use gantry_core::{BlockPos, Extent, InstanceId, Rotation};
use gantry_space::{
    PlacementConfig, PlacementError, PlacementManager, PlacementRequest, RotationPolicy,
};
use proptest::prelude::*;

fn grid(width: u32, depth: u32, seed: u64) -> PlacementManager {
    PlacementManager::new(PlacementConfig {
        origin: BlockPos::new(-32, 4, 100),
        width,
        depth,
        seed,
    })
}

fn assert_isolated(m: &PlacementManager) {
    let regions: Vec<_> = m.reserved_regions().collect();
    for (i, (a_id, a)) in regions.iter().enumerate() {
        for (b_id, b) in &regions[i + 1..] {
            assert!(
                !a.intersects(b),
                "instance {a_id} {a} overlaps instance {b_id} {b}"
            );
        }
    }
}

#[test]
fn identical_padded_structures_do_not_overlap() {
    let mut m = grid(128, 128, 0);
    let req = PlacementRequest {
        extent: Extent::new(9, 6, 9),
        padding: 5,
        rotation: RotationPolicy::Fixed(Rotation::None),
    };
    let a = m.place(InstanceId(1), &req).unwrap();
    let b = m.place(InstanceId(2), &req).unwrap();
    assert!(!a.reserved.intersects(&b.reserved));
    // The structures themselves are at least twice the padding apart.
    let gap = (b.structure.min.x - a.structure.max.x - 1)
        .max(b.structure.min.z - a.structure.max.z - 1);
    assert!(gap >= 10, "gap {gap} smaller than both paddings");
}

#[test]
fn grid_fills_row_by_row() {
    let mut m = grid(64, 64, 0);
    let req = PlacementRequest {
        extent: Extent::new(12, 3, 12),
        padding: 2,
        rotation: RotationPolicy::Fixed(Rotation::None),
    };
    let mut placed = 0;
    for i in 0..64 {
        match m.place(InstanceId(i), &req) {
            Ok(_) => placed += 1,
            Err(PlacementError::NoSpace { .. }) => break,
            Err(other) => panic!("unexpected {other}"),
        }
    }
    // 16-block reservations tile a 64x64 grid exactly.
    assert_eq!(placed, 16);
    assert_isolated(&m);
}

#[derive(Clone, Debug)]
enum Op {
    Place { ex: u32, ez: u32, padding: u32, random: bool },
    Release(usize),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (1u32..12, 1u32..12, 0u32..6, any::<bool>())
            .prop_map(|(ex, ez, padding, random)| Op::Place { ex, ez, padding, random }),
        1 => (0usize..32).prop_map(Op::Release),
    ]
}

proptest! {
    #[test]
    fn reservations_never_overlap(ops in proptest::collection::vec(arb_op(), 1..60), seed in any::<u64>()) {
        let mut m = grid(96, 96, seed);
        let mut live: Vec<InstanceId> = Vec::new();
        let mut next = 0u64;
        for op in ops {
            match op {
                Op::Place { ex, ez, padding, random } => {
                    let req = PlacementRequest {
                        extent: Extent::new(ex, 4, ez),
                        padding,
                        rotation: if random {
                            RotationPolicy::Random
                        } else {
                            RotationPolicy::Fixed(Rotation::None)
                        },
                    };
                    let id = InstanceId(next);
                    next += 1;
                    match m.place(id, &req) {
                        Ok(p) => {
                            live.push(id);
                            prop_assert!(p.reserved.encloses(&p.structure));
                            prop_assert_eq!(p.frame.bounds(), Some(p.structure));
                            let far = BlockPos::new(ex as i32 - 1, 3, ez as i32 - 1);
                            prop_assert!(p.structure.contains(p.frame.world_location(far)));
                        }
                        Err(PlacementError::NoSpace { .. }) => {}
                        Err(other) => prop_assert!(false, "unexpected {}", other),
                    }
                }
                Op::Release(i) => {
                    if !live.is_empty() {
                        let id = live.remove(i % live.len());
                        prop_assert!(m.release(id).is_some());
                    }
                }
            }
            assert_isolated(&m);
            for (_, r) in m.reserved_regions() {
                prop_assert!(r.min.x >= -32 && r.max.x < -32 + 96);
                prop_assert!(r.min.z >= 100 && r.max.z < 100 + 96);
            }
        }
    }
}
