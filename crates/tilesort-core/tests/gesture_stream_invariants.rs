//! Property checks for the normalized gesture stream.
//!
//! Random touch and mouse input streams must always produce well-formed
//! per-item sequences: `Start`, then either `Cancel` or `Activate` followed by
//! moves and a single `End`.

use std::time::Duration;

use proptest::prelude::*;
use tilesort_core::{
    GestureEvent, GestureNormalizer, ItemKey, MouseButton, Point, ReorderConfig,
};
use web_time::Instant;

#[derive(Debug, Clone)]
enum Op {
    Touch { item: u64, x: f64, y: f64 },
    Mouse { item: u64, x: f64, y: f64 },
    Move { item: u64, x: f64, y: f64 },
    Up { item: u64 },
    Wait { ms: u64 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let item = 0u64..3;
    let coord = 0.0f64..200.0;
    prop_oneof![
        (item.clone(), coord.clone(), coord.clone()).prop_map(|(item, x, y)| Op::Touch { item, x, y }),
        (item.clone(), coord.clone(), coord.clone()).prop_map(|(item, x, y)| Op::Mouse { item, x, y }),
        (item.clone(), coord.clone(), coord).prop_map(|(item, x, y)| Op::Move { item, x, y }),
        item.prop_map(|item| Op::Up { item }),
        (0u64..400).prop_map(|ms| Op::Wait { ms }),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Started,
    Activated,
}

fn check(phases: &mut [Phase; 3], event: &GestureEvent) -> Result<(), TestCaseError> {
    let idx = event.item().0 as usize;
    let phase = phases[idx];
    let next = match event {
        GestureEvent::Start { .. } => {
            prop_assert_eq!(phase, Phase::Idle, "start while tracked");
            Phase::Started
        }
        GestureEvent::Activate { .. } => {
            prop_assert_eq!(phase, Phase::Started, "activate without start");
            Phase::Activated
        }
        GestureEvent::Move { .. } => {
            prop_assert_eq!(phase, Phase::Activated, "move before activation");
            Phase::Activated
        }
        GestureEvent::End { .. } => {
            prop_assert_eq!(phase, Phase::Activated, "end before activation");
            Phase::Idle
        }
        GestureEvent::Cancel { .. } => {
            prop_assert_eq!(phase, Phase::Started, "cancel outside pending");
            Phase::Idle
        }
    };
    phases[idx] = next;
    Ok(())
}

proptest! {
    #[test]
    fn gesture_streams_are_well_formed(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut gn = GestureNormalizer::new(&ReorderConfig::default());
        let mut phases = [Phase::Idle; 3];
        let mut now = Instant::now();
        for op in ops {
            let events = match op {
                Op::Touch { item, x, y } => gn.touch_start(ItemKey(item), Point::new(x, y), &[], now),
                Op::Mouse { item, x, y } => {
                    gn.mouse_down(ItemKey(item), MouseButton::Primary, Point::new(x, y), &[], now)
                }
                Op::Move { item, x, y } => gn.pointer_move(ItemKey(item), Point::new(x, y)),
                Op::Up { item } => gn.pointer_up(ItemKey(item), Point::new(0.0, 0.0)),
                Op::Wait { ms } => {
                    now += Duration::from_millis(ms);
                    gn.poll(now)
                }
            };
            for event in &events {
                check(&mut phases, event)?;
            }
        }
    }
}
