//! Property tests over the drag session lifecycle.

use std::time::Duration;

use proptest::prelude::*;
use tilesort::{
    CancelReason, Container, ContainerId, DispatchOutcome, DragEffect, DragPhase, IgnoredReason,
    Item, ItemKey, MouseButton, OrderUpdate, PersistError, Point, Rect, ReorderConfig,
    ReorderEngine, ScrollRegion, Zone,
};
use tilesort_layout::{CarouselStrategy, GridStrategy, PlacementStrategy};
use web_time::Instant;

const COLUMNS: usize = 3;

fn noop(_: &OrderUpdate) -> Result<(), PersistError> {
    Ok(())
}

fn cell(index: usize) -> Rect {
    let col = (index % COLUMNS) as f64;
    let row = (index / COLUMNS) as f64;
    Rect::new(col * 110.0, row * 110.0, 100.0, 100.0)
}

fn names(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("tile-{i}")).collect()
}

fn grid_engine(n: usize) -> (ReorderEngine, ContainerId) {
    let container = Container::grid("board")
        .with_items(names(n).into_iter().enumerate().map(|(i, id)| Item::new(id, cell(i))));
    let id = container.id().clone();
    let mut engine = ReorderEngine::new(ReorderConfig::default()).expect("default config");
    engine.enable(container, noop).expect("enable");
    (engine, id)
}

fn camera(index: usize) -> Rect {
    Rect::new(index as f64 * 160.0, 0.0, 150.0, 90.0)
}

/// Strip of `n` cameras in a 300px viewport, scrollable to its last camera.
fn strip_engine(n: usize) -> (ReorderEngine, ContainerId) {
    let viewport = Rect::new(0.0, 0.0, 300.0, 100.0);
    let container = Container::carousel("strip", ScrollRegion::new(viewport, 0.0))
        .with_items(names(n).into_iter().enumerate().map(|(i, id)| Item::new(id, camera(i))));
    let id = container.id().clone();
    let mut engine = ReorderEngine::new(ReorderConfig::default()).expect("default config");
    engine.enable(container, noop).expect("enable");
    (engine, id)
}

fn key_at(engine: &ReorderEngine, id: &ContainerId, index: usize) -> ItemKey {
    engine.container(id).expect("registered").items()[index].key()
}

fn ids(engine: &ReorderEngine, id: &ContainerId) -> Vec<String> {
    engine
        .container(id)
        .expect("registered")
        .ids()
        .into_iter()
        .map(str::to_owned)
        .collect()
}

fn at(base: Instant, millis: u64) -> Instant {
    base + Duration::from_millis(millis)
}

fn pointer() -> impl Strategy<Value = Point> {
    (-60.0..400.0f64, -60.0..400.0f64).prop_map(|(x, y)| Point::new(x, y))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn drop_relocates_exactly_one_item(
        n in 1usize..10,
        from in any::<prop::sample::Index>(),
        moves in prop::collection::vec(pointer(), 0..8),
        release in pointer(),
    ) {
        let (mut engine, id) = grid_engine(n);
        let from = from.index(n);
        let dragged = key_at(&engine, &id, from);
        let start = Instant::now();

        let down = engine.pointer_down(dragged, MouseButton::Primary, cell(from).center(), start);
        prop_assert_eq!(down.outcome, DispatchOutcome::Forwarded);
        for (step, pos) in moves.iter().enumerate() {
            engine.pointer_move(*pos, at(start, 20 * (step as u64 + 1)));
        }
        let up = engine.pointer_up(release, at(start, 500));

        let to = up
            .transitions
            .iter()
            .find_map(|t| match t.effect {
                DragEffect::Dropped { to_index, from_index, .. } => {
                    Some((from_index, to_index))
                }
                _ => None,
            });
        let (from_index, to_index) = to.expect("drop transition");
        prop_assert_eq!(from_index, from);
        prop_assert!(to_index < n);

        let mut expected = names(n);
        let moved = expected.remove(from);
        expected.insert(to_index, moved);
        let actual = ids(&engine, &id);
        prop_assert_eq!(&actual, &expected);

        let mut sorted = actual.clone();
        sorted.sort();
        let mut original = names(n);
        original.sort();
        prop_assert_eq!(sorted, original);
        prop_assert_eq!(up.saved.map(|u| u.order), Some(actual));
    }

    #[test]
    fn second_press_leaves_session_untouched(
        n in 2usize..10,
        first in any::<prop::sample::Index>(),
        second in any::<prop::sample::Index>(),
        hover in pointer(),
        touch in any::<bool>(),
    ) {
        let (mut engine, id) = grid_engine(n);
        let first = key_at(&engine, &id, first.index(n));
        let second_index = second.index(n);
        let second = key_at(&engine, &id, second_index);
        let start = Instant::now();

        engine.pointer_down(first, MouseButton::Primary, Point::new(1.0, 1.0), start);
        engine.pointer_move(hover, at(start, 10));
        let placeholder = engine.placeholder().map(|(c, z)| (c.clone(), z));
        let order = ids(&engine, &id);

        let press_at = cell(second_index).center();
        let rejected = if touch {
            engine.touch_start(second, press_at, at(start, 20))
        } else {
            engine.pointer_down(second, MouseButton::Primary, press_at, at(start, 20))
        };
        prop_assert_eq!(
            rejected.outcome,
            DispatchOutcome::Ignored(IgnoredReason::ActiveSessionInProgress)
        );
        prop_assert!(rejected.transitions.is_empty());
        prop_assert_eq!(engine.phase(), DragPhase::Active { item: first });
        prop_assert_eq!(engine.placeholder().map(|(c, z)| (c.clone(), z)), placeholder);
        prop_assert_eq!(ids(&engine, &id), order);
    }

    #[test]
    fn placement_respects_grid_throttle(
        n in 2usize..10,
        from in any::<prop::sample::Index>(),
        path in prop::collection::vec(pointer(), 1..40),
    ) {
        let (mut engine, id) = grid_engine(n);
        let from = from.index(n);
        let dragged = key_at(&engine, &id, from);
        let start = Instant::now();
        engine.pointer_down(dragged, MouseButton::Primary, cell(from).center(), start);

        let mut applied = Vec::new();
        let mut last_ms = 0;
        for (step, pos) in path.iter().enumerate() {
            last_ms = 10 * (step as u64 + 1);
            let now = at(start, last_ms);
            let moved = engine.pointer_move(*pos, now);
            let ticked = engine.tick(now);
            if moved.placement.is_some() || ticked.placement.is_some() {
                applied.push(last_ms);
            }
        }
        prop_assert!(
            applied.windows(2).all(|w| w[1] - w[0] >= 150),
            "placeholder moved within one interval: {:?}",
            applied
        );

        // Once the trailing interval elapses, the zone reflects the last pointer.
        engine.tick(at(start, last_ms + 150));
        let siblings: Vec<Rect> = (0..n).filter(|i| *i != from).map(cell).collect();
        let last = *path.last().expect("non-empty path");
        let expected = GridStrategy::default().place(last, &siblings);
        prop_assert_eq!(engine.placeholder().map(|(_, z)| z), Some(expected));
    }

    #[test]
    fn placement_respects_carousel_throttle(
        n in 2usize..7,
        from in any::<prop::sample::Index>(),
        path in prop::collection::vec(
            (-60.0..360.0f64, 0.0..100.0f64).prop_map(|(x, y)| Point::new(x, y)),
            1..40,
        ),
    ) {
        let (mut engine, id) = strip_engine(n);
        let from = from.index(n);
        let dragged = key_at(&engine, &id, from);
        let start = Instant::now();
        engine.pointer_down(dragged, MouseButton::Primary, camera(from).center(), start);

        // Auto-scroll frames re-offer the pointer, so they count too.
        let mut applied = Vec::new();
        let mut last_ms = 0;
        for (step, pos) in path.iter().enumerate() {
            last_ms = 10 * (step as u64 + 1);
            let now = at(start, last_ms);
            let moved = engine.pointer_move(*pos, now);
            let frame = engine.animation_frame(now);
            let ticked = engine.tick(now);
            if [moved.placement, frame.placement, ticked.placement].iter().any(Option::is_some) {
                applied.push(last_ms);
            }
        }
        prop_assert!(
            applied.windows(2).all(|w| w[1] - w[0] >= 50),
            "placeholder moved within one interval: {:?}",
            applied
        );

        engine.tick(at(start, last_ms + 50));
        let offset = engine
            .container(&id)
            .and_then(Container::scroll)
            .map(ScrollRegion::offset)
            .expect("carousel");
        let last = *path.last().expect("non-empty path");
        let content = Point::new(last.x + offset, last.y);
        let siblings: Vec<Rect> = (0..n).filter(|i| *i != from).map(camera).collect();
        let expected = CarouselStrategy.place(content, &siblings);
        prop_assert_eq!(engine.placeholder().map(|(_, z)| z), Some(expected));
    }
}

#[test]
fn cancelled_touch_press_restores_state_idempotently() {
    let (mut engine, id) = grid_engine(4);
    let item = key_at(&engine, &id, 1);
    let start = Instant::now();

    engine.touch_start(item, cell(1).center(), start);
    assert_eq!(engine.phase(), DragPhase::PendingActivation { item });
    assert!(!engine.item_visual(item).is_normal());

    let moved = engine.pointer_move(cell(1).center().offset(0.0, 40.0), at(start, 120));
    assert!(moved.transitions.iter().any(|t| t.effect
        == DragEffect::PressReverted {
            item,
            reason: CancelReason::MovedBeforeActivation,
        }));

    for _ in 0..2 {
        let stray = engine.pointer_up(cell(1).center(), at(start, 200));
        assert_eq!(
            stray.outcome,
            DispatchOutcome::Ignored(IgnoredReason::NoActiveGesture)
        );
        let interrupt = engine.interrupt();
        assert!(interrupt.is_ignored());
        assert!(engine.tick(at(start, 1000)).is_ignored());
        assert_eq!(engine.phase(), DragPhase::Idle);
        assert!(engine.item_visual(item).is_normal());
        assert!(engine.placeholder_visual().is_none());
        assert!(!engine.listeners_registered());
    }
}

#[test]
fn touch_released_before_delay_never_activates() {
    let (mut engine, id) = grid_engine(2);
    let item = key_at(&engine, &id, 0);
    let start = Instant::now();
    engine.touch_start(item, cell(0).center(), start);
    let up = engine.pointer_up(cell(0).center(), at(start, 100));
    assert!(up.transitions.iter().any(|t| t.effect
        == DragEffect::PressReverted {
            item,
            reason: CancelReason::ReleasedBeforeActivation,
        }));
    assert!(engine.tick(at(start, 400)).is_ignored());
    assert_eq!(engine.phase(), DragPhase::Idle);
}

#[test]
fn interrupt_restores_original_order_without_saving() {
    let saved = std::rc::Rc::new(std::cell::Cell::new(0));
    let calls = std::rc::Rc::clone(&saved);
    let container = Container::grid("board")
        .with_items(names(4).into_iter().enumerate().map(|(i, id)| Item::new(id, cell(i))));
    let id = container.id().clone();
    let mut engine = ReorderEngine::new(ReorderConfig::default()).expect("default config");
    engine
        .enable(container, move |_: &OrderUpdate| -> Result<(), PersistError> {
            calls.set(calls.get() + 1);
            Ok(())
        })
        .expect("enable");
    let item = key_at(&engine, &id, 3);
    let start = Instant::now();

    engine.pointer_down(item, MouseButton::Primary, cell(3).center(), start);
    let hover = engine.pointer_move(cell(0).center().offset(-40.0, 0.0), at(start, 10));
    assert_eq!(hover.placement, Some(Zone(0)));

    let interrupted = engine.interrupt();
    assert!(
        interrupted
            .transitions
            .iter()
            .any(|t| t.effect == DragEffect::Interrupted { item })
    );
    assert_eq!(ids(&engine, &id), names(4));
    assert_eq!(saved.get(), 0);
    assert_eq!(engine.phase(), DragPhase::Idle);
    assert!(!engine.listeners_registered());
    assert!(engine.item_visual(item).is_normal());

    // The release that follows finds nothing to settle.
    let up = engine.pointer_up(cell(0).center(), at(start, 20));
    assert!(up.is_ignored());
    assert_eq!(saved.get(), 0);
}
