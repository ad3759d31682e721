// src/strategy/tests.rs

use super::*;

use crate::attrs::{ActionDescriptor, Catalogue, ReadOperand};
use crate::search::{MemoCache, Orientation, Schedules};

fn catalogue(offsets: &[i64], aattrs: Vec<ActionDescriptor>) -> Rc<Catalogue> {
    Rc::new(Catalogue::new(
        offsets.iter().map(|&o| ReadOperand(o)).collect(),
        aattrs,
    ))
}

fn exhaustive_best(cat: &Rc<Catalogue>) -> Rc<CompositeSchedule> {
    Schedules::shared(
        cat.clone(),
        None,
        Some(MemoCache::new_shared()),
        None,
        Orientation::TopDown,
    )
    .best()
    .unwrap()
}

#[test]
fn beam_width_one_degrades_to_a_deterministic_greedy_path() {
    let cat = catalogue(&[0, 1, 2], vec![ActionDescriptor::new(1).with_arity(2)]);
    let first = best_beam_schedule(cat.clone(), None, 1, 60.0, Optimizations::default()).unwrap();
    let second = best_beam_schedule(cat.clone(), None, 1, 60.0, Optimizations::default()).unwrap();
    assert_eq!(
        first.to_string_with_offset(),
        second.to_string_with_offset()
    );

    let optimum = exhaustive_best(&cat);
    assert!(first.num_ops() >= optimum.num_ops());
}

#[test_log::test]
fn beam_timeout_with_no_completion_is_an_error() {
    let cat = catalogue(&[0, 1, 2], vec![ActionDescriptor::new(1).with_arity(2)]);
    let result = best_beam_schedule(cat, None, 4, 0.0, Optimizations::default());
    let err = result.unwrap_err();
    assert!(err.to_string().contains("timed out"), "got: {err}");
}

#[test]
fn beam_completed_best_never_regresses() {
    let cat = catalogue(&[0, 1, 2, 3], vec![ActionDescriptor::new(1).with_arity(2)]);
    let mut beam = BeamSearch::new(cat, None, 4, Optimizations::default());
    let mut recorded = Vec::new();
    loop {
        if let Some(best) = beam.best_completed() {
            recorded.push((best.num_ops(), best.total_distance()));
        }
        if !beam.round() {
            break;
        }
    }
    if let Some(best) = beam.best_completed() {
        recorded.push((best.num_ops(), best.total_distance()));
    }
    assert!(!recorded.is_empty());
    for pair in recorded.windows(2) {
        assert!(pair[1] <= pair[0], "completed best regressed: {recorded:?}");
    }
}

#[test]
fn greedy_is_deterministic_and_never_beats_exhaustive() {
    let cat = catalogue(&[0, 1, 2, 3], vec![ActionDescriptor::new(1).with_arity(2)]);
    let first = best_greedy_schedule(cat.clone(), None, 3).unwrap();
    let second = best_greedy_schedule(cat.clone(), None, 3).unwrap();
    assert_eq!(
        first.to_string_with_offset(),
        second.to_string_with_offset()
    );

    let optimum = exhaustive_best(&cat);
    assert!(first.num_ops() >= optimum.num_ops());
}

#[test]
fn greedy_finds_the_congruent_pairing() {
    // Pairing (0,1) with (2,3) shares one operation; the skewed trees need
    // three. The local scores steer greedy to the shared shape.
    let cat = catalogue(&[0, 1, 2, 3], vec![ActionDescriptor::new(1).with_arity(2)]);
    let best = best_greedy_schedule(cat, None, 3).unwrap();
    assert_eq!(best.num_ops(), 2);
}

#[test]
fn single_operand_completes_without_expansion() {
    let cat = catalogue(&[7], vec![]);
    let greedy = best_greedy_schedule(cat.clone(), None, 3).unwrap();
    assert_eq!(greedy.num_ops(), 0);

    // Already complete before the first round, so even a zero deadline
    // returns it.
    let beam = best_beam_schedule(cat, None, 4, 0.0, Optimizations::default()).unwrap();
    assert_eq!(beam.num_ops(), 0);
}

#[test]
fn illegal_groupings_exhaust_the_heuristics() {
    let cat = catalogue(&[0, 100], vec![]);
    let lin = Rc::new(Linearizer::with_window(10));
    assert!(best_greedy_schedule(cat.clone(), Some(lin.clone()), 3).is_err());
    let err = best_beam_schedule(cat, Some(lin), 4, 60.0, Optimizations::default()).unwrap_err();
    assert!(!err.to_string().contains("timed out"), "got: {err}");
}

#[test]
fn optimization_flags_bound_the_grouping_shapes() {
    let cat = catalogue(&[0, 1, 2], vec![]);

    // Free-form grouping reaches the flat ternary operation.
    let free = best_beam_schedule(cat.clone(), None, 8, 60.0, Optimizations::empty()).unwrap();
    assert_eq!(free.num_ops(), 1);

    // Pairwise-only grouping is limited to binary trees.
    let pairwise =
        best_beam_schedule(cat.clone(), None, 8, 60.0, Optimizations::PAIRWISE_ONLY).unwrap();
    assert_eq!(pairwise.num_ops(), 2);

    // Adjacent-only still allows the full contiguous run.
    let adjacent =
        best_beam_schedule(cat, None, 8, 60.0, Optimizations::ADJACENT_ONLY).unwrap();
    assert_eq!(adjacent.num_ops(), 1);
}

#[test]
fn expansions_are_ordered_best_first() {
    let cat = catalogue(&[0, 1, 5], vec![]);
    let initial = Partial::initial(&cat);
    let expansions = initial.expansions(&cat, None, Optimizations::default());
    assert!(!expansions.is_empty());
    for pair in expansions.windows(2) {
        let a = (pair[0].num_ops(), pair[0].total_distance());
        let b = (pair[1].num_ops(), pair[1].total_distance());
        assert!(a <= b);
    }
}

#[test]
fn initial_forest_covers_every_operand() {
    let cat = catalogue(&[3, 1, 2], vec![]);
    let initial = Partial::initial(&cat);
    assert_eq!(initial.units().len(), 3);
    assert_eq!(initial.num_ops(), 0);
    assert!(!initial.is_complete());
    // Units are kept in offset order.
    let offsets: Vec<i64> = initial
        .units()
        .iter()
        .map(|u| u.item.span(&cat).0)
        .collect();
    assert_eq!(offsets, vec![1, 2, 3]);
}
