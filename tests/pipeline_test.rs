// tests/pipeline_test.rs
//
// End-to-end runs over a decoded input document: every strategy consumes
// the same catalogue and parameters and must agree on feasibility, with
// the exhaustive result as the quality floor.

use std::rc::Rc;

use serde_json::json;

use reuse_sched::config::RunConfig;
use reuse_sched::search::{MemoCache, Orientation, RunStats, Schedules};
use reuse_sched::strategy::{best_beam_schedule, best_greedy_schedule};
use reuse_sched::{Catalogue, Linearizer};

fn decode(document: &serde_json::Value) -> (Rc<Catalogue>, Option<Rc<Linearizer>>, RunConfig) {
    let catalogue: Catalogue = serde_json::from_value(document.clone()).unwrap();
    let linearizer = document
        .get("linearizer")
        .map(|raw| Rc::new(serde_json::from_value::<Linearizer>(raw.clone()).unwrap()));
    let config: RunConfig = serde_json::from_value(document.clone()).unwrap();
    (Rc::new(catalogue), linearizer, config)
}

#[test_log::test]
fn all_strategies_schedule_the_same_document() {
    let document = json!({
        "rattrs": [0, 1, 2, 3],
        "aattrs": [{"tag": 1, "arity": 2}],
        "beam_width": 8,
        "timeout": 60.0,
    });
    let (catalogue, linearizer, config) = decode(&document);

    let cache = MemoCache::new_shared();
    let stats = Rc::new(RunStats::default());
    let exhaustive = Schedules::shared(
        catalogue.clone(),
        None,
        Some(cache.clone()),
        Some(stats.clone()),
        Orientation::TopDown,
    )
    .best()
    .unwrap();

    let greedy =
        best_greedy_schedule(catalogue.clone(), linearizer.clone(), config.num_pruned).unwrap();
    let beam = best_beam_schedule(
        catalogue.clone(),
        linearizer,
        config.beam_width,
        config.timeout,
        config.optimizations(),
    )
    .unwrap();

    assert!(greedy.num_ops() >= exhaustive.num_ops());
    assert!(beam.num_ops() >= exhaustive.num_ops());
    // Shared congruent pairs make two operations the optimum here, and the
    // heuristics find it too.
    assert_eq!(exhaustive.num_ops(), 2);
    assert_eq!(greedy.num_ops(), 2);
    assert_eq!(beam.num_ops(), 2);

    assert!(stats.cache_hits() > 0);
    assert!(stats.cache_misses() > 0);
}

#[test]
fn winning_schedule_serializes_into_the_document_shape() {
    let document = json!({
        "rattrs": [4, 5],
        "aattrs": [],
    });
    let (catalogue, _linearizer, config) = decode(&document);

    let best = best_beam_schedule(
        catalogue,
        None,
        config.beam_width,
        config.timeout,
        config.optimizations(),
    )
    .unwrap();

    let value = serde_json::to_value(best.as_ref()).unwrap();
    assert_eq!(value["offset"], 4);
    assert!(value["op"].is_null());
    assert_eq!(value["parts"][0]["read"], 4);
    assert_eq!(value["parts"][1]["read"], 5);
}

#[test]
fn linearizer_window_rules_out_every_grouping() {
    let document = json!({
        "rattrs": [0, 50],
        "aattrs": [],
        "linearizer": {"window": 10},
    });
    let (catalogue, linearizer, config) = decode(&document);
    assert!(linearizer.is_some());

    let result = best_greedy_schedule(catalogue, linearizer, config.num_pruned);
    assert!(result.is_err());
}

#[test]
fn parallel_descriptor_layout_round_trips() {
    let document = json!({
        "rattrs": [0, 1, 2],
        "aattrs": [7, 8, 9],
    });
    let (catalogue, _linearizer, config) = decode(&document);
    assert!(catalogue.is_parallel());

    let best = best_beam_schedule(
        catalogue,
        None,
        config.beam_width,
        config.timeout,
        config.optimizations(),
    )
    .unwrap();
    assert!(best.num_ops() >= 1);

    let value = serde_json::to_value(best.as_ref()).unwrap();
    let rendered = serde_json::to_string(&value).unwrap();
    assert!(rendered.contains("\"action\""));
}
