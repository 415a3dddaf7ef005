use super::*;
use crate::graph::{build, TaskGraph};

fn config() -> PipelineConfig {
  PipelineConfig::new("spine", [0, 0, 0, 1024, 1024, 256], [256, 256, 128])
}

fn built(config: &PipelineConfig) -> TaskGraph {
  build(config).unwrap()
}

#[test]
fn test_spine_order() {
  let graph = built(&config());
  let spine = [
    start_key(),
    reset_flags_key(),
    trigger_key(Stage::Ws),
    wait_key(Stage::Ws),
    trigger_key(Stage::Agg),
    wait_key(Stage::Agg),
    reduction_key(),
    end_key(),
  ];

  for pair in spine.windows(2) {
    assert!(graph.has_edge(&pair[0], &pair[1]), "{} -> {}", pair[0], pair[1]);
  }
  assert!(graph.has_edge(&wait_key(Stage::Agg), &check_key()));
  assert!(graph.has_edge(&check_key(), &link_key()));
  assert!(graph.has_edge(&reduction_key(), &link_key()));
  assert!(graph.has_edge(&link_key(), &end_key()));

  assert!(graph.nodes().all(|n| !matches!(
    n.key.kind,
    TaskKind::Barrier | TaskKind::Trigger | TaskKind::ResetFlags
  ) || n.queue == Queue::Manager));
}

/// Built stages sit between their trigger and wait barrier.
#[test]
fn test_stage_linked_between_trigger_and_wait() {
  let graph = built(&config());

  for stage in Stage::ALL {
    assert!(graph.has_edge(&trigger_key(stage), &init_key(stage)));
    assert!(graph.has_edge(&done_key(stage), &wait_key(stage)));
    let trigger = graph.node(&trigger_key(stage)).unwrap();
    assert_eq!(trigger.payload, Payload::Gate(GateDecision::Proceed));
  }
}

#[test]
fn test_start_message_names_bbox() {
  let graph = built(&config());
  let start = graph.node(&start_key()).unwrap();

  let Payload::Notify { message, .. } = &start.payload else {
    panic!("start barrier carries a message");
  };
  assert!(message.starts_with("spine: segmentation started"));
  assert!(message.contains("[0, 0, 0] - [1024, 1024, 256]"), "{message}");
}

/// Without ground truth there is no evaluation and the link is broadcast.
#[test]
fn test_no_evaluation_without_ground_truth() {
  let graph = built(&config());

  assert!(!graph.contains(&evaluation_key()));
  assert!(matches!(
    graph.node(&link_key()).unwrap().payload,
    Payload::Notify { broadcast: true, .. }
  ));
}

#[test]
fn test_evaluation_with_ground_truth() {
  let mut config = config();
  config.ground_truth = Some("gs://bucket/gt".into());
  let graph = built(&config);

  assert!(graph.has_edge(&reduction_key(), &evaluation_key()));
  assert!(graph.has_edge(&evaluation_key(), &end_key()));
  assert!(matches!(
    graph.node(&link_key()).unwrap().payload,
    Payload::Notify { broadcast: false, .. }
  ));
}

/// Skipping both stages leaves only the spine and run-level scaling.
#[test]
fn test_both_stages_skipped() {
  let mut config = config();
  config.skip = vec![Stage::Ws, Stage::Agg];
  let graph = built(&config);

  assert_eq!(graph.stats().chunk_nodes, 0);
  for stage in Stage::ALL {
    let next: Vec<&NodeKey> = graph.successors(&trigger_key(stage)).collect();
    assert_eq!(next, vec![&wait_key(stage)]);
  }
  // start, reset, 2 × (trigger, wait), reduction, check, link, end, 3 scale nodes
  assert_eq!(graph.len(), 13);
}
