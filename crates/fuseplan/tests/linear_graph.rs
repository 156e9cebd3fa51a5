use fuseplan::{DependencyGraph, OpPack, OperatorId, TensorId};

fn t(id: u32) -> TensorId {
    TensorId(id)
}

fn op(id: u32) -> OperatorId {
    OperatorId(id)
}

/// Builds t0 -> op0 -> t1 -> op1 -> ... -> tn, one tensor between each pair.
fn chain(n: u32) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    for i in 0..n {
        graph.add_operator_as_linear(op(i), &[t(i)], &[t(i + 1)]);
    }
    graph
}

#[test]
fn empty_graph_accepts_any_well_formed_operator() {
    let graph = DependencyGraph::new();
    assert!(graph.try_add_operator_as_linear(op(0), &[t(0)], &[t(1)]));
    assert!(graph.try_add_operator_as_linear(op(0), &[], &[t(1)]));
    assert!(graph.try_add_operator_as_linear(op(0), &[t(0), t(1)], &[t(2), t(3)]));
}

#[test]
fn duplicate_and_overlapping_arguments_are_rejected_even_when_empty() {
    let graph = DependencyGraph::new();
    // self loop
    assert!(!graph.try_add_operator_as_linear(op(0), &[t(0)], &[t(0)]));
    assert!(!graph.try_add_operator_as_linear(op(0), &[t(0), t(0)], &[t(1)]));
    assert!(!graph.try_add_operator_as_linear(op(0), &[t(0)], &[t(1), t(1)]));
}

#[test]
fn operators_chain_through_the_dangling_tail_output() {
    let graph = chain(2);
    // t2 dangles off the tail, t1 is already consumed inside the chain
    assert!(graph.try_add_operator_as_linear(op(2), &[t(2)], &[t(3)]));
    assert!(!graph.try_add_operator_as_linear(op(2), &[t(1)], &[t(3)]));
}

#[test]
fn detached_operator_is_rejected() {
    let graph = chain(1);
    assert!(!graph.try_add_operator_as_linear(op(1), &[t(9)], &[t(10)]));
    // a second source-less operator would be a second root
    assert!(!graph.try_add_operator_as_linear(op(1), &[], &[t(10)]));
}

#[test]
fn consuming_two_known_tensors_is_rejected() {
    let mut graph = DependencyGraph::new();
    graph.add_operator_as_linear(op(0), &[t(0)], &[t(1), t(2)]);
    assert!(!graph.try_add_operator_as_linear(op(1), &[t(1), t(2)], &[t(3)]));
    assert!(graph.try_add_operator_as_linear(op(1), &[t(1)], &[t(3)]));
}

#[test]
fn consuming_an_already_consumed_tensor_is_rejected() {
    let graph = chain(2);
    // t1 feeds op1 already; a second consumer would fan out
    assert!(!graph.try_add_operator_as_linear(op(2), &[t(1)], &[t(4)]));
}

#[test]
fn producing_a_known_tensor_is_rejected() {
    let graph = chain(2);
    // linking through t2 is fine, but writing t1 would merge paths
    assert!(!graph.try_add_operator_as_linear(op(2), &[t(2)], &[t(1)]));
    // writing the chain input would close a cycle
    assert!(!graph.try_add_operator_as_linear(op(2), &[t(2)], &[t(0)]));
}

#[test]
fn failed_probes_leave_the_graph_untouched() {
    let graph = chain(3);
    let snapshot = graph.clone();
    assert!(!graph.try_add_operator_as_linear(op(3), &[t(1)], &[t(9)]));
    assert!(!graph.try_add_operator_as_linear(op(3), &[t(3)], &[t(0)]));
    assert!(!graph.try_add_operator_as_linear(op(3), &[t(7)], &[t(7)]));
    assert_eq!(graph, snapshot);
}

#[test]
fn roots_tails_and_tensor_classes_of_a_chain() {
    let graph = chain(3);
    assert_eq!(graph.num_operators(), 3);
    assert_eq!(graph.root_ops(), vec![op(0)]);
    assert_eq!(graph.tail_ops(), vec![op(2)]);
    assert_eq!(graph.all_tensors(), vec![t(0), t(1), t(2), t(3)]);
    assert_eq!(graph.global_src_tensors(), vec![t(0)]);
    assert_eq!(graph.global_dst_tensors(), vec![t(3)]);
    assert_eq!(graph.intermediate_tensors(), vec![t(1), t(2)]);
}

#[test]
fn spare_outputs_of_an_inner_operator_count_as_global() {
    let mut graph = DependencyGraph::new();
    graph.add_operator_as_linear(op(0), &[t(0)], &[t(1), t(2)]);
    graph.add_operator_as_linear(op(1), &[t(1)], &[t(3)]);
    // t2 was never consumed, so it leaves the chain alongside t3
    assert_eq!(graph.global_dst_tensors(), vec![t(2), t(3)]);
    assert_eq!(graph.intermediate_tensors(), vec![t(1)]);
    assert_eq!(graph.tail_ops(), vec![op(1)]);
    // and nothing can chain through it after the fact
    assert!(!graph.try_add_operator_as_linear(op(2), &[t(2)], &[t(4)]));
}

#[test]
fn producer_and_consumer_lookups_follow_the_edges() {
    let graph = chain(2);
    assert!(graph.producers_of(t(0)).is_empty());
    assert_eq!(graph.consumers_of(t(0)), &[op(0)]);
    assert_eq!(graph.producers_of(t(1)), &[op(0)]);
    assert_eq!(graph.consumers_of(t(1)), &[op(1)]);
    assert!(graph.consumers_of(t(2)).is_empty());
    assert_eq!(graph.src_tensors(op(1)), &[t(1)]);
    assert_eq!(graph.dst_tensors(op(1)), &[t(2)]);
    // unknown ids answer with empty slices rather than panicking
    assert!(graph.src_tensors(op(9)).is_empty());
    assert!(graph.producers_of(t(9)).is_empty());
    assert!(!graph.contains_operator(op(9)));
    assert!(!graph.contains_tensor(t(9)));
}

#[test]
fn topological_order_walks_root_to_tail() {
    let graph = chain(4);
    let order = graph.topological_order();
    let ops: Vec<OperatorId> = order.iter().map(|pack| pack.op).collect();
    assert_eq!(ops, vec![op(0), op(1), op(2), op(3)]);
    assert_eq!(
        order[0],
        OpPack {
            op: op(0),
            srcs: vec![t(0)],
            dsts: vec![t(1)],
        }
    );
}

#[test]
#[should_panic(expected = "does not extend the linear chain")]
fn committing_an_unprobed_rejectable_operator_panics() {
    let mut graph = chain(1);
    graph.add_operator_as_linear(op(1), &[t(5)], &[t(6)]);
}

#[test]
#[should_panic(expected = "already present")]
fn committing_a_reused_operator_id_panics() {
    let mut graph = DependencyGraph::new();
    graph.add_operator_as_linear(op(0), &[t(0)], &[t(1)]);
    graph.add_operator_as_linear(op(0), &[t(1)], &[t(2)]);
}
