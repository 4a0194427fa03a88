//! Example networks and the line-graph combinator.

use crate::network::QNetwork;

/// Fully connected network on `workers` workers: every worker owns one
/// channel to every worker, its own self-push channel first.
///
/// # Panics
///
/// Panics when `workers` is zero.
#[must_use]
pub fn fully_connected(workers: usize) -> QNetwork {
    assert!(workers > 0, "needs at least one worker");

    let vertex_pointer = (0..=workers).map(|worker| worker * workers).collect();
    let edge_targets = (0..workers * workers)
        .map(|channel| (channel + channel / workers) % workers)
        .collect();

    QNetwork::builder(vertex_pointer, edge_targets).build()
}

/// The Petersen graph as a 10-worker, 30-channel network.
#[must_use]
pub fn petersen() -> QNetwork {
    let vertex_pointer = vec![0, 3, 6, 9, 12, 15, 18, 21, 24, 27, 30];
    #[rustfmt::skip]
    let edge_targets = vec![
        1, 5, 4,
        2, 6, 0,
        3, 7, 1,
        4, 8, 2,
        0, 9, 3,
        6, 0, 9,
        7, 1, 5,
        8, 2, 6,
        9, 3, 7,
        5, 4, 8,
    ];
    QNetwork::builder(vertex_pointer, edge_targets).build()
}

/// Number of channels the line graph of `network` will have.
#[must_use]
pub fn line_graph_edge_count(network: &QNetwork) -> usize {
    (0..network.num_workers())
        .map(|worker| network.port_count(worker) * network.out_channels(worker).len())
        .sum()
}

/// Line-graph combinator: the derived network has one worker per channel of
/// `network`, and a channel `c1 -> c2` wherever `c2` leaves the worker that
/// `c1` targets (self-push channels target their own source).
///
/// Multiplicities multiply along the joint, batch sizes follow the first
/// channel, and the seed's runtime parameters carry over. Validity and
/// strong connectivity are properties of the seed, not guarantees of the
/// combinator — re-check them on the result.
#[must_use]
pub fn line_graph(network: &QNetwork) -> QNetwork {
    let mut vertex_pointer = Vec::with_capacity(network.num_channels() + 1);
    let mut edge_targets = Vec::new();
    let mut multiplicities = Vec::new();
    let mut batch_sizes = Vec::new();

    vertex_pointer.push(0);
    for worker in 0..network.num_workers() {
        for channel in network.out_channels(worker) {
            let joint = network.resolved_target(worker, channel);
            for target_channel in network.out_channels(joint) {
                edge_targets.push(target_channel);
                multiplicities
                    .push(network.multiplicity(channel) * network.multiplicity(target_channel));
                batch_sizes.push(network.batch_size(channel));
            }
            vertex_pointer.push(edge_targets.len());
        }
    }

    QNetwork::builder(vertex_pointer, edge_targets)
        .multiplicities(multiplicities)
        .batch_sizes(batch_sizes)
        .enqueue_frequency(network.enqueue_frequency())
        .channel_buffer_size(network.channel_buffer_size())
        .max_push_attempts(network.max_push_attempts())
        .build()
}
