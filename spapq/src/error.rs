//! Network contract violations.

use snafu::Snafu;

/// A rule of the dispatch-network contract that failed to hold.
///
/// Returned by [`QNetwork::validate`](crate::QNetwork::validate). A valid
/// network is a hard precondition of the runtime; these variants exist so a
/// misconfigured topology names the rule it broke instead of failing as a
/// bare boolean.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum NetworkError {
    /// The network has no workers.
    #[snafu(display("network has no workers"))]
    NoWorkers,

    /// The network has no channels.
    #[snafu(display("network has no channels"))]
    NoChannels,

    /// The CSR arrays disagree on worker or channel counts.
    #[snafu(display("CSR arrays have inconsistent shapes"))]
    MalformedLayout,

    /// A channel names a target beyond the self-push sentinel.
    #[snafu(display(
        "channel {channel} targets worker {target}, but only {workers} workers exist"
    ))]
    TargetOutOfRange {
        /// Offending channel.
        channel: usize,
        /// Target label found on it.
        target: usize,
        /// Number of workers in the network.
        workers: usize,
    },

    /// A channel has multiplicity zero.
    #[snafu(display("channel {channel} has zero multiplicity"))]
    ZeroMultiplicity {
        /// Offending channel.
        channel: usize,
    },

    /// A channel has batch size zero.
    #[snafu(display("channel {channel} has zero batch size"))]
    ZeroBatchSize {
        /// Offending channel.
        channel: usize,
    },

    /// A worker has nowhere to send produced tasks.
    #[snafu(display("worker {worker} has no outgoing channel"))]
    NoOutgoingChannel {
        /// Offending worker.
        worker: usize,
    },

    /// A worker can never receive tasks.
    #[snafu(display("worker {worker} has no input port"))]
    NoInputPort {
        /// Offending worker.
        worker: usize,
    },

    /// A channel is bound to a port index its target does not have.
    #[snafu(display(
        "channel {channel} is bound to port {port} of worker {worker}, which has {ports} ports"
    ))]
    PortOutOfRange {
        /// Offending channel.
        channel: usize,
        /// Port it is bound to.
        port: usize,
        /// Worker owning the port.
        worker: usize,
        /// Ports that worker actually has.
        ports: usize,
    },

    /// Two channels claim the same input port.
    #[snafu(display("port {port} of worker {worker} is bound to more than one channel"))]
    PortCollision {
        /// Worker owning the port.
        worker: usize,
        /// Contested port index.
        port: usize,
    },

    /// Channel buffers cannot hold the largest batch.
    #[snafu(display(
        "channel buffers hold {buffer_size} tasks but the largest batch is {max_batch}"
    ))]
    BufferSmallerThanBatch {
        /// Configured channel capacity.
        buffer_size: usize,
        /// Largest batch size in the network.
        max_batch: usize,
    },

    /// The dispatch retry budget is zero.
    #[snafu(display("max push attempts must be at least one"))]
    ZeroPushAttempts,

    /// The input drain interval is zero.
    #[snafu(display("enqueue frequency must be at least one"))]
    ZeroEnqueueFrequency,
}
