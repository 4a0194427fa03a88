//! The static dispatch topology: workers, channels, ports and batching
//! parameters.
//!
//! A [`QNetwork`] is an immutable description consumed by the runtime at
//! initialisation. The channel graph is stored in compressed sparse row
//! form: `vertex_pointer[w]..vertex_pointer[w + 1]` indexes the outgoing
//! channels of worker `w` inside `edge_targets`.
//!
//! A channel whose literal target equals its source is a *self-push*
//! channel; construction rewrites its target to the sentinel value
//! `num_workers`, so the hot send path branches on one equality instead of
//! comparing against the sender's own id.

use std::fmt;

use crate::error::NetworkError;

/// Immutable description of the worker/channel topology and its batching
/// parameters.
///
/// Built via [`QNetwork::builder`]; every knob left unset gets the default
/// documented on its builder method. Construction is total — a nonsensical
/// topology still builds, and [`validate`](QNetwork::validate) names the
/// rule it breaks. The runtime asserts validity before spawning anything.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QNetwork {
    vertex_pointer: Vec<usize>,
    edge_targets: Vec<usize>,
    multiplicities: Vec<usize>,
    batch_sizes: Vec<usize>,
    target_ports: Vec<usize>,
    num_ports: Vec<usize>,
    logical_cores: Vec<usize>,
    enqueue_frequency: usize,
    channel_buffer_size: usize,
    max_push_attempts: usize,
}

/// Configures and builds a [`QNetwork`].
pub struct QNetworkBuilder {
    vertex_pointer: Vec<usize>,
    edge_targets: Vec<usize>,
    multiplicities: Option<Vec<usize>>,
    batch_sizes: Option<Vec<usize>>,
    logical_cores: Option<Vec<usize>>,
    enqueue_frequency: Option<usize>,
    channel_buffer_size: Option<usize>,
    max_push_attempts: Option<usize>,
}

impl QNetworkBuilder {
    /// Per-channel multiplicities; the task-volume bias of the dispatch
    /// schedule. Default 1 everywhere.
    #[must_use]
    pub fn multiplicities(mut self, multiplicities: Vec<usize>) -> Self {
        assert_eq!(multiplicities.len(), self.edge_targets.len());
        self.multiplicities = Some(multiplicities);
        self
    }

    /// Per-channel batch sizes; tasks packed into one ring push. Default 1
    /// everywhere.
    #[must_use]
    pub fn batch_sizes(mut self, batch_sizes: Vec<usize>) -> Self {
        assert_eq!(batch_sizes.len(), self.edge_targets.len());
        self.batch_sizes = Some(batch_sizes);
        self
    }

    /// Logical core each worker pins to. Default: worker `w` on core `w`.
    #[must_use]
    pub fn logical_cores(mut self, logical_cores: Vec<usize>) -> Self {
        assert_eq!(logical_cores.len() + 1, self.vertex_pointer.len());
        self.logical_cores = Some(logical_cores);
        self
    }

    /// Tasks processed between input-port drains. Default:
    /// `max(16, 2 * next_power_of_two(ceil(channels / workers)))`.
    #[must_use]
    pub fn enqueue_frequency(mut self, enqueue_frequency: usize) -> Self {
        self.enqueue_frequency = Some(enqueue_frequency);
        self
    }

    /// Capacity of every channel ring. Default:
    /// `max(8 * max_batch_size, 4 * enqueue_frequency)`.
    #[must_use]
    pub fn channel_buffer_size(mut self, channel_buffer_size: usize) -> Self {
        self.channel_buffer_size = Some(channel_buffer_size);
        self
    }

    /// Failed ring pushes tolerated before a worker falls back to pushing
    /// its out-buffer onto itself. Default 4.
    #[must_use]
    pub fn max_push_attempts(mut self, max_push_attempts: usize) -> Self {
        self.max_push_attempts = Some(max_push_attempts);
        self
    }

    /// Finish construction: fill defaults, assign input ports and relabel
    /// self-loops.
    #[must_use]
    pub fn build(self) -> QNetwork {
        let workers = self.vertex_pointer.len() - 1;
        let channels = self.edge_targets.len();

        let multiplicities = self.multiplicities.unwrap_or_else(|| vec![1; channels]);
        let batch_sizes = self.batch_sizes.unwrap_or_else(|| vec![1; channels]);
        let logical_cores = self
            .logical_cores
            .unwrap_or_else(|| (0..workers).collect());
        let enqueue_frequency = self
            .enqueue_frequency
            .unwrap_or_else(|| default_enqueue_frequency(workers, channels));
        let max_batch = batch_sizes.iter().copied().max().unwrap_or(0);
        let channel_buffer_size = self
            .channel_buffer_size
            .unwrap_or_else(|| (8 * max_batch).max(4 * enqueue_frequency));
        let max_push_attempts = self.max_push_attempts.unwrap_or(4);

        let mut network = QNetwork {
            vertex_pointer: self.vertex_pointer,
            edge_targets: self.edge_targets,
            multiplicities,
            batch_sizes,
            target_ports: vec![0; channels],
            num_ports: vec![0; workers],
            logical_cores,
            enqueue_frequency,
            channel_buffer_size,
            max_push_attempts,
        };
        network.assign_target_ports();
        network.relabel_self_push();
        network
    }
}

/// Smallest power of two at least `ceil(channels / workers)`, doubled and
/// floored at 16.
fn default_enqueue_frequency(workers: usize, channels: usize) -> usize {
    let workers = workers.max(1);
    let average_out_degree = channels.div_ceil(workers);
    let mut pow2 = 1usize;
    while pow2 < average_out_degree {
        pow2 <<= 1;
    }
    (pow2 * 2).max(16)
}

impl QNetwork {
    /// Start building a network from its CSR channel graph.
    ///
    /// `vertex_pointer` must have one more entry than there are workers,
    /// start at 0, be non-decreasing and end at `edge_targets.len()`.
    /// A target equal to its source worker — or to the worker count — marks
    /// a self-push channel.
    ///
    /// # Panics
    ///
    /// Panics when the CSR arrays are not shaped as above; every semantic
    /// rule beyond shape is deferred to [`validate`](QNetwork::validate).
    #[must_use]
    pub fn builder(vertex_pointer: Vec<usize>, edge_targets: Vec<usize>) -> QNetworkBuilder {
        assert!(
            !vertex_pointer.is_empty(),
            "vertex pointer needs a leading zero entry"
        );
        assert_eq!(vertex_pointer[0], 0, "vertex pointer must start at zero");
        assert!(
            vertex_pointer.windows(2).all(|pair| pair[0] <= pair[1]),
            "vertex pointer must be non-decreasing"
        );
        assert_eq!(
            *vertex_pointer.last().unwrap(),
            edge_targets.len(),
            "vertex pointer must end at the channel count"
        );

        QNetworkBuilder {
            vertex_pointer,
            edge_targets,
            multiplicities: None,
            batch_sizes: None,
            logical_cores: None,
            enqueue_frequency: None,
            channel_buffer_size: None,
            max_push_attempts: None,
        }
    }

    /// Count each target's incoming channels in CSR order; a self-push
    /// channel occupies a port of its *source* worker.
    ///
    /// Channels with an out-of-range target get no port — construction is
    /// total, and `validate` reports them.
    fn assign_target_ports(&mut self) {
        self.num_ports.iter_mut().for_each(|ports| *ports = 0);
        for worker in 0..self.num_workers() {
            for channel in self.out_channels(worker) {
                let target = match self.edge_targets[channel] {
                    sentinel if sentinel == self.num_workers() => worker,
                    target if target < self.num_workers() => target,
                    _ => continue,
                };
                self.target_ports[channel] = self.num_ports[target];
                self.num_ports[target] += 1;
            }
        }
    }

    /// Rewrite every literal self-target to the sentinel `num_workers`.
    fn relabel_self_push(&mut self) {
        for worker in 0..self.num_workers() {
            for channel in self.out_channels(worker) {
                if self.edge_targets[channel] == worker {
                    self.edge_targets[channel] = self.num_workers();
                }
            }
        }
    }

    // ── dimensions and lookups ───────────────────────────────────────

    /// Number of workers.
    #[inline]
    #[must_use]
    pub fn num_workers(&self) -> usize {
        self.vertex_pointer.len() - 1
    }

    /// Number of channels.
    #[inline]
    #[must_use]
    pub fn num_channels(&self) -> usize {
        self.edge_targets.len()
    }

    /// Channel index range of `worker`'s outgoing channels.
    #[inline]
    #[must_use]
    pub fn out_channels(&self, worker: usize) -> std::ops::Range<usize> {
        self.vertex_pointer[worker]..self.vertex_pointer[worker + 1]
    }

    /// Raw target label of `channel`; `num_workers` denotes self-push.
    #[inline]
    #[must_use]
    pub fn target(&self, channel: usize) -> usize {
        self.edge_targets[channel]
    }

    /// True when `channel` pushes back onto its own worker.
    #[inline]
    #[must_use]
    pub fn is_self_push(&self, channel: usize) -> bool {
        self.edge_targets[channel] == self.num_workers()
    }

    /// Target of `channel` with the self-push sentinel resolved back to the
    /// sending `worker`.
    #[inline]
    #[must_use]
    pub fn resolved_target(&self, worker: usize, channel: usize) -> usize {
        if self.edge_targets[channel] == self.num_workers() {
            worker
        } else {
            self.edge_targets[channel]
        }
    }

    /// Input-port index `channel` is bound to on its target.
    #[inline]
    #[must_use]
    pub fn target_port(&self, channel: usize) -> usize {
        self.target_ports[channel]
    }

    /// Number of input ports of `worker`.
    #[inline]
    #[must_use]
    pub fn port_count(&self, worker: usize) -> usize {
        self.num_ports[worker]
    }

    /// Multiplicity of `channel`.
    #[inline]
    #[must_use]
    pub fn multiplicity(&self, channel: usize) -> usize {
        self.multiplicities[channel]
    }

    /// Batch size of `channel`.
    #[inline]
    #[must_use]
    pub fn batch_size(&self, channel: usize) -> usize {
        self.batch_sizes[channel]
    }

    /// Logical core `worker` pins to.
    #[inline]
    #[must_use]
    pub fn logical_core(&self, worker: usize) -> usize {
        self.logical_cores[worker]
    }

    /// Tasks processed between input-port drains.
    #[inline]
    #[must_use]
    pub fn enqueue_frequency(&self) -> usize {
        self.enqueue_frequency
    }

    /// Capacity of every channel ring.
    #[inline]
    #[must_use]
    pub fn channel_buffer_size(&self) -> usize {
        self.channel_buffer_size
    }

    /// Failed pushes tolerated before the self-push fallback.
    #[inline]
    #[must_use]
    pub fn max_push_attempts(&self) -> usize {
        self.max_push_attempts
    }

    /// Largest batch size over all channels.
    #[must_use]
    pub fn max_batch_size(&self) -> usize {
        self.batch_sizes.iter().copied().max().unwrap_or(0)
    }

    /// Largest input-port count over all workers.
    #[must_use]
    pub fn max_port_count(&self) -> usize {
        self.num_ports.iter().copied().max().unwrap_or(0)
    }

    // ── predicates ───────────────────────────────────────────────────

    /// Check every rule of the network contract, naming the first one that
    /// fails.
    pub fn validate(&self) -> Result<(), NetworkError> {
        let workers = self.num_workers();
        let channels = self.num_channels();
        if workers == 0 {
            return Err(NetworkError::NoWorkers);
        }
        if channels == 0 {
            return Err(NetworkError::NoChannels);
        }
        if self.vertex_pointer.first() != Some(&0)
            || self.vertex_pointer.last() != Some(&channels)
            || self.vertex_pointer.windows(2).any(|pair| pair[0] > pair[1])
            || self.multiplicities.len() != channels
            || self.batch_sizes.len() != channels
            || self.target_ports.len() != channels
            || self.num_ports.len() != workers
            || self.logical_cores.len() != workers
        {
            return Err(NetworkError::MalformedLayout);
        }

        for (channel, &target) in self.edge_targets.iter().enumerate() {
            if target > workers {
                return Err(NetworkError::TargetOutOfRange {
                    channel,
                    target,
                    workers,
                });
            }
        }
        for (channel, &multiplicity) in self.multiplicities.iter().enumerate() {
            if multiplicity == 0 {
                return Err(NetworkError::ZeroMultiplicity { channel });
            }
        }
        for (channel, &batch) in self.batch_sizes.iter().enumerate() {
            if batch == 0 {
                return Err(NetworkError::ZeroBatchSize { channel });
            }
        }
        for (worker, &ports) in self.num_ports.iter().enumerate() {
            if ports == 0 {
                return Err(NetworkError::NoInputPort { worker });
            }
        }
        for worker in 0..workers {
            if self.out_channels(worker).is_empty() {
                return Err(NetworkError::NoOutgoingChannel { worker });
            }
        }

        for worker in 0..workers {
            for channel in self.out_channels(worker) {
                let target = self.resolved_target(worker, channel);
                if self.target_ports[channel] >= self.num_ports[target] {
                    return Err(NetworkError::PortOutOfRange {
                        channel,
                        port: self.target_ports[channel],
                        worker: target,
                        ports: self.num_ports[target],
                    });
                }
            }
        }

        // every input port of every worker carries exactly one channel
        for worker in 0..workers {
            let mut occupied = vec![false; self.num_ports[worker]];
            for source in 0..workers {
                for channel in self.out_channels(source) {
                    if self.resolved_target(source, channel) != worker {
                        continue;
                    }
                    let port = self.target_ports[channel];
                    if occupied[port] {
                        return Err(NetworkError::PortCollision { worker, port });
                    }
                    occupied[port] = true;
                }
            }
        }

        if self.channel_buffer_size < self.max_batch_size() {
            return Err(NetworkError::BufferSmallerThanBatch {
                buffer_size: self.channel_buffer_size,
                max_batch: self.max_batch_size(),
            });
        }
        if self.max_push_attempts == 0 {
            return Err(NetworkError::ZeroPushAttempts);
        }
        if self.enqueue_frequency == 0 {
            return Err(NetworkError::ZeroEnqueueFrequency);
        }

        Ok(())
    }

    /// True when [`validate`](QNetwork::validate) holds.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// True when work emitted by `worker` can reach every worker, following
    /// channels transitively. Self-push channels reach their own worker.
    #[must_use]
    pub fn has_path_to_all_workers(&self, worker: usize) -> bool {
        assert!(worker < self.num_workers());

        let mut reachable = vec![false; self.num_workers()];
        for channel in self.out_channels(worker) {
            reachable[self.resolved_target(worker, channel)] = true;
        }

        let mut changed = true;
        while changed {
            changed = false;
            for source in 0..self.num_workers() {
                if !reachable[source] {
                    continue;
                }
                for channel in self.out_channels(source) {
                    let target = self.resolved_target(source, channel);
                    if !reachable[target] {
                        reachable[target] = true;
                        changed = true;
                    }
                }
            }
        }

        reachable.into_iter().all(|seen| seen)
    }

    /// True when every worker can reach every worker.
    #[must_use]
    pub fn is_strongly_connected(&self) -> bool {
        (0..self.num_workers()).all(|worker| self.has_path_to_all_workers(worker))
    }

    /// True when all workers have the same input-port count.
    #[must_use]
    pub fn has_homogeneous_in_ports(&self) -> bool {
        self.num_ports.windows(2).all(|pair| pair[0] == pair[1])
    }

    /// True when all workers have the same outgoing-channel count.
    #[must_use]
    pub fn has_homogeneous_out_ports(&self) -> bool {
        if self.num_workers() <= 1 {
            return true;
        }
        let first = self.vertex_pointer[1] - self.vertex_pointer[0];
        (1..self.num_workers())
            .all(|worker| self.vertex_pointer[worker + 1] - self.vertex_pointer[worker] == first)
    }

    /// True when both port counts are homogeneous.
    #[must_use]
    pub fn has_homogeneous_ports(&self) -> bool {
        self.has_homogeneous_in_ports() && self.has_homogeneous_out_ports()
    }

    /// True when all channels share one batch size.
    #[must_use]
    pub fn has_homogeneous_batch_sizes(&self) -> bool {
        self.batch_sizes.windows(2).all(|pair| pair[0] == pair[1])
    }

    /// True when all channels share one multiplicity.
    #[must_use]
    pub fn has_homogeneous_multiplicities(&self) -> bool {
        self.multiplicities.windows(2).all(|pair| pair[0] == pair[1])
    }

    /// True when no two workers pin to the same logical core.
    #[must_use]
    pub fn has_separate_logical_cores(&self) -> bool {
        let mut cores = self.logical_cores.clone();
        cores.sort_unstable();
        cores.windows(2).all(|pair| pair[0] != pair[1])
    }
}

impl fmt::Display for QNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "QNetwork:")?;
        writeln!(f, " #Workers : {}", self.num_workers())?;
        writeln!(f, " #Channels: {}", self.num_channels())?;
        writeln!(f, " EnQFreq  : {}", self.enqueue_frequency)?;
        writeln!(f, " ChanlSize: {}", self.channel_buffer_size)?;
        writeln!(f, " MaxAttmps: {}", self.max_push_attempts)?;
        writeln!(f)?;
        writeln!(f, " Linking:")?;
        for worker in 0..self.num_workers() {
            writeln!(f, "  Worker: {worker}")?;
            writeln!(f, "  Core  : {}", self.logical_cores[worker])?;

            let row = |values: Vec<usize>| {
                values
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            let targets = self
                .out_channels(worker)
                .map(|channel| self.resolved_target(worker, channel))
                .collect();
            writeln!(f, "  Target: {}", row(targets))?;
            let multiplicities = self
                .out_channels(worker)
                .map(|channel| self.multiplicities[channel])
                .collect();
            writeln!(f, "  Multip: {}", row(multiplicities))?;
            let batches = self
                .out_channels(worker)
                .map(|channel| self.batch_sizes[channel])
                .collect();
            writeln!(f, "  Batchs: {}", row(batches))?;
            writeln!(f)?;
        }
        Ok(())
    }
}
