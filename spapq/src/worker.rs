//! Per-worker runtime state and the processing main loop.
//!
//! Each worker thread owns a [`WorkerCore`]: its local priority queue, a
//! small out-buffer of produced tasks, the cyclic dispatch schedule, the
//! consumer ends of its input ports and the producer ends of its outgoing
//! channels. Nothing here is shared; peers communicate exclusively through
//! the rings.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use spapq_ring::{Consumer, Producer};

use crate::queue::QueueShared;
use crate::schedule::SKIP;
use crate::traits::{BasicQueue, Outbox, ProcessHook};

/// Tasks processed between cooperative stop-token checks in the inner loop.
const STOP_CHECK_INTERVAL: usize = 128;

/// One outgoing channel as seen by its source worker.
pub(crate) struct OutChannel<T> {
    pub(crate) batch_size: usize,
    /// `None` marks the self-push channel; its batches move straight into
    /// the local queue.
    pub(crate) link: Option<Producer<T>>,
}

/// The per-worker runtime state.
pub(crate) struct WorkerCore<T, Q> {
    pub(crate) worker_id: usize,
    pub(crate) queue: Q,
    out_buffer: Vec<T>,
    /// Dispatch table over global channel indices, padded with [`SKIP`] to
    /// the network-wide maximum length.
    schedule: Vec<usize>,
    schedule_pos: usize,
    /// First global channel index owned by this worker.
    channel_base: usize,
    out_channels: Vec<OutChannel<T>>,
    in_ports: Vec<Consumer<T>>,
    enqueue_frequency: usize,
    max_push_attempts: usize,
    /// Census credits not yet reflected in the shared global count.
    local_count: usize,
    pub(crate) shared: Arc<QueueShared<T>>,
}

impl<T, Q> WorkerCore<T, Q>
where
    T: Copy + Send,
    Q: BasicQueue<T>,
{
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        worker_id: usize,
        queue: Q,
        max_batch_size: usize,
        schedule: Vec<usize>,
        channel_base: usize,
        out_channels: Vec<OutChannel<T>>,
        in_ports: Vec<Consumer<T>>,
        enqueue_frequency: usize,
        max_push_attempts: usize,
        shared: Arc<QueueShared<T>>,
    ) -> Self {
        debug_assert!(matches!(schedule.first(), Some(&entry) if entry != SKIP));
        Self {
            worker_id,
            queue,
            out_buffer: Vec::with_capacity(max_batch_size),
            schedule,
            schedule_pos: 0,
            channel_base,
            out_channels,
            in_ports,
            enqueue_frequency,
            max_push_attempts,
            local_count: 0,
            shared,
        }
    }

    /// Drain every input port into the local queue.
    fn enqueue_in_channels(&mut self) {
        for port in &self.in_ports {
            while let Some(task) = port.pop() {
                self.queue.push(task);
            }
        }
    }

    /// Move the last `batch` buffered tasks into the local queue.
    fn self_push_batch(&mut self, batch: usize) {
        let start = self.out_buffer.len() - batch;
        for task in self.out_buffer.drain(start..) {
            self.queue.push(task);
        }
    }

    /// Move the whole out-buffer into the local queue, so no produced task
    /// can be stranded on this worker.
    fn flush_out_buffer(&mut self) {
        for task in self.out_buffer.drain(..) {
            self.queue.push(task);
        }
    }

    /// Advance the dispatch cursor cyclically, skipping padding entries.
    fn advance_schedule(&mut self) {
        loop {
            self.schedule_pos += 1;
            if self.schedule_pos == self.schedule.len() {
                self.schedule_pos = 0;
            }
            if self.schedule[self.schedule_pos] != SKIP {
                break;
            }
        }
    }

    /// Charge one produced task to the census, amortised through the local
    /// credit.
    fn incr_global_count(&mut self) {
        self.local_count += 1;
        let backlog = self.queue.len();
        if self.local_count >= backlog {
            let keep = backlog / 2;
            self.shared
                .global_count
                .fetch_add((self.local_count - keep) as isize, Ordering::Relaxed);
            self.local_count = keep;
        }
    }

    /// Settle one processed task against the census, borrowing ahead when
    /// no local credit is left.
    fn decr_global_count(&mut self) {
        if self.local_count == 0 {
            let keep = self.queue.len() / 2;
            self.local_count = keep;
            self.shared
                .global_count
                .fetch_sub(keep as isize + 1, Ordering::Relaxed);
        } else {
            self.local_count -= 1;
        }
    }

    /// Publish all outstanding credits. Workers must observe a zero census
    /// only after every peer has published.
    fn publish_local_count(&mut self) {
        if self.local_count > 0 {
            self.shared
                .global_count
                .fetch_add(self.local_count as isize, Ordering::Release);
            self.local_count = 0;
        }
    }
}

impl<T, Q> Outbox<T> for WorkerCore<T, Q>
where
    T: Copy + Send,
    Q: BasicQueue<T>,
{
    fn enqueue_global(&mut self, task: T) {
        self.incr_global_count();
        debug_assert!(self.out_buffer.len() < self.out_buffer.capacity());
        self.out_buffer.push(task);

        let mut attempts = self.max_push_attempts;
        while attempts > 0 {
            let channel = self.schedule[self.schedule_pos];
            let local = channel - self.channel_base;
            let batch = self.out_channels[local].batch_size;
            if self.out_buffer.len() < batch {
                return;
            }

            match &self.out_channels[local].link {
                None => self.self_push_batch(batch),
                Some(link) => {
                    let start = self.out_buffer.len() - batch;
                    if link.push_slice(&self.out_buffer[start..]) {
                        self.out_buffer.truncate(start);
                    } else {
                        attempts -= 1;
                    }
                }
            }
            self.advance_schedule();
        }

        // every attempt failed: fall back to ourselves rather than stall
        self.flush_out_buffer();
    }
}

/// A worker: its runtime core plus the caller's processing hook.
pub(crate) struct Worker<T, Q, H> {
    core: WorkerCore<T, Q>,
    hook: H,
}

impl<T, Q, H> Worker<T, Q, H>
where
    T: Copy + Send,
    Q: BasicQueue<T>,
    H: ProcessHook<T>,
{
    /// Process until the global census reaches zero or a stop is requested.
    fn run(&mut self) {
        let core = &mut self.core;
        let mut processed: usize = 0;

        while core.shared.global_count.load(Ordering::Acquire) > 0
            && !core.shared.stop.load(Ordering::Relaxed)
        {
            while !core.queue.is_empty() {
                if processed % STOP_CHECK_INTERVAL == 0 && core.shared.stop.load(Ordering::Relaxed)
                {
                    break;
                }
                if processed % core.enqueue_frequency == 0 {
                    core.enqueue_in_channels();
                }
                let Some(task) = core.queue.pop() else { break };
                self.hook.process_element(task, &mut *core);
                core.decr_global_count();
                processed = processed.wrapping_add(1);
            }
            core.enqueue_in_channels();
            core.flush_out_buffer();
            core.publish_local_count();
        }
    }
}

/// Thread body of one worker: pin, register at the allocation barrier, wait
/// for the start flag, seed the local queue, run, then rendezvous for
/// teardown.
pub(crate) fn worker_main<T, Q, H>(core: WorkerCore<T, Q>, hook: H, logical_core: usize)
where
    T: Copy + Send,
    Q: BasicQueue<T>,
    H: ProcessHook<T>,
{
    let shared = Arc::clone(&core.shared);
    let worker_id = core.worker_id;

    if !core_affinity::set_for_current(core_affinity::CoreId { id: logical_core }) {
        // the performance contract is void without pinning; do not limp on
        tracing::error!(worker_id, logical_core, "failed to pin worker thread");
        std::process::abort();
    }
    tracing::trace!(worker_id, logical_core, "worker pinned");

    let mut worker = Worker { core, hook };

    shared.ready.wait();
    wait_for_start(&shared);

    let seeds = std::mem::take(&mut *shared.seeds[worker_id].lock().unwrap());
    for task in seeds {
        worker.core.queue.push(task);
    }

    worker.run();

    shared.teardown.wait();
    tracing::trace!(worker_id, "worker finished");
}

fn wait_for_start<T>(shared: &QueueShared<T>) {
    let mut spins = 0u32;
    while !shared.start.load(Ordering::Acquire) {
        if spins < 64 {
            std::hint::spin_loop();
            spins += 1;
        } else {
            std::thread::yield_now();
        }
    }
}
