//! Queue lifecycle: thread spawning, start/stop signalling and external
//! pushes.

use std::collections::BinaryHeap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicIsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use spapq_ring::{Consumer, Producer, RingBuffer};

use crate::barrier::SpinBarrier;
use crate::network::QNetwork;
use crate::schedule;
use crate::traits::{BasicQueue, ProcessHook};
use crate::worker::{self, OutChannel, WorkerCore};

/// Global task census on its own cache line.
///
/// Signed: the amortised decrement borrows ahead of credits a peer has not
/// published yet, so the count may dip below zero transiently. Only the
/// settled zero ends processing.
#[repr(align(64))]
pub(crate) struct Census(AtomicIsize);

impl Census {
    fn new() -> Self {
        Self(AtomicIsize::new(0))
    }

    #[inline]
    pub(crate) fn load(&self, order: Ordering) -> isize {
        self.0.load(order)
    }

    #[inline]
    pub(crate) fn store(&self, value: isize, order: Ordering) {
        self.0.store(value, order);
    }

    #[inline]
    pub(crate) fn fetch_add(&self, value: isize, order: Ordering) -> isize {
        self.0.fetch_add(value, order)
    }

    #[inline]
    pub(crate) fn fetch_sub(&self, value: isize, order: Ordering) -> isize {
        self.0.fetch_sub(value, order)
    }

    #[inline]
    fn compare_exchange_weak(
        &self,
        current: isize,
        new: isize,
        success: Ordering,
        failure: Ordering,
    ) -> Result<isize, isize> {
        self.0.compare_exchange_weak(current, new, success, failure)
    }
}

/// Census and signalling state shared between the queue handle and its
/// workers.
pub(crate) struct QueueShared<T> {
    pub(crate) global_count: Census,
    /// Guards against a second `init_queue` while a cycle is live.
    active: AtomicBool,
    /// Raised once by `process_queue`; workers hold at it after allocation.
    pub(crate) start: AtomicBool,
    /// Cooperative stop token.
    pub(crate) stop: AtomicBool,
    /// Allocation barrier: all workers plus the initialising thread.
    pub(crate) ready: SpinBarrier,
    /// Teardown barrier: workers only.
    pub(crate) teardown: SpinBarrier,
    /// Tasks seeded before the start flag, drained by each worker.
    pub(crate) seeds: Vec<Mutex<Vec<T>>>,
}

/// Sparse parallel approximate priority queue.
///
/// `T` is the task type (cheaply copyable), `Q` the local priority queue of
/// each worker (maximum-first; [`BinaryHeap`] by default).
///
/// One processing cycle is `init_queue` → `push_before_processing`* →
/// `process_queue` → `wait_process_finish`; the queue is reusable
/// afterwards. Construction asserts the network contract: a valid, strongly
/// connected topology with pairwise distinct logical cores.
///
/// # Example
///
/// ```no_run
/// use spapq::{graphs, Outbox, ProcessHook, SpapQueue};
///
/// struct Countdown;
///
/// impl ProcessHook<u64> for Countdown {
///     fn process_element(&mut self, task: u64, out: &mut dyn Outbox<u64>) {
///         if task > 0 {
///             out.enqueue_global(task - 1);
///         }
///     }
/// }
///
/// let mut queue = SpapQueue::<u64>::new(graphs::fully_connected(2));
/// assert!(queue.init_queue(|_worker| Countdown));
/// queue.push_before_processing(1_000, 0);
/// queue.process_queue();
/// queue.wait_process_finish();
/// ```
pub struct SpapQueue<T, Q = BinaryHeap<T>>
where
    T: Copy + Send + 'static,
{
    network: QNetwork,
    shared: Arc<QueueShared<T>>,
    handles: Vec<JoinHandle<()>>,
    /// Producer ends of the self-push channels; free for external feeding
    /// because their owners bypass the ring on the send path.
    loop_inlets: Vec<Option<Producer<T>>>,
    _queue: PhantomData<fn() -> Q>,
}

impl<T, Q> SpapQueue<T, Q>
where
    T: Copy + Send + 'static,
{
    /// Build a queue over `network`.
    ///
    /// # Panics
    ///
    /// Panics when the network is invalid, not strongly connected, or pins
    /// two workers to the same logical core. A broken topology cannot be
    /// limped around at runtime.
    #[must_use]
    pub fn new(network: QNetwork) -> Self {
        if let Err(error) = network.validate() {
            panic!("invalid dispatch network: {error}");
        }
        assert!(
            network.is_strongly_connected(),
            "dispatch network must be strongly connected"
        );
        assert!(
            network.has_separate_logical_cores(),
            "workers must pin to pairwise distinct logical cores"
        );

        let workers = network.num_workers();
        let shared = Arc::new(QueueShared {
            global_count: Census::new(),
            active: AtomicBool::new(false),
            start: AtomicBool::new(false),
            stop: AtomicBool::new(false),
            ready: SpinBarrier::new(workers + 1),
            teardown: SpinBarrier::new(workers),
            seeds: (0..workers).map(|_| Mutex::new(Vec::new())).collect(),
        });

        Self {
            loop_inlets: (0..network.num_channels()).map(|_| None).collect(),
            shared,
            handles: Vec::new(),
            network,
            _queue: PhantomData,
        }
    }

    /// The topology this queue runs on.
    #[must_use]
    pub fn network(&self) -> &QNetwork {
        &self.network
    }

    /// Seed `value` onto `worker_id`'s local queue before processing
    /// starts.
    ///
    /// Valid between `init_queue` and `process_queue`. One seeding thread
    /// per worker; seeds are handed over through the start-flag release.
    pub fn push_before_processing(&self, value: T, worker_id: usize) {
        debug_assert!(
            self.shared.active.load(Ordering::Acquire) && !self.shared.start.load(Ordering::Acquire),
            "seeding is only valid between init_queue and process_queue"
        );
        self.shared.seeds[worker_id].lock().unwrap().push(value);
        self.shared.global_count.fetch_add(1, Ordering::Release);
    }

    /// Raise the start flag; every worker begins processing.
    pub fn process_queue(&self) {
        self.shared.start.store(true, Ordering::Release);
    }

    /// Feed `value` into self-push `channel`'s ring while processing runs.
    ///
    /// The census is raised only while it is still positive, so a task can
    /// never resurrect a finished cycle; a full ring rolls the census back.
    /// Returns `false` in both cases — the caller decides whether to retry.
    ///
    /// # Panics
    ///
    /// Panics when `channel` is not a self-push channel (its ring would
    /// have a second producer) or the queue was never initialised.
    pub fn push_during_processing(&mut self, channel: usize, value: T) -> bool {
        assert!(
            self.network.is_self_push(channel),
            "only self-push channels accept external tasks"
        );
        let inlet = self.loop_inlets[channel]
            .as_ref()
            .expect("queue not initialised");

        let mut count = self.shared.global_count.load(Ordering::Acquire);
        loop {
            if count <= 0 {
                return false;
            }
            match self.shared.global_count.compare_exchange_weak(
                count,
                count + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(observed) => count = observed,
            }
        }

        if inlet.push(value) {
            true
        } else {
            self.shared.global_count.fetch_sub(1, Ordering::Release);
            false
        }
    }

    /// Set the stop token on every worker and raise the start flag, so a
    /// worker still parked before processing observes the stop. Idempotent.
    pub fn request_stop(&self) {
        tracing::debug!("stop requested");
        self.shared.stop.store(true, Ordering::Release);
        self.process_queue();
    }

    /// Join every worker, then reset the queue for the next cycle.
    ///
    /// # Panics
    ///
    /// Panics when a worker thread panicked — hooks are required not to.
    pub fn wait_process_finish(&mut self) {
        for handle in self.handles.drain(..) {
            handle.join().expect("worker thread panicked");
        }
        self.shared.start.store(false, Ordering::Release);
        self.shared.global_count.store(0, Ordering::Release);
        self.shared.active.store(false, Ordering::Release);
        tracing::debug!("processing cycle finished");
    }
}

impl<T, Q> SpapQueue<T, Q>
where
    T: Copy + Send + 'static,
    Q: BasicQueue<T> + Default + 'static,
{
    /// Spawn one pinned worker thread per network worker and wire up the
    /// channel rings. Returns after every worker has built its state and
    /// crossed the allocation barrier.
    ///
    /// `make_hook` is called once per worker id to build that worker's
    /// processing hook.
    ///
    /// Returns `false` when a cycle is already active.
    pub fn init_queue<H, F>(&mut self, mut make_hook: F) -> bool
    where
        H: ProcessHook<T> + 'static,
        F: FnMut(usize) -> H,
    {
        if self.shared.active.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.shared.stop.store(false, Ordering::Release);
        self.shared.start.store(false, Ordering::Release);
        self.shared.global_count.store(0, Ordering::Release);

        let network = &self.network;
        let workers = network.num_workers();
        tracing::debug!(
            workers,
            channels = network.num_channels(),
            "initialising queue"
        );

        // One ring per channel. The consumer end goes to the target's port
        // slot; the producer end to the source worker — except self-push
        // channels, whose producer end stays here for external feeding.
        let mut ports: Vec<Vec<Option<Consumer<T>>>> = (0..workers)
            .map(|worker| (0..network.port_count(worker)).map(|_| None).collect())
            .collect();
        let mut links: Vec<Vec<OutChannel<T>>> = (0..workers).map(|_| Vec::new()).collect();
        for inlet in &mut self.loop_inlets {
            *inlet = None;
        }

        for worker in 0..workers {
            for channel in network.out_channels(worker) {
                let (tx, rx) = RingBuffer::new(network.channel_buffer_size()).split();
                let target = network.resolved_target(worker, channel);
                let port = network.target_port(channel);
                debug_assert!(ports[target][port].is_none());
                ports[target][port] = Some(rx);

                let link = if network.is_self_push(channel) {
                    self.loop_inlets[channel] = Some(tx);
                    None
                } else {
                    Some(tx)
                };
                links[worker].push(OutChannel {
                    batch_size: network.batch_size(channel),
                    link,
                });
            }
        }

        let max_len = schedule::max_schedule_len(network);
        let max_batch = network.max_batch_size();

        let mut handles = Vec::with_capacity(workers);
        for (worker, (out_channels, in_ports)) in links.into_iter().zip(ports).enumerate() {
            let table = schedule::extend_table(&schedule::worker_schedule(network, worker), max_len);
            let core = WorkerCore::new(
                worker,
                Q::default(),
                max_batch,
                table,
                network.out_channels(worker).start,
                out_channels,
                in_ports
                    .into_iter()
                    .map(|port| port.expect("every input port is bound to a channel"))
                    .collect(),
                network.enqueue_frequency(),
                network.max_push_attempts(),
                Arc::clone(&self.shared),
            );
            let hook = make_hook(worker);
            let logical_core = network.logical_core(worker);
            let handle = std::thread::Builder::new()
                .name(format!("spapq-worker-{worker}"))
                .spawn(move || worker::worker_main(core, hook, logical_core))
                .expect("failed to spawn worker thread");
            handles.push(handle);
        }
        self.handles = handles;

        self.shared.ready.wait();
        true
    }
}

impl<T, Q> Drop for SpapQueue<T, Q>
where
    T: Copy + Send + 'static,
{
    fn drop(&mut self) {
        // block any further start, stop whoever is running, join quietly
        self.shared.active.store(true, Ordering::Release);
        self.request_stop();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}
