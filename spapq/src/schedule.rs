//! Deadline-driven dispatch tables.
//!
//! A worker routes every batch of produced tasks along one of its outgoing
//! channels, cycling through a fixed table of channel indices. The table is
//! built so each channel receives its share of pushes with discrepancy
//! below one: for frequencies `f` summing to `T`, every prefix of length
//! `N` contains between `floor(f_s * N / T)` and `ceil(f_s * N / T)`
//! occurrences of symbol `s`. The classical earliest-deadline-first rule
//! achieves this.

use crate::network::QNetwork;

/// Sentinel padding entry in an extended dispatch table; the cursor skips
/// it.
pub const SKIP: usize = usize::MAX;

/// Greatest common divisor; `gcd(0, 0) == 0`.
#[must_use]
pub fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Least common multiple; zero when either side is zero.
#[must_use]
pub fn lcm(a: usize, b: usize) -> usize {
    if a == 0 || b == 0 {
        0
    } else {
        a / gcd(a, b) * b
    }
}

/// Divide all entries by their common GCD.
///
/// A zero GCD (empty or all-zero input) leaves the entries untouched —
/// valid networks never produce one, but the reduction must not divide by
/// it either.
#[must_use]
pub fn reduced(frequencies: &[usize]) -> Vec<usize> {
    let common = frequencies.iter().fold(0, |acc, &freq| gcd(acc, freq));
    if common == 0 {
        return frequencies.to_vec();
    }
    frequencies.iter().map(|&freq| freq / common).collect()
}

/// Earliest-deadline-first low-discrepancy table over positive
/// `frequencies`.
///
/// The result has length `T = sum(frequencies)` and contains symbol `s`
/// exactly `frequencies[s]` times; every prefix stays within one occurrence
/// of the ideal rate `frequencies[s] * N / T`.
///
/// # Panics
///
/// Panics on a zero frequency, or when `T` is large enough for the
/// deadline arithmetic `f * u` to overflow (the table length must fit in
/// half the native word).
#[must_use]
pub fn edf_table(frequencies: &[usize]) -> Vec<usize> {
    assert!(
        frequencies.iter().all(|&freq| freq > 0),
        "frequencies must be positive"
    );
    let table_len: usize = frequencies.iter().sum();
    assert!(
        table_len <= usize::MAX >> (usize::BITS / 2),
        "table length would overflow the deadline arithmetic"
    );
    if table_len == 0 {
        return Vec::new();
    }

    let mut table = Vec::with_capacity(table_len);
    let mut allocations = vec![0usize; frequencies.len()];

    for step in 0..table_len {
        // among the symbols due at this step, take the one whose next
        // occurrence has the earliest deadline
        let mut chosen: Option<(usize, usize)> = None;
        for (symbol, &freq) in frequencies.iter().enumerate() {
            if allocations[symbol] != step * freq / table_len {
                continue;
            }
            let deadline = earliest_deadline(freq, allocations[symbol] + 1, table_len);
            match chosen {
                Some((_, best)) if deadline > best => {}
                _ => chosen = Some((symbol, deadline)),
            }
        }

        let (symbol, _) = chosen.expect("a due symbol exists at every step");
        allocations[symbol] += 1;
        table.push(symbol);
    }

    table
}

/// Smallest `u` in `[0, 2 * table_len]` with
/// `floor(freq * u / table_len) >= target`, by binary search.
fn earliest_deadline(freq: usize, target: usize, table_len: usize) -> usize {
    let mut low = 0;
    let mut high = 2 * table_len;
    while low < high {
        let mid = low + (high - low) / 2;
        if freq * mid / table_len >= target {
            high = mid;
        } else {
            low = mid + 1;
        }
    }
    low
}

/// Normalised push frequencies of `worker`'s outgoing channels.
///
/// Over one schedule cycle, channel `c` carries
/// `multiplicity(c) * lcm(batch sizes)` tasks — multiplicity is a
/// task-volume ratio, so channels with larger batches are scheduled
/// proportionally less often. The result is GCD-reduced.
#[must_use]
pub fn channel_frequencies(network: &QNetwork, worker: usize) -> Vec<usize> {
    let batch_lcm = network
        .out_channels(worker)
        .fold(1, |acc, channel| lcm(acc, network.batch_size(channel)));

    let frequencies: Vec<usize> = network
        .out_channels(worker)
        .map(|channel| network.multiplicity(channel) * (batch_lcm / network.batch_size(channel)))
        .collect();

    reduced(&frequencies)
}

/// Length of `worker`'s dispatch table before extension.
#[must_use]
pub fn schedule_len(network: &QNetwork, worker: usize) -> usize {
    channel_frequencies(network, worker).iter().sum()
}

/// Largest dispatch-table length over all workers.
#[must_use]
pub fn max_schedule_len(network: &QNetwork) -> usize {
    (0..network.num_workers())
        .map(|worker| schedule_len(network, worker))
        .max()
        .unwrap_or(0)
}

/// `worker`'s dispatch table with symbols lifted to global channel indices.
#[must_use]
pub fn worker_schedule(network: &QNetwork, worker: usize) -> Vec<usize> {
    let mut table = edf_table(&channel_frequencies(network, worker));
    let base = network.out_channels(worker).start;
    for entry in &mut table {
        *entry += base;
    }
    table
}

/// Pad `table` with [`SKIP`] entries up to `len`, so all workers carry
/// uniformly sized schedules.
///
/// # Panics
///
/// Panics when `len` is shorter than the table.
#[must_use]
pub fn extend_table(table: &[usize], len: usize) -> Vec<usize> {
    assert!(len >= table.len(), "extension cannot shorten a table");
    let mut extended = table.to_vec();
    extended.resize(len, SKIP);
    extended
}
