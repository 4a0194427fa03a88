//! Reference processing hooks.
//!
//! These are the workloads the runtime was built for: recursive spawn
//! (Fibonacci expansion), label-correcting shortest paths and divisor
//! tallying. They double as the validation workloads of the test suite —
//! each terminates with a result that is independent of scheduling order,
//! so any loss, duplication or misrouting of tasks shows up as a wrong
//! answer.

mod divisor;
mod fibonacci;
mod sssp;

pub use divisor::DivisorHook;
pub use fibonacci::FibonacciHook;
pub use sssp::{CsrGraph, SsspHook, SsspTask};

pub use divisor::expected_tallies as expected_divisor_tallies;
pub use fibonacci::expected_tallies as expected_fibonacci_tallies;
