//! # Probr Core
//!
//! The scan pipeline: invoke the external scanner, parse its XML output,
//! publish the result as an immutable snapshot, and render the snapshot in
//! Prometheus exposition format.
//!
//! **Architectural note:**
//! The only seam to the outside world is the [`invoker::ScanInvoker`] trait.
//! The scheduler drives it on a timer and owns the single piece of shared
//! state (the current snapshot); everything else is pure functions over
//! immutable data. Tests substitute the invoker with a fake instead of
//! shelling out to a real scanner.

pub mod exporter;
pub mod invoker;
pub mod nmap_xml;
pub mod parser;
pub mod scheduler;
