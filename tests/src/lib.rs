//! End-to-end tests for the scan pipeline, driven through fake invokers
//! instead of a real nmap binary.

#[cfg(test)]
mod support;

mod pipeline;
