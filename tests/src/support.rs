//! Test doubles for the external scanner seam.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use probr_common::error::ScanError;
use probr_common::network::target::Target;
use probr_core::invoker::{RawOutput, ScanInvoker};

/// One scripted response of the fake scanner.
#[derive(Clone)]
pub enum ScanStep {
    /// Return this XML immediately.
    Xml(&'static str),
    /// Return this XML after sleeping, to keep the scheduler in `Scanning`.
    Delayed(&'static str, Duration),
    /// Simulate a hung scanner process: the run consumes its whole timeout
    /// budget and fails with `Timeout`.
    Hang,
}

/// A [`ScanInvoker`] that plays back scripted steps and counts invocations.
///
/// When the script runs out, the last step repeats.
pub struct ScriptedScanner {
    steps: Mutex<VecDeque<ScanStep>>,
    last: Mutex<ScanStep>,
    calls: AtomicUsize,
}

impl ScriptedScanner {
    pub fn new(steps: Vec<ScanStep>) -> Self {
        assert!(!steps.is_empty(), "script must have at least one step");
        let last = steps[0].clone();
        Self {
            steps: Mutex::new(steps.into()),
            last: Mutex::new(last),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_step(&self) -> ScanStep {
        let mut steps = self.steps.lock().unwrap();
        match steps.pop_front() {
            Some(step) => {
                *self.last.lock().unwrap() = step.clone();
                step
            }
            None => self.last.lock().unwrap().clone(),
        }
    }
}

#[async_trait]
impl ScanInvoker for ScriptedScanner {
    async fn run_scan(
        &self,
        _targets: &[Target],
        timeout: Duration,
    ) -> Result<RawOutput, ScanError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match self.next_step() {
            ScanStep::Xml(xml) => Ok(RawOutput {
                bytes: xml.as_bytes().to_vec(),
            }),
            ScanStep::Delayed(xml, delay) => {
                tokio::time::sleep(delay).await;
                Ok(RawOutput {
                    bytes: xml.as_bytes().to_vec(),
                })
            }
            ScanStep::Hang => {
                tokio::time::sleep(timeout).await;
                Err(ScanError::Timeout(timeout))
            }
        }
    }
}
