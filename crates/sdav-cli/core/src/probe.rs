//! Readiness gate for the manager node.
//!
//! A [`ReadinessProber`] polls a [`Probe`] until it reports success or the
//! retry budget runs out. It is synchronous on purpose: callers block on it
//! between starting the manager and starting the machines that depend on it.

use std::time::Duration;

/// Outcome of a single probe attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeClassification {
    Ok,
    Timeout,
    ConnectionRefused,
    /// A response arrived but its status was not 200.
    UnexpectedStatus(u16),
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub reachable: bool,
    pub classification: ProbeClassification,
}

impl ProbeResult {
    pub fn ok() -> Self {
        ProbeResult { reachable: true, classification: ProbeClassification::Ok }
    }

    pub fn failed(classification: ProbeClassification) -> Self {
        ProbeResult { reachable: false, classification }
    }
}

/// One bounded reachability check against a fixed endpoint.
pub trait Probe {
    fn check(&self) -> ProbeResult;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProberState {
    Probing,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub state: ProberState,
    pub attempts: u32,
}

impl ProbeOutcome {
    pub fn exit_code(&self) -> i32 {
        match self.state {
            ProberState::Succeeded => 0,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReadinessProber {
    name: String,
    max_retries: u32,
    interval: Duration,
}

impl ReadinessProber {
    pub fn new(name: impl Into<String>, max_retries: u32, interval: Duration) -> Self {
        ReadinessProber { name: name.into(), max_retries, interval }
    }

    /// State after an attempt, given how many attempts have failed so far.
    fn transition(&self, result: &ProbeResult, failures: u32) -> ProberState {
        if result.reachable {
            ProberState::Succeeded
        } else if failures > self.max_retries {
            ProberState::Failed
        } else {
            ProberState::Probing
        }
    }

    /// Poll `probe` until it succeeds or `max_retries + 1` attempts have failed.
    pub fn run<P: Probe + ?Sized>(&self, probe: &P) -> ProbeOutcome {
        println!("[INFO] Checking if {} is available...", self.name);

        let mut attempts = 0;
        let mut failures = 0;
        loop {
            attempts += 1;
            let result = probe.check();
            if !result.reachable {
                failures += 1;
            }
            tracing::debug!(
                attempt = attempts,
                classification = ?result.classification,
                "probe attempt"
            );

            match self.transition(&result, failures) {
                ProberState::Succeeded => {
                    println!("[INFO] {} is available.", self.name);
                    return ProbeOutcome { state: ProberState::Succeeded, attempts };
                }
                ProberState::Failed => {
                    eprintln!("[ERROR] {} is not available. Exiting...", self.name);
                    return ProbeOutcome { state: ProberState::Failed, attempts };
                }
                ProberState::Probing => {
                    println!("[ERROR] {} is not available. Retrying...", self.name);
                    std::thread::sleep(self.interval);
                }
            }
        }
    }
}
