//! Image probe module
//!
//! This module answers one question per record: does its image load?
//! - Locator parsing and early rejection (locator.rs)
//! - The loading facility behind a trait (loader.rs)
//! - Timeout and batch fan-out (this file)

pub mod loader;
pub mod locator;

use std::time::Duration;

use futures::future::join_all;
use tracing::debug;

pub use loader::{DecodingLoader, ImageLoader, LoadError};
pub use locator::{Locator, MalformedLocator};

/// How long a single load may take before it counts as invalid
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(6000);

/// Result of probing one locator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Valid,
    Invalid,
}

impl ProbeOutcome {
    pub fn is_valid(self) -> bool {
        self == ProbeOutcome::Valid
    }
}

/// Checks image locators against a loader with a bounded timeout
#[derive(Debug, Clone)]
pub struct ImageProbe<L> {
    loader: L,
    timeout: Duration,
}

impl<L: ImageLoader> ImageProbe<L> {
    pub fn new(loader: L, timeout: Duration) -> Self {
        Self { loader, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Probe a single locator. Never fails: every problem is `Invalid`.
    ///
    /// The first of load-settles and timeout-fires wins. On timeout the
    /// in-flight load is dropped, so a late success cannot be observed.
    pub async fn probe(&self, raw: &str) -> ProbeOutcome {
        let locator = match Locator::parse(raw) {
            Ok(locator) => locator,
            Err(reason) => {
                debug!(locator = raw, %reason, "rejected image locator");
                return ProbeOutcome::Invalid;
            }
        };

        match tokio::time::timeout(self.timeout, self.loader.load(&locator)).await {
            Ok(Ok(())) => ProbeOutcome::Valid,
            Ok(Err(err)) => {
                debug!(locator = raw, error = %err, "image failed to load");
                ProbeOutcome::Invalid
            }
            Err(_) => {
                debug!(locator = raw, timeout_ms = self.timeout.as_millis() as u64, "image load timed out");
                ProbeOutcome::Invalid
            }
        }
    }

    /// Probe every locator concurrently and wait for all of them
    ///
    /// Outcomes come back in input order. One slow or failing locator
    /// never affects the others.
    pub async fn probe_all<'a, I>(&self, locators: I) -> Vec<ProbeOutcome>
    where
        I: IntoIterator<Item = &'a str>,
    {
        join_all(locators.into_iter().map(|raw| self.probe(raw))).await
    }
}
