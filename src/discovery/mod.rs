//! Subdomain discovery.
//!
//! Wildcard inputs are expanded by an external enumeration tool. The
//! [`Discovery`] trait is the seam the expansion pipeline calls through, so
//! tests can substitute a canned implementation.

mod subfinder;

pub use subfinder::SubfinderDiscovery;

use crate::error::DiscoveryResult;
use async_trait::async_trait;
use std::time::Duration;

/// Finds hostnames under an apex domain.
#[async_trait]
pub trait Discovery: Send + Sync {
    /// Enumerate subdomains of `apex`, giving up once `budget` has elapsed.
    async fn discover(&self, apex: &str, budget: Duration) -> DiscoveryResult<Vec<String>>;
}
