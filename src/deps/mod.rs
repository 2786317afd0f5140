//! Dependency freshness
//!
//! Manifest parsers (one per language analyzer) produce [`DependencySpec`]s.
//! The [`DependencyResolver`] asks a [`Registry`] for each package's latest
//! release over a bounded worker pool and [`classify`]s the answer.

pub mod registry;

pub use registry::{HttpRegistry, OfflineRegistry, RegistryError, RegistryResult};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::models::{DepStatus, DependencyRecord};

/// Staleness assumed when a version differs but the registry gives no publish date.
pub const UNDATED_STALE_DAYS: i64 = 30;

/// Fallback when `max_stale_days` is configured as 0.
pub const DEFAULT_MAX_STALE_DAYS: i64 = 90;

/// Package registries the resolver knows how to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ecosystem {
    GoProxy,
    Npm,
    PyPI,
    CratesIo,
    Maven,
    RubyGems,
    Packagist,
    NuGet,
}

/// A dependency as declared in a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySpec {
    /// Name shown in results
    pub name: String,
    /// Registry lookup key (full module path, `group:artifact`, ...)
    pub package: String,
    /// Declared version with range operators stripped; may be empty
    pub version: String,
    pub ecosystem: Ecosystem,
}

impl DependencySpec {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        ecosystem: Ecosystem,
    ) -> Self {
        let name = name.into();
        Self {
            package: name.clone(),
            name,
            version: version.into(),
            ecosystem,
        }
    }

    /// Use a different lookup key than the display name.
    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = package.into();
        self
    }
}

/// Latest release reported by a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub version: String,
    pub published: Option<DateTime<Utc>>,
}

impl Release {
    pub fn undated(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            published: None,
        }
    }
}

/// Source of latest-release information.
pub trait Registry: Send + Sync {
    fn latest(&self, ecosystem: Ecosystem, package: &str) -> RegistryResult<Release>;
}

/// Turn one lookup into a freshness record.
///
/// - lookup failed: `unknown`, latest `?`, 0 days
/// - declared version empty or equal to latest: `current`, 0 days
/// - publish date known: days since publish, `outdated` past `max_stale_days`
/// - no publish date: [`UNDATED_STALE_DAYS`], `stale`
pub fn classify(
    spec: &DependencySpec,
    lookup: RegistryResult<Release>,
    now: DateTime<Utc>,
    max_stale_days: i64,
) -> DependencyRecord {
    let max_stale_days = if max_stale_days <= 0 {
        DEFAULT_MAX_STALE_DAYS
    } else {
        max_stale_days
    };

    let record = |latest: String, stale_days: i64, status: DepStatus| DependencyRecord {
        module: spec.name.clone(),
        current_version: spec.version.clone(),
        latest_version: latest,
        stale_days,
        status,
    };

    let release = match lookup {
        Ok(release) => release,
        Err(RegistryError::Offline) => {
            debug!("Skipping lookup of {}: offline", spec.package);
            return record("?".to_string(), 0, DepStatus::Unknown);
        }
        Err(e) => {
            warn!("Could not resolve {}: {}", spec.package, e);
            return record("?".to_string(), 0, DepStatus::Unknown);
        }
    };

    if spec.version.is_empty() || spec.version == release.version {
        return record(release.version, 0, DepStatus::Current);
    }

    match release.published {
        Some(published) => {
            let days = (now - published).num_days().max(0);
            let status = if days > max_stale_days {
                DepStatus::Outdated
            } else {
                DepStatus::Stale
            };
            record(release.version, days, status)
        }
        None => record(release.version, UNDATED_STALE_DAYS, DepStatus::Stale),
    }
}

/// Resolves manifest entries against a registry with bounded concurrency.
pub struct DependencyResolver {
    registry: Arc<dyn Registry>,
    max_stale_days: i64,
    pool: Option<rayon::ThreadPool>,
}

impl DependencyResolver {
    pub fn new(registry: Arc<dyn Registry>, max_stale_days: i64, workers: usize) -> Self {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("drift-registry-{}", i))
            .build();
        let pool = match pool {
            Ok(pool) => Some(pool),
            Err(e) => {
                warn!("Registry worker pool unavailable, resolving serially: {}", e);
                None
            }
        };
        Self {
            registry,
            max_stale_days,
            pool,
        }
    }

    /// One record per spec, in manifest order.
    pub fn resolve(&self, specs: &[DependencySpec]) -> Vec<DependencyRecord> {
        if specs.is_empty() {
            return Vec::new();
        }
        debug!("Resolving {} dependencies", specs.len());

        let now = Utc::now();
        let lookup = |spec: &DependencySpec| {
            let result = self.registry.latest(spec.ecosystem, &spec.package);
            classify(spec, result, now, self.max_stale_days)
        };

        match &self.pool {
            Some(pool) => pool.install(|| specs.par_iter().map(lookup).collect::<Vec<_>>()),
            None => specs.iter().map(lookup).collect(),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;

    /// In-memory registry keyed by package name.
    #[derive(Default)]
    pub struct FakeRegistry {
        pub releases: HashMap<String, Release>,
    }

    impl FakeRegistry {
        pub fn with(mut self, package: &str, release: Release) -> Self {
            self.releases.insert(package.to_string(), release);
            self
        }
    }

    impl Registry for FakeRegistry {
        fn latest(&self, _ecosystem: Ecosystem, package: &str) -> RegistryResult<Release> {
            self.releases
                .get(package)
                .cloned()
                .ok_or_else(|| RegistryError::NoRelease(package.to_string()))
        }
    }
}
