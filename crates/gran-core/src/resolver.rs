//! Granularity resolution.
//!
//! Combines the override directive with capability facts:
//! 1. A valid directive forces its granularity; the medium is not touched.
//! 2. Otherwise the path is probed and the facts are classified.
//!
//! Classification:
//!
//! | medium        | persistence domain | granularity  |
//! |---------------|--------------------|--------------|
//! | device-DAX    | `cpu_cache`        | `byte`       |
//! | device-DAX    | other              | `cache_line` |
//! | fs-DAX        | `cpu_cache`        | `byte`       |
//! | fs-DAX        | other              | `cache_line` |
//! | block storage | any                | `page`       |
//!
//! A regular file is fs-DAX only if a MAP_SYNC mapping succeeded. When no
//! trial was made (directories, empty files, probing disabled) the mount's
//! DAX mode decides, and only `dax=always` counts.

use crate::exit_codes::ExitCode;
use crate::probe::{CapabilityFacts, CapabilityProber, DaxMode, PersistenceDomain, ProbeError, SystemProber};
use gran_common::{ErrorCategory, Granularity, Provenance};
use gran_config::{parse_directive, ConfigError, OverrideDirective};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Medium class derived from capability facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediumClass {
    /// Character device exposing persistent memory directly.
    DeviceDax,
    /// File on a filesystem mounted with direct access.
    FsDax,
    /// Page-cache backed storage.
    BlockStorage,
}

impl std::fmt::Display for MediumClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediumClass::DeviceDax => write!(f, "device_dax"),
            MediumClass::FsDax => write!(f, "fs_dax"),
            MediumClass::BlockStorage => write!(f, "block_storage"),
        }
    }
}

/// Outcome of one resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionResult {
    pub granularity: Granularity,
    pub provenance: Provenance,

    /// Classified medium; absent for forced results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medium: Option<MediumClass>,

    /// Facts the classification was based on; absent for forced results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facts: Option<CapabilityFacts>,
}

impl ResolutionResult {
    fn forced(granularity: Granularity) -> Self {
        ResolutionResult {
            granularity,
            provenance: Provenance::Forced,
            medium: None,
            facts: None,
        }
    }

    pub fn is_forced(&self) -> bool {
        self.provenance == Provenance::Forced
    }
}

/// Errors that abort a resolution.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error("granularity {available} does not satisfy required {required}")]
    GranularityNotSupported {
        required: Granularity,
        available: Granularity,
    },
}

impl ResolutionError {
    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ResolutionError::Config(e) => e.category(),
            ResolutionError::Probe(e) => e.category(),
            ResolutionError::GranularityNotSupported { .. } => ErrorCategory::Requirement,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            ResolutionError::Config(e) => e.remediation(),
            ResolutionError::Probe(ProbeError::Inaccessible { .. }) => {
                "Check that the path exists and is readable by the current user."
            }
            ResolutionError::Probe(ProbeError::UnsupportedMedium { .. }) => {
                "Point at a file or directory on a mounted filesystem, a block device, or a device-DAX node, or force a granularity."
            }
            ResolutionError::GranularityNotSupported { .. } => {
                "Use a medium with finer persistence (fs-DAX or device-DAX), or relax --require."
            }
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            ResolutionError::Config(_) => ExitCode::ConfigError,
            ResolutionError::Probe(ProbeError::Inaccessible { .. }) => ExitCode::InaccessibleError,
            ResolutionError::Probe(ProbeError::UnsupportedMedium { .. }) => {
                ExitCode::UnsupportedMediumError
            }
            ResolutionError::GranularityNotSupported { .. } => ExitCode::GranularityNotSupported,
        }
    }
}

/// Resolves granularities using a capability prober.
#[derive(Debug, Clone, Default)]
pub struct Resolver<P = SystemProber> {
    prober: P,
}

impl<P: CapabilityProber> Resolver<P> {
    pub fn new(prober: P) -> Self {
        Resolver { prober }
    }

    pub fn prober(&self) -> &P {
        &self.prober
    }

    /// Resolve the granularity for `path`.
    ///
    /// `directive` is the raw override token, if any. A present, non-empty
    /// token that does not parse fails the resolution; it never falls back
    /// to detection.
    pub fn resolve(
        &self,
        path: &Path,
        directive: Option<&str>,
    ) -> Result<ResolutionResult, ResolutionError> {
        if let Some(granularity) = parse_directive(directive)? {
            info!(
                path = %path.display(),
                granularity = %granularity,
                "granularity forced by override"
            );
            return Ok(ResolutionResult::forced(granularity));
        }

        let facts = self.prober.probe(path)?;
        let (medium, granularity) = classify(&facts);
        info!(
            path = %path.display(),
            medium = %medium,
            granularity = %granularity,
            "granularity detected"
        );

        Ok(ResolutionResult {
            granularity,
            provenance: Provenance::Detected,
            medium: Some(medium),
            facts: Some(facts),
        })
    }

    /// Resolve using a directive picked by override precedence.
    ///
    /// An unparseable token is reported against the source it came from.
    pub fn resolve_directive(
        &self,
        path: &Path,
        directive: Option<&OverrideDirective>,
    ) -> Result<ResolutionResult, ResolutionError> {
        self.resolve(path, directive.map(|d| d.token.as_str()))
            .map_err(|e| match (e, directive) {
                (ResolutionError::Config(c), Some(d)) => {
                    ResolutionError::Config(c.attributed_to(d.source))
                }
                (e, _) => e,
            })
    }
}

/// Resolve with the default system prober.
pub fn resolve(path: &Path, directive: Option<&str>) -> Result<ResolutionResult, ResolutionError> {
    Resolver::new(SystemProber::default()).resolve(path, directive)
}

/// Map capability facts to a medium class and granularity.
pub fn classify(facts: &CapabilityFacts) -> (MediumClass, Granularity) {
    let medium = if facts.device_dax {
        MediumClass::DeviceDax
    } else {
        match facts.map_sync {
            Some(true) => MediumClass::FsDax,
            Some(false) => MediumClass::BlockStorage,
            None => match facts.mount.as_ref().map(|m| m.dax) {
                Some(DaxMode::Always) => MediumClass::FsDax,
                _ => MediumClass::BlockStorage,
            },
        }
    };

    let granularity = match medium {
        MediumClass::DeviceDax | MediumClass::FsDax => {
            if facts.persistence_domain == PersistenceDomain::CpuCache {
                Granularity::Byte
            } else {
                Granularity::CacheLine
            }
        }
        MediumClass::BlockStorage => Granularity::Page,
    };

    debug!(
        medium = %medium,
        domain = %facts.persistence_domain,
        map_sync = ?facts.map_sync,
        granularity = %granularity,
        "classified"
    );
    (medium, granularity)
}

/// Check a result against a required granularity.
pub fn require(
    result: &ResolutionResult,
    required: Granularity,
) -> Result<(), ResolutionError> {
    if result.granularity.satisfies(required) {
        Ok(())
    } else {
        Err(ResolutionError::GranularityNotSupported {
            required,
            available: result.granularity,
        })
    }
}
