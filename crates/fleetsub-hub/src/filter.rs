//! Package filter evaluation
//!
//! Decides whether one catalog artifact satisfies a subscription's package
//! filter. Label selection is pushed down to the catalog listing; this
//! module covers package name, annotations and version range.

use crate::error::VersionRangeError;
use crate::version::VersionRange;
use fleetsub_types::{Deployable, Subscription};
use std::collections::BTreeMap;
use tracing::debug;

/// Compiled package filter of one subscription
#[derive(Debug)]
pub struct ArtifactFilter<'a> {
    package: Option<&'a str>,
    annotations: &'a BTreeMap<String, String>,
    version: Option<Result<VersionRange, VersionRangeError>>,
}

impl<'a> ArtifactFilter<'a> {
    /// `None` when the subscription has no package filter: every artifact
    /// matches
    pub fn for_subscription(sub: &'a Subscription) -> Option<Self> {
        let filter = sub.spec.package_filter.as_ref()?;
        let version = filter
            .version
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .map(VersionRange::parse);

        Some(Self {
            package: sub.spec.package.as_deref().filter(|p| !p.is_empty()),
            annotations: &filter.annotations,
            version,
        })
    }

    pub fn matches(&self, artifact: &Deployable) -> bool {
        let name = &artifact.metadata.name;

        if let Some(package) = self.package {
            if package != name {
                debug!(artifact = %name, package, "Package name does not match");
                return false;
            }
        }

        if !self.annotations.is_empty() {
            let merged = merged_annotations(artifact);
            let mismatch = self.annotations.iter().find(|(k, v)| {
                merged.get(k.as_str()).map(String::as_str).unwrap_or("") != v.as_str()
            });
            if let Some((key, _)) = mismatch {
                debug!(artifact = %name, annotation = %key, "Annotation filter does not match");
                return false;
            }
        }

        match &self.version {
            None => true,
            Some(Err(e)) => {
                debug!(artifact = %name, error = %e, "Unparsable version range, treating as no match");
                false
            }
            Some(Ok(range)) => {
                let matched = artifact
                    .version()
                    .is_some_and(|v| range.matches_str(v));
                debug!(
                    artifact = %name,
                    range = %range,
                    version = artifact.version().unwrap_or(""),
                    matched,
                    "Version check"
                );
                matched
            }
        }
    }
}

/// Whether `artifact` passes the package filter of `sub`
pub fn artifact_matches(sub: &Subscription, artifact: &Deployable) -> bool {
    ArtifactFilter::for_subscription(sub).map_or(true, |f| f.matches(artifact))
}

/// Artifact annotations, with template annotations filling keys the
/// artifact leaves unset or empty
fn merged_annotations(artifact: &Deployable) -> BTreeMap<String, String> {
    let mut merged: BTreeMap<String, String> = artifact
        .metadata
        .annotations
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    if let Some(template) = &artifact.spec.template {
        for (k, v) in template.annotations() {
            merged.entry(k).or_insert(v);
        }
    }
    merged
}
