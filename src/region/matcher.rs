use crate::region::alias::{AliasTable, ReverseAliasIndex};
use crate::region::discover::{self, DiscoveryOutcome};
use crate::shape::source::ShapeRecord;
use geo_types::Polygon;
use itertools::Itertools;
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MatchError {
    #[error("no shape found for region '{0}' and no alias entry exists for it")]
    UnmatchedRegion(String),
    #[error("alias for region '{region}' points at '{corrected}', which has no shape")]
    AliasTargetMissing { region: String, corrected: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryMode {
    /// An unmatched region without an alias entry is fatal.
    Off,
    /// Log an alias-table candidate for each unmatched region and keep going.
    /// Curation aid only.
    Automated,
}

/// Attribute-keyed fragment buckets plus the shared "no data" bucket,
/// rebuilt per render from the loaded shapes.
pub struct ShapeIndex {
    buckets: BTreeMap<String, Vec<Polygon<f64>>>,
    unmatched: Vec<Polygon<f64>>,
}

impl ShapeIndex {
    pub fn fragments_for(&self, name: &str) -> Option<&[Polygon<f64>]> {
        self.buckets.get(name).map(Vec::as_slice)
    }

    /// Fragments of shapes none of whose attribute values matched a known
    /// region, directly or through the reverse alias index. Additive: a
    /// shape appears once per distinct failing attribute value.
    pub fn unmatched(&self) -> &[Polygon<f64>] {
        &self.unmatched
    }
}

pub fn build_shape_index(
    shapes: &[ShapeRecord],
    attribute_keys: &[&str],
    known: &HashSet<String>,
    reverse: &ReverseAliasIndex,
) -> ShapeIndex {
    let mut buckets: BTreeMap<String, Vec<Polygon<f64>>> = BTreeMap::new();
    let mut unmatched = Vec::new();

    for shape in shapes {
        let mut seen = HashSet::new();
        let mut any_matched = false;
        let mut failing = 0usize;
        for key in attribute_keys {
            let Some(value) = shape.attribute(key) else {
                continue;
            };
            if !seen.insert(value) {
                continue;
            }
            buckets
                .entry(value.to_string())
                .or_default()
                .extend(shape.fragments().iter().cloned());
            if attribute_matches(value, known, reverse) {
                any_matched = true;
            } else {
                failing += 1;
            }
        }
        if !any_matched {
            for _ in 0..failing {
                unmatched.extend(shape.fragments().iter().cloned());
            }
        }
    }

    ShapeIndex { buckets, unmatched }
}

fn attribute_matches(value: &str, known: &HashSet<String>, reverse: &ReverseAliasIndex) -> bool {
    known.contains(value)
        || reverse
            .originals_of(value)
            .is_some_and(|originals| originals.iter().any(|original| known.contains(original)))
}

/// Outcome of the three-stage lookup: direct, via alias, or nothing.
#[derive(Debug)]
pub enum RegionMatch {
    Found(Vec<Polygon<f64>>),
    FoundViaAlias {
        corrected: Vec<String>,
        fragments: Vec<Polygon<f64>>,
    },
    ExplicitlyUnmapped,
    Unmatched,
}

pub fn lookup_region(
    region: &str,
    index: &ShapeIndex,
    aliases: &AliasTable,
) -> Result<RegionMatch, MatchError> {
    if let Some(fragments) = index.fragments_for(region) {
        return Ok(RegionMatch::Found(fragments.to_vec()));
    }
    match aliases.get(region) {
        Some(Some(target)) => {
            let mut corrected = Vec::new();
            let mut fragments = Vec::new();
            // List-valued corrections are unioned into the one region.
            for name in target.corrected_names() {
                let bucket =
                    index
                        .fragments_for(name)
                        .ok_or_else(|| MatchError::AliasTargetMissing {
                            region: region.to_string(),
                            corrected: name.clone(),
                        })?;
                fragments.extend_from_slice(bucket);
                corrected.push(name.clone());
            }
            Ok(RegionMatch::FoundViaAlias {
                corrected,
                fragments,
            })
        }
        Some(None) => Ok(RegionMatch::ExplicitlyUnmapped),
        None => Ok(RegionMatch::Unmatched),
    }
}

/// Region name to drawable fragments, plus the "no data" background
/// fragments. Computed per render and discarded with it.
#[derive(Debug)]
pub struct PatchSet {
    pub matched: BTreeMap<String, Vec<Polygon<f64>>>,
    pub no_data: Vec<Polygon<f64>>,
}

/// Resolves every known region to its fragments, in sorted region order for
/// deterministic drawing. A region with neither shape nor alias entry is
/// fatal unless discovery mode is on, in which case a table candidate is
/// logged and the region skipped.
pub fn drawable_patches(
    regions: &[String],
    index: &ShapeIndex,
    aliases: &AliasTable,
    shapes: &[ShapeRecord],
    primary_key: &str,
    discovery: DiscoveryMode,
) -> Result<PatchSet, MatchError> {
    let mut matched = BTreeMap::new();
    for region in regions.iter().sorted() {
        match lookup_region(region, index, aliases)? {
            RegionMatch::Found(fragments) => {
                matched.insert(region.clone(), fragments);
            }
            RegionMatch::FoundViaAlias { fragments, .. } => {
                matched.insert(region.clone(), fragments);
            }
            RegionMatch::ExplicitlyUnmapped => {}
            RegionMatch::Unmatched => match discovery {
                DiscoveryMode::Off => {
                    return Err(MatchError::UnmatchedRegion(region.clone()));
                }
                DiscoveryMode::Automated => {
                    match discover::search_alias_candidate(shapes, region, primary_key) {
                        DiscoveryOutcome::Suggestion(candidate) => {
                            tracing::warn!("no shape for region; candidate alias entry: '{}': '{}',", region, candidate);
                        }
                        DiscoveryOutcome::NoCandidate => {
                            tracing::warn!("no shape for region; candidate alias entry: '{}': None,", region);
                        }
                    }
                }
            },
        }
    }

    Ok(PatchSet {
        matched,
        no_data: index.unmatched().to_vec(),
    })
}
