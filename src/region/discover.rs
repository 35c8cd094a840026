use crate::shape::source::ShapeRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryOutcome {
    /// Primary attribute value of the first shape referencing the region.
    Suggestion(String),
    NoCandidate,
}

/// Automated alias discovery: scan every shape for an attribute value that
/// contains `region` as a case-sensitive substring and report the first
/// hit's primary attribute. Offline curation aid, not a matching stage.
pub fn search_alias_candidate(
    shapes: &[ShapeRecord],
    region: &str,
    primary_key: &str,
) -> DiscoveryOutcome {
    for shape in shapes {
        if !references_region(shape, region) {
            continue;
        }
        return match shape.attribute(primary_key) {
            Some(value) => DiscoveryOutcome::Suggestion(value.to_string()),
            None => DiscoveryOutcome::NoCandidate,
        };
    }
    DiscoveryOutcome::NoCandidate
}

/// Manual alias discovery: print every attribute of every shape referencing
/// `region` and keep scanning. Returns the number of candidate shapes.
pub fn inspect_alias_candidates(shapes: &[ShapeRecord], region: &str) -> usize {
    let mut hits = 0;
    for shape in shapes {
        if !references_region(shape, region) {
            continue;
        }
        hits += 1;
        for (key, value) in shape.attributes() {
            println!("{}: {}", key, value);
        }
        println!("------------------------------------------");
    }
    hits
}

fn references_region(shape: &ShapeRecord, region: &str) -> bool {
    shape
        .attributes()
        .values()
        .any(|value| value.contains(region))
}
