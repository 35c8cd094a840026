use crate::prelude::*;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Corrected shape name(s) for one dataset region name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AliasTarget {
    One(String),
    Many(Vec<String>),
}

impl AliasTarget {
    pub fn corrected_names(&self) -> &[String] {
        match self {
            AliasTarget::One(name) => std::slice::from_ref(name),
            AliasTarget::Many(names) => names,
        }
    }
}

/// Curated mapping from dataset region names to shape attribute names.
///
/// A `None` entry marks a region as intentionally unmappable (cruise ships,
/// aggregate rows). Tables are tagged with the vintage of the dataset they
/// were curated against; loading a table for a different vintage is a
/// curation decision, not an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AliasTable {
    #[serde(default)]
    pub vintage: Option<String>,
    #[serde(default)]
    aliases: BTreeMap<String, Option<AliasTarget>>,
}

/// Corrected name back to the region name(s) it stands in for. Derived from
/// one `AliasTable`; rebuild it whenever the table changes.
#[derive(Debug, Clone, Default)]
pub struct ReverseAliasIndex {
    originals: BTreeMap<String, Vec<String>>,
}

impl ReverseAliasIndex {
    pub fn originals_of(&self, corrected: &str) -> Option<&[String]> {
        self.originals.get(corrected).map(Vec::as_slice)
    }
}

impl AliasTable {
    pub fn from_entries<I>(vintage: Option<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = (String, Option<AliasTarget>)>,
    {
        Self {
            vintage,
            aliases: entries.into_iter().collect(),
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read alias table {}", path.display()))?;
        let table: Self = serde_json::from_str(&raw)
            .with_context(|| format!("malformed alias table {}", path.display()))?;
        tracing::info!(
            "loaded alias table ({}) with {} entries from {}",
            table.vintage.as_deref().unwrap_or("no vintage"),
            table.aliases.len(),
            path.display()
        );
        Ok(table)
    }

    /// Built-in table for the given granularity level. Only the country
    /// level carries curated entries.
    pub fn builtin(level: u8) -> Self {
        match level {
            0 => ADMIN0_ALIASES.clone(),
            _ => Self::from_entries(Some(VINTAGE.to_string()), []),
        }
    }

    /// `None`: no entry at all. `Some(None)`: explicitly unmappable.
    pub fn get(&self, name: &str) -> Option<&Option<AliasTarget>> {
        self.aliases.get(name)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    pub fn reverse_index(&self) -> ReverseAliasIndex {
        let mut originals: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (original, target) in &self.aliases {
            let Some(target) = target else {
                continue;
            };
            for corrected in target.corrected_names() {
                originals
                    .entry(corrected.clone())
                    .or_default()
                    .push(original.clone());
            }
        }
        ReverseAliasIndex { originals }
    }
}

const VINTAGE: &str = "2020-04";

// Country names as they appear in the case data, against the NAME_SORT and
// SOVEREIGNT attributes of the matching Natural Earth vintage.
static ADMIN0_ALIASES: Lazy<AliasTable> = Lazy::new(|| {
    let one = |name: &str| Some(AliasTarget::One(name.to_string()));
    let entries = [
        ("Bahamas", one("Bahamas, The")),
        ("Burma", one("Myanmar")),
        ("Congo (Brazzaville)", one("Congo, Rep.")),
        ("Congo (Kinshasa)", one("Congo, Dem. Rep.")),
        ("Cote d'Ivoire", one("Côte d'Ivoire")),
        ("Diamond Princess", None),
        ("Egypt", one("Egypt, Arab Rep.")),
        ("Eswatini", one("eSwatini")),
        ("Gambia", one("Gambia, The")),
        ("Holy See", one("Vatican (Holy See)")),
        ("Iran", one("Iran, Islamic Rep.")),
        ("Korea, South", one("Korea, Rep.")),
        ("Kyrgyzstan", one("Kyrgyz Republic")),
        ("Laos", one("Lao PDR")),
        ("MS Zaandam", None),
        ("North Macedonia", one("Macedonia, FYR")),
        ("Russia", one("Russian Federation")),
        ("Saint Kitts and Nevis", one("St. Kitts and Nevis")),
        ("Saint Lucia", one("St. Lucia")),
        ("Saint Vincent and the Grenadines", one("St. Vincent and the Grenadines")),
        ("Slovakia", one("Slovak Republic")),
        ("Syria", one("Syrian Arab Republic")),
        ("Taiwan*", one("Taiwan")),
        ("US", one("United States of America")),
        ("Venezuela", one("Venezuela, RB")),
        ("West Bank and Gaza", one("Palestine (West Bank and Gaza)")),
    ];
    AliasTable::from_entries(
        Some(VINTAGE.to_string()),
        entries
            .into_iter()
            .map(|(name, target)| (name.to_string(), target)),
    )
});

#[cfg(test)]
mod tests {
    use super::*;

    fn one(name: &str) -> Option<AliasTarget> {
        Some(AliasTarget::One(name.to_string()))
    }

    #[test]
    fn reverse_index_round_trips_single_corrections() {
        let table = AliasTable::from_entries(
            None,
            [
                ("Burma".to_string(), one("Myanmar")),
                ("Diamond Princess".to_string(), None),
            ],
        );
        let reverse = table.reverse_index();
        assert_eq!(
            reverse.originals_of("Myanmar"),
            Some(&["Burma".to_string()][..])
        );
        // None entries never appear in the reverse index.
        assert_eq!(reverse.originals_of("Diamond Princess"), None);
    }

    #[test]
    fn reverse_index_round_trips_list_corrections() {
        let table = AliasTable::from_entries(
            None,
            [(
                "Serbia and Montenegro".to_string(),
                Some(AliasTarget::Many(vec![
                    "Serbia".to_string(),
                    "Montenegro".to_string(),
                ])),
            )],
        );
        let reverse = table.reverse_index();
        for corrected in ["Serbia", "Montenegro"] {
            assert_eq!(
                reverse.originals_of(corrected),
                Some(&["Serbia and Montenegro".to_string()][..])
            );
        }
    }

    #[test]
    fn json_round_trip_covers_all_target_shapes() {
        let raw = r#"{
            "vintage": "2020-04",
            "aliases": {
                "Burma": "Myanmar",
                "Diamond Princess": null,
                "Serbia and Montenegro": ["Serbia", "Montenegro"]
            }
        }"#;
        let table: AliasTable = serde_json::from_str(raw).unwrap();
        assert_eq!(table.vintage.as_deref(), Some("2020-04"));
        assert_eq!(table.get("Burma"), Some(&one("Myanmar")));
        assert_eq!(table.get("Diamond Princess"), Some(&None));
        assert_eq!(
            table.get("Serbia and Montenegro"),
            Some(&Some(AliasTarget::Many(vec![
                "Serbia".to_string(),
                "Montenegro".to_string()
            ])))
        );
        assert_eq!(table.get("Italy"), None);
    }

    #[test]
    fn builtin_country_table_is_curated() {
        let table = AliasTable::builtin(0);
        assert_eq!(table.get("Burma"), Some(&one("Myanmar")));
        assert_eq!(table.get("MS Zaandam"), Some(&None));
        assert!(!table.is_empty());
        assert!(AliasTable::builtin(1).is_empty());
    }
}
