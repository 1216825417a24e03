/// Named groups of counties, in display order.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RegionCatalog {
    pub regions: Vec<(String, Vec<String>)>,
}

// The county codes of the eight regions used by the national dashboard.
const KENYA_REGIONS: [(&str, &[&str]); 8] = [
    ("Mount Kenya", &["22", "12", "21", "19", "18", "20", "14", "13"]),
    (
        "Rift Valley",
        &[
            "27", "32", "36", "35", "29", "34", "33", "30", "28", "26", "23", "24", "31", "25",
        ],
    ),
    ("Nyanza", &["42", "43", "44", "41", "45", "46"]),
    ("Western", &["37", "39", "40", "38"]),
    ("Lower Eastern", &["16", "17", "15"]),
    ("Coast", &["1", "3", "2", "6", "4", "5"]),
    ("Northern", &["9", "8", "7", "10", "11"]),
    ("Nairobi", &["47"]),
];

impl RegionCatalog {
    pub fn new(regions: Vec<(String, Vec<String>)>) -> RegionCatalog {
        RegionCatalog { regions }
    }

    /// The catalog of the 47 Kenyan counties.
    pub fn kenya() -> RegionCatalog {
        RegionCatalog::new(
            KENYA_REGIONS
                .iter()
                .map(|(name, codes)| {
                    (
                        name.to_string(),
                        codes.iter().map(|c| c.to_string()).collect(),
                    )
                })
                .collect(),
        )
    }

    pub fn names(&self) -> Vec<&str> {
        self.regions.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn num_counties(&self) -> usize {
        self.regions.iter().map(|(_, codes)| codes.len()).sum()
    }

    /// The region of a county. Leading zeros of the codes are not significant.
    pub fn region_of(&self, county_code: &str) -> Option<&str> {
        let code = normalize_county_code(county_code);
        self.regions
            .iter()
            .find(|(_, codes)| codes.iter().any(|c| normalize_county_code(c) == code))
            .map(|(name, _)| name.as_str())
    }
}

/// The code under which a county is known everywhere in the crate.
///
/// Exports write the same county as `"01"`, `"1"` or `1`: surrounding spaces
/// and leading zeros are dropped.
pub fn normalize_county_code(code: &str) -> String {
    let trimmed = code.trim().trim_start_matches('0');
    if trimmed.is_empty() && !code.trim().is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kenya_covers_all_counties() {
        let catalog = RegionCatalog::kenya();
        assert_eq!(catalog.names().len(), 8);
        assert_eq!(catalog.num_counties(), 47);
        for code in 1..=47 {
            assert!(
                catalog.region_of(&code.to_string()).is_some(),
                "county {} has no region",
                code
            );
        }
    }

    #[test]
    fn county_lookup() {
        let catalog = RegionCatalog::kenya();
        assert_eq!(catalog.region_of("45"), Some("Nyanza"));
        assert_eq!(catalog.region_of("01"), Some("Coast"));
        assert_eq!(catalog.region_of("47"), Some("Nairobi"));
        assert_eq!(catalog.region_of("48"), None);
        assert_eq!(catalog.region_of(" 007 "), Some("Northern"));
    }

    #[test]
    fn county_code_forms() {
        assert_eq!(normalize_county_code("01"), "1");
        assert_eq!(normalize_county_code(" 1"), "1");
        assert_eq!(normalize_county_code("47"), "47");
        assert_eq!(normalize_county_code("00"), "0");
        assert_eq!(normalize_county_code(""), "");
    }
}
