use log::{debug, info};

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::config::*;
use crate::regions::{normalize_county_code, RegionCatalog};
use crate::{percent_of, round_share};

/// Reduces the rows of one run to the leading candidate of each county.
///
/// Rows are processed in order. The first row of a county sets its leader; a
/// later row only takes over with a strictly greater share, so the earliest
/// row wins a tie. The turnout is the first non-null turnout seen for the
/// county. The map is keyed by normalized county code.
pub fn aggregate_counties(rows: &[ForecastRow]) -> CountyMap {
    let mut res: CountyMap = BTreeMap::new();
    for row in rows.iter() {
        let code = normalize_county_code(&row.county_code);
        match res.get_mut(&code) {
            None => {
                res.insert(
                    code,
                    CountyAggregate {
                        winner_candidate: row.candidate.clone(),
                        winner_party: row.party.clone(),
                        turnout: row.predicted_turnout,
                        max_share: row.predicted_vote_share,
                    },
                );
            }
            Some(agg) => {
                if agg.turnout.is_none() && row.predicted_turnout.is_some() {
                    agg.turnout = row.predicted_turnout;
                }
                if row.predicted_vote_share > agg.max_share {
                    agg.winner_candidate = row.candidate.clone();
                    agg.winner_party = row.party.clone();
                    agg.max_share = row.predicted_vote_share;
                }
            }
        }
    }
    debug!(
        "aggregate_counties: {} rows -> {} counties",
        rows.len(),
        res.len()
    );
    res
}

/// The normalized codes of the counties present in a run.
pub fn county_codes(rows: &[ForecastRow]) -> BTreeSet<String> {
    rows.iter()
        .map(|r| normalize_county_code(&r.county_code))
        .collect()
}

/// Completes the selected map with the fallback entries of the counties that
/// are not in the selection.
///
/// An entry of the selected map is never replaced. Codes are compared once
/// normalized, and the merged map is keyed by normalized code. Returns the
/// merged map and the codes that were taken from the fallback.
pub fn fallback_merge(
    selected: &CountyMap,
    fallback: &CountyMap,
    selected_codes: &BTreeSet<String>,
) -> (CountyMap, BTreeSet<String>) {
    let selected_codes: BTreeSet<String> = selected_codes
        .iter()
        .map(|c| normalize_county_code(c))
        .collect();
    let mut merged: CountyMap = BTreeMap::new();
    for (code, agg) in selected.iter() {
        merged
            .entry(normalize_county_code(code))
            .or_insert_with(|| agg.clone());
    }
    let mut used_fallback_codes: BTreeSet<String> = BTreeSet::new();
    for (code, agg) in fallback.iter() {
        let code = normalize_county_code(code);
        if selected_codes.contains(&code) || merged.contains_key(&code) {
            continue;
        }
        merged.insert(code.clone(), agg.clone());
        used_fallback_codes.insert(code);
    }
    (merged, used_fallback_codes)
}

/// Merges a selected run with a fallback run.
///
/// The fallback is ignored when it is disabled or missing (for instance
/// because it could not be fetched).
pub fn merge_runs(
    selected_rows: &[ForecastRow],
    fallback_rows: Option<&[ForecastRow]>,
    fallback_enabled: bool,
) -> MergeOutcome {
    let selected = aggregate_counties(selected_rows);
    let selected_codes = county_codes(selected_rows);
    let fallback = match fallback_rows {
        Some(rows) if fallback_enabled => aggregate_counties(rows),
        _ => CountyMap::new(),
    };
    let (merged, used_fallback_codes) = fallback_merge(&selected, &fallback, &selected_codes);
    info!(
        "merge_runs: {} counties in run, {} from fallback (fallback enabled: {})",
        selected_codes.len(),
        used_fallback_codes.len(),
        fallback_enabled
    );
    MergeOutcome {
        merged,
        selected_codes,
        used_fallback_codes,
        fallback_enabled,
    }
}

/// The code sets hold normalized codes, as built by [merge_runs].
pub fn county_status(
    county_code: &str,
    selected_codes: &BTreeSet<String>,
    used_fallback_codes: &BTreeSet<String>,
    fallback_enabled: bool,
) -> CountyStatus {
    let code = normalize_county_code(county_code);
    if selected_codes.contains(&code) {
        CountyStatus::InRun
    } else if fallback_enabled && used_fallback_codes.contains(&code) {
        CountyStatus::Fallback
    } else {
        CountyStatus::NoData
    }
}

impl MergeOutcome {
    pub fn status(&self, county_code: &str) -> CountyStatus {
        county_status(
            county_code,
            &self.selected_codes,
            &self.used_fallback_codes,
            self.fallback_enabled,
        )
    }
}

/// The national totals of a run, by decreasing share.
///
/// Shares are rounded to two decimals. Candidates with the same share keep
/// their order of first appearance.
pub fn national_summary(rows: &[ForecastRow]) -> Vec<CandidateSummary> {
    let totals = candidate_totals(rows);
    let total: u64 = totals
        .iter()
        .fold(0_u64, |acc, (_, _, v)| acc.saturating_add(*v));
    let mut res: Vec<CandidateSummary> = totals
        .into_iter()
        .map(|(name, party, votes)| CandidateSummary {
            name,
            party,
            votes,
            share: round_share(percent_of(votes as f64, total as f64)),
        })
        .collect();
    res.sort_by(|a, b| b.share.partial_cmp(&a.share).unwrap_or(Ordering::Equal));
    res
}

/// Builds the baseline of the scenarios from the rows of a run.
///
/// National votes include all the counties, including those outside of the
/// catalog. Every region of the catalog is present, even without data.
pub fn baseline_from_rows(rows: &[ForecastRow], catalog: &RegionCatalog) -> NationalBaseline {
    let national: Vec<(String, f64)> = candidate_totals(rows)
        .into_iter()
        .map(|(name, _, votes)| (name, votes as f64))
        .collect();

    let regions: Vec<RegionBaseline> = catalog
        .names()
        .into_iter()
        .map(|region| {
            let region_rows: Vec<ForecastRow> = rows
                .iter()
                .filter(|r| catalog.region_of(&r.county_code) == Some(region))
                .cloned()
                .collect();
            RegionBaseline {
                region: region.to_string(),
                votes: candidate_totals(&region_rows)
                    .into_iter()
                    .map(|(name, _, votes)| (name, votes as f64))
                    .collect(),
            }
        })
        .collect();

    NationalBaseline::from_votes(&national, regions)
}

/// Statistics of each region of the catalog for the county leaders of a run.
///
/// The leading party is the party with the most votes over the region, not the
/// one leading the most counties.
pub fn region_summaries(rows: &[ForecastRow], catalog: &RegionCatalog) -> Vec<RegionSummary> {
    let leaders = aggregate_counties(rows);
    catalog
        .names()
        .into_iter()
        .map(|region| {
            let region_rows: Vec<&ForecastRow> = rows
                .iter()
                .filter(|r| catalog.region_of(&r.county_code) == Some(region))
                .collect();
            let region_counties: BTreeSet<String> = region_rows
                .iter()
                .map(|r| normalize_county_code(&r.county_code))
                .collect();

            let mut party_votes: Vec<(String, u64)> = Vec::new();
            for r in region_rows.iter() {
                let party = party_label(&r.party);
                let votes = r.predicted_votes.unwrap_or(0);
                match party_votes.iter_mut().find(|(p, _)| *p == party) {
                    Some((_, v)) => *v = v.saturating_add(votes),
                    None => party_votes.push((party, votes)),
                }
            }
            let mut leading: Option<&(String, u64)> = None;
            for pv in party_votes.iter() {
                match leading {
                    Some((_, v)) if pv.1 <= *v => {}
                    _ => leading = Some(pv),
                }
            }
            let leading_party = leading.map(|(p, _)| p.clone());

            let wins = region_counties
                .iter()
                .filter_map(|code| leaders.get(code))
                .filter(|agg| Some(party_label(&agg.winner_party)) == leading_party)
                .count();
            let turnouts: Vec<f64> = region_counties
                .iter()
                .filter_map(|code| leaders.get(code).and_then(|agg| agg.turnout))
                .collect();
            let average_turnout = if turnouts.is_empty() {
                None
            } else {
                Some(turnouts.iter().sum::<f64>() / turnouts.len() as f64)
            };

            RegionSummary {
                region: region.to_string(),
                counties: region_counties.len(),
                leading_party,
                wins,
                total_votes: party_votes
                    .iter()
                    .fold(0_u64, |acc, (_, v)| acc.saturating_add(*v)),
                average_turnout,
            }
        })
        .collect()
}

fn party_label(party: &Option<String>) -> String {
    party.clone().unwrap_or_else(|| "Independent".to_string())
}

// (candidate, first party seen, total votes), in order of first appearance.
fn candidate_totals(rows: &[ForecastRow]) -> Vec<(String, Option<String>, u64)> {
    let mut res: Vec<(String, Option<String>, u64)> = Vec::new();
    for r in rows.iter() {
        let votes = r.predicted_votes.unwrap_or(0);
        match res.iter_mut().find(|(name, _, _)| *name == r.candidate) {
            Some((_, _, v)) => *v = v.saturating_add(votes),
            None => res.push((r.candidate.clone(), r.party.clone(), votes)),
        }
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn row(county: &str, candidate: &str, share: f64, turnout: Option<f64>) -> ForecastRow {
        ForecastRow {
            county_code: county.to_string(),
            county_name: None,
            candidate: candidate.to_string(),
            party: None,
            predicted_vote_share: share,
            predicted_turnout: turnout,
            predicted_votes: None,
        }
    }

    fn with_votes(mut r: ForecastRow, party: &str, votes: u64) -> ForecastRow {
        r.party = Some(party.to_string());
        r.predicted_votes = Some(votes);
        r
    }

    #[test]
    fn leader_per_county() {
        init();
        let rows = vec![
            row("01", "A", 40.0, None),
            row("02", "A", 70.0, Some(66.0)),
            row("01", "B", 55.0, Some(61.5)),
            row("01", "C", 5.0, Some(99.0)),
            row("02", "B", 30.0, Some(12.0)),
        ];
        let map = aggregate_counties(&rows);
        assert_eq!(map.len(), 2);
        let c1 = &map["1"];
        assert_eq!(c1.winner_candidate, "B");
        assert_eq!(c1.max_share, 55.0);
        assert_eq!(c1.turnout, Some(61.5));
        let c2 = &map["2"];
        assert_eq!(c2.winner_candidate, "A");
        assert_eq!(c2.turnout, Some(66.0));
    }

    #[test]
    fn first_row_wins_a_tie() {
        init();
        let rows = vec![
            row("07", "B", 48.0, None),
            row("07", "A", 48.0, None),
            row("07", "C", 4.0, None),
        ];
        for _ in 0..3 {
            assert_eq!(aggregate_counties(&rows)["7"].winner_candidate, "B");
        }
        let reversed: Vec<ForecastRow> = rows.iter().rev().cloned().collect();
        assert_eq!(aggregate_counties(&reversed)["7"].winner_candidate, "A");
    }

    #[test]
    fn turnout_stays_unset_without_data() {
        init();
        let map = aggregate_counties(&[row("09", "A", 60.0, None), row("09", "B", 40.0, None)]);
        assert_eq!(map["9"].turnout, None);
    }

    #[test]
    fn fallback_only_fills_gaps() {
        init();
        let selected = aggregate_counties(&[row("01", "A", 60.0, Some(70.0))]);
        let fallback = aggregate_counties(&[
            row("01", "Z", 90.0, Some(10.0)),
            row("03", "Z", 80.0, Some(50.0)),
        ]);
        let selected_codes: BTreeSet<String> =
            ["01", "02"].iter().map(|s| s.to_string()).collect();
        let (merged, used) = fallback_merge(&selected, &fallback, &selected_codes);
        assert_eq!(merged["1"], selected["1"]);
        assert_eq!(merged["3"], fallback["3"]);
        assert!(!merged.contains_key("2"));
        assert_eq!(used.into_iter().collect::<Vec<_>>(), vec!["3".to_string()]);
    }

    #[test]
    fn statuses() {
        init();
        let selected = vec![row("01", "A", 60.0, None)];
        let fallback = vec![row("01", "Z", 90.0, None), row("03", "Z", 80.0, None)];
        let outcome = merge_runs(&selected, Some(&fallback), true);
        assert_eq!(outcome.status("01"), CountyStatus::InRun);
        assert_eq!(outcome.status("03"), CountyStatus::Fallback);
        assert_eq!(outcome.status("04"), CountyStatus::NoData);
        assert_eq!(outcome.status("03").to_string(), "fallback");
        assert_eq!(outcome.merged.len(), 2);
        assert!(outcome.selected_codes.is_disjoint(&outcome.used_fallback_codes));

        let disabled = merge_runs(&selected, Some(&fallback), false);
        assert_eq!(disabled.status("03"), CountyStatus::NoData);
        assert_eq!(disabled.merged.len(), 1);

        let missing = merge_runs(&selected, None, true);
        assert_eq!(missing.status("03"), CountyStatus::NoData);
        assert!(missing.used_fallback_codes.is_empty());
    }

    #[test]
    fn leading_zeros_name_the_same_county() {
        init();
        let selected = vec![row("01", "A", 60.0, Some(70.0)), row("1", "B", 40.0, None)];
        let fallback = vec![row("1", "Z", 90.0, Some(10.0)), row("002", "Z", 80.0, None)];
        let outcome = merge_runs(&selected, Some(&fallback), true);
        assert_eq!(outcome.merged.keys().collect::<Vec<_>>(), vec!["1", "2"]);
        assert_eq!(outcome.merged["1"].winner_candidate, "A");
        assert_eq!(outcome.status("1"), CountyStatus::InRun);
        assert_eq!(outcome.status("01"), CountyStatus::InRun);
        assert_eq!(outcome.status("02"), CountyStatus::Fallback);
        assert!(outcome.selected_codes.is_disjoint(&outcome.used_fallback_codes));

        let coast = region_summaries(&selected, &RegionCatalog::kenya());
        assert_eq!(coast[5].region, "Coast");
        assert_eq!(coast[5].counties, 1);
    }

    #[test]
    fn status_without_merge() {
        let selected: BTreeSet<String> = ["1".to_string()].into_iter().collect();
        let used: BTreeSet<String> = ["2".to_string()].into_iter().collect();
        assert_eq!(county_status("01", &selected, &used, false), CountyStatus::InRun);
        assert_eq!(county_status("02", &selected, &used, true), CountyStatus::Fallback);
        assert_eq!(county_status("02", &selected, &used, false), CountyStatus::NoData);
        assert_eq!(CountyStatus::InRun.to_string(), "in run");
        assert_eq!(CountyStatus::NoData.to_string(), "no data");
    }

    fn national_rows() -> Vec<ForecastRow> {
        vec![
            with_votes(row("22", "Ruto", 70.0, Some(68.0)), "UDA", 700),
            with_votes(row("22", "Matiangi", 30.0, Some(68.0)), "Jubilee", 300),
            with_votes(row("45", "Ruto", 25.0, Some(60.0)), "UDA", 250),
            with_votes(row("45", "Matiangi", 75.0, Some(60.0)), "Jubilee", 750),
            with_votes(row("46", "Ruto", 45.0, None), "UDA", 450),
            with_votes(row("46", "Matiangi", 55.0, None), "Jubilee", 550),
            with_votes(row("99", "Ruto", 50.0, None), "UDA", 100),
        ]
    }

    #[test]
    fn national_summary_by_share() {
        init();
        let summary = national_summary(&national_rows());
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].name, "Matiangi");
        assert_eq!(summary[0].votes, 1_600);
        assert_eq!(summary[0].share, 51.61);
        assert_eq!(summary[1].name, "Ruto");
        assert_eq!(summary[1].party.as_deref(), Some("UDA"));
        assert_eq!(summary[1].votes, 1_500);
        assert_eq!(summary[1].share, 48.39);
        assert!(national_summary(&[]).is_empty());
    }

    #[test]
    fn baseline_from_a_run() {
        init();
        let baseline = baseline_from_rows(&national_rows(), &RegionCatalog::kenya());
        assert_eq!(baseline.candidates[0].name, "Ruto");
        assert_eq!(baseline.candidates[0].votes, 1_500.0);
        assert_eq!(baseline.total_votes(), 3_100.0);
        assert_eq!(baseline.regions.len(), 8);
        let mk = baseline.region("Mount Kenya").unwrap();
        assert_eq!(mk.votes, vec![("Ruto".to_string(), 700.0), ("Matiangi".to_string(), 300.0)]);
        let nyanza = baseline.region("Nyanza").unwrap();
        assert_eq!(nyanza.total_votes(), 2_000.0);
        assert!(baseline.region("Coast").unwrap().votes.is_empty());
    }

    #[test]
    fn region_statistics() {
        init();
        let summaries = region_summaries(&national_rows(), &RegionCatalog::kenya());
        assert_eq!(summaries.len(), 8);
        let nyanza = summaries.iter().find(|s| s.region == "Nyanza").unwrap();
        assert_eq!(nyanza.counties, 2);
        assert_eq!(nyanza.leading_party.as_deref(), Some("Jubilee"));
        assert_eq!(nyanza.wins, 2);
        assert_eq!(nyanza.total_votes, 2_000);
        assert_eq!(nyanza.average_turnout, Some(60.0));
        let mk = summaries.iter().find(|s| s.region == "Mount Kenya").unwrap();
        assert_eq!(mk.leading_party.as_deref(), Some("UDA"));
        assert_eq!(mk.wins, 1);
        let coast = summaries.iter().find(|s| s.region == "Coast").unwrap();
        assert_eq!(coast.counties, 0);
        assert_eq!(coast.leading_party, None);
        assert_eq!(coast.average_turnout, None);
    }
}
