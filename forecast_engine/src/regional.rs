use log::{debug, info, warn};

use std::collections::HashMap;

use crate::config::*;
use crate::regions::{normalize_county_code, RegionCatalog};
use crate::{percent_of, standings};

/// Checks a scenario against the baseline before running it.
///
/// Errors make the scenario unusable. Warnings do not: a region adjusted more
/// than once only keeps its last adjustment.
pub fn validate_scenario(
    baseline: &NationalBaseline,
    name: &str,
    adjustments: &[RegionalAdjustment],
    rules: &ScenarioRules,
) -> ValidationReport {
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    if name.trim().is_empty() {
        errors.push("Scenario name is required".to_string());
    } else if name.chars().count() > rules.max_name_length {
        errors.push(format!(
            "Scenario name must be {} characters or less",
            rules.max_name_length
        ));
    }

    if adjustments.is_empty() {
        errors.push("At least one regional adjustment is required".to_string());
    }

    let valid_regions: Vec<&str> = baseline.regions.iter().map(|r| r.region.as_str()).collect();
    for (idx, adj) in adjustments.iter().enumerate() {
        let num = idx + 1;
        if baseline.region(&adj.region).is_none() {
            errors.push(format!(
                "Adjustment {}: Invalid region '{}'. Valid regions: {}",
                num,
                adj.region,
                valid_regions.join(", ")
            ));
        }

        let total = adj.total_share();
        // Written this way so that a NaN total is rejected.
        if !((total - 100.0).abs() <= rules.share_tolerance) {
            errors.push(format!(
                "Adjustment {} ({}): Candidate shares must sum to 100%, got {:.1}%",
                num, adj.region, total
            ));
        }

        for (candidate, share) in adj.shares.iter() {
            if !share.is_finite() {
                errors.push(format!(
                    "Adjustment {} ({}): Invalid share for {}: {}",
                    num, adj.region, candidate, share
                ));
            } else if *share < 0.0 {
                errors.push(format!(
                    "Adjustment {} ({}): Negative share for {}: {}%",
                    num, adj.region, candidate, share
                ));
            } else if *share > 100.0 {
                errors.push(format!(
                    "Adjustment {} ({}): Share for {} exceeds 100%: {}%",
                    num, adj.region, candidate, share
                ));
            }
        }
    }

    let mut regions_affected: Vec<String> = Vec::new();
    let mut duplicates: Vec<String> = Vec::new();
    for adj in adjustments.iter() {
        if !regions_affected.contains(&adj.region) {
            regions_affected.push(adj.region.clone());
        } else if !duplicates.contains(&adj.region) {
            duplicates.push(adj.region.clone());
        }
    }
    if !duplicates.is_empty() {
        warnings.push(format!(
            "Duplicate regions found: {}. Only the last adjustment for each region will be used.",
            duplicates.join(", ")
        ));
    }

    ValidationReport {
        errors,
        warnings,
        adjustments_count: adjustments.len(),
        regions_affected,
    }
}

/// Applies new regional shares to the national baseline.
///
/// The votes of an adjusted region are replaced by `region total × share / 100`
/// for every candidate (a candidate without a share gets nothing). The other
/// regions, and the votes outside of any region, are left as in the baseline.
///
/// Nothing is computed if the scenario does not validate. The baseline is
/// never modified, so running the same scenario twice gives the same result.
pub fn redistribute(
    baseline: &NationalBaseline,
    name: &str,
    description: Option<&str>,
    adjustments: &[RegionalAdjustment],
    rules: &ScenarioRules,
) -> Result<ScenarioResult, ScenarioErrors> {
    let report = validate_scenario(baseline, name, adjustments, rules);
    for w in report.warnings.iter() {
        warn!("redistribute: {}", w);
    }
    if !report.is_valid() {
        info!("redistribute: rejected scenario {:?}: {:?}", name, report.errors);
        return Err(ScenarioErrors::InvalidScenario(report.errors));
    }
    info!(
        "redistribute: scenario {:?}, {} adjustments over {} regions",
        name,
        adjustments.len(),
        report.regions_affected.len()
    );

    let mut national: Vec<(String, f64)> = baseline
        .candidates
        .iter()
        .map(|c| (c.name.clone(), c.votes))
        .collect();
    let mut breakdowns: Vec<RegionBreakdown> = Vec::new();

    for adj in effective_adjustments(adjustments) {
        let region = match baseline.region(&adj.region) {
            Some(r) => r,
            None => {
                return Err(ScenarioErrors::InvalidScenario(vec![format!(
                    "Invalid region '{}'",
                    adj.region
                )]))
            }
        };
        let breakdown = adjust_region(region, adj);
        for c in breakdown.candidates.iter() {
            add_votes(&mut national, &c.name, c.vote_delta);
        }
        debug!("redistribute: region breakdown: {:?}", breakdown);
        breakdowns.push(breakdown);
    }

    for (name, votes) in national.iter_mut() {
        if *votes < 0.0 {
            warn!(
                "redistribute: {} would get {} votes, the regions of the baseline exceed its national total",
                name, votes
            );
            *votes = 0.0;
        }
    }

    let total_votes_adjusted: f64 = national.iter().map(|(_, v)| *v).sum();
    let candidates: Vec<CandidateOutcome> = national
        .iter()
        .map(|(name, votes)| {
            let (original_votes, original_share) = baseline
                .candidates
                .iter()
                .find(|c| c.name == *name)
                .map(|c| (c.votes, c.share))
                .unwrap_or((0.0, 0.0));
            let new_share = percent_of(*votes, total_votes_adjusted);
            CandidateOutcome {
                name: name.clone(),
                new_votes: *votes,
                new_share,
                original_votes,
                original_share,
                delta: new_share - original_share,
            }
        })
        .collect();

    let shares: Vec<(&str, f64)> = candidates
        .iter()
        .map(|c| (c.name.as_str(), c.new_share))
        .collect();
    let (winner, margin) = standings(&shares);
    info!("redistribute: winner {} by {} points", winner, margin);

    Ok(ScenarioResult {
        scenario_name: name.to_string(),
        description: description.map(|d| d.to_string()),
        candidates,
        winner,
        margin,
        regions: breakdowns,
        total_votes_original: baseline.total_votes(),
        total_votes_adjusted,
    })
}

/// Projects the regional adjustments onto each county of the baseline rows.
///
/// In an adjusted region, each candidate of a county receives
/// `county total × share / 100` votes, truncated. The other counties keep
/// their votes. Shares are recomputed from the votes of the county.
/// Counties are returned in order of first appearance, under their
/// normalized code.
pub fn redistribute_counties(
    rows: &[ForecastRow],
    catalog: &RegionCatalog,
    adjustments: &[RegionalAdjustment],
) -> Vec<CountyProjection> {
    let effective = effective_adjustments(adjustments);
    let mut order: Vec<String> = Vec::new();
    let mut by_county: HashMap<String, Vec<&ForecastRow>> = HashMap::new();
    for row in rows.iter() {
        let code = normalize_county_code(&row.county_code);
        let entry = by_county.entry(code.clone()).or_insert_with(|| {
            order.push(code);
            Vec::new()
        });
        entry.push(row);
    }

    let mut res: Vec<CountyProjection> = Vec::new();
    for code in order {
        let county_rows = &by_county[&code];
        let region = catalog.region_of(&code).map(|r| r.to_string());
        let adjustment = region
            .as_deref()
            .and_then(|r| effective.iter().find(|a| a.region == r));
        let county_total: u64 = county_rows
            .iter()
            .filter_map(|r| r.predicted_votes)
            .fold(0_u64, |acc, v| acc.saturating_add(v));

        let votes: Vec<u64> = county_rows
            .iter()
            .map(|r| match adjustment {
                Some(adj) => {
                    let share = adj.share_of(&r.candidate).unwrap_or(0.0);
                    (county_total as f64 * share / 100.0) as u64
                }
                None => r.predicted_votes.unwrap_or(0),
            })
            .collect();
        let new_total: u64 = votes.iter().fold(0_u64, |acc, v| acc.saturating_add(*v));

        let turnout = county_rows.iter().find_map(|r| r.predicted_turnout);
        res.push(CountyProjection {
            county_code: code.to_string(),
            region,
            adjusted: adjustment.is_some(),
            turnout,
            registered_voters: implied_registered_voters(county_total, turnout),
            candidates: county_rows
                .iter()
                .zip(votes.iter())
                .map(|(r, v)| ProjectedCountyCandidate {
                    name: r.candidate.clone(),
                    party: r.party.clone(),
                    votes: *v,
                    share: percent_of(*v as f64, new_total as f64),
                })
                .collect(),
        });
    }
    res
}

/// The voters registered in a county, from its votes and turnout (0-100].
pub fn implied_registered_voters(votes: u64, turnout_percent: Option<f64>) -> Option<u64> {
    match turnout_percent {
        Some(t) if t.is_finite() && t > 0.0 && t <= 100.0 => {
            Some((votes as f64 * 100.0 / t).round() as u64)
        }
        _ => None,
    }
}

/// The adjustments to apply: one per region, the last one given for this
/// region, at the position where the region first appeared.
pub(crate) fn effective_adjustments(adjustments: &[RegionalAdjustment]) -> Vec<&RegionalAdjustment> {
    let mut res: Vec<&RegionalAdjustment> = Vec::new();
    for adj in adjustments.iter() {
        if let Some(pos) = res.iter().position(|a| a.region == adj.region) {
            res[pos] = adj;
        } else {
            res.push(adj);
        }
    }
    res
}

fn adjust_region(region: &RegionBaseline, adj: &RegionalAdjustment) -> RegionBreakdown {
    let total = region.total_votes();
    // The candidates of the region, then those only named by the adjustment.
    let mut names: Vec<&str> = region.votes.iter().map(|(name, _)| name.as_str()).collect();
    for (name, _) in adj.shares.iter() {
        if !names.contains(&name.as_str()) {
            names.push(name.as_str());
        }
    }

    let candidates = names
        .iter()
        .map(|name| {
            let original_votes = region.votes_of(name).unwrap_or(0.0);
            let original_share = percent_of(original_votes, total);
            let adjusted_share = adj.share_of(name).unwrap_or(0.0);
            let adjusted_votes = total * adjusted_share / 100.0;
            RegionCandidateChange {
                name: name.to_string(),
                original_votes,
                original_share,
                adjusted_votes,
                adjusted_share,
                vote_delta: adjusted_votes - original_votes,
                share_delta: adjusted_share - original_share,
            }
        })
        .collect();

    RegionBreakdown {
        region: region.region.clone(),
        total_votes: total,
        candidates,
    }
}

fn add_votes(national: &mut Vec<(String, f64)>, name: &str, delta: f64) {
    if let Some((_, votes)) = national.iter_mut().find(|(n, _)| n == name) {
        *votes += delta;
    } else {
        national.push((name.to_string(), delta));
    }
}
