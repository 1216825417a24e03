// ********* Input data structures ***********

use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::Display;

/// The votes entered for one candidate in one bloc, before normalization.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct BlocVotes {
    pub bloc: String,
    pub votes: u64,
}

/// A candidate of a county scenario, with the raw votes of each bloc.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CandidateBlocs {
    pub name: String,
    pub party: Option<String>,
    pub blocs: Vec<BlocVotes>,
}

impl CandidateBlocs {
    /// Saturates at `u64::MAX`.
    pub fn raw_total(&self) -> u64 {
        self.blocs
            .iter()
            .fold(0_u64, |acc, b| acc.saturating_add(b.votes))
    }
}

/// The inputs of the bloc normalizer.
///
/// The order of the candidates is significant: it is the order used to
/// report the results.
#[derive(PartialEq, Debug, Clone)]
pub struct ScenarioInput {
    pub registered_voters: u64,
    /// Turnout, in percent (0-100).
    pub turnout_percent: f64,
    pub candidates: Vec<CandidateBlocs>,
}

/// A candidate of a county scenario given directly as a predicted share.
#[derive(PartialEq, Debug, Clone)]
pub struct CandidateShare {
    pub name: String,
    pub party: Option<String>,
    pub share: f64,
}

#[derive(PartialEq, Debug, Clone)]
pub struct ShareScenarioInput {
    pub registered_voters: u64,
    pub turnout_percent: f64,
    pub candidates: Vec<CandidateShare>,
}

/// New vote shares for all the candidates of one region.
#[derive(PartialEq, Debug, Clone)]
pub struct RegionalAdjustment {
    pub region: String,
    /// (candidate name, share in percent), in slider order.
    pub shares: Vec<(String, f64)>,
}

impl RegionalAdjustment {
    pub fn new(region: &str, shares: &[(&str, f64)]) -> RegionalAdjustment {
        RegionalAdjustment {
            region: region.to_string(),
            shares: shares
                .iter()
                .map(|(name, share)| (name.to_string(), *share))
                .collect(),
        }
    }

    pub fn total_share(&self) -> f64 {
        self.shares.iter().map(|(_, s)| *s).sum()
    }

    pub fn share_of(&self, candidate: &str) -> Option<f64> {
        self.shares
            .iter()
            .find(|(name, _)| name == candidate)
            .map(|(_, s)| *s)
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct CandidateBaseline {
    pub name: String,
    pub votes: f64,
    /// The baseline share as published with the baseline, in percent.
    pub share: f64,
}

/// The baseline distribution of the votes inside one region.
#[derive(PartialEq, Debug, Clone)]
pub struct RegionBaseline {
    pub region: String,
    pub votes: Vec<(String, f64)>,
}

impl RegionBaseline {
    pub fn total_votes(&self) -> f64 {
        self.votes.iter().map(|(_, v)| *v).sum()
    }

    pub fn votes_of(&self, candidate: &str) -> Option<f64> {
        self.votes
            .iter()
            .find(|(name, _)| name == candidate)
            .map(|(_, v)| *v)
    }
}

/// The national forecast that all the scenarios start from.
///
/// It is never modified by a computation.
#[derive(PartialEq, Debug, Clone)]
pub struct NationalBaseline {
    pub candidates: Vec<CandidateBaseline>,
    pub regions: Vec<RegionBaseline>,
}

impl NationalBaseline {
    /// Builds a baseline in which the national shares are derived from the votes.
    pub fn from_votes(candidates: &[(String, f64)], regions: Vec<RegionBaseline>) -> NationalBaseline {
        let total: f64 = candidates.iter().map(|(_, v)| *v).sum();
        NationalBaseline {
            candidates: candidates
                .iter()
                .map(|(name, votes)| CandidateBaseline {
                    name: name.clone(),
                    votes: *votes,
                    share: crate::percent_of(*votes, total),
                })
                .collect(),
            regions,
        }
    }

    pub fn region(&self, name: &str) -> Option<&RegionBaseline> {
        self.regions.iter().find(|r| r.region == name)
    }

    pub fn total_votes(&self) -> f64 {
        self.candidates.iter().map(|c| c.votes).sum()
    }
}

/// One line of a forecast run, as exported by the forecasting service:
/// one candidate in one county.
#[derive(PartialEq, Debug, Clone)]
pub struct ForecastRow {
    pub county_code: String,
    pub county_name: Option<String>,
    pub candidate: String,
    pub party: Option<String>,
    pub predicted_vote_share: f64,
    pub predicted_turnout: Option<f64>,
    pub predicted_votes: Option<u64>,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum RunVisibility {
    Draft,
    Published,
    Archived,
}

/// The description of a forecast run (not its content).
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ForecastRun {
    pub id: String,
    /// ISO-8601 timestamp. Timestamps are compared as text.
    pub run_timestamp: String,
    pub is_official: bool,
    pub visibility: RunVisibility,
    pub election_year: Option<u32>,
    pub election_type: Option<String>,
}

// ******** Output data structures *********

/// The candidate in first position, or a tie between several candidates.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum Leader {
    Candidate(String),
    Tie,
}

impl Leader {
    pub fn name(&self) -> &str {
        match self {
            Leader::Candidate(name) => name.as_str(),
            Leader::Tie => "Tie",
        }
    }
}

impl Display for Leader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct ProjectedCandidate {
    pub name: String,
    pub party: Option<String>,
    /// The votes as entered (0 when the candidate was given as a share).
    pub raw_votes: u64,
    pub votes: u64,
    pub share: f64,
    pub lower_bound_90: f64,
    pub upper_bound_90: f64,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ProjectedBloc {
    pub bloc: String,
    pub candidate: String,
    pub raw_votes: u64,
    pub scaled_votes: u64,
}

#[derive(PartialEq, Debug, Clone)]
pub struct NormalizedProjection {
    pub turnout_target: u64,
    pub total_raw: u64,
    /// None when the candidates were given as shares.
    pub scale: Option<f64>,
    pub candidates: Vec<ProjectedCandidate>,
    pub blocs: Vec<ProjectedBloc>,
    pub winner: Leader,
    /// In percentage points.
    pub margin: f64,
}

impl NormalizedProjection {
    pub fn candidate(&self, name: &str) -> Option<&ProjectedCandidate> {
        self.candidates.iter().find(|c| c.name == name)
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct CandidateOutcome {
    pub name: String,
    pub new_votes: f64,
    pub new_share: f64,
    pub original_votes: f64,
    pub original_share: f64,
    /// new_share - original_share
    pub delta: f64,
}

#[derive(PartialEq, Debug, Clone)]
pub struct RegionCandidateChange {
    pub name: String,
    pub original_votes: f64,
    pub original_share: f64,
    pub adjusted_votes: f64,
    pub adjusted_share: f64,
    pub vote_delta: f64,
    pub share_delta: f64,
}

#[derive(PartialEq, Debug, Clone)]
pub struct RegionBreakdown {
    pub region: String,
    pub total_votes: f64,
    pub candidates: Vec<RegionCandidateChange>,
}

impl RegionBreakdown {
    pub fn candidate(&self, name: &str) -> Option<&RegionCandidateChange> {
        self.candidates.iter().find(|c| c.name == name)
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub description: Option<String>,
    pub candidates: Vec<CandidateOutcome>,
    pub winner: Leader,
    pub margin: f64,
    /// Only the regions that received an adjustment.
    pub regions: Vec<RegionBreakdown>,
    pub total_votes_original: f64,
    pub total_votes_adjusted: f64,
}

impl ScenarioResult {
    pub fn candidate(&self, name: &str) -> Option<&CandidateOutcome> {
        self.candidates.iter().find(|c| c.name == name)
    }

    /// A SHA-256 digest of the complete content of the result.
    ///
    /// Two results computed from the same inputs have the same fingerprint.
    pub fn fingerprint(&self) -> String {
        sha256::digest(format!("{:?}", self))
    }
}

/// The outcome of checking a scenario before running it.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub adjustments_count: usize,
    /// Regions named by the adjustments, in order of first appearance.
    pub regions_affected: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A county projected under a scenario, ready to be saved as a run.
#[derive(PartialEq, Debug, Clone)]
pub struct CountyProjection {
    pub county_code: String,
    pub region: Option<String>,
    pub adjusted: bool,
    pub turnout: Option<f64>,
    /// Implied by the baseline votes of the county and its turnout. None
    /// without a usable turnout.
    pub registered_voters: Option<u64>,
    pub candidates: Vec<ProjectedCountyCandidate>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct ProjectedCountyCandidate {
    pub name: String,
    pub party: Option<String>,
    pub votes: u64,
    pub share: f64,
}

#[derive(PartialEq, Debug, Clone)]
pub struct CountyAggregate {
    pub winner_candidate: String,
    pub winner_party: Option<String>,
    pub turnout: Option<f64>,
    pub max_share: f64,
}

pub type CountyMap = BTreeMap<String, CountyAggregate>;

/// Where the data displayed for a county comes from.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum CountyStatus {
    InRun,
    Fallback,
    NoData,
}

impl Display for CountyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CountyStatus::InRun => "in run",
            CountyStatus::Fallback => "fallback",
            CountyStatus::NoData => "no data",
        };
        write!(f, "{}", s)
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct MergeOutcome {
    pub merged: CountyMap,
    pub selected_codes: BTreeSet<String>,
    pub used_fallback_codes: BTreeSet<String>,
    pub fallback_enabled: bool,
}

#[derive(PartialEq, Debug, Clone)]
pub struct CandidateSummary {
    pub name: String,
    pub party: Option<String>,
    pub votes: u64,
    pub share: f64,
}

#[derive(PartialEq, Debug, Clone)]
pub struct RegionSummary {
    pub region: String,
    pub counties: usize,
    pub leading_party: Option<String>,
    pub wins: usize,
    pub total_votes: u64,
    pub average_turnout: Option<f64>,
}

/// Errors that prevent a computation from completing.
#[derive(PartialEq, Debug, Clone)]
pub enum ScenarioErrors {
    /// The inputs were rejected. Nothing was computed.
    InvalidScenario(Vec<String>),
    NoForecastRun,
}

impl Error for ScenarioErrors {}

impl Display for ScenarioErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScenarioErrors::InvalidScenario(errors) => {
                write!(f, "Invalid scenario: {}", errors.join("; "))
            }
            ScenarioErrors::NoForecastRun => write!(f, "No forecast run found"),
        }
    }
}

// ********* Configuration **********

#[derive(PartialEq, Debug, Clone)]
pub struct ScenarioRules {
    /// Allowed distance between the sum of the shares of a region and 100.
    pub share_tolerance: f64,
    pub max_name_length: usize,
    /// Half width of the 90% band reported around each projected share.
    pub confidence_half_width: f64,
}

impl ScenarioRules {
    pub const DEFAULT_RULES: ScenarioRules = ScenarioRules {
        share_tolerance: 0.1,
        max_name_length: 100,
        confidence_half_width: 3.0,
    };
}

impl Default for ScenarioRules {
    fn default() -> Self {
        ScenarioRules::DEFAULT_RULES
    }
}
