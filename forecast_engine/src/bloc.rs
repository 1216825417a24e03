use log::{debug, info};

use crate::config::*;
use crate::{percent_of, standings};

/// The number of voters implied by the turnout.
///
/// The turnout is brought back into 0-100 (NaN counts as 0).
pub fn turnout_target(registered_voters: u64, turnout_percent: f64) -> u64 {
    let turnout = if turnout_percent.is_nan() {
        0.0
    } else {
        turnout_percent.clamp(0.0, 100.0)
    };
    (registered_voters as f64 * turnout / 100.0).round() as u64
}

/// Scales the votes entered for each bloc so that they add up to the turnout
/// target, keeping the proportions between the candidates.
///
/// The projected votes of a candidate are rounded from the candidate's raw
/// total. The scaled votes of the blocs are only informative and may not add
/// up exactly to the candidate's projected votes.
///
/// This never fails: without raw votes or without voters, all the shares are
/// zero and the winner is a tie.
pub fn normalize_blocs(input: &ScenarioInput, rules: &ScenarioRules) -> NormalizedProjection {
    let target = turnout_target(input.registered_voters, input.turnout_percent);
    // The reported total saturates; the scale is taken from the exact sum.
    let total_raw: u64 = input
        .candidates
        .iter()
        .fold(0_u64, |acc, c| acc.saturating_add(c.raw_total()));
    let total_raw_f: f64 = input.candidates.iter().map(|c| c.raw_total() as f64).sum();
    let scale = if total_raw > 0 {
        target as f64 / total_raw_f
    } else {
        0.0
    };
    info!(
        "normalize_blocs: {} candidates, turnout target {} from {} raw votes (scale {})",
        input.candidates.len(),
        target,
        total_raw,
        scale
    );

    let mut candidates: Vec<ProjectedCandidate> = Vec::new();
    let mut blocs: Vec<ProjectedBloc> = Vec::new();
    for c in input.candidates.iter() {
        let raw_votes = c.raw_total();
        let votes = (raw_votes as f64 * scale).round() as u64;
        let share = if target > 0 {
            percent_of(votes as f64, target as f64)
        } else {
            0.0
        };
        debug!(
            "normalize_blocs: {}: raw {} -> {} ({}%)",
            c.name, raw_votes, votes, share
        );
        candidates.push(projected_candidate(
            &c.name,
            &c.party,
            raw_votes,
            votes,
            share,
            rules,
        ));
        for b in c.blocs.iter() {
            blocs.push(ProjectedBloc {
                bloc: b.bloc.clone(),
                candidate: c.name.clone(),
                raw_votes: b.votes,
                scaled_votes: (b.votes as f64 * scale).round() as u64,
            });
        }
    }

    let (winner, margin) = leader_of(&candidates);
    NormalizedProjection {
        turnout_target: target,
        total_raw,
        scale: Some(scale),
        candidates,
        blocs,
        winner,
        margin,
    }
}

/// Projects candidates given directly as shares of the turnout target.
///
/// The shares are kept as stated. Negative or non-numeric shares are rejected.
pub fn project_from_shares(
    input: &ShareScenarioInput,
    rules: &ScenarioRules,
) -> Result<NormalizedProjection, ScenarioErrors> {
    let errors: Vec<String> = input
        .candidates
        .iter()
        .filter(|c| !(c.share.is_finite() && c.share >= 0.0))
        .map(|c| {
            format!(
                "predicted_vote_share must be >= 0, got {} for {}",
                c.share, c.name
            )
        })
        .collect();
    if !errors.is_empty() {
        return Err(ScenarioErrors::InvalidScenario(errors));
    }

    let target = turnout_target(input.registered_voters, input.turnout_percent);
    info!(
        "project_from_shares: {} candidates, turnout target {}",
        input.candidates.len(),
        target
    );
    let candidates: Vec<ProjectedCandidate> = input
        .candidates
        .iter()
        .map(|c| {
            let votes = (target as f64 * c.share / 100.0).round() as u64;
            projected_candidate(&c.name, &c.party, 0, votes, c.share, rules)
        })
        .collect();

    let (winner, margin) = leader_of(&candidates);
    Ok(NormalizedProjection {
        turnout_target: target,
        total_raw: 0,
        scale: None,
        candidates,
        blocs: Vec::new(),
        winner,
        margin,
    })
}

fn projected_candidate(
    name: &str,
    party: &Option<String>,
    raw_votes: u64,
    votes: u64,
    share: f64,
    rules: &ScenarioRules,
) -> ProjectedCandidate {
    ProjectedCandidate {
        name: name.to_string(),
        party: party.clone(),
        raw_votes,
        votes,
        share,
        lower_bound_90: (share - rules.confidence_half_width).max(0.0),
        upper_bound_90: (share + rules.confidence_half_width).min(100.0),
    }
}

fn leader_of(candidates: &[ProjectedCandidate]) -> (Leader, f64) {
    let shares: Vec<(&str, f64)> = candidates
        .iter()
        .map(|c| (c.name.as_str(), c.share))
        .collect();
    standings(&shares)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn candidate(name: &str, blocs: &[(&str, u64)]) -> CandidateBlocs {
        CandidateBlocs {
            name: name.to_string(),
            party: None,
            blocs: blocs
                .iter()
                .map(|(bloc, votes)| BlocVotes {
                    bloc: bloc.to_string(),
                    votes: *votes,
                })
                .collect(),
        }
    }

    fn input(registered_voters: u64, turnout_percent: f64, candidates: Vec<CandidateBlocs>) -> ScenarioInput {
        ScenarioInput {
            registered_voters,
            turnout_percent,
            candidates,
        }
    }

    #[test]
    fn scales_to_turnout_target() {
        init();
        let p = normalize_blocs(
            &input(
                100_000,
                60.0,
                vec![candidate("A", &[("north", 50_000)]), candidate("B", &[("north", 15_000)])],
            ),
            &ScenarioRules::DEFAULT_RULES,
        );
        assert_eq!(p.turnout_target, 60_000);
        assert_eq!(p.total_raw, 65_000);
        assert!((p.scale.unwrap() - 0.923077).abs() < 1e-6);
        let a = p.candidate("A").unwrap();
        let b = p.candidate("B").unwrap();
        assert_eq!(a.votes, 46_154);
        assert_eq!(b.votes, 13_846);
        assert!((a.share - 76.923).abs() < 1e-3);
        assert!((b.share - 23.077).abs() < 1e-3);
        assert_eq!(p.winner, Leader::Candidate("A".to_string()));
        assert!((p.margin - 53.846).abs() < 1e-3);
        assert!((p.margin - (a.share - b.share).abs()).abs() < 1e-12);
    }

    #[test]
    fn sums_the_blocs_of_a_candidate() {
        init();
        let p = normalize_blocs(
            &input(
                637_000,
                60.0,
                vec![
                    candidate("Machogu", &[("nyaribari", 50_000), ("kitutu", 40_000), ("bobasi", 0)]),
                    candidate("Arati", &[("nyaribari", 15_000), ("kitutu", 10_000), ("bobasi", 40_000)]),
                ],
            ),
            &ScenarioRules::DEFAULT_RULES,
        );
        assert_eq!(p.turnout_target, 382_200);
        assert_eq!(p.total_raw, 155_000);
        assert_eq!(p.candidate("Machogu").unwrap().raw_votes, 90_000);
        assert_eq!(p.candidate("Machogu").unwrap().votes, 221_923);
        assert_eq!(p.candidate("Arati").unwrap().votes, 160_277);
        assert_eq!(p.blocs.len(), 6);
        assert_eq!(p.blocs[0].bloc, "nyaribari");
        assert_eq!(p.blocs[0].scaled_votes, 123_290);
        assert_eq!(p.blocs[2].scaled_votes, 0);
    }

    #[test]
    fn zero_raw_votes_is_a_tie() {
        init();
        let p = normalize_blocs(
            &input(
                100_000,
                60.0,
                vec![candidate("A", &[("north", 0)]), candidate("B", &[])],
            ),
            &ScenarioRules::DEFAULT_RULES,
        );
        assert_eq!(p.scale, Some(0.0));
        assert!(p.candidates.iter().all(|c| c.votes == 0 && c.share == 0.0));
        assert_eq!(p.winner, Leader::Tie);
        assert_eq!(p.margin, 0.0);
    }

    #[test]
    fn huge_raw_votes_do_not_overflow() {
        init();
        let half = u64::MAX / 2 + 1;
        let p = normalize_blocs(
            &input(
                1_000,
                50.0,
                vec![candidate("A", &[("north", half)]), candidate("B", &[("north", half)])],
            ),
            &ScenarioRules::DEFAULT_RULES,
        );
        assert_eq!(p.total_raw, u64::MAX);
        assert_eq!(p.turnout_target, 500);
        assert_eq!(p.candidates[0].votes, 250);
        assert_eq!(p.candidates[1].votes, 250);
        assert_eq!(p.blocs[0].scaled_votes, 250);
        assert_eq!(p.winner, Leader::Tie);

        let heavy = candidate("C", &[("north", u64::MAX), ("south", u64::MAX)]);
        assert_eq!(heavy.raw_total(), u64::MAX);
    }

    #[test]
    fn zero_turnout_is_a_tie() {
        init();
        let p = normalize_blocs(
            &input(
                100_000,
                0.0,
                vec![candidate("A", &[("north", 10)]), candidate("B", &[("north", 5)])],
            ),
            &ScenarioRules::DEFAULT_RULES,
        );
        assert_eq!(p.turnout_target, 0);
        assert!(p.candidates.iter().all(|c| c.share == 0.0));
        assert_eq!(p.winner, Leader::Tie);
    }

    #[test]
    fn equal_votes_is_a_tie() {
        init();
        let p = normalize_blocs(
            &input(
                1_000,
                50.0,
                vec![candidate("A", &[("north", 10)]), candidate("B", &[("south", 10)])],
            ),
            &ScenarioRules::DEFAULT_RULES,
        );
        assert_eq!(p.candidate("A").unwrap().votes, 250);
        assert_eq!(p.winner, Leader::Tie);
        assert_eq!(p.winner.to_string(), "Tie");
    }

    #[test]
    fn turnout_is_clamped() {
        assert_eq!(turnout_target(1_000, 150.0), 1_000);
        assert_eq!(turnout_target(1_000, -5.0), 0);
        assert_eq!(turnout_target(1_000, f64::NAN), 0);
        assert_eq!(turnout_target(637_000, 60.0), 382_200);
        assert_eq!(turnout_target(3, 50.0), 2);
    }

    #[test]
    fn recomputing_gives_the_same_projection() {
        init();
        let i = input(
            250_000,
            71.3,
            vec![candidate("A", &[("x", 1_234), ("y", 777)]), candidate("B", &[("x", 999)])],
        );
        let p1 = normalize_blocs(&i, &ScenarioRules::DEFAULT_RULES);
        let p2 = normalize_blocs(&i, &ScenarioRules::DEFAULT_RULES);
        assert_eq!(p1, p2);
    }

    #[test]
    fn confidence_band_is_bounded() {
        init();
        let p = normalize_blocs(
            &input(
                100,
                100.0,
                vec![candidate("A", &[("x", 99)]), candidate("B", &[("x", 1)])],
            ),
            &ScenarioRules::DEFAULT_RULES,
        );
        let a = p.candidate("A").unwrap();
        let b = p.candidate("B").unwrap();
        assert_eq!(a.upper_bound_90, 100.0);
        assert_eq!(a.lower_bound_90, 96.0);
        assert_eq!(b.lower_bound_90, 0.0);
        assert_eq!(b.upper_bound_90, 4.0);
    }

    #[test]
    fn shares_are_projected_on_the_target() {
        init();
        let p = project_from_shares(
            &ShareScenarioInput {
                registered_voters: 100_000,
                turnout_percent: 50.0,
                candidates: vec![
                    CandidateShare {
                        name: "A".to_string(),
                        party: Some("UDA".to_string()),
                        share: 55.5,
                    },
                    CandidateShare {
                        name: "B".to_string(),
                        party: Some("ODM".to_string()),
                        share: 44.5,
                    },
                ],
            },
            &ScenarioRules::DEFAULT_RULES,
        )
        .unwrap();
        assert_eq!(p.scale, None);
        assert_eq!(p.candidate("A").unwrap().votes, 27_750);
        assert_eq!(p.candidate("B").unwrap().votes, 22_250);
        assert_eq!(p.candidate("A").unwrap().share, 55.5);
        assert_eq!(p.winner, Leader::Candidate("A".to_string()));
        assert!((p.margin - 11.0).abs() < 1e-9);
    }

    #[test]
    fn negative_share_is_rejected() {
        init();
        let res = project_from_shares(
            &ShareScenarioInput {
                registered_voters: 100,
                turnout_percent: 50.0,
                candidates: vec![CandidateShare {
                    name: "A".to_string(),
                    party: None,
                    share: -1.0,
                }],
            },
            &ScenarioRules::DEFAULT_RULES,
        );
        assert!(matches!(res, Err(ScenarioErrors::InvalidScenario(errs)) if errs.len() == 1));
    }
}
