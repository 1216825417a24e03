//! Scenario projections and forecast aggregation for election forecasts.
//!
//! The crate has three entry points, all pure functions of their inputs:
//! - [normalize_blocs] scales the votes entered for named blocs to the number
//!   of voters implied by the turnout,
//! - [redistribute] applies new regional vote shares to a national baseline,
//! - [aggregate_counties] and [fallback_merge] reduce the rows of forecast runs
//!   to a county map, filling the gaps of a selected run with another run.
//!
//! Every computation starts again from the original inputs. Nothing is cached
//! between calls.
mod aggregate;
mod bloc;
pub mod builder;
mod config;
pub mod manual;
mod regional;
mod regions;
mod runs;

pub use crate::aggregate::*;
pub use crate::bloc::*;
pub use crate::config::*;
pub use crate::regional::*;
pub use crate::regions::*;
pub use crate::runs::*;

/// Rounds a share to two decimals, the precision used by the forecasting service.
pub fn round_share(share: f64) -> f64 {
    (share * 100.0).round() / 100.0
}

// Zero totals give zero shares.
pub(crate) fn percent_of(part: f64, total: f64) -> f64 {
    if total > 0.0 {
        part / total * 100.0
    } else {
        0.0
    }
}

/// Finds the leader and the margin (in points) over the runner-up.
///
/// The shares are inspected in order. A maximum shared by two candidates or
/// more is a tie, as is a maximum of zero.
pub(crate) fn standings(shares: &[(&str, f64)]) -> (Leader, f64) {
    let mut best: Option<(usize, f64)> = None;
    for (idx, (_, share)) in shares.iter().enumerate() {
        match best {
            Some((_, best_share)) if *share <= best_share => {}
            _ => best = Some((idx, *share)),
        }
    }
    let (winner_idx, winner_share) = match best {
        Some((idx, share)) if share > 0.0 => (idx, share),
        _ => return (Leader::Tie, 0.0),
    };
    let num_at_max = shares.iter().filter(|(_, s)| *s == winner_share).count();
    if num_at_max > 1 {
        return (Leader::Tie, 0.0);
    }
    let runner_up = shares
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != winner_idx)
        .map(|(_, (_, s))| *s)
        .fold(0.0_f64, f64::max);
    (
        Leader::Candidate(shares[winner_idx].0.to_string()),
        winner_share - runner_up,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standings_single_leader() {
        let (leader, margin) = standings(&[("A", 40.0), ("B", 55.0), ("C", 5.0)]);
        assert_eq!(leader, Leader::Candidate("B".to_string()));
        assert_eq!(margin, 15.0);
    }

    #[test]
    fn standings_tie_at_the_top() {
        let (leader, margin) = standings(&[("A", 45.0), ("B", 45.0), ("C", 10.0)]);
        assert_eq!(leader, Leader::Tie);
        assert_eq!(margin, 0.0);
    }

    #[test]
    fn standings_lone_candidate() {
        let (leader, margin) = standings(&[("A", 100.0)]);
        assert_eq!(leader, Leader::Candidate("A".to_string()));
        assert_eq!(margin, 100.0);
    }

    #[test]
    fn standings_all_zero() {
        assert_eq!(standings(&[("A", 0.0)]), (Leader::Tie, 0.0));
        assert_eq!(standings(&[]), (Leader::Tie, 0.0));
    }

    #[test]
    fn rounding_shares() {
        assert_eq!(round_share(76.923333), 76.92);
        assert_eq!(round_share(53.846667), 53.85);
        assert_eq!(percent_of(5.0, 0.0), 0.0);
    }
}
