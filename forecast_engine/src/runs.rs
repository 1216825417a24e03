use log::debug;

use crate::config::*;

/// Finds the run to display for an election.
///
/// With `prefer_official`, the newest official run is taken first, whatever
/// its visibility. Then comes the newest published run, then the newest run of
/// any kind. Runs are ordered by timestamp; among runs with the same timestamp
/// the first one in the list is kept.
pub fn latest_run<'a>(
    runs: &'a [ForecastRun],
    election_year: Option<u32>,
    election_type: Option<&str>,
    prefer_official: bool,
) -> Result<&'a ForecastRun, ScenarioErrors> {
    let candidates: Vec<&ForecastRun> = runs
        .iter()
        .filter(|r| election_year.map_or(true, |y| r.election_year == Some(y)))
        .filter(|r| election_type.map_or(true, |t| r.election_type.as_deref() == Some(t)))
        .collect();
    debug!(
        "latest_run: {} runs out of {} for year {:?} and type {:?}",
        candidates.len(),
        runs.len(),
        election_year,
        election_type
    );

    let tiers: &[fn(&ForecastRun) -> bool] = if prefer_official {
        &[is_official, is_published, any_run]
    } else {
        &[is_published, any_run]
    };
    for tier in tiers.iter() {
        if let Some(run) = newest(candidates.iter().copied().filter(|r| tier(r))) {
            debug!("latest_run: selected {}", run.id);
            return Ok(run);
        }
    }
    Err(ScenarioErrors::NoForecastRun)
}

fn is_official(run: &ForecastRun) -> bool {
    run.is_official
}

fn is_published(run: &ForecastRun) -> bool {
    run.visibility == RunVisibility::Published
}

fn any_run(_: &ForecastRun) -> bool {
    true
}

fn newest<'a>(runs: impl Iterator<Item = &'a ForecastRun>) -> Option<&'a ForecastRun> {
    let mut best: Option<&'a ForecastRun> = None;
    for r in runs {
        match best {
            Some(b) if r.run_timestamp <= b.run_timestamp => {}
            _ => best = Some(r),
        }
    }
    best
}
