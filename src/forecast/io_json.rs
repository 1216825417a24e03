// Readers for the JSON exports of the forecasting service.

use serde::{Deserialize, Serialize};

use crate::forecast::{io_common::js_to_code, *};

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
struct ServiceCandidate {
    name: String,
    party: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
struct ServiceCounty {
    code: JSValue,
    name: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
struct ServiceRow {
    candidate: ServiceCandidate,
    county: ServiceCounty,
    predicted_vote_share: JSValue,
    predicted_turnout: Option<JSValue>,
    predicted_votes: Option<JSValue>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
struct ServiceElection {
    year: Option<JSValue>,
    election_type: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
struct ServiceRun {
    id: String,
    run_timestamp: String,
    is_official: Option<bool>,
    visibility: Option<String>,
    election: Option<ServiceElection>,
}

fn read_json_file(path: &str) -> FcResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})
}

pub fn read_json_rows(path: String) -> FcResult<Vec<ForecastRow>> {
    let js = read_json_file(&path)?;
    let service_rows: Vec<ServiceRow> = serde_json::from_value(js).context(ParsingJsonSnafu {})?;
    let mut res: Vec<ForecastRow> = Vec::new();
    for (idx, sr) in service_rows.iter().enumerate() {
        debug!("read_json_rows: {:?} {:?}", idx, sr);
        let predicted_votes = match read_js_opt_number(&sr.predicted_votes)? {
            Some(v) if v >= 0.0 => Some(v.round() as u64),
            Some(v) => whatever!("Negative predicted_votes {} in row {}", v, idx),
            None => None,
        };
        res.push(ForecastRow {
            county_code: js_to_code(&sr.county.code)?,
            county_name: sr.county.name.clone(),
            candidate: sr.candidate.name.clone(),
            party: sr.candidate.party.clone(),
            predicted_vote_share: read_js_number(&sr.predicted_vote_share)?,
            predicted_turnout: read_js_opt_number(&sr.predicted_turnout)?,
            predicted_votes,
        });
    }
    Ok(res)
}

fn read_visibility(s: &Option<String>) -> FcResult<RunVisibility> {
    match s.as_deref() {
        Some("draft") => Ok(RunVisibility::Draft),
        Some("published") | None => Ok(RunVisibility::Published),
        Some("archived") => Ok(RunVisibility::Archived),
        Some(x) => whatever!("Unknown run visibility {:?}", x),
    }
}

pub fn read_run_catalog(path: String) -> FcResult<Vec<ForecastRun>> {
    let js = read_json_file(&path)?;
    let service_runs: Vec<ServiceRun> = serde_json::from_value(js).context(ParsingJsonSnafu {})?;
    let mut res: Vec<ForecastRun> = Vec::new();
    for sr in service_runs.iter() {
        let election_year = match sr.election.as_ref().and_then(|e| e.year.as_ref()) {
            Some(js) => Some(read_js_year(js)?),
            None => None,
        };
        res.push(ForecastRun {
            id: sr.id.clone(),
            run_timestamp: sr.run_timestamp.clone(),
            is_official: sr.is_official.unwrap_or(false),
            visibility: read_visibility(&sr.visibility)?,
            election_year,
            election_type: sr.election.as_ref().and_then(|e| e.election_type.clone()),
        });
    }
    info!("read_run_catalog: {} runs", res.len());
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibilities() {
        assert_eq!(read_visibility(&Some("draft".to_string())).unwrap(), RunVisibility::Draft);
        assert_eq!(read_visibility(&None).unwrap(), RunVisibility::Published);
        assert!(read_visibility(&Some("hidden".to_string())).is_err());
    }

    #[test]
    fn service_rows() {
        let rows = read_json_rows("tests/fallback_merge/latest_run.json".to_string()).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].county_code, "22");
        assert_eq!(rows[0].party.as_deref(), Some("UDA"));
        assert_eq!(rows[0].predicted_vote_share, 62.5);
        assert_eq!(rows[1].predicted_turnout, None);
        assert_eq!(rows[3].predicted_turnout, Some(58.3));
        assert_eq!(rows[3].predicted_votes, Some(600));
    }
}
