// Primitives for reading CSV files.

use std::collections::HashMap;

use crate::forecast::{io_common::simplify_file_name, *};

const COUNTY_CODE: &str = "county_code";
const COUNTY_NAME: &str = "county_name";
const CANDIDATE: &str = "candidate";
const PARTY: &str = "party";
const SHARE: &str = "predicted_vote_share";
const TURNOUT: &str = "predicted_turnout";
const VOTES: &str = "predicted_votes";

/// Reads forecast rows from a CSV file with a header row.
///
/// Columns are found by their name in the header. Empty cells are missing
/// values.
pub fn read_csv_rows(path: String) -> FcResult<Vec<ForecastRow>> {
    let file_name = simplify_file_name(&path);
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(&path)
        .context(CsvOpenSnafu { path: path.clone() })?;

    let header: HashMap<String, usize> = rdr
        .headers()
        .context(CsvLineParseSnafu {})?
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.to_string(), idx))
        .collect();
    debug!("read_csv_rows: {}: header: {:?}", file_name, header);
    let column = |name: &str| -> FcResult<usize> {
        header
            .get(name)
            .copied()
            .context(CsvMissingColumnSnafu { column: name })
    };
    let code_idx = column(COUNTY_CODE)?;
    let candidate_idx = column(CANDIDATE)?;
    let share_idx = column(SHARE)?;
    let name_idx = header.get(COUNTY_NAME).copied();
    let party_idx = header.get(PARTY).copied();
    let turnout_idx = header.get(TURNOUT).copied();
    let votes_idx = header.get(VOTES).copied();

    let mut res: Vec<ForecastRow> = Vec::new();
    for (idx, line_r) in rdr.records().enumerate() {
        // The header is line 1.
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu {})?;
        debug!("read_csv_rows: {:?} {:?}", lineno, line);
        let cell = |col: Option<usize>| -> Option<String> {
            col.and_then(|c| line.get(c))
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
        };
        let number = |col: Option<usize>, name: &str| -> FcResult<Option<f64>> {
            match cell(col) {
                Some(s) => s.parse::<f64>().map(Some).ok().context(CsvWrongNumberSnafu {
                    lineno,
                    column: name,
                    value: s.clone(),
                }),
                None => Ok(None),
            }
        };

        let county_code = match cell(Some(code_idx)) {
            Some(c) => c,
            None => whatever!("Line {}: missing county code", lineno),
        };
        let candidate = match cell(Some(candidate_idx)) {
            Some(c) => c,
            None => whatever!("Line {}: missing candidate", lineno),
        };
        let predicted_vote_share = match number(Some(share_idx), SHARE)? {
            Some(s) => s,
            None => whatever!("Line {}: missing {}", lineno, SHARE),
        };
        let predicted_votes = match number(votes_idx, VOTES)? {
            Some(v) if v >= 0.0 => Some(v.round() as u64),
            Some(v) => whatever!("Line {}: negative {} {}", lineno, VOTES, v),
            None => None,
        };

        res.push(ForecastRow {
            county_code,
            county_name: cell(name_idx),
            candidate,
            party: cell(party_idx),
            predicted_vote_share,
            predicted_turnout: number(turnout_idx, TURNOUT)?,
            predicted_votes,
        });
    }
    info!("read_csv_rows: {}: {} rows", file_name, res.len());
    Ok(res)
}
