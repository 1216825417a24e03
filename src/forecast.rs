use log::{debug, info, warn};

use forecast_engine::builder::ScenarioBuilder;
use forecast_engine::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::Path;

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::{Args, Command};
use crate::forecast::config_reader::*;
use crate::forecast::io_common::{join_path, read_forecast_rows, source_path};

pub mod config_reader;
mod io_common;
mod io_csv;
mod io_json;
mod io_xlsx;

#[derive(Debug, Snafu)]
pub enum FcError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Could not read a number from {value}"))]
    ParsingJsonNumber { value: String },
    #[snafu(display("The configuration file has no parent directory"))]
    MissingParentDir {},
    #[snafu(display("Missing section {section} in the configuration"))]
    MissingSection { section: String },

    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("Missing worksheet or empty worksheet"))]
    EmptyExcel {},
    #[snafu(display("Could not understand the cell at line {lineno}: {content}"))]
    ExcelWrongCellType { lineno: u64, content: String },

    #[snafu(display("Error opening file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading a line of CSV"))]
    CsvLineParse { source: csv::Error },
    #[snafu(display("Missing column {column} in the CSV header"))]
    CsvMissingColumn { column: String },
    #[snafu(display("Line {lineno}: could not read a number from {value:?} (column {column})"))]
    CsvWrongNumber {
        lineno: usize,
        column: String,
        value: String,
    },

    #[snafu(display("Error writing the summary to {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("The scenario could not be computed"))]
    Scenario { source: ScenarioErrors },
    #[snafu(display("Difference detected between calculated summary and reference summary"))]
    ReferenceMismatch {},

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

impl FcError {
    /// Reading the inputs may succeed when attempted again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FcError::OpeningJson { .. } | FcError::OpeningExcel { .. } | FcError::CsvOpen { .. }
        )
    }
}

type FcResult<T> = Result<T, FcError>;

fn candidate_js(c: &ProjectedCandidate) -> JSValue {
    json!({
        "name": c.name,
        "party": c.party,
        "rawVotes": c.raw_votes,
        "votes": c.votes,
        "share": round_share(c.share),
        "lowerBound90": round_share(c.lower_bound_90),
        "upperBound90": round_share(c.upper_bound_90),
    })
}

fn projection_to_json(p: &NormalizedProjection) -> JSValue {
    let candidates: Vec<JSValue> = p.candidates.iter().map(candidate_js).collect();
    let blocs: Vec<JSValue> = p
        .blocs
        .iter()
        .map(|b| {
            json!({
                "bloc": b.bloc,
                "candidate": b.candidate,
                "rawVotes": b.raw_votes,
                "scaledVotes": b.scaled_votes,
            })
        })
        .collect();
    json!({
        "turnoutTarget": p.turnout_target,
        "totalRaw": p.total_raw,
        "winner": p.winner.name(),
        "margin": round_share(p.margin),
        "candidates": candidates,
        "blocs": blocs,
    })
}

fn scenario_to_json(res: &ScenarioResult) -> JSValue {
    let candidates: Vec<JSValue> = res
        .candidates
        .iter()
        .map(|c| {
            json!({
                "name": c.name,
                "newVotes": round_share(c.new_votes),
                "newShare": round_share(c.new_share),
                "originalVotes": round_share(c.original_votes),
                "originalShare": round_share(c.original_share),
                "delta": round_share(c.delta),
            })
        })
        .collect();
    let regions: Vec<JSValue> = res
        .regions
        .iter()
        .map(|r| {
            let changes: Vec<JSValue> = r
                .candidates
                .iter()
                .map(|c| {
                    json!({
                        "name": c.name,
                        "originalVotes": round_share(c.original_votes),
                        "originalShare": round_share(c.original_share),
                        "adjustedVotes": round_share(c.adjusted_votes),
                        "adjustedShare": round_share(c.adjusted_share),
                        "voteDelta": round_share(c.vote_delta),
                        "shareDelta": round_share(c.share_delta),
                    })
                })
                .collect();
            json!({
                "region": r.region,
                "totalVotes": round_share(r.total_votes),
                "candidates": changes,
            })
        })
        .collect();
    json!({
        "winner": res.winner.name(),
        "margin": round_share(res.margin),
        "totalVotesOriginal": round_share(res.total_votes_original),
        "totalVotesAdjusted": round_share(res.total_votes_adjusted),
        "candidates": candidates,
        "regions": regions,
    })
}

fn report_to_json(report: &ValidationReport) -> JSValue {
    json!({
        "valid": report.is_valid(),
        "errors": report.errors,
        "warnings": report.warnings,
        "adjustments_count": report.adjustments_count,
        "regions_affected": report.regions_affected,
    })
}

/// The request that saves a constituency projection.
fn county_scenario_request(
    settings: &OutputSettings,
    county_code: &str,
    registered_voters: u64,
    turnout_percent: f64,
    p: &NormalizedProjection,
) -> FcResult<JSValue> {
    let (election_year, election_type) = settings.election()?;
    let candidates: Vec<JSValue> = p
        .candidates
        .iter()
        .map(|c| {
            json!({
                "name": c.name,
                "party": c.party,
                "votes": c.votes,
                "predicted_vote_share": round_share(c.share),
            })
        })
        .collect();
    Ok(json!({
        "county_code": county_code,
        "election_year": election_year,
        "election_type": election_type,
        "scenario_name": settings.scenario_name(),
        "registered_voters": registered_voters,
        "turnout": turnout_percent,
        "candidates": candidates,
    }))
}

/// The request that saves a regional scenario as a new forecast run.
/// The request that saves the projected counties as a new forecast run.
///
/// The service needs the registered voters and the turnout of each county:
/// the counties without a turnout are left out.
fn save_run_request(settings: &OutputSettings, counties: &[CountyProjection]) -> FcResult<JSValue> {
    let (election_year, election_type) = settings.election()?;
    let mut counties_js: Vec<JSValue> = Vec::new();
    for c in counties.iter() {
        let (registered_voters, turnout) = match (c.registered_voters, c.turnout) {
            (Some(rv), Some(t)) => (rv, t),
            _ => {
                warn!(
                    "save_run_request: county {} has no turnout and is not saved",
                    c.county_code
                );
                continue;
            }
        };
        let candidates: Vec<JSValue> = c
            .candidates
            .iter()
            .map(|cc| {
                json!({
                    "name": cc.name,
                    "party": cc.party,
                    "votes": cc.votes,
                    "predicted_vote_share": round_share(cc.share),
                })
            })
            .collect();
        counties_js.push(json!({
            "county_code": c.county_code,
            "registered_voters": registered_voters,
            "turnout": turnout,
            "candidates": candidates,
        }));
    }
    Ok(json!({
        "election_year": election_year,
        "election_type": election_type,
        "scenario_name": settings.scenario_name(),
        "description": settings.description,
        "counties": counties_js,
    }))
}

fn run_project(config: &ForecastConfig, root: &str) -> FcResult<JSValue> {
    let projection = config
        .projection
        .as_ref()
        .context(MissingSectionSnafu {
            section: "projection",
        })?;
    let rules = config.scenario_rules()?;
    let registered_voters = read_js_int(&projection.registered_voters)?;
    let turnout_percent = read_js_number(&projection.turnout_percent)?;

    let p = if projection.is_share_mode() {
        let input = ShareScenarioInput {
            registered_voters,
            turnout_percent,
            candidates: projection.candidate_shares()?,
        };
        project_from_shares(&input, &rules).context(ScenarioSnafu {})?
    } else {
        let candidates = match &projection.bloc_source {
            Some(cfs) => {
                let path = source_path(root, cfs);
                let mut blocs = io_xlsx::read_bloc_workbook(path, cfs)?;
                // Parties are only known from the configuration.
                for c in blocs.iter_mut() {
                    c.party = projection.party_of(&c.name);
                }
                blocs
            }
            None => projection.candidate_blocs()?,
        };
        let input = ScenarioInput {
            registered_voters,
            turnout_percent,
            candidates,
        };
        normalize_blocs(&input, &rules)
    };
    info!("run_project: winner {} by {} points", p.winner, p.margin);

    let mut summary = json!({
        "config": {
            "scenarioName": config.output_settings.scenario_name(),
            "registeredVoters": registered_voters,
            "turnoutPercent": turnout_percent,
        },
        "results": projection_to_json(&p),
    });
    if let Some(county_code) = &projection.county_code {
        summary["request"] = county_scenario_request(
            &config.output_settings,
            county_code,
            registered_voters,
            turnout_percent,
            &p,
        )?;
    }
    Ok(summary)
}

fn read_baseline_rows(config: &ForecastConfig, root: &str) -> FcResult<Vec<ForecastRow>> {
    let mut rows: Vec<ForecastRow> = Vec::new();
    for cfs in config.forecast_sources.iter().flatten() {
        let mut file_rows = read_forecast_rows(root, cfs)?;
        rows.append(&mut file_rows);
    }
    Ok(rows)
}

fn run_redistribute(config: &ForecastConfig, root: &str) -> FcResult<JSValue> {
    if config.forecast_sources.iter().flatten().next().is_none() {
        whatever!("No forecast source given for the baseline");
    }
    let rows = read_baseline_rows(config, root)?;
    let catalog = RegionCatalog::kenya();
    let baseline = baseline_from_rows(&rows, &catalog);
    debug!("run_redistribute: baseline: {:?}", baseline);

    let mut builder = ScenarioBuilder::new(&config.scenario_rules()?)
        .context(ScenarioSnafu {})?
        .name(config.output_settings.scenario_name())
        .context(ScenarioSnafu {})?;
    if let Some(description) = &config.output_settings.description {
        builder = builder.description(description);
    }
    for adj in config.regional_adjustments()? {
        builder
            .add_adjustment(&adj.region, &adj.shares)
            .context(ScenarioSnafu {})?;
    }
    let result = builder.run(&baseline).context(ScenarioSnafu {})?;
    info!(
        "run_redistribute: scenario {:?}: fingerprint {}",
        result.scenario_name,
        result.fingerprint()
    );

    let mut summary = json!({
        "config": {
            "scenarioName": result.scenario_name,
            "description": result.description,
        },
        "results": scenario_to_json(&result),
    });
    if config.output_settings.election_year.is_some() {
        let counties = redistribute_counties(&rows, &catalog, builder.adjustments());
        let skipped: Vec<&str> = counties
            .iter()
            .filter(|c| c.registered_voters.is_none() || c.turnout.is_none())
            .map(|c| c.county_code.as_str())
            .collect();
        summary["request"] = save_run_request(&config.output_settings, &counties)?;
        summary["countiesNotSaved"] = json!(skipped);
    }
    Ok(summary)
}

fn run_validate(config: &ForecastConfig, root: &str) -> FcResult<JSValue> {
    // Without rows, the regions still come from the catalog.
    let rows = read_baseline_rows(config, root)?;
    let baseline = baseline_from_rows(&rows, &RegionCatalog::kenya());
    let adjustments = config.regional_adjustments()?;
    let report = validate_scenario(
        &baseline,
        config.output_settings.scenario_name(),
        &adjustments,
        &config.scenario_rules()?,
    );
    for e in report.errors.iter() {
        info!("run_validate: {}", e);
    }
    for w in report.warnings.iter() {
        warn!("run_validate: {}", w);
    }
    Ok(report_to_json(&report))
}

fn run_rows(config: &ForecastConfig, root: &str, run_id: &str) -> FcResult<Vec<ForecastRow>> {
    let run_source = config
        .run_sources
        .iter()
        .flatten()
        .find(|rs| rs.run_id == run_id);
    match run_source {
        Some(rs) => read_forecast_rows(root, &rs.source),
        None => whatever!("No source given for the forecast run {}", run_id),
    }
}

fn run_merge(config: &ForecastConfig, root: &str) -> FcResult<JSValue> {
    let catalog_config = config
        .run_catalog
        .as_ref()
        .context(MissingSectionSnafu {
            section: "runCatalog",
        })?;
    let runs = io_json::read_run_catalog(join_path(root, &catalog_config.file_path))?;
    let (election_year, election_type) = config.output_settings.election_filter()?;

    let selected = match &catalog_config.selected_run {
        Some(id) => match runs.iter().find(|r| r.id == *id) {
            Some(r) => r,
            None => whatever!("Unknown forecast run {}", id),
        },
        None => latest_run(
            &runs,
            election_year,
            election_type.as_deref(),
            catalog_config.prefer_official.unwrap_or(true),
        )
        .context(ScenarioSnafu {})?,
    };
    info!("run_merge: selected run {}", selected.id);
    let selected_rows = run_rows(config, root, &selected.id)?;

    let fallback_enabled = config.fallback_enabled.unwrap_or(false);
    let fallback_run = if fallback_enabled {
        latest_run(&runs, election_year, election_type.as_deref(), true).ok()
    } else {
        None
    };
    // A fallback that cannot be read is left out.
    let fallback_rows: Option<Vec<ForecastRow>> = match fallback_run {
        Some(run) => match run_rows(config, root, &run.id) {
            Ok(rows) => Some(rows),
            Err(e) => {
                warn!("run_merge: the fallback run {} is not available: {}", run.id, e);
                None
            }
        },
        None => None,
    };

    let outcome = merge_runs(&selected_rows, fallback_rows.as_deref(), fallback_enabled);
    let catalog = RegionCatalog::kenya();

    let counties: Vec<JSValue> = outcome
        .merged
        .iter()
        .map(|(code, agg)| {
            json!({
                "countyCode": code,
                "status": outcome.status(code).to_string(),
                "winner": agg.winner_candidate,
                "party": agg.winner_party,
                "turnout": agg.turnout.map(round_share),
                "maxShare": round_share(agg.max_share),
            })
        })
        .collect();
    let num_catalog_counties = catalog.num_counties();
    let num_mapped = outcome
        .merged
        .keys()
        .filter(|code| catalog.region_of(code).is_some())
        .count();

    let national: Vec<JSValue> = national_summary(&selected_rows)
        .iter()
        .map(|c| {
            json!({
                "name": c.name,
                "party": c.party,
                "votes": c.votes,
                "share": c.share,
            })
        })
        .collect();
    let regions: Vec<JSValue> = region_summaries(&selected_rows, &catalog)
        .iter()
        .map(|r| {
            json!({
                "region": r.region,
                "counties": r.counties,
                "leadingParty": r.leading_party,
                "wins": r.wins,
                "totalVotes": r.total_votes,
                "averageTurnout": r.average_turnout.map(round_share),
            })
        })
        .collect();

    Ok(json!({
        "selectedRun": selected.id,
        "fallbackRun": fallback_run.map(|r| r.id.clone()),
        "fallbackEnabled": fallback_enabled,
        "counties": counties,
        "countiesWithoutData": num_catalog_counties.saturating_sub(num_mapped),
        "national": national,
        "regions": regions,
    }))
}

fn write_summary(
    pretty_js: &str,
    out: &Option<String>,
    settings: &OutputSettings,
    root: &str,
) -> FcResult<()> {
    let out_path: Option<String> = match out.as_deref() {
        Some("stdout") => None,
        Some(p) => Some(p.to_string()),
        None => settings
            .output_directory
            .as_ref()
            .map(|dir| join_path(root, &format!("{}/summary.json", dir))),
    };
    match out_path {
        Some(p) => {
            info!("Writing summary to {:?}", p);
            fs::write(&p, pretty_js).context(WritingOutputSnafu { path: p.clone() })?;
        }
        None => {
            println!("{}", pretty_js);
        }
    }
    Ok(())
}

pub fn run_forecast(
    command: &Command,
    out: Option<String>,
    check_summary_path: Option<String>,
) -> FcResult<()> {
    let config_path = command.config();
    let config = read_config(config_path)?;
    info!("config: {:?}", config);
    let root_p = Path::new(config_path)
        .parent()
        .context(MissingParentDirSnafu {})?;
    let root = root_p.display().to_string();

    let result_js = match command {
        Command::Project { .. } => run_project(&config, &root)?,
        Command::Redistribute { .. } => run_redistribute(&config, &root)?,
        Command::Validate { .. } => run_validate(&config, &root)?,
        Command::Merge { .. } => run_merge(&config, &root)?,
    };

    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;
    write_summary(&pretty_js_stats, &out, &config.output_settings, &root)?;

    // The reference summary, if provided for comparison
    if let Some(summary_p) = check_summary_path {
        let summary_ref = read_summary(summary_p)?;
        debug!("summary: {:?}", summary_ref);
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference string");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            return ReferenceMismatchSnafu {}.fail();
        }
    }

    Ok(())
}

pub fn run_command(args: &Args) -> FcResult<()> {
    run_forecast(&args.command, args.out.clone(), args.reference.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn test_wrapper(command: fn(String) -> Command, test_name: &str) {
        init();
        let test_dir = option_env!("FORECAST_TEST_DIR").unwrap_or("tests");
        info!("Running test {}", test_name);
        let cmd = command(format!("{}/{}/{}_config.json", test_dir, test_name, test_name));
        let res = run_forecast(
            &cmd,
            Some("stdout".to_string()),
            Some(format!(
                "{}/{}/{}_expected_summary.json",
                test_dir, test_name, test_name
            )),
        );
        if let Err(e) = &res {
            eprintln!("An error occured {}", e);
        }
        assert!(res.is_ok());
    }

    fn project(config: String) -> Command {
        Command::Project { config }
    }

    fn redistribute(config: String) -> Command {
        Command::Redistribute { config }
    }

    fn validate(config: String) -> Command {
        Command::Validate { config }
    }

    fn merge(config: String) -> Command {
        Command::Merge { config }
    }

    #[test]
    fn bloc_projection() {
        test_wrapper(project, "bloc_projection");
    }

    #[test]
    fn bloc_workbook() {
        test_wrapper(project, "bloc_workbook");
    }

    #[test]
    fn share_projection() {
        test_wrapper(project, "share_projection");
    }

    #[test]
    fn mount_kenya_swing() {
        test_wrapper(redistribute, "mount_kenya_swing");
    }

    #[test]
    fn invalid_adjustments() {
        test_wrapper(validate, "invalid_adjustments");
    }

    #[test]
    fn fallback_merge() {
        test_wrapper(merge, "fallback_merge");
    }

    #[test]
    fn reference_mismatch_fails() {
        init();
        let res = run_forecast(
            &project("tests/bloc_projection/bloc_projection_config.json".to_string()),
            Some("stdout".to_string()),
            Some("tests/share_projection/share_projection_expected_summary.json".to_string()),
        );
        assert!(matches!(res, Err(FcError::ReferenceMismatch {})));
    }

    #[test]
    fn missing_config_is_retryable() {
        init();
        let res = run_forecast(&project("tests/no_such_case/config.json".to_string()), None, None);
        assert!(res.map_err(|e| e.is_retryable()).unwrap_err());
    }
}
