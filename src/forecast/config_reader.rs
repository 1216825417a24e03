use crate::forecast::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "scenarioName")]
    pub _scenario_name: Option<String>,
    #[serde(rename = "description")]
    pub description: Option<String>,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    #[serde(rename = "electionYear")]
    pub election_year: Option<JSValue>,
    #[serde(rename = "electionType")]
    pub election_type: Option<String>,
}

impl OutputSettings {
    pub fn scenario_name(&self) -> &str {
        self._scenario_name.as_deref().unwrap_or("")
    }

    /// The election of the requests sent to the forecasting service.
    pub fn election(&self) -> FcResult<(u32, String)> {
        match self.election_filter()? {
            (Some(year), Some(election_type)) => Ok((year, election_type)),
            _ => whatever!("electionYear and electionType are required to build a request"),
        }
    }

    /// The election used to select forecast runs. Missing values select all runs.
    pub fn election_filter(&self) -> FcResult<(Option<u32>, Option<String>)> {
        let year = match &self.election_year {
            Some(js) => Some(read_js_year(js)?),
            None => None,
        };
        Ok((year, self.election_type.clone()))
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FileSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct BlocConfig {
    pub bloc: String,
    pub votes: JSValue,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CandidateConfig {
    pub name: String,
    pub party: Option<String>,
    pub blocs: Option<Vec<BlocConfig>>,
    #[serde(rename = "predictedVoteShare")]
    pub predicted_vote_share: Option<JSValue>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionConfig {
    #[serde(rename = "registeredVoters")]
    pub registered_voters: JSValue,
    #[serde(rename = "turnoutPercent")]
    pub turnout_percent: JSValue,
    #[serde(rename = "countyCode")]
    pub county_code: Option<String>,
    pub candidates: Option<Vec<CandidateConfig>>,
    #[serde(rename = "blocSource")]
    pub bloc_source: Option<FileSource>,
}

impl ProjectionConfig {
    /// All the candidates are given by share and none by blocs.
    pub fn is_share_mode(&self) -> bool {
        match &self.candidates {
            Some(cands) if !cands.is_empty() && self.bloc_source.is_none() => cands
                .iter()
                .all(|c| c.predicted_vote_share.is_some() && c.blocs.is_none()),
            _ => false,
        }
    }

    pub fn candidate_shares(&self) -> FcResult<Vec<CandidateShare>> {
        let mut res: Vec<CandidateShare> = Vec::new();
        for c in self.candidates.iter().flatten() {
            let share = match &c.predicted_vote_share {
                Some(js) => read_js_number(js)?,
                None => whatever!("Missing predictedVoteShare for {}", c.name),
            };
            res.push(CandidateShare {
                name: c.name.clone(),
                party: c.party.clone(),
                share,
            });
        }
        Ok(res)
    }

    pub fn candidate_blocs(&self) -> FcResult<Vec<CandidateBlocs>> {
        let mut res: Vec<CandidateBlocs> = Vec::new();
        for c in self.candidates.iter().flatten() {
            let mut blocs: Vec<BlocVotes> = Vec::new();
            for b in c.blocs.iter().flatten() {
                blocs.push(BlocVotes {
                    bloc: b.bloc.clone(),
                    votes: read_js_int(&b.votes)?,
                });
            }
            res.push(CandidateBlocs {
                name: c.name.clone(),
                party: c.party.clone(),
                blocs,
            });
        }
        Ok(res)
    }

    pub fn party_of(&self, candidate: &str) -> Option<String> {
        self.candidates
            .iter()
            .flatten()
            .find(|c| c.name == candidate)
            .and_then(|c| c.party.clone())
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ShareConfig {
    pub candidate: String,
    pub share: JSValue,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct AdjustmentConfig {
    pub region: String,
    pub shares: Vec<ShareConfig>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    #[serde(rename = "shareTolerance")]
    pub share_tolerance: Option<JSValue>,
    #[serde(rename = "maxNameLength")]
    pub max_name_length: Option<JSValue>,
    #[serde(rename = "confidenceHalfWidth")]
    pub confidence_half_width: Option<JSValue>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RunCatalogConfig {
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "preferOfficial")]
    pub prefer_official: Option<bool>,
    #[serde(rename = "selectedRun")]
    pub selected_run: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RunSource {
    #[serde(rename = "runId")]
    pub run_id: String,
    pub source: FileSource,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    pub rules: Option<RulesConfig>,
    pub projection: Option<ProjectionConfig>,
    #[serde(rename = "forecastSources")]
    pub forecast_sources: Option<Vec<FileSource>>,
    pub adjustments: Option<Vec<AdjustmentConfig>>,
    #[serde(rename = "runCatalog")]
    pub run_catalog: Option<RunCatalogConfig>,
    #[serde(rename = "runSources")]
    pub run_sources: Option<Vec<RunSource>>,
    #[serde(rename = "fallbackEnabled")]
    pub fallback_enabled: Option<bool>,
}

impl ForecastConfig {
    /// The rules of the configuration, the default rules for the missing values.
    pub fn scenario_rules(&self) -> FcResult<ScenarioRules> {
        let mut rules = ScenarioRules::DEFAULT_RULES;
        if let Some(rc) = &self.rules {
            if let Some(js) = &rc.share_tolerance {
                rules.share_tolerance = read_js_number(js)?;
            }
            if let Some(js) = &rc.max_name_length {
                rules.max_name_length = usize::try_from(read_js_int(js)?)
                    .ok()
                    .context(ParsingJsonNumberSnafu {
                        value: js.to_string(),
                    })?;
            }
            if let Some(js) = &rc.confidence_half_width {
                rules.confidence_half_width = read_js_number(js)?;
            }
        }
        Ok(rules)
    }

    pub fn regional_adjustments(&self) -> FcResult<Vec<RegionalAdjustment>> {
        let mut res: Vec<RegionalAdjustment> = Vec::new();
        for adj in self.adjustments.iter().flatten() {
            let mut shares: Vec<(String, f64)> = Vec::new();
            for s in adj.shares.iter() {
                shares.push((s.candidate.clone(), read_js_number(&s.share)?));
            }
            res.push(RegionalAdjustment {
                region: adj.region.clone(),
                shares,
            });
        }
        Ok(res)
    }
}

pub fn read_config(path: &str) -> FcResult<ForecastConfig> {
    let config_str = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: ForecastConfig = serde_json::from_str(&config_str).context(ParsingJsonSnafu {})?;
    Ok(config)
}

pub fn read_summary(path: String) -> FcResult<JSValue> {
    let contents = fs::read_to_string(path.clone()).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

/// Reads a decimal number written as a JSON number or as a string.
pub fn read_js_number(x: &JSValue) -> FcResult<f64> {
    match x {
        JSValue::Number(n) => n.as_f64().context(ParsingJsonNumberSnafu {
            value: n.to_string(),
        }),
        JSValue::String(s) => s.trim().parse::<f64>().ok().context(ParsingJsonNumberSnafu {
            value: s.clone(),
        }),
        _ => None.context(ParsingJsonNumberSnafu {
            value: x.to_string(),
        }),
    }
}

/// Like [read_js_number], but null and empty strings are missing values.
pub fn read_js_opt_number(x: &Option<JSValue>) -> FcResult<Option<f64>> {
    match x {
        None | Some(JSValue::Null) => Ok(None),
        Some(JSValue::String(s)) if s.trim().is_empty() => Ok(None),
        Some(js) => read_js_number(js).map(Some),
    }
}

pub fn read_js_int(x: &JSValue) -> FcResult<u64> {
    match x {
        JSValue::Number(n) => n.as_u64().context(ParsingJsonNumberSnafu {
            value: n.to_string(),
        }),
        JSValue::String(s) => s.trim().parse::<u64>().ok().context(ParsingJsonNumberSnafu {
            value: s.clone(),
        }),
        _ => None.context(ParsingJsonNumberSnafu {
            value: x.to_string(),
        }),
    }
}

/// A year must fit in a `u32`.
pub fn read_js_year(x: &JSValue) -> FcResult<u32> {
    u32::try_from(read_js_int(x)?)
        .ok()
        .context(ParsingJsonNumberSnafu {
            value: x.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_or_strings() {
        assert_eq!(read_js_number(&json!(60)).unwrap(), 60.0);
        assert_eq!(read_js_number(&json!("60.5")).unwrap(), 60.5);
        assert!(read_js_number(&json!("sixty")).is_err());
        assert!(read_js_number(&json!(true)).is_err());
        assert_eq!(read_js_int(&json!("15000")).unwrap(), 15_000);
        assert!(read_js_int(&json!(-3)).is_err());
        assert_eq!(read_js_opt_number(&Some(json!(null))).unwrap(), None);
        assert_eq!(read_js_opt_number(&Some(json!(""))).unwrap(), None);
        assert_eq!(read_js_opt_number(&None).unwrap(), None);
    }

    #[test]
    fn years_fit_in_u32() {
        assert_eq!(read_js_year(&json!(2027)).unwrap(), 2027);
        assert_eq!(read_js_year(&json!("2027")).unwrap(), 2027);
        assert!(matches!(
            read_js_year(&json!(4_294_969_323_u64)),
            Err(FcError::ParsingJsonNumber { .. })
        ));
        let settings: OutputSettings = serde_json::from_value(json!({
            "electionYear": 4_294_969_323_u64,
            "electionType": "presidential"
        }))
        .unwrap();
        assert!(settings.election_filter().is_err());
    }

    #[test]
    fn rules_default_to_the_engine_rules() {
        let config: ForecastConfig = serde_json::from_value(json!({
            "outputSettings": {"scenarioName": "test"},
            "rules": {"shareTolerance": "0.5"}
        }))
        .unwrap();
        let rules = config.scenario_rules().unwrap();
        assert_eq!(rules.share_tolerance, 0.5);
        assert_eq!(rules.max_name_length, 100);
        assert_eq!(config.output_settings.scenario_name(), "test");
        assert_eq!(config.output_settings.election_filter().unwrap(), (None, None));
        assert!(config.output_settings.election().is_err());
    }

    #[test]
    fn share_mode() {
        let config: ForecastConfig = serde_json::from_value(json!({
            "outputSettings": {},
            "projection": {
                "registeredVoters": 100,
                "turnoutPercent": 50,
                "candidates": [
                    {"name": "A", "predictedVoteShare": "55.5"},
                    {"name": "B", "party": "ODM", "predictedVoteShare": 44.5}
                ]
            }
        }))
        .unwrap();
        let projection = config.projection.unwrap();
        assert!(projection.is_share_mode());
        let shares = projection.candidate_shares().unwrap();
        assert_eq!(shares[0].share, 55.5);
        assert_eq!(shares[1].party.as_deref(), Some("ODM"));
        assert_eq!(projection.party_of("B").as_deref(), Some("ODM"));
    }

    #[test]
    fn adjustments_from_config() {
        let config: ForecastConfig = serde_json::from_value(json!({
            "outputSettings": {"scenarioName": "swing", "electionYear": "2027", "electionType": "presidential"},
            "adjustments": [
                {"region": "Coast", "shares": [{"candidate": "A", "share": 40}, {"candidate": "B", "share": "60"}]}
            ]
        }))
        .unwrap();
        let adjustments = config.regional_adjustments().unwrap();
        assert_eq!(adjustments, vec![RegionalAdjustment::new("Coast", &[("A", 40.0), ("B", 60.0)])]);
        assert_eq!(
            config.output_settings.election().unwrap(),
            (2027, "presidential".to_string())
        );
    }
}
