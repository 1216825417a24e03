pub use crate::config::*;

use crate::regional::{redistribute, validate_scenario};

/// A builder for scenarios over a national baseline.
///
/// Setting the shares of a region that already has an adjustment replaces
/// that adjustment, keeping its position.
///
/// ```
/// pub use forecast_engine::builder::ScenarioBuilder;
/// pub use forecast_engine::ScenarioRules;
/// # use forecast_engine::*;
///
/// let baseline = NationalBaseline::from_votes(
///     &[("X".to_string(), 600.0), ("Y".to_string(), 400.0)],
///     vec![RegionBaseline {
///         region: "Coast".to_string(),
///         votes: vec![("X".to_string(), 100.0), ("Y".to_string(), 100.0)],
///     }],
/// );
///
/// let mut builder = ScenarioBuilder::new(&ScenarioRules::DEFAULT_RULES)?
///     .name("Coast swing")?;
///
/// builder.add_adjustment("Coast", &[("X".to_string(), 20.0), ("Y".to_string(), 80.0)])?;
///
/// let result = builder.run(&baseline)?;
/// assert_eq!(result.candidate("Y").unwrap().new_votes, 460.0);
///
/// # Ok::<(), ScenarioErrors>(())
/// ```
pub struct ScenarioBuilder {
    pub(crate) _rules: ScenarioRules,
    pub(crate) _name: String,
    pub(crate) _description: Option<String>,
    pub(crate) _adjustments: Vec<RegionalAdjustment>,
}

impl ScenarioBuilder {
    pub fn new(rules: &ScenarioRules) -> Result<ScenarioBuilder, ScenarioErrors> {
        Ok(ScenarioBuilder {
            _rules: rules.clone(),
            _name: String::new(),
            _description: None,
            _adjustments: Vec::new(),
        })
    }

    pub fn name(self, name: &str) -> Result<ScenarioBuilder, ScenarioErrors> {
        if name.trim().is_empty() {
            return Err(ScenarioErrors::InvalidScenario(vec![
                "Scenario name is required".to_string(),
            ]));
        }
        Ok(ScenarioBuilder {
            _name: name.to_string(),
            ..self
        })
    }

    pub fn description(self, description: &str) -> ScenarioBuilder {
        ScenarioBuilder {
            _description: Some(description.to_string()),
            ..self
        }
    }

    /// Sets the shares of a region.
    ///
    /// The shares must add up to 100 (within the tolerance of the rules).
    pub fn add_adjustment(
        &mut self,
        region: &str,
        shares: &[(String, f64)],
    ) -> Result<(), ScenarioErrors> {
        let adjustment = RegionalAdjustment {
            region: region.to_string(),
            shares: shares.to_vec(),
        };
        let total = adjustment.total_share();
        if !((total - 100.0).abs() <= self._rules.share_tolerance) {
            return Err(ScenarioErrors::InvalidScenario(vec![format!(
                "{}: Candidate shares must sum to 100%, got {:.1}%",
                region, total
            )]));
        }
        match self._adjustments.iter_mut().find(|a| a.region == region) {
            Some(existing) => *existing = adjustment,
            None => self._adjustments.push(adjustment),
        }
        Ok(())
    }

    /// Removes the adjustment of a region. Returns false if the region had none.
    pub fn remove_adjustment(&mut self, region: &str) -> bool {
        let before = self._adjustments.len();
        self._adjustments.retain(|a| a.region != region);
        self._adjustments.len() != before
    }

    pub fn adjustments(&self) -> &[RegionalAdjustment] {
        &self._adjustments
    }

    pub fn validate(&self, baseline: &NationalBaseline) -> ValidationReport {
        validate_scenario(baseline, &self._name, &self._adjustments, &self._rules)
    }

    pub fn run(&self, baseline: &NationalBaseline) -> Result<ScenarioResult, ScenarioErrors> {
        redistribute(
            baseline,
            &self._name,
            self._description.as_deref(),
            &self._adjustments,
            &self._rules,
        )
    }
}

/// The same share for every candidate, the starting point of a new adjustment.
///
/// The last candidate absorbs the rounding so that the shares add up to 100.
pub fn equal_shares(candidates: &[String]) -> Vec<(String, f64)> {
    if candidates.is_empty() {
        return Vec::new();
    }
    let each = (100.0 / candidates.len() as f64 * 10.0).floor() / 10.0;
    let rest = 100.0 - each * (candidates.len() - 1) as f64;
    candidates
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let share = if idx + 1 == candidates.len() { rest } else { each };
            (name.clone(), share)
        })
        .collect()
}
