//! # Prescale Weight Provider
//!
//! Computes a per-event MC reweighting factor: the minimum positive product
//! of L1 and HLT prescales over a configured list of trigger paths of
//! interest. The weight defaults to 1 whenever the provider is
//! unconfigured, failed run initialization, or no path yields a positive
//! value, so an unweighted analysis is the natural fallback.
//!
//! L1 seeds are extracted from each path's single seed expression. Only a
//! plain OR-combination of bare trigger names is supported: a parenthesis,
//! a token ending in `)`, or an `AND`/`NOT` token discards the whole seed
//! list for that path.

use tracing::{debug, error, warn};

use crate::config::PrescaleWeightConfig;
use crate::event::{Event, EventSetup, HltConfigProvider, InputTag, L1TriggerKind, Run, TriggerMenuLite};

const DEFAULT_WEIGHT: i32 = 1;

/// Per-event prescale reweighting over a configured set of HLT paths.
///
/// Lifecycle mirrors [`GenericTriggerEventFlag`](crate::flag::GenericTriggerEventFlag):
/// construct once, [`init_run`](Self::init_run) per run,
/// [`prescale_weight`](Self::prescale_weight) per event.
pub struct PrescaleWeightProvider {
    configured: bool,
    run_initialized: bool,
    trigger_results_tag: InputTag,
    l1_menu_label: String,
    hlt_paths: Vec<String>,
    hlt_config: HltConfigProvider,
    trigger_menu: Option<TriggerMenuLite>,
}

impl PrescaleWeightProvider {
    pub fn new(config: &PrescaleWeightConfig) -> Self {
        let trigger_results_tag = config.trigger_results.clone().unwrap_or_default();
        let configured = !trigger_results_tag.label.is_empty()
            && !trigger_results_tag.process.is_empty()
            && !config.l1_menu_label.is_empty()
            && !config.hlt_paths.is_empty();
        if !configured {
            warn!("prescale weight provider not configured, weight defaults to 1");
        }
        Self {
            configured,
            run_initialized: false,
            trigger_results_tag,
            l1_menu_label: config.l1_menu_label.clone(),
            hlt_paths: config.hlt_paths.clone(),
            hlt_config: HltConfigProvider::new(),
            trigger_menu: None,
        }
    }

    pub fn configured(&self) -> bool {
        self.configured
    }

    /// Run-boundary initialization: HLT configuration for the trigger-
    /// results process, then the L1 trigger menu lite by label. Any failure
    /// disables the provider for this run.
    pub fn init_run(&mut self, run: &Run) {
        self.run_initialized = false;
        self.trigger_menu = None;
        if !self.configured {
            return;
        }
        if let Err(err) = self.hlt_config.init(run, &self.trigger_results_tag.process) {
            error!(
                run = run.number,
                %err,
                "HLT configuration initialization failed, prescale weight disabled for this run"
            );
            return;
        }
        match run.l1_menu(&self.l1_menu_label) {
            Some(menu) => {
                self.trigger_menu = Some(menu.clone());
                self.run_initialized = true;
            }
            None => error!(
                run = run.number,
                label = %self.l1_menu_label,
                "L1 trigger menu lite not found, prescale weight disabled for this run"
            ),
        }
    }

    /// The event weight: minimum positive `hltPrescale * l1Prescale` over
    /// the accepted paths of interest, or 1.
    pub fn prescale_weight(&self, event: &Event, setup: &EventSetup) -> i32 {
        if !self.configured || !self.run_initialized {
            return DEFAULT_WEIGHT;
        }
        let Some(menu) = self.trigger_menu.as_ref() else {
            return DEFAULT_WEIGHT;
        };
        let Some(results) = event.trigger_results(&self.trigger_results_tag) else {
            error!(
                tag = %self.trigger_results_tag,
                "trigger results not found in the event"
            );
            return DEFAULT_WEIGHT;
        };

        let mut weight: Option<i32> = None;
        for path in &self.hlt_paths {
            let Some(index) = self.hlt_config.path_index(path) else {
                continue;
            };
            if !results.accept(index) {
                continue;
            }
            let seed_expressions = self.hlt_config.l1_seeds(path).unwrap_or(&[]);
            if seed_expressions.len() != 1 {
                error!(
                    path = path.as_str(),
                    count = seed_expressions.len(),
                    "HLT path must carry exactly one L1 seed expression"
                );
                return DEFAULT_WEIGHT;
            }
            let seeds = parse_l1_seeds(&seed_expressions[0]);
            if seeds.is_empty() {
                warn!(
                    path = path.as_str(),
                    expression = seed_expressions[0].as_str(),
                    "unsupported L1 seed expression, path skipped"
                );
                continue;
            }

            let mut l1_prescale: Option<i32> = None;
            for seed in &seeds {
                let kind = if menu.is_technical(seed) {
                    L1TriggerKind::Technical
                } else if menu.is_algorithm(seed) {
                    L1TriggerKind::Algorithm
                } else {
                    warn!(seed = seed.as_str(), "L1 seed not in the trigger menu");
                    continue;
                };
                match setup.l1().prescale(event, seed, kind) {
                    Ok(value) if value > 0 => {
                        l1_prescale = Some(l1_prescale.map_or(value, |current| current.min(value)));
                    }
                    Ok(value) => {
                        debug!(seed = seed.as_str(), value, "non-positive L1 prescale ignored")
                    }
                    Err(err) => debug!(seed = seed.as_str(), %err, "L1 prescale unavailable"),
                }
            }
            let Some(l1_prescale) = l1_prescale else {
                continue;
            };

            let hlt_prescale = self.hlt_config.prescale_value(path).unwrap_or(0) as i32;
            let path_prescale = hlt_prescale * l1_prescale;
            if path_prescale > 0 {
                weight = Some(weight.map_or(path_prescale, |current| current.min(path_prescale)));
            }
        }
        weight.unwrap_or(DEFAULT_WEIGHT)
    }
}

/// Splits a seed expression into bare trigger names. `OR` tokens separate
/// seeds; any parenthesis, token ending in `)`, `AND` or `NOT` makes the
/// whole expression unsupported and yields an empty list.
fn parse_l1_seeds(expression: &str) -> Vec<String> {
    let mut seeds = Vec::new();
    for token in expression.split_whitespace() {
        if token == "OR" {
            continue;
        }
        if token.contains('(') || token.ends_with(')') || token == "AND" || token == "NOT" {
            return Vec::new();
        }
        seeds.push(token.to_string());
    }
    seeds
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_l1_seeds_plain_or() {
        assert_eq!(
            parse_l1_seeds("L1_SingleMu7 OR L1_DoubleMu3"),
            vec!["L1_SingleMu7", "L1_DoubleMu3"]
        );
        assert_eq!(parse_l1_seeds("L1_SingleMu7"), vec!["L1_SingleMu7"]);
    }

    #[test]
    fn test_parse_l1_seeds_rejects_complex_expressions() {
        assert!(parse_l1_seeds("L1_SingleMu7 AND L1_DoubleMu3").is_empty());
        assert!(parse_l1_seeds("NOT L1_SingleMu7").is_empty());
        assert!(parse_l1_seeds("( L1_SingleMu7 OR L1_DoubleMu3 )").is_empty());
        assert!(parse_l1_seeds("(L1_SingleMu7 OR L1_DoubleMu3)").is_empty());
    }

    #[test]
    fn test_parse_l1_seeds_empty_expression() {
        assert!(parse_l1_seeds("").is_empty());
        assert!(parse_l1_seeds("   ").is_empty());
    }

    #[test]
    fn test_unconfigured_provider_defaults_to_one() {
        let provider = PrescaleWeightProvider::new(&PrescaleWeightConfig::default());
        assert!(!provider.configured());
        assert_eq!(
            provider.prescale_weight(&Event::new(), &EventSetup::default()),
            1
        );
    }

    #[test]
    fn test_configuration_requires_process_and_paths() {
        // Label without process.
        let config = PrescaleWeightConfig {
            trigger_results: Some(InputTag::label_only("TriggerResults")),
            l1_menu_label: "l1GtTriggerMenuLite".to_string(),
            hlt_paths: vec!["HLT_Mu9".to_string()],
        };
        assert!(!PrescaleWeightProvider::new(&config).configured());

        // Empty path list.
        let config = PrescaleWeightConfig {
            trigger_results: Some(InputTag::new("TriggerResults", "", "HLT")),
            l1_menu_label: "l1GtTriggerMenuLite".to_string(),
            hlt_paths: Vec::new(),
        };
        assert!(!PrescaleWeightProvider::new(&config).configured());

        let config = PrescaleWeightConfig {
            trigger_results: Some(InputTag::new("TriggerResults", "", "HLT")),
            l1_menu_label: "l1GtTriggerMenuLite".to_string(),
            hlt_paths: vec!["HLT_Mu9".to_string()],
        };
        assert!(PrescaleWeightProvider::new(&config).configured());
    }
}
