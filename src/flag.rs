//! # Generic Trigger Event Flag
//!
//! The accept/reject orchestrator. Four signal categories (DCS, GT, L1, HLT)
//! each combine their configured decisions with a per-category AND/OR
//! combiner; the flag combines the four category results with the global
//! combiner. A disabled or empty category evaluates to the neutral element
//! of the global combiner, so it never changes the overall decision.
//!
//! Run boundaries are handled by [`GenericTriggerEventFlag::init_run`]:
//! database-resident expression lists are refreshed wholesale when the run
//! changes, and the HLT configuration cache is re-initialized for the HLT
//! input tag's process. Per-event evaluation
//! ([`GenericTriggerEventFlag::accept`]) never fails: every lookup fault
//! degrades to the owning category's configured error reply, with an error
//! log.

use tracing::{debug, error};

use crate::conditions::expressions_from_db;
use crate::config::TriggerFlagConfig;
use crate::event::{
    DcsPartition, DcsStatusCollection, Event, EventSetup, GtReadoutRecord, HltConfigProvider,
    InputTag, Run, TriggerResults,
};
use crate::expression::LogicalExpression;

/// The four signal categories, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum TriggerCategory {
    Dcs,
    Gt,
    L1,
    Hlt,
}

/// AND/OR combination of a list of decisions.
///
/// Configuration carries the upstream boolean polarity (`true` = OR); the
/// engine converts immediately to this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combine {
    And,
    Or,
}

impl Combine {
    pub fn from_and_or(and_or: bool) -> Self {
        if and_or {
            Combine::Or
        } else {
            Combine::And
        }
    }

    /// The identity element: a decision that leaves an AND or OR chain
    /// unchanged. Disabled categories evaluate to the global combiner's
    /// neutral element.
    pub fn neutral(self) -> bool {
        matches!(self, Combine::And)
    }
}

/// GT status bits with a defined operand mapping.
const GT_PHYSICS_DECLARED: [&str; 2] = ["PhysDecl", "PhysicsDeclared"];

/// One expression-backed category (GT, L1 or HLT).
#[derive(Debug)]
struct ExpressionCategory {
    category: TriggerCategory,
    on: bool,
    combine: Combine,
    input_tag: Option<InputTag>,
    expressions: Vec<LogicalExpression>,
    error_reply: bool,
    db_key: String,
}

impl ExpressionCategory {
    fn disabled(category: TriggerCategory) -> Self {
        Self {
            category,
            on: false,
            combine: Combine::And,
            input_tag: None,
            expressions: Vec::new(),
            error_reply: false,
            db_key: String::new(),
        }
    }

    fn enabled(
        category: TriggerCategory,
        and_or: bool,
        input_tag: Option<InputTag>,
        expressions: &[String],
        error_reply: bool,
        db_key: &str,
    ) -> Self {
        Self {
            category,
            on: true,
            combine: Combine::from_and_or(and_or),
            input_tag,
            expressions: compile_all(expressions),
            error_reply,
            db_key: db_key.to_string(),
        }
    }

    fn active(&self) -> bool {
        self.on && !self.expressions.is_empty()
    }
}

/// The DCS category; its decision list is a set of partition numbers rather
/// than logical expressions.
#[derive(Debug)]
struct DcsCategory {
    on: bool,
    combine: Combine,
    input_tag: Option<InputTag>,
    partitions: Vec<u32>,
    error_reply: bool,
}

impl DcsCategory {
    fn disabled() -> Self {
        Self {
            on: false,
            combine: Combine::And,
            input_tag: None,
            partitions: Vec::new(),
            error_reply: false,
        }
    }

    fn active(&self) -> bool {
        self.on && !self.partitions.is_empty()
    }
}

fn compile_all(expressions: &[String]) -> Vec<LogicalExpression> {
    expressions
        .iter()
        .map(|source| LogicalExpression::compile(source))
        .collect()
}

/// Detects run transitions so database-resident expressions are refreshed
/// exactly once per run.
#[derive(Debug, Default)]
struct RunWatcher {
    last_run: Option<u32>,
}

impl RunWatcher {
    /// True on the first call and whenever the run number differs from the
    /// previous call.
    fn changed(&mut self, run: u32) -> bool {
        if self.last_run == Some(run) {
            false
        } else {
            self.last_run = Some(run);
            true
        }
    }
}

/// Composable accept/reject decision over the four trigger categories.
///
/// Lifecycle: construct once from configuration, call
/// [`init_run`](Self::init_run) at every run boundary, then
/// [`accept`](Self::accept) per event. A flag whose enabling keys are absent
/// is permanently off and accepts every event.
pub struct GenericTriggerEventFlag {
    on: bool,
    combine: Combine,
    dcs: DcsCategory,
    gt: ExpressionCategory,
    l1: ExpressionCategory,
    hlt: ExpressionCategory,
    hlt_config: HltConfigProvider,
    hlt_config_valid: bool,
    watcher: RunWatcher,
    run_initialized: bool,
}

impl GenericTriggerEventFlag {
    pub fn new(config: &TriggerFlagConfig) -> Self {
        let on = config.and_or.is_some();
        let combine = Combine::from_and_or(config.and_or.unwrap_or(false));

        let dcs = match (on, config.and_or_dcs) {
            (true, Some(and_or)) => DcsCategory {
                on: true,
                combine: Combine::from_and_or(and_or),
                input_tag: config.dcs_input_tag.clone(),
                partitions: config.dcs_partitions.clone(),
                error_reply: config.error_reply_dcs,
            },
            _ => DcsCategory::disabled(),
        };
        let gt = match (on, config.and_or_gt) {
            (true, Some(and_or)) => ExpressionCategory::enabled(
                TriggerCategory::Gt,
                and_or,
                config.gt_input_tag.clone(),
                &config.gt_status_bits,
                config.error_reply_gt,
                &config.gt_db_key,
            ),
            _ => ExpressionCategory::disabled(TriggerCategory::Gt),
        };
        let l1 = match (on, config.and_or_l1) {
            (true, Some(and_or)) => ExpressionCategory::enabled(
                TriggerCategory::L1,
                and_or,
                None,
                &config.l1_algorithms,
                config.error_reply_l1,
                &config.l1_db_key,
            ),
            _ => ExpressionCategory::disabled(TriggerCategory::L1),
        };
        let hlt = match (on, config.and_or_hlt) {
            (true, Some(and_or)) => ExpressionCategory::enabled(
                TriggerCategory::Hlt,
                and_or,
                config.hlt_input_tag.clone(),
                &config.hlt_paths,
                config.error_reply_hlt,
                &config.hlt_db_key,
            ),
            _ => ExpressionCategory::disabled(TriggerCategory::Hlt),
        };

        let any_category = dcs.on || gt.on || l1.on || hlt.on;
        if on && !any_category {
            debug!("no trigger category enabled, the event flag is off");
        }
        Self {
            on: on && any_category,
            combine,
            dcs,
            gt,
            l1,
            hlt,
            hlt_config: HltConfigProvider::new(),
            hlt_config_valid: false,
            watcher: RunWatcher::default(),
            run_initialized: false,
        }
    }

    /// Whether the flag filters at all; an off flag accepts every event.
    pub fn on(&self) -> bool {
        self.on
    }

    /// Current expression strings of one category. DCS has none; its
    /// decision list is the configured partition numbers.
    pub fn expression_strings(&self, category: TriggerCategory) -> Vec<String> {
        let expressions = match category {
            TriggerCategory::Dcs => return Vec::new(),
            TriggerCategory::Gt => &self.gt.expressions,
            TriggerCategory::L1 => &self.l1.expressions,
            TriggerCategory::Hlt => &self.hlt.expressions,
        };
        expressions
            .iter()
            .map(|expression| expression.source().to_string())
            .collect()
    }

    /// Run-boundary (re)initialization. To be called once per run before any
    /// [`accept`](Self::accept) call of that run.
    ///
    /// On a run change (or the first call), categories with a configured
    /// database key replace their expression list wholesale with the list
    /// fetched from the conditions record; any fetch miss retains the
    /// statically configured expressions. Independently, the HLT
    /// configuration cache is re-initialized for the HLT input tag's
    /// process name.
    pub fn init_run(&mut self, run: &Run, setup: &EventSetup) {
        if !self.on {
            return;
        }
        if self.watcher.changed(run.number) {
            for category in [&mut self.gt, &mut self.l1, &mut self.hlt] {
                if !category.on || category.db_key.is_empty() {
                    continue;
                }
                if let Some(expressions) = expressions_from_db(&category.db_key, setup) {
                    debug!(
                        category = %category.category,
                        key = %category.db_key,
                        count = expressions.len(),
                        "replacing expression list from the conditions record"
                    );
                    category.expressions = compile_all(&expressions);
                }
            }
        }

        self.hlt_config_valid = false;
        if self.hlt.on {
            let process = self
                .hlt
                .input_tag
                .as_ref()
                .map_or("", |tag| tag.process.as_str());
            if process.is_empty() {
                error!(
                    run = run.number,
                    "HLT input tag carries no process name, HLT configuration not initialized"
                );
            } else {
                match self.hlt_config.init(run, process) {
                    Ok(()) => self.hlt_config_valid = true,
                    Err(err) => error!(
                        run = run.number,
                        %err,
                        "HLT configuration initialization failed"
                    ),
                }
            }
        }
        self.run_initialized = true;
    }

    /// The overall decision for one event: the global AND/OR of the four
    /// category decisions, short-circuited. Always true when the flag is
    /// off.
    pub fn accept(&self, event: &Event, setup: &EventSetup) -> bool {
        if !self.on {
            return true;
        }
        if !self.run_initialized {
            error!("accept called before init_run, HLT decisions degrade to the error reply");
        }
        match self.combine {
            Combine::Or => {
                self.accept_dcs(event)
                    || self.accept_gt(event)
                    || self.accept_l1(event, setup)
                    || self.accept_hlt(event)
            }
            Combine::And => {
                self.accept_dcs(event)
                    && self.accept_gt(event)
                    && self.accept_l1(event, setup)
                    && self.accept_hlt(event)
            }
        }
    }

    fn accept_dcs(&self, event: &Event) -> bool {
        let category = &self.dcs;
        if !category.active() {
            return self.combine.neutral();
        }
        let Some(tag) = category.input_tag.as_ref() else {
            error!("DCS category enabled without an input tag");
            return category.error_reply;
        };
        let Some(collection) = event.dcs_status(tag) else {
            error!(%tag, "DCS status collection not found in the event");
            return category.error_reply;
        };
        match category.combine {
            Combine::Or => {
                for &id in &category.partitions {
                    if self.accept_dcs_partition(collection, id) {
                        return true;
                    }
                }
                false
            }
            Combine::And => {
                for &id in &category.partitions {
                    if !self.accept_dcs_partition(collection, id) {
                        return false;
                    }
                }
                true
            }
        }
    }

    fn accept_dcs_partition(&self, collection: &DcsStatusCollection, id: u32) -> bool {
        let Some(partition) = DcsPartition::from_repr(id) else {
            error!(id, "DCS partition number not recognized");
            return self.dcs.error_reply;
        };
        let Some(status) = collection.first() else {
            error!("empty DCS status collection");
            return self.dcs.error_reply;
        };
        status.ready(partition)
    }

    fn accept_gt(&self, event: &Event) -> bool {
        let category = &self.gt;
        if !category.active() {
            return self.combine.neutral();
        }
        let Some(tag) = category.input_tag.as_ref() else {
            error!("GT category enabled without an input tag");
            return category.error_reply;
        };
        let Some(record) = event.gt_readout(tag) else {
            error!(%tag, "GT readout record not found in the event");
            return category.error_reply;
        };
        self.accept_expressions(category, |name| resolve_gt_bit(record, name, category))
    }

    fn accept_l1(&self, event: &Event, setup: &EventSetup) -> bool {
        let category = &self.l1;
        if !category.active() {
            return self.combine.neutral();
        }
        self.accept_expressions(category, |name| {
            match setup.l1().decision(event, name) {
                Ok(decision) => decision,
                Err(err) => {
                    error!(algorithm = name, %err, "L1 algorithm decision unavailable");
                    category.error_reply
                }
            }
        })
    }

    fn accept_hlt(&self, event: &Event) -> bool {
        let category = &self.hlt;
        if !category.active() {
            return self.combine.neutral();
        }
        if !self.hlt_config_valid {
            error!("HLT configuration not initialized for this run");
            return category.error_reply;
        }
        let Some(tag) = category.input_tag.as_ref() else {
            error!("HLT category enabled without an input tag");
            return category.error_reply;
        };
        let Some(results) = event.trigger_results(tag) else {
            error!(%tag, "HLT trigger results not found in the event");
            return category.error_reply;
        };
        self.accept_expressions(category, |path| self.resolve_hlt_path(results, path))
    }

    fn resolve_hlt_path(&self, results: &TriggerResults, path: &str) -> bool {
        let Some(index) = self.hlt_config.path_index(path) else {
            error!(path, "HLT path not found in the current menu");
            return self.hlt.error_reply;
        };
        if results.error(index) {
            error!(path, "HLT path is in error state");
            return self.hlt.error_reply;
        }
        results.accept(index)
    }

    /// Per-expression loop with the category combiner, short-circuited in
    /// both directions. An empty or malformed expression contributes the
    /// category's error reply.
    fn accept_expressions<F>(&self, category: &ExpressionCategory, mut resolve: F) -> bool
    where
        F: FnMut(&str) -> bool,
    {
        match category.combine {
            Combine::Or => {
                for expression in &category.expressions {
                    if accept_expression(category, expression, &mut resolve) {
                        return true;
                    }
                }
                false
            }
            Combine::And => {
                for expression in &category.expressions {
                    if !accept_expression(category, expression, &mut resolve) {
                        return false;
                    }
                }
                true
            }
        }
    }
}

fn accept_expression<F>(
    category: &ExpressionCategory,
    expression: &LogicalExpression,
    resolve: &mut F,
) -> bool
where
    F: FnMut(&str) -> bool,
{
    match expression.evaluate(&mut *resolve) {
        Ok(decision) => decision,
        Err(err) => {
            error!(
                category = %category.category,
                source = expression.source(),
                %err,
                "logical expression rejected"
            );
            category.error_reply
        }
    }
}

// The GT error path deliberately uses the GT category's own error reply;
// upstream read the DCS flag here.
fn resolve_gt_bit(record: &GtReadoutRecord, name: &str, category: &ExpressionCategory) -> bool {
    if GT_PHYSICS_DECLARED.contains(&name) {
        record.physics_declared()
    } else {
        error!(bit = name, "GT status bit not defined");
        category.error_reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn hlt_only_config(and_or: bool, paths: &[&str], error_reply: bool) -> TriggerFlagConfig {
        TriggerFlagConfig {
            and_or: Some(and_or),
            and_or_hlt: Some(true),
            hlt_input_tag: Some(InputTag::new("TriggerResults", "", "HLT")),
            hlt_paths: paths.iter().map(|path| path.to_string()).collect(),
            error_reply_hlt: error_reply,
            ..TriggerFlagConfig::default()
        }
    }

    #[test]
    fn test_combine_polarity_and_neutral_element() {
        assert_eq!(Combine::from_and_or(true), Combine::Or);
        assert_eq!(Combine::from_and_or(false), Combine::And);
        assert!(Combine::And.neutral());
        assert!(!Combine::Or.neutral());
    }

    #[test]
    fn test_missing_global_key_turns_flag_off() {
        let flag = GenericTriggerEventFlag::new(&TriggerFlagConfig::default());
        assert!(!flag.on());
        // An off flag accepts unconditionally, even before init_run.
        assert!(flag.accept(&Event::new(), &EventSetup::default()));
    }

    #[test]
    fn test_no_enabled_category_forces_flag_off() {
        let config = TriggerFlagConfig {
            and_or: Some(true),
            ..TriggerFlagConfig::default()
        };
        let flag = GenericTriggerEventFlag::new(&config);
        assert!(!flag.on());
        assert!(flag.accept(&Event::new(), &EventSetup::default()));
    }

    #[test]
    fn test_enabled_category_keeps_flag_on() {
        let flag = GenericTriggerEventFlag::new(&hlt_only_config(false, &["HLT_Mu9"], false));
        assert!(flag.on());
        assert_eq!(
            flag.expression_strings(TriggerCategory::Hlt),
            vec!["HLT_Mu9"]
        );
        assert!(flag.expression_strings(TriggerCategory::L1).is_empty());
    }

    #[test]
    fn test_run_watcher_fires_on_first_call_and_changes_only() {
        let mut watcher = RunWatcher::default();
        assert!(watcher.changed(1));
        assert!(!watcher.changed(1));
        assert!(watcher.changed(2));
        assert!(!watcher.changed(2));
        assert!(watcher.changed(1));
    }
}
