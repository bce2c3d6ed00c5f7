//! # Event-Data Collaborator Model
//!
//! Concrete value types for the framework objects the decision engine
//! queries: input tags, the per-event product store, run-scoped trigger
//! menus, and the conditions access object. The host framework (or a test)
//! materializes these before calling into the engine; every lookup is a
//! synchronous in-memory `Option` access.
//!
//! The L1 trigger utility is the one seam kept behind a trait
//! ([`L1Access`]), since its decision and prescale lookups belong to an
//! external subsystem with its own error codes.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::conditions::TriggerBitsRecord;
use crate::error::{ConfigError, HltConfigError, L1Error};

/// Identifies one event-data product: `label[:instance[:process]]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InputTag {
    pub label: String,
    pub instance: String,
    pub process: String,
}

impl InputTag {
    pub fn new(
        label: impl Into<String>,
        instance: impl Into<String>,
        process: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            instance: instance.into(),
            process: process.into(),
        }
    }

    /// Tag with only a label set.
    pub fn label_only(label: impl Into<String>) -> Self {
        Self::new(label, "", "")
    }
}

impl FromStr for InputTag {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let label = parts.next().unwrap_or_default().to_string();
        let instance = parts.next().unwrap_or_default().to_string();
        let process = parts.next().unwrap_or_default().to_string();
        if label.is_empty() || parts.next().is_some() {
            return Err(ConfigError::InvalidInputTag(s.to_string()));
        }
        Ok(Self {
            label,
            instance,
            process,
        })
    }
}

impl TryFrom<String> for InputTag {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<InputTag> for String {
    fn from(tag: InputTag) -> Self {
        tag.to_string()
    }
}

impl fmt::Display for InputTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.process.is_empty() {
            if self.instance.is_empty() {
                write!(f, "{}", self.label)
            } else {
                write!(f, "{}:{}", self.label, self.instance)
            }
        } else {
            write!(f, "{}:{}:{}", self.label, self.instance, self.process)
        }
    }
}

/// Detector sub-system partitions whose readiness the DCS category may
/// query. The discriminants are the wire partition numbers; any number
/// outside this whitelist is rejected before the DCS collection is even
/// consulted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter, strum::FromRepr,
)]
#[repr(u32)]
pub enum DcsPartition {
    HBHEa = 5,
    HBHEb = 6,
    HBHEc = 7,
    HF = 8,
    HO = 9,
    RPC = 12,
    DT0 = 13,
    DTp = 14,
    DTm = 15,
    CSCp = 16,
    CSCm = 17,
    CASTOR = 20,
    TIBTID = 24,
    TOB = 25,
    TECp = 26,
    TECm = 27,
    BPIX = 28,
    FPIX = 29,
    ESp = 30,
    ESm = 31,
}

/// Per-event hardware readiness word, one bit per [`DcsPartition`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DcsStatus {
    ready_bits: u32,
}

impl DcsStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status word with all whitelisted partitions ready.
    pub fn all_ready() -> Self {
        use strum::IntoEnumIterator;
        let mut status = Self::new();
        for partition in DcsPartition::iter() {
            status.set_ready(partition, true);
        }
        status
    }

    pub fn set_ready(&mut self, partition: DcsPartition, ready: bool) {
        let bit = 1 << (partition as u32);
        if ready {
            self.ready_bits |= bit;
        } else {
            self.ready_bits &= !bit;
        }
    }

    pub fn with_ready(mut self, partition: DcsPartition) -> Self {
        self.set_ready(partition, true);
        self
    }

    pub fn ready(&self, partition: DcsPartition) -> bool {
        self.ready_bits >> (partition as u32) & 1 == 1
    }
}

/// The DCS status product; readiness lookups use the first element only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DcsStatusCollection(pub Vec<DcsStatus>);

impl DcsStatusCollection {
    pub fn first(&self) -> Option<&DcsStatus> {
        self.0.first()
    }
}

impl From<DcsStatus> for DcsStatusCollection {
    fn from(status: DcsStatus) -> Self {
        Self(vec![status])
    }
}

/// Global-trigger readout record; only the final-decision-logic word's
/// physics-declared bit is consumed here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GtReadoutRecord {
    physics_declared: bool,
}

impl GtReadoutRecord {
    pub fn new(physics_declared: bool) -> Self {
        Self { physics_declared }
    }

    pub fn physics_declared(&self) -> bool {
        self.physics_declared
    }
}

/// Outcome of one HLT path for one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathStatus {
    pub accept: bool,
    pub error: bool,
}

impl PathStatus {
    pub fn accepted() -> Self {
        Self {
            accept: true,
            error: false,
        }
    }

    pub fn rejected() -> Self {
        Self::default()
    }

    pub fn in_error() -> Self {
        Self {
            accept: false,
            error: true,
        }
    }
}

/// HLT decision product, indexed parallel to the menu's path list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerResults {
    paths: Vec<PathStatus>,
}

impl TriggerResults {
    pub fn new(paths: Vec<PathStatus>) -> Self {
        Self { paths }
    }

    pub fn size(&self) -> usize {
        self.paths.len()
    }

    /// Accept decision of the path at `index`; out-of-range reads as reject.
    pub fn accept(&self, index: usize) -> bool {
        self.paths.get(index).is_some_and(|path| path.accept)
    }

    /// Error state of the path at `index`; out-of-range reads as in-error.
    pub fn error(&self, index: usize) -> bool {
        self.paths.get(index).map_or(true, |path| path.error)
    }
}

/// One HLT path as described by the menu: name, prescale, and the L1 seed
/// expressions attached to it (normally exactly one).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HltPath {
    pub name: String,
    #[serde(default = "default_prescale")]
    pub prescale: u32,
    #[serde(default)]
    pub l1_seeds: Vec<String>,
}

fn default_prescale() -> u32 {
    1
}

impl HltPath {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prescale: 1,
            l1_seeds: Vec::new(),
        }
    }

    pub fn with_prescale(mut self, prescale: u32) -> Self {
        self.prescale = prescale;
        self
    }

    pub fn with_l1_seed(mut self, seed: impl Into<String>) -> Self {
        self.l1_seeds.push(seed.into());
        self
    }
}

/// The HLT menu of one process for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HltMenu {
    pub process_name: String,
    pub paths: Vec<HltPath>,
}

impl HltMenu {
    pub fn new(process_name: impl Into<String>, paths: Vec<HltPath>) -> Self {
        Self {
            process_name: process_name.into(),
            paths,
        }
    }
}

/// Run-scoped HLT configuration cache. Re-initialized at each run boundary;
/// all per-event path lookups go through the cached menu.
#[derive(Debug, Clone, Default)]
pub struct HltConfigProvider {
    menu: Option<HltMenu>,
}

impl HltConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the menu of `process` from the run. On failure the cache is
    /// cleared, so stale lookups from a previous run cannot leak through.
    pub fn init(&mut self, run: &Run, process: &str) -> Result<(), HltConfigError> {
        self.menu = None;
        if process.is_empty() {
            return Err(HltConfigError::MissingProcessName);
        }
        match run.hlt_menu(process) {
            Some(menu) => {
                self.menu = Some(menu.clone());
                Ok(())
            }
            None => Err(HltConfigError::UnknownProcess(process.to_string())),
        }
    }

    pub fn inited(&self) -> bool {
        self.menu.is_some()
    }

    pub fn size(&self) -> usize {
        self.menu.as_ref().map_or(0, |menu| menu.paths.len())
    }

    /// Index of `name` in the menu, aligned with [`TriggerResults`] indexing.
    pub fn path_index(&self, name: &str) -> Option<usize> {
        self.menu
            .as_ref()?
            .paths
            .iter()
            .position(|path| path.name == name)
    }

    pub fn prescale_value(&self, name: &str) -> Option<u32> {
        self.path(name).map(|path| path.prescale)
    }

    pub fn l1_seeds(&self, name: &str) -> Option<&[String]> {
        self.path(name).map(|path| path.l1_seeds.as_slice())
    }

    pub fn process_name(&self) -> Option<&str> {
        self.menu.as_ref().map(|menu| menu.process_name.as_str())
    }

    fn path(&self, name: &str) -> Option<&HltPath> {
        self.menu
            .as_ref()?
            .paths
            .iter()
            .find(|path| path.name == name)
    }
}

/// Reduced L1 trigger menu: which names are physics algorithms and which are
/// technical triggers. Consumed by the prescale weight provider to pick the
/// lookup kind per seed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerMenuLite {
    #[serde(default)]
    pub algorithms: BTreeSet<String>,
    #[serde(default)]
    pub technical_triggers: BTreeSet<String>,
}

impl TriggerMenuLite {
    pub fn is_algorithm(&self, name: &str) -> bool {
        self.algorithms.contains(name)
    }

    pub fn is_technical(&self, name: &str) -> bool {
        self.technical_triggers.contains(name)
    }
}

/// Which L1 lookup table a trigger name lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum L1TriggerKind {
    Algorithm,
    Technical,
}

/// The L1 trigger utility seam: per-event algorithm decisions and prescale
/// lookups, both fallible with subsystem error codes.
pub trait L1Access {
    fn decision(&self, event: &Event, algorithm: &str) -> Result<bool, L1Error>;

    fn prescale(
        &self,
        event: &Event,
        trigger: &str,
        kind: L1TriggerKind,
    ) -> Result<i32, L1Error>;
}

/// Backend for setups without an L1 subsystem; every lookup fails, which the
/// engine degrades to the configured error reply.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoL1;

impl L1Access for NoL1 {
    fn decision(&self, _event: &Event, _algorithm: &str) -> Result<bool, L1Error> {
        Err(L1Error::Unavailable)
    }

    fn prescale(
        &self,
        _event: &Event,
        _trigger: &str,
        _kind: L1TriggerKind,
    ) -> Result<i32, L1Error> {
        Err(L1Error::Unavailable)
    }
}

/// Per-event product store. Products are inserted by the host under their
/// input tag and retrieved read-only by the engine; a missing product is a
/// plain `None`, never an error at this layer.
#[derive(Debug, Default)]
pub struct Event {
    dcs: HashMap<InputTag, DcsStatusCollection>,
    gt: HashMap<InputTag, GtReadoutRecord>,
    trigger_results: HashMap<InputTag, TriggerResults>,
}

impl Event {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_dcs_status(&mut self, tag: InputTag, collection: DcsStatusCollection) {
        self.dcs.insert(tag, collection);
    }

    pub fn put_gt_readout(&mut self, tag: InputTag, record: GtReadoutRecord) {
        self.gt.insert(tag, record);
    }

    pub fn put_trigger_results(&mut self, tag: InputTag, results: TriggerResults) {
        self.trigger_results.insert(tag, results);
    }

    pub fn dcs_status(&self, tag: &InputTag) -> Option<&DcsStatusCollection> {
        self.dcs.get(tag)
    }

    pub fn gt_readout(&self, tag: &InputTag) -> Option<&GtReadoutRecord> {
        self.gt.get(tag)
    }

    pub fn trigger_results(&self, tag: &InputTag) -> Option<&TriggerResults> {
        self.trigger_results.get(tag)
    }
}

/// Run-level context: the run number plus the trigger menus valid for it,
/// keyed by process name (HLT) and by product label (L1 menu lite).
#[derive(Debug, Clone, Default)]
pub struct Run {
    pub number: u32,
    hlt_menus: HashMap<String, HltMenu>,
    l1_menus: HashMap<String, TriggerMenuLite>,
}

impl Run {
    pub fn new(number: u32) -> Self {
        Self {
            number,
            ..Self::default()
        }
    }

    pub fn put_hlt_menu(&mut self, menu: HltMenu) {
        self.hlt_menus.insert(menu.process_name.clone(), menu);
    }

    pub fn with_hlt_menu(mut self, menu: HltMenu) -> Self {
        self.put_hlt_menu(menu);
        self
    }

    pub fn hlt_menu(&self, process: &str) -> Option<&HltMenu> {
        self.hlt_menus.get(process)
    }

    pub fn put_l1_menu(&mut self, label: impl Into<String>, menu: TriggerMenuLite) {
        self.l1_menus.insert(label.into(), menu);
    }

    pub fn with_l1_menu(mut self, label: impl Into<String>, menu: TriggerMenuLite) -> Self {
        self.put_l1_menu(label, menu);
        self
    }

    pub fn l1_menu(&self, label: &str) -> Option<&TriggerMenuLite> {
        self.l1_menus.get(label)
    }
}

/// Run-scoped conditions access: the expression record for DB-driven
/// refreshes and the L1 backend. Passed by reference into `init_run` and
/// `accept`; never mutated by the engine.
pub struct EventSetup {
    trigger_bits: Option<TriggerBitsRecord>,
    l1: Box<dyn L1Access>,
}

impl EventSetup {
    pub fn new(l1: Box<dyn L1Access>) -> Self {
        Self {
            trigger_bits: None,
            l1,
        }
    }

    pub fn with_trigger_bits(mut self, record: TriggerBitsRecord) -> Self {
        self.trigger_bits = Some(record);
        self
    }

    pub fn trigger_bits(&self) -> Option<&TriggerBitsRecord> {
        self.trigger_bits.as_ref()
    }

    pub fn l1(&self) -> &dyn L1Access {
        self.l1.as_ref()
    }
}

impl Default for EventSetup {
    fn default() -> Self {
        Self::new(Box::new(NoL1))
    }
}
