//! # Configuration
//!
//! Serde-backed configuration surfaces for the two engine entry points. Key
//! names follow the upstream parameter-set convention (`andOr`, `andOrDcs`,
//! `dcsInputTag`, ..., `hltDBKey`); presence of an enabling key is
//! significant, so enabling keys deserialize to `Option<bool>` and absence
//! disables the owning category (or the whole flag) rather than erroring.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigResult;
use crate::event::InputTag;

/// Configuration of a [`GenericTriggerEventFlag`](crate::flag::GenericTriggerEventFlag).
///
/// The global `andOr` key must be present for the flag to be on at all; each
/// category is then enabled by the presence of its own `andOr*` key. All
/// combiner booleans use the upstream polarity: `true` = OR, `false` = AND.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerFlagConfig {
    #[serde(rename = "andOr")]
    pub and_or: Option<bool>,

    #[serde(rename = "andOrDcs")]
    pub and_or_dcs: Option<bool>,
    #[serde(rename = "dcsInputTag")]
    pub dcs_input_tag: Option<InputTag>,
    #[serde(rename = "dcsPartitions")]
    pub dcs_partitions: Vec<u32>,
    #[serde(rename = "errorReplyDcs")]
    pub error_reply_dcs: bool,

    #[serde(rename = "andOrGt")]
    pub and_or_gt: Option<bool>,
    #[serde(rename = "gtInputTag")]
    pub gt_input_tag: Option<InputTag>,
    #[serde(rename = "gtStatusBits")]
    pub gt_status_bits: Vec<String>,
    #[serde(rename = "errorReplyGt")]
    pub error_reply_gt: bool,
    #[serde(rename = "gtDBKey")]
    pub gt_db_key: String,

    #[serde(rename = "andOrL1")]
    pub and_or_l1: Option<bool>,
    #[serde(rename = "l1Algorithms")]
    pub l1_algorithms: Vec<String>,
    #[serde(rename = "errorReplyL1")]
    pub error_reply_l1: bool,
    #[serde(rename = "l1DBKey")]
    pub l1_db_key: String,

    #[serde(rename = "andOrHlt")]
    pub and_or_hlt: Option<bool>,
    #[serde(rename = "hltInputTag")]
    pub hlt_input_tag: Option<InputTag>,
    #[serde(rename = "hltPaths")]
    pub hlt_paths: Vec<String>,
    #[serde(rename = "errorReplyHlt")]
    pub error_reply_hlt: bool,
    #[serde(rename = "hltDBKey")]
    pub hlt_db_key: String,
}

impl TriggerFlagConfig {
    pub fn from_json(text: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Configuration of a [`PrescaleWeightProvider`](crate::prescale::PrescaleWeightProvider).
///
/// Valid only when the trigger-results tag carries both a label and a
/// process name, the L1 menu label is set, and the path list is non-empty;
/// otherwise the provider permanently reports weight 1.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrescaleWeightConfig {
    #[serde(rename = "prescaledTriggerResults")]
    pub trigger_results: Option<InputTag>,
    #[serde(rename = "l1GtTriggerMenuLite")]
    pub l1_menu_label: String,
    #[serde(rename = "hltPaths")]
    pub hlt_paths: Vec<String>,
}

impl PrescaleWeightConfig {
    pub fn from_json(text: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}
