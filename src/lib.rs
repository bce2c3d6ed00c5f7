//! # trigflag: Configurable Trigger Decision Engine
//!
//! trigflag evaluates configurable AND/OR combinations of detector status
//! bits, hardware-trigger decisions and software-trigger path results into a
//! single per-event accept/reject decision, with an explicit fallback policy
//! for missing or invalid data.
//!
//! ## Components
//!
//! ### 1. Logical Expressions
//! Boolean formulas over named operands with `AND`/`OR`/`NOT`, parentheses
//! and whole-expression negation (`~`):
//! - Expression compilation and evaluation ([`expression`])
//!
//! ### 2. Signal Categories
//! Four independently enabled categories, each resolving its operands
//! against a different source and combining them with its own AND/OR flag:
//! - DCS: detector partition readiness
//! - GT: global-trigger status bits (`PhysicsDeclared`)
//! - L1: level-1 algorithm decisions
//! - HLT: high-level-trigger path results
//!
//! ### 3. Orchestration
//! The flag object owns the categories, the global combiner, the run-change
//! watcher and the HLT configuration cache:
//! - Accept/reject orchestration ([`flag`])
//! - Conditions-database expression refresh ([`conditions`])
//!
//! ### 4. Prescale Weights
//! An independent provider computing per-event MC reweighting factors from
//! L1 and HLT prescales ([`prescale`]).
//!
//! ## Processing Model
//!
//! ```text
//! Configuration → GenericTriggerEventFlag::new
//!                     │ per run: init_run (DB refresh, HLT config)
//!                     ▼ per event: accept → bool
//! ```
//!
//! Everything is synchronous and single-threaded: per-event lookups are
//! in-memory accesses against already-materialized event data, and the only
//! conditions-database traffic happens at run boundaries.
//!
//! ## Error Policy
//!
//! No failure in the per-event path is propagated to the caller. Each
//! category carries a configured `errorReply` polarity that substitutes for
//! any decision that cannot be computed (missing product, unknown operand,
//! malformed expression), logged through [`tracing`]. Whether "unknown"
//! means pass or fail is an analysis choice, not a crate constant.
//!
//! ## Usage Example
//!
//! ```rust
//! use trigflag::config::TriggerFlagConfig;
//! use trigflag::event::{Event, EventSetup, HltMenu, HltPath, InputTag, PathStatus, Run, TriggerResults};
//! use trigflag::flag::GenericTriggerEventFlag;
//!
//! let config = TriggerFlagConfig::from_json(
//!     r#"{
//!         "andOr": false,
//!         "andOrHlt": true,
//!         "hltInputTag": "TriggerResults::HLT",
//!         "hltPaths": ["HLT_Mu9"],
//!         "errorReplyHlt": false
//!     }"#,
//! )
//! .unwrap();
//! let mut flag = GenericTriggerEventFlag::new(&config);
//!
//! let run = Run::new(1).with_hlt_menu(HltMenu::new("HLT", vec![HltPath::new("HLT_Mu9")]));
//! let setup = EventSetup::default();
//! flag.init_run(&run, &setup);
//!
//! let mut event = Event::new();
//! event.put_trigger_results(
//!     "TriggerResults::HLT".parse::<InputTag>().unwrap(),
//!     TriggerResults::new(vec![PathStatus::accepted()]),
//! );
//! assert!(flag.accept(&event, &setup));
//! ```

pub mod conditions;
pub mod config;
pub mod error;
pub mod event;
pub mod expression;
pub mod flag;
pub mod prescale;

pub use config::{PrescaleWeightConfig, TriggerFlagConfig};
pub use error::{ConfigError, ExpressionError, HltConfigError, L1Error};
pub use event::{Event, EventSetup, InputTag, Run};
pub use expression::LogicalExpression;
pub use flag::{Combine, GenericTriggerEventFlag, TriggerCategory};
pub use prescale::PrescaleWeightProvider;
