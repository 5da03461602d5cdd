//! ad_orchestrator: video ad insertion engine.
//!
//! Decides when preroll, midroll and postroll slots become eligible, runs
//! each ad through a cancelable pipeline, and hands the player back to
//! content afterwards. Fetching and rendering ads are left to the host's
//! collaborators (see [`ad`]).

pub mod ad;
pub mod clock;
pub mod config;
pub mod context;
pub mod device;
pub mod error;
pub mod guard;
pub mod orchestrator;
pub mod pipeline;
pub mod player;
pub mod signal;
pub mod simulate;
pub mod slot;
pub mod timer;
pub mod trigger;

pub use config::{AdSlotConfig, PluginOptions, RollPosition, SlotOptions};
pub use error::{AdError, OptionsError, SimulationError};
pub use orchestrator::Orchestrator;
pub use signal::Signal;
