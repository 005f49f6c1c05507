//! Deterministic simulation harness for viewbridge testing.
//!
//! Simulated implementations of the engine, host and environment traits, so
//! the connection manager can be driven end to end without a real engine or
//! viewhost.
//!
//! # Components
//!
//! - [`SimEnv`]: virtual clock advanced by the test
//! - [`RecordingHost`]: records outbound messages and host callbacks, serves
//!   downloads from memory, acknowledges blocking sends
//! - [`SimEngine`] and [`RootHandle`]: layout-driven engine with a test-side
//!   handle to the inflated document
//! - [`SimDocument`]: content with nested imports
//! - [`Scenario`]: all of the above wired to a manager
//! - [`replay`]: JSON-lines trace replay, used by `viewbridge-replay`

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod replay;
pub mod scenario;
pub mod sim_action;
pub mod sim_component;
pub mod sim_document;
pub mod sim_engine;
pub mod sim_env;
pub mod sim_host;

pub use scenario::{SCENARIO_TOKEN, Scenario, build_payload};
pub use sim_action::SimAction;
pub use sim_component::SimComponent;
pub use sim_document::{DocumentSpec, ImportSpec, SimDocument};
pub use sim_engine::{CommandMode, RootCall, RootHandle, SIM_ENGINE_VERSION, SimEngine};
pub use sim_env::{SimEnv, SimInstant};
pub use sim_host::{HostCall, RecordingHost};
