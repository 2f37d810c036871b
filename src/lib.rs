// Module declarations for the library crate.

pub mod cli;
pub mod config;
pub mod engine;
pub mod frame;
pub mod logger;
pub mod point;
pub mod stats;
pub mod telemetry;
pub mod util;

pub use config::{Config, GlobalFlags, Layout};
pub use engine::Engine;
pub use frame::TouchInfo;
pub use point::Point;

/// Number of persistent ID lanes (slots) tracked by the engine.
pub const POINT_MAX: usize = 10;
/// Depth of the prediction/current ring.
pub const PP_DEEP: usize = 10;
/// Depth of the post-shake/stretch ring.
pub const PS_DEEP: usize = 10;
/// Depth of the post-filter report ring.
pub const PR_DEEP: usize = 10;
/// Rows in the shared point backing store.
pub const POINT_DEEP: usize = PP_DEEP + PS_DEEP + PR_DEEP;
/// Depth of the pressure ring.
pub const PRESSURE_DEEP: usize = 8;

const VERSION_ID: u32 = 0x2013_1106;

/// Algorithm version tag reported to the host driver.
#[inline]
pub fn version_id() -> u32 {
    VERSION_ID
}
