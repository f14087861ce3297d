//! QC bit checks (spec §4.6): limit, delta, time and solar-obstruction
//! tests, plus the `standard_qc_checks` orchestration that runs them in
//! order over a group's data variables.

pub mod delta;
pub mod limit;
pub mod solar;
pub mod standard;
pub mod time;

pub use delta::qc_delta_checks;
pub use limit::{LimitCheckConfig, qc_limit_checks};
pub use solar::solar_obstruction_check;
pub use standard::{PreviousSampleContext, StandardQcConfig, standard_qc_checks};
pub use time::{TimeCheckConfig, qc_time_checks};
