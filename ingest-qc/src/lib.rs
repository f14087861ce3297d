//! Quality-control bit checks and windowed outlier utilities.
//!
//! [`checks`] implements the self-describing QC bit scheme (§4.6):
//! limit, delta, time and solar-obstruction tests, orchestrated by
//! [`checks::standard_qc_checks`]. [`rollup`] consolidates a
//! transformation-QC variable's 13-bit scheme into a `bad`/`indeterminate`
//! pair for datastreams carrying `ROLLUP_TRANS_QC`. [`outlier`]
//! implements the windowed outlier filters (§4.8).

pub mod bits;
pub mod checks;
pub mod error;
pub mod outlier;
pub mod rollup;
pub mod stats;
pub mod values;

pub use bits::{Assessment, BitDescription, bit_descriptions, find_bit_by_phrase};
pub use checks::{LimitCheckConfig, PreviousSampleContext, StandardQcConfig, TimeCheckConfig, qc_delta_checks, qc_limit_checks, qc_time_checks, standard_qc_checks};
pub use error::{QcError, Result};
pub use outlier::{OutlierCenter, OutlierConfig, OutlierMethod, OutlierReport, flag_outliers};
pub use rollup::{RollupResult, is_transformation_qc, rollup_transformation_qc};
