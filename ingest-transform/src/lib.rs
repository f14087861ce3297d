//! Coordinate-system transformation and regridding engine (§4.5).
//!
//! [`coordinate`] builds a target [`coordinate::CoordinateSystem`]'s
//! dimensions per the mapped/explicit/implicit/computed-grid precedence
//! and synthesizes companion bounds. [`engine`] decides, per variable,
//! whether transformation is necessary and dispatches to the
//! [`driver::RegridDriver`] implementing the configured
//! [`driver::TransformMethod`] (`Interpolate`/`Subsample`/`BinAverage`/
//! `Caracena`). [`qc`] stamps the canonical 13-bit transformation-QC
//! scheme on every transformed output.

pub mod caracena;
pub mod coordinate;
pub mod driver;
pub mod engine;
pub mod error;
pub mod qc;
pub mod units;

pub use coordinate::{ComputedGrid, CoordDimSpec, CoordinateSystem, needs_transform, resolve_coordinate_dim, synthesize_bounds};
pub use driver::{RegridContext, RegridDriver, RegridOutput, RegridParams, TransformMethod, driver_for};
pub use engine::{VariableTransform, transform_variable};
pub use error::{Result, TransformError};
pub use qc::{define_transformation_qc_attributes, new_transformation_qc_variable};
