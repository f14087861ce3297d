pub mod median_mad;

pub use median_mad::{MAD_SCALE_FACTOR, mad_scaled, median, median_mad, median_mad_scaled};
