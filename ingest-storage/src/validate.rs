//! Time validation (§4.7 step 9).

use crate::error::{Result, StorageError};

/// Validates `begin`/`end` against the datastream's `min_valid_time` and
/// the current wall-clock time. Both bounds are inclusive at their
/// permitted edge (`begin == min_valid_time` and `end == now` both pass).
pub fn validate_times(begin: f64, end: f64, min_valid_time: Option<f64>, now: f64) -> Result<()> {
    if let Some(min_valid_time) = min_valid_time {
        if begin < min_valid_time {
            return Err(StorageError::BeforeMinValidTime { begin, min_valid_time });
        }
    }
    if end > now {
        return Err(StorageError::FutureTime { end, now });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_times_within_bounds() {
        assert!(validate_times(100.0, 200.0, Some(0.0), 1000.0).is_ok());
    }

    #[test]
    fn rejects_begin_before_min_valid_time() {
        let err = validate_times(5.0, 200.0, Some(10.0), 1000.0).unwrap_err();
        assert!(matches!(err, StorageError::BeforeMinValidTime { .. }));
    }

    #[test]
    fn rejects_end_in_the_future() {
        let err = validate_times(5.0, 2000.0, None, 1000.0).unwrap_err();
        assert!(matches!(err, StorageError::FutureTime { .. }));
    }

    #[test]
    fn boundary_values_are_permitted() {
        assert!(validate_times(10.0, 1000.0, Some(10.0), 1000.0).is_ok());
    }
}
