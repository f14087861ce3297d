//! Per-stream custom-QC callback (§4.7 step 6).

use ingest_model::Group;

use crate::error::Result;

/// A per-datastream hook run just before storage, after standard QC. If
/// it returns `false` the dataset is dropped silently (no error, no
/// file written) — the same soft-drop semantics `dsproc_hook_run_store`
/// had when its callback returned zero.
pub trait CustomQcHook: Send + Sync {
    fn run(&self, group: &mut Group) -> Result<bool>;
}

/// The default hook, used when a datastream has no registered callback:
/// always keeps the dataset.
pub struct NoopHook;

impl CustomQcHook for NoopHook {
    fn run(&self, _group: &mut Group) -> Result<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_hook_always_keeps_the_dataset() {
        let mut g = Group::new("ds");
        assert!(NoopHook.run(&mut g).unwrap());
    }
}
