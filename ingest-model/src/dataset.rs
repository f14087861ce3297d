//! An output dataset: a [`Group`] paired with the [`DatastreamId`] that
//! names where it will eventually be stored. Used as the mapper's and
//! transformation engine's output handle — neither owns a `Datastream`
//! directly, since the registry is process-wide shared state.

use crate::datastream::DatastreamId;
use crate::group::Group;

#[derive(Debug, Clone)]
pub struct Dataset {
    pub datastream: DatastreamId,
    pub root: Group,
}

impl Dataset {
    #[must_use]
    pub fn new(datastream: DatastreamId, root: Group) -> Self {
        Self { datastream, root }
    }
}
