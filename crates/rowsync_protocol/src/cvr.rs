//! Client view records.
//!
//! A client view record (CVR) captures which rows, at which versions, a
//! client group had at a particular moment. Each pull builds a fresh CVR from
//! the store metadata and diffs it against the one persisted for the group;
//! only the difference is shipped to the client.
//!
//! Everything in this module is a pure function over values.

use crate::error::{ProtocolError, ProtocolResult};
use crate::ids::{ObjectId, RowVersion};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// CVR version of a client group that has never been pulled.
pub const DEFAULT_CVR_VERSION: u64 = 0;

static EMPTY_CVR: ClientViewRecord = ClientViewRecord::EMPTY;

/// Mapping from row id to the version a client group last observed.
///
/// Absence of a key means the row is not known to the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientViewRecord(BTreeMap<ObjectId, RowVersion>);

impl ClientViewRecord {
    /// The empty record, used when a group has no stored CVR yet.
    pub const EMPTY: ClientViewRecord = ClientViewRecord(BTreeMap::new());

    /// Builds a record from `(id, version)` metadata pairs.
    ///
    /// If an id appears more than once the last pair wins.
    pub fn build<I>(metadata: I) -> Self
    where
        I: IntoIterator<Item = (ObjectId, RowVersion)>,
    {
        Self(metadata.into_iter().collect())
    }

    /// Returns the version recorded for `id`, if any.
    #[must_use]
    pub fn get(&self, id: &ObjectId) -> Option<RowVersion> {
        self.0.get(id).copied()
    }

    /// Returns true if the record contains `id`.
    #[must_use]
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.0.contains_key(id)
    }

    /// Number of rows in the record.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the record holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over `(id, version)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&ObjectId, RowVersion)> {
        self.0.iter().map(|(id, version)| (id, *version))
    }

    /// Computes what a client holding `prev` needs to reach `next`.
    ///
    /// A missing `prev` is treated as the empty record, so a first pull puts
    /// every row of `next` and deletes nothing. Rows whose version did not
    /// strictly increase are not put again.
    #[must_use]
    pub fn diff(prev: Option<&ClientViewRecord>, next: &ClientViewRecord) -> CvrDiff {
        let prev = prev.unwrap_or(&EMPTY_CVR);

        let puts = next
            .0
            .iter()
            .filter(|(id, version)| match prev.0.get(*id) {
                None => true,
                Some(seen) => seen < *version,
            })
            .map(|(id, _)| id.clone())
            .collect();

        let dels = prev
            .0
            .keys()
            .filter(|id| !next.0.contains_key(*id))
            .cloned()
            .collect();

        CvrDiff { puts, dels }
    }

    /// Encodes the record into the opaque blob stored on a client group.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| ProtocolError::CvrEncode(e.to_string()))?;
        Ok(buf)
    }

    /// Decodes a record previously produced by [`ClientViewRecord::encode`].
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        ciborium::from_reader(bytes).map_err(|e| ProtocolError::CvrDecode(e.to_string()))
    }
}

impl FromIterator<(ObjectId, RowVersion)> for ClientViewRecord {
    fn from_iter<I: IntoIterator<Item = (ObjectId, RowVersion)>>(iter: I) -> Self {
        Self::build(iter)
    }
}

/// Difference between two client view records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CvrDiff {
    /// Rows that are new to the client or have a newer version.
    pub puts: Vec<ObjectId>,
    /// Rows the client holds that are no longer visible.
    pub dels: Vec<ObjectId>,
}

impl CvrDiff {
    /// Returns true if neither puts nor deletes are needed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.puts.is_empty() && self.dels.is_empty()
    }
}
