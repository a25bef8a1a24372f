//! Sled-backed store adapters.
//!
//! Records are bincode-encoded. The version store keeps all of its keyspaces
//! (hash index, rule lists, counter) in one tree so a registration commits
//! through a single atomic batch.

use super::{AgreementEntry, AgreementStore, MemberRecord, MembershipStore, VersionStore};
use crate::error::StorageError;
use crate::events::{Event, EventSink};
use crate::types::{PrincipalId, Rule, RuleSetHash, Version};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::{Batch, Db, Tree};
use tracing::warn;

const HASH_PREFIX: u8 = b'h';
const VERSION_PREFIX: u8 = b'v';
const CURRENT_KEY: &[u8] = b"meta/current";

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
    bincode::serialize(value).map_err(|e| StorageError::Encode(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
    bincode::deserialize(bytes).map_err(|e| StorageError::Decode(e.to_string()))
}

fn prefixed(prefix: u8, key: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(key.len() + 2);
    out.push(prefix);
    out.push(b'/');
    out.extend_from_slice(key);
    out
}

/// Version store persisted in a sled tree.
pub struct SledVersionStore {
    tree: Tree,
}

impl SledVersionStore {
    pub fn with_db(db: &Db) -> Result<Self, StorageError> {
        Ok(Self {
            tree: db.open_tree("versions")?,
        })
    }
}

impl VersionStore for SledVersionStore {
    fn version_of(&self, hash: &RuleSetHash) -> Result<Option<Version>, StorageError> {
        self.tree
            .get(prefixed(HASH_PREFIX, hash))?
            .map(|bytes| decode::<Version>(&bytes))
            .transpose()
    }

    fn rules_of(&self, version: Version) -> Result<Option<Vec<Rule>>, StorageError> {
        self.tree
            .get(prefixed(VERSION_PREFIX, &version.to_be_bytes()))?
            .map(|bytes| decode::<Vec<Rule>>(&bytes))
            .transpose()
    }

    fn current_version(&self) -> Result<Version, StorageError> {
        match self.tree.get(CURRENT_KEY)? {
            Some(bytes) => decode::<Version>(&bytes),
            None => Ok(0),
        }
    }

    fn insert_version(
        &self,
        hash: RuleSetHash,
        version: Version,
        rules: &[Rule],
    ) -> Result<(), StorageError> {
        let mut batch = Batch::default();
        batch.insert(prefixed(HASH_PREFIX, &hash), encode(&version)?);
        batch.insert(
            prefixed(VERSION_PREFIX, &version.to_be_bytes()),
            encode(&rules.to_vec())?,
        );
        batch.insert(CURRENT_KEY, encode(&version)?);
        self.tree.apply_batch(batch)?;
        self.tree.flush()?;
        Ok(())
    }
}

/// Agreement store persisted in a per-agent sled tree.
pub struct SledAgreementStore {
    tree: Tree,
}

impl SledAgreementStore {
    pub fn with_db(db: &Db, agent: &PrincipalId) -> Result<Self, StorageError> {
        Ok(Self {
            tree: db.open_tree(format!("agreements/{}", agent))?,
        })
    }
}

impl AgreementStore for SledAgreementStore {
    fn get(&self, rule: &Rule) -> Result<Option<AgreementEntry>, StorageError> {
        self.tree
            .get(rule.as_bytes())?
            .map(|bytes| decode::<AgreementEntry>(&bytes))
            .transpose()
    }

    fn put(&self, rule: &Rule, entry: AgreementEntry) -> Result<(), StorageError> {
        self.tree.insert(rule.as_bytes(), encode(&entry)?)?;
        self.tree.flush()?;
        Ok(())
    }
}

/// Membership store persisted in a sled tree.
pub struct SledMembershipStore {
    tree: Tree,
}

impl SledMembershipStore {
    pub fn with_db(db: &Db) -> Result<Self, StorageError> {
        Ok(Self {
            tree: db.open_tree("members")?,
        })
    }
}

impl MembershipStore for SledMembershipStore {
    fn get(&self, principal: &PrincipalId) -> Result<Option<MemberRecord>, StorageError> {
        self.tree
            .get(principal.0.as_bytes())?
            .map(|bytes| decode::<MemberRecord>(&bytes))
            .transpose()
    }

    fn put(&self, principal: &PrincipalId, record: &MemberRecord) -> Result<(), StorageError> {
        self.tree.insert(principal.0.as_bytes(), encode(record)?)?;
        self.tree.flush()?;
        Ok(())
    }

    fn remove(&self, principal: &PrincipalId) -> Result<(), StorageError> {
        self.tree.remove(principal.0.as_bytes())?;
        self.tree.flush()?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<(PrincipalId, MemberRecord)>, StorageError> {
        let mut entries = Vec::new();
        for item in self.tree.iter() {
            let (key, value) = item?;
            let principal = PrincipalId::new(String::from_utf8_lossy(&key).into_owned());
            entries.push((principal, decode::<MemberRecord>(&value)?));
        }
        Ok(entries)
    }
}

/// Event sink persisted in a sled tree, readable back in emission order.
pub struct SledEventLog {
    db: Db,
    tree: Tree,
}

impl SledEventLog {
    pub fn with_db(db: &Db) -> Result<Self, StorageError> {
        Ok(Self {
            db: db.clone(),
            tree: db.open_tree("events")?,
        })
    }

    pub fn all(&self) -> Result<Vec<Event>, StorageError> {
        let mut events = Vec::new();
        for item in self.tree.iter() {
            let (_, value) = item?;
            events.push(decode::<Event>(&value)?);
        }
        Ok(events)
    }

    fn append(&self, event: &Event) -> Result<(), StorageError> {
        let id = self.db.generate_id()?;
        self.tree.insert(id.to_be_bytes(), encode(event)?)?;
        self.tree.flush()?;
        Ok(())
    }
}

impl EventSink for SledEventLog {
    fn emit(&self, event: Event) {
        if let Err(e) = self.append(&event) {
            warn!(error = %e, "failed to persist event");
        }
    }
}
