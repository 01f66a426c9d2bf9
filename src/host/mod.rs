// src/host/mod.rs

//! Host project collaborator interfaces
//!
//! The conversion engine never owns engineering objects; it drives the host
//! through these traits. Exclusive access and the unit of work are scoped
//! values: dropping them releases the lock or discards uncommitted edits,
//! on every exit path.
//!
//! Exactly one unit of work is opened per invocation. No nesting, no
//! concurrent batches; acquisition failure is fatal and non-retriable
//! within the invocation.

pub mod mock;

use crate::unit::UnitDefinition;
use crate::Result;
use std::fmt;

/// Opaque host-native handle to an engineering object
///
/// Owned by the host; valid for at least the lifetime of the unit of work
/// that uses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitHandle(pub u64);

impl fmt::Display for UnitHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Major version of the engineering host
///
/// Structural rewrites are host-version dependent; the rewriter refuses
/// versions outside its supported range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct HostVersion(pub u32);

impl fmt::Display for HostVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V{}", self.0)
    }
}

/// Result of a best-effort auxiliary-storage removal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageRemoval {
    Removed,
    /// Another caller still references the storage; left in place
    StillReferenced,
    /// The unit never had backing storage
    NotFound,
}

/// The host engineering project
pub trait HostProject {
    type Exclusive: ExclusiveAccess;

    /// Host version, used for the rewrite compatibility gate
    fn version(&self) -> HostVersion;

    /// Acquire project-wide exclusive access. Fails fast with
    /// [`crate::Error::AccessAlreadyHeld`] when another writer holds it.
    fn acquire_exclusive(&self, label: &str) -> Result<Self::Exclusive>;
}

/// Scoped exclusive access to the project
///
/// Released on drop. Holds at most one open unit of work at a time.
pub trait ExclusiveAccess {
    type Work: UnitOfWork;

    /// Open the all-or-nothing unit of work covering the whole batch
    fn open_work(&mut self, label: &str) -> Result<Self::Work>;
}

/// The transactional boundary over the batch's edits
///
/// Edits are invisible to other readers until [`UnitOfWork::commit`]
/// consumes the work; dropping it uncommitted discards everything.
pub trait UnitOfWork {
    /// Read a unit's full definition
    fn read_unit(&self, handle: UnitHandle) -> Result<UnitDefinition>;

    /// Whether the object is protected against structural edits
    /// (library-linked, know-how protected, ...)
    fn is_protected(&self, handle: UnitHandle) -> bool;

    /// Write a rewritten definition. [`crate::Error::HostRejected`] means
    /// the host refused this one edit, not that the work is dead.
    fn write_unit(&mut self, handle: UnitHandle, definition: &UnitDefinition) -> Result<()>;

    /// Remove the generated instance storage backing `unit`, unless other
    /// callers still reference it
    fn remove_storage(&mut self, unit: &str) -> Result<StorageRemoval>;

    /// Create instance storage backing `unit` after a to-stateful rewrite
    fn create_storage(&mut self, unit: &str) -> Result<()>;

    /// Ask the host to open the unit in an editor (best effort)
    fn open_editor(&mut self, unit: &str) -> Result<()>;

    /// Whether the host can still commit this work
    fn can_commit(&self) -> bool;

    /// Commit all edits durably, consuming the work
    fn commit(self) -> Result<()>;
}
