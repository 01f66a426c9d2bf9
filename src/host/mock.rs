// src/host/mock.rs

//! In-memory mock host for tests
//!
//! A fake engineering project that records every invocation instead of
//! talking to a real host SDK. Edits made through the mock unit of work
//! stay buffered until commit, so tests can verify the all-or-nothing
//! guarantee by inspecting committed state after a discard.

use super::{ExclusiveAccess, HostProject, HostVersion, StorageRemoval, UnitHandle, UnitOfWork};
use crate::unit::{ObjectKind, SelectedObject, UnitDefinition, UnitInterface, UnitKind};
use crate::{Error, Result};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

#[derive(Debug, Default)]
struct ProjectState {
    next_handle: u64,
    units: BTreeMap<u64, StoredObject>,
    /// Instance storage per backing unit name -> external reference count
    storages: BTreeMap<String, usize>,
    protected: BTreeSet<u64>,
    reject_writes: BTreeSet<String>,
    locked: bool,
    can_commit: bool,
    fail_commit: bool,
    fail_editor: bool,
    editor_opened: Vec<String>,
}

#[derive(Debug, Clone)]
struct StoredObject {
    name: String,
    kind: ObjectKind,
    definition: Option<UnitDefinition>,
}

/// A fake host project backed by in-memory maps
pub struct MockProject {
    state: Rc<RefCell<ProjectState>>,
    version: HostVersion,
}

impl MockProject {
    pub fn new(version: HostVersion) -> Self {
        let state = ProjectState {
            can_commit: true,
            ..Default::default()
        };
        Self {
            state: Rc::new(RefCell::new(state)),
            version,
        }
    }

    /// Add a unit; stateful units get backing instance storage with zero
    /// external references
    pub fn add_unit(&self, definition: UnitDefinition) -> UnitHandle {
        let mut state = self.state.borrow_mut();
        state.next_handle += 1;
        let handle = state.next_handle;

        let kind = match definition.kind {
            UnitKind::Stateful => ObjectKind::Stateful,
            UnitKind::Stateless => ObjectKind::Stateless,
        };
        if definition.kind == UnitKind::Stateful {
            state.storages.insert(definition.name.clone(), 0);
        }
        state.units.insert(
            handle,
            StoredObject {
                name: definition.name.clone(),
                kind,
                definition: Some(definition),
            },
        );
        UnitHandle(handle)
    }

    /// Add a non-convertible engineering object (data block, folder, ...)
    pub fn add_other(&self, name: &str, type_name: &str) -> UnitHandle {
        let mut state = self.state.borrow_mut();
        state.next_handle += 1;
        let handle = state.next_handle;
        state.units.insert(
            handle,
            StoredObject {
                name: name.to_string(),
                kind: ObjectKind::Other(type_name.to_string()),
                definition: None,
            },
        );
        UnitHandle(handle)
    }

    /// Mark an object as protected against structural edits
    pub fn protect(&self, handle: UnitHandle) {
        self.state.borrow_mut().protected.insert(handle.0);
    }

    /// Refuse writes to the named unit (simulates a host SDK rejection)
    pub fn reject_writes_to(&self, name: &str) {
        self.state.borrow_mut().reject_writes.insert(name.to_string());
    }

    /// Simulate the host invalidating the unit of work before commit
    pub fn invalidate_commit(&self) {
        self.state.borrow_mut().can_commit = false;
    }

    /// Make `commit` itself fail after `can_commit` reported true
    pub fn fail_next_commit(&self) {
        self.state.borrow_mut().fail_commit = true;
    }

    /// Make editor-open requests fail
    pub fn fail_editor_opens(&self) {
        self.state.borrow_mut().fail_editor = true;
    }

    /// Set the external reference count of a unit's instance storage
    pub fn set_storage_refs(&self, unit: &str, refs: usize) {
        self.state.borrow_mut().storages.insert(unit.to_string(), refs);
    }

    /// Selection snapshot for the given handles, in the given order
    pub fn select(&self, handles: &[UnitHandle]) -> Vec<SelectedObject> {
        let state = self.state.borrow();
        handles
            .iter()
            .map(|h| {
                let obj = &state.units[&h.0];
                SelectedObject {
                    handle: *h,
                    name: obj.name.clone(),
                    kind: obj.kind.clone(),
                }
            })
            .collect()
    }

    // --- committed-state inspection for assertions ---

    /// Committed definition of a unit, by name
    pub fn unit_by_name(&self, name: &str) -> Option<UnitDefinition> {
        let state = self.state.borrow();
        state
            .units
            .values()
            .find(|o| o.name == name)
            .and_then(|o| o.definition.clone())
    }

    pub fn has_storage(&self, unit: &str) -> bool {
        self.state.borrow().storages.contains_key(unit)
    }

    pub fn editor_opened(&self) -> Vec<String> {
        self.state.borrow().editor_opened.clone()
    }

    pub fn is_locked(&self) -> bool {
        self.state.borrow().locked
    }
}

impl HostProject for MockProject {
    type Exclusive = MockExclusive;

    fn version(&self) -> HostVersion {
        self.version
    }

    fn acquire_exclusive(&self, label: &str) -> Result<MockExclusive> {
        let mut state = self.state.borrow_mut();
        if state.locked {
            return Err(Error::AccessAlreadyHeld(label.to_string()));
        }
        state.locked = true;
        tracing::debug!("mock host: exclusive access acquired ({label})");
        Ok(MockExclusive {
            state: Rc::clone(&self.state),
        })
    }
}

/// Scoped exclusive access over the mock project; unlocks on drop
pub struct MockExclusive {
    state: Rc<RefCell<ProjectState>>,
}

impl ExclusiveAccess for MockExclusive {
    type Work = MockWork;

    fn open_work(&mut self, label: &str) -> Result<MockWork> {
        tracing::debug!("mock host: work opened ({label})");
        Ok(MockWork {
            state: Rc::clone(&self.state),
            pending_units: BTreeMap::new(),
            pending_storage_removals: BTreeSet::new(),
            pending_storage_creates: BTreeSet::new(),
        })
    }
}

impl Drop for MockExclusive {
    fn drop(&mut self) {
        self.state.borrow_mut().locked = false;
    }
}

/// Buffered unit of work; edits apply to the project only on commit
pub struct MockWork {
    state: Rc<RefCell<ProjectState>>,
    pending_units: BTreeMap<u64, UnitDefinition>,
    pending_storage_removals: BTreeSet<String>,
    pending_storage_creates: BTreeSet<String>,
}

impl UnitOfWork for MockWork {
    fn read_unit(&self, handle: UnitHandle) -> Result<UnitDefinition> {
        if let Some(pending) = self.pending_units.get(&handle.0) {
            return Ok(pending.clone());
        }
        let state = self.state.borrow();
        state
            .units
            .get(&handle.0)
            .and_then(|o| o.definition.clone())
            .ok_or(Error::UnknownUnit(handle.0))
    }

    fn is_protected(&self, handle: UnitHandle) -> bool {
        self.state.borrow().protected.contains(&handle.0)
    }

    fn write_unit(&mut self, handle: UnitHandle, definition: &UnitDefinition) -> Result<()> {
        {
            let state = self.state.borrow();
            if !state.units.contains_key(&handle.0) {
                return Err(Error::UnknownUnit(handle.0));
            }
            if state.reject_writes.contains(&definition.name) {
                return Err(Error::HostRejected {
                    unit: definition.name.clone(),
                    message: "structural edit refused".to_string(),
                });
            }
        }
        self.pending_units.insert(handle.0, definition.clone());
        Ok(())
    }

    fn remove_storage(&mut self, unit: &str) -> Result<StorageRemoval> {
        let refs = self.state.borrow().storages.get(unit).copied();
        match refs {
            None => Ok(StorageRemoval::NotFound),
            Some(r) if r > 0 => Ok(StorageRemoval::StillReferenced),
            Some(_) => {
                self.pending_storage_removals.insert(unit.to_string());
                Ok(StorageRemoval::Removed)
            }
        }
    }

    fn create_storage(&mut self, unit: &str) -> Result<()> {
        self.pending_storage_creates.insert(unit.to_string());
        Ok(())
    }

    fn open_editor(&mut self, unit: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fail_editor {
            return Err(Error::HostRejected {
                unit: unit.to_string(),
                message: "editor unavailable".to_string(),
            });
        }
        state.editor_opened.push(unit.to_string());
        Ok(())
    }

    fn can_commit(&self) -> bool {
        self.state.borrow().can_commit
    }

    fn commit(self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fail_commit {
            return Err(Error::HostRejected {
                unit: String::new(),
                message: "commit refused by host".to_string(),
            });
        }
        for (handle, definition) in &self.pending_units {
            if let Some(obj) = state.units.get_mut(handle) {
                obj.kind = match definition.kind {
                    UnitKind::Stateful => ObjectKind::Stateful,
                    UnitKind::Stateless => ObjectKind::Stateless,
                };
                obj.definition = Some(definition.clone());
            }
        }
        for unit in &self.pending_storage_removals {
            state.storages.remove(unit);
        }
        for unit in &self.pending_storage_creates {
            state.storages.entry(unit.clone()).or_insert(0);
        }
        Ok(())
    }
}

/// Convenience constructor for test definitions
pub fn definition(
    name: &str,
    kind: UnitKind,
    interface: UnitInterface,
    body: &str,
) -> UnitDefinition {
    UnitDefinition {
        name: name.to_string(),
        kind,
        interface,
        body: body.to_string(),
    }
}
