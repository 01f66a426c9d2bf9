// src/rewrite.rs

//! Structural rewriting of one unit between representations
//!
//! The rewrite is split in two layers: [`rewrite_definition`] is the pure
//! transformation of interface + body under a policy, and [`UnitRewriter`]
//! drives it through the host's unit of work, turning host refusals and
//! best-effort side effects into per-unit outcome data.
//!
//! The body is opaque text; the only syntax touched is variable
//! references. Persistent locals are referenced as `#Static.name` and all
//! other interface variables as `#name`, so relocating a static into the
//! parameter or temp namespace retargets its references to `#name`.

use crate::host::{HostVersion, StorageRemoval, UnitOfWork};
use crate::policy::{ConversionPolicy, ReturnRelocation, StaticRelocation};
use crate::unit::{FailureReason, Outcome, Section, Unit, UnitDefinition, UnitInterface, UnitKind, Variable};
use crate::{Error, Result};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Oldest host version whose structural-edit API this engine understands
pub const MIN_HOST_VERSION: HostVersion = HostVersion(15);
/// Newest host version validated against this engine
pub const MAX_HOST_VERSION: HostVersion = HostVersion(20);

/// Whether structural rewrites are possible on the given host
pub fn host_supported(version: HostVersion) -> bool {
    version >= MIN_HOST_VERSION && version <= MAX_HOST_VERSION
}

fn static_ref_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"#Static\.([A-Za-z_][A-Za-z0-9_]*)").expect("static reference pattern")
    })
}

/// Retarget `#Static.name` references to `#name` for relocated variables.
/// References to names outside `relocated` are left as they are.
fn retarget_static_refs(body: &str, relocated: &HashSet<&str>) -> String {
    static_ref_pattern()
        .replace_all(body, |caps: &regex::Captures<'_>| {
            let name = &caps[1];
            if relocated.contains(name) {
                format!("#{name}")
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}

/// Pure structural rewrite of one definition under a policy
///
/// The direction follows the definition's current kind. Per-unit failures
/// are returned as [`FailureReason`] data; there are no other error paths.
pub fn rewrite_definition(
    definition: &UnitDefinition,
    policy: &ConversionPolicy,
) -> std::result::Result<UnitDefinition, FailureReason> {
    if definition.interface.first_unsupported().is_some() {
        return Err(FailureReason::UnsupportedInterfaceElement);
    }
    match definition.kind {
        UnitKind::Stateful => to_stateless(definition, policy),
        UnitKind::Stateless => to_stateful(definition, policy),
    }
}

/// Stateful -> stateless: relocate persistent locals, drop instance memory
fn to_stateless(
    definition: &UnitDefinition,
    policy: &ConversionPolicy,
) -> std::result::Result<UnitDefinition, FailureReason> {
    let interface = &definition.interface;
    let statics: Vec<&Variable> = interface.section(Section::Static).collect();

    // Relocation merges the `#Static.name` namespace into `#name`, so a
    // static may not share its name with any other interface variable.
    if policy.static_relocation != StaticRelocation::Discard {
        for var in &statics {
            let collides = interface
                .variables
                .iter()
                .any(|other| other.section != Section::Static && other.name == var.name);
            if collides {
                return Err(FailureReason::NameCollisionOnRelocation);
            }
        }
    }

    let relocated: HashSet<&str> = statics.iter().map(|v| v.name.as_str()).collect();

    let (variables, body) = match policy.static_relocation {
        StaticRelocation::ToInOutParameter => {
            // Non-static variables keep their declared order; relocated
            // statics become trailing in/out parameters.
            let mut variables: Vec<Variable> = interface
                .variables
                .iter()
                .filter(|v| v.section != Section::Static)
                .cloned()
                .collect();
            variables.extend(statics.iter().map(|v| Variable {
                section: Section::InOut,
                ..(*v).clone()
            }));
            (variables, retarget_static_refs(&definition.body, &relocated))
        }
        StaticRelocation::ToTempVariable => {
            // In-place storage-class change preserves declared order
            let variables = interface
                .variables
                .iter()
                .map(|v| {
                    if v.section == Section::Static {
                        Variable {
                            section: Section::Temp,
                            ..v.clone()
                        }
                    } else {
                        v.clone()
                    }
                })
                .collect();
            (variables, retarget_static_refs(&definition.body, &relocated))
        }
        StaticRelocation::Discard => {
            // Dropped variables leave their references untouched in the
            // payload; the host flags them on the next compile.
            let variables = interface
                .variables
                .iter()
                .filter(|v| v.section != Section::Static)
                .cloned()
                .collect();
            (variables, definition.body.clone())
        }
    };

    Ok(UnitDefinition {
        name: definition.name.clone(),
        kind: UnitKind::Stateless,
        interface: UnitInterface::new(variables),
        body,
    })
}

/// Stateless -> stateful: relocate the return channel
fn to_stateful(
    definition: &UnitDefinition,
    policy: &ConversionPolicy,
) -> std::result::Result<UnitDefinition, FailureReason> {
    let interface = &definition.interface;

    let variables = match policy.return_relocation {
        ReturnRelocation::ToOutputParameter => {
            // The return channel keeps its name and type and becomes the
            // trailing output parameter; its `#name` references stay valid.
            let mut variables: Vec<Variable> = interface
                .variables
                .iter()
                .filter(|v| v.section != Section::Return)
                .cloned()
                .collect();
            variables.extend(interface.section(Section::Return).map(|v| Variable {
                section: Section::Output,
                ..v.clone()
            }));
            variables
        }
        ReturnRelocation::Discard => interface
            .variables
            .iter()
            .filter(|v| v.section != Section::Return)
            .cloned()
            .collect(),
    };

    Ok(UnitDefinition {
        name: definition.name.clone(),
        kind: UnitKind::Stateful,
        interface: UnitInterface::new(variables),
        body: definition.body.clone(),
    })
}

/// Drives [`rewrite_definition`] through the host's unit of work
pub struct UnitRewriter<'a> {
    policy: &'a ConversionPolicy,
    host_version: HostVersion,
}

impl<'a> UnitRewriter<'a> {
    pub fn new(policy: &'a ConversionPolicy, host_version: HostVersion) -> Self {
        Self {
            policy,
            host_version,
        }
    }

    /// Rewrite one unit inside the open work, resolving its outcome.
    ///
    /// Per-unit failures become outcome data; `Err` is reserved for
    /// infrastructure faults that should abort the invocation.
    pub fn apply<W: UnitOfWork>(&self, work: &mut W, unit: &mut Unit) -> Result<()> {
        if !host_supported(self.host_version) {
            tracing::warn!(
                "host {} outside supported range {}..={}",
                self.host_version,
                MIN_HOST_VERSION,
                MAX_HOST_VERSION
            );
            unit.resolve(Outcome::Failed {
                reason: FailureReason::HostVersionIncompatible,
            });
            return Ok(());
        }

        let definition = work.read_unit(unit.handle)?;

        let rewritten = match rewrite_definition(&definition, self.policy) {
            Ok(rewritten) => rewritten,
            Err(reason) => {
                tracing::info!("unit '{}' not convertible: {}", unit.name, reason);
                unit.resolve(Outcome::Failed { reason });
                return Ok(());
            }
        };

        match work.write_unit(unit.handle, &rewritten) {
            Ok(()) => {}
            Err(Error::HostRejected { unit: name, message }) => {
                tracing::info!("host rejected write to '{name}': {message}");
                unit.resolve(Outcome::Failed {
                    reason: FailureReason::HostRejectedWrite,
                });
                return Ok(());
            }
            Err(e) => return Err(e),
        }

        let mut notes = Vec::new();
        match definition.kind {
            UnitKind::Stateful => {
                if self.policy.remove_auxiliary_storage {
                    match work.remove_storage(&unit.name) {
                        Ok(StorageRemoval::Removed) | Ok(StorageRemoval::NotFound) => {}
                        Ok(StorageRemoval::StillReferenced) => {
                            notes.push(
                                "instance storage kept: still referenced by other callers"
                                    .to_string(),
                            );
                        }
                        Err(e) => notes.push(format!("instance storage not removed: {e}")),
                    }
                }
            }
            UnitKind::Stateless => {
                if let Err(e) = work.create_storage(&unit.name) {
                    notes.push(format!("instance storage not created: {e}"));
                }
            }
        }

        if self.policy.open_result_in_editor {
            // Deliberately silent on failure
            if let Err(e) = work.open_editor(&unit.name) {
                tracing::debug!("editor open failed for '{}': {e}", unit.name);
            }
        }

        tracing::info!(
            "unit '{}' converted to {}",
            unit.name,
            definition.kind.opposite()
        );
        unit.resolve(Outcome::Succeeded { notes });
        Ok(())
    }
}
