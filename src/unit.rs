// src/unit.rs

//! Data model for program units under conversion
//!
//! A unit is either stateful (persistent locals that survive invocations,
//! backed by generated instance storage) or stateless (transient locals,
//! optional single return channel). The engine treats the executable body
//! as an opaque payload; only the interface block is structured data.
//!
//! `Unit` instances live for exactly one batch: built from the selection,
//! mutated once by the rewriter/coordinator, reported, discarded.

use crate::host::UnitHandle;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved name of a stateless unit's return channel
pub const RETURN_CHANNEL: &str = "Ret_Val";

/// Data types the structural rewrite cannot express in the target kind
const UNSUPPORTED_TYPES: &[&str] = &["INSTANCE", "DB_ANY", "ANY_INSTANCE"];

/// Deepest nested type path the host can still diagnose after conversion
const MAX_TYPE_NESTING: usize = 8;

/// The two interchangeable unit representations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitKind {
    /// Persistent local memory across invocations
    Stateful,
    /// No persistent memory; may return one value
    Stateless,
}

impl UnitKind {
    /// The representation a conversion of this kind produces
    pub fn opposite(&self) -> Self {
        match self {
            Self::Stateful => Self::Stateless,
            Self::Stateless => Self::Stateful,
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stateful => write!(f, "stateful"),
            Self::Stateless => write!(f, "stateless"),
        }
    }
}

/// Concrete kind of a selected engineering object, as the host reports it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectKind {
    Stateful,
    Stateless,
    /// Any other engineering object (data blocks, folders, ...)
    Other(String),
}

impl ObjectKind {
    /// The unit kind, if this object is a convertible unit at all
    pub fn as_unit_kind(&self) -> Option<UnitKind> {
        match self {
            Self::Stateful => Some(UnitKind::Stateful),
            Self::Stateless => Some(UnitKind::Stateless),
            Self::Other(_) => None,
        }
    }
}

/// One entry of the host's ordered selection snapshot
#[derive(Debug, Clone)]
pub struct SelectedObject {
    /// Host-native handle; the host owns the object, the core only borrows
    pub handle: UnitHandle,
    /// Unique within its container at selection time
    pub name: String,
    pub kind: ObjectKind,
}

/// Interface sections a variable can live in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Section {
    Input,
    Output,
    InOut,
    /// Persistent local; stateful units only
    Static,
    /// Transient local
    Temp,
    /// Return channel; stateless units only, at most one
    Return,
}

impl Section {
    /// True for sections that form the call signature
    pub fn is_parameter(&self) -> bool {
        matches!(self, Self::Input | Self::Output | Self::InOut)
    }
}

/// One declared variable of a unit interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub data_type: String,
    pub section: Section,
}

impl Variable {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, section: Section) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            section,
        }
    }

    /// Whether the structural rewrite can carry this variable into the
    /// opposite representation
    pub fn is_supported(&self) -> bool {
        let upper = self.data_type.to_ascii_uppercase();
        if UNSUPPORTED_TYPES.contains(&upper.as_str()) {
            return false;
        }
        self.data_type.split('.').count() <= MAX_TYPE_NESTING
    }
}

/// The interface block of a unit, in declared order
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UnitInterface {
    pub variables: Vec<Variable>,
}

impl UnitInterface {
    pub fn new(variables: Vec<Variable>) -> Self {
        Self { variables }
    }

    /// Variables of one section, declared order preserved
    pub fn section(&self, section: Section) -> impl Iterator<Item = &Variable> {
        self.variables.iter().filter(move |v| v.section == section)
    }

    /// The call-signature parameters (Input/Output/InOut), declared order
    pub fn parameters(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter().filter(|v| v.section.is_parameter())
    }

    /// First interface element the rewrite cannot express, if any
    pub fn first_unsupported(&self) -> Option<&Variable> {
        self.variables.iter().find(|v| !v.is_supported())
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.variables.iter().any(|v| v.name == name)
    }
}

/// Full definition of a unit as read from (or written to) the host
///
/// `body` is opaque text. The only syntax the engine understands in it is
/// variable references: `#name` for interface variables, `#Static.name`
/// for persistent locals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitDefinition {
    pub name: String,
    pub kind: UnitKind,
    pub interface: UnitInterface,
    pub body: String,
}

/// Enumerable reasons a single unit's rewrite can fail
///
/// Reason and action texts are stable; tests rely on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// The interface contains an element the target kind cannot express
    UnsupportedInterfaceElement,
    /// The host version is outside the engine's supported range
    HostVersionIncompatible,
    /// A relocated variable would collide with an existing name
    NameCollisionOnRelocation,
    /// The host SDK refused the structural edit
    HostRejectedWrite,
}

impl FailureReason {
    /// Human-readable diagnosis for the failure report
    pub fn reason_text(&self) -> &'static str {
        match self {
            Self::UnsupportedInterfaceElement => {
                "The unit interface contains an element that is not supported after conversion"
            }
            Self::HostVersionIncompatible => {
                "The engineering host version does not support this structural rewrite"
            }
            Self::NameCollisionOnRelocation => {
                "A relocated variable collides with an existing interface name"
            }
            Self::HostRejectedWrite => "The host refused to write the rewritten unit",
        }
    }

    /// Suggested corrective action for the failure report
    pub fn action_text(&self) -> &'static str {
        match self {
            Self::UnsupportedInterfaceElement => {
                "Remove or change the unsupported parameter before converting"
            }
            Self::HostVersionIncompatible => {
                "Upgrade the engineering host to a supported version"
            }
            Self::NameCollisionOnRelocation => {
                "Rename the conflicting variable, then convert again"
            }
            Self::HostRejectedWrite => {
                "Close the unit in all editors and check it is not write-protected"
            }
        }
    }

    /// All reasons, for enumerability tests
    pub fn all() -> &'static [FailureReason] {
        &[
            Self::UnsupportedInterfaceElement,
            Self::HostVersionIncompatible,
            Self::NameCollisionOnRelocation,
            Self::HostRejectedWrite,
        ]
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason_text())
    }
}

/// Per-unit conversion outcome
///
/// Terminal once it leaves `Pending`; it never reverts. `notes` on a
/// succeeded unit carry best-effort diagnostics (storage removal, editor
/// open) that never escalate to failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Pending,
    Succeeded { notes: Vec<String> },
    Failed { reason: FailureReason },
    /// Not eligible at all; never attempted, informational only
    Skipped { info: String },
}

impl Outcome {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }
}

/// One selected unit for the duration of a single batch
#[derive(Debug, Clone)]
pub struct Unit {
    pub handle: UnitHandle,
    pub name: String,
    pub kind: ObjectKind,
    outcome: Outcome,
}

impl Unit {
    /// Build a unit from one selection entry
    pub fn from_selected(selected: &SelectedObject) -> Self {
        Self {
            handle: selected.handle,
            name: selected.name.clone(),
            kind: selected.kind.clone(),
            outcome: Outcome::Pending,
        }
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    /// Set the terminal outcome. A second resolution is ignored: outcomes
    /// never revert.
    pub fn resolve(&mut self, outcome: Outcome) {
        if !self.outcome.is_pending() {
            tracing::warn!(
                "unit '{}' already resolved to {:?}, ignoring {:?}",
                self.name,
                self.outcome,
                outcome
            );
            return;
        }
        self.outcome = outcome;
    }
}
