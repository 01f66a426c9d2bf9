// src/policy.rs

//! Conversion policy configuration
//!
//! An immutable snapshot of the user's conversion preferences, constructed
//! once before a batch runs and shared read-only by every unit rewrite.
//! The two relocation choices are closed enums rather than independent
//! flags, so an invalid "two selected at once" state is unrepresentable.
//!
//! The policy persists as a small TOML file. [`ConversionPolicy::load`]
//! falls back to defaults when the file does not exist yet.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Where persistent local (static) variables go when a stateful unit
/// becomes stateless
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StaticRelocation {
    /// Append as trailing in/out parameters, preserving name and type
    #[default]
    ToInOutParameter,
    /// Convert to transient locals in place
    ToTempVariable,
    /// Drop the variables entirely
    Discard,
}

impl StaticRelocation {
    /// Menu label for the settings submenu
    pub fn label(&self) -> &'static str {
        match self {
            Self::ToInOutParameter => "InOut",
            Self::ToTempVariable => "Temp",
            Self::Discard => "Remove static variables",
        }
    }
}

/// Where the return channel goes when a stateless unit becomes stateful
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReturnRelocation {
    /// Relocate to a named trailing output parameter
    #[default]
    ToOutputParameter,
    /// Drop the return channel
    Discard,
}

impl ReturnRelocation {
    /// Menu label for the settings submenu
    pub fn label(&self) -> &'static str {
        match self {
            Self::ToOutputParameter => "Output",
            Self::Discard => "Remove return value",
        }
    }
}

/// Immutable conversion preferences for one invocation
///
/// Loaded once at startup; menu toggles produce a whole new snapshot
/// rather than mutating a shared instance mid-batch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionPolicy {
    /// Relocation of persistent locals (stateful -> stateless direction)
    pub static_relocation: StaticRelocation,
    /// Relocation of the return channel (stateless -> stateful direction)
    pub return_relocation: ReturnRelocation,
    /// Remove the generated instance-storage object(s) backing a converted
    /// stateful unit, when no other caller still references them
    pub remove_auxiliary_storage: bool,
    /// Ask the host to open the rewritten unit in an editor (best effort)
    pub open_result_in_editor: bool,
}

impl ConversionPolicy {
    /// Load a policy snapshot from a TOML file, defaulting when absent
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("no policy file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Persist the policy snapshot as pretty TOML
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}
