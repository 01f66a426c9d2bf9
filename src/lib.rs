// src/lib.rs

//! Batch converter between stateful and stateless program units
//!
//! Converts selected program units of a host engineering project between
//! their stateful representation (persistent locals backed by generated
//! instance storage) and their stateless representation (transient locals,
//! optional return channel), preserving the call signature as far as the
//! target representation allows.
//!
//! # Architecture
//!
//! - Eligibility: pure classification of the selection snapshot gates the
//!   menu commands
//! - Rewriting: structural interface + body transformation per an
//!   immutable [`ConversionPolicy`]
//! - Atomicity: one exclusive unit of work per batch; either every
//!   successful rewrite commits durably or none does
//! - Outcomes: per-unit results are data with stable reason/action texts,
//!   aggregated into one report
//!
//! The host SDK is an external collaborator behind the [`host`] traits;
//! the engine never owns engineering objects.

pub mod batch;
pub mod classify;
mod error;
pub mod host;
pub mod policy;
pub mod rewrite;
pub mod trace;
pub mod unit;

pub use batch::{BatchCoordinator, BatchFailure, BatchReport, BatchState, UnitReport};
pub use classify::{classify, MenuVisibility};
pub use error::{Error, Result};
pub use host::{ExclusiveAccess, HostProject, HostVersion, StorageRemoval, UnitHandle, UnitOfWork};
pub use policy::{ConversionPolicy, ReturnRelocation, StaticRelocation};
pub use rewrite::{rewrite_definition, UnitRewriter, MAX_HOST_VERSION, MIN_HOST_VERSION};
pub use trace::InvocationTrace;
pub use unit::{
    FailureReason, ObjectKind, Outcome, Section, SelectedObject, Unit, UnitDefinition,
    UnitInterface, UnitKind, Variable,
};
