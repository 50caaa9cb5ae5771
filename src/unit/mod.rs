// src/unit/mod.rs

//! Units of work the launcher can run.
//!
//! A unit is resolved by name from a [`UnitRegistry`] and comes back as a
//! [`LoadedUnit`], which fixes its execution model once at load time:
//!
//! - [`SyncUnit`]: `main` is called directly on the supervising thread.
//! - [`AsyncUnit`]: `main` produces a future that is spawned as the single
//!   task of a current-thread runtime and receives a [`CancellationToken`]
//!   that is cancelled on the first interrupt.
//!
//! Either kind may implement `parse_args`; when it returns `Some`, the unit is
//! run with [`UnitArgs::Parsed`] instead of the raw argument vector.

pub mod fn_unit;
pub mod registry;

use std::any::{Any, type_name};
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use anyhow::{anyhow, bail};
use tokio_util::sync::CancellationToken;

use crate::errors::{Result, RunnerError};
use crate::types::{ExecutionModel, ReplicaInfo};

pub use fn_unit::{AsyncFnUnit, FnUnit};
pub use registry::{UnitFactory, UnitRegistry, resolve_unit_name};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Type-erased result of a unit's `parse_args`.
pub type ParsedArgs = Box<dyn Any + Send>;

/// What a unit factory knows while constructing the unit.
#[derive(Debug, Clone)]
pub struct UnitContext {
    /// Resolved unit name.
    pub name: String,
    /// Set when running as one of several replicas.
    pub replica: Option<ReplicaInfo>,
}

/// Description of a loaded unit, handed to every lifecycle hook.
#[derive(Debug, Clone)]
pub struct UnitInfo {
    pub name: String,
    pub model: ExecutionModel,
    pub replica: Option<ReplicaInfo>,
}

/// Arguments a unit's entry point is called with.
pub enum UnitArgs {
    /// Module arguments exactly as given on the command line.
    Raw(Vec<String>),
    /// The single object returned by the unit's `parse_args`.
    Parsed(ParsedArgs),
}

impl UnitArgs {
    pub fn raw(&self) -> Option<&[String]> {
        match self {
            UnitArgs::Raw(args) => Some(args),
            UnitArgs::Parsed(_) => None,
        }
    }

    pub fn into_raw(self) -> anyhow::Result<Vec<String>> {
        match self {
            UnitArgs::Raw(args) => Ok(args),
            UnitArgs::Parsed(_) => bail!("unit was given parsed arguments, not raw ones"),
        }
    }

    pub fn parsed<T: 'static>(&self) -> Option<&T> {
        match self {
            UnitArgs::Parsed(value) => value.downcast_ref::<T>(),
            UnitArgs::Raw(_) => None,
        }
    }

    pub fn into_parsed<T: 'static>(self) -> anyhow::Result<T> {
        match self {
            UnitArgs::Parsed(value) => value
                .downcast::<T>()
                .map(|boxed| *boxed)
                .map_err(|_| anyhow!("parsed arguments are not a `{}`", type_name::<T>())),
            UnitArgs::Raw(_) => bail!("unit was given raw arguments, not parsed ones"),
        }
    }
}

impl fmt::Debug for UnitArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitArgs::Raw(args) => f.debug_tuple("Raw").field(args).finish(),
            UnitArgs::Parsed(_) => f.write_str("Parsed(..)"),
        }
    }
}

/// A unit whose entry point runs to completion on the calling thread.
pub trait SyncUnit: Send {
    fn parse_args(&self, _args: &[String]) -> Option<anyhow::Result<ParsedArgs>> {
        None
    }

    fn main(&mut self, args: UnitArgs) -> anyhow::Result<()>;
}

/// A unit whose entry point is a future.
///
/// Cancellation is cooperative: `cancel` fires on the first interrupt and the
/// future is expected to wind down and return.
pub trait AsyncUnit: Send {
    fn parse_args(&self, _args: &[String]) -> Option<anyhow::Result<ParsedArgs>> {
        None
    }

    fn main(
        self: Box<Self>,
        args: UnitArgs,
        cancel: CancellationToken,
    ) -> BoxFuture<'static, anyhow::Result<()>>;
}

/// A resolved unit, tagged with its execution model.
pub enum LoadedUnit {
    Sync(Box<dyn SyncUnit>),
    Async(Box<dyn AsyncUnit>),
}

impl LoadedUnit {
    pub fn from_sync(unit: impl SyncUnit + 'static) -> Self {
        LoadedUnit::Sync(Box::new(unit))
    }

    pub fn from_async(unit: impl AsyncUnit + 'static) -> Self {
        LoadedUnit::Async(Box::new(unit))
    }

    pub fn model(&self) -> ExecutionModel {
        match self {
            LoadedUnit::Sync(_) => ExecutionModel::Sync,
            LoadedUnit::Async(_) => ExecutionModel::Async,
        }
    }

    /// Turn the raw module arguments into what `main` will receive.
    pub fn prepare_args(&self, args: Vec<String>) -> Result<UnitArgs> {
        let parsed = match self {
            LoadedUnit::Sync(unit) => unit.parse_args(&args),
            LoadedUnit::Async(unit) => unit.parse_args(&args),
        };

        match parsed {
            None => Ok(UnitArgs::Raw(args)),
            Some(Ok(value)) => Ok(UnitArgs::Parsed(value)),
            Some(Err(err)) => Err(RunnerError::Unit(err.context("parsing unit arguments"))),
        }
    }
}

impl fmt::Debug for LoadedUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LoadedUnit::{:?}(..)", self.model())
    }
}
