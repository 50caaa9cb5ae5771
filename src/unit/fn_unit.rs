// src/unit/fn_unit.rs

//! Closure-backed units.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::unit::{AsyncUnit, BoxFuture, ParsedArgs, SyncUnit, UnitArgs};

type Parser = Box<dyn Fn(&[String]) -> anyhow::Result<ParsedArgs> + Send + Sync>;

fn boxed_parser<P, T>(parser: P) -> Parser
where
    P: Fn(&[String]) -> anyhow::Result<T> + Send + Sync + 'static,
    T: Send + 'static,
{
    Box::new(move |args: &[String]| parser(args).map(|value| Box::new(value) as ParsedArgs))
}

/// Sync unit wrapping `F: FnMut(UnitArgs) -> anyhow::Result<()>`.
pub struct FnUnit<F> {
    main: F,
    parser: Option<Parser>,
}

impl<F> FnUnit<F>
where
    F: FnMut(UnitArgs) -> anyhow::Result<()> + Send,
{
    pub fn new(main: F) -> Self {
        Self { main, parser: None }
    }

    /// Give the unit a `parse_args` step. `main` then receives
    /// `UnitArgs::Parsed` holding the `T` returned here.
    pub fn with_parser<P, T>(mut self, parser: P) -> Self
    where
        P: Fn(&[String]) -> anyhow::Result<T> + Send + Sync + 'static,
        T: Send + 'static,
    {
        self.parser = Some(boxed_parser(parser));
        self
    }
}

impl<F> SyncUnit for FnUnit<F>
where
    F: FnMut(UnitArgs) -> anyhow::Result<()> + Send,
{
    fn parse_args(&self, args: &[String]) -> Option<anyhow::Result<ParsedArgs>> {
        self.parser.as_ref().map(|parse| parse(args))
    }

    fn main(&mut self, args: UnitArgs) -> anyhow::Result<()> {
        (self.main)(args)
    }
}

/// Async unit wrapping `F: FnOnce(UnitArgs, CancellationToken) -> Fut`.
pub struct AsyncFnUnit<F> {
    main: F,
    parser: Option<Parser>,
}

impl<F, Fut> AsyncFnUnit<F>
where
    F: FnOnce(UnitArgs, CancellationToken) -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    pub fn new(main: F) -> Self {
        Self { main, parser: None }
    }

    /// See [`FnUnit::with_parser`].
    pub fn with_parser<P, T>(mut self, parser: P) -> Self
    where
        P: Fn(&[String]) -> anyhow::Result<T> + Send + Sync + 'static,
        T: Send + 'static,
    {
        self.parser = Some(boxed_parser(parser));
        self
    }
}

impl<F, Fut> AsyncUnit for AsyncFnUnit<F>
where
    F: FnOnce(UnitArgs, CancellationToken) -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn parse_args(&self, args: &[String]) -> Option<anyhow::Result<ParsedArgs>> {
        self.parser.as_ref().map(|parse| parse(args))
    }

    fn main(
        self: Box<Self>,
        args: UnitArgs,
        cancel: CancellationToken,
    ) -> BoxFuture<'static, anyhow::Result<()>> {
        Box::pin((self.main)(args, cancel))
    }
}
