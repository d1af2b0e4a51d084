/// Coarse error classification shared across every module-level `thiserror` enum in this crate.
///
/// Errors are split per module (`PortfolioError`, `MarketDataError`, `EngineError`,
/// `PersistenceError`, ...) but the out-of-scope HTTP edge needs a stable `{ok, message, error}`
/// shape regardless of which module produced an error. Every error enum in this crate implements
/// [`ErrorKind`] so that edge can classify without depending on internal variant names.
pub trait ErrorKind {
    fn kind(&self) -> Kind;
}

/// Coarse error classes, §7.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Kind {
    InvalidArgument,
    NotFound,
    Forbidden,
    UpstreamUnavailable,
    Timeout,
    Conflict,
    Internal,
}
