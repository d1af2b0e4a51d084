/// Remote instructions a running [`super::multi_sim::MultiSimScheduler`] loop polls each
/// iteration, mirroring a `Trader::run`-style pattern of checking a
/// `mpsc::Receiver<Command>` before doing another unit of work rather than relying on external
/// task cancellation.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SchedulerCommand {
    /// Resume ticking. A no-op if the loop is already running (§8: idempotent start/stop).
    Start,
    /// Suspend ticking until a further `Start`. A no-op if already stopped.
    Stop,
    /// One-time hybrid-mode transition (§4.6): the loop drops its accelerated interval state and
    /// restarts with realtime intervals from this point on.
    HybridRestart,
}
