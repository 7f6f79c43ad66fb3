use super::{CommandContext, CommandOutput, EngineCommand};
use crate::{CaseResult, EngineConfiguration, RetryConfig};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cross-cutting behavior layered around command invocation.
///
/// Interceptors run outermost first. Each one decides whether, and how
/// often, to hand the command on to the rest of the chain.
pub trait CommandInterceptor: Send + Sync {
    fn name(&self) -> &'static str;

    fn intercept(&self, command: &EngineCommand, next: Next<'_>) -> CaseResult<CommandOutput>;
}

/// The remainder of the interceptor chain.
///
/// The innermost step opens a command context, runs the command and commits
/// on success or rolls back on failure. `Next` is `Copy`, so an interceptor
/// may run it more than once.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    configuration: &'a EngineConfiguration,
    chain: &'a [Arc<dyn CommandInterceptor>],
}

impl<'a> Next<'a> {
    pub(crate) fn new(
        configuration: &'a EngineConfiguration,
        chain: &'a [Arc<dyn CommandInterceptor>],
    ) -> Self {
        Self {
            configuration,
            chain,
        }
    }

    pub fn run(self, command: &EngineCommand) -> CaseResult<CommandOutput> {
        match self.chain.split_first() {
            Some((interceptor, rest)) => interceptor.intercept(command, Next::new(self.configuration, rest)),
            None => invoke(self.configuration, command),
        }
    }
}

fn invoke(configuration: &EngineConfiguration, command: &EngineCommand) -> CaseResult<CommandOutput> {
    let mut ctx = CommandContext::open(configuration, command.name())?;
    match command.execute(&mut ctx) {
        Ok(output) => {
            ctx.commit()?;
            Ok(output)
        }
        Err(err) => {
            ctx.rollback();
            Err(err)
        }
    }
}

// ── Logging ──────────────────────────────────────────────────────────

/// Wraps each command in a tracing span and logs its outcome.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingInterceptor;

impl CommandInterceptor for LoggingInterceptor {
    fn name(&self) -> &'static str {
        "logging"
    }

    fn intercept(&self, command: &EngineCommand, next: Next<'_>) -> CaseResult<CommandOutput> {
        let span = tracing::info_span!("command", name = command.name());
        let _entered = span.enter();
        let started = Instant::now();

        let result = next.run(command);
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => tracing::info!(elapsed_ms, "Command completed"),
            Err(err) => tracing::warn!(
                elapsed_ms,
                kind = ?err.kind(),
                error = %err,
                "Command failed"
            ),
        }
        result
    }
}

// ── Retry ────────────────────────────────────────────────────────────

/// Re-runs a command that failed with a transient store error.
///
/// Each attempt gets a fresh context, so nothing staged by a failed attempt
/// leaks into the next. Other failures are returned unchanged.
#[derive(Debug, Clone)]
pub struct RetryInterceptor {
    max_attempts: u32,
    backoff: Duration,
}

impl RetryInterceptor {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, Duration::from_millis(config.backoff_ms))
    }

    /// Delay before the given retry, saturating for extreme settings.
    fn delay(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt)
    }
}

impl CommandInterceptor for RetryInterceptor {
    fn name(&self) -> &'static str {
        "retry"
    }

    fn intercept(&self, command: &EngineCommand, next: Next<'_>) -> CaseResult<CommandOutput> {
        let mut attempt = 1;
        loop {
            match next.run(command) {
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "Transient failure, retrying command"
                    );
                    if !self.backoff.is_zero() {
                        std::thread::sleep(self.delay(attempt));
                    }
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}
