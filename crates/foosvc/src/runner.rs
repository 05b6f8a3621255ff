//! Runnable components and the signal-driven run loop.

use async_trait::async_trait;
use foo_core::FooResult;
use foo_worker::{Listener, Worker};
use std::future::Future;
use tokio::signal;
use tracing::{error, info};

/// A component that can be started and later stopped.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Runner: Send {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Starts the component. Returns once it is running.
    async fn run(&mut self) -> FooResult<()>;

    /// Stops the component and waits until it has shut down.
    async fn stop(&mut self) -> FooResult<()>;
}

#[async_trait]
impl<L: Listener> Runner for Worker<L> {
    fn name(&self) -> &'static str {
        "worker"
    }

    async fn run(&mut self) -> FooResult<()> {
        Worker::run(self).await.map_err(Into::into)
    }

    async fn stop(&mut self) -> FooResult<()> {
        Worker::stop(self).await.map_err(Into::into)
    }
}

/// Runs `runner` until `signal` resolves, then stops it.
pub async fn run_until_signal<R, S>(runner: &mut R, signal: S) -> FooResult<()>
where
    R: Runner + ?Sized,
    S: Future<Output = ()>,
{
    let name = runner.name();
    runner.run().await?;
    info!(runner = name, "Runner started, waiting for shutdown signal");

    signal.await;

    info!(runner = name, "Stopping runner...");
    runner.stop().await?;
    info!(runner = name, "Runner stopped");
    Ok(())
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            info!("Received terminate signal, initiating graceful shutdown...");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foo_core::FooError;
    use mockall::Sequence;

    #[tokio::test]
    async fn test_runs_then_stops_after_signal() {
        let mut seq = Sequence::new();
        let mut runner = MockRunner::new();
        runner.expect_name().return_const("mock");
        runner
            .expect_run()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(()));
        runner
            .expect_stop()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(()));

        run_until_signal(&mut runner, async {}).await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_start_skips_stop() {
        let mut runner = MockRunner::new();
        runner.expect_name().return_const("mock");
        runner
            .expect_run()
            .returning(|| Err(FooError::Worker("listener down".into())));
        runner.expect_stop().never();

        let err = run_until_signal(&mut runner, async {}).await.unwrap_err();
        assert!(matches!(err, FooError::Worker(_)));
    }

    #[tokio::test]
    async fn test_stop_error_is_returned() {
        let mut runner = MockRunner::new();
        runner.expect_name().return_const("mock");
        runner.expect_run().returning(|| Ok(()));
        runner
            .expect_stop()
            .returning(|| Err(FooError::Worker("close failed".into())));

        assert!(run_until_signal(&mut runner, async {}).await.is_err());
    }
}
