use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Exit codes the binary reports.
#[derive(Debug, Clone, Copy)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    ShutdownRequested = 130, // Standard exit code for SIGINT
}

impl ExitCode {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Turns SIGINT/SIGTERM into cancellation of the running pipeline so queues
/// drain and sessions close instead of the process dying mid-insert.
#[derive(Clone, Default)]
pub struct ShutdownCoordinator {
    cancel: CancellationToken,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        ShutdownCoordinator::default()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn register_handlers(&self) {
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            let ctrl_c = async {
                signal::ctrl_c()
                    .await
                    .expect("Failed to install SIGINT handler");
            };

            #[cfg(unix)]
            let terminate = async {
                signal::unix::signal(signal::unix::SignalKind::terminate())
                    .expect("Failed to install SIGTERM handler")
                    .recv()
                    .await;
            };

            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                _ = ctrl_c => info!("Received SIGINT, stopping the run"),
                _ = terminate => info!("Received SIGTERM, stopping the run"),
            }
            cancel.cancel();
        });
    }
}
