//! Interrupt handling
//!
//! SIGINT, SIGTERM and SIGHUP are turned into a cancellation handle that the
//! batch driver and the runner's blocking wait both observe. The runner
//! terminates the in-flight child's process group before the batch unwinds;
//! the process then exits with 128 + signal number.

use tokio::sync::watch;

use crate::common::Result;

/// Cancellation handle fed by termination signals
#[derive(Debug, Clone)]
pub struct Interrupt {
    rx: watch::Receiver<Option<i32>>,
}

/// Sending half of a manually driven [`Interrupt`]
#[derive(Debug)]
pub struct InterruptTrigger {
    tx: watch::Sender<Option<i32>>,
}

impl InterruptTrigger {
    /// Deliver `signal` as if the process had received it
    pub fn trigger(&self, signal: i32) {
        self.tx.send_replace(Some(signal));
    }
}

impl Interrupt {
    /// Install the process-wide signal listeners
    ///
    /// Must be called once, from within the runtime, before the batch starts.
    /// Signals arriving after the first one are absorbed so cleanup cannot be
    /// cut short.
    #[cfg(unix)]
    pub fn install() -> Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        let (tx, rx) = watch::channel(None);
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sighup = signal(SignalKind::hangup())?;

        tokio::spawn(async move {
            let signal = tokio::select! {
                _ = sigint.recv() => libc::SIGINT,
                _ = sigterm.recv() => libc::SIGTERM,
                _ = sighup.recv() => libc::SIGHUP,
            };
            tracing::info!("Received signal {}, stopping batch", signal);
            tx.send_replace(Some(signal));

            // Keep the listeners registered: later signals are swallowed
            // instead of killing the harness mid-cleanup.
            loop {
                tokio::select! {
                    _ = sigint.recv() => {}
                    _ = sigterm.recv() => {}
                    _ = sighup.recv() => {}
                }
                tracing::debug!("Ignoring repeated signal during shutdown");
            }
        });

        Ok(Self { rx })
    }

    #[cfg(not(unix))]
    pub fn install() -> Result<Self> {
        const SIGINT: i32 = 2;

        let (tx, rx) = watch::channel(None);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Received Ctrl+C, stopping batch");
                tx.send_replace(Some(SIGINT));
            }
            std::future::pending::<()>().await;
        });
        Ok(Self { rx })
    }

    /// A handle driven by hand instead of by signals
    pub fn manual() -> (InterruptTrigger, Self) {
        let (tx, rx) = watch::channel(None);
        (InterruptTrigger { tx }, Self { rx })
    }

    /// Signal received so far, if any
    pub fn pending(&self) -> Option<i32> {
        *self.rx.borrow()
    }

    /// Resolve with the signal number once one has been received
    ///
    /// Never resolves if the sending side goes away without signalling.
    pub async fn triggered(&self) -> i32 {
        let mut rx = self.rx.clone();
        let signal = rx.wait_for(Option::is_some).await.map(|signal| *signal);
        match signal {
            Ok(Some(signal)) => signal,
            _ => std::future::pending().await,
        }
    }
}

/// Signals [`Interrupt::install`] listens for
#[cfg(unix)]
pub const HANDLED_SIGNALS: [i32; 3] = [libc::SIGINT, libc::SIGTERM, libc::SIGHUP];

/// Revert every handled signal to its default disposition
///
/// Called once cleanup is done and the process is about to exit on account of
/// a signal.
#[cfg(unix)]
pub fn restore_default() {
    for signal in HANDLED_SIGNALS {
        unsafe {
            libc::signal(signal, libc::SIG_DFL);
        }
    }
}

#[cfg(not(unix))]
pub fn restore_default() {}
