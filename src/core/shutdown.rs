//! Shutdown Coordination
//!
//! The relay runs on plain OS threads, so shutdown is a shared flag that
//! worker loops poll between units of work. Signal delivery is handled by a
//! small tokio runtime on a dedicated background thread which flips the
//! flag; a second signal forces an immediate exit.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

/// Coordinates graceful shutdown across threads
#[derive(Debug, Clone, Default)]
pub struct ShutdownCoordinator {
    inner: Arc<ShutdownState>,
}

#[derive(Debug, Default)]
struct ShutdownState {
    requested: AtomicBool,
    lock: Mutex<()>,
    signalled: Condvar,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trigger shutdown and wake every thread blocked in [`wait_timeout`](Self::wait_timeout)
    pub fn trigger_shutdown(&self) {
        self.inner.requested.store(true, Ordering::Release);
        let _guard = crate::core::sync::lock_or_recover(&self.inner.lock);
        self.inner.signalled.notify_all();
    }

    /// Check if shutdown has been requested
    pub fn is_shutdown_requested(&self) -> bool {
        self.inner.requested.load(Ordering::Acquire)
    }

    /// Sleep up to `timeout`, returning early (with `true`) once shutdown is requested
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let guard = crate::core::sync::lock_or_recover(&self.inner.lock);
        if self.is_shutdown_requested() {
            return true;
        }
        let _ = self
            .inner
            .signalled
            .wait_timeout_while(guard, timeout, |_| !self.is_shutdown_requested());
        self.is_shutdown_requested()
    }

    /// Start listening for termination signals on a background thread
    pub fn install_signal_handlers(&self) -> std::io::Result<()> {
        let coordinator = self.clone();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        thread::Builder::new()
            .name("signals".to_string())
            .spawn(move || runtime.block_on(listen_for_signals(coordinator)))?;
        Ok(())
    }
}

async fn listen_for_signals(coordinator: ShutdownCoordinator) {
    let signal_count = Arc::new(AtomicUsize::new(0));
    let on_signal = |name: &str| {
        let prev = signal_count.fetch_add(1, Ordering::AcqRel);
        if prev >= 1 {
            log::warn!("{name} received again; exiting");
            std::process::exit(130);
        }
        log::info!("{name} received; shutting down (repeat to force exit)");
        coordinator.trigger_shutdown();
    };

    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }

        use tokio::signal::unix::{signal, SignalKind};
        let (Ok(mut interrupt), Ok(mut terminate), Ok(mut hangup)) = (
            signal(SignalKind::interrupt()),
            signal(SignalKind::terminate()),
            signal(SignalKind::hangup()),
        ) else {
            log::warn!("Could not install signal handlers; only shutdown on end of input");
            return;
        };

        loop {
            tokio::select! {
                _ = interrupt.recv() => on_signal("SIGINT"),
                _ = terminate.recv() => on_signal("SIGTERM"),
                _ = hangup.recv() => on_signal("SIGHUP"),
            }
        }
    }

    #[cfg(not(unix))]
    {
        while tokio::signal::ctrl_c().await.is_ok() {
            on_signal("Ctrl-C");
        }
    }
}
