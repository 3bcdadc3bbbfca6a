//! Graceful shutdown handling for the station server.
//!
//! A broadcast-backed signal that every long-running task (the TCP
//! accept loop, the scheduler ticker) selects against alongside its
//! own work, so shutdown interrupts waiting instead of waiting for it.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::broadcast;
use tracing::info;

/// Shutdown signal that can be cloned and shared across tasks.
#[derive(Clone)]
pub struct ShutdownSignal {
    sender: broadcast::Sender<()>,
    triggered: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self {
            sender,
            triggered: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    pub fn trigger(&self) {
        if !self.triggered.swap(true, Ordering::SeqCst) {
            info!("shutdown signal triggered");
            let _ = self.sender.send(());
        }
    }

    /// A future that resolves once, the first time shutdown is triggered
    /// (or immediately, if it already has been).
    pub fn notified(&self) -> ShutdownNotified {
        ShutdownNotified::new(self.sender.subscribe(), self.triggered.clone())
    }

    pub async fn wait(&self) {
        self.notified().wait().await
    }

    pub fn start_signal_listener(&self) {
        let signal = self.clone();
        tokio::spawn(async move {
            listen_for_shutdown_signals(signal).await;
        });
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// A future that resolves once, the first time shutdown is triggered.
/// Implements `Future` directly (rather than exposing only an inherent
/// `async fn`) so callers can `tokio::pin!` one and select on `&mut`
/// it across multiple loop iterations.
pub struct ShutdownNotified {
    inner: Pin<Box<dyn Future<Output = ()> + Send>>,
}

impl ShutdownNotified {
    fn new(mut receiver: broadcast::Receiver<()>, triggered: Arc<AtomicBool>) -> Self {
        Self {
            inner: Box::pin(async move {
                if triggered.load(Ordering::SeqCst) {
                    return;
                }
                let _ = receiver.recv().await;
            }),
        }
    }

    pub async fn wait(self) {
        self.await
    }
}

impl Future for ShutdownNotified {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx)
    }
}

async fn listen_for_shutdown_signals(signal: ShutdownSignal) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        let mut sigint = signal(SignalKind::interrupt()).expect("install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM"),
            _ = sigint.recv() => info!("received SIGINT (Ctrl+C)"),
        }

        signal.trigger();
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.expect("install Ctrl+C handler");
        info!("received Ctrl+C");
        signal.trigger();
    }
}
