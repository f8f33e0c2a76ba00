//! Device transport seam
//!
//! Hardware backends exchange opaque command frames with a device. The native
//! wallet never uses a transport, but the contract lives here so a hardware
//! wallet plugs into the same call shape. Framing is the transport's business.

use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::error::{WalletError, WalletResult};
use crate::{log_debug, log_warn};

/// One request/response exchange with a device
pub trait Transport: Send {
    fn send_command(&mut self, command: &[u8]) -> impl Future<Output = WalletResult<Vec<u8>>> + Send;
}

/// Serializes commands so at most one is in flight.
///
/// A command that times out is dropped where it stands; the wallet session is
/// never touched by the transport, so nothing needs rolling back.
pub struct ExclusiveTransport<T> {
    inner: Mutex<T>,
    timeout: Option<Duration>,
}

impl<T: Transport> ExclusiveTransport<T> {
    pub fn new(transport: T) -> Self {
        Self {
            inner: Mutex::new(transport),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub async fn call(&self, command: &[u8]) -> WalletResult<Vec<u8>> {
        let mut transport = self.inner.lock().await;
        log_debug!("transport", "Sending command", bytes = command.len());

        let Some(limit) = self.timeout else {
            return transport.send_command(command).await;
        };
        match tokio::time::timeout(limit, transport.send_command(command)).await {
            Ok(result) => result,
            Err(_) => {
                log_warn!("transport", "Command timed out", millis = limit.as_millis());
                Err(WalletError::cancelled(format!(
                    "Command timed out after {} ms",
                    limit.as_millis()
                )))
            }
        }
    }

    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Echo {
        in_flight: Arc<AtomicUsize>,
        max_seen: Arc<AtomicUsize>,
        delay: Duration,
    }

    impl Transport for Echo {
        async fn send_command(&mut self, command: &[u8]) -> WalletResult<Vec<u8>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_seen.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(command.to_vec())
        }
    }

    fn echo(delay: Duration) -> (Echo, Arc<AtomicUsize>) {
        let max_seen = Arc::new(AtomicUsize::new(0));
        let echo = Echo {
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_seen: max_seen.clone(),
            delay,
        };
        (echo, max_seen)
    }

    #[tokio::test]
    async fn test_one_command_in_flight() {
        let (inner, max_seen) = echo(Duration::from_millis(5));
        let transport = Arc::new(ExclusiveTransport::new(inner));

        let mut tasks = Vec::new();
        for i in 0..8u8 {
            let transport = transport.clone();
            tasks.push(tokio::spawn(async move { transport.call(&[i]).await }));
        }
        for (i, task) in tasks.into_iter().enumerate() {
            assert_eq!(task.await.unwrap().unwrap(), vec![i as u8]);
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_cancels() {
        let (inner, _) = echo(Duration::from_millis(200));
        let transport = ExclusiveTransport::new(inner).with_timeout(Duration::from_millis(10));
        let err = transport.call(b"ping").await.unwrap_err();
        assert!(err.is(ErrorCode::Cancelled));

        // The lock is released after a timeout
        let mut inner = transport.into_inner();
        inner.delay = Duration::ZERO;
        assert_eq!(inner.send_command(b"ok").await.unwrap(), b"ok".to_vec());
    }
}
