//! [`ClientLease`]: a database client that is always shut down when its
//! owner is done with it.

use std::future::Future;

use mongodb::Client;
use tracing::debug;

use super::StoreError;

/// A freshly opened client owned by exactly one operation.
///
/// Call [`ClientLease::release`] to shut the client down and wait for its
/// connections to close. A lease dropped without being released (an error
/// path that returned early, or a cancelled request future) schedules the
/// shutdown on the current Tokio runtime instead.
#[derive(Debug)]
pub struct ClientLease {
    client: Client,
    released: bool,
    #[cfg(test)]
    shutdowns: Option<std::sync::Arc<std::sync::atomic::AtomicUsize>>,
}

impl ClientLease {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            released: false,
            #[cfg(test)]
            shutdowns: None,
        }
    }

    /// Borrow the leased client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Run `op` on the leased client, then release it.
    ///
    /// The outcome of `op` is returned unchanged; the release happens on the
    /// error path too.
    pub async fn run<T, F, Fut>(self, op: F) -> Result<T, StoreError>
    where
        F: FnOnce(Client) -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let result = op(self.client.clone()).await;
        if let Err(e) = &result {
            debug!(error = %e, "operation failed; releasing client");
        }
        self.release().await;
        result
    }

    /// Shut the client down, closing its connections and background monitors.
    pub async fn release(mut self) {
        self.released = true;
        self.client.clone().shutdown().await;
        #[cfg(test)]
        count_shutdown(&self.shutdowns);
        debug!("database client released");
    }
}

impl Drop for ClientLease {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let client = self.client.clone();
        #[cfg(test)]
        let shutdowns = self.shutdowns.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    client.shutdown().await;
                    #[cfg(test)]
                    count_shutdown(&shutdowns);
                    debug!("database client released after drop");
                });
            }
            // Outside a runtime the driver's own drop logic closes the pool.
            Err(_) => debug!("no runtime available; database client dropped without shutdown"),
        }
    }
}

#[cfg(test)]
fn count_shutdown(counter: &Option<std::sync::Arc<std::sync::atomic::AtomicUsize>>) {
    if let Some(counter) = counter {
        counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::options::ClientOptions;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    async fn offline_client() -> Client {
        // Parsing a non-SRV URI and constructing a client do no network I/O.
        let options = ClientOptions::parse("mongodb://127.0.0.1:1").await.unwrap();
        Client::with_options(options).unwrap()
    }

    async fn counted_lease() -> (ClientLease, Arc<AtomicUsize>) {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut lease = ClientLease::new(offline_client().await);
        lease.shutdowns = Some(counter.clone());
        (lease, counter)
    }

    #[tokio::test]
    async fn release_shuts_down_once() {
        let (lease, shutdowns) = counted_lease().await;
        tokio::time::timeout(Duration::from_secs(5), lease.release())
            .await
            .expect("release should not hang");
        assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn run_releases_and_returns_success() {
        let (lease, shutdowns) = counted_lease().await;
        let value = lease.run(|_client| async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
        assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn run_releases_on_error_and_keeps_it() {
        let (lease, shutdowns) = counted_lease().await;
        let result: Result<(), _> = lease
            .run(|_client| async { Err(StoreError::InvalidDocument("bad value".into())) })
            .await;
        match result {
            Err(StoreError::InvalidDocument(msg)) => assert_eq!(msg, "bad value"),
            other => panic!("expected the operation's error, got {other:?}"),
        }
        assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn drop_without_release_schedules_shutdown() {
        let (lease, shutdowns) = counted_lease().await;
        drop(lease);
        tokio::time::timeout(Duration::from_secs(5), async {
            while shutdowns.load(Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("dropped lease should shut its client down");
        assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
    }
}
