//! Network reachability signal.

use std::sync::Arc;

use tokio::sync::watch;

/// Answers whether the remote system is currently reachable
pub trait Connectivity: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Connectivity flag backed by a `watch` channel.
///
/// Platform glue calls [`NetworkStatus::set_online`]; the engine reads the
/// current value and can follow transitions through [`NetworkStatus::subscribe`].
#[derive(Clone, Debug)]
pub struct NetworkStatus {
    sender: Arc<watch::Sender<bool>>,
}

impl NetworkStatus {
    pub fn new(online: bool) -> Self {
        let (sender, _receiver) = watch::channel(online);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Publish a new reachability value. Unchanged values are not broadcast.
    pub fn set_online(&self, online: bool) {
        let changed = self.sender.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            tracing::info!("Network is now {}", if online { "online" } else { "offline" });
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }
}

impl Default for NetworkStatus {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Connectivity for NetworkStatus {
    fn is_online(&self) -> bool {
        *self.sender.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn set_online_broadcasts_transitions_only() {
        let status = NetworkStatus::new(false);
        let mut receiver = status.subscribe();
        assert!(!status.is_online());

        status.set_online(false);
        assert!(!receiver.has_changed().unwrap());

        status.set_online(true);
        assert!(receiver.has_changed().unwrap());
        assert!(*receiver.borrow_and_update());
        assert!(status.is_online());
    }

    #[test]
    fn clones_share_state() {
        let status = NetworkStatus::default();
        let clone = status.clone();
        clone.set_online(false);
        assert!(!status.is_online());
    }
}
