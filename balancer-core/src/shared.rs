use std::sync::Arc;
use tokio::sync::Mutex;

use crate::dispatch::{Balancer, DispatchReport, LoadSummary};
use crate::errors::Result;
use crate::node::Node;
use crate::rebalancing::RebalanceOutcome;

/// Balancer shared between concurrent producers.
///
/// The node set and the heap sit behind one lock, so each dispatch (including
/// a periodic rebalance it triggers) and each manual rebalance is a single
/// critical section.
#[derive(Debug, Clone)]
pub struct SharedBalancer {
    inner: Arc<Mutex<Balancer>>,
}

impl SharedBalancer {
    pub fn new(balancer: Balancer) -> Self {
        Self {
            inner: Arc::new(Mutex::new(balancer)),
        }
    }

    pub async fn dispatch(&self, task_load: f64) -> Result<DispatchReport> {
        let mut guard = self.inner.lock().await;
        guard.dispatch(task_load)
    }

    pub async fn rebalance(&self) -> Result<RebalanceOutcome> {
        let mut guard = self.inner.lock().await;
        guard.rebalance()
    }

    /// Copy of the node set at the time of the call
    pub async fn snapshot(&self) -> Vec<Node> {
        self.inner.lock().await.nodes().to_vec()
    }

    pub async fn summary(&self) -> Result<LoadSummary> {
        self.inner.lock().await.summary()
    }

    /// Runs `f` with exclusive access to the balancer.
    pub async fn with<R>(&self, f: impl FnOnce(&Balancer) -> R) -> R {
        let guard = self.inner.lock().await;
        f(&guard)
    }
}
