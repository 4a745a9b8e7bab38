//! Background refresh timers for resources with the scheduled policy.

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::cache::Resource;
use crate::config::RefreshPolicy;
use crate::registry::Registry;

/// One timer task per scheduled resource. Dropping the scheduler aborts
/// its tasks; `shutdown` lets them finish the current refresh first.
pub struct Scheduler {
  shutdown: watch::Sender<bool>,
  handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
  pub fn start(registry: &Registry) -> Self {
    let (shutdown, rx) = watch::channel(false);
    let handles = registry
      .resources()
      .filter(|resource| resource.policy() == RefreshPolicy::Scheduled)
      .map(|resource| tokio::spawn(run(Arc::clone(resource), rx.clone())))
      .collect();
    Self { shutdown, handles }
  }

  /// Number of running timers.
  pub fn task_count(&self) -> usize {
    self.handles.len()
  }

  pub async fn shutdown(mut self) {
    let _ = self.shutdown.send(true);
    for handle in self.handles.drain(..) {
      let _ = handle.await;
    }
  }
}

impl Drop for Scheduler {
  fn drop(&mut self) {
    for handle in &self.handles {
      handle.abort();
    }
  }
}

/// Refresh immediately, then every `refresh_interval`. Failures are logged
/// by the cache; the timer keeps its period.
async fn run(resource: Arc<dyn Resource>, mut shutdown: watch::Receiver<bool>) {
  let kind = resource.kind();
  let period = resource.refresh_interval();
  let mut ticker = interval(period);
  ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

  info!(resource = %kind, interval_secs = period.as_secs(), "Scheduled refresh started");

  loop {
    tokio::select! {
      biased;

      changed = shutdown.changed() => {
        if changed.is_err() || *shutdown.borrow() {
          info!(resource = %kind, "Scheduled refresh stopping");
          break;
        }
      }

      _ = ticker.tick() => {
        let ok = resource.refresh().await;
        debug!(resource = %kind, ok, "Scheduled refresh finished");
      }
    }
  }
}
