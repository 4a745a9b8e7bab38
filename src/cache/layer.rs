//! Resource cache that orchestrates freshness policy with background fetching.

use color_eyre::{eyre::eyre, Report, Result};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::slot::{Slot, Stamp};
use super::traits::{BoxFuture, Resource, SlotStatus, Source};
use crate::config::RefreshPolicy;
use crate::resources::ResourceKind;

/// Per-resource cache settings.
#[derive(Debug, Clone)]
pub struct CacheSettings {
  /// How long before rendered lines are considered stale
  pub ttl: Duration,
  pub policy: RefreshPolicy,
  /// Background timer period for scheduled resources
  pub interval: Duration,
  /// Served by scheduled resources before their first successful refresh
  pub loading_message: String,
}

/// Cache for one resource, generic over its fetch/render source.
///
/// Cheap to clone: clones share the same slot. Refreshes run in their own
/// task so a dropped caller never cancels one halfway.
pub struct ResourceCache<S: Source> {
  inner: Arc<Inner<S>>,
}

struct Inner<S: Source> {
  kind: ResourceKind,
  source: S,
  settings: CacheSettings,
  slot: Mutex<Slot<S::Data>>,
  /// Woken every time a refresh finishes, successfully or not
  refreshed: Notify,
}

impl<S: Source> Inner<S> {
  fn slot(&self) -> MutexGuard<'_, Slot<S::Data>> {
    self.slot.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

/// Ownership of the slot's in-flight flag. Dropping it clears the flag and
/// wakes waiters, even if the refresh task is aborted.
struct RefreshGuard<S: Source> {
  inner: Arc<Inner<S>>,
}

impl<S: Source> Drop for RefreshGuard<S> {
  fn drop(&mut self) {
    self.inner.slot().end_refresh();
    self.inner.refreshed.notify_waiters();
  }
}

impl<S: Source> ResourceCache<S> {
  pub fn new(kind: ResourceKind, source: S, settings: CacheSettings) -> Self {
    Self {
      inner: Arc::new(Inner {
        kind,
        source,
        settings,
        slot: Mutex::new(Slot::default()),
        refreshed: Notify::new(),
      }),
    }
  }

  /// Best currently available lines for this resource.
  ///
  /// - scheduled: pure read, loading line while empty
  /// - on-demand: an empty slot is fetched synchronously; an expired one is
  ///   served as is while one background refresh runs
  /// - blocking: an empty or expired slot waits for a refresh, falling back
  ///   to the stale value when it fails
  pub async fn lines(&self) -> Result<Vec<String>> {
    match self.inner.settings.policy {
      RefreshPolicy::Scheduled => Ok(
        self
          .read()
          .unwrap_or_else(|| vec![self.inner.settings.loading_message.clone()]),
      ),
      RefreshPolicy::OnDemand => {
        let (has_value, expired) = self.peek();
        if !has_value {
          self.wait_for_refresh().await;
          return self.read_or_error();
        }
        if expired && self.trigger_refresh() {
          debug!(resource = %self.inner.kind, "Serving stale value while refreshing");
        }
        self.read_or_error()
      }
      RefreshPolicy::Blocking => {
        let (has_value, expired) = self.peek();
        if !has_value || expired {
          self.wait_for_refresh().await;
        }
        self.read_or_error()
      }
    }
  }

  /// Start a refresh unless one is in flight, wait for it, and report
  /// whether it succeeded.
  pub async fn force_refresh(&self) -> bool {
    self.wait_for_refresh().await;
    self.inner.slot().last_refresh_ok()
  }

  pub fn snapshot(&self) -> SlotStatus {
    let now = Instant::now();
    let slot = self.inner.slot();
    SlotStatus {
      kind: self.inner.kind,
      state: slot.state(now, self.inner.settings.ttl),
      policy: self.inner.settings.policy,
      ttl: self.inner.settings.ttl,
      last_success_at: slot.last_success().map(|stamp| stamp.wall),
      age: slot.age(now),
      last_error: slot.last_error().map(String::from),
      consecutive_failures: slot.consecutive_failures(),
    }
  }

  /// (has value, is expired)
  fn peek(&self) -> (bool, bool) {
    let slot = self.inner.slot();
    (
      slot.has_value(),
      slot.is_expired(Instant::now(), self.inner.settings.ttl),
    )
  }

  fn read(&self) -> Option<Vec<String>> {
    let (raw, age) = {
      let slot = self.inner.slot();
      if !self.inner.source.time_relative() {
        return slot.lines().map(<[String]>::to_vec);
      }
      (slot.raw()?, slot.age(Instant::now()).unwrap_or_default())
    };
    // Rendered outside the lock so countdowns reflect the read time
    Some(self.inner.source.render(&raw, age))
  }

  fn read_or_error(&self) -> Result<Vec<String>> {
    if let Some(lines) = self.read() {
      return Ok(lines);
    }
    let slot = self.inner.slot();
    Err(eyre!(
      "{} data unavailable: {}",
      self.inner.kind,
      slot.last_error().unwrap_or("no successful fetch yet")
    ))
  }

  /// Kick off a background refresh. Returns false if one is already in
  /// flight for this slot.
  fn trigger_refresh(&self) -> bool {
    if !self.inner.slot().try_begin_refresh() {
      return false;
    }
    let guard = RefreshGuard {
      inner: Arc::clone(&self.inner),
    };
    tokio::spawn(run_refresh(guard));
    true
  }

  /// Make sure a refresh is running and wait until it finishes.
  async fn wait_for_refresh(&self) {
    // Registered before the check so a refresh finishing in between still
    // wakes us.
    let notified = self.inner.refreshed.notified();
    self.trigger_refresh();
    notified.await;
  }
}

async fn run_refresh<S: Source>(guard: RefreshGuard<S>) {
  let inner = &guard.inner;
  let started = Instant::now();
  debug!(resource = %inner.kind, "Fetching fresh data");

  // A panicking fetch or render counts as a failed refresh
  let outcome = AssertUnwindSafe(async {
    let data = inner.source.fetch().await?;
    let lines = inner.source.render(&data, Duration::ZERO);
    Ok::<_, Report>((data, lines))
  })
  .catch_unwind()
  .await
  .unwrap_or_else(|_| Err(eyre!("refresh panicked")));

  match outcome {
    Ok((data, lines)) => {
      let count = lines.len();
      inner.slot().store(data, lines, Stamp::now());
      info!(
        resource = %inner.kind,
        lines = count,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Cache refreshed"
      );
    }
    Err(e) => {
      let mut slot = inner.slot();
      slot.record_failure(format!("{e:#}"));
      warn!(
        resource = %inner.kind,
        failures = slot.consecutive_failures(),
        serving_stale = slot.has_value(),
        "Refresh failed: {e:#}"
      );
    }
  }
}

impl<S: Source> Clone for ResourceCache<S> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

impl<S: Source> Resource for ResourceCache<S> {
  fn kind(&self) -> ResourceKind {
    self.inner.kind
  }

  fn get(&self) -> BoxFuture<'_, Result<Vec<String>>> {
    Box::pin(self.lines())
  }

  fn refresh(&self) -> BoxFuture<'_, bool> {
    Box::pin(self.force_refresh())
  }

  fn status(&self) -> SlotStatus {
    self.snapshot()
  }

  fn policy(&self) -> RefreshPolicy {
    self.inner.settings.policy
  }

  fn refresh_interval(&self) -> Duration {
    self.inner.settings.interval
  }
}
