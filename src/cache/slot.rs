//! In-memory cache slot holding one resource's fetched and rendered state.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::traits::SlotState;

/// When a successful fetch completed, on both clocks.
///
/// The monotonic instant drives freshness; the wall-clock time is only for
/// display.
#[derive(Debug, Clone, Copy)]
pub struct Stamp {
  pub at: Instant,
  pub wall: DateTime<Utc>,
}

impl Stamp {
  pub fn now() -> Self {
    Self {
      at: Instant::now(),
      wall: Utc::now(),
    }
  }
}

/// Cache record for a single resource.
///
/// Only the owning `ResourceCache` touches a slot, always under its mutex and
/// never across an await point.
#[derive(Debug)]
pub struct Slot<T> {
  raw: Option<Arc<T>>,
  lines: Option<Vec<String>>,
  last_success: Option<Stamp>,
  refreshing: bool,
  last_error: Option<String>,
  consecutive_failures: u32,
  last_refresh_ok: bool,
}

impl<T> Default for Slot<T> {
  fn default() -> Self {
    Self {
      raw: None,
      lines: None,
      last_success: None,
      refreshing: false,
      last_error: None,
      consecutive_failures: 0,
      last_refresh_ok: false,
    }
  }
}

impl<T> Slot<T> {
  pub fn state(&self, now: Instant, ttl: Duration) -> SlotState {
    if self.refreshing {
      return SlotState::Refreshing;
    }
    match self.last_success {
      None => SlotState::Empty,
      Some(_) if self.is_expired(now, ttl) => SlotState::Stale,
      Some(_) => SlotState::Fresh,
    }
  }

  /// True when a value exists and its age is at least `ttl`.
  pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
    self.age(now).map(|age| age >= ttl).unwrap_or(false)
  }

  pub fn has_value(&self) -> bool {
    self.lines.is_some()
  }

  pub fn age(&self, now: Instant) -> Option<Duration> {
    self
      .last_success
      .map(|stamp| now.saturating_duration_since(stamp.at))
  }

  pub fn lines(&self) -> Option<&[String]> {
    self.lines.as_deref()
  }

  pub fn raw(&self) -> Option<Arc<T>> {
    self.raw.clone()
  }

  pub fn last_success(&self) -> Option<Stamp> {
    self.last_success
  }

  pub fn last_error(&self) -> Option<&str> {
    self.last_error.as_deref()
  }

  pub fn consecutive_failures(&self) -> u32 {
    self.consecutive_failures
  }

  pub fn last_refresh_ok(&self) -> bool {
    self.last_refresh_ok
  }

  /// Check-and-set the in-flight flag. Returns false if a refresh already
  /// owns the slot.
  pub fn try_begin_refresh(&mut self) -> bool {
    if self.refreshing {
      return false;
    }
    self.refreshing = true;
    true
  }

  pub fn end_refresh(&mut self) {
    self.refreshing = false;
  }

  /// Replace value, lines and timestamp in one step.
  pub fn store(&mut self, raw: T, lines: Vec<String>, stamp: Stamp) {
    self.raw = Some(Arc::new(raw));
    self.lines = Some(lines);
    self.last_success = Some(stamp);
    self.last_error = None;
    self.consecutive_failures = 0;
    self.last_refresh_ok = true;
  }

  /// Record a failed refresh. The previous value is kept.
  pub fn record_failure(&mut self, error: String) {
    self.last_error = Some(error);
    self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    self.last_refresh_ok = false;
  }
}
