//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};
use color_eyre::Result;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::config::RefreshPolicy;
use crate::resources::ResourceKind;

/// A boxed future, used where resources are handled as trait objects.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The fetch + render pair a resource cache is parameterized over.
///
/// `fetch` talks to the upstream and owns any retry logic; the cache never
/// retries on its own. `render` is pure and must not fail: malformed input
/// turns into an explanatory line.
pub trait Source: Send + Sync + 'static {
  /// Structured value produced by a successful fetch
  type Data: Send + Sync + 'static;

  fn fetch(&self) -> impl Future<Output = Result<Self::Data>> + Send;

  /// Render `data` into text lines. `age` is the time elapsed since the
  /// data was fetched.
  fn render(&self, data: &Self::Data, age: Duration) -> Vec<String>;

  /// Whether the output depends on `age` and must be re-rendered on read.
  fn time_relative(&self) -> bool {
    false
  }
}

/// Object-safe view of a resource cache, used by the registry, the
/// dispatcher and the scheduler.
pub trait Resource: Send + Sync {
  fn kind(&self) -> ResourceKind;

  /// Best currently available lines. Only errors when nothing was ever
  /// fetched and a synchronous fetch failed.
  fn get(&self) -> BoxFuture<'_, Result<Vec<String>>>;

  /// Run (or join) a refresh and report whether it succeeded.
  fn refresh(&self) -> BoxFuture<'_, bool>;

  fn status(&self) -> SlotStatus;

  fn policy(&self) -> RefreshPolicy;

  /// Period of the background timer, for scheduled resources.
  fn refresh_interval(&self) -> Duration;
}

/// Freshness state of a slot. Always derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
  /// Never fetched successfully
  Empty,
  /// Age below ttl
  Fresh,
  /// Age at or above ttl, a previous value exists
  Stale,
  /// A fetch is in flight for this slot
  Refreshing,
}

impl fmt::Display for SlotState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      SlotState::Empty => "EMPTY",
      SlotState::Fresh => "FRESH",
      SlotState::Stale => "STALE",
      SlotState::Refreshing => "REFRESHING",
    };
    f.write_str(s)
  }
}

/// Diagnostic snapshot of a slot.
#[derive(Debug, Clone)]
pub struct SlotStatus {
  pub kind: ResourceKind,
  pub state: SlotState,
  pub policy: RefreshPolicy,
  pub ttl: Duration,
  /// When the last successful fetch completed
  pub last_success_at: Option<DateTime<Utc>>,
  pub age: Option<Duration>,
  pub last_error: Option<String>,
  pub consecutive_failures: u32,
}
