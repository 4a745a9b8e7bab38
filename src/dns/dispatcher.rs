//! Turns one DNS query datagram into one response datagram.

use color_eyre::{eyre::eyre, Result};
use domain::base::iana::{Class, Rcode, Rtype};
use domain::base::{Message, MessageBuilder, Name, ToName};
use domain::rdata::Txt;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::commands;
use crate::config::{MessagesConfig, ServerConfig};
use crate::registry::{Registry, Route};

pub struct Dispatcher {
  registry: Arc<Registry>,
  answer_ttl: u32,
  max_record_len: usize,
}

impl Dispatcher {
  pub fn new(registry: Arc<Registry>, server: &ServerConfig) -> Self {
    Self {
      registry,
      answer_ttl: server.answer_ttl,
      max_record_len: server.max_record_len,
    }
  }

  fn messages(&self) -> &MessagesConfig {
    self.registry.messages()
  }

  /// Response bytes for `datagram`, or `None` when it should be ignored.
  pub async fn handle(&self, datagram: &[u8]) -> Option<Vec<u8>> {
    let Ok(query) = Message::from_octets(datagram) else {
      debug!(len = datagram.len(), "Dropping datagram shorter than a DNS header");
      return None;
    };
    if query.header().qr() {
      debug!(id = query.header().id(), "Dropping DNS response");
      return None;
    }

    let response = match query.first_question() {
      Some(question) => {
        let name = question.qname().to_string();
        let lines = self.lines_for(&name, question.qtype()).await;
        self.encode(&query, question.qname(), lines)
      }
      None => {
        debug!(id = query.header().id(), "Query without a question");
        let lines = vec![self.messages().unknown_command.clone()];
        self.encode(&query, Name::root_vec(), lines)
      }
    };

    match response {
      Ok(bytes) => Some(bytes),
      Err(e) => {
        error!(id = query.header().id(), error = %e, "Failed to encode response");
        None
      }
    }
  }

  async fn lines_for(&self, name: &str, qtype: Rtype) -> Vec<String> {
    let messages = self.messages();
    if qtype != Rtype::TXT && qtype != Rtype::ANY {
      debug!(name, %qtype, "Unsupported query type");
      return vec![messages.unknown_command.clone()];
    }

    let lines = match self.registry.route(name) {
      Route::Resource(resource) => {
        let kind = resource.kind();
        debug!(name, resource = %kind, "Serving resource");
        match AssertUnwindSafe(resource.get()).catch_unwind().await {
          Ok(Ok(lines)) => lines,
          Ok(Err(e)) => {
            warn!(resource = %kind, error = %format!("{e:#}"), "Resource unavailable");
            vec![messages.unavailable.clone()]
          }
          Err(_) => {
            error!(resource = %kind, "Resource handler panicked");
            vec![messages.error.clone()]
          }
        }
      }
      Route::Help => self.registry.help_lines(),
      Route::Status => self.registry.status_lines(),
      Route::Unknown => {
        debug!(name = %commands::normalize(name), "Unknown command");
        vec![messages.unknown_command.clone()]
      }
    };

    if lines.iter().all(|line| line.trim().is_empty()) {
      return vec![messages.error.clone()];
    }
    lines
  }

  /// One TXT answer per line chunk. A full message gets the TC bit and the
  /// remaining lines are dropped.
  fn encode<N: ToName>(
    &self,
    query: &Message<&[u8]>,
    owner: N,
    lines: Vec<String>,
  ) -> Result<Vec<u8>> {
    let mut answer = MessageBuilder::new_stream_vec()
      .start_answer(query, Rcode::NOERROR)
      .map_err(|e| eyre!("Failed to copy question: {}", e))?;

    let mut pushed = 0usize;
    'lines: for line in &lines {
      for chunk in split_line(line, self.max_record_len) {
        let record = (&owner, Class::IN, self.answer_ttl, txt(chunk)?);
        if answer.push(record).is_err() {
          warn!(pushed, lines = lines.len(), "Response full, truncating");
          answer.as_builder_mut().header_mut().set_tc(true);
          break 'lines;
        }
        pushed += 1;
      }
    }

    Ok(answer.finish().as_dgram_slice().to_vec())
  }
}

/// TXT data holding `chunk` as a single character string.
fn txt(chunk: &str) -> Result<Txt<Vec<u8>>> {
  let len = u8::try_from(chunk.len())
    .map_err(|_| eyre!("TXT chunk of {} bytes is too long", chunk.len()))?;
  let mut octets = Vec::with_capacity(chunk.len() + 1);
  octets.push(len);
  octets.extend_from_slice(chunk.as_bytes());
  Txt::from_octets(octets).map_err(|_| eyre!("Invalid TXT chunk of {} bytes", chunk.len()))
}

/// Split `line` into pieces of at most `max` bytes without cutting a UTF-8
/// character. A single character wider than `max` becomes its own piece.
fn split_line(line: &str, max: usize) -> Vec<&str> {
  if line.len() <= max {
    return vec![line];
  }
  let mut chunks = Vec::new();
  let mut rest = line;
  while !rest.is_empty() {
    let mut end = max.min(rest.len());
    while end > 0 && !rest.is_char_boundary(end) {
      end -= 1;
    }
    if end == 0 {
      end = rest.chars().next().map_or(rest.len(), char::len_utf8);
    }
    let (chunk, tail) = rest.split_at(end);
    chunks.push(chunk);
    rest = tail;
  }
  chunks
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::cache::test_support::{settings, FakeSource};
  use crate::cache::{BoxFuture, Resource, ResourceCache, SlotStatus};
  use crate::config::RefreshPolicy;
  use crate::resources::ResourceKind;
  use std::str::FromStr;
  use std::sync::atomic::Ordering::SeqCst;
  use std::time::Duration;

  pub(crate) fn query(name: &str, qtype: Rtype) -> Vec<u8> {
    let mut builder = MessageBuilder::new_vec();
    builder.header_mut().set_id(4242);
    builder.header_mut().set_rd(true);
    let mut question = builder.question();
    question
      .push((Name::<Vec<u8>>::from_str(name).unwrap(), qtype))
      .unwrap();
    question.finish()
  }

  /// (owner, text) of every TXT answer
  pub(crate) fn answers(bytes: &[u8]) -> Vec<(String, String)> {
    let message = Message::from_octets(bytes).unwrap();
    message
      .answer()
      .unwrap()
      .limit_to::<Txt<_>>()
      .map(|record| {
        let record = record.unwrap();
        let text: Vec<u8> = record.data().iter().flatten().copied().collect();
        (
          record.owner().to_string(),
          String::from_utf8(text).unwrap(),
        )
      })
      .collect()
  }

  fn texts(bytes: &[u8]) -> Vec<String> {
    answers(bytes).into_iter().map(|(_, text)| text).collect()
  }

  pub(crate) fn dispatcher_with(sources: &[(ResourceKind, FakeSource)]) -> Dispatcher {
    let mut registry = Registry::new(MessagesConfig::default());
    for (kind, source) in sources {
      registry.insert(Arc::new(ResourceCache::new(
        *kind,
        source.clone(),
        settings(RefreshPolicy::OnDemand),
      )));
    }
    Dispatcher::new(Arc::new(registry), &ServerConfig::default())
  }

  /// Resource whose handler panics.
  struct Exploding;

  impl Resource for Exploding {
    fn kind(&self) -> ResourceKind {
      ResourceKind::Supply
    }
    fn get(&self) -> BoxFuture<'_, Result<Vec<String>>> {
      Box::pin(async { panic!("renderer bug") })
    }
    fn refresh(&self) -> BoxFuture<'_, bool> {
      Box::pin(async { false })
    }
    fn status(&self) -> SlotStatus {
      unimplemented!()
    }
    fn policy(&self) -> RefreshPolicy {
      RefreshPolicy::OnDemand
    }
    fn refresh_interval(&self) -> Duration {
      Duration::from_secs(60)
    }
  }

  #[tokio::test]
  async fn test_resource_lines_become_txt_answers() {
    let source = FakeSource::new(3);
    let dispatcher = dispatcher_with(&[(ResourceKind::Epoch, source.clone())]);

    let bytes = dispatcher
      .handle(&query("epoch-status.cli", Rtype::TXT))
      .await
      .unwrap();

    let response = Message::from_octets(bytes.as_slice()).unwrap();
    assert!(response.header().qr());
    assert_eq!(response.header().id(), 4242);
    assert!(response.header().rd());
    assert!(!response.header().tc());
    assert_eq!(response.header_counts().qdcount(), 1);
    assert_eq!(
      answers(&bytes),
      vec![("epoch-status.cli".to_string(), "value 3".to_string())]
    );
    let record = response
      .answer()
      .unwrap()
      .limit_to::<Txt<_>>()
      .next()
      .unwrap()
      .unwrap();
    assert_eq!(record.ttl().as_secs(), 60);
    assert_eq!(record.class(), Class::IN);
    assert_eq!(source.upstream.calls.load(SeqCst), 1);
  }

  #[tokio::test]
  async fn test_name_matching_ignores_case() {
    let dispatcher = dispatcher_with(&[(ResourceKind::Tps, FakeSource::new(9))]);
    let bytes = dispatcher.handle(&query("TPS-Status.CLI", Rtype::TXT)).await.unwrap();
    assert_eq!(texts(&bytes), vec!["value 9"]);
  }

  #[tokio::test]
  async fn test_unknown_name_gets_fallback() {
    let dispatcher = dispatcher_with(&[]);
    let bytes = dispatcher.handle(&query("nothing.cli", Rtype::TXT)).await.unwrap();
    assert_eq!(
      texts(&bytes),
      vec![MessagesConfig::default().unknown_command]
    );
  }

  #[tokio::test]
  async fn test_non_txt_query_gets_fallback() {
    let source = FakeSource::new(1);
    let dispatcher = dispatcher_with(&[(ResourceKind::Epoch, source.clone())]);
    let bytes = dispatcher.handle(&query("epoch-status.cli", Rtype::A)).await.unwrap();
    assert_eq!(
      texts(&bytes),
      vec![MessagesConfig::default().unknown_command]
    );
    assert_eq!(source.upstream.calls.load(SeqCst), 0);

    let bytes = dispatcher.handle(&query("epoch-status.cli", Rtype::ANY)).await.unwrap();
    assert_eq!(texts(&bytes), vec!["value 1"]);
  }

  #[tokio::test]
  async fn test_zero_questions_answered_at_root() {
    let mut builder = MessageBuilder::new_vec();
    builder.header_mut().set_id(7);
    let bytes = dispatcher_with(&[])
      .handle(&builder.finish())
      .await
      .unwrap();

    let answers = answers(&bytes);
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].0, Name::root_vec().to_string());
    assert_eq!(answers[0].1, MessagesConfig::default().unknown_command);
  }

  #[tokio::test]
  async fn test_unavailable_resource_gets_one_line() {
    let source = FakeSource::new(1);
    source.upstream.fail.store(true, SeqCst);
    let dispatcher = dispatcher_with(&[(ResourceKind::Epoch, source)]);
    let bytes = dispatcher.handle(&query("epoch-status.cli", Rtype::TXT)).await.unwrap();
    assert_eq!(texts(&bytes), vec![MessagesConfig::default().unavailable]);
  }

  #[tokio::test]
  async fn test_panicking_handler_gets_error_line() {
    let mut registry = Registry::new(MessagesConfig::default());
    registry.insert(Arc::new(Exploding));
    let dispatcher = Dispatcher::new(Arc::new(registry), &ServerConfig::default());

    let bytes = dispatcher.handle(&query("solana-supply.cli", Rtype::TXT)).await.unwrap();
    assert_eq!(texts(&bytes), vec![MessagesConfig::default().error]);
  }

  #[tokio::test]
  async fn test_help_and_status() {
    let dispatcher = dispatcher_with(&[(ResourceKind::Epoch, FakeSource::new(1))]);

    let help = texts(&dispatcher.handle(&query("help.cli", Rtype::TXT)).await.unwrap());
    assert_eq!(help[0], "AVAILABLE COMMANDS:");
    assert!(help.iter().any(|line| line.starts_with("epoch-status.cli")));
    assert!(!help.iter().any(|line| line.starts_with("tps-status.cli")));

    let status = texts(&dispatcher.handle(&query("status.cli", Rtype::TXT)).await.unwrap());
    assert_eq!(status.len(), 2);
    assert!(status[1].contains("EMPTY"));
  }

  #[tokio::test]
  async fn test_responses_and_runts_are_dropped() {
    let dispatcher = dispatcher_with(&[]);
    assert!(dispatcher.handle(&[0u8; 5]).await.is_none());

    let mut response = query("help.cli", Rtype::TXT);
    // QR is the top bit of the third header octet
    response[2] |= 0x80;
    assert!(dispatcher.handle(&response).await.is_none());
  }

  #[tokio::test]
  async fn test_long_lines_split_into_records() {
    let mut registry = Registry::new(MessagesConfig::default());
    registry.insert(Arc::new(Lines(vec!["é".repeat(200)])));
    let dispatcher = Dispatcher::new(Arc::new(registry), &ServerConfig::default());

    let texts = texts(&dispatcher.handle(&query("stake-graph.cli", Rtype::TXT)).await.unwrap());
    assert_eq!(texts.len(), 2);
    assert_eq!(texts[0].len(), 254);
    assert_eq!(texts.concat(), "é".repeat(200));
  }

  #[tokio::test]
  async fn test_oversized_response_is_truncated() {
    let line = "x".repeat(250);
    let mut registry = Registry::new(MessagesConfig::default());
    registry.insert(Arc::new(Lines(vec![line; 400])));
    let dispatcher = Dispatcher::new(Arc::new(registry), &ServerConfig::default());

    let bytes = dispatcher.handle(&query("stake-graph.cli", Rtype::TXT)).await.unwrap();

    let response = Message::from_octets(bytes.as_slice()).unwrap();
    assert!(response.header().tc());
    assert!(bytes.len() <= usize::from(u16::MAX));
    let count = answers(&bytes).len();
    assert!(count > 0 && count < 400);
  }

  #[tokio::test]
  async fn test_blank_result_becomes_error_line() {
    let mut registry = Registry::new(MessagesConfig::default());
    registry.insert(Arc::new(Lines(vec![String::new(), "  ".to_string()])));
    let dispatcher = Dispatcher::new(Arc::new(registry), &ServerConfig::default());

    let bytes = dispatcher.handle(&query("stake-graph.cli", Rtype::TXT)).await.unwrap();
    assert_eq!(texts(&bytes), vec![MessagesConfig::default().error]);
  }

  /// Resource serving fixed lines.
  struct Lines(Vec<String>);

  impl Resource for Lines {
    fn kind(&self) -> ResourceKind {
      ResourceKind::StakeGraph
    }
    fn get(&self) -> BoxFuture<'_, Result<Vec<String>>> {
      let lines = self.0.clone();
      Box::pin(async move { Ok(lines) })
    }
    fn refresh(&self) -> BoxFuture<'_, bool> {
      Box::pin(async { true })
    }
    fn status(&self) -> SlotStatus {
      unimplemented!()
    }
    fn policy(&self) -> RefreshPolicy {
      RefreshPolicy::OnDemand
    }
    fn refresh_interval(&self) -> Duration {
      Duration::from_secs(60)
    }
  }

  #[test]
  fn test_split_line() {
    assert_eq!(split_line("abc", 255), vec!["abc"]);
    assert_eq!(split_line("", 255), vec![""]);
    assert_eq!(split_line("abcdef", 4), vec!["abcd", "ef"]);
    // "é" is two bytes; never cut in half
    assert_eq!(split_line("aéé", 2), vec!["a", "é", "é"]);
    assert_eq!(split_line("€x", 1), vec!["€", "x"]);
  }
}
