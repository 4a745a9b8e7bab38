//! DNS front end: TXT answers over UDP.

mod dispatcher;
mod server;

pub use dispatcher::Dispatcher;
pub use server::DnsServer;
