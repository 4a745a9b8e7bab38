/// Query names the server answers and what each one maps to
use crate::resources::ResourceKind;

/// What a query name resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
  Resource(ResourceKind),
  Help,
  Status,
}

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
  pub target: Target,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "epoch-status.cli",
    aliases: &["epoch.cli"],
    description: "Show current epoch progress",
    target: Target::Resource(ResourceKind::Epoch),
  },
  Command {
    name: "tps-status.cli",
    aliases: &["tps.cli"],
    description: "Show Transactions per second(TPS) records",
    target: Target::Resource(ResourceKind::Tps),
  },
  Command {
    name: "blocktime-status.cli",
    aliases: &["blocktime.cli"],
    description: "Show blocktime metrics records",
    target: Target::Resource(ResourceKind::Blocktime),
  },
  Command {
    name: "validators-status.cli",
    aliases: &["validators.cli"],
    description: "Show top 10 Solana validators",
    target: Target::Resource(ResourceKind::Validators),
  },
  Command {
    name: "price-chart.cli",
    aliases: &["price.cli"],
    description: "Show Solana price chart and metrics",
    target: Target::Resource(ResourceKind::PriceChart),
  },
  Command {
    name: "solana-supply.cli",
    aliases: &["supply.cli"],
    description: "Show Total Solana Supply and Stake Data",
    target: Target::Resource(ResourceKind::Supply),
  },
  Command {
    name: "stake-stats.cli",
    aliases: &["stake.cli"],
    description: "Get Solana staking statistics",
    target: Target::Resource(ResourceKind::StakeStats),
  },
  Command {
    name: "stake-average-size.cli",
    aliases: &[],
    description: "Show average SOL stake sizes",
    target: Target::Resource(ResourceKind::StakeAverageSize),
  },
  Command {
    name: "stake-graph.cli",
    aliases: &[],
    description: "Show stake growth over epochs",
    target: Target::Resource(ResourceKind::StakeGraph),
  },
  Command {
    name: "status.cli",
    aliases: &[],
    description: "Show cache status for every resource",
    target: Target::Status,
  },
  Command {
    name: "help.cli",
    aliases: &["commands.cli"],
    description: "Show this command list",
    target: Target::Help,
  },
];

/// Lowercase and strip surrounding dots, so `EPOCH-Status.CLI.` matches.
pub fn normalize(name: &str) -> String {
  name.trim_matches('.').to_ascii_lowercase()
}

/// Exact match on a normalized name or one of its aliases.
pub fn lookup(name: &str) -> Option<&'static Command> {
  let name = normalize(name);
  COMMANDS
    .iter()
    .find(|cmd| cmd.name == name || cmd.aliases.contains(&name.as_str()))
}

/// Help text, restricted to commands `available` accepts.
pub fn help_lines(available: impl Fn(&Command) -> bool) -> Vec<String> {
  let mut lines = vec![
    "AVAILABLE COMMANDS:".to_string(),
    "-------------------".to_string(),
  ];
  lines.extend(
    COMMANDS
      .iter()
      .filter(|cmd| available(cmd))
      .map(|cmd| format!("{:<24} - {}", cmd.name, cmd.description)),
  );
  lines
}
