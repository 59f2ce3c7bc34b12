//! Command palette entries and autocomplete

use labq::resource::screens::{
  ResourceSpec, REFERRAL_LOCATIONS, SAMPLES, STORAGE, TEST_REQUESTS, TEST_RESULTS, WORKSHEETS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandAction {
  Open(&'static ResourceSpec),
  Quit,
}

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
  pub action: CommandAction,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "requests",
    aliases: &["req", "orders"],
    description: "Test requests",
    action: CommandAction::Open(&TEST_REQUESTS),
  },
  Command {
    name: "samples",
    aliases: &["s", "sample"],
    description: "Registered samples",
    action: CommandAction::Open(&SAMPLES),
  },
  Command {
    name: "results",
    aliases: &["res", "approvals"],
    description: "Test results and approvals",
    action: CommandAction::Open(&TEST_RESULTS),
  },
  Command {
    name: "worksheets",
    aliases: &["w", "ws"],
    description: "Worksheets",
    action: CommandAction::Open(&WORKSHEETS),
  },
  Command {
    name: "referrals",
    aliases: &["ref"],
    description: "Referral locations",
    action: CommandAction::Open(&REFERRAL_LOCATIONS),
  },
  Command {
    name: "storage",
    aliases: &["st", "archive"],
    description: "Sample storage",
    action: CommandAction::Open(&STORAGE),
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit labq",
    action: CommandAction::Quit,
  },
];

/// How well `cmd` matches `input`; lower is better.
fn match_rank(cmd: &Command, input: &str) -> Option<u8> {
  let aliases = || cmd.aliases.iter();
  if cmd.name == input {
    Some(0)
  } else if aliases().any(|a| *a == input) {
    Some(1)
  } else if cmd.name.starts_with(input) {
    Some(2)
  } else if aliases().any(|a| a.starts_with(input)) {
    Some(3)
  } else if cmd.name.contains(input) || aliases().any(|a| a.contains(input)) {
    Some(4)
  } else {
    None
  }
}

/// Get autocomplete suggestions for a given input, best match first
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input = input.trim().to_lowercase();
  let mut ranked: Vec<(u8, &'static Command)> = COMMANDS
    .iter()
    .filter_map(|cmd| match_rank(cmd, &input).map(|rank| (rank, cmd)))
    .collect();
  ranked.sort_by_key(|(rank, _)| *rank);
  ranked.into_iter().map(|(_, cmd)| cmd).collect()
}

pub fn find_command(name: &str) -> Option<&'static Command> {
  get_suggestions(name)
    .into_iter()
    .find(|cmd| match_rank(cmd, &name.trim().to_lowercase()).is_some_and(|rank| rank <= 1))
}
