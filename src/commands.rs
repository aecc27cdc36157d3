/// Command palette entries, parsing and autocomplete

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
  Contacts,
  AuditLogs,
  Analytics,
  Clear,
  Login,
  Logout,
  Quit,
}

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
  /// Placeholder shown for a required argument
  pub argument: Option<&'static str>,
  pub action: Action,
}

pub const COMMANDS: &[Command] = &[
  Command {
    name: "contacts",
    aliases: &["c", "contact"],
    description: "Browse and edit contacts",
    argument: None,
    action: Action::Contacts,
  },
  Command {
    name: "audit",
    aliases: &["a", "logs"],
    description: "Admin audit log",
    argument: None,
    action: Action::AuditLogs,
  },
  Command {
    name: "analytics",
    aliases: &["qr", "scans"],
    description: "Scan analytics of a QR code",
    argument: Some("<qr-id>"),
    action: Action::Analytics,
  },
  Command {
    name: "clear",
    aliases: &["invalidate"],
    description: "Drop cached data (all, or one QR code's analytics)",
    argument: None,
    action: Action::Clear,
  },
  Command {
    name: "login",
    aliases: &["signin"],
    description: "Sign in with the configured token",
    argument: None,
    action: Action::Login,
  },
  Command {
    name: "logout",
    aliases: &["signout"],
    description: "Sign out and clear cached data",
    argument: None,
    action: Action::Logout,
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit qrdash",
    argument: None,
    action: Action::Quit,
  },
];

/// A resolved command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
  pub action: Action,
  pub argument: Option<String>,
}

/// Split "analytics qr-42" into the command word and its trimmed argument.
pub fn split_command(input: &str) -> (&str, Option<&str>) {
  let input = input.trim();
  match input.split_once(char::is_whitespace) {
    Some((word, rest)) => {
      let rest = rest.trim();
      (word, (!rest.is_empty()).then_some(rest))
    }
    None => (input, None),
  }
}

/// Resolve a command line, falling back to the best suggestion for the
/// command word. Commands that need an argument resolve only with one.
pub fn resolve(input: &str) -> Option<Invocation> {
  let (word, argument) = split_command(input);
  let command = get_suggestions(word).into_iter().next()?;
  if command.argument.is_some() && argument.is_none() {
    return None;
  }
  Some(Invocation {
    action: command.action,
    argument: argument.map(str::to_string),
  })
}

/// Lower is better; None means no match.
fn match_rank(cmd: &Command, input: &str) -> Option<u32> {
  if cmd.name == input {
    Some(0)
  } else if cmd.aliases.contains(&input) {
    Some(1)
  } else if cmd.name.starts_with(input) {
    Some(2)
  } else if cmd.aliases.iter().any(|a| a.starts_with(input)) {
    Some(3)
  } else if cmd.name.contains(input) {
    Some(4)
  } else if cmd.aliases.iter().any(|a| a.contains(input)) {
    Some(5)
  } else {
    None
  }
}

/// Get autocomplete suggestions for the command word of `input`
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let (word, _) = split_command(input);
  let word = word.to_lowercase();

  if word.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = COMMANDS
    .iter()
    .filter_map(|cmd| match_rank(cmd, &word).map(|rank| (cmd, rank)))
    .collect();
  // Stable, so ties keep palette order
  matches.sort_by_key(|(_, rank)| *rank);
  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_input_returns_all() {
    assert_eq!(get_suggestions("").len(), COMMANDS.len());
  }

  #[test]
  fn test_exact_and_alias_match() {
    assert_eq!(get_suggestions("audit")[0].name, "audit");
    assert_eq!(get_suggestions("c")[0].name, "contacts");
    assert_eq!(get_suggestions("qr")[0].name, "analytics");
  }

  #[test]
  fn test_prefix_and_fuzzy_match() {
    assert_eq!(get_suggestions("cont")[0].name, "contacts");
    assert_eq!(get_suggestions("lyt")[0].name, "analytics");
  }

  #[test]
  fn test_name_prefix_beats_alias_prefix() {
    // "log" prefixes both `login`/`logout` and the `logs` alias of audit
    let names: Vec<_> = get_suggestions("log").iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["login", "logout", "audit"]);
  }

  #[test]
  fn test_split_command() {
    assert_eq!(split_command("  analytics   qr-42  "), ("analytics", Some("qr-42")));
    assert_eq!(split_command("contacts"), ("contacts", None));
    assert_eq!(split_command(""), ("", None));
  }

  #[test]
  fn test_resolve() {
    assert_eq!(
      resolve("qr qr-42"),
      Some(Invocation {
        action: Action::Analytics,
        argument: Some("qr-42".into()),
      })
    );
    assert_eq!(resolve("analytics"), None);
    assert_eq!(resolve("cont").map(|i| i.action), Some(Action::Contacts));
    assert_eq!(resolve("zzz"), None);
    assert_eq!(
      resolve("clear qr-7"),
      Some(Invocation {
        action: Action::Clear,
        argument: Some("qr-7".into()),
      })
    );
    assert_eq!(resolve("clear").map(|i| i.argument), Some(None));
  }
}
