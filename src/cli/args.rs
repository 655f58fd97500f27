#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::str::FromStr;

use super::parser::CliError;

pub(super) const VALID_COMMANDS: &[&str] = &[
    "init",
    "send",
    "recv",
    "check",
    "drain",
    "register",
    "unregister",
    "agents",
    "cleanup",
    "log",
    "tail",
    "query",
    "submit-task",
    "claim-task",
    "complete-task",
    "fail-task",
    "list-tasks",
    "next-task",
    "route-task",
    "pipeline-state",
];

/// Flags a subcommand accepts: `values` take the next argument, `switches`
/// stand alone.
#[derive(Debug, Clone, Copy, Default)]
pub(super) struct FlagSpec {
    pub values: &'static [&'static str],
    pub switches: &'static [&'static str],
}

/// Arguments of one subcommand split into positionals and flags.
#[derive(Debug)]
pub(super) struct ParsedArgs {
    command: String,
    positionals: VecDeque<String>,
    values: HashMap<String, String>,
    switches: HashSet<String>,
}

impl ParsedArgs {
    /// Splits `args` (everything after the subcommand name). `--` ends flag
    /// parsing; `--flag=value` and `--flag value` are both accepted.
    pub(super) fn split(command: &str, args: &[String], spec: FlagSpec) -> Result<Self, CliError> {
        let mut parsed = Self {
            command: command.to_string(),
            positionals: VecDeque::new(),
            values: HashMap::new(),
            switches: HashSet::new(),
        };

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            if arg == "--" {
                parsed.positionals.extend(iter.by_ref().cloned());
                break;
            }

            let Some(flag) = arg.strip_prefix("--").filter(|f| !f.is_empty()) else {
                parsed.positionals.push_back(arg.clone());
                continue;
            };

            let (name, inline_value) = match flag.split_once('=') {
                Some((name, value)) => (name, Some(value.to_string())),
                None => (flag, None),
            };

            if spec.values.contains(&name) {
                let value = match inline_value {
                    Some(value) => value,
                    None => iter.next().cloned().ok_or_else(|| CliError::MissingRequiredArg {
                        arg: format!("--{name}"),
                    })?,
                };
                parsed.values.insert(name.to_string(), value);
            } else if spec.switches.contains(&name) && inline_value.is_none() {
                parsed.switches.insert(name.to_string());
            } else {
                return Err(CliError::UnknownFlag {
                    flag: arg.clone(),
                    cmd: command.to_string(),
                });
            }
        }

        Ok(parsed)
    }

    pub(super) fn required(&mut self, name: &str) -> Result<String, CliError> {
        self.positionals
            .pop_front()
            .ok_or_else(|| CliError::MissingRequiredArg {
                arg: name.to_string(),
            })
    }

    pub(super) fn required_parsed<T>(&mut self, name: &str) -> Result<T, CliError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.required(name)?;
        parse_value(name, &raw)
    }

    pub(super) fn optional(&mut self) -> Option<String> {
        self.positionals.pop_front()
    }

    pub(super) fn optional_parsed<T>(&mut self, name: &str) -> Result<Option<T>, CliError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional()
            .map(|raw| parse_value(name, &raw))
            .transpose()
    }

    /// Every positional not yet consumed.
    pub(super) fn rest(&mut self) -> Vec<String> {
        self.positionals.drain(..).collect()
    }

    pub(super) fn value(&self, flag: &str) -> Option<String> {
        self.values.get(flag).cloned()
    }

    pub(super) fn value_parsed<T>(&self, flag: &str) -> Result<Option<T>, CliError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.values
            .get(flag)
            .map(|raw| parse_value(&format!("--{flag}"), raw))
            .transpose()
    }

    pub(super) fn switch(&self, flag: &str) -> bool {
        self.switches.contains(flag)
    }

    /// Rejects leftover positionals.
    pub(super) fn finish(mut self) -> Result<(), CliError> {
        self.positionals
            .pop_front()
            .map_or(Ok(()), |arg| {
                Err(CliError::UnexpectedArgument {
                    arg,
                    cmd: self.command.clone(),
                })
            })
    }
}

fn parse_value<T>(name: &str, raw: &str) -> Result<T, CliError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| CliError::InvalidArgValue {
        arg: name.to_string(),
        error: format!("{e}"),
    })
}

#[must_use]
pub fn suggest_commands(typo: &str) -> Vec<String> {
    VALID_COMMANDS
        .iter()
        .map(|cmd| (cmd, strsim::levenshtein(typo, cmd)))
        .filter(|(_, dist)| *dist <= 3)
        .min_by_key(|(_, dist)| *dist)
        .map(|(cmd, _)| vec![cmd.to_string()])
        .unwrap_or_default()
}
