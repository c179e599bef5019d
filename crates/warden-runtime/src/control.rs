// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The control surface: one operation per operator command.
//!
//! [`ControlCommand::parse`] turns a text line into a command and
//! [`ControlSurface::execute`] runs it against a [`WardenContext`], returning
//! a short human-readable reply. How lines are read and replies shown is up
//! to the caller.

use crate::context::WardenContext;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use warden_core::error::WardenResult;

/// An operator command.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlCommand {
    /// Flip the jitter estimator on or off.
    ToggleEstimator,
    /// Flip draw routing on or off.
    ToggleRouter,
    /// Flip shader overriding on or off.
    ToggleHook,
    /// Reload the flat-texture redirects.
    ReloadOverrides,
    /// Report the active backend's status.
    Status,
    /// Load a backend from `locator` and register it under `label`.
    RegisterBackend {
        /// Registry label.
        label: String,
        /// Loader locator, e.g. `builtin:journal`.
        locator: String,
    },
    /// Make the backend registered under `label` active.
    SwitchBackend {
        /// Registry label.
        label: String,
    },
    /// Release every registered backend.
    UnregisterAll,
    /// List registered backends.
    ListBackends,
    /// Set the router's entropy threshold.
    SetThreshold(f32),
    /// Raise or clear the overload signal.
    SetOverloaded(bool),
    /// Send a free-form query to the active backend.
    Query(String),
    /// Run one statistics probe.
    Monitor,
    /// Show the command list.
    Help,
    /// Leave the control loop.
    Exit,
}

/// Why a command line could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseCommandError {
    /// The line was blank.
    #[error("empty command")]
    Empty,
    /// The command word is not known.
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),
    /// A required argument is missing.
    #[error("'{command}' needs a {argument} argument")]
    MissingArgument {
        /// The command word.
        command: &'static str,
        /// The missing argument's name.
        argument: &'static str,
    },
    /// An argument could not be interpreted.
    #[error("'{command}' cannot use '{value}'")]
    InvalidArgument {
        /// The command word.
        command: &'static str,
        /// The offending text.
        value: String,
    },
}

/// The command list shown by `help`.
pub const HELP: &str = "\
Commands:
  toggle-estimator                   Enable/disable the jitter estimator
  toggle-router                      Enable/disable draw routing
  toggle-hook                        Enable/disable shader overrides
  reload-overrides                   Reload flat-texture redirects
  status                             Show the active backend status
  register-backend <label> <locator> Load and register a backend
  switch-backend <label>             Activate a registered backend
  unregister-all                     Release every backend
  list-backends                      List registered backends
  set-threshold <value>              Set the entropy threshold
  set-overloaded <on|off>            Raise or clear the overload signal
  query <text>                       Query the active backend
  monitor                            Run one pipeline statistics probe
  help                               Show this list
  exit                               Leave the control loop";

fn parse_flag(command: &'static str, value: &str) -> Result<bool, ParseCommandError> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" | "yes" => Ok(true),
        "off" | "false" | "0" | "no" => Ok(false),
        _ => Err(ParseCommandError::InvalidArgument {
            command,
            value: value.to_string(),
        }),
    }
}

impl ControlCommand {
    /// Parses one command line.
    pub fn parse(line: &str) -> Result<Self, ParseCommandError> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let mut args = rest.split_whitespace();

        let command = match word {
            "" => return Err(ParseCommandError::Empty),
            "toggle-estimator" => Self::ToggleEstimator,
            "toggle-router" => Self::ToggleRouter,
            "toggle-hook" => Self::ToggleHook,
            "reload-overrides" => Self::ReloadOverrides,
            "status" => Self::Status,
            "register-backend" => {
                let label = args.next().ok_or(ParseCommandError::MissingArgument {
                    command: "register-backend",
                    argument: "label",
                })?;
                let locator = args.next().ok_or(ParseCommandError::MissingArgument {
                    command: "register-backend",
                    argument: "locator",
                })?;
                Self::RegisterBackend {
                    label: label.to_string(),
                    locator: locator.to_string(),
                }
            }
            "switch-backend" => {
                let label = args.next().ok_or(ParseCommandError::MissingArgument {
                    command: "switch-backend",
                    argument: "label",
                })?;
                Self::SwitchBackend {
                    label: label.to_string(),
                }
            }
            "unregister-all" => Self::UnregisterAll,
            "list-backends" => Self::ListBackends,
            "set-threshold" => {
                let value = args.next().ok_or(ParseCommandError::MissingArgument {
                    command: "set-threshold",
                    argument: "value",
                })?;
                let threshold = value
                    .parse::<f32>()
                    .map_err(|_| ParseCommandError::InvalidArgument {
                        command: "set-threshold",
                        value: value.to_string(),
                    })?;
                Self::SetThreshold(threshold)
            }
            "set-overloaded" => {
                let value = args.next().ok_or(ParseCommandError::MissingArgument {
                    command: "set-overloaded",
                    argument: "on|off",
                })?;
                Self::SetOverloaded(parse_flag("set-overloaded", value)?)
            }
            "query" => {
                if rest.is_empty() {
                    return Err(ParseCommandError::MissingArgument {
                        command: "query",
                        argument: "text",
                    });
                }
                Self::Query(rest.to_string())
            }
            "monitor" => Self::Monitor,
            "help" | "?" => Self::Help,
            "exit" | "quit" => Self::Exit,
            other => return Err(ParseCommandError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}

impl FromStr for ControlCommand {
    type Err = ParseCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn on_off(state: bool) -> &'static str {
    if state {
        "ON"
    } else {
        "OFF"
    }
}

/// Executes operator commands against a shared context.
pub struct ControlSurface {
    warden: Arc<WardenContext>,
}

impl ControlSurface {
    /// Creates a control surface over `warden`.
    pub fn new(warden: Arc<WardenContext>) -> Self {
        Self { warden }
    }

    /// Runs `command` and returns a one-line (or short multi-line) reply.
    ///
    /// A failed command leaves every subsystem in its previous state.
    pub fn execute(&self, command: &ControlCommand) -> WardenResult<String> {
        let w = &self.warden;
        let reply = match command {
            ControlCommand::ToggleEstimator => {
                let enable = !w.estimator.is_enabled();
                w.estimator.set_enabled(enable);
                format!("Jitter estimator is now {}", on_off(enable))
            }
            ControlCommand::ToggleRouter => {
                let enable = !w.router.is_routing_enabled();
                w.router.enable_routing(enable);
                format!("Draw router is now {}", on_off(enable))
            }
            ControlCommand::ToggleHook => {
                let enable = !w.hook.is_enabled();
                w.hook.set_enabled(enable)?;
                format!("Shader override is now {}", on_off(enable))
            }
            ControlCommand::ReloadOverrides => {
                let count = w.overrides.reload()?;
                format!("Flat texture overrides reloaded ({} names).", count)
            }
            ControlCommand::Status => match w.active.snapshot() {
                Some(backend) => format!("Current backend reports: {}", backend.status_string()),
                None => "No decision backend active.".to_string(),
            },
            ControlCommand::RegisterBackend { label, locator } => {
                w.registry.register_ai(label, locator)?;
                format!("Backend '{}' registered successfully.", label)
            }
            ControlCommand::SwitchBackend { label } => {
                w.registry.activate(label)?;
                format!("Backend '{}' is now active.", label)
            }
            ControlCommand::UnregisterAll => {
                let count = w.registry.len();
                w.registry.clear();
                format!("All backends unloaded ({}).", count)
            }
            ControlCommand::ListBackends => {
                let labels = w.registry.labels();
                if labels.is_empty() {
                    "No backends registered.".to_string()
                } else {
                    let active = w.registry.active_label();
                    let mut lines = vec!["Registered backends:".to_string()];
                    for label in labels {
                        let marker = if active.as_deref() == Some(label.as_str()) {
                            " (active)"
                        } else {
                            ""
                        };
                        lines.push(format!(" - {}{}", label, marker));
                    }
                    lines.join("\n")
                }
            }
            ControlCommand::SetThreshold(threshold) => {
                w.router.set_entropy_threshold(*threshold)?;
                format!("Entropy threshold set to {:.6}", threshold)
            }
            ControlCommand::SetOverloaded(flag) => {
                w.estimator.set_overloaded(*flag);
                format!("Overload signal is now {}", on_off(*flag))
            }
            ControlCommand::Query(input) => match w.active.snapshot() {
                Some(backend) => backend.query(input),
                None => "No decision backend active.".to_string(),
            },
            ControlCommand::Monitor => match w.hook.frame_monitor() {
                Some(stats) => format!("FrameMonitor :: {}", stats),
                None => "Pipeline statistics unavailable.".to_string(),
            },
            ControlCommand::Help => HELP.to_string(),
            ControlCommand::Exit => "Exiting control loop.".to_string(),
        };
        Ok(reply)
    }

    /// Parses and runs one line. Errors are turned into the reply text.
    pub fn execute_line(&self, line: &str) -> String {
        match ControlCommand::parse(line) {
            Ok(command) => match self.execute(&command) {
                Ok(reply) => reply,
                Err(e) => format!("Error: {}", e),
            },
            Err(e) => format!("Error: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_command() {
        let cases = [
            ("toggle-estimator", ControlCommand::ToggleEstimator),
            ("toggle-router", ControlCommand::ToggleRouter),
            ("toggle-hook", ControlCommand::ToggleHook),
            ("reload-overrides", ControlCommand::ReloadOverrides),
            ("status", ControlCommand::Status),
            (
                "register-backend mara builtin:journal",
                ControlCommand::RegisterBackend {
                    label: "mara".into(),
                    locator: "builtin:journal".into(),
                },
            ),
            (
                "switch-backend mara",
                ControlCommand::SwitchBackend {
                    label: "mara".into(),
                },
            ),
            ("unregister-all", ControlCommand::UnregisterAll),
            ("list-backends", ControlCommand::ListBackends),
            ("set-threshold 0.02", ControlCommand::SetThreshold(0.02)),
            ("set-overloaded on", ControlCommand::SetOverloaded(true)),
            ("set-overloaded false", ControlCommand::SetOverloaded(false)),
            ("query who are you", ControlCommand::Query("who are you".into())),
            ("monitor", ControlCommand::Monitor),
            ("help", ControlCommand::Help),
            ("quit", ControlCommand::Exit),
        ];
        for (line, expected) in cases {
            assert_eq!(ControlCommand::parse(line), Ok(expected), "{line}");
        }
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert_eq!(
            "  switch-backend   olivia  ".parse::<ControlCommand>(),
            Ok(ControlCommand::SwitchBackend {
                label: "olivia".into()
            })
        );
    }

    #[test]
    fn parse_errors() {
        assert_eq!(ControlCommand::parse("   "), Err(ParseCommandError::Empty));
        assert!(matches!(
            ControlCommand::parse("ai_use mara"),
            Err(ParseCommandError::Unknown(_))
        ));
        assert!(matches!(
            ControlCommand::parse("register-backend mara"),
            Err(ParseCommandError::MissingArgument {
                argument: "locator",
                ..
            })
        ));
        assert!(matches!(
            ControlCommand::parse("set-threshold high"),
            Err(ParseCommandError::InvalidArgument { .. })
        ));
        assert!(matches!(
            ControlCommand::parse("set-overloaded maybe"),
            Err(ParseCommandError::InvalidArgument { .. })
        ));
        assert!(matches!(
            ControlCommand::parse("query"),
            Err(ParseCommandError::MissingArgument { .. })
        ));
    }
}
