//! # Admin Command Interpreter
//!
//! Parses the `/`-prefixed chat commands into a closed command set.
//!
//! This is a constrained, whitelisted surface: every command is an enum
//! variant with typed arguments, parsed and validated up front. There is
//! deliberately no expression evaluator and no way to execute uploaded
//! code - the most general thing an admin can submit is a content pack,
//! which goes through full schema validation before it touches the store.

use thiserror::Error;

/// A parsed admin command.
#[derive(Clone, Debug, PartialEq)]
pub enum AdminCommand {
    /// Spawn `count` instances of a content-defined type at random positions.
    Spawn {
        /// Definition key to instantiate.
        type_name: String,
        /// How many to create.
        count: u32,
    },
    /// Remove every entity except connected players.
    Clear,
    /// Send a text message to every client.
    Broadcast {
        /// Message text.
        text: String,
    },
    /// Set the world-speed multiplier.
    Speed {
        /// New multiplier (1.0 = real time).
        multiplier: f32,
    },
    /// Load a content pack from an inline JSON document.
    Upload {
        /// The raw JSON document.
        document: String,
    },
}

/// Why a command string failed to parse.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The command word is not in the whitelist.
    #[error("unknown command `/{0}`")]
    Unknown(String),
    /// A required argument was missing.
    #[error("`/{command}` needs {what}")]
    MissingArgument {
        /// Command word.
        command: &'static str,
        /// Description of the missing argument.
        what: &'static str,
    },
    /// An argument was present but unusable.
    #[error("`/{command}`: {reason}")]
    BadArgument {
        /// Command word.
        command: &'static str,
        /// What was wrong.
        reason: String,
    },
}

/// Parses chat text as an admin command.
///
/// Returns `None` when the text does not start with `/` - plain chat is not
/// this module's business. `/spawn` without a count spawns one.
pub fn parse(text: &str) -> Option<Result<AdminCommand, CommandError>> {
    let rest = text.strip_prefix('/')?;
    let mut words = rest.split_whitespace();
    let command = words.next().unwrap_or_default();

    let parsed = match command {
        "spawn" => parse_spawn(words),
        "clear" => Ok(AdminCommand::Clear),
        "broadcast" => {
            let text = rest.strip_prefix("broadcast").unwrap_or_default().trim();
            if text.is_empty() {
                Err(CommandError::MissingArgument { command: "broadcast", what: "a message" })
            } else {
                Ok(AdminCommand::Broadcast { text: text.to_owned() })
            }
        }
        "speed" => parse_speed(words),
        "upload" => {
            let document = rest.strip_prefix("upload").unwrap_or_default().trim();
            if document.is_empty() {
                Err(CommandError::MissingArgument { command: "upload", what: "a JSON content pack" })
            } else {
                Ok(AdminCommand::Upload { document: document.to_owned() })
            }
        }
        other => Err(CommandError::Unknown(other.to_owned())),
    };

    Some(parsed)
}

fn parse_spawn<'a>(mut words: impl Iterator<Item = &'a str>) -> Result<AdminCommand, CommandError> {
    let Some(type_name) = words.next() else {
        return Err(CommandError::MissingArgument { command: "spawn", what: "an entity type" });
    };
    let count = match words.next() {
        None => 1,
        Some(raw) => raw.parse::<u32>().map_err(|_| CommandError::BadArgument {
            command: "spawn",
            reason: format!("count must be a positive integer, got `{raw}`"),
        })?,
    };
    Ok(AdminCommand::Spawn { type_name: type_name.to_owned(), count })
}

fn parse_speed<'a>(mut words: impl Iterator<Item = &'a str>) -> Result<AdminCommand, CommandError> {
    let Some(raw) = words.next() else {
        return Err(CommandError::MissingArgument { command: "speed", what: "a multiplier" });
    };
    let multiplier = raw.parse::<f32>().map_err(|_| CommandError::BadArgument {
        command: "speed",
        reason: format!("multiplier must be a number, got `{raw}`"),
    })?;
    if !multiplier.is_finite() || multiplier < 0.0 {
        return Err(CommandError::BadArgument {
            command: "speed",
            reason: format!("multiplier must be finite and non-negative, got {multiplier}"),
        });
    }
    Ok(AdminCommand::Speed { multiplier })
}
