//! Operator command grammar.
//!
//! Commands are single lines typed by the operator. Matching is
//! case-insensitive and ignores surrounding whitespace.
//!
//! | Input        | Command                  |
//! |--------------|--------------------------|
//! | `enrollmode` | switch to [`OperatingMode::Enroll`]    |
//! | `admode`     | switch to [`OperatingMode::ReadCheck`] |
//! | anything else| [`Command::Unknown`], no state change  |

use crate::constants::{COMMAND_ACCESS_MODE, COMMAND_ENROLL_MODE};
use crate::types::OperatingMode;

/// A parsed operator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Switch the gate to the given mode.
    SetMode(OperatingMode),

    /// Unrecognized input, normalized (trimmed and lowercased).
    Unknown(String),
}

impl Command {
    /// Parse one line of operator input.
    ///
    /// # Examples
    ///
    /// ```
    /// use cardgate_core::{Command, OperatingMode};
    ///
    /// assert_eq!(Command::parse("  EnrollMode\n"), Command::SetMode(OperatingMode::Enroll));
    /// assert_eq!(Command::parse("admode"), Command::SetMode(OperatingMode::ReadCheck));
    /// assert_eq!(Command::parse("reboot"), Command::Unknown("reboot".to_string()));
    /// ```
    pub fn parse(line: &str) -> Self {
        let normalized = line.trim().to_lowercase();
        match normalized.as_str() {
            COMMAND_ENROLL_MODE => Self::SetMode(OperatingMode::Enroll),
            COMMAND_ACCESS_MODE => Self::SetMode(OperatingMode::ReadCheck),
            _ => Self::Unknown(normalized),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("enrollmode", Command::SetMode(OperatingMode::Enroll))]
    #[case("ENROLLMODE", Command::SetMode(OperatingMode::Enroll))]
    #[case("  admode  ", Command::SetMode(OperatingMode::ReadCheck))]
    #[case("AdMode\r\n", Command::SetMode(OperatingMode::ReadCheck))]
    #[case("enroll mode", Command::Unknown("enroll mode".to_string()))]
    #[case("", Command::Unknown(String::new()))]
    fn test_command_parse(#[case] input: &str, #[case] expected: Command) {
        assert_eq!(Command::parse(input), expected);
    }
}
