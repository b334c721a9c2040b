//! Confirmation shown when leaving the editor with unsaved changes

use serde::{Deserialize, Serialize};

/// The three answers the exit dialog offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ExitOption {
    SaveAndExit,
    Exit,
    Cancel,
}

impl std::str::FromStr for ExitOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "saveAndExit" | "save-and-exit" => Ok(ExitOption::SaveAndExit),
            "exit" => Ok(ExitOption::Exit),
            "cancel" => Ok(ExitOption::Cancel),
            other => Err(format!("unknown exit option '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExitDialogState {
    pub open: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exit_option() {
        assert_eq!("saveAndExit".parse(), Ok(ExitOption::SaveAndExit));
        assert_eq!("exit".parse(), Ok(ExitOption::Exit));
        assert_eq!("cancel".parse(), Ok(ExitOption::Cancel));
        assert!("later".parse::<ExitOption>().is_err());
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::to_string(&ExitOption::SaveAndExit).unwrap(),
            "\"saveAndExit\""
        );
    }
}
