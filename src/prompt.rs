// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Interactive confirmation.

use inquire::{error::InquireError, Confirm as ConfirmPrompt};
use tracing::debug;

/// Ask the user a yes/no question.
pub trait Confirm {
    /// Return true only for an affirmative answer.
    fn confirm(&self, question: &str) -> Result<bool>;
}

/// Confirmation on the terminal through inquire.
///
/// Defaults to "no". Pressing Esc or Ctrl-C at the prompt also counts as
/// "no".
#[derive(Debug, Default, Clone, Copy)]
pub struct Terminal;

impl Confirm for Terminal {
    fn confirm(&self, question: &str) -> Result<bool> {
        match ConfirmPrompt::new(question).with_default(false).prompt() {
            Ok(answer) => Ok(answer),
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => {
                debug!("confirmation cancelled");
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error(transparent)]
    Inquire(#[from] InquireError),
}

type Result<T, E = PromptError> = std::result::Result<T, E>;
