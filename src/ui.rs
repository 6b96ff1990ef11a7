use crate::credentials::MfaPrompt;
use anyhow::Result;
use rustyline::{error::ReadlineError, Editor};
use std::cell::RefCell;
use tracing::{debug, warn};

pub(crate) trait Ui {
    fn println(&self, str: &str);

    fn warn(&self, str: &str);

    fn debug(&self, str: &str);
}


/// Encapsulates interaction with the human at the keyboard. We use readline
/// for the MFA prompt so the usual line-editing keys work.
///
/// This type uses interior mutability because the credential backend holds
/// the prompt behind a shared reference across its await points.
pub(crate) struct ConsoleUi {
    editor: RefCell<Editor<()>>,
}

impl ConsoleUi {
    pub(crate) fn new() -> Result<ConsoleUi> {
        Ok(ConsoleUi {
            editor: RefCell::new(Editor::new()?),
        })
    }
}

impl Ui for ConsoleUi {
    fn println(&self, str: &str) {
        println!("{}", str);
    }

    fn warn(&self, str: &str) {
        warn!("{}", str);
    }

    fn debug(&self, str: &str) {
        debug!("{}", str);
    }
}

impl MfaPrompt for ConsoleUi {
    fn mfa_code(&self, serial: &str) -> Result<Option<String>> {
        let mut editor = self.editor.borrow_mut();
        // Codes are one-time secrets; they stay out of readline history.
        match editor.readline(&format!("Enter your MFA code ({}): ", serial)) {
            Ok(line) => Ok(Some(line.trim().to_string())),
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
            Err(e) => Err(e)?,
        }
    }
}
