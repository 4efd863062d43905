use tracing::warn;

use crate::domain::{Command, DeadLetterQueue, Error};

/// Reports rejected commands through the log on stderr.
#[derive(Default, Debug)]
pub struct StdErrDLQ {}

impl DeadLetterQueue for StdErrDLQ {
    fn report(&mut self, command: Option<&Command>, error: &Error) {
        match command {
            Some(cmd) => warn!(command = %cmd, kind = ?error.kind(), %error, "command rejected"),
            None => warn!(%error, "unreadable command rejected"),
        }
    }
}

/// Keeps rejected commands in memory for inspection.
#[derive(Default, Debug)]
pub struct CollectingDLQ {
    errors: Vec<(Option<Command>, String)>,
}

impl CollectingDLQ {
    pub fn errors(&self) -> &[(Option<Command>, String)] {
        &self.errors
    }
}

impl DeadLetterQueue for CollectingDLQ {
    fn report(&mut self, command: Option<&Command>, error: &Error) {
        self.errors.push((command.cloned(), error.to_string()));
    }
}
