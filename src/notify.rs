//! User feedback: notifications and confirmations.
//!
//! Feedback never gates repository state. An implementation that affirms
//! every confirmation and drops every message still drives the full logic.

use std::io::{self, BufRead, Write};

pub trait Notifier {
    fn notify_success(&mut self, text: &str);
    fn notify_failure(&mut self, text: &str);
    /// Ask a yes/no question; `true` means go ahead
    fn confirm(&mut self, prompt: &str) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub text: String,
}

/// Records messages and answers confirmations with a fixed reply
#[derive(Debug, Clone)]
pub struct SilentNotifier {
    answer: bool,
    pub messages: Vec<Notification>,
    pub prompts: Vec<String>,
}

impl SilentNotifier {
    pub fn auto_affirm() -> Self {
        Self {
            answer: true,
            messages: Vec::new(),
            prompts: Vec::new(),
        }
    }

    pub fn declining() -> Self {
        Self {
            answer: false,
            ..Self::auto_affirm()
        }
    }

    pub fn last(&self) -> Option<&Notification> {
        self.messages.last()
    }
}

impl Notifier for SilentNotifier {
    fn notify_success(&mut self, text: &str) {
        self.messages.push(Notification {
            kind: NotificationKind::Success,
            text: text.to_string(),
        });
    }

    fn notify_failure(&mut self, text: &str) {
        self.messages.push(Notification {
            kind: NotificationKind::Failure,
            text: text.to_string(),
        });
    }

    fn confirm(&mut self, prompt: &str) -> bool {
        self.prompts.push(prompt.to_string());
        self.answer
    }
}

/// Terminal feedback for the CLI: messages on stderr, prompts on stdin
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier {
    /// Suppress success messages
    pub quiet: bool,
    /// Answer every confirmation with yes
    pub assume_yes: bool,
}

impl ConsoleNotifier {
    pub fn new(quiet: bool, assume_yes: bool) -> Self {
        Self { quiet, assume_yes }
    }

    /// Read one answer line; anything but y/yes declines, as does EOF
    pub fn read_answer(reader: &mut impl BufRead) -> bool {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => false,
            Ok(_) => matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        }
    }
}

impl Notifier for ConsoleNotifier {
    fn notify_success(&mut self, text: &str) {
        if !self.quiet {
            eprintln!("{text}");
        }
    }

    fn notify_failure(&mut self, text: &str) {
        eprintln!("error: {text}");
    }

    fn confirm(&mut self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        let mut stderr = io::stderr();
        let _ = write!(stderr, "{prompt} [y/N] ");
        let _ = stderr.flush();
        Self::read_answer(&mut io::stdin().lock())
    }
}
