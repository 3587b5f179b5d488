use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::config::{DisplayConfig, TimeZoneChoice};
use crate::controller::{can_submit, Draft};
use crate::input::parse_due;
use crate::task::Due;
use crate::view::format_due_with;

/// Pattern used to prefill the due field; `parse_due` reads it back
pub const DUE_INPUT_FORMAT: &str = "%d/%m/%Y %H:%M";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    Due,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormAction {
    None,
    Cancel,
    Submit,
}

#[derive(Debug, Clone)]
pub struct FormState {
    pub(crate) title: String,
    pub(crate) due: String,
    pub(crate) active: FormField,
    pub(crate) error: Option<String>,
    /// Due of the task being edited and the text it was prefilled as
    original_due: Option<Due>,
    prefilled_due: String,
}

impl FormState {
    pub fn blank() -> Self {
        Self {
            title: String::new(),
            due: String::new(),
            active: FormField::Title,
            error: None,
            original_due: None,
            prefilled_due: String::new(),
        }
    }

    /// Prefill from a draft. An unreadable due date leaves the field empty.
    pub fn from_draft(draft: &Draft, display: &DisplayConfig) -> Self {
        let due = draft
            .due
            .as_ref()
            .and_then(|due| format_due_with(due, DUE_INPUT_FORMAT, display.timezone))
            .unwrap_or_default();
        Self {
            title: draft.title.clone(),
            prefilled_due: due.clone(),
            due,
            original_due: draft.due.clone(),
            ..Self::blank()
        }
    }

    pub fn set_error(&mut self, message: String) {
        self.error = Some(message);
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FormAction {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('u') {
            self.active_value_mut().clear();
            self.error = None;
            return FormAction::None;
        }

        match key.code {
            KeyCode::Esc => return FormAction::Cancel,
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Down | KeyCode::Up => self.switch_field(),
            KeyCode::Enter => {
                if self.active == FormField::Due || self.due.is_empty() {
                    return self.attempt_submit();
                }
                self.switch_field();
            }
            KeyCode::Backspace => {
                self.active_value_mut().pop();
            }
            KeyCode::Char(ch) => {
                if key.modifiers.contains(KeyModifiers::CONTROL) {
                    return FormAction::None;
                }
                if !ch.is_control() {
                    self.active_value_mut().push(ch);
                }
            }
            _ => {}
        }

        self.error = None;
        FormAction::None
    }

    /// Title and due ready for the controller. An untouched prefill keeps the
    /// original due as stored; otherwise an empty due field means now.
    pub fn build_submit(&self, zone: TimeZoneChoice) -> Result<(String, Option<Due>), String> {
        self.validate()?;
        let untouched = self.due.trim() == self.prefilled_due.trim();
        let due = if untouched && self.original_due.is_some() {
            self.original_due.clone()
        } else if self.due.trim().is_empty() {
            None
        } else {
            Some(parse_due(&self.due, zone).map_err(|err| err.to_string())?)
        };
        Ok((self.title.trim().to_string(), due))
    }

    fn attempt_submit(&mut self) -> FormAction {
        match self.validate() {
            Ok(()) => FormAction::Submit,
            Err(message) => {
                self.error = Some(message);
                FormAction::None
            }
        }
    }

    fn validate(&self) -> Result<(), String> {
        if !can_submit(&self.title) {
            return Err("Title is required".to_string());
        }
        Ok(())
    }

    fn switch_field(&mut self) {
        self.active = match self.active {
            FormField::Title => FormField::Due,
            FormField::Due => FormField::Title,
        };
    }

    fn active_value_mut(&mut self) -> &mut String {
        match self.active {
            FormField::Title => &mut self.title,
            FormField::Due => &mut self.due,
        }
    }
}
