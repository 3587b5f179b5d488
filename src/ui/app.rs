use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::debug;

use crate::config::DisplayConfig;
use crate::controller::{Controller, PendingDelete};
use crate::error::{Error, Result};
use crate::notify::Notifier;
use crate::storage::Store;
use crate::task::TaskId;
use crate::view::{self, ProgressView, TaskRow};

use super::form::{FormAction, FormState};
use super::view as render;

const EVENT_POLL_MS: u64 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StatusKind {
    Error,
    Info,
}

/// Keeps the latest message for the footer.
///
/// Deletes are confirmed through the modal, so `confirm` always declines.
#[derive(Debug, Default)]
pub struct StatusNotifier {
    message: Option<(String, StatusKind)>,
}

impl StatusNotifier {
    pub(crate) fn message(&self) -> Option<(&str, StatusKind)> {
        self.message
            .as_ref()
            .map(|(text, kind)| (text.as_str(), *kind))
    }

    pub(crate) fn clear(&mut self) {
        self.message = None;
    }
}

impl Notifier for StatusNotifier {
    fn notify_success(&mut self, text: &str) {
        self.message = Some((text.to_string(), StatusKind::Info));
    }

    fn notify_failure(&mut self, text: &str) {
        self.message = Some((text.to_string(), StatusKind::Error));
    }

    fn confirm(&mut self, _prompt: &str) -> bool {
        false
    }
}

pub struct AppState<S> {
    pub(crate) controller: Controller<S, StatusNotifier>,
    pub(crate) display: DisplayConfig,
    pub(crate) selected: Option<usize>,
    pub(crate) form: Option<FormState>,
    pub(crate) delete_confirm: Option<PendingDelete>,
    pub(crate) show_help: bool,
}

impl<S: Store> AppState<S> {
    pub fn new(controller: Controller<S, StatusNotifier>, display: DisplayConfig) -> Self {
        let mut app = Self {
            controller,
            display,
            selected: None,
            form: None,
            delete_confirm: None,
            show_help: false,
        };
        app.clamp_selection();
        app
    }

    pub(crate) fn rows(&self) -> Vec<TaskRow> {
        view::rows(self.controller.tasks(), &self.display)
    }

    pub(crate) fn progress(&self) -> ProgressView {
        ProgressView::of(self.controller.tasks())
    }

    pub(crate) fn selected_id(&self) -> Option<TaskId> {
        self.selected
            .and_then(|pos| self.controller.repo().id_at(pos))
    }

    pub(crate) fn status_line(&self) -> Option<(&str, StatusKind)> {
        self.controller.notifier().message()
    }

    pub(crate) fn footer_hint(&self) -> &'static str {
        if self.delete_confirm.is_some() {
            "y: delete  n/Esc: keep"
        } else if self.form.is_some() {
            "Tab: switch field  Enter: submit  Ctrl-U: clear  Esc: cancel"
        } else {
            "a: add  e: edit  space: done  d: delete  r: reload  ?: help  q: quit"
        }
    }

    /// Returns `true` when the app should exit
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if self.delete_confirm.is_some() {
            self.handle_delete_key(key);
            return false;
        }
        if self.form.is_some() {
            self.handle_form_key(key);
            return false;
        }
        if self.show_help {
            self.show_help = false;
            return false;
        }
        self.handle_list_key(key)
    }

    fn handle_list_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
            KeyCode::Home | KeyCode::Char('g') => {
                self.selected = (!self.controller.tasks().is_empty()).then_some(0);
            }
            KeyCode::End | KeyCode::Char('G') => {
                self.selected = self.controller.tasks().len().checked_sub(1);
            }
            KeyCode::Char('a') => {
                self.controller.cancel_edit();
                self.controller.notifier_mut().clear();
                self.form = Some(FormState::blank());
            }
            KeyCode::Char('e') | KeyCode::Enter => self.open_editor(),
            KeyCode::Char(' ') | KeyCode::Char('c') => self.toggle_selected(),
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(id) = self.selected_id() {
                    self.delete_confirm = self.controller.begin_delete(id);
                }
            }
            KeyCode::Char('r') => {
                self.controller.reload();
                self.clamp_selection();
                self.controller.notifier_mut().notify_success("Reloaded");
            }
            KeyCode::Char('?') => self.show_help = true,
            _ => {}
        }
        false
    }

    fn handle_form_key(&mut self, key: KeyEvent) {
        let Some(form) = self.form.as_mut() else {
            return;
        };
        match form.handle_key(key) {
            FormAction::None => {}
            FormAction::Cancel => {
                self.controller.cancel_edit();
                self.form = None;
            }
            FormAction::Submit => self.submit_form(),
        }
    }

    fn submit_form(&mut self) {
        let Some(form) = self.form.as_mut() else {
            return;
        };
        let (title, due) = match form.build_submit(self.display.timezone) {
            Ok(values) => values,
            Err(message) => {
                form.set_error(message);
                return;
            }
        };

        match self.controller.submit(&title, due) {
            Ok(outcome) => {
                self.form = None;
                self.selected = self.controller.repo().position_of(outcome.id());
                self.clamp_selection();
            }
            // the controller already put the failure on the status line
            Err(err) => {
                if let Some(form) = self.form.as_mut() {
                    form.set_error(err.to_string());
                }
            }
        }
    }

    fn open_editor(&mut self) {
        let Some(id) = self.selected_id() else {
            return;
        };
        match self.controller.begin_edit(id) {
            Ok(draft) => {
                let form = FormState::from_draft(draft, &self.display);
                self.form = Some(form);
                self.controller.notifier_mut().clear();
            }
            Err(err) => self.report(err),
        }
    }

    fn toggle_selected(&mut self) {
        let Some(position) = self.selected else {
            return;
        };
        if let Err(err) = self.controller.toggle_done(position) {
            self.report(err);
        }
    }

    fn handle_delete_key(&mut self, key: KeyEvent) {
        let confirmed = match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => true,
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => false,
            _ => return,
        };
        let Some(pending) = self.delete_confirm.take() else {
            return;
        };
        match self.controller.resolve_delete(pending, confirmed) {
            Ok(_) => self.clamp_selection(),
            Err(err) => debug!(%err, "delete failed"),
        }
    }

    fn report(&mut self, err: Error) {
        debug!(%err, "action failed");
        self.controller.notifier_mut().notify_failure(&err.to_string());
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.controller.tasks().len();
        if len == 0 {
            self.selected = None;
            return;
        }
        let current = self.selected.unwrap_or(0) as isize;
        let next = (current + delta).clamp(0, len as isize - 1);
        self.selected = Some(next as usize);
    }

    fn clamp_selection(&mut self) {
        let len = self.controller.tasks().len();
        self.selected = match (self.selected, len) {
            (_, 0) => None,
            (None, _) => Some(0),
            (Some(pos), len) => Some(pos.min(len - 1)),
        };
    }
}

pub fn run<S: Store>(controller: Controller<S, StatusNotifier>, display: DisplayConfig) -> Result<()> {
    let mut app = AppState::new(controller, display);
    run_terminal(&mut app)
}

fn run_terminal<S: Store>(app: &mut AppState<S>) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_loop<S: Store>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState<S>,
) -> Result<()> {
    let mut dirty = true;
    loop {
        if dirty {
            terminal.draw(|frame| render::render(frame, app))?;
            dirty = false;
        }

        if event::poll(Duration::from_millis(EVENT_POLL_MS))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if app.handle_key(key) {
                        return Ok(());
                    }
                    dirty = true;
                }
                Event::Resize(_, _) => dirty = true,
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::KeyModifiers;

    use super::*;
    use crate::config::TimeZoneChoice;
    use crate::controller::{Mode, MSG_ADDED, MSG_COMPLETED, MSG_DELETED};
    use crate::repository::TaskRepository;
    use crate::storage::{MemoryBackend, SlotStore, TODOS_KEY};
    use crate::task::Due;

    const SEED: &str = r#"[
        {"id":1,"task_title":"Buy milk","due":1700000000000,"is_completed":false},
        {"id":2,"task_title":"Walk dog","due":1700000000000,"is_completed":false}
    ]"#;

    fn app_with(seed: &str) -> (AppState<SlotStore<MemoryBackend>>, MemoryBackend) {
        let backend = MemoryBackend::with_item(TODOS_KEY, seed);
        let repo = TaskRepository::open(SlotStore::new(backend.clone()));
        let controller = Controller::new(repo, StatusNotifier::default());
        let display = DisplayConfig {
            timezone: TimeZoneChoice::Utc,
            ..DisplayConfig::default()
        };
        (AppState::new(controller, display), backend)
    }

    fn press(app: &mut AppState<SlotStore<MemoryBackend>>, code: KeyCode) -> bool {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(app: &mut AppState<SlotStore<MemoryBackend>>, text: &str) {
        for ch in text.chars() {
            press(app, KeyCode::Char(ch));
        }
    }

    #[test]
    fn starts_on_first_row() {
        let (app, _) = app_with(SEED);
        assert_eq!(app.selected, Some(0));
        let (empty, _) = app_with("[]");
        assert_eq!(empty.selected, None);
    }

    #[test]
    fn add_flow_creates_task_and_selects_it() {
        let (mut app, backend) = app_with(SEED);
        press(&mut app, KeyCode::Char('a'));
        assert!(app.form.is_some());
        type_text(&mut app, "Call mom");
        press(&mut app, KeyCode::Enter);

        assert!(app.form.is_none());
        assert_eq!(app.controller.tasks().len(), 3);
        assert_eq!(app.selected, Some(2));
        assert_eq!(app.status_line(), Some((MSG_ADDED, StatusKind::Info)));
        assert!(backend.raw(TODOS_KEY).unwrap().contains("Call mom"));
    }

    #[test]
    fn typing_q_inside_form_does_not_quit() {
        let (mut app, _) = app_with(SEED);
        press(&mut app, KeyCode::Char('a'));
        assert!(!press(&mut app, KeyCode::Char('q')));
        assert_eq!(app.form.as_ref().unwrap().title, "q");
        press(&mut app, KeyCode::Esc);
        assert!(app.form.is_none());
        assert!(press(&mut app, KeyCode::Char('q')));
    }

    #[test]
    fn edit_flow_rewrites_selected_task() {
        let (mut app, _) = app_with(SEED);
        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Char('e'));
        assert_eq!(app.controller.mode(), Mode::Editing(TaskId(2)));
        assert_eq!(app.form.as_ref().unwrap().due, "14/11/2023 22:13");

        app.handle_key(KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL));
        type_text(&mut app, "Walk cat");
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Enter);

        assert!(app.form.is_none());
        assert_eq!(app.controller.mode(), Mode::Creating);
        assert_eq!(app.controller.tasks()[1].title, "Walk cat");
        assert_eq!(app.controller.tasks()[1].id, TaskId(2));
        assert_eq!(app.controller.tasks()[1].due, Due::At(1_700_000_000_000));
    }

    #[test]
    fn cancel_edit_returns_to_creating() {
        let (mut app, _) = app_with(SEED);
        press(&mut app, KeyCode::Char('e'));
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.controller.mode(), Mode::Creating);
        assert_eq!(app.controller.tasks()[0].title, "Buy milk");
    }

    #[test]
    fn space_toggles_and_updates_progress() {
        let (mut app, _) = app_with(SEED);
        press(&mut app, KeyCode::Char(' '));
        assert!(app.controller.tasks()[0].completed);
        assert_eq!(app.progress().label(), "Progress: 50%");
        assert_eq!(app.status_line(), Some((MSG_COMPLETED, StatusKind::Info)));
    }

    #[test]
    fn delete_waits_for_answer() {
        let (mut app, _) = app_with(SEED);
        press(&mut app, KeyCode::Char('d'));
        assert!(app.delete_confirm.is_some());
        press(&mut app, KeyCode::Char('x'));
        assert!(app.delete_confirm.is_some());

        press(&mut app, KeyCode::Char('n'));
        assert!(app.delete_confirm.is_none());
        assert_eq!(app.controller.tasks().len(), 2);

        press(&mut app, KeyCode::Char('G'));
        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('y'));
        assert_eq!(app.controller.tasks().len(), 1);
        assert_eq!(app.selected, Some(0));
        assert_eq!(app.status_line(), Some((MSG_DELETED, StatusKind::Info)));
    }

    #[test]
    fn empty_list_ignores_row_actions() {
        let (mut app, backend) = app_with("[]");
        for code in [KeyCode::Char(' '), KeyCode::Char('d'), KeyCode::Char('e')] {
            press(&mut app, code);
        }
        assert!(app.delete_confirm.is_none());
        assert!(app.form.is_none());
        assert_eq!(backend.raw(TODOS_KEY).as_deref(), Some("[]"));
    }

    #[test]
    fn selection_stays_in_bounds() {
        let (mut app, _) = app_with(SEED);
        press(&mut app, KeyCode::Up);
        assert_eq!(app.selected, Some(0));
        for _ in 0..5 {
            press(&mut app, KeyCode::Down);
        }
        assert_eq!(app.selected, Some(1));
    }

    #[test]
    fn status_notifier_declines_confirmation() {
        let mut notifier = StatusNotifier::default();
        assert!(!notifier.confirm("sure?"));
        notifier.notify_failure("boom");
        assert_eq!(notifier.message(), Some(("boom", StatusKind::Error)));
        notifier.clear();
        assert!(notifier.message().is_none());
    }
}
