use crate::commands::Session;
use crate::config::{Config, DataLayout};
use crate::model::{self, Priority, Task};
use crate::planner::Planner;
use crate::sheet;
use crate::store::FileStore;
use crate::timer::{TickOutcome, Ticker, TimerMode};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use log::{info, warn};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Terminal;
use std::io::{stdout, Stdout};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

pub fn run(session: Session) -> Result<()> {
    let Session {
        config,
        layout,
        planner,
    } = session;
    let mut terminal = setup_terminal()?;
    let mut app = App::new(planner, config, layout);
    let result = app.event_loop(&mut terminal);
    // Stops the countdown handle before the terminal goes away.
    app.ticker = None;
    teardown_terminal(&mut terminal)?;
    result
}

struct App {
    planner: Planner<FileStore>,
    config: Config,
    layout: DataLayout,
    focus: Panel,
    task_idx: usize,
    habit_idx: usize,
    ticker: Option<Ticker>,
    last_save: Instant,
    status: String,
    mode: Mode,
}

enum Mode {
    Normal,
    AddingTask(TaskForm),
    AddingHabit(FieldValue),
    EditingNotes(FieldValue),
    GoToDate(FieldValue),
    ConfirmDelete(DeleteTarget),
}

#[derive(Clone)]
enum DeleteTarget {
    Task { id: String, label: String },
    Habit { id: String, label: String },
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum Panel {
    Tasks,
    Timer,
    Habits,
    Notes,
}

impl Panel {
    fn next(self) -> Self {
        match self {
            Panel::Tasks => Panel::Timer,
            Panel::Timer => Panel::Habits,
            Panel::Habits => Panel::Notes,
            Panel::Notes => Panel::Tasks,
        }
    }

    fn prev(self) -> Self {
        match self {
            Panel::Tasks => Panel::Notes,
            Panel::Timer => Panel::Tasks,
            Panel::Habits => Panel::Timer,
            Panel::Notes => Panel::Habits,
        }
    }
}

struct TaskForm {
    text: FieldValue,
    priority: Priority,
    when: FieldValue,
    area_idx: usize,
    field: FormField,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum FormField {
    Text,
    Priority,
    Time,
    Area,
}

impl TaskForm {
    fn new() -> Self {
        TaskForm {
            text: FieldValue::new(""),
            priority: Priority::default(),
            when: FieldValue::new(""),
            area_idx: 0,
            field: FormField::Text,
        }
    }

    fn next_field(&mut self) {
        self.field = match self.field {
            FormField::Text => FormField::Priority,
            FormField::Priority => FormField::Time,
            FormField::Time => FormField::Area,
            FormField::Area => FormField::Text,
        };
    }

    fn prev_field(&mut self) {
        self.field = match self.field {
            FormField::Text => FormField::Area,
            FormField::Priority => FormField::Text,
            FormField::Time => FormField::Priority,
            FormField::Area => FormField::Time,
        };
    }

    fn takes_text(&self) -> bool {
        matches!(self.field, FormField::Text | FormField::Time)
    }

    /// Text input for the active field, if it takes any.
    fn active_input(&mut self) -> Option<&mut FieldValue> {
        match self.field {
            FormField::Text => Some(&mut self.text),
            FormField::Time => Some(&mut self.when),
            FormField::Priority | FormField::Area => None,
        }
    }

    fn cycle(&mut self, forward: bool, area_count: usize) {
        match self.field {
            FormField::Priority => {
                self.priority = if forward {
                    self.priority.next()
                } else {
                    self.priority.next().next()
                };
            }
            FormField::Area if area_count > 0 => {
                self.area_idx = if forward {
                    (self.area_idx + 1) % area_count
                } else {
                    (self.area_idx + area_count - 1) % area_count
                };
            }
            _ => {}
        }
    }
}

#[derive(Clone)]
struct FieldValue {
    value: String,
    cursor: usize,
}

impl FieldValue {
    fn new(value: &str) -> Self {
        FieldValue {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    fn move_left(&mut self) {
        self.cursor = prev_boundary(self.cursor, &self.value);
    }

    fn move_right(&mut self) {
        self.cursor = next_boundary(self.cursor, &self.value);
    }

    fn move_up(&mut self) {
        let (line_starts, line_idx, col) = line_state(&self.value, self.cursor);
        if line_idx == 0 {
            return;
        }
        self.cursor = index_at_col(&self.value, line_starts[line_idx - 1], col);
    }

    fn move_down(&mut self) {
        let (line_starts, line_idx, col) = line_state(&self.value, self.cursor);
        if line_idx + 1 >= line_starts.len() {
            return;
        }
        self.cursor = index_at_col(&self.value, line_starts[line_idx + 1], col);
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let prev = prev_boundary(self.cursor, &self.value);
        self.value.drain(prev..self.cursor);
        self.cursor = prev;
    }

    fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert_str(self.cursor, "▌");
        text
    }

    /// Shared single-line editing keys. Returns false for keys it ignores.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Left => self.move_left(),
            KeyCode::Right => self.move_right(),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.value.len(),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Char(c)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                self.insert_char(c)
            }
            _ => return false,
        }
        true
    }
}

impl App {
    fn new(planner: Planner<FileStore>, config: Config, layout: DataLayout) -> Self {
        let status = format!("Loaded planner from {}", layout.store_dir().display());
        let mut app = App {
            planner,
            config,
            layout,
            focus: Panel::Tasks,
            task_idx: 0,
            habit_idx: 0,
            ticker: None,
            last_save: Instant::now(),
            status,
            mode: Mode::Normal,
        };
        // A timer saved while running picks up where it stopped.
        app.sync_ticker(Instant::now());
        app
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|f| self.draw(f))?;
            let timeout = match &self.ticker {
                Some(ticker) => ticker.until_next(Instant::now()).min(POLL_INTERVAL),
                None => POLL_INTERVAL,
            };
            if event::poll(timeout)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press && self.handle_key(key)? {
                        break;
                    }
                }
            }
            self.advance_timer(Instant::now());
        }
        Ok(())
    }

    /// Keeps the interval handle in step with the timer's running flag.
    fn sync_ticker(&mut self, now: Instant) {
        let running = self.planner.timer().running();
        match (running, self.ticker.is_some()) {
            (true, false) => self.ticker = Some(Ticker::start(now)),
            (false, true) => self.ticker = None,
            _ => {}
        }
    }

    fn advance_timer(&mut self, now: Instant) {
        let due = match self.ticker.as_mut() {
            Some(ticker) => ticker.due(now),
            None => return,
        };
        if due == 0 {
            return;
        }
        let outcomes = self
            .planner
            .with_timer(|timer| (0..due).map(|_| timer.tick()).collect::<Vec<_>>());
        for outcome in outcomes {
            if let TickOutcome::PhaseChanged(mode) = outcome {
                info!("event=timer_phase mode={:?}", mode);
                self.status = match mode {
                    TimerMode::Work => "Break over, back to work".into(),
                    TimerMode::Break => "Sprint done, take a break".into(),
                };
            }
        }
        self.sync_ticker(now);
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        let quit = match self.mode {
            Mode::Normal => self.handle_normal_key(key)?,
            Mode::ConfirmDelete(_) => {
                self.handle_confirm_key(key);
                false
            }
            _ => {
                self.handle_input_key(key);
                false
            }
        };
        self.sync_ticker(Instant::now());
        Ok(quit)
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Tab => self.focus = self.focus.next(),
            KeyCode::BackTab => self.focus = self.focus.prev(),
            KeyCode::Char('[') => self.change_day(|p| p.move_by(-1)),
            KeyCode::Char(']') => self.change_day(|p| p.move_by(1)),
            KeyCode::Char('t') => self.change_day(|p| p.today()),
            KeyCode::Char('g') => {
                self.mode = Mode::GoToDate(FieldValue::new(&self.planner.cursor().iso()));
                self.status = "Go to date (YYYY-MM-DD, Enter to jump, Esc cancel)".into();
            }
            KeyCode::Char(' ') => {
                let running = self.planner.with_timer(|t| t.toggle());
                self.touch(if running { "Timer started" } else { "Timer paused" });
            }
            KeyCode::Char('r') => {
                self.planner.with_timer(|t| t.reset());
                self.touch("Timer reset");
            }
            KeyCode::Char('+') | KeyCode::Char('=') => self.adjust_length(TimerMode::Work, 1),
            KeyCode::Char('-') => self.adjust_length(TimerMode::Work, -1),
            KeyCode::Char('>') => self.adjust_length(TimerMode::Break, 1),
            KeyCode::Char('<') => self.adjust_length(TimerMode::Break, -1),
            KeyCode::Char('p') => self.export_sheet(),
            _ => match self.focus {
                Panel::Tasks => self.handle_tasks_key(key),
                Panel::Habits => self.handle_habits_key(key),
                Panel::Notes => self.handle_notes_key(key),
                Panel::Timer => {}
            },
        }
        Ok(false)
    }

    fn handle_tasks_key(&mut self, key: KeyEvent) {
        let len = self.planner.tasks().len();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.task_idx = self.task_idx.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                self.task_idx = (self.task_idx + 1).min(len.saturating_sub(1))
            }
            KeyCode::Char('a') | KeyCode::Char('n') => {
                self.mode = Mode::AddingTask(TaskForm::new());
                self.status =
                    "New task (Tab/Shift-Tab fields, ←→ change choice, Enter save, Esc cancel)"
                        .into();
            }
            KeyCode::Char('x') | KeyCode::Enter => {
                if let Some(id) = self.selected_task_id() {
                    match self.planner.toggle_task(&id) {
                        Ok(done) => self.touch(if done { "Task done" } else { "Task reopened" }),
                        Err(err) => self.status = err.to_string(),
                    }
                }
            }
            KeyCode::Char('d') => {
                let selected = self
                    .selected_task()
                    .map(|task| (task.id.clone(), task.text.clone()));
                if let Some((id, label)) = selected {
                    self.status = format!("Delete \"{}\"? (y to confirm, n/Esc to cancel)", label);
                    self.mode = Mode::ConfirmDelete(DeleteTarget::Task { id, label });
                } else {
                    self.status = "No task selected".into();
                }
            }
            KeyCode::Char('c') => {
                let removed = self.planner.clear_completed();
                self.touch(format!("Cleared {} completed task(s)", removed));
            }
            _ => {}
        }
        self.clamp_selection();
    }

    fn handle_habits_key(&mut self, key: KeyEvent) {
        let len = self.planner.habits().len();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.habit_idx = self.habit_idx.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                self.habit_idx = (self.habit_idx + 1).min(len.saturating_sub(1))
            }
            KeyCode::Char('a') | KeyCode::Char('n') => {
                self.mode = Mode::AddingHabit(FieldValue::new(""));
                self.status = "New habit (Enter save, Esc cancel)".into();
            }
            KeyCode::Char('x') | KeyCode::Enter => {
                if let Some(id) = self.selected_habit_id() {
                    match self.planner.toggle_habit(&id) {
                        Ok(_) => self.touch(format!(
                            "Habits {}% complete",
                            self.planner.completion_percent()
                        )),
                        Err(err) => self.status = err.to_string(),
                    }
                }
            }
            KeyCode::Char('d') => {
                if let Some(habit) = self.planner.habits().get(self.habit_idx) {
                    let target = DeleteTarget::Habit {
                        id: habit.id.clone(),
                        label: habit.name.clone(),
                    };
                    self.status =
                        format!("Delete \"{}\"? (y to confirm, n/Esc to cancel)", habit.name);
                    self.mode = Mode::ConfirmDelete(target);
                } else {
                    self.status = "No habit selected".into();
                }
            }
            _ => {}
        }
        self.clamp_selection();
    }

    fn handle_notes_key(&mut self, key: KeyEvent) {
        if matches!(key.code, KeyCode::Char('e') | KeyCode::Enter) {
            self.mode = Mode::EditingNotes(FieldValue::new(self.planner.notes()));
            self.status = "Editing notes (Ctrl+S or Esc to save)".into();
        }
    }

    fn handle_input_key(&mut self, key: KeyEvent) {
        let mut mode = std::mem::replace(&mut self.mode, Mode::Normal);
        let close = match &mut mode {
            Mode::AddingTask(form) => self.process_task_form(form, key),
            Mode::AddingHabit(field) => self.process_habit_input(field, key),
            Mode::EditingNotes(field) => self.process_notes_input(field, key),
            Mode::GoToDate(field) => self.process_date_input(field, key),
            Mode::Normal | Mode::ConfirmDelete(_) => true,
        };
        self.mode = if close { Mode::Normal } else { mode };
    }

    fn process_task_form(&mut self, form: &mut TaskForm, key: KeyEvent) -> bool {
        let area_count = self.config.categories.len();
        match key.code {
            KeyCode::Esc => {
                self.status = "Canceled".into();
                return true;
            }
            KeyCode::Tab => form.next_field(),
            KeyCode::BackTab => form.prev_field(),
            KeyCode::Enter => return self.submit_task(form),
            KeyCode::Left if !form.takes_text() => form.cycle(false, area_count),
            KeyCode::Right | KeyCode::Char(' ') if !form.takes_text() => {
                form.cycle(true, area_count)
            }
            _ => {
                if let Some(input) = form.active_input() {
                    input.handle_key(key);
                }
            }
        }
        false
    }

    fn submit_task(&mut self, form: &TaskForm) -> bool {
        let when = match model::parse_when(&form.when.value) {
            Ok(when) => when,
            Err(err) => {
                self.status = format!("Could not add: {}", err);
                return false;
            }
        };
        let area = self
            .config
            .categories
            .get(form.area_idx)
            .map(String::as_str)
            .unwrap_or(model::DEFAULT_AREA);
        match self
            .planner
            .add_task(&form.text.value, form.priority, when, area)
        {
            Some(id) => {
                self.task_idx = self
                    .planner
                    .sorted_tasks()
                    .iter()
                    .position(|t| t.id == id)
                    .unwrap_or(0);
                self.touch("Task added");
            }
            None => self.status = "Nothing added: task text is empty".into(),
        }
        true
    }

    fn process_habit_input(&mut self, field: &mut FieldValue, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Esc => {
                self.status = "Canceled".into();
                true
            }
            KeyCode::Enter => {
                match self.planner.add_habit(&field.value) {
                    Some(_) => {
                        self.habit_idx = self.planner.habits().len().saturating_sub(1);
                        self.touch("Habit added");
                    }
                    None => self.status = "Nothing added: habit name is empty".into(),
                }
                true
            }
            _ => {
                field.handle_key(key);
                false
            }
        }
    }

    fn process_notes_input(&mut self, field: &mut FieldValue, key: KeyEvent) -> bool {
        let control = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => {}
            KeyCode::Char('s') if control => {}
            KeyCode::Enter => {
                field.insert_char('\n');
                return false;
            }
            KeyCode::Up => {
                field.move_up();
                return false;
            }
            KeyCode::Down => {
                field.move_down();
                return false;
            }
            _ => {
                field.handle_key(key);
                return false;
            }
        }
        self.planner.set_notes(&field.value);
        self.touch("Notes saved");
        true
    }

    fn process_date_input(&mut self, field: &mut FieldValue, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Esc => {
                self.status = "Canceled".into();
                true
            }
            KeyCode::Enter => {
                let raw = field.value.clone();
                match self.planner.set_date_str(&raw) {
                    Ok(()) => {
                        self.task_idx = 0;
                        self.habit_idx = 0;
                        self.status = format!("Showing {}", self.planner.cursor().nice());
                        true
                    }
                    Err(err) => {
                        self.status = err.to_string();
                        false
                    }
                }
            }
            _ => {
                field.handle_key(key);
                false
            }
        }
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) {
        let target = match &self.mode {
            Mode::ConfirmDelete(target) => target.clone(),
            _ => return,
        };
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                let result = match &target {
                    DeleteTarget::Task { id, label } => {
                        self.planner.remove_task(id).map(|_| label.clone())
                    }
                    DeleteTarget::Habit { id, label } => {
                        self.planner.remove_habit(id).map(|_| label.clone())
                    }
                };
                match result {
                    Ok(label) => self.touch(format!("Deleted \"{}\"", label)),
                    Err(err) => self.status = format!("Delete failed: {}", err),
                }
                self.mode = Mode::Normal;
                self.clamp_selection();
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                self.status = "Delete canceled".into();
                self.mode = Mode::Normal;
            }
            _ => {}
        }
    }

    fn change_day(&mut self, f: impl FnOnce(&mut Planner<FileStore>)) {
        f(&mut self.planner);
        self.task_idx = 0;
        self.habit_idx = 0;
        self.status = format!("Showing {}", self.planner.cursor().nice());
    }

    fn adjust_length(&mut self, mode: TimerMode, delta: i64) {
        let result = self.planner.try_with_timer(|t| {
            let current = match mode {
                TimerMode::Work => t.work_minutes(),
                TimerMode::Break => t.break_minutes(),
            };
            let next = i64::from(current) + delta;
            match mode {
                TimerMode::Work => t.set_work_minutes(next),
                TimerMode::Break => t.set_break_minutes(next),
            }
        });
        match result {
            Ok(()) => {
                let timer = self.planner.timer();
                self.touch(format!(
                    "Work {}m, break {}m",
                    timer.work_minutes(),
                    timer.break_minutes()
                ));
            }
            Err(err) => self.status = err.to_string(),
        }
    }

    fn export_sheet(&mut self) {
        match sheet::export(self.planner.day(), &self.layout.export_dir()) {
            Ok(path) => {
                info!("event=sheet_export path={}", path.display());
                self.status = format!("Day sheet written to {}", path.display());
            }
            Err(err) => {
                warn!("event=sheet_export status=error error={:#}", err);
                self.status = format!("Export failed: {:#}", err);
            }
        }
    }

    fn touch(&mut self, message: impl Into<String>) {
        self.last_save = Instant::now();
        self.status = message.into();
    }

    fn selected_task(&self) -> Option<&Task> {
        self.planner.sorted_tasks().get(self.task_idx).copied()
    }

    fn selected_task_id(&self) -> Option<String> {
        self.selected_task().map(|t| t.id.clone())
    }

    fn selected_habit_id(&self) -> Option<String> {
        self.planner.habits().get(self.habit_idx).map(|h| h.id.clone())
    }

    fn clamp_selection(&mut self) {
        self.task_idx = self
            .task_idx
            .min(self.planner.tasks().len().saturating_sub(1));
        self.habit_idx = self
            .habit_idx
            .min(self.planner.habits().len().saturating_sub(1));
    }

    fn draw(&self, f: &mut ratatui::Frame<'_>) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(4),
            ])
            .split(f.size());

        self.draw_header(f, rows[0]);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(rows[1]);
        self.draw_tasks(f, columns[0]);

        let side = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(6),
                Constraint::Min(5),
                Constraint::Length(8),
            ])
            .split(columns[1]);
        self.draw_timer(f, side[0]);
        self.draw_habits(f, side[1]);
        self.draw_notes(f, side[2]);

        self.draw_footer(f, rows[2]);

        match &self.mode {
            Mode::AddingTask(form) => self.draw_task_form(f, form),
            Mode::AddingHabit(field) => draw_prompt(f, "New Habit", "Name", field),
            Mode::GoToDate(field) => draw_prompt(f, "Go To Date", "Date", field),
            Mode::Normal | Mode::EditingNotes(_) | Mode::ConfirmDelete(_) => {}
        }
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let cursor = self.planner.cursor();
        let title = Line::from(vec![
            Span::styled(
                "dayplan ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(cursor.nice(), Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("  •  "),
            Span::styled(cursor.iso(), Style::default().fg(Color::Green)),
            Span::raw("  •  "),
            Span::styled(
                format!("saved {}", format_elapsed(self.last_save)),
                Style::default().fg(Color::Gray),
            ),
        ]);
        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray));
        let paragraph = Paragraph::new(title)
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_tasks(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let focused = self.focus == Panel::Tasks;
        let tasks = self.planner.sorted_tasks();
        let done = tasks.iter().filter(|t| t.done).count();
        let items = if tasks.is_empty() {
            vec![ListItem::new("No tasks yet, press a to add one").style(dim())]
        } else {
            tasks.iter().map(|t| task_item(t)).collect()
        };
        let mut state = ListState::default();
        if focused && !tasks.is_empty() {
            state.select(Some(self.task_idx.min(tasks.len() - 1)));
        }
        let list = List::new(items)
            .block(panel_block(
                format!("Tasks ({}/{} done)", done, tasks.len()),
                focused,
            ))
            .highlight_style(highlight());
        f.render_stateful_widget(list, area, &mut state);
    }

    fn draw_timer(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let timer = self.planner.timer();
        let block = panel_block("Focus Timer".to_string(), self.focus == Panel::Timer);
        let inner = block.inner(area);
        f.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(1), Constraint::Min(0)])
            .split(inner);

        let accent = match timer.mode() {
            TimerMode::Work => Color::LightRed,
            TimerMode::Break => Color::LightGreen,
        };
        let state = if timer.running() { "running" } else { "paused" };
        let lines = vec![
            Line::from(vec![
                Span::styled(
                    timer.display(),
                    Style::default().fg(accent).add_modifier(Modifier::BOLD),
                ),
                Span::raw("  "),
                Span::styled(timer.mode().label(), Style::default().fg(accent)),
                Span::raw("  "),
                Span::styled(state, dim()),
            ]),
            Line::from(Span::styled(
                format!(
                    "work {}m  break {}m",
                    timer.work_minutes(),
                    timer.break_minutes()
                ),
                dim(),
            )),
        ];
        f.render_widget(Paragraph::new(lines), rows[0]);
        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(accent).bg(Color::Rgb(22, 24, 30)))
            .ratio(timer.progress())
            .label("");
        f.render_widget(gauge, rows[1]);
    }

    fn draw_habits(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let focused = self.focus == Panel::Habits;
        let habits = self.planner.habits();
        let items = if habits.is_empty() {
            vec![ListItem::new("No habits for this day").style(dim())]
        } else {
            habits
                .iter()
                .map(|h| {
                    let style = if h.done {
                        Style::default()
                            .fg(Color::DarkGray)
                            .add_modifier(Modifier::CROSSED_OUT)
                    } else {
                        Style::default().fg(Color::White)
                    };
                    ListItem::new(sheet::habit_line(h)).style(style)
                })
                .collect()
        };
        let mut state = ListState::default();
        if focused && !habits.is_empty() {
            state.select(Some(self.habit_idx.min(habits.len() - 1)));
        }
        let list = List::new(items)
            .block(panel_block(
                format!("Habits ({}% complete)", self.planner.completion_percent()),
                focused,
            ))
            .highlight_style(highlight());
        f.render_stateful_widget(list, area, &mut state);
    }

    fn draw_notes(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let editing = match &self.mode {
            Mode::EditingNotes(field) => Some(field),
            _ => None,
        };
        let focused = self.focus == Panel::Notes || editing.is_some();
        let text = match editing {
            Some(field) => field.with_caret(),
            None => self.planner.notes().to_string(),
        };
        let paragraph = if text.is_empty() {
            Paragraph::new(Span::styled("Brain dump, gratitude, reminders…", dim()))
        } else {
            Paragraph::new(text)
        };
        let title = if editing.is_some() {
            "Notes (editing)".to_string()
        } else {
            "Notes".to_string()
        };
        f.render_widget(
            paragraph
                .wrap(Wrap { trim: false })
                .block(panel_block(title, focused)),
            area,
        );
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(area);

        let help_bar = Paragraph::new(self.footer_help_line())
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(help_bar, rows[0]);

        let status = Paragraph::new(self.status.clone())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(status, rows[1]);
    }

    fn footer_help_line(&self) -> Line<'static> {
        let mut spans = vec![
            key_span("Tab", Color::LightCyan),
            Span::raw(" panel  "),
            key_span("[ ]", Color::LightCyan),
            Span::raw(" day  "),
            key_span("t", Color::LightCyan),
            Span::raw(" today  "),
            key_span("g", Color::LightCyan),
            Span::raw(" go to  "),
            key_span("space", Color::LightGreen),
            Span::raw(" start/pause  "),
            key_span("r", Color::LightGreen),
            Span::raw(" reset  "),
        ];
        match self.focus {
            Panel::Tasks => spans.extend([
                key_span("a", Color::LightMagenta),
                Span::raw(" add  "),
                key_span("x", Color::LightYellow),
                Span::raw(" toggle  "),
                key_span("d", Color::LightRed),
                Span::raw(" delete  "),
                key_span("c", Color::LightRed),
                Span::raw(" clear done  "),
            ]),
            Panel::Habits => spans.extend([
                key_span("a", Color::LightMagenta),
                Span::raw(" add  "),
                key_span("x", Color::LightYellow),
                Span::raw(" toggle  "),
                key_span("d", Color::LightRed),
                Span::raw(" delete  "),
            ]),
            Panel::Timer => spans.extend([
                key_span("+/-", Color::LightYellow),
                Span::raw(" work  "),
                key_span("</>", Color::LightYellow),
                Span::raw(" break  "),
            ]),
            Panel::Notes => spans.extend([
                key_span("e", Color::LightYellow),
                Span::raw(" edit  "),
            ]),
        }
        spans.extend([
            key_span("p", Color::LightBlue),
            Span::raw(" print  "),
            key_span("q", Color::LightRed),
            Span::raw(" quit"),
        ]);
        Line::from(spans)
    }

    fn draw_task_form(&self, f: &mut ratatui::Frame<'_>, form: &TaskForm) {
        let area = centered_rect(60, 40, f.size());
        f.render_widget(Clear, area);
        let area_label = self
            .config
            .categories
            .get(form.area_idx)
            .cloned()
            .unwrap_or_else(|| model::DEFAULT_AREA.to_string());
        let lines = vec![
            field_line("Task", &form.text, form.field == FormField::Text),
            choice_line(
                "Priority",
                form.priority.label(),
                form.field == FormField::Priority,
            ),
            field_line("Time (HH:MM)", &form.when, form.field == FormField::Time),
            choice_line("Category", &area_label, form.field == FormField::Area),
        ];
        let paragraph = Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .title(Span::styled(
                        "New Task",
                        Style::default()
                            .fg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan)),
            );
        f.render_widget(paragraph, area);
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn draw_prompt(f: &mut ratatui::Frame<'_>, title: &str, label: &str, field: &FieldValue) {
    let area = centered_rect(50, 20, f.size());
    f.render_widget(Clear, area);
    let paragraph = Paragraph::new(vec![field_line(label, field, true)]).block(
        Block::default()
            .title(Span::styled(
                title.to_string(),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(paragraph, area);
}

fn panel_block(title: String, focused: bool) -> Block<'static> {
    let color = if focused { Color::Cyan } else { Color::DarkGray };
    Block::default()
        .title(Span::styled(
            title,
            Style::default()
                .fg(if focused { Color::Cyan } else { Color::Gray })
                .add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
}

fn highlight() -> Style {
    Style::default()
        .bg(Color::LightCyan)
        .fg(Color::Black)
        .add_modifier(Modifier::BOLD)
}

fn dim() -> Style {
    Style::default().fg(Color::DarkGray)
}

fn key_span(text: &'static str, color: Color) -> Span<'static> {
    Span::styled(text, Style::default().fg(color))
}

fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::High => Color::LightRed,
        Priority::Medium => Color::LightYellow,
        Priority::Low => Color::LightGreen,
    }
}

fn task_item(task: &Task) -> ListItem<'static> {
    let text_style = if task.done {
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::CROSSED_OUT)
    } else {
        Style::default().fg(Color::White)
    };
    let mut spans = vec![
        Span::raw(if task.done { "[x] " } else { "[ ] " }),
        Span::styled(
            format!("{} ", task.priority.short()),
            Style::default()
                .fg(priority_color(task.priority))
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(task.text.clone(), text_style),
    ];
    if let Some(when) = &task.when {
        spans.push(Span::styled(
            format!("  @{}", when),
            Style::default().fg(Color::LightBlue),
        ));
    }
    if !task.area.is_empty() {
        spans.push(Span::styled(
            format!("  [{}]", task.area),
            Style::default().fg(Color::LightMagenta),
        ));
    }
    ListItem::new(Line::from(spans))
}

fn field_line(label: &str, field: &FieldValue, active: bool) -> Line<'static> {
    let text = if active {
        field.with_caret()
    } else {
        field.value.clone()
    };
    Line::from(vec![
        Span::styled(format!("{}: ", label), label_style()),
        Span::styled(
            text,
            Style::default().fg(if active { Color::Cyan } else { Color::White }),
        ),
    ])
}

fn choice_line(label: &str, value: &str, active: bool) -> Line<'static> {
    let shown = if active {
        format!("◀ {} ▶", value)
    } else {
        value.to_string()
    };
    Line::from(vec![
        Span::styled(format!("{}: ", label), label_style()),
        Span::styled(
            shown,
            Style::default().fg(if active { Color::Cyan } else { Color::White }),
        ),
    ])
}

fn label_style() -> Style {
    Style::default()
        .fg(Color::Gray)
        .add_modifier(Modifier::BOLD | Modifier::DIM)
}

fn prev_boundary(cursor: usize, text: &str) -> usize {
    text[..cursor]
        .char_indices()
        .next_back()
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

fn next_boundary(cursor: usize, text: &str) -> usize {
    text[cursor..]
        .chars()
        .next()
        .map(|ch| cursor + ch.len_utf8())
        .unwrap_or(text.len())
}

fn line_state(text: &str, cursor: usize) -> (Vec<usize>, usize, usize) {
    let mut starts = vec![0];
    for (idx, ch) in text.char_indices() {
        if ch == '\n' {
            starts.push(idx + 1);
        }
    }
    let line_idx = starts
        .iter()
        .rposition(|start| *start <= cursor)
        .unwrap_or(0);
    let col = text[starts[line_idx]..cursor].chars().count();
    (starts, line_idx, col)
}

fn index_at_col(text: &str, start: usize, target_col: usize) -> usize {
    let slice = &text[start..];
    let limit = slice.find('\n').unwrap_or(slice.len());
    slice[..limit]
        .char_indices()
        .nth(target_col)
        .map(|(idx, _)| start + idx)
        .unwrap_or(start + limit)
}

fn format_elapsed(last: Instant) -> String {
    let secs = last.elapsed().as_secs();
    if secs < 60 {
        format!("{}s ago", secs)
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else {
        format!("{}h ago", secs / 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PlannerError;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn app_in(dir: &TempDir, work: u32, brk: u32) -> App {
        let layout = DataLayout::new(dir.path());
        let store = FileStore::open(layout.store_dir()).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let planner = Planner::open_at(store, date, work, brk);
        App::new(planner, Config::default(), layout)
    }

    fn press(app: &mut App, code: KeyCode) {
        let quit = app
            .handle_key(KeyEvent::new(code, KeyModifiers::NONE))
            .unwrap();
        assert!(!quit);
    }

    #[test]
    fn ticker_follows_start_and_pause() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(&dir, 25, 5);
        assert!(app.ticker.is_none());
        press(&mut app, KeyCode::Char(' '));
        assert!(app.planner.timer().running());
        assert!(app.ticker.is_some());
        press(&mut app, KeyCode::Char(' '));
        assert!(!app.planner.timer().running());
        assert!(app.ticker.is_none());

        // Paused: nothing counts even if time passes.
        app.advance_timer(Instant::now() + Duration::from_secs(5));
        assert_eq!(app.planner.timer().seconds(), 25 * 60);
    }

    #[test]
    fn phase_change_keeps_the_same_handle() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(&dir, 1, 2);
        let start = Instant::now();
        app.planner.with_timer(|t| t.start());
        app.sync_ticker(start);

        app.advance_timer(start + Duration::from_millis(61_500));
        assert_eq!(app.planner.timer().mode(), TimerMode::Break);
        assert_eq!(app.planner.timer().seconds(), 120);
        assert_eq!(app.status, "Sprint done, take a break");
        let ticker = app.ticker.as_ref().expect("ticker kept across phases");
        assert_eq!(
            ticker.until_next(start + Duration::from_millis(61_500)),
            Duration::from_millis(500)
        );

        // A second sync while running must not restart the interval.
        app.sync_ticker(start + Duration::from_millis(61_900));
        app.advance_timer(start + Duration::from_millis(62_000));
        assert_eq!(app.planner.timer().seconds(), 119);
    }

    #[test]
    fn reset_drops_the_handle() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(&dir, 25, 5);
        press(&mut app, KeyCode::Char(' '));
        app.advance_timer(Instant::now() + Duration::from_secs(3));
        assert!(app.planner.timer().seconds() < 25 * 60);
        press(&mut app, KeyCode::Char('r'));
        assert!(app.ticker.is_none());
        assert_eq!(app.planner.timer().seconds(), 25 * 60);
    }

    #[test]
    fn running_timer_from_store_resumes_ticking() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut app = app_in(&dir, 25, 5);
            press(&mut app, KeyCode::Char(' '));
        }
        let app = app_in(&dir, 25, 5);
        assert!(app.planner.timer().running());
        assert!(app.ticker.is_some());
    }

    #[test]
    fn length_keys_stop_at_one_minute() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(&dir, 1, 1);
        press(&mut app, KeyCode::Char('-'));
        assert_eq!(app.planner.timer().work_minutes(), 1);
        assert_eq!(app.status, PlannerError::InvalidLength(0).to_string());
        press(&mut app, KeyCode::Char('>'));
        assert_eq!(app.planner.timer().break_minutes(), 2);
    }

    #[test]
    fn field_editing_handles_multibyte_chars() {
        let mut field = FieldValue::new("héllo");
        field.move_left();
        field.move_left();
        field.move_left();
        field.move_left();
        field.backspace();
        assert_eq!(field.value, "éllo");
        field.insert_char('ö');
        assert_eq!(field.value, "öéllo");
        field.move_right();
        assert_eq!(&field.value[field.cursor..], "llo");
    }

    #[test]
    fn vertical_moves_keep_column() {
        let mut field = FieldValue::new("abcd\nxy\nlonger");
        field.move_up();
        assert_eq!(field.cursor, "abcd\n".len() + 2);
        field.move_up();
        assert_eq!(field.cursor, 2);
        field.move_down();
        field.move_down();
        assert_eq!(field.cursor, "abcd\nxy\n".len() + 2);
    }

    #[test]
    fn form_cycles_choices_both_ways() {
        let mut form = TaskForm::new();
        form.next_field();
        form.cycle(true, 5);
        assert_eq!(form.priority, Priority::Low);
        form.cycle(false, 5);
        assert_eq!(form.priority, Priority::Medium);
        form.next_field();
        form.next_field();
        form.cycle(false, 5);
        assert_eq!(form.area_idx, 4);
        assert!(!form.takes_text());
        assert!(form.active_input().is_none());
    }

    #[test]
    fn panels_cycle() {
        let mut panel = Panel::Tasks;
        for _ in 0..4 {
            panel = panel.next();
        }
        assert!(panel == Panel::Tasks);
        assert!(Panel::Tasks.prev() == Panel::Notes);
    }
}
