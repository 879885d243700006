//! The planner controller.
//!
//! Owns the store, the date cursor and the focus timer. Per-date keys are
//! derived here and nowhere else; callers only ever see the collections of
//! the currently selected day.

use crate::date::DateCursor;
use crate::model::{self, Habit, ItemId, PlannerError, Priority, Task};
use crate::store::{self, KeyValueStore};
use crate::timer::FocusTimer;
use chrono::NaiveDate;
use log::{debug, info};

/// Result of reading a day's habit list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HabitLoad {
    Found(Vec<Habit>),
    /// Nothing stored for the day yet; the defaults were generated.
    Seeded(Vec<Habit>),
}

impl HabitLoad {
    pub fn into_inner(self) -> Vec<Habit> {
        match self {
            HabitLoad::Found(habits) | HabitLoad::Seeded(habits) => habits,
        }
    }

    pub fn is_seeded(&self) -> bool {
        matches!(self, HabitLoad::Seeded(_))
    }
}

pub fn tasks_key(date: NaiveDate) -> String {
    format!("tasks_{}", date.format(crate::date::ISO_FORMAT))
}

pub fn habits_key(date: NaiveDate) -> String {
    format!("habits_{}", date.format(crate::date::ISO_FORMAT))
}

pub fn notes_key(date: NaiveDate) -> String {
    format!("notes_{}", date.format(crate::date::ISO_FORMAT))
}

pub fn load_tasks<S: KeyValueStore + ?Sized>(store: &S, date: NaiveDate) -> Vec<Task> {
    store::read(store, &tasks_key(date), Vec::new())
}

/// Reads the habits for `date` without writing anything back.
pub fn load_habits<S: KeyValueStore + ?Sized>(store: &S, date: NaiveDate) -> HabitLoad {
    match store::read_existing(store, &habits_key(date)) {
        Some(habits) => HabitLoad::Found(habits),
        None => HabitLoad::Seeded(model::seed_habits()),
    }
}

pub fn load_notes<S: KeyValueStore + ?Sized>(store: &S, date: NaiveDate) -> String {
    store::read(store, &notes_key(date), String::new())
}

/// A day's collections as loaded from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Day {
    pub date: NaiveDate,
    pub tasks: Vec<Task>,
    pub habits: Vec<Habit>,
    pub notes: String,
}

impl Day {
    /// Loads a day. A freshly seeded habit list is persisted so later visits
    /// see the same ids.
    fn open<S: KeyValueStore + ?Sized>(store: &S, date: NaiveDate) -> Self {
        let habits = match load_habits(store, date) {
            HabitLoad::Found(habits) => habits,
            HabitLoad::Seeded(habits) => {
                debug!("event=habits_seeded date={}", date);
                store::write(store, &habits_key(date), &habits);
                habits
            }
        };
        Day {
            date,
            tasks: load_tasks(store, date),
            habits,
            notes: load_notes(store, date),
        }
    }
}

pub struct Planner<S: KeyValueStore> {
    store: S,
    cursor: DateCursor,
    // Set when the date was given for one invocation only.
    pinned: bool,
    day: Day,
    timer: FocusTimer,
}

impl<S: KeyValueStore> Planner<S> {
    /// Opens the planner at the persisted date.
    pub fn open(store: S, default_work: u32, default_break: u32) -> Self {
        let cursor = DateCursor::load(&store);
        Self::build(store, cursor, false, default_work, default_break)
    }

    /// Opens the planner at `date` without moving the persisted cursor.
    pub fn open_at(store: S, date: NaiveDate, default_work: u32, default_break: u32) -> Self {
        Self::build(store, DateCursor::at(date), true, default_work, default_break)
    }

    fn build(
        store: S,
        cursor: DateCursor,
        pinned: bool,
        default_work: u32,
        default_break: u32,
    ) -> Self {
        let day = Day::open(&store, cursor.current());
        let timer = FocusTimer::load(&store, default_work, default_break);
        info!(
            "event=planner_open date={} tasks={} habits={}",
            cursor.iso(),
            day.tasks.len(),
            day.habits.len()
        );
        Planner {
            store,
            cursor,
            pinned,
            day,
            timer,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.cursor.current()
    }

    pub fn cursor(&self) -> &DateCursor {
        &self.cursor
    }

    pub fn day(&self) -> &Day {
        &self.day
    }

    pub fn tasks(&self) -> &[Task] {
        &self.day.tasks
    }

    pub fn sorted_tasks(&self) -> Vec<&Task> {
        model::sorted_tasks(&self.day.tasks)
    }

    pub fn habits(&self) -> &[Habit] {
        &self.day.habits
    }

    pub fn completion_percent(&self) -> u8 {
        model::completion_percent(&self.day.habits)
    }

    pub fn notes(&self) -> &str {
        &self.day.notes
    }

    pub fn timer(&self) -> &FocusTimer {
        &self.timer
    }

    // Date navigation

    pub fn set_date(&mut self, date: NaiveDate) {
        if self.pinned {
            self.cursor = DateCursor::at(date);
        } else {
            self.cursor.set_date(&self.store, date);
        }
        self.reload_day();
    }

    pub fn set_date_str(&mut self, raw: &str) -> Result<(), PlannerError> {
        let date = crate::date::parse_iso(raw)?;
        self.set_date(date);
        Ok(())
    }

    pub fn move_by(&mut self, delta_days: i64) {
        if let Some(next) = self.cursor.offset(delta_days) {
            self.set_date(next);
        }
    }

    pub fn today(&mut self) {
        if self.pinned {
            self.cursor = DateCursor::at(crate::date::local_today());
        } else {
            self.cursor.today(&self.store);
        }
        self.reload_day();
    }

    fn reload_day(&mut self) {
        self.day = Day::open(&self.store, self.cursor.current());
        debug!("event=date_change date={}", self.cursor.iso());
    }

    // Tasks

    pub fn add_task(
        &mut self,
        text: &str,
        priority: Priority,
        when: Option<String>,
        area: &str,
    ) -> Option<ItemId> {
        let id = model::add_task(&mut self.day.tasks, text, priority, when, area)?;
        self.save_tasks();
        info!("event=task_add date={} id={}", self.day.date, id);
        Some(id)
    }

    pub fn toggle_task(&mut self, id: &str) -> Result<bool, PlannerError> {
        let done = model::toggle_task(&mut self.day.tasks, id)?;
        self.save_tasks();
        debug!("event=task_toggle date={} id={} done={}", self.day.date, id, done);
        Ok(done)
    }

    pub fn remove_task(&mut self, id: &str) -> Result<Task, PlannerError> {
        let task = model::remove_task(&mut self.day.tasks, id)?;
        self.save_tasks();
        info!("event=task_remove date={} id={}", self.day.date, id);
        Ok(task)
    }

    pub fn clear_completed(&mut self) -> usize {
        let removed = model::clear_completed(&mut self.day.tasks);
        self.save_tasks();
        info!("event=tasks_clear date={} removed={}", self.day.date, removed);
        removed
    }

    fn save_tasks(&self) {
        store::write(&self.store, &tasks_key(self.day.date), &self.day.tasks);
    }

    // Habits

    pub fn add_habit(&mut self, name: &str) -> Option<ItemId> {
        let id = model::add_habit(&mut self.day.habits, name)?;
        self.save_habits();
        info!("event=habit_add date={} id={}", self.day.date, id);
        Some(id)
    }

    pub fn toggle_habit(&mut self, id: &str) -> Result<bool, PlannerError> {
        let done = model::toggle_habit(&mut self.day.habits, id)?;
        self.save_habits();
        debug!("event=habit_toggle date={} id={} done={}", self.day.date, id, done);
        Ok(done)
    }

    pub fn remove_habit(&mut self, id: &str) -> Result<Habit, PlannerError> {
        let habit = model::remove_habit(&mut self.day.habits, id)?;
        self.save_habits();
        info!("event=habit_remove date={} id={}", self.day.date, id);
        Ok(habit)
    }

    fn save_habits(&self) {
        store::write(&self.store, &habits_key(self.day.date), &self.day.habits);
    }

    // Notes

    pub fn set_notes(&mut self, text: &str) {
        self.day.notes = text.to_string();
        store::write(&self.store, &notes_key(self.day.date), &self.day.notes);
        debug!(
            "event=notes_set date={} chars={}",
            self.day.date,
            self.day.notes.chars().count()
        );
    }

    // Timer

    /// Applies `f` to the timer and writes the result through.
    pub fn with_timer<R>(&mut self, f: impl FnOnce(&mut FocusTimer) -> R) -> R {
        let out = f(&mut self.timer);
        self.timer.save(&self.store);
        out
    }

    /// Applies a fallible edit to a copy of the timer. The copy replaces the
    /// live timer and is written through only when `f` succeeds.
    pub fn try_with_timer<R, E>(
        &mut self,
        f: impl FnOnce(&mut FocusTimer) -> Result<R, E>,
    ) -> Result<R, E> {
        let mut draft = self.timer.clone();
        let out = f(&mut draft)?;
        self.timer = draft;
        self.timer.save(&self.store);
        Ok(out)
    }
}
