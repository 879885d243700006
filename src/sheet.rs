//! Printable day sheet.

use crate::date::DateCursor;
use crate::model::{self, Habit, Task};
use crate::planner::Day;
use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

pub fn render(day: &Day) -> String {
    let mut out = String::new();
    let cursor = DateCursor::at(day.date);
    let _ = writeln!(out, "Daily Planner: {} ({})", cursor.nice(), cursor.iso());
    let _ = writeln!(out, "{}", "=".repeat(48));

    let _ = writeln!(out, "\nTasks");
    if day.tasks.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for task in model::sorted_tasks(&day.tasks) {
        let _ = writeln!(out, "  {}", task_line(task));
    }

    let _ = writeln!(
        out,
        "\nHabits ({}% complete)",
        model::completion_percent(&day.habits)
    );
    if day.habits.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for habit in &day.habits {
        let _ = writeln!(out, "  {}", habit_line(habit));
    }

    let _ = writeln!(out, "\nNotes");
    if day.notes.trim().is_empty() {
        let _ = writeln!(out, "  (empty)");
    } else {
        for line in day.notes.lines() {
            let _ = writeln!(out, "  {}", line);
        }
    }
    out
}

pub fn task_line(task: &Task) -> String {
    let mut line = format!(
        "{} ({}) {}",
        checkbox(task.done),
        task.priority.short(),
        task.text
    );
    if let Some(when) = &task.when {
        let _ = write!(line, " @{}", when);
    }
    if !task.area.is_empty() {
        let _ = write!(line, " [{}]", task.area);
    }
    line
}

pub fn habit_line(habit: &Habit) -> String {
    format!("{} {}", checkbox(habit.done), habit.name)
}

/// Writes the sheet to `<dir>/dayplan-<date>.txt` and returns the path.
pub fn export(day: &Day, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating {:?}", dir))?;
    let path = dir.join(format!("dayplan-{}.txt", DateCursor::at(day.date).iso()));
    fs::write(&path, render(day)).with_context(|| format!("writing {:?}", path))?;
    Ok(path)
}

fn checkbox(done: bool) -> &'static str {
    if done {
        "[x]"
    } else {
        "[ ]"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Habit, Priority, Task};
    use chrono::NaiveDate;

    fn sample_day() -> Day {
        let mut done = Task::new("b".into(), "Ship report", Priority::High, None, "Work");
        done.done = true;
        Day {
            date: NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
            tasks: vec![
                Task::new("a".into(), "Stretch", Priority::Low, Some("07:00".into()), "Health"),
                done,
            ],
            habits: vec![Habit::new("h".into(), "Read")],
            notes: "line one\nline two".into(),
        }
    }

    #[test]
    fn sheet_lists_sorted_tasks_and_notes() {
        let sheet = render(&sample_day());
        assert!(sheet.starts_with("Daily Planner: Thursday, February 29 (2024-02-29)"));
        let high = sheet.find("[x] (H) Ship report [Work]").unwrap();
        let low = sheet.find("[ ] (L) Stretch @07:00 [Health]").unwrap();
        assert!(high < low);
        assert!(sheet.contains("Habits (0% complete)"));
        assert!(sheet.contains("  line two"));
    }

    #[test]
    fn export_writes_dated_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = export(&sample_day(), dir.path()).unwrap();
        assert!(path.ends_with("dayplan-2024-02-29.txt"));
        let contents = fs::read_to_string(path).unwrap();
        assert!(contents.contains("Ship report"));
    }
}
