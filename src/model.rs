use chrono::NaiveTime;
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::fmt;

pub type ItemId = String;

pub const DEFAULT_HABITS: [&str; 3] = ["Hydrate (8 glasses)", "10k steps / cardio", "Study DSA 30m"];
pub const DEFAULT_AREA: &str = "General";

const ID_LEN: usize = 8;
const TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    #[serde(rename = "H")]
    High,
    #[serde(rename = "M")]
    #[default]
    Medium,
    #[serde(rename = "L")]
    Low,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: ItemId,
    pub text: String,
    pub priority: Priority,
    /// Time of day as `HH:MM`. Stored as an empty string when absent.
    #[serde(
        default,
        serialize_with = "serialize_when",
        deserialize_with = "deserialize_when"
    )]
    pub when: Option<String>,
    #[serde(default)]
    pub area: String,
    #[serde(default)]
    pub done: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Habit {
    pub id: ItemId,
    pub name: String,
    #[serde(default)]
    pub done: bool,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum PlannerError {
    #[error("task not found: {0}")]
    TaskNotFound(String),
    #[error("habit not found: {0}")]
    HabitNotFound(String),
    #[error("invalid time of day (use HH:MM): {0}")]
    InvalidTime(String),
    #[error("invalid date (use YYYY-MM-DD): {0}")]
    InvalidDate(String),
    #[error("timer length must be a positive number of minutes, got {0}")]
    InvalidLength(i64),
    #[error("unknown priority (use h, m or l): {0}")]
    InvalidPriority(String),
}

impl Priority {
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }

    pub fn short(self) -> &'static str {
        match self {
            Priority::High => "H",
            Priority::Medium => "M",
            Priority::Low => "L",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Priority::High => Priority::Medium,
            Priority::Medium => Priority::Low,
            Priority::Low => Priority::High,
        }
    }

    pub fn parse(raw: &str) -> Result<Self, PlannerError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "h" | "high" => Ok(Priority::High),
            "m" | "medium" | "med" => Ok(Priority::Medium),
            "l" | "low" => Ok(Priority::Low),
            _ => Err(PlannerError::InvalidPriority(raw.trim().to_string())),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Task {
    pub fn new(id: ItemId, text: &str, priority: Priority, when: Option<String>, area: &str) -> Self {
        Task {
            id,
            text: text.trim().to_string(),
            priority,
            when,
            area: area.trim().to_string(),
            done: false,
        }
    }
}

impl Habit {
    pub fn new(id: ItemId, name: &str) -> Self {
        Habit {
            id,
            name: name.trim().to_string(),
            done: false,
        }
    }
}

/// Priority rank first, then time of day with untimed tasks after timed ones.
pub fn display_order(a: &Task, b: &Task) -> Ordering {
    a.priority
        .rank()
        .cmp(&b.priority.rank())
        .then_with(|| match (&a.when, &b.when) {
            (Some(x), Some(y)) => x.cmp(y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}

/// Display view of a stored list. Storage order is left untouched.
pub fn sorted_tasks(tasks: &[Task]) -> Vec<&Task> {
    let mut view: Vec<&Task> = tasks.iter().collect();
    view.sort_by(|a, b| display_order(a, b));
    view
}

/// Prepends a task unless `text` is blank. Returns the new id.
pub fn add_task(
    tasks: &mut Vec<Task>,
    text: &str,
    priority: Priority,
    when: Option<String>,
    area: &str,
) -> Option<ItemId> {
    if text.trim().is_empty() {
        return None;
    }
    let id = generate_id(|candidate| tasks.iter().any(|t| t.id == candidate));
    tasks.insert(0, Task::new(id.clone(), text, priority, when, area));
    Some(id)
}

pub fn toggle_task(tasks: &mut [Task], id: &str) -> Result<bool, PlannerError> {
    let task = tasks
        .iter_mut()
        .find(|t| t.id == id)
        .ok_or_else(|| PlannerError::TaskNotFound(id.to_string()))?;
    task.done = !task.done;
    Ok(task.done)
}

pub fn remove_task(tasks: &mut Vec<Task>, id: &str) -> Result<Task, PlannerError> {
    let idx = tasks
        .iter()
        .position(|t| t.id == id)
        .ok_or_else(|| PlannerError::TaskNotFound(id.to_string()))?;
    Ok(tasks.remove(idx))
}

/// Drops every finished task; returns how many were removed.
pub fn clear_completed(tasks: &mut Vec<Task>) -> usize {
    let before = tasks.len();
    tasks.retain(|t| !t.done);
    before - tasks.len()
}

/// Appends a habit unless `name` is blank. Returns the new id.
pub fn add_habit(habits: &mut Vec<Habit>, name: &str) -> Option<ItemId> {
    if name.trim().is_empty() {
        return None;
    }
    let id = generate_id(|candidate| habits.iter().any(|h| h.id == candidate));
    habits.push(Habit::new(id.clone(), name));
    Some(id)
}

pub fn toggle_habit(habits: &mut [Habit], id: &str) -> Result<bool, PlannerError> {
    let habit = habits
        .iter_mut()
        .find(|h| h.id == id)
        .ok_or_else(|| PlannerError::HabitNotFound(id.to_string()))?;
    habit.done = !habit.done;
    Ok(habit.done)
}

pub fn remove_habit(habits: &mut Vec<Habit>, id: &str) -> Result<Habit, PlannerError> {
    let idx = habits
        .iter()
        .position(|h| h.id == id)
        .ok_or_else(|| PlannerError::HabitNotFound(id.to_string()))?;
    Ok(habits.remove(idx))
}

pub fn completion_percent(habits: &[Habit]) -> u8 {
    if habits.is_empty() {
        return 0;
    }
    let done = habits.iter().filter(|h| h.done).count();
    ((done as f64 / habits.len() as f64) * 100.0).round() as u8
}

pub fn seed_habits() -> Vec<Habit> {
    let mut habits = Vec::with_capacity(DEFAULT_HABITS.len());
    for name in DEFAULT_HABITS {
        add_habit(&mut habits, name);
    }
    habits
}

/// Normalizes user input to `HH:MM`. Blank input means "no time".
pub fn parse_when(raw: &str) -> Result<Option<String>, PlannerError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let time = NaiveTime::parse_from_str(trimmed, TIME_FORMAT)
        .map_err(|_| PlannerError::InvalidTime(trimmed.to_string()))?;
    Ok(Some(time.format(TIME_FORMAT).to_string()))
}

pub fn generate_id<F>(taken: F) -> ItemId
where
    F: Fn(&str) -> bool,
{
    loop {
        let candidate: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(ID_LEN)
            .map(char::from)
            .collect();
        if !taken(&candidate) {
            return candidate;
        }
    }
}

fn serialize_when<S>(when: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(when.as_deref().unwrap_or(""))
}

fn deserialize_when<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(priority: Priority, when: Option<&str>, text: &str) -> Task {
        Task::new(
            text.to_string(),
            text,
            priority,
            when.map(str::to_string),
            DEFAULT_AREA,
        )
    }

    #[test]
    fn display_order_ranks_priority_then_time() {
        let tasks = vec![
            task(Priority::Medium, Some("09:00"), "m"),
            task(Priority::High, Some("10:00"), "h-timed"),
            task(Priority::High, None, "h-untimed"),
        ];
        let order: Vec<&str> = sorted_tasks(&tasks).iter().map(|t| t.text.as_str()).collect();
        assert_eq!(order, vec!["h-timed", "h-untimed", "m"]);
        assert_eq!(tasks[0].text, "m");
    }

    #[test]
    fn display_order_is_stable_for_ties() {
        let tasks = vec![
            task(Priority::Low, None, "first"),
            task(Priority::Low, None, "second"),
            task(Priority::Low, Some("07:30"), "timed"),
        ];
        let order: Vec<&str> = sorted_tasks(&tasks).iter().map(|t| t.text.as_str()).collect();
        assert_eq!(order, vec!["timed", "first", "second"]);
    }

    #[test]
    fn blank_text_is_ignored() {
        let mut tasks = Vec::new();
        assert!(add_task(&mut tasks, "   ", Priority::High, None, DEFAULT_AREA).is_none());
        assert!(tasks.is_empty());
        let mut habits = Vec::new();
        assert!(add_habit(&mut habits, "\t").is_none());
        assert!(habits.is_empty());
    }

    #[test]
    fn tasks_are_prepended_and_trimmed() {
        let mut tasks = Vec::new();
        add_task(&mut tasks, "older", Priority::Low, None, "Work").unwrap();
        let id = add_task(&mut tasks, "  newer  ", Priority::Low, None, "Work").unwrap();
        assert_eq!(tasks[0].id, id);
        assert_eq!(tasks[0].text, "newer");
        assert!(!tasks[0].done);
    }

    #[test]
    fn habits_are_appended() {
        let mut habits = seed_habits();
        let id = add_habit(&mut habits, "Read 20 pages").unwrap();
        assert_eq!(habits.last().map(|h| h.id.as_str()), Some(id.as_str()));
    }

    #[test]
    fn double_toggle_restores_state() {
        let mut tasks = Vec::new();
        let id = add_task(&mut tasks, "write", Priority::Medium, None, DEFAULT_AREA).unwrap();
        assert!(toggle_task(&mut tasks, &id).unwrap());
        assert!(!toggle_task(&mut tasks, &id).unwrap());

        let mut habits = seed_habits();
        let hid = habits[1].id.clone();
        toggle_habit(&mut habits, &hid).unwrap();
        toggle_habit(&mut habits, &hid).unwrap();
        assert!(!habits[1].done);
    }

    #[test]
    fn unknown_ids_are_reported() {
        let mut tasks = Vec::new();
        assert_eq!(
            toggle_task(&mut tasks, "nope"),
            Err(PlannerError::TaskNotFound("nope".into()))
        );
        let mut habits = Vec::new();
        assert!(matches!(
            remove_habit(&mut habits, "nope"),
            Err(PlannerError::HabitNotFound(_))
        ));
    }

    #[test]
    fn clear_completed_is_idempotent() {
        let mut tasks = Vec::new();
        let a = add_task(&mut tasks, "a", Priority::High, None, DEFAULT_AREA).unwrap();
        add_task(&mut tasks, "b", Priority::High, None, DEFAULT_AREA).unwrap();
        toggle_task(&mut tasks, &a).unwrap();
        assert_eq!(clear_completed(&mut tasks), 1);
        let after_first = tasks.clone();
        assert_eq!(clear_completed(&mut tasks), 0);
        assert_eq!(tasks, after_first);
    }

    #[test]
    fn completion_percent_rounds() {
        assert_eq!(completion_percent(&[]), 0);
        let mut habits = seed_habits();
        let id = habits[0].id.clone();
        toggle_habit(&mut habits, &id).unwrap();
        assert_eq!(completion_percent(&habits), 33);
        let id = habits[1].id.clone();
        toggle_habit(&mut habits, &id).unwrap();
        assert_eq!(completion_percent(&habits), 67);
    }

    #[test]
    fn seeded_habits_have_unique_ids() {
        let habits = seed_habits();
        let names: Vec<&str> = habits.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, DEFAULT_HABITS.to_vec());
        assert_ne!(habits[0].id, habits[1].id);
        assert_ne!(habits[1].id, habits[2].id);
        assert_ne!(habits[0].id, habits[2].id);
    }

    #[test]
    fn parse_when_normalizes() {
        assert_eq!(parse_when("9:05").unwrap(), Some("09:05".to_string()));
        assert_eq!(parse_when("  ").unwrap(), None);
        assert!(matches!(parse_when("25:00"), Err(PlannerError::InvalidTime(_))));
    }

    #[test]
    fn task_json_uses_short_priority_and_empty_time() {
        let t = task(Priority::High, None, "x");
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["priority"], "H");
        assert_eq!(json["when"], "");

        let back: Task = serde_json::from_str(
            r#"{"id":"a1","text":"call","priority":"L","when":"","area":"Personal","done":true}"#,
        )
        .unwrap();
        assert_eq!(back.when, None);
        assert_eq!(back.priority, Priority::Low);
        assert!(back.done);
    }

    #[test]
    fn priority_parse_accepts_short_and_long() {
        assert_eq!(Priority::parse("H").unwrap(), Priority::High);
        assert_eq!(Priority::parse("medium").unwrap(), Priority::Medium);
        assert!(Priority::parse("urgent").is_err());
    }
}
