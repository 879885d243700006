use crate::cli::{AddTaskArgs, Command, DateAction, HabitAction, NotesAction, TaskAction, TimerAction};
use crate::config::{Config, DataLayout};
use crate::date;
use crate::model::{self, Priority, DEFAULT_AREA};
use crate::planner::Planner;
use crate::sheet;
use crate::store::FileStore;
use crate::ui;
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// Everything a command needs: resolved config, data layout and the planner.
pub struct Session {
    pub config: Config,
    pub layout: DataLayout,
    pub planner: Planner<FileStore>,
}

impl Session {
    pub fn open(config: Config, layout: DataLayout, date: Option<&str>) -> Result<Session> {
        let store = FileStore::open(layout.store_dir())
            .with_context(|| format!("opening store at {:?}", layout.store_dir()))?;
        let planner = match date {
            Some(raw) => Planner::open_at(
                store,
                date::parse_iso(raw)?,
                config.default_work_minutes,
                config.default_break_minutes,
            ),
            None => Planner::open(
                store,
                config.default_work_minutes,
                config.default_break_minutes,
            ),
        };
        Ok(Session {
            config,
            layout,
            planner,
        })
    }
}

pub fn run(command: Command, session: Session) -> Result<()> {
    match command {
        Command::Tui => ui::run(session),
        Command::Date { action } => date_cmd(action.unwrap_or(DateAction::Show), session),
        Command::Tasks { action } => tasks_cmd(action.unwrap_or(TaskAction::List), session),
        Command::Habits { action } => habits_cmd(action.unwrap_or(HabitAction::List), session),
        Command::Notes { action } => notes_cmd(action.unwrap_or(NotesAction::Show), session),
        Command::Timer { action } => timer_cmd(action.unwrap_or(TimerAction::Status), session),
        Command::Print { output } => print_cmd(output, session),
    }
}

fn date_cmd(action: DateAction, mut session: Session) -> Result<()> {
    let planner = &mut session.planner;
    match action {
        DateAction::Show => {}
        DateAction::Next => planner.move_by(1),
        DateAction::Prev => planner.move_by(-1),
        DateAction::Today => planner.today(),
        DateAction::Set { date } => planner.set_date_str(&date)?,
    }
    println!("{}  {}", planner.cursor().iso(), planner.cursor().nice());
    Ok(())
}

fn tasks_cmd(action: TaskAction, mut session: Session) -> Result<()> {
    let planner = &mut session.planner;
    match action {
        TaskAction::List => {
            println!("Tasks for {}", planner.cursor().iso());
            let tasks = planner.sorted_tasks();
            if tasks.is_empty() {
                println!("  (empty)");
            }
            for task in tasks {
                println!("  {}  {}", task.id, sheet::task_line(task));
            }
        }
        TaskAction::Add(args) => {
            let AddTaskArgs {
                text,
                priority,
                at,
                area,
            } = args;
            let priority = Priority::parse(&priority)?;
            let when = model::parse_when(at.as_deref().unwrap_or_default())?;
            let area = area.unwrap_or_else(|| DEFAULT_AREA.to_string());
            match planner.add_task(&text, priority, when, &area) {
                Some(id) => println!("Added task {}", id),
                None => println!("Nothing added: task text is empty"),
            }
        }
        TaskAction::Toggle { id } => {
            let done = planner
                .toggle_task(&id)
                .with_context(|| format!("toggling task {}", id))?;
            println!("Task {} is now {}", id, if done { "done" } else { "open" });
        }
        TaskAction::Rm { id } => {
            let task = planner
                .remove_task(&id)
                .with_context(|| format!("removing task {}", id))?;
            println!("Removed task {}: {}", id, task.text);
        }
        TaskAction::Clear => {
            let removed = planner.clear_completed();
            println!("Cleared {} completed task(s)", removed);
        }
    }
    Ok(())
}

fn habits_cmd(action: HabitAction, mut session: Session) -> Result<()> {
    let planner = &mut session.planner;
    match action {
        HabitAction::List => {
            println!(
                "Habits for {} ({}% complete)",
                planner.cursor().iso(),
                planner.completion_percent()
            );
            if planner.habits().is_empty() {
                println!("  (empty)");
            }
            for habit in planner.habits() {
                println!("  {}  {}", habit.id, sheet::habit_line(habit));
            }
        }
        HabitAction::Add { name } => match planner.add_habit(&name) {
            Some(id) => println!("Added habit {}", id),
            None => println!("Nothing added: habit name is empty"),
        },
        HabitAction::Toggle { id } => {
            let done = planner
                .toggle_habit(&id)
                .with_context(|| format!("toggling habit {}", id))?;
            println!("Habit {} is now {}", id, if done { "done" } else { "open" });
        }
        HabitAction::Rm { id } => {
            let habit = planner
                .remove_habit(&id)
                .with_context(|| format!("removing habit {}", id))?;
            println!("Removed habit {}: {}", id, habit.name);
        }
    }
    Ok(())
}

fn notes_cmd(action: NotesAction, mut session: Session) -> Result<()> {
    let planner = &mut session.planner;
    match action {
        NotesAction::Show => println!("{}", planner.notes()),
        NotesAction::Set { text } => {
            planner.set_notes(&text);
            println!("Saved notes for {}", planner.cursor().iso());
        }
    }
    Ok(())
}

fn timer_cmd(action: TimerAction, mut session: Session) -> Result<()> {
    let planner = &mut session.planner;
    match action {
        TimerAction::Status => {}
        TimerAction::Set {
            work,
            break_minutes,
        } => {
            planner.try_with_timer(|timer| -> Result<()> {
                if let Some(minutes) = work {
                    timer.set_work_minutes(minutes)?;
                }
                if let Some(minutes) = break_minutes {
                    timer.set_break_minutes(minutes)?;
                }
                Ok(())
            })?;
        }
        TimerAction::Reset => planner.with_timer(|timer| timer.reset()),
    }
    let timer = planner.timer();
    println!(
        "{}  {}  ({})",
        timer.mode().label(),
        timer.display(),
        if timer.running() { "running" } else { "paused" }
    );
    println!(
        "work {}m  break {}m",
        timer.work_minutes(),
        timer.break_minutes()
    );
    Ok(())
}

fn print_cmd(output: Option<PathBuf>, session: Session) -> Result<()> {
    let text = sheet::render(session.planner.day());
    match output {
        Some(path) => {
            fs::write(&path, text).with_context(|| format!("writing {:?}", path))?;
            println!("Wrote {}", path.display());
        }
        None => print!("{}", text),
    }
    Ok(())
}
