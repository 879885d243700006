use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dayplan", version, about = "Terminal daily planner: tasks, habits, focus timer, notes")]
pub struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Directory holding the store, logs and exports
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
    /// Operate on this day (YYYY-MM-DD) without moving the saved date
    #[arg(long, global = true)]
    pub date: Option<String>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Launch the interactive TUI
    Tui,
    /// Show or move the selected day
    Date {
        #[command(subcommand)]
        action: Option<DateAction>,
    },
    /// Manage the day's tasks
    Tasks {
        #[command(subcommand)]
        action: Option<TaskAction>,
    },
    /// Manage the day's habits
    Habits {
        #[command(subcommand)]
        action: Option<HabitAction>,
    },
    /// Read or replace the day's notes
    Notes {
        #[command(subcommand)]
        action: Option<NotesAction>,
    },
    /// Inspect or configure the focus timer
    Timer {
        #[command(subcommand)]
        action: Option<TimerAction>,
    },
    /// Render a printable sheet for the day
    Print {
        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum DateAction {
    /// Print the selected day
    Show,
    /// Move one day forward
    Next,
    /// Move one day back
    Prev,
    /// Jump to today
    Today,
    /// Jump to a specific day
    Set {
        /// Day in YYYY-MM-DD format
        date: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum TaskAction {
    /// List tasks in display order
    List,
    /// Add a task
    Add(AddTaskArgs),
    /// Flip a task's done flag
    Toggle {
        /// Task id
        id: String,
    },
    /// Delete a task
    Rm {
        /// Task id
        id: String,
    },
    /// Delete every completed task
    Clear,
}

#[derive(Args, Debug)]
pub struct AddTaskArgs {
    /// Task text
    pub text: String,
    /// Priority: h, m or l
    #[arg(long, short, default_value = "m")]
    pub priority: String,
    /// Time of day in HH:MM format
    #[arg(long)]
    pub at: Option<String>,
    /// Category label
    #[arg(long)]
    pub area: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum HabitAction {
    /// List habits with the completion percentage
    List,
    /// Add a habit
    Add {
        /// Habit name
        name: String,
    },
    /// Flip a habit's done flag
    Toggle {
        /// Habit id
        id: String,
    },
    /// Delete a habit
    Rm {
        /// Habit id
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum NotesAction {
    /// Print the notes
    Show,
    /// Replace the notes (an empty string clears them)
    Set {
        /// New text
        text: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum TimerAction {
    /// Print mode, remaining time and lengths
    Status,
    /// Change phase lengths in minutes
    Set {
        /// Work sprint length
        #[arg(long)]
        work: Option<i64>,
        /// Break length
        #[arg(long = "break")]
        break_minutes: Option<i64>,
    },
    /// Stop the timer and restore the current phase length
    Reset,
}
