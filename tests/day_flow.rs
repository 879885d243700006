use chrono::NaiveDate;
use dayplan::planner::{habits_key, load_habits, tasks_key};
use dayplan::store::{self, FileStore, KeyValueStore};
use dayplan::{HabitLoad, Planner, Priority, TimerMode};

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn open(dir: &std::path::Path) -> Planner<FileStore> {
    Planner::open(FileStore::open(dir).unwrap(), 25, 5)
}

#[test]
fn tasks_survive_restart_in_insertion_order() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut planner = open(dir.path());
        planner.set_date(ymd(2024, 6, 3));
        planner.add_task("later", Priority::Medium, Some("09:00".into()), "Work");
        planner.add_task("urgent", Priority::High, Some("10:00".into()), "Work");
        planner.add_task("whenever", Priority::High, None, "General");
    }

    let planner = open(dir.path());
    assert_eq!(planner.date(), ymd(2024, 6, 3));
    let stored: Vec<&str> = planner.tasks().iter().map(|t| t.text.as_str()).collect();
    assert_eq!(stored, vec!["whenever", "urgent", "later"]);
    let shown: Vec<&str> = planner
        .sorted_tasks()
        .iter()
        .map(|t| t.text.as_str())
        .collect();
    assert_eq!(shown, vec!["urgent", "whenever", "later"]);
}

#[test]
fn first_visit_seeds_habits_and_stored_empty_list_stays_empty() {
    let dir = tempfile::tempdir().unwrap();
    let mut planner = open(dir.path());
    planner.set_date(ymd(2024, 6, 3));
    assert_eq!(planner.habits().len(), 3);
    assert_eq!(planner.completion_percent(), 0);

    let ids: Vec<String> = planner.habits().iter().map(|h| h.id.clone()).collect();
    for id in &ids {
        planner.remove_habit(id).unwrap();
    }
    planner.move_by(1);
    planner.move_by(-1);
    assert!(planner.habits().is_empty());

    let store = FileStore::open(dir.path()).unwrap();
    assert_eq!(load_habits(&store, ymd(2024, 6, 3)), HabitLoad::Found(Vec::new()));
    assert!(load_habits(&store, ymd(2030, 1, 1)).is_seeded());
}

#[test]
fn corrupt_task_file_reads_as_empty_list() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    store
        .set_raw(&tasks_key(ymd(2024, 6, 3)), "[{\"id\": 1")
        .unwrap();

    let mut planner = Planner::open_at(store, ymd(2024, 6, 3), 25, 5);
    assert!(planner.tasks().is_empty());
    let id = planner
        .add_task("recovered", Priority::Low, None, "General")
        .unwrap();
    assert_eq!(planner.tasks()[0].id, id);
}

#[test]
fn habit_completion_tracks_toggles() {
    let dir = tempfile::tempdir().unwrap();
    let mut planner = open(dir.path());
    let id = planner.habits()[0].id.clone();
    planner.toggle_habit(&id).unwrap();
    assert_eq!(planner.completion_percent(), 33);
    planner.toggle_habit(&id).unwrap();
    assert_eq!(planner.completion_percent(), 0);

    let store = FileStore::open(dir.path()).unwrap();
    let raw: Vec<serde_json::Value> =
        store::read(&store, &habits_key(planner.date()), Vec::new());
    assert_eq!(raw.len(), 3);
    assert_eq!(raw[0]["done"], false);
}

#[test]
fn notes_are_scoped_per_day_and_may_be_empty() {
    let dir = tempfile::tempdir().unwrap();
    let mut planner = open(dir.path());
    planner.set_date(ymd(2024, 6, 3));
    planner.set_notes("call the dentist\nbuy milk");
    planner.move_by(1);
    assert_eq!(planner.notes(), "");
    planner.move_by(-1);
    assert_eq!(planner.notes(), "call the dentist\nbuy milk");
    planner.set_notes("");

    let reopened = open(dir.path());
    assert_eq!(reopened.notes(), "");
}

#[test]
fn timer_is_independent_of_the_selected_day() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut planner = open(dir.path());
        planner.with_timer(|t| {
            t.set_work_minutes(1).unwrap();
            t.start();
            for _ in 0..61 {
                t.tick();
            }
        });
        planner.move_by(7);
        assert_eq!(planner.timer().mode(), TimerMode::Break);
    }

    let planner = open(dir.path());
    let timer = planner.timer();
    assert_eq!(timer.mode(), TimerMode::Break);
    assert_eq!(timer.seconds(), 5 * 60);
    assert!(timer.running());
    assert_eq!(timer.work_minutes(), 1);
}

#[test]
fn pinned_session_leaves_saved_date_alone() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut planner = open(dir.path());
        planner.set_date(ymd(2024, 6, 3));
    }
    {
        let store = FileStore::open(dir.path()).unwrap();
        let mut planner = Planner::open_at(store, ymd(2025, 1, 1), 25, 5);
        planner.add_task("new year", Priority::High, None, "Personal");
        planner.move_by(1);
    }
    let planner = open(dir.path());
    assert_eq!(planner.date(), ymd(2024, 6, 3));
    let store = FileStore::open(dir.path()).unwrap();
    let tasks: Vec<serde_json::Value> = store::read(&store, &tasks_key(ymd(2025, 1, 1)), Vec::new());
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["priority"], "H");
}
