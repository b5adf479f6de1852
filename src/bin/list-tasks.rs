//! Lists the pending tasks of the configured calendar.
//! Set TASKDAV_URL, TASKDAV_USERNAME, TASKDAV_PASSWORD and (optionally)
//! TASKDAV_CALENDAR_NAME, or pass the path of a JSON configuration file.

use chrono::Utc;

use taskdav::client::Client;
use taskdav::config::Config;
use taskdav::filter::{sort_tasks, SortBy};
use taskdav::utils::print_task;
use taskdav::TaskProvider;

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(std::path::Path::new(&path)).unwrap(),
        None => Config::from_env().unwrap(),
    };

    let mut client = Client::new(&config).unwrap();
    let calendar = client.task_calendar().await.unwrap();
    println!("Tasks of calendar {}:", calendar.name());

    let provider = TaskProvider::new(calendar);
    let mut tasks = provider.list_tasks(false).await;
    sort_tasks(&mut tasks, SortBy::Due);

    let today = Utc::now().date_naive();
    for task in &tasks {
        print_task(task, today);
    }
}
