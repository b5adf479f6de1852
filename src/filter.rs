//! Filtering, searching and sorting of task lists.
//!
//! All of this is pure list manipulation: the current date is always passed in, so the
//! functions stay deterministic and callable from anywhere.

use chrono::{Duration, NaiveDate};

use crate::task::{priority_from_label, Task, TaskStatus};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StatusFilter {
    /// Tasks still to be done (`NEEDS-ACTION` or `IN-PROCESS`)
    Pending,
    Completed,
    Cancelled,
}

impl StatusFilter {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        match self {
            Self::Pending => {
                task.status == TaskStatus::NeedsAction || task.status == TaskStatus::InProcess
            }
            Self::Completed => task.status == TaskStatus::Completed,
            Self::Cancelled => task.status == TaskStatus::Cancelled,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DueFilter {
    Today,
    Overdue,
    Tomorrow,
    /// Due within the next 7 days (today included)
    ThisWeek,
    /// No due date at all
    None,
}

impl DueFilter {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "today" => Some(Self::Today),
            "overdue" => Some(Self::Overdue),
            "tomorrow" => Some(Self::Tomorrow),
            "week" => Some(Self::ThisWeek),
            "none" => Some(Self::None),
            _ => Option::None,
        }
    }

    pub fn matches(&self, task: &Task, today: NaiveDate) -> bool {
        match self {
            Self::Today => task.due == Some(today),
            Self::Overdue => task.is_overdue(today),
            Self::Tomorrow => task.due == Some(today + Duration::days(1)),
            Self::ThisWeek => match task.due {
                Some(due) => today <= due && due <= today + Duration::days(7),
                Option::None => false,
            },
            Self::None => task.due.is_none(),
        }
    }
}

/// How to order a task list
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SortBy {
    /// By due date, tasks without one last
    Due,
    /// By priority, "none" (0) last
    Priority,
    /// Alphabetically, case-insensitive
    Title,
}

impl Default for SortBy {
    fn default() -> Self {
        SortBy::Due
    }
}

impl SortBy {
    pub fn parse(value: &str) -> Self {
        match value {
            "priority" => Self::Priority,
            "title" => Self::Title,
            _ => Self::Due,
        }
    }
}

/// A search query over the task list, in a taskwarrior-inspired syntax:
/// `+tag` / `-tag` include or exclude tags, `due:`, `status:` and `priority:` add the
/// corresponding filters, anything else is a free-text term (all terms must match, in the
/// title or the description, case-insensitively).
#[derive(Clone, Debug, Default)]
pub struct TaskQuery {
    pub include_tags: Vec<String>,
    pub exclude_tags: Vec<String>,
    pub due: Option<DueFilter>,
    pub status: Option<StatusFilter>,
    pub priority: Option<u8>,
    pub text: Vec<String>,
}

impl TaskQuery {
    pub fn parse(query: &str) -> Self {
        let mut parsed = Self::default();

        for token in query.split_whitespace() {
            if let Some(tag) = token.strip_prefix('+') {
                parsed.include_tags.push(tag.to_string());
            } else if token.starts_with('-') && token.len() > 1 {
                parsed.exclude_tags.push(token[1..].to_string());
            } else if let Some(value) = token.strip_prefix("due:") {
                parsed.due = DueFilter::parse(value);
            } else if let Some(value) = token.strip_prefix("status:") {
                parsed.status = StatusFilter::parse(value);
            } else if let Some(value) = token.strip_prefix("priority:") {
                // Unknown priority labels filter nothing rather than everything
                parsed.priority = priority_from_label(value);
            } else {
                parsed.text.push(token.to_string());
            }
        }

        parsed
    }

    pub fn matches(&self, task: &Task, today: NaiveDate) -> bool {
        for tag in &self.include_tags {
            if task.tags.iter().any(|t| t == tag) == false {
                return false;
            }
        }
        for tag in &self.exclude_tags {
            if task.tags.iter().any(|t| t == tag) {
                return false;
            }
        }
        if let Some(due) = &self.due {
            if due.matches(task, today) == false {
                return false;
            }
        }
        if let Some(status) = &self.status {
            if status.matches(task) == false {
                return false;
            }
        }
        if let Some(priority) = self.priority {
            if task.priority != priority {
                return false;
            }
        }
        for term in &self.text {
            let term = term.to_lowercase();
            let in_title = task.title.to_lowercase().contains(&term);
            let in_description = task
                .description
                .as_ref()
                .map(|d| d.to_lowercase().contains(&term))
                .unwrap_or(false);
            if in_title == false && in_description == false {
                return false;
            }
        }
        true
    }

    pub fn apply(&self, tasks: Vec<Task>, today: NaiveDate) -> Vec<Task> {
        tasks
            .into_iter()
            .filter(|task| self.matches(task, today))
            .collect()
    }
}

pub fn sort_tasks(tasks: &mut Vec<Task>, sort_by: SortBy) {
    match sort_by {
        SortBy::Due => {
            tasks.sort_by_key(|t| t.due.unwrap_or_else(|| NaiveDate::MAX));
        }
        SortBy::Priority => {
            tasks.sort_by_key(|t| if t.priority == 0 { 99 } else { t.priority });
        }
        SortBy::Title => {
            tasks.sort_by_key(|t| t.title.to_lowercase());
        }
    }
}

/// Every tag in use across the given tasks, sorted and deduplicated
pub fn all_tags(tasks: &[Task]) -> Vec<String> {
    let mut tags: Vec<String> = tasks.iter().flat_map(|t| t.tags.iter().cloned()).collect();
    tags.sort();
    tags.dedup();
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskStatus;

    fn task(title: &str) -> Task {
        Task {
            uid: format!("uid-{}", title),
            title: title.to_string(),
            description: None,
            due: None,
            priority: 0,
            tags: Vec::new(),
            status: TaskStatus::NeedsAction,
            recurrence: None,
            completed: None,
            location_alarm: None,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
    }

    #[test]
    fn query_parsing() {
        let query = TaskQuery::parse("+work -home due:today status:pending priority:H call mom");

        assert_eq!(query.include_tags, vec!["work"]);
        assert_eq!(query.exclude_tags, vec!["home"]);
        assert_eq!(query.due, Some(DueFilter::Today));
        assert_eq!(query.status, Some(StatusFilter::Pending));
        assert_eq!(query.priority, Some(1));
        assert_eq!(query.text, vec!["call", "mom"]);
    }

    #[test]
    fn unknown_filter_values_filter_nothing() {
        let query = TaskQuery::parse("due:someday priority:urgent");
        assert_eq!(query.due, None);
        assert_eq!(query.priority, None);
        assert!(query.matches(&task("anything"), today()));
    }

    #[test]
    fn tag_filters() {
        let mut tagged = task("tagged");
        tagged.tags = vec!["work".to_string(), "urgent".to_string()];

        let query = TaskQuery::parse("+work");
        assert!(query.matches(&tagged, today()));
        assert!(query.matches(&task("untagged"), today()) == false);

        let query = TaskQuery::parse("-urgent");
        assert!(query.matches(&tagged, today()) == false);
        assert!(query.matches(&task("untagged"), today()));
    }

    #[test]
    fn text_terms_all_have_to_match() {
        let mut t = task("Call Mom");
        t.description = Some("about the birthday present".to_string());

        assert!(TaskQuery::parse("call").matches(&t, today()));
        assert!(TaskQuery::parse("call birthday").matches(&t, today()));
        assert!(TaskQuery::parse("call dentist").matches(&t, today()) == false);
    }

    #[test]
    fn due_filters() {
        let mut due_today = task("due today");
        due_today.due = Some(today());
        let mut overdue = task("overdue");
        overdue.due = today().pred_opt();
        let mut done_overdue = task("done overdue");
        done_overdue.due = today().pred_opt();
        done_overdue.status = TaskStatus::Completed;

        assert!(DueFilter::Today.matches(&due_today, today()));
        assert!(DueFilter::Overdue.matches(&overdue, today()));
        // Completed tasks are never overdue
        assert!(DueFilter::Overdue.matches(&done_overdue, today()) == false);
        assert!(DueFilter::None.matches(&task("whenever"), today()));
        assert!(DueFilter::ThisWeek.matches(&due_today, today()));
    }

    #[test]
    fn sorting() {
        let mut with_due = task("b with due");
        with_due.due = Some(today());
        let mut high = task("a high priority");
        high.priority = 1;

        let mut tasks = vec![task("c no due"), with_due.clone(), high.clone()];

        sort_tasks(&mut tasks, SortBy::Due);
        assert_eq!(tasks[0].title, "b with due");

        sort_tasks(&mut tasks, SortBy::Priority);
        assert_eq!(tasks[0].title, "a high priority");

        sort_tasks(&mut tasks, SortBy::Title);
        assert_eq!(tasks[0].title, "a high priority");
        assert_eq!(tasks[1].title, "b with due");
        assert_eq!(tasks[2].title, "c no due");
    }

    #[test]
    fn all_tags_are_sorted_and_unique() {
        let mut a = task("a");
        a.tags = vec!["work".to_string(), "fav".to_string()];
        let mut b = task("b");
        b.tags = vec!["home".to_string(), "work".to_string()];

        assert_eq!(all_tags(&[a, b]), vec!["fav", "home", "work"]);
    }
}
