//! Some utility functions

use chrono::NaiveDate;
use minidom::Element;

use crate::task::Task;

/// Walks an XML tree and returns every element that has the given name
pub fn find_elems<S: AsRef<str>>(root: &Element, searched_name: S) -> Vec<&Element> {
    let searched_name = searched_name.as_ref();
    let mut elems: Vec<&Element> = Vec::new();

    for el in root.children() {
        if el.name() == searched_name {
            elems.push(el);
        } else {
            let ret = find_elems(el, searched_name);
            elems.extend(ret);
        }
    }
    elems
}

/// Walks an XML tree until it finds an elements with the given name
pub fn find_elem<S: AsRef<str>>(root: &Element, searched_name: S) -> Option<&Element> {
    let searched_name = searched_name.as_ref();
    if root.name() == searched_name {
        return Some(root);
    }

    for el in root.children() {
        if el.name() == searched_name {
            return Some(el);
        } else {
            let ret = find_elem(el, searched_name);
            if ret.is_some() {
                return ret;
            }
        }
    }
    None
}

/// A debug utility that pretty-prints tasks
pub fn print_task(task: &Task, today: NaiveDate) {
    let completion = if task.is_completed() { "✓" } else { " " };
    let due = match task.due {
        Some(due) if task.is_overdue(today) => format!("{} (overdue)", due),
        Some(due) => due.to_string(),
        None => String::new(),
    };
    println!(
        "    {} [{}] {}\t{}",
        completion,
        task.priority_label(),
        task.title,
        due
    );
}
