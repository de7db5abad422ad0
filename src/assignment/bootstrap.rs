//! First-visit conversion of an assignment into an empty session.
//!
//! Runs once per (project, task, worker), before anything has been
//! submitted. It mirrors logic the labeling client will eventually own, so it
//! only builds items and config and nothing more.

use log::debug;

use super::types::Assignment;
use crate::session_state::{IdMap, Item, Session, SessionConfig, SessionCursor};

pub fn assignment_to_session(assignment: &Assignment) -> Session {
    let options = &assignment.task.project_options;
    let items: Vec<Item> = assignment
        .task
        .items
        .iter()
        .map(|item| Item {
            id: item.index,
            index: item.index,
            url: item.url.clone(),
            labels: Vec::new(),
            ..Default::default()
        })
        .collect();

    let config = SessionConfig {
        assignment_id: assignment.id.clone(),
        project_name: options.name.clone(),
        item_type: options.item_type.clone(),
        label_type: options.label_type.clone(),
        task_size: options.task_size,
        handler_url: options.handler_url.clone(),
        page_title: options.page_title.clone(),
        instruction_page: options.instructions.clone(),
        demo_mode: options.demo_mode,
        bundle_file: options.bundle_file.clone(),
        categories: options.category_names(),
        attributes: options.attributes.clone(),
        task_id: assignment.task.task_id(),
        worker_id: assignment.worker_id.clone(),
        start_time: assignment.start_time,
        submit_time: assignment.submit_time,
    };
    debug!(
        "Bootstrapped session for {} with {} item(s)",
        assignment.storage_key(),
        items.len()
    );

    Session {
        config,
        current: SessionCursor {
            item: -1,
            label: -1,
            max_object_id: -1,
        },
        items,
        labels: IdMap::new(),
        tracks: IdMap::new(),
        shapes: IdMap::new(),
        actions: Vec::new(),
    }
}
