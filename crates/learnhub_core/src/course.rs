//! crates/learnhub_core/src/course.rs
//!
//! Progress through a course for the learning player.

use crate::domain::{Course, CourseNode, NodeContent};
use std::collections::HashSet;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleProgress {
    pub module_id: Uuid,
    pub completed_nodes: usize,
    pub required_nodes: usize,
    pub complete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseProgress {
    pub course_id: Uuid,
    pub modules: Vec<ModuleProgress>,
    pub percentage: u8,
    /// The first required node, in course order, that is not yet done.
    pub next_node: Option<Uuid>,
    pub complete: bool,
}

fn node_done(node: &CourseNode, completed_clips: &HashSet<Uuid>, passed_quizzes: &HashSet<Uuid>) -> bool {
    match node.content {
        NodeContent::Clip { clip_id } => completed_clips.contains(&clip_id),
        NodeContent::Quiz { quiz_id } => passed_quizzes.contains(&quiz_id),
    }
}

impl CourseProgress {
    pub fn compute(
        course: &Course,
        completed_clips: &HashSet<Uuid>,
        passed_quizzes: &HashSet<Uuid>,
    ) -> Self {
        let mut next_node = None;
        let mut done_total = 0;
        let mut required_total = 0;

        let modules = course
            .modules
            .iter()
            .map(|module| {
                let mut completed_nodes = 0;
                let mut required_nodes = 0;
                for node in module.nodes.iter().filter(|n| n.required) {
                    required_nodes += 1;
                    if node_done(node, completed_clips, passed_quizzes) {
                        completed_nodes += 1;
                    } else if next_node.is_none() {
                        next_node = Some(node.id);
                    }
                }
                done_total += completed_nodes;
                required_total += required_nodes;
                ModuleProgress {
                    module_id: module.id,
                    completed_nodes,
                    required_nodes,
                    complete: completed_nodes == required_nodes,
                }
            })
            .collect();

        let percentage = if required_total == 0 {
            100
        } else {
            ((100 * done_total) as f64 / required_total as f64).round() as u8
        };

        Self {
            course_id: course.id,
            modules,
            percentage,
            next_node,
            complete: done_total == required_total,
        }
    }

    pub fn certificate_eligible(&self) -> bool {
        self.complete
    }
}
