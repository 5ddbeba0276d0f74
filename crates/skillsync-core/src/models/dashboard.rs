use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum ActivityKind {
    SkillAdded,
    SkillUpdated,
    ProjectCreated,
    ProjectUpdated,
    MilestoneCompleted,
}

impl ActivityKind {
    /// Map the backend's coarse activity type onto the client's kinds.
    /// Unknown types fall back to `SkillAdded`.
    pub fn from_backend(kind: &str) -> Self {
        match kind {
            "skill" => ActivityKind::SkillAdded,
            "project" => ActivityKind::ProjectCreated,
            "notification" => ActivityKind::ProjectUpdated,
            _ => ActivityKind::SkillAdded,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ActivityKind::SkillAdded => "Skill added",
            ActivityKind::SkillUpdated => "Skill updated",
            ActivityKind::ProjectCreated => "Project created",
            ActivityKind::ProjectUpdated => "Project updated",
            ActivityKind::MilestoneCompleted => "Milestone completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ActivityItem {
    pub id: String,
    pub kind: ActivityKind,
    pub title: String,
    pub description: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct DashboardStats {
    pub total_skills: u32,
    pub total_projects: u32,
    pub completed_projects: u32,
    /// Derived: total minus completed
    pub active_projects: u32,
    pub skills_by_category: BTreeMap<String, u32>,
    pub recent_activity: Vec<ActivityItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ProgressSummary {
    /// Rounded mean of per-project progress, 0 when there are no projects
    pub overall_progress: u32,
    /// Projects at 100%
    pub milestones_completed: u32,
    pub milestones_total: u32,
}
