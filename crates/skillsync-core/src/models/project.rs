use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::RecordId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum ProjectStatus {
    #[default]
    Planned,
    InProgress,
    Completed,
}

impl ProjectStatus {
    pub fn display_name(&self) -> &'static str {
        match self {
            ProjectStatus::Planned => "Planned",
            ProjectStatus::InProgress => "In Progress",
            ProjectStatus::Completed => "Completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "planned" => Some(ProjectStatus::Planned),
            "in_progress" => Some(ProjectStatus::InProgress),
            "completed" => Some(ProjectStatus::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Milestone {
    pub id: RecordId,
    pub title: String,
    #[serde(default, alias = "is_completed")]
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Project {
    pub id: RecordId,
    #[serde(default)]
    pub user_id: Option<RecordId>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: ProjectStatus,
    /// Skill ids
    #[serde(default)]
    pub skills: Vec<RecordId>,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Project {
    pub fn completed_milestones(&self) -> usize {
        self.milestones.iter().filter(|m| m.completed).count()
    }

    /// Milestone completion as a whole percentage, None without milestones
    pub fn completion_percent(&self) -> Option<u8> {
        if self.milestones.is_empty() {
            return None;
        }
        let pct = self.completed_milestones() * 100 / self.milestones.len();
        Some(pct as u8)
    }

    pub fn milestone(&self, id: &RecordId) -> Option<&Milestone> {
        self.milestones.iter().find(|m| &m.id == id)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewProject {
    pub title: String,
    pub description: String,
    pub status: ProjectStatus,
}

/// Partial update; only `Some` fields are sent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
}

/// Response of the milestone toggle endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MilestoneToggle {
    pub status: String,
    pub is_completed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROJECT_JSON: &str = r#"{
        "id": 12, "userId": 7, "title": "Portfolio", "description": "Personal site",
        "status": "in_progress", "skills": [1, 3],
        "milestones": [
            {"id": 1, "title": "Design", "completed": true},
            {"id": 2, "title": "Build", "completed": false},
            {"id": 3, "title": "Ship", "completed": false}
        ],
        "startDate": "2024-02-01", "endDate": null,
        "createdAt": "2024-02-01T09:00:00Z", "updatedAt": "2024-02-03T09:00:00Z"
    }"#;

    #[test]
    fn test_parse_project() {
        let project: Project = serde_json::from_str(PROJECT_JSON).unwrap();
        assert_eq!(project.status, ProjectStatus::InProgress);
        assert_eq!(project.skills, vec![RecordId::Int(1), RecordId::Int(3)]);
        assert_eq!(project.start_date, NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(project.end_date, None);
    }

    #[test]
    fn test_completion_percent() {
        let mut project: Project = serde_json::from_str(PROJECT_JSON).unwrap();
        assert_eq!(project.completed_milestones(), 1);
        assert_eq!(project.completion_percent(), Some(33));

        project.milestones.clear();
        assert_eq!(project.completion_percent(), None);
    }

    #[test]
    fn test_status_defaults_to_planned() {
        let json = r#"{"id": 1, "title": "Idea"}"#;
        let project: Project = serde_json::from_str(json).unwrap();
        assert_eq!(project.status, ProjectStatus::Planned);
        assert!(project.milestones.is_empty());
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!(ProjectStatus::from_str("in-progress"), Some(ProjectStatus::InProgress));
        assert_eq!(ProjectStatus::from_str("In Progress"), Some(ProjectStatus::InProgress));
        assert_eq!(ProjectStatus::from_str("done"), None);
    }
}
