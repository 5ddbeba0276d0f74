//! Typed client for the SkillSync resource endpoints.
//!
//! Every call runs through `HttpClient`, so bearer injection and the
//! refresh-on-401 protocol apply uniformly.

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::models::{
    ActivityItem, ActivityKind, DashboardStats, MilestoneToggle, NewProject, NewSkill, Notification,
    PasswordChange, ProfileUpdate, ProgressSummary, Project, ProjectUpdate, RecordId, Skill,
    SkillUpdate, UnreadCount, UserRecord, UserStats,
};

use super::endpoints;
use super::http::{ApiRequest, HttpClient};
use super::ApiError;

/// Number of activity entries returned by `recent_activity` when the caller
/// does not ask for a specific amount.
pub const DEFAULT_ACTIVITY_LIMIT: usize = 10;

/// API client for SkillSync resources.
/// Clone is cheap - the underlying `HttpClient` shares its connection pool.
#[derive(Clone)]
pub struct ApiClient {
    http: HttpClient,
}

impl ApiClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    // ===== Skills =====

    pub async fn list_skills(&self) -> Result<Vec<Skill>, ApiError> {
        self.http.get(endpoints::SKILLS).await
    }

    pub async fn get_skill(&self, id: &RecordId) -> Result<Skill, ApiError> {
        self.http.get(&endpoints::skill(id)).await
    }

    pub async fn create_skill(&self, skill: &NewSkill) -> Result<Skill, ApiError> {
        let created: Skill = self.http.post(endpoints::SKILLS, skill).await?;
        debug!(id = %created.id, "Skill created");
        Ok(created)
    }

    pub async fn update_skill(&self, id: &RecordId, update: &SkillUpdate) -> Result<Skill, ApiError> {
        self.http.put(&endpoints::skill(id), update).await
    }

    pub async fn delete_skill(&self, id: &RecordId) -> Result<(), ApiError> {
        self.http.delete(&endpoints::skill(id)).await
    }

    // ===== Projects =====

    pub async fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
        self.http.get(endpoints::PROJECTS).await
    }

    pub async fn get_project(&self, id: &RecordId) -> Result<Project, ApiError> {
        self.http.get(&endpoints::project(id)).await
    }

    pub async fn create_project(&self, project: &NewProject) -> Result<Project, ApiError> {
        let created: Project = self.http.post(endpoints::PROJECTS, project).await?;
        debug!(id = %created.id, "Project created");
        Ok(created)
    }

    pub async fn update_project(&self, id: &RecordId, update: &ProjectUpdate) -> Result<Project, ApiError> {
        self.http.put(&endpoints::project(id), update).await
    }

    pub async fn delete_project(&self, id: &RecordId) -> Result<(), ApiError> {
        self.http.delete(&endpoints::project(id)).await
    }

    /// Flip a milestone's completed flag server-side
    pub async fn toggle_milestone(
        &self,
        project_id: &RecordId,
        milestone_id: &RecordId,
    ) -> Result<MilestoneToggle, ApiError> {
        let toggle: MilestoneToggle = self
            .http
            .send_json(ApiRequest::patch(endpoints::milestone(project_id, milestone_id)))
            .await?;
        debug!(%project_id, %milestone_id, completed = toggle.is_completed, "Milestone toggled");
        Ok(toggle)
    }

    // ===== Dashboard =====

    /// Combined dashboard view from the stats, progress and activity
    /// endpoints, fetched concurrently.
    pub async fn dashboard_stats(&self) -> Result<DashboardStats, ApiError> {
        let (stats, progress, activity) = futures::try_join!(
            self.http.get::<BackendDashboardStats>(endpoints::DASHBOARD_STATS),
            self.http.get::<BackendDashboardProgress>(endpoints::DASHBOARD_PROGRESS),
            self.http.get::<Vec<BackendActivityItem>>(endpoints::DASHBOARD_ACTIVITY),
        )?;
        Ok(aggregate_dashboard(stats, progress, activity))
    }

    pub async fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityItem>, ApiError> {
        let activity: Vec<BackendActivityItem> = self.http.get(endpoints::DASHBOARD_ACTIVITY).await?;
        Ok(map_activity(activity, limit))
    }

    pub async fn dashboard_progress(&self) -> Result<ProgressSummary, ApiError> {
        let progress: BackendDashboardProgress = self.http.get(endpoints::DASHBOARD_PROGRESS).await?;
        Ok(summarize_progress(&progress.project_progress))
    }

    // ===== Profile =====

    pub async fn profile(&self) -> Result<UserRecord, ApiError> {
        self.http.get(endpoints::PROFILE).await
    }

    /// Update the profile. The cached user is replaced with the returned
    /// snapshot so later rehydration starts from the new values.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserRecord, ApiError> {
        let user: UserRecord = self.http.put(endpoints::PROFILE, update).await?;
        if let Err(e) = self.http.store().set_user(&user) {
            warn!(error = %e, "Failed to cache updated profile");
        }
        Ok(user)
    }

    pub async fn change_password(&self, change: &PasswordChange) -> Result<(), ApiError> {
        self.http
            .send_empty(ApiRequest::post(endpoints::CHANGE_PASSWORD).json(change)?)
            .await
    }

    pub async fn user_stats(&self) -> Result<UserStats, ApiError> {
        self.http.get(endpoints::USER_STATS).await
    }

    /// Delete the account and drop the local session with it
    pub async fn delete_account(&self) -> Result<(), ApiError> {
        self.http.delete(endpoints::PROFILE).await?;
        self.http.store().clear()?;
        info!("Account deleted, local session cleared");
        Ok(())
    }

    // ===== Notifications =====

    pub async fn notifications(&self) -> Result<Vec<Notification>, ApiError> {
        self.http.get(endpoints::NOTIFICATIONS).await
    }

    pub async fn unread_notifications(&self) -> Result<u32, ApiError> {
        let count: UnreadCount = self.http.get(endpoints::NOTIFICATIONS_UNREAD_COUNT).await?;
        Ok(count.unread)
    }

    pub async fn mark_notification_read(&self, id: &RecordId) -> Result<(), ApiError> {
        self.http
            .send_empty(ApiRequest::patch(endpoints::notification_read(id)))
            .await
    }

    pub async fn mark_all_notifications_read(&self) -> Result<(), ApiError> {
        self.http
            .send_empty(ApiRequest::post(endpoints::NOTIFICATIONS_MARK_ALL_READ))
            .await
    }

    pub async fn delete_notification(&self, id: &RecordId) -> Result<(), ApiError> {
        self.http.delete(&endpoints::notification(id)).await
    }

    pub async fn clear_notifications(&self) -> Result<(), ApiError> {
        self.http.delete(endpoints::NOTIFICATIONS_CLEAR).await
    }
}

fn aggregate_dashboard(
    stats: BackendDashboardStats,
    progress: BackendDashboardProgress,
    activity: Vec<BackendActivityItem>,
) -> DashboardStats {
    let skills_by_category: BTreeMap<String, u32> = progress
        .skills_by_category
        .into_iter()
        .map(|c| (c.category, c.count))
        .collect();

    DashboardStats {
        total_skills: stats.total_skills,
        total_projects: stats.total_projects,
        completed_projects: stats.completed_projects,
        active_projects: stats.total_projects.saturating_sub(stats.completed_projects),
        skills_by_category,
        recent_activity: map_activity(activity, usize::MAX),
    }
}

fn map_activity(activity: Vec<BackendActivityItem>, limit: usize) -> Vec<ActivityItem> {
    activity
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(index, item)| ActivityItem {
            id: format!("activity-{}", index),
            kind: ActivityKind::from_backend(&item.kind),
            title: item.message.clone(),
            description: item.message,
            timestamp: item.date,
        })
        .collect()
}

fn summarize_progress(projects: &[BackendProjectProgress]) -> ProgressSummary {
    let total = projects.len() as u32;
    let completed = projects.iter().filter(|p| p.progress >= 100.0).count() as u32;
    let overall = if projects.is_empty() {
        0
    } else {
        let sum: f64 = projects.iter().map(|p| p.progress).sum();
        (sum / projects.len() as f64).round() as u32
    };

    ProgressSummary {
        overall_progress: overall,
        milestones_completed: completed,
        milestones_total: total,
    }
}

// Internal API response types for parsing

#[derive(Debug, Clone, Deserialize)]
struct BackendDashboardStats {
    total_skills: u32,
    total_projects: u32,
    completed_projects: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct BackendSkillCategory {
    category: String,
    count: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct BackendProjectProgress {
    #[allow(dead_code)]
    project_id: RecordId,
    #[allow(dead_code)]
    title: String,
    progress: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct BackendDashboardProgress {
    #[serde(default)]
    skills_by_category: Vec<BackendSkillCategory>,
    #[serde(default)]
    project_progress: Vec<BackendProjectProgress>,
}

#[derive(Debug, Clone, Deserialize)]
struct BackendActivityItem {
    #[serde(rename = "type")]
    kind: String,
    message: String,
    date: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(values: &[f64]) -> Vec<BackendProjectProgress> {
        values
            .iter()
            .enumerate()
            .map(|(i, p)| BackendProjectProgress {
                project_id: RecordId::Int(i as i64),
                title: format!("Project {}", i),
                progress: *p,
            })
            .collect()
    }

    #[test]
    fn test_summarize_progress() {
        let summary = summarize_progress(&progress(&[100.0, 50.0, 25.0]));
        assert_eq!(summary.milestones_total, 3);
        assert_eq!(summary.milestones_completed, 1);
        // (100 + 50 + 25) / 3 = 58.33
        assert_eq!(summary.overall_progress, 58);
    }

    #[test]
    fn test_summarize_no_projects() {
        let summary = summarize_progress(&[]);
        assert_eq!(summary.overall_progress, 0);
        assert_eq!(summary.milestones_total, 0);
    }

    #[test]
    fn test_aggregate_dashboard() {
        let stats: BackendDashboardStats =
            serde_json::from_str(r#"{"total_skills": 5, "total_projects": 4, "completed_projects": 1}"#).unwrap();
        let progress: BackendDashboardProgress = serde_json::from_str(
            r#"{"skills_by_category": [{"category": "backend", "count": 3}, {"category": "design", "count": 2}],
                "project_progress": []}"#,
        )
        .unwrap();
        let activity: Vec<BackendActivityItem> = serde_json::from_str(
            r#"[{"type": "skill", "message": "Added Rust", "date": "2024-05-01"},
                {"type": "notification", "message": "Deadline soon", "date": "2024-05-02"}]"#,
        )
        .unwrap();

        let dashboard = aggregate_dashboard(stats, progress, activity);
        assert_eq!(dashboard.active_projects, 3);
        assert_eq!(dashboard.skills_by_category.get("backend"), Some(&3));
        assert_eq!(dashboard.recent_activity.len(), 2);
        assert_eq!(dashboard.recent_activity[0].id, "activity-0");
        assert_eq!(dashboard.recent_activity[0].kind, ActivityKind::SkillAdded);
        assert_eq!(dashboard.recent_activity[1].kind, ActivityKind::ProjectUpdated);
    }

    #[test]
    fn test_activity_limit() {
        let activity: Vec<BackendActivityItem> = (0..5)
            .map(|i| BackendActivityItem {
                kind: "project".into(),
                message: format!("m{}", i),
                date: "2024-01-01".into(),
            })
            .collect();
        let items = map_activity(activity, 2);
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].title, "m1");
        assert_eq!(items[1].kind, ActivityKind::ProjectCreated);
    }
}
