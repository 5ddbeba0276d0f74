//! Backend paths. Trailing slashes are required by the Django router.

pub const LOGIN: &str = "/api/auth/login/";
pub const REGISTER: &str = "/api/auth/register/";
pub const LOGOUT: &str = "/api/auth/logout/";
pub const ME: &str = "/api/auth/me/";
pub const TOKEN_REFRESH: &str = "/api/auth/token/refresh/";
pub const PASSWORD_RESET: &str = "/api/auth/password/reset/";
pub const PASSWORD_RESET_CONFIRM: &str = "/api/auth/password/reset/confirm/";

pub const SKILLS: &str = "/api/skills/";
pub const PROJECTS: &str = "/api/projects/";

pub const DASHBOARD_STATS: &str = "/api/dashboard/stats/";
pub const DASHBOARD_PROGRESS: &str = "/api/dashboard/progress/";
pub const DASHBOARD_ACTIVITY: &str = "/api/dashboard/activity/";

pub const PROFILE: &str = "/api/users/me/";
pub const CHANGE_PASSWORD: &str = "/api/users/change-password/";
pub const USER_STATS: &str = "/api/users/stats/";

pub const NOTIFICATIONS: &str = "/api/notifications/";
pub const NOTIFICATIONS_UNREAD_COUNT: &str = "/api/notifications/unread-count/";
pub const NOTIFICATIONS_MARK_ALL_READ: &str = "/api/notifications/mark-all-read/";
pub const NOTIFICATIONS_CLEAR: &str = "/api/notifications/clear/";

pub fn skill(id: impl std::fmt::Display) -> String {
    format!("{}{}/", SKILLS, id)
}

pub fn project(id: impl std::fmt::Display) -> String {
    format!("{}{}/", PROJECTS, id)
}

pub fn milestone(project_id: impl std::fmt::Display, milestone_id: impl std::fmt::Display) -> String {
    format!("{}{}/milestones/{}/", PROJECTS, project_id, milestone_id)
}

pub fn notification(id: impl std::fmt::Display) -> String {
    format!("{}{}/", NOTIFICATIONS, id)
}

pub fn notification_read(id: impl std::fmt::Display) -> String {
    format!("{}{}/read/", NOTIFICATIONS, id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_paths() {
        assert_eq!(skill(4), "/api/skills/4/");
        assert_eq!(milestone(12, 3), "/api/projects/12/milestones/3/");
        assert_eq!(notification_read(9), "/api/notifications/9/read/");
    }
}
