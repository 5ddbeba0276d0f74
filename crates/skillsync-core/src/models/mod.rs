//! Data models for SkillSync entities.
//!
//! This module contains the data structures exchanged with the SkillSync
//! backend:
//!
//! - `UserRecord`, `RecordId`: the authenticated user snapshot
//! - `LoginCredentials`, `RegisterData`: auth request payloads
//! - `Skill`, `NewSkill`, `SkillUpdate`: skill tracking
//! - `Project`, `Milestone`, `NewProject`, `ProjectUpdate`: project tracking
//! - `DashboardStats`, `ActivityItem`, `ProgressSummary`: aggregated views
//! - `Notification`: in-app notifications

pub mod dashboard;
pub mod notification;
pub mod project;
pub mod skill;
pub mod user;

pub use dashboard::{ActivityItem, ActivityKind, DashboardStats, ProgressSummary};
pub use notification::{Notification, UnreadCount};
pub use project::{Milestone, MilestoneToggle, NewProject, Project, ProjectStatus, ProjectUpdate};
pub use skill::{NewSkill, ProficiencyLevel, Skill, SkillCategory, SkillUpdate};
pub use user::{LoginCredentials, PasswordChange, ProfileUpdate, RecordId, RegisterData, UserRecord, UserStats};
