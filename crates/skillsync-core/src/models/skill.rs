use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RecordId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum SkillCategory {
    Frontend,
    Backend,
    Database,
    Devops,
    Mobile,
    Design,
    #[serde(other)]
    Other,
}

impl SkillCategory {
    pub const ALL: [SkillCategory; 7] = [
        SkillCategory::Frontend,
        SkillCategory::Backend,
        SkillCategory::Database,
        SkillCategory::Devops,
        SkillCategory::Mobile,
        SkillCategory::Design,
        SkillCategory::Other,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            SkillCategory::Frontend => "Frontend",
            SkillCategory::Backend => "Backend",
            SkillCategory::Database => "Database",
            SkillCategory::Devops => "DevOps",
            SkillCategory::Mobile => "Mobile",
            SkillCategory::Design => "Design",
            SkillCategory::Other => "Other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.display_name().eq_ignore_ascii_case(s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum ProficiencyLevel {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl ProficiencyLevel {
    pub fn display_name(&self) -> &'static str {
        match self {
            ProficiencyLevel::Beginner => "Beginner",
            ProficiencyLevel::Intermediate => "Intermediate",
            ProficiencyLevel::Advanced => "Advanced",
            ProficiencyLevel::Expert => "Expert",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "beginner" => Some(ProficiencyLevel::Beginner),
            "intermediate" => Some(ProficiencyLevel::Intermediate),
            "advanced" => Some(ProficiencyLevel::Advanced),
            "expert" => Some(ProficiencyLevel::Expert),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Skill {
    pub id: RecordId,
    pub name: String,
    pub category: SkillCategory,
    pub proficiency: ProficiencyLevel,
    #[serde(default, alias = "yearsOfExperience")]
    pub years_of_experience: u32,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "updatedAt")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Skill {
    pub fn experience_display(&self) -> String {
        match self.years_of_experience {
            0 => "< 1 year".to_string(),
            1 => "1 year".to_string(),
            n => format!("{} years", n),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewSkill {
    pub name: String,
    pub category: SkillCategory,
    pub proficiency: ProficiencyLevel,
    pub years_of_experience: u32,
}

/// Partial update; only `Some` fields are sent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SkillUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<SkillCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proficiency: Option<ProficiencyLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub years_of_experience: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skill() {
        let json = r#"{"id": 3, "name": "Rust", "category": "backend", "proficiency": "advanced",
            "years_of_experience": 4, "created_at": "2024-01-01T00:00:00Z", "updated_at": "2024-01-02T00:00:00Z"}"#;
        let skill: Skill = serde_json::from_str(json).unwrap();
        assert_eq!(skill.category, SkillCategory::Backend);
        assert_eq!(skill.proficiency, ProficiencyLevel::Advanced);
        assert_eq!(skill.experience_display(), "4 years");
    }

    #[test]
    fn test_unknown_category_is_other() {
        let json = r#"{"id": 1, "name": "Juggling", "category": "circus", "proficiency": "beginner"}"#;
        let skill: Skill = serde_json::from_str(json).unwrap();
        assert_eq!(skill.category, SkillCategory::Other);
        assert_eq!(skill.years_of_experience, 0);
    }

    #[test]
    fn test_update_only_sends_set_fields() {
        let update = SkillUpdate {
            proficiency: Some(ProficiencyLevel::Expert),
            ..Default::default()
        };
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value, serde_json::json!({"proficiency": "expert"}));
    }

    #[test]
    fn test_category_from_str() {
        assert_eq!(SkillCategory::from_str("devops"), Some(SkillCategory::Devops));
        assert_eq!(SkillCategory::from_str("DevOps"), Some(SkillCategory::Devops));
        assert_eq!(SkillCategory::from_str("nope"), None);
    }
}
