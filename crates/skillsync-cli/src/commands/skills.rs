use anyhow::Result;

use skillsync_core::models::{NewSkill, ProficiencyLevel, RecordId, SkillCategory};

use super::{print_json, truncate, Context};

pub async fn list(ctx: &Context, category: Option<SkillCategory>) -> Result<()> {
    ctx.require_session()?;
    let mut skills = ctx.check(ctx.api.list_skills().await)?;
    if let Some(category) = category {
        skills.retain(|s| s.category == category);
    }

    if ctx.json {
        return print_json(&skills);
    }
    if skills.is_empty() {
        println!("No skills yet. Add one with `skillsync skills add <name>`.");
        return Ok(());
    }

    println!("{:<8} {:<28} {:<10} {:<13} EXPERIENCE", "ID", "NAME", "CATEGORY", "LEVEL");
    for skill in &skills {
        println!(
            "{:<8} {:<28} {:<10} {:<13} {}",
            skill.id.to_string(),
            truncate(&skill.name, 28),
            skill.category.display_name(),
            skill.proficiency.display_name(),
            skill.experience_display()
        );
    }
    println!("Total: {} skill(s)", skills.len());
    Ok(())
}

pub async fn add(
    ctx: &Context,
    name: String,
    category: SkillCategory,
    proficiency: ProficiencyLevel,
    years_of_experience: u32,
) -> Result<()> {
    ctx.require_session()?;
    let skill = ctx.check(
        ctx.api
            .create_skill(&NewSkill {
                name,
                category,
                proficiency,
                years_of_experience,
            })
            .await,
    )?;

    if ctx.json {
        print_json(&skill)
    } else {
        println!("Added skill {} (id {})", skill.name, skill.id);
        Ok(())
    }
}

pub async fn remove(ctx: &Context, id: &RecordId) -> Result<()> {
    ctx.require_session()?;
    ctx.check(ctx.api.delete_skill(id).await)?;
    ctx.done(&format!("Removed skill {}", id))
}
