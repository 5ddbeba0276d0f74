use anyhow::{anyhow, Result};

use skillsync_core::models::{NewProject, ProjectStatus, RecordId};

use super::{print_json, truncate, Context};

pub async fn list(ctx: &Context, status: Option<ProjectStatus>) -> Result<()> {
    ctx.require_session()?;
    let mut projects = ctx.check(ctx.api.list_projects().await)?;
    if let Some(status) = status {
        projects.retain(|p| p.status == status);
    }

    if ctx.json {
        return print_json(&projects);
    }
    if projects.is_empty() {
        println!("No projects found");
        return Ok(());
    }

    println!("{:<8} {:<32} {:<12} MILESTONES", "ID", "TITLE", "STATUS");
    for project in &projects {
        let milestones = match project.completion_percent() {
            Some(percent) => format!(
                "{}/{} ({}%)",
                project.completed_milestones(),
                project.milestones.len(),
                percent
            ),
            None => "-".to_string(),
        };
        println!(
            "{:<8} {:<32} {:<12} {}",
            project.id.to_string(),
            truncate(&project.title, 32),
            project.status.display_name(),
            milestones
        );
    }
    println!("Total: {} project(s)", projects.len());
    Ok(())
}

pub async fn show(ctx: &Context, id: &RecordId) -> Result<()> {
    ctx.require_session()?;
    let project = ctx.check(ctx.api.get_project(id).await)?;

    if ctx.json {
        return print_json(&project);
    }

    println!("{} [{}]", project.title, project.status.display_name());
    if !project.description.is_empty() {
        println!("  {}", project.description);
    }
    if let Some(start) = project.start_date {
        match project.end_date {
            Some(end) => println!("  {} to {}", start, end),
            None => println!("  Started {}", start),
        }
    }
    if project.milestones.is_empty() {
        println!("  No milestones");
    } else {
        println!("  Milestones:");
        for milestone in &project.milestones {
            let mark = if milestone.completed { "x" } else { " " };
            println!("    [{}] {} (id {})", mark, milestone.title, milestone.id);
        }
    }
    Ok(())
}

pub async fn add(ctx: &Context, title: String, description: String, status: ProjectStatus) -> Result<()> {
    ctx.require_session()?;
    let project = ctx.check(
        ctx.api
            .create_project(&NewProject {
                title,
                description,
                status,
            })
            .await,
    )?;

    if ctx.json {
        print_json(&project)
    } else {
        println!("Added project {} (id {})", project.title, project.id);
        Ok(())
    }
}

pub async fn remove(ctx: &Context, id: &RecordId) -> Result<()> {
    ctx.require_session()?;
    ctx.check(ctx.api.delete_project(id).await)?;
    ctx.done(&format!("Removed project {}", id))
}

pub async fn toggle(ctx: &Context, project_id: &RecordId, milestone_id: &RecordId) -> Result<()> {
    ctx.require_session()?;
    let toggle = ctx
        .check(ctx.api.toggle_milestone(project_id, milestone_id).await)
        .map_err(|e| anyhow!("Could not toggle milestone {} of project {}: {:#}", milestone_id, project_id, e))?;

    if ctx.json {
        return print_json(&serde_json::json!({
            "project": project_id,
            "milestone": milestone_id,
            "is_completed": toggle.is_completed,
        }));
    }
    let state = if toggle.is_completed { "complete" } else { "not complete" };
    println!("Milestone {} is now {}", milestone_id, state);
    Ok(())
}
