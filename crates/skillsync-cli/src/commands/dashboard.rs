use anyhow::Result;

use super::{print_json, Context};

pub async fn show(ctx: &Context, activity_limit: usize, with_progress: bool) -> Result<()> {
    ctx.require_session()?;
    let mut stats = ctx.check(ctx.api.dashboard_stats().await)?;
    stats.recent_activity.truncate(activity_limit);
    let progress = if with_progress {
        Some(ctx.check(ctx.api.dashboard_progress().await)?)
    } else {
        None
    };

    if ctx.json {
        return print_json(&serde_json::json!({
            "stats": stats,
            "progress": progress,
        }));
    }

    println!("Skills:   {}", stats.total_skills);
    println!(
        "Projects: {} ({} active, {} completed)",
        stats.total_projects, stats.active_projects, stats.completed_projects
    );

    if !stats.skills_by_category.is_empty() {
        println!();
        println!("Skills by category:");
        for (category, count) in &stats.skills_by_category {
            println!("  {:<12} {}", category, count);
        }
    }

    if let Some(progress) = progress {
        println!();
        println!(
            "Overall progress: {}% ({}/{} projects finished)",
            progress.overall_progress, progress.milestones_completed, progress.milestones_total
        );
    }

    println!();
    if stats.recent_activity.is_empty() {
        println!("No recent activity");
    } else {
        println!("Recent activity:");
        for item in &stats.recent_activity {
            println!("  {}  {:<16} {}", item.timestamp, item.kind.display_name(), item.title);
        }
    }
    Ok(())
}
