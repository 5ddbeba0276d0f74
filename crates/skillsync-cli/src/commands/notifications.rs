use anyhow::Result;

use skillsync_core::models::RecordId;

use super::{print_json, truncate, Context};

pub async fn list(ctx: &Context, count_only: bool) -> Result<()> {
    ctx.require_session()?;

    if count_only {
        let unread = ctx.check(ctx.api.unread_notifications().await)?;
        return if ctx.json {
            print_json(&serde_json::json!({ "unread": unread }))
        } else {
            println!("{} unread", unread);
            Ok(())
        };
    }

    let notifications = ctx.check(ctx.api.notifications().await)?;
    if ctx.json {
        return print_json(&notifications);
    }
    if notifications.is_empty() {
        println!("No notifications");
        return Ok(());
    }

    for n in &notifications {
        let marker = if n.is_read { " " } else { "*" };
        let when = n
            .created_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!("{} {:<6} {:<16} {}", marker, n.id.to_string(), when, n.title);
        if !n.message.is_empty() {
            println!("         {}", truncate(&n.message, 70));
        }
    }
    let unread = notifications.iter().filter(|n| !n.is_read).count();
    println!("Total: {} ({} unread)", notifications.len(), unread);
    Ok(())
}

pub async fn read(ctx: &Context, id: &RecordId) -> Result<()> {
    ctx.require_session()?;
    ctx.check(ctx.api.mark_notification_read(id).await)?;
    ctx.done(&format!("Marked notification {} read", id))
}

pub async fn read_all(ctx: &Context) -> Result<()> {
    ctx.require_session()?;
    ctx.check(ctx.api.mark_all_notifications_read().await)?;
    ctx.done("Marked all notifications read")
}
