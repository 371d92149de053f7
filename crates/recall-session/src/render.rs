//! Plain-text digest of a session for prompt construction.

use std::fmt::Write;

use crate::model::SessionRecord;

fn push_list(out: &mut String, label: &str, items: &[String]) {
    if !items.is_empty() {
        let _ = writeln!(out, "- {label}: {}", items.join(", "));
    }
}

/// Render preferences, project state and the last `history_limit` entries.
pub fn render_record(record: &SessionRecord, history_limit: usize) -> String {
    let prefs = &record.context.preferences;
    let project = &record.context.project_state;
    let mut out = String::new();

    out.push_str("User preferences:\n");
    if !prefs.preferred_model.is_empty() {
        let _ = writeln!(out, "- Preferred model: {}", prefs.preferred_model);
    }
    if let Some(workflow) = prefs.current_workflow.as_deref() {
        let _ = writeln!(out, "- Current workflow: {workflow}");
    }
    push_list(&mut out, "Project context", &prefs.project_context);
    push_list(&mut out, "Recent actions", &prefs.recent_actions);

    let has_project = !(project.active_projects.is_empty()
        && project.recent_files.is_empty()
        && project.current_tasks.is_empty()
        && project.integrations.is_empty());
    if has_project {
        out.push_str("\nProject state:\n");
        push_list(&mut out, "Active projects", &project.active_projects);
        push_list(&mut out, "Recent files", &project.recent_files);
        push_list(&mut out, "Current tasks", &project.current_tasks);
        push_list(&mut out, "Integrations", &project.integrations);
    }

    let skip = record.history.len().saturating_sub(history_limit);
    let tail = &record.history[skip..];
    if !tail.is_empty() {
        out.push_str("\nRecent conversation:\n");
        for entry in tail {
            let _ = writeln!(
                out,
                "- [{}] {}: {}",
                entry.importance, entry.topic, entry.summary
            );
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::model::{ConversationEntry, Importance};
    use chrono::DateTime;

    fn record() -> SessionRecord {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let mut record = SessionRecord::new("s1", &CacheConfig::default(), now);
        for i in 0..4 {
            record.history.push(ConversationEntry::new(
                format!("topic-{i}"),
                format!("summary-{i}"),
                Importance::Medium,
                now,
            ));
        }
        record
    }

    #[test]
    fn test_renders_preferences_and_integrations() {
        let mut record = record();
        record.context.preferences.current_workflow = Some("refunds".into());
        record.context.project_state.active_projects = vec!["billing".into()];

        let text = render_record(&record, 5);

        assert!(text.contains("- Preferred model: auto"));
        assert!(text.contains("- Current workflow: refunds"));
        assert!(text.contains("- Active projects: billing"));
        assert!(text.contains("- Integrations: stripe, gmail, telegram"));
        assert!(!text.contains("Recent files"));
    }

    #[test]
    fn test_renders_only_history_tail() {
        let text = render_record(&record(), 2);

        assert!(!text.contains("topic-1"));
        assert!(text.contains("- [medium] topic-2: summary-2"));
        assert!(text.contains("- [medium] topic-3: summary-3"));
    }

    #[test]
    fn test_zero_limit_omits_history_section() {
        let text = render_record(&record(), 0);
        assert!(!text.contains("Recent conversation"));
    }
}
