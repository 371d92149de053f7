//! Session records and the context they carry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::CacheConfig;
use crate::size;

/// How much a conversation entry matters when history is trimmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    Low,
    Medium,
    High,
}

impl Importance {
    /// Weight used by the trim score: high 3, medium 2, low 1.
    pub fn weight(self) -> f64 {
        match self {
            Importance::Low => 1.0,
            Importance::Medium => 2.0,
            Importance::High => 3.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Importance::Low => "low",
            Importance::Medium => "medium",
            Importance::High => "high",
        }
    }
}

impl std::fmt::Display for Importance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Importance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Importance::Low),
            "medium" => Ok(Importance::Medium),
            "high" => Ok(Importance::High),
            other => Err(format!("unknown importance '{other}'")),
        }
    }
}

/// One summarized conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub timestamp: DateTime<Utc>,
    pub topic: String,
    pub summary: String,
    pub importance: Importance,
    /// Rough token count of `topic` + `summary`.
    pub estimated_tokens: usize,
}

impl ConversationEntry {
    pub fn new(
        topic: impl Into<String>,
        summary: impl Into<String>,
        importance: Importance,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let topic = topic.into();
        let summary = summary.into();
        let estimated_tokens = size::estimate_tokens(&topic, &summary);
        Self {
            timestamp,
            topic,
            summary,
            importance,
            estimated_tokens,
        }
    }
}

/// Caller-maintained preferences for a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub preferred_model: String,
    pub project_context: Vec<String>,
    pub current_workflow: Option<String>,
    pub recent_actions: Vec<String>,
}

/// Caller-maintained project state. Opaque to the cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectState {
    pub active_projects: Vec<String>,
    pub recent_files: Vec<String>,
    pub current_tasks: Vec<String>,
    pub integrations: Vec<String>,
}

/// Memory bookkeeping, owned by the cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub total_size_bytes: usize,
    pub last_pruned_at: Option<DateTime<Utc>>,
    pub priority_score: f64,
}

/// Everything the cache knows about a session besides its history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    pub session_id: String,
    pub preferences: UserPreferences,
    pub project_state: ProjectState,
    pub memory_usage: MemoryUsage,
}

/// Unit of storage and eviction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub context: SessionContext,
    pub history: Vec<ConversationEntry>,
    pub last_updated_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub access_count: u64,
}

impl SessionRecord {
    /// Build a fresh record with the configured defaults and a computed size.
    pub(crate) fn new(session_id: &str, config: &CacheConfig, now: DateTime<Utc>) -> Self {
        let mut record = Self {
            session_id: session_id.to_string(),
            context: SessionContext {
                session_id: session_id.to_string(),
                preferences: UserPreferences {
                    preferred_model: config.default_preferred_model.clone(),
                    ..Default::default()
                },
                project_state: ProjectState {
                    integrations: config.default_integrations.clone(),
                    ..Default::default()
                },
                memory_usage: MemoryUsage::default(),
            },
            history: Vec::new(),
            last_updated_at: now,
            last_accessed_at: now,
            access_count: 0,
        };
        record.refresh_size();
        record
    }

    /// Current recorded size in bytes.
    pub fn size_bytes(&self) -> usize {
        self.context.memory_usage.total_size_bytes
    }

    /// Recompute `total_size_bytes` and return the new value.
    pub(crate) fn refresh_size(&mut self) -> usize {
        let bytes = size::record_size(self);
        self.context.memory_usage.total_size_bytes = bytes;
        bytes
    }

    /// Whether the record has gone untouched for longer than `max_age`.
    pub(crate) fn is_expired(&self, config: &CacheConfig, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.last_updated_at) > config.max_age_delta()
    }
}

/// Replacement values for [`UserPreferences`]; `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreferencesPatch {
    pub preferred_model: Option<String>,
    pub project_context: Option<Vec<String>>,
    /// `Some(None)` clears the workflow.
    pub current_workflow: Option<Option<String>>,
    pub recent_actions: Option<Vec<String>>,
}

impl PreferencesPatch {
    fn apply(self, prefs: &mut UserPreferences) {
        if let Some(model) = self.preferred_model {
            prefs.preferred_model = model;
        }
        if let Some(context) = self.project_context {
            prefs.project_context = context;
        }
        if let Some(workflow) = self.current_workflow {
            prefs.current_workflow = workflow;
        }
        if let Some(actions) = self.recent_actions {
            prefs.recent_actions = actions;
        }
    }
}

/// Replacement values for [`ProjectState`]; `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectStatePatch {
    pub active_projects: Option<Vec<String>>,
    pub recent_files: Option<Vec<String>>,
    pub current_tasks: Option<Vec<String>>,
    pub integrations: Option<Vec<String>>,
}

impl ProjectStatePatch {
    fn apply(self, state: &mut ProjectState) {
        if let Some(projects) = self.active_projects {
            state.active_projects = projects;
        }
        if let Some(files) = self.recent_files {
            state.recent_files = files;
        }
        if let Some(tasks) = self.current_tasks {
            state.current_tasks = tasks;
        }
        if let Some(integrations) = self.integrations {
            state.integrations = integrations;
        }
    }
}

/// Partial update for a session's context.
///
/// Present fields replace the stored value wholesale; lists are never
/// appended to or merged element-wise.
///
/// ```rust,ignore
/// let patch = ContextPatch::new()
///     .workflow("invoice-review")
///     .active_projects(["billing"]);
/// cache.update("session-1", patch);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextPatch {
    /// Changes to user preferences.
    pub preferences: Option<PreferencesPatch>,
    /// Changes to project state.
    pub project_state: Option<ProjectStatePatch>,
}

fn strings<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

impl ContextPatch {
    /// An empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when applying the patch would change nothing.
    pub fn is_empty(&self) -> bool {
        self.preferences.is_none() && self.project_state.is_none()
    }

    fn prefs(&mut self) -> &mut PreferencesPatch {
        self.preferences.get_or_insert_with(Default::default)
    }

    fn project(&mut self) -> &mut ProjectStatePatch {
        self.project_state.get_or_insert_with(Default::default)
    }

    /// Set the preferred model.
    pub fn preferred_model(mut self, model: impl Into<String>) -> Self {
        self.prefs().preferred_model = Some(model.into());
        self
    }

    /// Replace the project context list.
    pub fn project_context<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prefs().project_context = Some(strings(items));
        self
    }

    /// Set the current workflow label.
    pub fn workflow(mut self, label: impl Into<String>) -> Self {
        self.prefs().current_workflow = Some(Some(label.into()));
        self
    }

    /// Clear the current workflow.
    pub fn clear_workflow(mut self) -> Self {
        self.prefs().current_workflow = Some(None);
        self
    }

    /// Replace the recent actions list.
    pub fn recent_actions<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prefs().recent_actions = Some(strings(items));
        self
    }

    /// Replace the active projects list.
    pub fn active_projects<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.project().active_projects = Some(strings(items));
        self
    }

    /// Replace the recent files list.
    pub fn recent_files<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.project().recent_files = Some(strings(items));
        self
    }

    /// Replace the current tasks list.
    pub fn current_tasks<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.project().current_tasks = Some(strings(items));
        self
    }

    /// Replace the enabled integrations.
    pub fn integrations<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.project().integrations = Some(strings(items));
        self
    }

    /// Apply the patch to a context in place.
    pub(crate) fn apply(self, context: &mut SessionContext) {
        if let Some(prefs) = self.preferences {
            prefs.apply(&mut context.preferences);
        }
        if let Some(state) = self.project_state {
            state.apply(&mut context.project_state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn context() -> SessionContext {
        SessionRecord::new("s1", &CacheConfig::default(), now()).context
    }

    #[test]
    fn test_new_record_defaults() {
        let record = SessionRecord::new("s1", &CacheConfig::default(), now());

        assert_eq!(record.access_count, 0);
        assert_eq!(record.context.session_id, "s1");
        assert_eq!(record.context.preferences.preferred_model, "auto");
        assert_eq!(
            record.context.project_state.integrations,
            vec!["stripe", "gmail", "telegram"]
        );
        assert!(record.size_bytes() > 0);
    }

    #[test]
    fn test_importance_parse_and_weight() {
        assert_eq!("HIGH".parse::<Importance>().unwrap(), Importance::High);
        assert!("urgent".parse::<Importance>().is_err());
        assert_eq!(Importance::Medium.weight(), 2.0);
        assert_eq!(Importance::Low.to_string(), "low");
    }

    #[test]
    fn test_patch_replaces_present_fields_only() {
        let mut ctx = context();
        ctx.preferences.recent_actions = vec!["a".into(), "b".into()];
        ctx.preferences.project_context = vec!["keep".into()];

        ContextPatch::new()
            .workflow("checkout")
            .recent_actions(["c"])
            .apply(&mut ctx);

        assert_eq!(ctx.preferences.current_workflow.as_deref(), Some("checkout"));
        assert_eq!(ctx.preferences.recent_actions, vec!["c"]);
        assert_eq!(ctx.preferences.project_context, vec!["keep"]);
        assert_eq!(ctx.preferences.preferred_model, "auto");
        assert_eq!(
            ctx.project_state.integrations,
            vec!["stripe", "gmail", "telegram"]
        );
    }

    #[test]
    fn test_patch_replaces_lists_wholesale() {
        let mut ctx = context();

        ContextPatch::new().integrations(["slack"]).apply(&mut ctx);

        assert_eq!(ctx.project_state.integrations, vec!["slack"]);
    }

    #[test]
    fn test_patch_clears_workflow() {
        let mut ctx = context();
        ctx.preferences.current_workflow = Some("old".into());

        ContextPatch::new().clear_workflow().apply(&mut ctx);

        assert_eq!(ctx.preferences.current_workflow, None);
    }

    #[test]
    fn test_empty_patch() {
        assert!(ContextPatch::new().is_empty());
        assert!(!ContextPatch::new().current_tasks(["t"]).is_empty());
    }
}
