//! Best-effort report of the outputs a pipeline left in session state.

use console::style;

use crate::api::{Agent, SessionKey, SessionStore};

/// One declared output and what the session holds for it.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportEntry {
    pub author: String,
    pub key: String,
    pub value: Option<String>,
}

/// Reads an agent's declared output keys back from session state.
pub struct Reporter<'a> {
    store: &'a dyn SessionStore,
}

impl<'a> Reporter<'a> {
    pub fn new(store: &'a dyn SessionStore) -> Self {
        Self { store }
    }

    /// Looks up every output key of `agent`. Missing keys are logged, never fatal.
    pub fn collect(&self, session: &SessionKey, agent: &Agent) -> Vec<ReportEntry> {
        tracing::info!(session_id = %session.session_id, "retrieving pipeline outputs");

        if let Err(e) = self.store.get_session(session) {
            tracing::error!(
                error = %e,
                session_id = %session.session_id,
                "could not retrieve session"
            );
            return Vec::new();
        }

        agent
            .steps()
            .into_iter()
            .map(|step| {
                let value = match self.store.get_string(session, step.output_key()) {
                    Ok(text) => {
                        tracing::info!(
                            key = step.output_key(),
                            length = text.len(),
                            "retrieved output"
                        );
                        tracing::debug!(key = step.output_key(), content = %text, "output content");
                        Some(text)
                    }
                    Err(e) => {
                        tracing::error!(
                            key = step.output_key(),
                            error = %e,
                            "output not found in session state"
                        );
                        None
                    }
                };
                ReportEntry {
                    author: step.name().to_string(),
                    key: step.output_key().to_string(),
                    value,
                }
            })
            .collect()
    }

    /// Collects and prints the outputs to stdout.
    pub fn print(&self, session: &SessionKey, agent: &Agent) -> Vec<ReportEntry> {
        let entries = self.collect(session, agent);
        print!("{}", render(&entries));
        entries
    }
}

/// Formats the present entries; missing ones are left to the log.
pub fn render(entries: &[ReportEntry]) -> String {
    let rule = "-".repeat(80);
    let mut out = format!("\n{}\nAgent Outputs (from Session State):\n{}\n", rule, rule);
    for entry in entries {
        if let Some(value) = &entry.value {
            out.push_str(&format!(
                "\n{} Output:\n{}\n",
                style(format!("[{}]", entry.author)).cyan().bold(),
                value
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{InMemorySessionStore, LlmStep, SequentialPipeline};
    use serde_json::json;

    fn agent() -> Agent {
        let outline = LlmStep::builder("OutlineAgent")
            .output_key("outline")
            .build()
            .unwrap();
        let writer = LlmStep::builder("WriterAgent")
            .input_key("outline")
            .output_key("draft")
            .build()
            .unwrap();
        SequentialPipeline::builder("Blog")
            .agent(outline)
            .agent(writer)
            .build()
            .unwrap()
            .into()
    }

    #[test]
    fn missing_keys_are_reported_as_absent() {
        let store = InMemorySessionStore::new();
        let session = store.create("app", "user", None).unwrap();
        store.set(&session.key, "outline", json!("1. Hook")).unwrap();

        let entries = Reporter::new(&store).collect(&session.key, &agent());
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].value.as_deref(), Some("1. Hook"));
        assert_eq!(entries[1].key, "draft");
        assert_eq!(entries[1].value, None);

        let text = console::strip_ansi_codes(&render(&entries)).to_string();
        assert!(text.contains("[OutlineAgent] Output:\n1. Hook"));
        assert!(!text.contains("WriterAgent"));
    }

    #[test]
    fn unknown_session_yields_no_entries() {
        let store = InMemorySessionStore::new();
        let ghost = SessionKey::new("app", "user", "ghost");
        assert!(Reporter::new(&store).collect(&ghost, &agent()).is_empty());
    }
}
