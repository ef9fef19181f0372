use crate::hub::Hub;
use crate::protocol::{MessageType, WireMessage};
use chrono::{DateTime, Utc};
use pdl_core::config::Config;
use pdl_core::project::Project;
use pdl_core::selector::SelectionInfo;
use pdl_core::Engine;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub root: PathBuf,
    pub engine: Arc<Engine>,
    pub hub: Arc<Hub>,
    pub storage: Arc<SelectionInfo>,
    pub config: Arc<Config>,
    /// Last `updated_at` this process has announced, per project.
    seen: Arc<Mutex<HashMap<String, DateTime<Utc>>>>,
}

impl AppState {
    pub fn new(root: PathBuf, engine: Arc<Engine>, storage: SelectionInfo, config: Config) -> Self {
        Self {
            root,
            engine,
            hub: Arc::new(Hub::new()),
            storage: Arc::new(storage),
            config: Arc::new(config),
            seen: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Remember `project`'s version. Returns true when it is newer than the
    /// last one recorded.
    pub(crate) fn mark_seen(&self, project: &Project) -> bool {
        let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        match seen.get(&project.name) {
            Some(at) if *at >= project.updated_at => false,
            _ => {
                seen.insert(project.name.clone(), project.updated_at);
                true
            }
        }
    }

    /// Publish the result of a committed operation, then the activity entry
    /// it produced. Runs detached: the caller's response does not wait for
    /// fan-out, and a storage failure here is logged and dropped.
    pub fn announce(
        &self,
        kind: MessageType,
        project: &str,
        action: &str,
        result: serde_json::Value,
    ) {
        if self.hub.subscriber_count(project) == 0 {
            return;
        }
        let app = self.clone();
        let project = project.to_string();
        let action = action.to_string();
        tokio::spawn(async move {
            let update = WireMessage::new(
                kind,
                serde_json::json!({ "action": action, "result": result }),
            )
            .for_project(&project);
            app.hub.publish(&project, update);

            let engine = app.engine.clone();
            let name = project.clone();
            let loaded = tokio::task::spawn_blocking(move || engine.project(&name)).await;
            match loaded {
                Ok(Ok(p)) => {
                    app.mark_seen(&p);
                    if let Some(entry) = p.activity.last() {
                        let log = WireMessage::new(
                            MessageType::LogUpdate,
                            serde_json::to_value(entry).unwrap_or_default(),
                        )
                        .for_project(&project);
                        app.hub.publish(&project, log);
                    }
                }
                Ok(Err(e)) => {
                    tracing::warn!(project = %project, error = %e, "could not load activity for broadcast");
                }
                Err(e) => {
                    tracing::warn!(project = %project, error = %e, "broadcast task failed");
                }
            }
        });
    }

    /// Start the heartbeat and the external-change watcher.
    pub fn spawn_background(&self) {
        let hub = self.hub.clone();
        let every = Duration::from_secs(self.config.server.heartbeat_secs.max(1));
        let timeout = Duration::from_secs(self.config.server.heartbeat_timeout_secs);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(every);
            loop {
                tick.tick().await;
                for id in hub.reap_idle(timeout) {
                    tracing::info!(connection = %id, "observer timed out");
                }
                hub.ping_all();
            }
        });

        let app = self.clone();
        let every = Duration::from_millis(self.config.server.watch_interval_ms.max(50));
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(every);
            loop {
                tick.tick().await;
                app.check_external_changes().await;
            }
        });
    }

    /// Announce a snapshot of every subscribed project whose `updated_at`
    /// moved without this process committing it.
    pub async fn check_external_changes(&self) {
        for name in self.hub.subscribed_projects() {
            let engine = self.engine.clone();
            let key = name.clone();
            let loaded = tokio::task::spawn_blocking(move || engine.project(&key)).await;
            let project = match loaded {
                Ok(Ok(p)) => p,
                Ok(Err(e)) if e.is_not_found() => continue,
                Ok(Err(e)) => {
                    tracing::warn!(project = %name, error = %e, "watcher could not load project");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(project = %name, error = %e, "watcher task failed");
                    continue;
                }
            };
            if self.mark_seen(&project) {
                tracing::debug!(project = %name, "external change detected");
                let msg = WireMessage::new(
                    MessageType::ProjectUpdate,
                    serde_json::to_value(&project).unwrap_or_default(),
                )
                .for_project(&name);
                self.hub.publish(&name, msg);
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::app_state;
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn mark_seen_only_advances() {
        let dir = TempDir::new().unwrap();
        let app = app_state(dir.path());
        let mut p = Project::new("alpha");
        assert!(app.mark_seen(&p));
        assert!(!app.mark_seen(&p));
        p.updated_at += chrono::Duration::seconds(1);
        assert!(app.mark_seen(&p));
    }

    #[tokio::test]
    async fn watcher_announces_external_commits_once() {
        let dir = TempDir::new().unwrap();
        let app = app_state(dir.path());
        app.engine.create_project("alpha", None, None).unwrap();
        let (id, mut rx) = app.hub.connect();
        app.hub.subscribe(&id, "alpha");

        // First sighting only records the version.
        app.check_external_changes().await;
        assert!(rx.try_recv().is_err());

        // Another process writes through its own engine.
        let other = Engine::new(Arc::new(pdl_core::store::PrivateStore::new(dir.path())));
        let spec = pdl_core::phase::PhaseSpec {
            phase_name: "Discovery".into(),
            ..Default::default()
        };
        other.insert_phase("alpha", spec, None).unwrap();

        app.check_external_changes().await;
        let msg = rx.try_recv().unwrap();
        assert_eq!(msg.kind, MessageType::ProjectUpdate);
        assert_eq!(msg.payload["roadmap"]["phases"].as_array().unwrap().len(), 1);

        app.check_external_changes().await;
        assert!(rx.try_recv().is_err());
    }
}
