//! BDI Engine: time-decaying needs, desire evaluation, intention formation
//! and execution (§4.6).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use autonomy_core::event_bus::EventBus;
use autonomy_core::events::{Event, EventPayload, ProactiveImpulse};
use autonomy_core::need::Need;
use autonomy_core::persist::{atomic_write_json, load_json_or_default};

const CURRENT_VERSION: u32 = 1;

/// `{action, motivation, priority, created_at, executed}`. Not persisted;
/// re-derived from needs after restart.
#[derive(Debug, Clone)]
pub struct Intention {
    pub action: String,
    pub motivation: String,
    pub priority: f32,
    pub created_at: DateTime<Utc>,
    pub executed: bool,
}

#[derive(Debug, Clone, Copy)]
struct DesireSpec {
    need: &'static str,
    desire: &'static str,
    action: &'static str,
    priority: f32,
    satisfies: f32,
    trigger_reason: &'static str,
}

const DESIRE_TABLE: &[DesireSpec] = &[
    DesireSpec {
        need: "social",
        desire: "seek_interaction",
        action: "initiate_conversation",
        priority: 0.7,
        satisfies: 0.5,
        trigger_reason: "haven't talked in a while...",
    },
    DesireSpec {
        need: "affiliation",
        desire: "strengthen_bond",
        action: "share_thought",
        priority: 0.6,
        satisfies: 0.4,
        trigger_reason: "feeling distant, want to reconnect",
    },
    DesireSpec {
        need: "curiosity",
        desire: "seek_knowledge",
        action: "ask_question",
        priority: 0.5,
        satisfies: 0.3,
        trigger_reason: "curious about something",
    },
];

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedNeed {
    value: f32,
    last_satisfied: DateTime<Utc>,
    last_decay: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedState {
    timestamp: DateTime<Utc>,
    needs: HashMap<String, PersistedNeed>,
    last_action: Option<DateTime<Utc>>,
    version: u32,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            timestamp: Utc::now(),
            needs: HashMap::new(),
            last_action: None,
            version: CURRENT_VERSION,
        }
    }
}

struct EngineInner {
    needs: HashMap<String, Need>,
    intentions: Vec<Intention>,
    last_action: Option<DateTime<Utc>>,
}

/// Canonical need set: `{social, curiosity, affiliation}` (§3, §9 — energy
/// is treated as an optional extension and omitted here: `check_willpower`'s
/// default behavior disables energy-gating outright).
pub struct BdiEngine {
    inner: RwLock<EngineInner>,
    min_interval_minutes: i64,
    state_path: PathBuf,
    events: Arc<EventBus>,
}

impl BdiEngine {
    pub fn new(min_interval_minutes: i64, state_path: PathBuf, events: Arc<EventBus>) -> Self {
        let persisted: PersistedState = load_json_or_default(&state_path);
        let mut needs = HashMap::new();
        for spec in DESIRE_TABLE {
            let mut need = Need::new(spec.need, default_decay_rate(spec.need), 0.7);
            if let Some(p) = persisted.needs.get(spec.need) {
                need.value = p.value.clamp(0.0, 1.0);
                need.last_satisfied = p.last_satisfied;
                need.last_decay = p.last_decay;
            }
            needs.insert(spec.need.to_string(), need);
        }
        Self {
            inner: RwLock::new(EngineInner {
                needs,
                intentions: Vec::new(),
                last_action: persisted.last_action,
            }),
            min_interval_minutes,
            state_path,
            events,
        }
    }

    pub async fn get_need_state(&self) -> HashMap<String, f32> {
        self.inner
            .read()
            .await
            .needs
            .iter()
            .map(|(k, v)| (k.clone(), v.value))
            .collect()
    }

    /// `update_need(name, delta)`: externally observed post-interaction
    /// consequence (§4.6).
    pub async fn update_need(&self, name: &str, delta: f32) {
        let mut guard = self.inner.write().await;
        let now = Utc::now();
        if let Some(need) = guard.needs.get_mut(name) {
            need.update(delta, now);
        }
        self.persist(&guard);
    }

    /// `check_willpower(task_cost) -> (bool, reason)`. Energy-gating is
    /// disabled by default: always returns `(true, "")`.
    pub async fn check_willpower(&self, _task_cost: f32) -> (bool, String) {
        (true, String::new())
    }

    /// One tick of the BDI loop body (§4.6): decay, evaluate desires, form
    /// at most one intention, execute the head of the queue (satisfying the
    /// motivating need by the desire's `satisfies` amount and publishing the
    /// impulse).
    pub async fn tick(&self) {
        let now = Utc::now();
        let mut guard = self.inner.write().await;

        for need in guard.needs.values_mut() {
            need.decay(now);
        }

        let triggered: Vec<&DesireSpec> = DESIRE_TABLE
            .iter()
            .filter(|spec| guard.needs.get(spec.need).map(|n| n.is_triggered()).unwrap_or(false))
            .collect();

        let cooldown_elapsed = guard
            .last_action
            .map(|last| (now - last).num_minutes() >= self.min_interval_minutes)
            .unwrap_or(true);

        if cooldown_elapsed {
            if let Some(spec) = triggered
                .iter()
                .max_by(|a, b| a.priority.partial_cmp(&b.priority).unwrap())
            {
                guard.intentions.push(Intention {
                    action: spec.action.to_string(),
                    motivation: spec.need.to_string(),
                    priority: spec.priority,
                    created_at: now,
                    executed: false,
                });
            }
        }

        guard
            .intentions
            .sort_by(|a, b| b.priority.partial_cmp(&a.priority).unwrap());

        let to_execute = guard.intentions.iter().position(|i| !i.executed);
        if let Some(idx) = to_execute {
            let spec = DESIRE_TABLE
                .iter()
                .find(|s| s.action == guard.intentions[idx].action)
                .copied();
            let reason = spec.map(|s| s.trigger_reason.to_string()).unwrap_or_default();
            let priority = guard.intentions[idx].priority;
            guard.intentions[idx].executed = true;
            guard.intentions.retain(|i| !i.executed);
            guard.last_action = Some(now);
            if let Some(spec) = spec {
                if let Some(need) = guard.needs.get_mut(spec.need) {
                    need.satisfy(spec.satisfies, now);
                }
            }
            self.persist(&guard);
            drop(guard);

            self.events
                .publish(Event::new(EventPayload::ProactiveImpulse(ProactiveImpulse {
                    trigger_reason: reason,
                    confidence: priority,
                })))
                .await;
        } else {
            self.persist(&guard);
        }
    }

    fn persist(&self, guard: &EngineInner) {
        let needs = guard
            .needs
            .iter()
            .map(|(k, v)| {
                (
                    k.clone(),
                    PersistedNeed {
                        value: v.value,
                        last_satisfied: v.last_satisfied,
                        last_decay: v.last_decay,
                    },
                )
            })
            .collect();
        let persisted = PersistedState {
            timestamp: Utc::now(),
            needs,
            last_action: guard.last_action,
            version: CURRENT_VERSION,
        };
        if let Err(e) = atomic_write_json(&self.state_path, &persisted) {
            tracing::error!(error = %e, "failed to persist BDI state");
        }
    }
}

fn default_decay_rate(need: &str) -> f32 {
    match need {
        "social" => 0.1,
        "affiliation" => 0.05,
        "curiosity" => 0.08,
        _ => 0.05,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(min_interval: i64) -> (BdiEngine, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bdi_state.json");
        (BdiEngine::new(min_interval, path, Arc::new(EventBus::new())), dir)
    }

    #[tokio::test]
    async fn scenario_social_starvation_publishes_one_impulse_and_satisfies_need() {
        let (engine, _dir) = engine(60);
        {
            let mut guard = engine.inner.write().await;
            let need = guard.needs.get_mut("social").unwrap();
            need.value = 0.75;
            need.last_decay = Utc::now();
            guard.last_action = Some(Utc::now() - chrono::Duration::minutes(61));
        }

        let mut sub = tokio::sync::mpsc::unbounded_channel::<ProactiveImpulse>();
        struct Capture(tokio::sync::mpsc::UnboundedSender<ProactiveImpulse>);
        #[async_trait::async_trait]
        impl autonomy_core::event_bus::EventHandler for Capture {
            async fn handle(&self, event: &Event) -> anyhow::Result<()> {
                if let EventPayload::ProactiveImpulse(p) = &event.payload {
                    let _ = self.0.send(p.clone());
                }
                Ok(())
            }
        }
        engine
            .events
            .subscribe(
                autonomy_core::events::EventKind::ProactiveImpulse,
                Arc::new(Capture(sub.0.clone())),
            )
            .await;
        engine.events.start().await;

        engine.tick().await;

        let impulse = tokio::time::timeout(std::time::Duration::from_millis(200), sub.1.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(impulse.trigger_reason, "haven't talked in a while...");

        let needs = engine.get_need_state().await;
        assert!(needs["social"] <= 0.25);
    }

    #[tokio::test]
    async fn intention_formation_suppressed_within_cooldown() {
        let (engine, _dir) = engine(60);
        {
            let mut guard = engine.inner.write().await;
            guard.needs.get_mut("social").unwrap().value = 0.9;
            guard.last_action = Some(Utc::now() - chrono::Duration::minutes(10));
        }
        engine.tick().await;
        let guard = engine.inner.read().await;
        assert!(guard.intentions.is_empty());
    }

    #[tokio::test]
    async fn willpower_check_always_allows_by_default() {
        let (engine, _dir) = engine(60);
        let (ok, reason) = engine.check_willpower(0.9).await;
        assert!(ok);
        assert!(reason.is_empty());
    }

    #[tokio::test]
    async fn update_need_negative_satisfies_positive_raises() {
        let (engine, _dir) = engine(60);
        engine.update_need("curiosity", 0.4).await;
        let needs = engine.get_need_state().await;
        assert!((needs["curiosity"] - 0.4).abs() < 1e-6);
        engine.update_need("curiosity", -0.1).await;
        let needs = engine.get_need_state().await;
        assert!((needs["curiosity"] - 0.3).abs() < 1e-6);
    }

    #[tokio::test]
    async fn persistence_roundtrip_reproduces_need_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bdi_state.json");
        let events = Arc::new(EventBus::new());
        let engine = BdiEngine::new(60, path.clone(), events.clone());
        engine.update_need("social", 0.33).await;

        let engine2 = BdiEngine::new(60, path, events);
        let needs = engine2.get_need_state().await;
        assert!((needs["social"] - 0.33).abs() < 1e-6);
    }
}
