//! # Resource Gater (Cryostasis), §4.11
//!
//! A background loop consulting a `ResourceProbe`: hibernate if a
//! blacklisted process is running or any resource threshold is exceeded,
//! unloading the LLM and publishing `CryostasisActivated`; wake and publish
//! `CryostasisDeactivated` once resources clear, subject to a cooldown so
//! the gate can't thrash. Implements `HibernationGate` so the Cognitive
//! Orchestrator can coordinate wake/pause without depending on this crate
//! directly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use autonomy_core::event_bus::EventBus;
use autonomy_core::events::{
    CryostasisActivated, CryostasisDeactivated, Event, EventPayload, SystemResourceAlert,
};
use autonomy_core::traits::{HibernationGate, LlmClient, ResourceProbe};

pub mod probe;

pub use probe::SystemResourceProbe;

#[derive(Debug, Clone)]
pub struct CryostasisConfig {
    pub enabled: bool,
    pub poll_s: u64,
    pub gpu_pct: f32,
    pub cpu_pct: f32,
    pub vram_mb: f32,
    pub blacklist: Vec<String>,
    pub wake_cooldown_s: i64,
}

impl Default for CryostasisConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_s: 15,
            gpu_pct: 80.0,
            cpu_pct: 90.0,
            vram_mb: 6000.0,
            blacklist: Vec::new(),
            wake_cooldown_s: 10,
        }
    }
}

struct HibernationState {
    hibernating: AtomicBool,
    paused: AtomicBool,
    last_wake: Mutex<Option<DateTime<Utc>>>,
}

/// The Resource Gater. Construct with `Arc::new`, then call `spawn` to
/// start its monitoring loop.
pub struct Cryostasis {
    config: CryostasisConfig,
    probe: Arc<dyn ResourceProbe>,
    llm: Arc<dyn LlmClient>,
    events: Arc<EventBus>,
    state: HibernationState,
}

impl Cryostasis {
    pub fn new(
        config: CryostasisConfig,
        probe: Arc<dyn ResourceProbe>,
        llm: Arc<dyn LlmClient>,
        events: Arc<EventBus>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            probe,
            llm,
            events,
            state: HibernationState {
                hibernating: AtomicBool::new(false),
                paused: AtomicBool::new(false),
                last_wake: Mutex::new(None),
            },
        })
    }

    /// Spawn the background monitoring loop. No-op (returns `None`) if
    /// cryostasis is disabled in config.
    pub fn spawn(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if !self.config.enabled {
            info!("cryostasis disabled, monitoring loop not started");
            return None;
        }
        let this = Arc::clone(self);
        Some(tokio::spawn(async move { this.monitor_loop().await }))
    }

    async fn monitor_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(Duration::from_secs(self.config.poll_s));
        loop {
            ticker.tick().await;
            if self.state.paused.load(Ordering::SeqCst) {
                continue;
            }
            if let Err(e) = self.check_once().await {
                warn!(error = %e, "resource gater poll failed");
            }
        }
    }

    async fn check_once(&self) -> anyhow::Result<()> {
        let sample = self.probe.sample().await?;

        let reason = if sample.blacklist_hit {
            Some("blacklisted process running".to_string())
        } else if sample.gpu_util > self.config.gpu_pct {
            Some(format!("high GPU utilization: {:.0}%", sample.gpu_util))
        } else if sample.vram_mb > self.config.vram_mb {
            Some(format!("high VRAM usage: {:.0}MB", sample.vram_mb))
        } else if sample.cpu_util > self.config.cpu_pct {
            Some(format!("high CPU utilization: {:.0}%", sample.cpu_util))
        } else {
            None
        };

        let currently_hibernating = self.state.hibernating.load(Ordering::SeqCst);
        match (reason, currently_hibernating) {
            (Some(reason), false) => {
                if !sample.blacklist_hit {
                    self.alert(&sample, &reason).await;
                }
                self.hibernate(reason).await?;
            }
            (None, true) => {
                self.wake().await;
            }
            _ => {}
        }
        Ok(())
    }

    async fn alert(&self, sample: &autonomy_core::traits::ResourceSample, reason: &str) {
        let (resource, value, threshold) = if sample.gpu_util > self.config.gpu_pct {
            ("gpu_util", sample.gpu_util, self.config.gpu_pct)
        } else if sample.vram_mb > self.config.vram_mb {
            ("vram_mb", sample.vram_mb, self.config.vram_mb)
        } else {
            ("cpu_util", sample.cpu_util, self.config.cpu_pct)
        };
        self.events
            .publish(Event::new(EventPayload::SystemResourceAlert(SystemResourceAlert {
                resource: resource.to_string(),
                value,
                threshold,
                action: reason.to_string(),
            })))
            .await;
    }

    async fn hibernate(&self, reason: String) -> anyhow::Result<()> {
        warn!(%reason, "entering cryostasis");
        self.llm.unload().await?;
        self.state.hibernating.store(true, Ordering::SeqCst);
        self.events
            .publish(Event::new(EventPayload::CryostasisActivated(CryostasisActivated {
                reason,
                freed_mb: 0,
            })))
            .await;
        Ok(())
    }

    async fn wake(&self) -> bool {
        if !self.state.hibernating.swap(false, Ordering::SeqCst) {
            return true;
        }

        let mut last_wake = self.state.last_wake.lock().await;
        let now = Utc::now();
        if let Some(prev) = *last_wake {
            if (now - prev).num_seconds() < self.config.wake_cooldown_s {
                debug!("wake cooldown active, deferring");
                self.state.hibernating.store(true, Ordering::SeqCst);
                return false;
            }
        }
        *last_wake = Some(now);
        drop(last_wake);

        info!("exiting cryostasis");
        self.events
            .publish(Event::new(EventPayload::CryostasisDeactivated(CryostasisDeactivated {
                load_time_ms: 0,
            })))
            .await;
        true
    }
}

#[async_trait]
impl HibernationGate for Cryostasis {
    async fn is_hibernating(&self) -> bool {
        self.state.hibernating.load(Ordering::SeqCst)
    }

    async fn wake(&self) {
        Cryostasis::wake(self).await;
    }

    async fn pause_monitoring(&self) {
        self.state.paused.store(true, Ordering::SeqCst);
    }

    async fn resume_monitoring(&self) {
        self.state.paused.store(false, Ordering::SeqCst);
    }
}
