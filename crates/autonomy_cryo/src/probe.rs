//! `SystemResourceProbe`: a `ResourceProbe` backed by `sysinfo` (CPU load
//! and a running-process blacklist). No GPU/VRAM telemetry crate is
//! pulled in — `gpu_util`/`vram_mb` stay at zero, so a `cryostasis.gpu_pct`
//! or `vram_mb` threshold below 100%/the default never fires on its own
//! here; operators running on GPU-backed inference should supply their own
//! `ResourceProbe` and wire it in place of this one.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use autonomy_core::traits::{ResourceProbe, ResourceSample};

pub struct SystemResourceProbe {
    system: Mutex<sysinfo::System>,
    blacklist: Vec<String>,
}

impl SystemResourceProbe {
    pub fn new(blacklist: Vec<String>) -> Arc<Self> {
        Arc::new(Self {
            system: Mutex::new(sysinfo::System::new_all()),
            blacklist: blacklist.into_iter().map(|s| s.to_lowercase()).collect(),
        })
    }
}

#[async_trait]
impl ResourceProbe for SystemResourceProbe {
    async fn sample(&self) -> anyhow::Result<ResourceSample> {
        let mut system = self.system.lock().await;
        system.refresh_cpu_usage();
        system.refresh_processes(sysinfo::ProcessesToUpdate::All, true);

        let cpu_util = system.global_cpu_usage();
        let blacklist_hit = !self.blacklist.is_empty()
            && system.processes().values().any(|process| {
                let name = process.name().to_string_lossy().to_lowercase();
                self.blacklist.iter().any(|b| name.contains(b.as_str()))
            });

        Ok(ResourceSample {
            gpu_util: 0.0,
            vram_mb: 0.0,
            cpu_util,
            blacklist_hit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sampling_never_panics_and_reports_cpu() {
        let probe = SystemResourceProbe::new(Vec::new());
        let sample = probe.sample().await.unwrap();
        assert!(sample.cpu_util >= 0.0);
        assert!(!sample.blacklist_hit);
    }

    #[tokio::test]
    async fn blacklist_never_matches_on_an_empty_list() {
        let probe = SystemResourceProbe::new(Vec::new());
        let sample = probe.sample().await.unwrap();
        assert!(!sample.blacklist_hit);
    }
}
