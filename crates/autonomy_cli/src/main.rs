//! Bootstrap binary: wires every `autonomy_*` crate together into a running
//! agent and drives a line-oriented stdin/stdout transport.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use autonomy_core::config::Config;
use autonomy_core::event_bus::{EventBus, EventHandler};
use autonomy_core::events::{Event, EventKind, EventPayload, MessageReceived};
use autonomy_core::message::{Message, Role};
use autonomy_core::traits::{LlmClient, Transport};
use autonomy_cognition::{HttpLlmClient, MockLlmClient, Orchestrator, OrchestratorConfig};
use autonomy_cryo::{Cryostasis, CryostasisConfig as CryoConfig, SystemResourceProbe};
use autonomy_expression::{GovernorConfig, SpeechGovernor};
use autonomy_limbic::{BdiEngine, EmotionService, HeartbeatConfig};
use autonomy_memory::{BeliefStore, HierarchicalMemory, VectorStore};

const RESTART_GAP_SECONDS: i64 = 1800;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to TOML config file
    #[arg(short, long, default_value = "autonomy.toml")]
    config: String,

    /// Data directory (overrides config file's `data_dir`)
    #[arg(long)]
    data_dir: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Log file path (additional to stderr)
    #[arg(long)]
    log_file: Option<String>,

    /// Use the canned mock LLM client instead of an HTTP endpoint
    #[arg(long)]
    mock_llm: bool,
}

/// Prints each delivered chunk to stdout, prefixed with the persona name.
struct StdioTransport {
    persona_name: String,
}

#[async_trait]
impl Transport for StdioTransport {
    async fn send_chunk(&self, _channel_id: &str, text: &str) -> anyhow::Result<()> {
        println!("{}: {}", self.persona_name, text);
        Ok(())
    }
}

/// Runs every `ResponseGenerated`/`AutonomousMessageSent` speech through the
/// Speech Governor before delivery (§4.10, §6's `Transport` contract).
struct SpeechDeliveryHandler {
    governor: Arc<SpeechGovernor>,
    transport: Arc<dyn Transport>,
    channel_id: String,
}

#[async_trait]
impl EventHandler for SpeechDeliveryHandler {
    async fn handle(&self, event: &Event) -> anyhow::Result<()> {
        let content = match &event.payload {
            EventPayload::ResponseGenerated(r) => r.content.clone(),
            EventPayload::AutonomousMessageSent(a) => a.content.clone(),
            _ => return Ok(()),
        };
        self.governor.deliver(self.transport.as_ref(), &self.channel_id, &content).await
    }
}

/// Forwards a `ProactiveImpulse` from the BDI engine into the Cognitive
/// Orchestrator's autonomous pipeline (§4.6, §4.9).
struct ImpulseHandler {
    orchestrator: Arc<Orchestrator>,
}

#[async_trait]
impl EventHandler for ImpulseHandler {
    async fn handle(&self, event: &Event) -> anyhow::Result<()> {
        if let EventPayload::ProactiveImpulse(impulse) = &event.payload {
            self.orchestrator.handle_impulse(&impulse.trigger_reason).await;
        }
        Ok(())
    }
}

fn init_tracing(args: &Args) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    let (file_layer, guard) = if let Some(path) = &args.log_file {
        let path = PathBuf::from(path);
        let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
        let name = path.file_name().unwrap_or_default().to_string_lossy().to_string();
        let appender = tracing_appender::rolling::never(dir, name);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        (Some(fmt::layer().with_writer(non_blocking).with_ansi(false)), Some(guard))
    } else {
        (None, None)
    };

    let stderr_layer = if args.log_json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer().with_writer(std::io::stderr).boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    guard
}

/// First-run bootstrap: seed the agent's identity genesis triplets from a
/// handful of config-driven defaults if none exist yet.
async fn seed_genesis_identity(beliefs: &BeliefStore, persona_name: &str) {
    let profile = beliefs.get_agent_profile().await;
    if !profile.identity.is_empty() {
        return;
    }
    info!("no genesis identity found, seeding defaults");
    beliefs.store("agent", "name", persona_name, 1.0, "genesis").await;
    beliefs.store("agent", "is_ai", "true", 1.0, "genesis").await;
    beliefs.store("agent", "has_body", "false", 1.0, "genesis").await;
    beliefs.store("agent", "created_by", "operator", 1.0, "genesis").await;
}

/// Detects a gap since the agent last ran (read from a small marker file,
/// since the episodic buffer itself isn't persisted across restarts) and,
/// past `RESTART_GAP_SECONDS`, records a discontinuity message so the
/// pipeline has some awareness of the elapsed time on the next turn.
async fn record_restart_discontinuity(data_dir: &std::path::Path, memory: &HierarchicalMemory) {
    let marker = data_dir.join("last_seen");
    let now = chrono::Utc::now().timestamp();

    if let Ok(content) = tokio::fs::read_to_string(&marker).await {
        if let Ok(last_ts) = content.trim().parse::<i64>() {
            let gap_secs = now - last_ts;
            if gap_secs > RESTART_GAP_SECONDS {
                let gap_desc = if gap_secs > 86_400 {
                    format!("about {} day(s)", gap_secs / 86_400)
                } else if gap_secs > 3_600 {
                    format!("about {} hour(s)", gap_secs / 3_600)
                } else {
                    format!("about {} minute(s)", gap_secs / 60)
                };
                let note = format!("[restart] {gap_desc} passed since the last turn; just came back online.");
                memory.add_message(Message::new(Role::System, note)).await;
                info!(gap_secs, "restart gap detected, recorded discontinuity note");
            }
        }
    }

    if let Err(e) = tokio::fs::write(&marker, now.to_string()).await {
        warn!(error = %e, "failed to write restart marker");
    }
}

async fn build_llm_client(args: &Args, cfg: &Config) -> anyhow::Result<Arc<dyn LlmClient>> {
    if args.mock_llm {
        return Ok(Arc::new(MockLlmClient::new(
            r#"{"intent":"text_response","emotion":"neutral","speech_plan":"say hello","confidence":0.6}"#,
        )));
    }
    let client = HttpLlmClient::new(cfg.llm.url.clone(), cfg.llm.model.clone(), cfg.llm.timeout_s, cfg.llm.retries)?;
    Ok(Arc::new(client))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    let _log_guard = init_tracing(&args);

    let mut config = Config::load_or_default(&args.config);
    if let Some(data_dir) = &args.data_dir {
        config.data_dir = data_dir.clone();
    }
    let cfg = Arc::new(config);

    let data_dir = PathBuf::from(&cfg.data_dir);
    tokio::fs::create_dir_all(&data_dir).await?;

    info!(persona = %cfg.persona.name, data_dir = %cfg.data_dir, "starting up");

    let events = Arc::new(EventBus::new());

    let beliefs = Arc::new(BeliefStore::new(data_dir.join("beliefs.db")).await?);
    beliefs.initialize().await?;
    seed_genesis_identity(&beliefs, &cfg.persona.name).await;

    let semantic = Arc::new(VectorStore::new(data_dir.join("vector.db")).await?);
    let memory = Arc::new(HierarchicalMemory::new(
        semantic,
        cfg.memory.buffer_size,
        cfg.memory.consolidation_threshold,
        cfg.memory.importance_threshold,
    ));
    record_restart_discontinuity(&data_dir, &memory).await;

    let emotion = Arc::new(EmotionService::new(
        cfg.emotion.pad_decay_rate,
        data_dir.join("emotion.json"),
        events.clone(),
    ));
    let bdi = Arc::new(BdiEngine::new(
        cfg.autonomy.min_interval_minutes,
        data_dir.join("bdi.json"),
        events.clone(),
    ));

    let llm = build_llm_client(&args, &cfg).await?;

    let probe = SystemResourceProbe::new(cfg.cryostasis.blacklist.clone());
    let cryo = Cryostasis::new(
        CryoConfig {
            enabled: cfg.cryostasis.enabled,
            poll_s: cfg.cryostasis.poll_s,
            gpu_pct: cfg.cryostasis.gpu_pct,
            cpu_pct: cfg.cryostasis.cpu_pct,
            vram_mb: cfg.cryostasis.vram_mb,
            blacklist: cfg.cryostasis.blacklist.clone(),
            wake_cooldown_s: cfg.cryostasis.wake_cooldown_s as i64,
        },
        probe,
        llm.clone(),
        events.clone(),
    );
    let cryo_handle = cryo.spawn();

    let orchestrator = Arc::new(Orchestrator::new(
        events.clone(),
        memory.clone(),
        beliefs.clone(),
        emotion.clone(),
        bdi.clone(),
        llm.clone(),
        cryo.clone(),
        OrchestratorConfig {
            think_system_prompt: format!(
                "You are the reasoning core of {}. Reply only with the requested JSON object.",
                cfg.persona.name
            ),
            speak_system_prompt: if cfg.persona.system_prompt.is_empty() {
                format!("You are {}, speaking directly to the user.", cfg.persona.name)
            } else {
                cfg.persona.system_prompt.clone()
            },
            persona_anchor: format!("Stay in character as {}.", cfg.persona.name),
            speak_temperature: cfg.persona.temperature,
            speak_max_tokens: cfg.persona.max_output_tokens,
            stop_tokens: cfg.persona.stop_tokens.clone(),
            think_max_tokens: 512,
            semantic_search_limit: cfg.memory.semantic_search_limit,
        },
    ));

    let transport: Arc<dyn Transport> = Arc::new(StdioTransport {
        persona_name: cfg.persona.name.clone(),
    });
    let governor = Arc::new(SpeechGovernor::new(GovernorConfig::default()));

    events
        .subscribe(
            EventKind::ResponseGenerated,
            Arc::new(SpeechDeliveryHandler {
                governor: governor.clone(),
                transport: transport.clone(),
                channel_id: "stdio".to_string(),
            }),
        )
        .await;
    events
        .subscribe(
            EventKind::AutonomousMessageSent,
            Arc::new(SpeechDeliveryHandler {
                governor: governor.clone(),
                transport: transport.clone(),
                channel_id: "stdio".to_string(),
            }),
        )
        .await;
    events
        .subscribe(
            EventKind::ProactiveImpulse,
            Arc::new(ImpulseHandler {
                orchestrator: orchestrator.clone(),
            }),
        )
        .await;
    events.start().await;

    if cfg.autonomy.enabled {
        let bdi = bdi.clone();
        let heartbeat = HeartbeatConfig {
            interval: Duration::from_secs(cfg.autonomy.check_interval_seconds.max(1)),
        };
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(heartbeat.interval);
            loop {
                ticker.tick().await;
                bdi.tick().await;
            }
        });
    }

    if cfg.emotion.enable_circadian {
        let emotion = emotion.clone();
        let heartbeat = HeartbeatConfig {
            interval: Duration::from_secs(cfg.emotion.decay_interval_s.max(1)),
        };
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(heartbeat.interval);
            loop {
                ticker.tick().await;
                let delta = autonomy_limbic::circadian::current_pad_delta(chrono::Local::now());
                emotion.update_state(delta, "circadian").await;
            }
        });
    }

    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();
    std::thread::spawn(move || {
        let mut editor = match rustyline::DefaultEditor::new() {
            Ok(ed) => ed,
            Err(e) => {
                error!(error = %e, "failed to start line editor");
                return;
            }
        };
        loop {
            match editor.readline("> ") {
                Ok(line) => {
                    let _ = editor.add_history_entry(line.as_str());
                    if input_tx.send(line).is_err() {
                        break;
                    }
                }
                Err(_) => {
                    let _ = input_tx.send("exit".to_string());
                    break;
                }
            }
        }
    });

    println!("{} is online. Type 'exit' to quit.", cfg.persona.name);

    loop {
        tokio::select! {
            line = input_rx.recv() => {
                let Some(line) = line else { break };
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match trimmed {
                    "exit" | "quit" => break,
                    "status" => {
                        let status = orchestrator.health_check().await;
                        println!("{status:?}");
                    }
                    _ => {
                        orchestrator
                            .handle_message(MessageReceived {
                                user_id: "local-user".to_string(),
                                user_name: "user".to_string(),
                                content: trimmed.to_string(),
                                channel_id: "stdio".to_string(),
                            })
                            .await;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("ctrl-c received, shutting down");
                break;
            }
        }
    }

    graceful_shutdown(events, cryo_handle).await;
    Ok(())
}

async fn graceful_shutdown(events: Arc<EventBus>, cryo_handle: Option<tokio::task::JoinHandle<()>>) {
    let shutdown = async {
        events.stop().await;
        if let Some(handle) = cryo_handle {
            handle.abort();
        }
    };
    match tokio::time::timeout(Duration::from_secs(5), shutdown).await {
        Ok(()) => info!("graceful shutdown completed"),
        Err(_) => warn!("shutdown timed out after 5s, forcing exit"),
    }
}
