//! MouHid Monitor client entry point.
//!
//! Opens the control device, enables the monitor, and polls it on a fixed
//! interval so interception survives mouse hot-plug, until Ctrl-C.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()               -- mouhid.toml + CLI overrides
//!  └─ write_config()              -- --write-config: save and exit
//!  └─ open_session()
//!       ├─ WindowsDevice          -- \\.\MouHidInputHook (Windows)
//!       └─ SimulatedSystem        -- in-process engine + synthetic hardware
//!  └─ PollMonitorUseCase::start() -- enable unless already enabled
//!  └─ poll loop                   -- tick() every interval, until Ctrl-C
//!  └─ PollMonitorUseCase::stop()  -- disable if this client enabled it
//! ```

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::task::JoinHandle;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use mouhid_client::application::poll_monitor::{MonitorDevice, PollMonitorUseCase, StartOutcome};
use mouhid_client::infrastructure::device::simulated::{
    spawn_hardware, HardwareProfile, SimulatedSystem,
};
use mouhid_client::infrastructure::storage::config::{
    config_file_path, load_config, save_config, ClientConfig,
};
use mouhid_monitor::infrastructure::packet_log::TracingPacketLogger;
use mouhid_monitor::MonitorOptions;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// MouHid input monitor client.
///
/// Enables packet interception and keeps it enabled across mouse device
/// changes until interrupted.
#[derive(Debug, Parser)]
#[command(
    name = "mouhid-client",
    about = "Keeps the MouHid input monitor enabled across mouse hot-plug",
    version
)]
struct Cli {
    /// Path of the TOML config file. Defaults to the platform config directory.
    #[arg(long, env = "MOUHID_CONFIG")]
    config: Option<PathBuf>,

    /// Poll interval in milliseconds; overrides `client.poll_interval_ms`.
    #[arg(long, env = "MOUHID_POLL_INTERVAL_MS")]
    interval_ms: Option<u64>,

    /// Host the engine in-process with synthetic mouse hardware.
    #[arg(long, env = "MOUHID_SIMULATE")]
    simulate: bool,

    /// Write the effective configuration to the config file and exit.
    #[arg(long)]
    write_config: bool,
}

impl Cli {
    fn apply_to(&self, config: &mut ClientConfig) {
        if let Some(interval_ms) = self.interval_ms {
            config.client.poll_interval_ms = interval_ms;
        }
        if self.simulate {
            config.simulation.enabled = true;
        }
    }
}

/// Saves `config` to the `--config` path, or the platform default.
fn write_config(cli: &Cli, config: &ClientConfig) -> anyhow::Result<PathBuf> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => config_file_path()?,
    };
    save_config(config, &path)
        .with_context(|| format!("failed to write configuration to {}", path.display()))?;
    Ok(path)
}

// ── Device session ────────────────────────────────────────────────────────────

struct Session {
    device: Arc<dyn MonitorDevice>,
    hardware: Option<JoinHandle<()>>,
}

fn open_session(config: &ClientConfig, running: &Arc<AtomicBool>) -> anyhow::Result<Session> {
    if !config.simulation.enabled {
        return Ok(Session {
            device: open_native(&config.client.device_path)?,
            hardware: None,
        });
    }

    info!("hosting the MouHid Monitor in-process with simulated hardware");

    let options = MonitorOptions {
        trap_on_stale_notification: config.monitor.trap_on_stale_notification,
    };
    let system = SimulatedSystem::build(Arc::new(TracingPacketLogger), options);
    let sim = &config.simulation;
    let profile = HardwareProfile {
        batch_interval: Duration::from_millis(sim.batch_interval_ms.max(1)),
        max_batch_size: sim.max_batch_size,
        hotplug_interval: (sim.hotplug_interval_ms > 0)
            .then(|| Duration::from_millis(sim.hotplug_interval_ms)),
    };
    let hardware = spawn_hardware(system.facility.clone(), profile, Arc::clone(running));

    Ok(Session {
        device: system.device,
        hardware: Some(hardware),
    })
}

#[cfg(target_os = "windows")]
fn open_native(path: &str) -> anyhow::Result<Arc<dyn MonitorDevice>> {
    use mouhid_client::infrastructure::device::windows::WindowsDevice;

    let device = WindowsDevice::open(path)
        .with_context(|| format!("failed to open {path}; is the MouHidInputHook driver loaded?"))?;
    Ok(Arc::new(device))
}

#[cfg(not(target_os = "windows"))]
fn open_native(path: &str) -> anyhow::Result<Arc<dyn MonitorDevice>> {
    anyhow::bail!("{path} is only available on Windows; run with --simulate")
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref()).context("failed to load configuration")?;
    cli.apply_to(&mut config);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.client.log_level)),
        )
        .init();

    if cli.write_config {
        let path = write_config(&cli, &config)?;
        info!("Configuration written to {}", path.display());
        return Ok(());
    }

    let running = Arc::new(AtomicBool::new(true));
    let session = open_session(&config, &running)?;
    let mut use_case = PollMonitorUseCase::new(Arc::clone(&session.device));

    let outcome = use_case.start().context("failed to enable MouHid Monitor");
    if matches!(outcome, Ok(StartOutcome::Enabled)) {
        info!("Press Ctrl-C to exit.");
        poll_until_interrupted(&mut use_case, config.client.poll_interval()).await;

        if let Err(e) = use_case.stop() {
            error!("disable monitor failed: {e}");
        }
    }

    // Closing the device runs the monitor's disable safety net.
    drop(use_case);
    drop(session.device);

    running.store(false, Ordering::Relaxed);
    if let Some(hardware) = session.hardware {
        if let Err(e) = hardware.await {
            error!("simulated hardware task failed: {e}");
        }
    }

    outcome.map(|_| ())
}

async fn poll_until_interrupted(use_case: &mut PollMonitorUseCase, interval: Duration) {
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    // The first tick completes immediately; the first poll is one interval out.
    ticker.tick().await;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                use_case.tick();
            }
            result = &mut ctrl_c => {
                match result {
                    Ok(()) => info!("Exiting."),
                    Err(e) => error!("failed to listen for Ctrl-C signal: {e}"),
                }
                break;
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_leave_config_untouched() {
        // Arrange
        let cli = Cli::parse_from(["mouhid-client"]);
        let mut config = ClientConfig::default();

        // Act
        cli.apply_to(&mut config);

        // Assert
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_cli_overrides_interval_and_simulation() {
        let cli = Cli::parse_from(["mouhid-client", "--interval-ms", "250", "--simulate"]);
        let mut config = ClientConfig::default();
        config.simulation.enabled = false;

        cli.apply_to(&mut config);

        assert_eq!(config.client.poll_interval_ms, 250);
        assert!(config.simulation.enabled);
    }

    #[test]
    fn test_write_config_saves_effective_config() {
        // Arrange
        let dir = std::env::temp_dir().join(format!("mouhid_cli_test_{}", std::process::id()));
        let path = dir.join("mouhid.toml");
        let cli = Cli::parse_from([
            "mouhid-client",
            "--config",
            path.to_str().unwrap(),
            "--interval-ms",
            "750",
            "--write-config",
        ]);
        let mut config = ClientConfig::default();
        cli.apply_to(&mut config);

        // Act
        let written = write_config(&cli, &config).expect("write should succeed");

        // Assert
        assert_eq!(written, path);
        let loaded = load_config(Some(&path)).unwrap();
        assert_eq!(loaded.client.poll_interval_ms, 750);

        // Cleanup
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_cli_accepts_config_path() {
        let cli = Cli::parse_from(["mouhid-client", "--config", "/tmp/mouhid.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/mouhid.toml")));
    }
}
