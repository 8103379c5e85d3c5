//! Jumbotron operator panel — entry point.
//!
//! ```text
//! jumbotron-panel                      Connect with defaults
//! jumbotron-panel --host 10.0.0.9     Override the device host
//! jumbotron-panel --config <path>     Use custom config TOML
//! jumbotron-panel --gen-config        Dump default config and exit
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::mpsc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use jumbotron_core::{ConnectionRegistry, DeviceApi, EditMode, Endpoint, Session};
use jumbotron_panel::{App, DeviceCommand, DeviceEvent, PanelConfig, PromptKind, UiEvent};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "jumbotron-panel", about = "Jumbotron live mirror and matrix editor")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "jumbotron-panel.toml")]
    config: PathBuf,

    /// Device host (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Device HTTP port (overrides config). The push feed is port+1.
    #[arg(short, long)]
    port: Option<u16>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&PanelConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = PanelConfig::load(&cli.config);
    if let Some(host) = cli.host {
        config.device.host = host;
    }
    if let Some(port) = cli.port {
        config.device.port = port;
    }

    // The terminal belongs to the UI, so tracing goes to a file or
    // nowhere at all.
    if !config.logging.file.is_empty() {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
        let file = std::fs::File::create(&config.logging.file)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .init();
    }

    let endpoint = Endpoint::new(config.device.host.clone(), config.device.port);

    // Remember this device for next time. Registry trouble is not
    // worth refusing to start over.
    match ConnectionRegistry::load(config.device.registry_path.clone()) {
        Ok(mut registry) => {
            if let Err(e) = registry.add(endpoint.clone()) {
                warn!("could not persist device list: {e}");
            }
        }
        Err(e) => warn!("could not load device list: {e}"),
    }

    // ── 1. Connect ──────────────────────────────────────────────

    let mut session = Session::connect(endpoint).await?;
    let mut frames = session.frames();
    let monitor = session.monitor();
    let mut metrics_rx = monitor.metrics_changes();
    let mut reachable_rx = monitor.reachable_changes();

    // ── 2. Communication channels ───────────────────────────────

    let (ui_tx, mut ui_rx) = mpsc::unbounded_channel::<UiEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<DeviceCommand>();
    let (dev_tx, mut dev_rx) = mpsc::unbounded_channel::<DeviceEvent>();

    // ── 3. Input task (blocking crossterm poll) ─────────────────

    tokio::task::spawn_blocking(move || {
        loop {
            if event::poll(Duration::from_millis(10)).unwrap_or(false) {
                if let Ok(ev) = event::read() {
                    let forwarded = match ev {
                        Event::Key(key) => ui_tx.send(UiEvent::Key(key)),
                        Event::Mouse(mouse) => ui_tx.send(UiEvent::Mouse(mouse)),
                        Event::Resize(w, h) => ui_tx.send(UiEvent::Resize(w, h)),
                        _ => Ok(()),
                    };
                    if forwarded.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // ── 4. Device task (REST calls off the render loop) ─────────

    tokio::spawn(run_device_task(session.api(), cmd_rx, dev_tx));
    let _ = cmd_tx.send(DeviceCommand::RefreshSaved);

    // ── 5. Terminal setup ───────────────────────────────────────

    crossterm::terminal::enable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::EnterAlternateScreen,
        event::EnableMouseCapture
    )?;
    let mut terminal = Terminal::new(CrosstermBackend::new(std::io::stdout()))?;
    terminal.clear()?;

    let mut app = App::new(
        session.dispatcher(),
        session.state(),
        &config.editing.palette,
        config.editing.brightness,
    );

    // ── 6. Main UI event loop ───────────────────────────────────

    loop {
        terminal.draw(|f| app.draw(f))?;

        tokio::select! {
            Some(event) = ui_rx.recv() => match event {
                UiEvent::Key(key) if key.kind == KeyEventKind::Press => {
                    handle_key(&mut app, key, &cmd_tx, &monitor);
                }
                UiEvent::Key(_) => {}
                UiEvent::Mouse(mouse) => app.handle_mouse(mouse),
                UiEvent::Resize(_, _) => {}
            },

            Some(event) = dev_rx.recv() => app.update(event),

            res = frames.changed() => {
                if res.is_ok() {
                    let grid = frames.borrow_and_update().clone();
                    app.apply_grid(grid);
                }
            }

            res = metrics_rx.changed() => {
                if res.is_ok() {
                    let metrics = metrics_rx.borrow_and_update().clone();
                    app.apply_metrics(metrics);
                }
            }

            res = reachable_rx.changed() => {
                if res.is_ok() {
                    let reachable = *reachable_rx.borrow_and_update();
                    app.set_reachable(reachable);
                }
            }
        }

        if app.exit {
            break;
        }
    }

    // ── 7. Shutdown ─────────────────────────────────────────────

    crossterm::execute!(
        std::io::stdout(),
        event::DisableMouseCapture,
        crossterm::terminal::LeaveAlternateScreen
    )?;
    crossterm::terminal::disable_raw_mode()?;
    session.disconnect();

    Ok(())
}

// ── Key handling ─────────────────────────────────────────────────

fn handle_key(
    app: &mut App,
    key: crossterm::event::KeyEvent,
    cmd_tx: &mpsc::UnboundedSender<DeviceCommand>,
    monitor: &jumbotron_core::ConnectionMonitor,
) {
    // An open prompt captures everything.
    if let Some((kind, _)) = app.prompt {
        if kind == PromptKind::ConfirmReset {
            app.cancel_prompt();
            if matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y')) {
                let _ = cmd_tx.send(DeviceCommand::ResetBoard);
            }
            return;
        }
        match key.code {
            KeyCode::Esc => app.cancel_prompt(),
            KeyCode::Enter => {
                if let Some((kind, text)) = app.submit_prompt() {
                    let brightness = app.brightness;
                    let cmd = match kind {
                        PromptKind::SaveName => DeviceCommand::Save(text),
                        PromptKind::ImagePath => {
                            DeviceCommand::UploadImage(text.into(), brightness)
                        }
                        PromptKind::VideoPath => DeviceCommand::PlayVideo(text.into(), brightness),
                        // Confirm prompts were consumed above.
                        PromptKind::ConfirmReset => return,
                    };
                    let _ = cmd_tx.send(cmd);
                }
            }
            KeyCode::Backspace => app.prompt_pop(),
            KeyCode::Char(c) => app.prompt_push(c),
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => app.exit = true,
        KeyCode::Char('q') | KeyCode::Esc => app.exit = true,

        KeyCode::Char('p') => app.set_mode(EditMode::Pixel),
        KeyCode::Char('r') => app.set_mode(EditMode::Row),
        KeyCode::Char('c') => app.set_mode(EditMode::Column),
        KeyCode::Char('a') => app.set_mode(EditMode::All),
        KeyCode::Char('e') => app.set_mode(EditMode::Eraser),

        KeyCode::Tab => app.cycle_palette(true),
        KeyCode::BackTab => app.cycle_palette(false),
        KeyCode::Char('+') | KeyCode::Char('=') => {
            let _ = cmd_tx.send(app.adjust_brightness(true));
        }
        KeyCode::Char('-') => {
            let _ = cmd_tx.send(app.adjust_brightness(false));
        }

        KeyCode::Char('x') => app.open_prompt(PromptKind::ConfirmReset),
        KeyCode::Char('s') => app.open_prompt(PromptKind::SaveName),
        KeyCode::Char('u') => app.open_prompt(PromptKind::ImagePath),
        KeyCode::Char('w') => app.open_prompt(PromptKind::VideoPath),
        KeyCode::F(5) => {
            let _ = cmd_tx.send(DeviceCommand::RefreshSaved);
        }
        KeyCode::Up => app.saved_up(),
        KeyCode::Down => app.saved_down(),
        KeyCode::Enter => {
            if let Some(cmd) = app.activate_selected() {
                let _ = cmd_tx.send(cmd);
            }
        }
        KeyCode::Char('d') => {
            if let Some(cmd) = app.delete_selected() {
                let _ = cmd_tx.send(cmd);
            }
        }

        KeyCode::F(6) => {
            if monitor.retry() {
                app.log("Retrying push channel...");
            } else {
                app.log("Session is gone; restart the panel.");
            }
        }
        _ => {}
    }
}

// ── Device task ──────────────────────────────────────────────────

/// Executes REST commands sequentially and reports outcomes. Mutation
/// traffic does not pass through here; the dispatcher fires that
/// directly.
async fn run_device_task(
    api: Arc<DeviceApi>,
    mut cmd_rx: mpsc::UnboundedReceiver<DeviceCommand>,
    dev_tx: mpsc::UnboundedSender<DeviceEvent>,
) {
    while let Some(cmd) = cmd_rx.recv().await {
        let outcome = match cmd {
            DeviceCommand::SetBrightness(value) => api
                .set_brightness(value)
                .await
                .map(|_| format!("Brightness set to {value}")),
            DeviceCommand::ResetBoard => api.reset().await.map(|_| "Board blanked".to_string()),
            DeviceCommand::Save(name) => match api.save_current_matrix(&name).await {
                Ok(()) => {
                    refresh_saved(&api, &dev_tx).await;
                    Ok(format!("Saved as {name}"))
                }
                Err(e) => Err(e),
            },
            DeviceCommand::Activate(name) => api
                .activate_saved_matrix(&name)
                .await
                .map(|_| format!("Activated {name}")),
            DeviceCommand::Delete(name) => match api.delete_saved_matrix(&name).await {
                Ok(()) => {
                    refresh_saved(&api, &dev_tx).await;
                    Ok(format!("Deleted {name}"))
                }
                Err(e) => Err(e),
            },
            DeviceCommand::RefreshSaved => {
                refresh_saved(&api, &dev_tx).await;
                continue;
            }
            DeviceCommand::UploadImage(path, brightness) => {
                match tokio::fs::read(&path).await {
                    Ok(bytes) => api
                        .upload_image(bytes, file_name_of(&path), brightness)
                        .await
                        .map(|_| format!("Image {} displayed", path.display())),
                    Err(e) => Err(e.into()),
                }
            }
            DeviceCommand::PlayVideo(path, brightness) => {
                match tokio::fs::read(&path).await {
                    Ok(bytes) => api
                        .play_video(bytes, file_name_of(&path), brightness)
                        .await
                        .map(|_| format!("Video {} playing", path.display())),
                    Err(e) => Err(e.into()),
                }
            }
        };

        let message = match outcome {
            Ok(msg) => msg,
            Err(e) => format!("Device error: {e}"),
        };
        if dev_tx.send(DeviceEvent::Log(message)).is_err() {
            break;
        }
    }
}

fn file_name_of(path: &std::path::Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string())
}

async fn refresh_saved(api: &DeviceApi, dev_tx: &mpsc::UnboundedSender<DeviceEvent>) {
    match api.saved_matrices().await {
        Ok(list) => {
            let _ = dev_tx.send(DeviceEvent::Saved(list));
        }
        Err(e) => {
            let _ = dev_tx.send(DeviceEvent::Log(format!("Could not list saved matrices: {e}")));
        }
    }
}
