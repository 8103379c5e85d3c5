//! Jumbotron kiosk — read-only live mirror.
//!
//! ```text
//! jumbotron-kiosk 10.0.0.9            Mirror the device at port 5000
//! jumbotron-kiosk 10.0.0.9 -p 8080    Custom HTTP port (push is +1)
//! ```
//!
//! No editing, no saved-matrix management. Just the grid, the link
//! health, and a retry key.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Paragraph, Widget},
};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use jumbotron_core::{ConnectionState, Endpoint, GridState, Session, SyncMetrics};

#[derive(Parser, Debug)]
#[command(name = "jumbotron-kiosk", about = "Read-only Jumbotron mirror")]
struct Cli {
    /// Device host (IP or name).
    host: String,

    /// Device HTTP port. The push feed is one port above.
    #[arg(short, long, default_value_t = 5000)]
    port: u16,

    /// Optional log file (the terminal is owned by the UI).
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(path) = &cli.log_file {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let file = std::fs::File::create(path)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .init();
    }

    let mut session = Session::connect(Endpoint::new(cli.host, cli.port)).await?;
    let mut frames = session.frames();
    let monitor = session.monitor();
    let mut metrics_rx = monitor.metrics_changes();
    let mut reachable_rx = monitor.reachable_changes();
    let connection = session.state();

    let (key_tx, mut key_rx) = mpsc::unbounded_channel();
    tokio::task::spawn_blocking(move || {
        loop {
            if event::poll(Duration::from_millis(10)).unwrap_or(false) {
                if let Ok(Event::Key(key)) = event::read() {
                    if key_tx.send(key).is_err() {
                        break;
                    }
                }
            }
        }
    });

    crossterm::terminal::enable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(std::io::stdout()))?;
    terminal.clear()?;

    let mut grid = GridState::default();
    let mut metrics = SyncMetrics::default();
    let mut reachable = true;

    loop {
        terminal.draw(|f| draw(f, &connection, &grid, &metrics, reachable))?;

        tokio::select! {
            Some(key) = key_rx.recv() => {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => break,
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => break,
                    KeyCode::Char('r') => {
                        let _ = monitor.retry();
                    }
                    _ => {}
                }
            }

            res = frames.changed() => {
                if res.is_ok() {
                    grid = frames.borrow_and_update().clone();
                }
            }

            res = metrics_rx.changed() => {
                if res.is_ok() {
                    metrics = metrics_rx.borrow_and_update().clone();
                }
            }

            res = reachable_rx.changed() => {
                if res.is_ok() {
                    reachable = *reachable_rx.borrow_and_update();
                }
            }
        }
    }

    crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;
    crossterm::terminal::disable_raw_mode()?;
    session.disconnect();

    Ok(())
}

fn draw(
    frame: &mut ratatui::Frame,
    connection: &ConnectionState,
    grid: &GridState,
    metrics: &SyncMetrics,
    reachable: bool,
) {
    let area = frame.area();
    let buf = frame.buffer_mut();

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let (link_text, link_style) = if reachable {
        ("LIVE", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
    } else {
        (
            "OFFLINE (last known frame, press r to retry)",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )
    };

    let header = Line::from(vec![
        Span::styled(
            format!(" {}:{} ", connection.host, connection.port),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(link_text, link_style),
        Span::raw(format!(
            "  ping {} ms  {} fps",
            metrics.latency_ms, metrics.updates_per_sec
        )),
    ]);
    Paragraph::new(header)
        .block(
            Block::bordered()
                .title(" Jumbotron Kiosk ")
                .border_style(Style::default().fg(Color::DarkGray)),
        )
        .render(layout[0], buf);

    let border_color = if reachable { Color::DarkGray } else { Color::Red };
    let block = Block::bordered().border_style(Style::default().fg(border_color));
    let inner = block.inner(layout[1]);
    block.render(layout[1], buf);

    let lines: Vec<Line> = grid
        .cells
        .iter()
        .map(|row| {
            Line::from(
                row.iter()
                    .map(|px| Span::styled("  ", Style::default().bg(Color::Rgb(px.r, px.g, px.b))))
                    .collect::<Vec<_>>(),
            )
        })
        .collect();
    Paragraph::new(lines).render(inner, buf);
}
