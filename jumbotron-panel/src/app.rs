use crossterm::event::{MouseButton, MouseEvent, MouseEventKind};
use jumbotron_core::{
    ConnectionState, EditDispatcher, EditMode, GridState, Rgb, SavedMatrix, SyncMetrics,
    hex_to_rgb,
};
use ratatui::{
    Frame,
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::border,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Widget},
};

/// Device brightness ceiling. The firmware rejects anything above.
pub const MAX_BRIGHTNESS: u8 = 40;

#[derive(Debug, Clone)]
pub enum UiEvent {
    Key(crossterm::event::KeyEvent),
    Mouse(MouseEvent),
    Resize(u16, u16),
}

/// REST calls the UI wants executed off the render loop.
#[derive(Debug, Clone)]
pub enum DeviceCommand {
    SetBrightness(u8),
    ResetBoard,
    Save(String),
    Activate(String),
    Delete(String),
    RefreshSaved,
    UploadImage(std::path::PathBuf, u8),
    PlayVideo(std::path::PathBuf, u8),
}

/// What the footer prompt is collecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    SaveName,
    ImagePath,
    VideoPath,
    ConfirmReset,
}

impl PromptKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::SaveName => "Save as: ",
            Self::ImagePath => "Image path: ",
            Self::VideoPath => "Video path: ",
            Self::ConfirmReset => "Blank the whole board? [y/N]",
        }
    }

    /// Which characters the prompt accepts.
    pub fn accepts(self, c: char) -> bool {
        match self {
            // Saved-matrix names become device filenames.
            Self::SaveName => c.is_ascii_alphanumeric() || c == '-' || c == '_',
            Self::ImagePath | Self::VideoPath => !c.is_control(),
            Self::ConfirmReset => false,
        }
    }
}

/// Results flowing back from the device task.
#[derive(Debug, Clone)]
pub enum DeviceEvent {
    Log(String),
    Saved(Vec<SavedMatrix>),
}

pub struct App {
    pub grid: GridState,
    pub connection: ConnectionState,
    pub reachable: bool,
    pub metrics: SyncMetrics,

    pub dispatcher: EditDispatcher,
    pub palette: Vec<(String, Rgb)>,
    pub palette_index: usize,
    pub brightness: u8,

    pub saved: Vec<SavedMatrix>,
    pub saved_index: usize,
    /// Footer prompt (save name, upload path, reset confirm), when open.
    pub prompt: Option<(PromptKind, String)>,

    pub status: Vec<String>,
    pub exit: bool,

    /// Screen rectangle the grid occupied on the last draw; used to
    /// hit-test mouse events.
    grid_area: Rect,
}

impl App {
    pub fn new(
        mut dispatcher: EditDispatcher,
        connection: ConnectionState,
        palette_hex: &[String],
        brightness: u8,
    ) -> Self {
        let palette: Vec<(String, Rgb)> = palette_hex
            .iter()
            .filter_map(|hex| hex_to_rgb(hex).ok().map(|rgb| (hex.clone(), rgb)))
            .collect();

        let brightness = brightness.min(MAX_BRIGHTNESS);
        if let Some((_, rgb)) = palette.first() {
            dispatcher.set_color(*rgb);
        }
        dispatcher.set_brightness(brightness);

        Self {
            grid: GridState::default(),
            connection,
            reachable: true,
            metrics: SyncMetrics::default(),
            dispatcher,
            palette,
            palette_index: 0,
            brightness,
            saved: Vec::new(),
            saved_index: 0,
            prompt: None,
            status: vec!["Connected. Drag on the grid to paint.".to_string()],
            exit: false,
            grid_area: Rect::default(),
        }
    }

    // ── State updates ────────────────────────────────────────────

    pub fn apply_grid(&mut self, grid: GridState) {
        self.grid = grid;
    }

    pub fn apply_metrics(&mut self, metrics: SyncMetrics) {
        self.connection.latency_ms = metrics.latency_ms;
        self.connection.updates_per_sec = metrics.updates_per_sec;
        self.metrics = metrics;
    }

    pub fn set_reachable(&mut self, reachable: bool) {
        if self.reachable && !reachable {
            self.log("Push channel lost. Press F6 to retry.");
        }
        self.reachable = reachable;
    }

    pub fn update(&mut self, event: DeviceEvent) {
        match event {
            DeviceEvent::Log(msg) => self.log(msg),
            DeviceEvent::Saved(list) => {
                self.saved_index = self.saved_index.min(list.len().saturating_sub(1));
                self.saved = list;
            }
        }
    }

    pub fn log(&mut self, msg: impl Into<String>) {
        self.status.push(msg.into());
        if self.status.len() > 64 {
            self.status.remove(0);
        }
    }

    // ── Editing controls ─────────────────────────────────────────

    pub fn set_mode(&mut self, mode: EditMode) {
        self.dispatcher.set_mode(mode);
        self.log(format!("Mode: {mode}"));
    }

    pub fn cycle_palette(&mut self, forward: bool) {
        if self.palette.is_empty() {
            return;
        }
        self.palette_index = if forward {
            (self.palette_index + 1) % self.palette.len()
        } else {
            (self.palette_index + self.palette.len() - 1) % self.palette.len()
        };
        let (_, rgb) = self.palette[self.palette_index];
        self.dispatcher.set_color(rgb);
    }

    /// Bump the brightness and return the command to propagate it to
    /// the board.
    pub fn adjust_brightness(&mut self, up: bool) -> DeviceCommand {
        self.brightness = if up {
            (self.brightness + 1).min(MAX_BRIGHTNESS)
        } else {
            self.brightness.saturating_sub(1)
        };
        self.dispatcher.set_brightness(self.brightness);
        DeviceCommand::SetBrightness(self.brightness)
    }

    // ── Mouse ────────────────────────────────────────────────────

    /// Screen coordinates to grid cell, if the pointer is over a cell.
    /// Cells render two columns wide.
    pub fn cell_at(&self, x: u16, y: u16) -> Option<(usize, usize)> {
        let area = self.grid_area;
        if x < area.x || y < area.y || x >= area.x + area.width || y >= area.y + area.height {
            return None;
        }
        let row = (y - area.y) as usize;
        let column = ((x - area.x) / 2) as usize;
        if row < self.connection.rows && column < self.connection.columns {
            Some((row, column))
        } else {
            None
        }
    }

    pub fn handle_mouse(&mut self, event: MouseEvent) {
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some((row, column)) = self.cell_at(event.column, event.row) {
                    self.dispatcher.pointer_down(row, column);
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if let Some((row, column)) = self.cell_at(event.column, event.row) {
                    self.dispatcher.pointer_over(row, column);
                }
            }
            MouseEventKind::Up(MouseButton::Left) => self.dispatcher.pointer_up(),
            _ => {}
        }
    }

    // ── Saved matrices ───────────────────────────────────────────

    pub fn saved_up(&mut self) {
        self.saved_index = self.saved_index.saturating_sub(1);
    }

    pub fn saved_down(&mut self) {
        if self.saved_index + 1 < self.saved.len() {
            self.saved_index += 1;
        }
    }

    pub fn selected_saved(&self) -> Option<&SavedMatrix> {
        self.saved.get(self.saved_index)
    }

    /// Command to activate the selected save. The device resolves the
    /// raw filename against its saves directory, so the full filename
    /// goes on the wire; `name()` is display only.
    pub fn activate_selected(&self) -> Option<DeviceCommand> {
        self.selected_saved()
            .map(|m| DeviceCommand::Activate(m.filename.clone()))
    }

    /// Command to delete the selected save. Same wire identifier rule
    /// as [`activate_selected`](Self::activate_selected).
    pub fn delete_selected(&self) -> Option<DeviceCommand> {
        self.selected_saved()
            .map(|m| DeviceCommand::Delete(m.filename.clone()))
    }

    // ── Footer prompt ────────────────────────────────────────────

    pub fn open_prompt(&mut self, kind: PromptKind) {
        self.prompt = Some((kind, String::new()));
    }

    pub fn cancel_prompt(&mut self) {
        self.prompt = None;
    }

    pub fn prompt_push(&mut self, c: char) {
        if let Some((kind, text)) = self.prompt.as_mut() {
            if kind.accepts(c) {
                text.push(c);
            }
        }
    }

    pub fn prompt_pop(&mut self) {
        if let Some((_, text)) = self.prompt.as_mut() {
            text.pop();
        }
    }

    /// Enter on a non-empty prompt yields the kind and the text.
    pub fn submit_prompt(&mut self) -> Option<(PromptKind, String)> {
        let (kind, text) = self.prompt.take()?;
        if text.is_empty() && kind != PromptKind::ConfirmReset {
            None
        } else {
            Some((kind, text))
        }
    }

    // ── Rendering ────────────────────────────────────────────────

    pub fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let buf = frame.buffer_mut();

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
            ])
            .split(area);

        self.render_header(layout[0], buf);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(34)])
            .split(layout[1]);

        self.render_grid(body[0], buf);
        self.render_sidebar(body[1], buf);
        self.render_footer(layout[2], buf);
    }

    fn render_header(&self, area: Rect, buf: &mut Buffer) {
        let (link_text, link_style) = if self.reachable {
            ("LIVE", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
        } else {
            ("OFFLINE", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
        };

        let line = Line::from(vec![
            Span::styled(
                format!(" {}:{} ", self.connection.host, self.connection.port),
                Style::default().fg(Color::Cyan),
            ),
            Span::styled(link_text, link_style),
            Span::raw(format!(
                "  {}x{}  ping {} ms  {} fps  {} frames",
                self.connection.rows,
                self.connection.columns,
                self.connection.latency_ms,
                self.connection.updates_per_sec,
                self.metrics.frames_total,
            )),
            Span::raw(format!("  brightness {}/{MAX_BRIGHTNESS}", self.brightness)),
            Span::raw(format!("  mode {}", self.dispatcher.mode())),
        ]);

        Paragraph::new(line)
            .block(
                Block::bordered()
                    .title(" Jumbotron Panel ")
                    .border_set(border::THICK)
                    .border_style(Style::default().fg(Color::DarkGray)),
            )
            .render(area, buf);
    }

    fn render_grid(&mut self, area: Rect, buf: &mut Buffer) {
        let border_color = if self.reachable { Color::DarkGray } else { Color::Red };
        let title = if self.reachable {
            " Matrix "
        } else {
            " Matrix (last known, channel down) "
        };
        let block = Block::bordered()
            .title(Span::styled(title, Style::default().fg(border_color)))
            .border_style(Style::default().fg(border_color));
        let inner = block.inner(area);
        block.render(area, buf);
        self.grid_area = inner;

        let lines: Vec<Line> = self
            .grid
            .cells
            .iter()
            .map(|row| {
                Line::from(
                    row.iter()
                        .map(|px| {
                            Span::styled(
                                "  ",
                                Style::default().bg(Color::Rgb(px.r, px.g, px.b)),
                            )
                        })
                        .collect::<Vec<_>>(),
                )
            })
            .collect();

        Paragraph::new(lines).render(inner, buf);
    }

    fn render_sidebar(&self, area: Rect, buf: &mut Buffer) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2 + self.palette.len().max(1) as u16),
                Constraint::Min(6),
                Constraint::Length(8),
            ])
            .split(area);

        // Palette
        let palette_block = Block::bordered()
            .title(Span::styled(" Palette ", Style::default().fg(Color::Yellow)))
            .border_style(Style::default().fg(Color::DarkGray));
        let palette_inner = palette_block.inner(layout[0]);
        palette_block.render(layout[0], buf);

        let palette_items: Vec<ListItem> = self
            .palette
            .iter()
            .enumerate()
            .map(|(i, (hex, rgb))| {
                let marker = if i == self.palette_index { "> " } else { "  " };
                ListItem::new(Line::from(vec![
                    Span::raw(marker),
                    Span::styled("██ ", Style::default().fg(Color::Rgb(rgb.r, rgb.g, rgb.b))),
                    Span::raw(hex.clone()),
                ]))
            })
            .collect();
        List::new(palette_items).render(palette_inner, buf);

        // Saved matrices
        let saved_block = Block::bordered()
            .title(Span::styled(" Saved ", Style::default().fg(Color::Yellow)))
            .border_style(Style::default().fg(Color::DarkGray));
        let saved_inner = saved_block.inner(layout[1]);
        saved_block.render(layout[1], buf);

        let saved_items: Vec<ListItem> = self
            .saved
            .iter()
            .enumerate()
            .map(|(i, m)| {
                let style = if i == self.saved_index {
                    Style::default().bg(Color::Cyan).fg(Color::Black)
                } else {
                    Style::default()
                };
                ListItem::new(Span::styled(m.name().to_string(), style))
            })
            .collect();
        List::new(saved_items).render(saved_inner, buf);

        // Status log tail
        let status_block = Block::bordered()
            .title(Span::styled(" Status ", Style::default().fg(Color::Yellow)))
            .border_style(Style::default().fg(Color::DarkGray));
        let status_inner = status_block.inner(layout[2]);
        status_block.render(layout[2], buf);

        let visible = status_inner.height as usize;
        let start = self.status.len().saturating_sub(visible);
        let status_items: Vec<ListItem> = self.status[start..]
            .iter()
            .map(|s| ListItem::new(Span::styled(s.clone(), Style::default().fg(Color::Gray))))
            .collect();
        List::new(status_items).render(status_inner, buf);
    }

    fn render_footer(&self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::TOP)
            .border_style(Style::default().fg(Color::DarkGray));
        let inner = block.inner(area);
        block.render(area, buf);

        let line = if let Some((kind, text)) = &self.prompt {
            Line::from(vec![
                Span::styled(
                    format!(" {}", kind.label()),
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                ),
                Span::raw(text.clone()),
                Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
            ])
        } else {
            Line::from(Span::styled(
                " [p/r/c/a/e] mode  [Tab] color  [+/-] brightness  [s] save  [Enter] activate  \
                 [d] delete  [F5] refresh  [u] image  [w] video  [x] blank  [F6] retry  [q] quit",
                Style::default().fg(Color::Gray),
            ))
        };
        Paragraph::new(line).render(inner, buf);
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use jumbotron_core::{Mutation, MutationSink};
    use std::sync::{Arc, Mutex};

    struct NullSink(Mutex<Vec<Mutation>>);

    impl MutationSink for NullSink {
        fn dispatch(&self, mutation: Mutation) {
            self.0.lock().unwrap().push(mutation);
        }
    }

    fn app() -> App {
        let dispatcher = EditDispatcher::new(Arc::new(NullSink(Mutex::new(Vec::new()))));
        let connection = ConnectionState {
            host: "10.0.0.9".into(),
            port: 5000,
            rows: 8,
            columns: 64,
            initialized: true,
            latency_ms: 0,
            updates_per_sec: 0,
        };
        let palette = vec!["#FFFFFF".to_string(), "#FF0000".to_string()];
        let mut app = App::new(dispatcher, connection, &palette, 20);
        app.grid_area = Rect::new(1, 1, 128, 8);
        app
    }

    #[test]
    fn cell_hit_testing_accounts_for_double_width() {
        let app = app();
        assert_eq!(app.cell_at(1, 1), Some((0, 0)));
        assert_eq!(app.cell_at(2, 1), Some((0, 0)));
        assert_eq!(app.cell_at(3, 1), Some((0, 1)));
        assert_eq!(app.cell_at(1, 8), Some((7, 0)));
        // Outside the grid rectangle.
        assert_eq!(app.cell_at(0, 0), None);
        assert_eq!(app.cell_at(200, 1), None);
    }

    #[test]
    fn palette_wraps_both_directions() {
        let mut app = app();
        assert_eq!(app.palette_index, 0);
        app.cycle_palette(false);
        assert_eq!(app.palette_index, 1);
        app.cycle_palette(true);
        assert_eq!(app.palette_index, 0);
    }

    #[test]
    fn brightness_clamps_to_device_range() {
        let mut app = app();
        app.brightness = MAX_BRIGHTNESS;
        app.adjust_brightness(true);
        assert_eq!(app.brightness, MAX_BRIGHTNESS);

        app.brightness = 0;
        app.adjust_brightness(false);
        assert_eq!(app.brightness, 0);
    }

    #[test]
    fn empty_prompt_does_not_submit() {
        let mut app = app();
        app.open_prompt(PromptKind::SaveName);
        assert_eq!(app.submit_prompt(), None);

        app.open_prompt(PromptKind::SaveName);
        for c in "sunset".chars() {
            app.prompt_push(c);
        }
        assert_eq!(
            app.submit_prompt(),
            Some((PromptKind::SaveName, "sunset".to_string()))
        );
    }

    #[test]
    fn prompt_filters_by_kind() {
        let mut app = app();

        // Names reject path separators; paths accept them.
        app.open_prompt(PromptKind::SaveName);
        app.prompt_push('a');
        app.prompt_push('/');
        assert_eq!(app.prompt.as_ref().unwrap().1, "a");
        app.cancel_prompt();

        app.open_prompt(PromptKind::ImagePath);
        for c in "/tmp/logo.png".chars() {
            app.prompt_push(c);
        }
        assert_eq!(app.prompt.as_ref().unwrap().1, "/tmp/logo.png");
    }

    #[test]
    fn saved_commands_carry_the_full_filename() {
        let mut app = app();
        app.update(DeviceEvent::Saved(vec![SavedMatrix {
            filename: "sunset.json".into(),
            image: "/jumbotron/get_saved_matrix_image/sunset.json".into(),
        }]));

        // The sidebar shows the stripped name, the wire gets the
        // filename the device stores.
        assert_eq!(app.selected_saved().unwrap().name(), "sunset");
        assert!(matches!(
            app.activate_selected(),
            Some(DeviceCommand::Activate(f)) if f == "sunset.json"
        ));
        assert!(matches!(
            app.delete_selected(),
            Some(DeviceCommand::Delete(f)) if f == "sunset.json"
        ));

        app.update(DeviceEvent::Saved(Vec::new()));
        assert!(app.activate_selected().is_none());
    }

    #[test]
    fn reset_confirm_submits_without_text() {
        let mut app = app();
        app.open_prompt(PromptKind::ConfirmReset);
        app.prompt_push('y'); // ignored, the key is handled upstream
        assert_eq!(
            app.submit_prompt(),
            Some((PromptKind::ConfirmReset, String::new()))
        );
    }
}
