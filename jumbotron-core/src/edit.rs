//! Local edit gestures → remote mutation requests.
//!
//! The dispatcher turns pointer interactions over the grid into
//! discrete [`Mutation`]s and hands them to a [`MutationSink`]. The
//! production sink fire-and-forgets each mutation over HTTP: no queue,
//! no retry, no acknowledgement. Mutations are idempotent at the
//! protocol level, so ordering between in-flight requests does not
//! matter.

use std::sync::Arc;

use tracing::debug;

use crate::api::DeviceApi;
use crate::pixel::Rgb;

// ── EditMode ─────────────────────────────────────────────────────

/// How a pointer gesture on the grid translates into a mutation scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditMode {
    /// Paint the touched cell.
    #[default]
    Pixel,
    /// Paint the touched cell's whole row.
    Row,
    /// Paint the touched cell's whole column.
    Column,
    /// Paint every cell.
    All,
    /// Blank the touched cell.
    Eraser,
}

impl std::fmt::Display for EditMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Pixel => "Pixel",
            Self::Row => "Row",
            Self::Column => "Column",
            Self::All => "All",
            Self::Eraser => "Eraser",
        };
        write!(f, "{name}")
    }
}

// ── Mutation ─────────────────────────────────────────────────────

/// One remote mutation request: a scope, a color, a brightness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Pixel {
        row: usize,
        column: usize,
        color: Rgb,
        brightness: u8,
    },
    Row {
        row: usize,
        color: Rgb,
        brightness: u8,
    },
    Column {
        column: usize,
        color: Rgb,
        brightness: u8,
    },
    All {
        color: Rgb,
        brightness: u8,
    },
}

// ── MutationSink ─────────────────────────────────────────────────

/// Where dispatched mutations go. The seam exists so gesture logic is
/// testable without a device on the network.
pub trait MutationSink: Send + Sync {
    fn dispatch(&self, mutation: Mutation);
}

/// Production sink: one spawned, unawaited HTTP call per mutation.
/// Failures are logged and otherwise ignored (at-most-once is fine
/// because every mutation is idempotent).
pub struct ApiSink {
    api: Arc<DeviceApi>,
}

impl ApiSink {
    pub fn new(api: Arc<DeviceApi>) -> Self {
        Self { api }
    }
}

impl MutationSink for ApiSink {
    fn dispatch(&self, mutation: Mutation) {
        let api = Arc::clone(&self.api);
        tokio::spawn(async move {
            let result = match mutation {
                Mutation::Pixel {
                    row,
                    column,
                    color,
                    brightness,
                } => api.set_pixel(row, column, color, brightness).await,
                Mutation::Row {
                    row,
                    color,
                    brightness,
                } => api.set_row(row, color, brightness).await,
                Mutation::Column {
                    column,
                    color,
                    brightness,
                } => api.set_column(column, color, brightness).await,
                Mutation::All { color, brightness } => api.set_all(color, brightness).await,
            };
            if let Err(e) = result {
                debug!(error = %e, ?mutation, "mutation call failed");
            }
        });
    }
}

// ── EditDispatcher ───────────────────────────────────────────────

/// Translates pointer gestures into mutations under the active
/// [`EditMode`], color and brightness.
pub struct EditDispatcher {
    sink: Arc<dyn MutationSink>,
    mode: EditMode,
    color: Rgb,
    brightness: u8,
    drawing: bool,
}

impl EditDispatcher {
    pub fn new(sink: Arc<dyn MutationSink>) -> Self {
        Self {
            sink,
            mode: EditMode::default(),
            color: Rgb::WHITE,
            brightness: 0,
            drawing: false,
        }
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: EditMode) {
        self.mode = mode;
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    pub fn set_color(&mut self, color: Rgb) {
        self.color = color;
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    pub fn set_brightness(&mut self, brightness: u8) {
        self.brightness = brightness;
    }

    /// Whether a drag-paint gesture is in progress.
    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    /// Pointer pressed on a cell: start drawing and issue one mutation
    /// for that cell under the active mode.
    pub fn pointer_down(&mut self, row: usize, column: usize) {
        self.drawing = true;
        self.apply(row, column);
    }

    /// Pointer moved onto a cell. Issues a mutation only while a drag
    /// is in progress.
    pub fn pointer_over(&mut self, row: usize, column: usize) {
        if self.drawing {
            self.apply(row, column);
        }
    }

    /// Pointer released, anywhere (including outside the grid).
    pub fn pointer_up(&mut self) {
        self.drawing = false;
    }

    fn apply(&self, row: usize, column: usize) {
        let mutation = match self.mode {
            EditMode::Pixel => Mutation::Pixel {
                row,
                column,
                color: self.color,
                brightness: self.brightness,
            },
            EditMode::Row => Mutation::Row {
                row,
                color: self.color,
                brightness: self.brightness,
            },
            EditMode::Column => Mutation::Column {
                column,
                color: self.color,
                brightness: self.brightness,
            },
            EditMode::All => Mutation::All {
                color: self.color,
                brightness: self.brightness,
            },
            // Eraser: black at full brightness, same as the device's
            // own blank cell convention.
            EditMode::Eraser => Mutation::Pixel {
                row,
                column,
                color: Rgb::BLACK,
                brightness: 255,
            },
        };
        self.sink.dispatch(mutation);
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<Mutation>>,
    }

    impl MutationSink for RecordingSink {
        fn dispatch(&self, mutation: Mutation) {
            self.sent.lock().unwrap().push(mutation);
        }
    }

    fn dispatcher() -> (Arc<RecordingSink>, EditDispatcher) {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = EditDispatcher::new(sink.clone() as Arc<dyn MutationSink>);
        (sink, dispatcher)
    }

    #[test]
    fn drag_sequence_paints_each_hovered_cell() {
        let (sink, mut d) = dispatcher();
        d.set_color(Rgb::new(255, 0, 160));
        d.set_brightness(40);

        d.pointer_down(2, 3);
        assert!(d.is_drawing());
        d.pointer_over(2, 4);
        d.pointer_up();
        assert!(!d.is_drawing());
        // After release, hovering issues nothing.
        d.pointer_over(2, 5);

        let sent = sink.sent.lock().unwrap();
        assert_eq!(
            *sent,
            vec![
                Mutation::Pixel {
                    row: 2,
                    column: 3,
                    color: Rgb::new(255, 0, 160),
                    brightness: 40
                },
                Mutation::Pixel {
                    row: 2,
                    column: 4,
                    color: Rgb::new(255, 0, 160),
                    brightness: 40
                },
            ]
        );
    }

    #[test]
    fn pointer_over_without_drag_is_silent() {
        let (sink, mut d) = dispatcher();
        d.pointer_over(0, 0);
        assert!(sink.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn row_mode_targets_whole_row() {
        let (sink, mut d) = dispatcher();
        d.set_mode(EditMode::Row);
        d.set_color(Rgb::new(1, 2, 3));
        d.set_brightness(10);
        d.pointer_down(5, 9);
        d.pointer_up();

        assert_eq!(
            sink.sent.lock().unwrap()[0],
            Mutation::Row {
                row: 5,
                color: Rgb::new(1, 2, 3),
                brightness: 10
            }
        );
    }

    #[test]
    fn column_and_all_modes() {
        let (sink, mut d) = dispatcher();

        d.set_mode(EditMode::Column);
        d.pointer_down(5, 9);
        d.pointer_up();

        d.set_mode(EditMode::All);
        d.pointer_down(0, 0);
        d.pointer_up();

        let sent = sink.sent.lock().unwrap();
        assert!(matches!(sent[0], Mutation::Column { column: 9, .. }));
        assert!(matches!(sent[1], Mutation::All { .. }));
    }

    #[test]
    fn eraser_blanks_the_cell() {
        let (sink, mut d) = dispatcher();
        d.set_mode(EditMode::Eraser);
        d.set_color(Rgb::new(200, 200, 200)); // ignored by eraser
        d.pointer_down(1, 2);

        assert_eq!(
            sink.sent.lock().unwrap()[0],
            Mutation::Pixel {
                row: 1,
                column: 2,
                color: Rgb::BLACK,
                brightness: 255
            }
        );
    }

    #[test]
    fn pointer_up_is_idempotent() {
        let (sink, mut d) = dispatcher();
        d.pointer_up();
        d.pointer_up();
        d.pointer_over(3, 3);
        assert!(sink.sent.lock().unwrap().is_empty());
    }
}
