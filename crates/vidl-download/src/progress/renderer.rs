//! The rendering actor and its public handle.

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use console::Term;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{MissedTickBehavior, interval};
use tracing::trace;

use super::bar::BarState;

/// Render tick period. Producers may update arbitrarily fast; the terminal
/// never sees more than one frame per tick.
const RENDER_TICK: Duration = Duration::from_millis(150);

/// Inbound queue capacity. Generous enough that only an `update` flood ever
/// fills it, and `update` drops rather than stall its worker.
const EVENT_QUEUE_CAPACITY: usize = 256;

/// Identifier for one registered progress bar.
///
/// Process-unique and monotonic. Stays inert after the bar finishes:
/// further events for a finished id are no-ops.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BarId(u64);

impl fmt::Display for BarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bar-{}", self.0)
    }
}

enum ProgressEvent {
    Register {
        id: BarId,
        prefix: String,
        total: u64,
    },
    Update {
        id: BarId,
        delta: u64,
        value: u64,
        total: u64,
    },
    Finish {
        id: BarId,
    },
    Log {
        message: String,
    },
    Flush {
        ack: oneshot::Sender<()>,
    },
}

/// Handle feeding the rendering actor.
///
/// Cheap to clone; every transfer worker gets its own copy. One renderer is
/// created per process invocation and torn down implicitly at exit — call
/// [`ProgressRenderer::flush`] first when final output must be visible.
#[derive(Clone)]
pub struct ProgressRenderer {
    events: mpsc::Sender<ProgressEvent>,
    next_id: Arc<AtomicU64>,
}

impl ProgressRenderer {
    /// Renderer writing to standard error, auto-detecting interactivity and
    /// terminal width. Must be called within a tokio runtime.
    #[must_use]
    pub fn stderr() -> Self {
        let term = Term::stderr();
        let columns = term.size().1;
        Self::with_output(Box::new(io::stderr()), term.is_term(), columns)
    }

    /// Renderer with an explicit output stream and display mode.
    ///
    /// Used by tests and by callers that already decided how output is
    /// captured. Must be called within a tokio runtime.
    #[must_use]
    pub fn with_output(out: Box<dyn Write + Send>, interactive: bool, columns: u16) -> Self {
        let (events, inbox) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let actor = RenderActor {
            out,
            interactive,
            columns,
            bars: HashMap::new(),
            order: Vec::new(),
            last_lines: 0,
        };
        tokio::spawn(actor.run(inbox));
        Self {
            events,
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Register a new bar and return its id.
    ///
    /// Returns as soon as the event is enqueued; display order still follows
    /// registration order because events keep their arrival order through
    /// the queue.
    pub async fn register(&self, prefix: impl Into<String>, total: u64) -> BarId {
        let id = BarId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let _ = self
            .events
            .send(ProgressEvent::Register {
                id,
                prefix: prefix.into(),
                total,
            })
            .await;
        id
    }

    /// Report progress for a bar.
    ///
    /// Never blocks the caller: under queue pressure the update is dropped,
    /// and the next successful update or the final [`Self::finish`] converges
    /// the displayed value. `delta` advances the count; a non-zero `value`
    /// sets it absolutely; a non-zero `total` replaces a total discovered
    /// late.
    pub fn update(&self, id: BarId, delta: u64, value: u64, total: u64) {
        let event = ProgressEvent::Update {
            id,
            delta,
            value,
            total,
        };
        if self.events.try_send(event).is_err() {
            trace!(%id, "dropped progress update under queue pressure");
        }
    }

    /// Remove a bar from the display, snapping it to its final value first.
    ///
    /// Delivered even under queue pressure; losing a finish would leave a
    /// stale bar on screen forever.
    pub async fn finish(&self, id: BarId) {
        let _ = self.events.send(ProgressEvent::Finish { id }).await;
    }

    /// Print a message without corrupting the bars currently on screen.
    pub async fn log(&self, message: impl Into<String>) {
        let _ = self
            .events
            .send(ProgressEvent::Log {
                message: message.into(),
            })
            .await;
    }

    /// Wait until every previously enqueued event has been processed and a
    /// render has reached the output.
    ///
    /// The only suspending operation; it is the "all output prior to this
    /// point is visible" barrier used before process exit.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.events.send(ProgressEvent::Flush { ack }).await.is_ok() {
            let _ = done.await;
        }
    }
}

/// The actor owning all display state. Nothing outside [`RenderActor::run`]
/// ever touches it.
struct RenderActor {
    out: Box<dyn Write + Send>,
    interactive: bool,
    columns: u16,
    bars: HashMap<BarId, BarState>,
    order: Vec<BarId>,
    last_lines: usize,
}

impl RenderActor {
    async fn run(mut self, mut inbox: mpsc::Receiver<ProgressEvent>) {
        let mut tick = interval(RENDER_TICK);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut dirty = false;
        loop {
            tokio::select! {
                event = inbox.recv() => {
                    // All handles dropped: nothing can ever arrive again.
                    let Some(event) = event else { break };
                    match event {
                        ProgressEvent::Register { id, prefix, total } => {
                            self.handle_register(id, prefix, total);
                            dirty = true;
                        }
                        ProgressEvent::Update { id, delta, value, total } => {
                            self.handle_update(id, delta, value, total);
                            dirty = true;
                        }
                        ProgressEvent::Finish { id } => {
                            self.handle_finish(id);
                            dirty = true;
                        }
                        ProgressEvent::Log { message } => {
                            // Renders on its own, before and after the line.
                            self.handle_log(&message);
                            dirty = false;
                        }
                        ProgressEvent::Flush { ack } => {
                            self.render();
                            dirty = false;
                            let _ = ack.send(());
                        }
                    }
                }
                _ = tick.tick() => {
                    if dirty {
                        self.render();
                        dirty = false;
                    }
                }
            }
        }
    }

    fn handle_register(&mut self, id: BarId, prefix: String, total: u64) {
        if self.bars.contains_key(&id) {
            return;
        }
        self.bars.insert(id, BarState::new(prefix, total));
        self.order.push(id);
    }

    fn handle_update(&mut self, id: BarId, delta: u64, value: u64, total: u64) {
        if let Some(bar) = self.bars.get_mut(&id) {
            bar.apply(delta, value, total);
        }
    }

    fn handle_finish(&mut self, id: BarId) {
        let Some(mut bar) = self.bars.remove(&id) else {
            return;
        };
        bar.complete();
        self.order.retain(|seen| *seen != id);
    }

    fn handle_log(&mut self, message: &str) {
        if self.interactive {
            self.clear_bars();
            let _ = writeln!(self.out, "{message}");
            self.render();
            return;
        }
        // Non-interactive: bars are re-printed around the message so the
        // captured log keeps a record of bar state at the time of the line.
        if !self.bars.is_empty() {
            self.render();
        }
        let _ = writeln!(self.out, "{message}");
        if !self.bars.is_empty() {
            self.render();
        }
    }

    fn render(&mut self) {
        let lines: Vec<String> = self
            .order
            .iter()
            .filter_map(|id| self.bars.get(id))
            .map(|bar| bar.render_line(self.columns, self.interactive))
            .collect();

        if self.interactive {
            self.clear_bars();
            for line in &lines {
                let _ = writeln!(self.out, "\r\x1b[2K{line}");
            }
        } else {
            for line in &lines {
                let _ = writeln!(self.out, "{line}");
            }
        }
        self.last_lines = lines.len();
        let _ = self.out.flush();
    }

    /// Erase the previous frame: cursor up to the first bar line, clear each
    /// line, and leave the cursor where the next frame starts.
    fn clear_bars(&mut self) {
        if self.last_lines == 0 {
            return;
        }
        let _ = write!(self.out, "\x1b[{}A", self.last_lines);
        for i in 0..self.last_lines {
            let _ = write!(self.out, "\r\x1b[2K");
            if i + 1 < self.last_lines {
                let _ = writeln!(self.out);
            }
        }
        if self.last_lines > 1 {
            let _ = write!(self.out, "\x1b[{}A", self.last_lines - 1);
        }
        self.last_lines = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_id_display() {
        assert_eq!(BarId(7).to_string(), "bar-7");
    }

    #[tokio::test]
    async fn test_register_allocates_distinct_ids() {
        let renderer = ProgressRenderer::with_output(Box::new(io::sink()), false, 80);
        let first = renderer.register("one", 10).await;
        let second = renderer.register("two", 10).await;
        assert_ne!(first, second);

        // Clones share the counter; ids stay process-unique.
        let third = renderer.clone().register("three", 10).await;
        assert_ne!(second, third);
    }
}
