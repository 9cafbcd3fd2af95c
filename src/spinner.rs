//! Progress line for `verisolve solve`, since a local model can take a while.

use std::io::Write;
use std::time::{Duration, Instant};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

const FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

const TICK: Duration = Duration::from_millis(80);

/// Erase the current stderr line and return the cursor.
const CLEAR_LINE: &str = "\x1b[2K\r";

/// An animated stderr line showing what is running and for how long.
pub struct Spinner {
    task: JoinHandle<()>,
    done: oneshot::Sender<()>,
}

fn frame_line(tick: usize, label: &str, elapsed: Duration) -> String {
    let frame = FRAMES[tick % FRAMES.len()];
    format!("{frame} {label} ({}s)", elapsed.as_secs())
}

impl Spinner {
    pub fn start(label: &str) -> Self {
        let (done, mut stopped) = oneshot::channel();
        let label = label.to_string();
        let started = Instant::now();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(TICK);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut tick = 0usize;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        eprint!("{CLEAR_LINE}{}", frame_line(tick, &label, started.elapsed()));
                        let _ = std::io::stderr().flush();
                        tick = tick.wrapping_add(1);
                    }
                    _ = &mut stopped => break,
                }
            }
            eprint!("{CLEAR_LINE}");
            let _ = std::io::stderr().flush();
        });

        Self { task, done }
    }

    /// Stop animating and leave the line blank.
    pub async fn stop(self) {
        let _ = self.done.send(());
        let _ = self.task.await;
    }
}
