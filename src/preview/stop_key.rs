use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Operator stop key: typing `q` and Enter on the console.
///
/// Reads on a dedicated thread (blocking console reads would otherwise keep
/// the async runtime from shutting down). End of input just ends the thread.
pub struct StopKey {
    pressed: Arc<AtomicBool>,
}

impl StopKey {
    /// Listen on the process's stdin.
    pub fn listen_stdin() -> std::io::Result<Self> {
        Self::listen(std::io::BufReader::new(std::io::stdin()))
    }

    /// Listen on any line-oriented reader.
    pub fn listen<R: BufRead + Send + 'static>(reader: R) -> std::io::Result<Self> {
        let pressed = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&pressed);
        std::thread::Builder::new()
            .name("stop-key".to_string())
            .spawn(move || {
                for line in reader.lines() {
                    let Ok(line) = line else { break };
                    if is_stop_key(&line) {
                        tracing::info!("stop key pressed");
                        flag.store(true, Ordering::Release);
                        break;
                    }
                }
            })?;
        Ok(Self { pressed })
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed.load(Ordering::Acquire)
    }
}

fn is_stop_key(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("q")
}
