use crate::catalog::CaseId;
use crate::engine::state::Tally;
use tokio::sync::broadcast;

/// Engine events for real-time updates. The engine never calls presentation
/// code directly; listeners subscribe to this channel or poll snapshots.
#[derive(Debug, Clone)]
pub enum TestEvent {
    BatchStarted {
        total: usize,
    },
    BatchFinished {
        tally: Tally,
        duration_ms: u64,
    },

    CaseStarted {
        id: CaseId,
        name: String,
        expected_status: u16,
        expected_code: String,
    },
    CasePassed {
        id: CaseId,
        status_code: u16,
        duration_ms: u64,
    },
    CaseFailed {
        id: CaseId,
        status_code: u16,
        received_code: Option<String>,
        duration_ms: u64,
    },
    CaseErrored {
        id: CaseId,
        message: String,
        duration_ms: u64,
    },

    ResultsCleared,
}

/// Event emitter for broadcasting engine events
pub struct EventEmitter {
    sender: broadcast::Sender<TestEvent>,
}

impl EventEmitter {
    pub fn new() -> (Self, broadcast::Receiver<TestEvent>) {
        let (sender, receiver) = broadcast::channel(100);
        (Self { sender }, receiver)
    }

    pub fn emit(&self, event: TestEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TestEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }
}

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration as StdDuration;

/// Console event listener printing per-case progress and the final summary
pub struct ConsoleEventListener;

impl ConsoleEventListener {
    pub async fn listen(mut receiver: broadcast::Receiver<TestEvent>) {
        use colored::Colorize;
        use indicatif::ProgressDrawTarget;
        use std::io::IsTerminal;

        // Spinners go hidden when piped, to keep escape codes out of logs
        let is_tty = std::io::stdout().is_terminal();

        let mut spinner: Option<ProgressBar> = None;
        let mut case_text = String::new();

        while let Ok(event) = receiver.recv().await {
            match event {
                TestEvent::BatchStarted { total } => {
                    println!(
                        "\n{} Running {} test cases",
                        "▶".green().bold(),
                        total.to_string().cyan()
                    );
                }

                TestEvent::BatchFinished { tally, duration_ms } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    println!("\n{} Batch finished", "■".blue().bold());
                    println!(
                        "  {} passed, {} failed, {} pending",
                        tally.passed.to_string().green(),
                        tally.failed.to_string().red(),
                        tally.pending.to_string().yellow()
                    );
                    println!("  Duration: {}ms", duration_ms);
                }

                TestEvent::CaseStarted {
                    id,
                    name,
                    expected_status,
                    expected_code,
                } => {
                    let pb = ProgressBar::new_spinner();
                    if !is_tty {
                        pb.set_draw_target(ProgressDrawTarget::hidden());
                    }
                    let style = ProgressStyle::default_spinner()
                        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                        .template("    {spinner} {msg}")
                        .unwrap();
                    pb.set_style(style);

                    case_text = format!(
                        "[{}] {} (expect {} · {})... ",
                        id,
                        name.dimmed(),
                        expected_status,
                        expected_code
                    );
                    pb.set_message(case_text.clone());
                    pb.enable_steady_tick(StdDuration::from_millis(100));
                    spinner = Some(pb);
                }

                TestEvent::CasePassed {
                    status_code,
                    duration_ms,
                    ..
                } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    println!(
                        "    {} {}{} ({}ms)",
                        "✓".green(),
                        case_text,
                        status_code,
                        duration_ms
                    );
                }

                TestEvent::CaseFailed {
                    status_code,
                    received_code,
                    duration_ms,
                    ..
                } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    println!(
                        "    {} {}got {} · {} ({}ms)",
                        "✗".red(),
                        case_text,
                        status_code.to_string().red(),
                        received_code.as_deref().unwrap_or("N/A").red(),
                        duration_ms
                    );
                }

                TestEvent::CaseErrored {
                    message,
                    duration_ms,
                    ..
                } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    println!(
                        "    {} {}{} ({}ms)",
                        "⚠".yellow(),
                        case_text,
                        message.yellow(),
                        duration_ms
                    );
                }

                TestEvent::ResultsCleared => {
                    println!("{} Results cleared", "ℹ".blue());
                }
            }
        }
    }
}
