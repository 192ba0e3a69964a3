#[cfg(test)]
#[path = "progress_test.rs"]
mod tests;

use tokio::sync::mpsc;
use yansi::Paint;

use crate::domain::models::Event;
use crate::domain::models::ProgressStep;
use crate::domain::models::StepStatus;

fn icon(status: StepStatus) -> String {
    return match status {
        StepStatus::Done => Paint::green("✓").to_string(),
        StepStatus::Loading => Paint::yellow("⟳").to_string(),
        StepStatus::Error => Paint::red("✕").to_string(),
        StepStatus::Pending => Paint::new("○").dimmed().to_string(),
    };
}

pub fn render_steps(steps: &[ProgressStep]) -> String {
    return steps
        .iter()
        .map(|e| return format!("  {} {}", icon(e.status), e.label))
        .collect::<Vec<String>>()
        .join("\n");
}

/// Turns tracker events into terminal output, skipping progress updates that
/// change nothing.
#[derive(Default)]
pub struct ProgressPrinter {
    last_steps: Vec<ProgressStep>,
    commit_url: Option<String>,
}

impl ProgressPrinter {
    pub fn handle(&mut self, event: Event) -> Option<String> {
        match event {
            Event::Progress(steps) => {
                if steps == self.last_steps {
                    return None;
                }

                let res = render_steps(&steps);
                self.last_steps = steps;
                return Some(res);
            }
            Event::StatusSnapshot(snapshot) => {
                tracing::debug!(status = %snapshot.status, "Status snapshot");
                if snapshot.is_pushed() && snapshot.github_commit_url != self.commit_url {
                    self.commit_url = snapshot.github_commit_url.clone();
                    return snapshot
                        .github_commit_url
                        .map(|e| return format!("  Commit: {e}"));
                }

                return None;
            }
            Event::Message(message) => return Some(message),
        }
    }
}

pub async fn print_events(mut rx: mpsc::UnboundedReceiver<Event>) {
    let mut printer = ProgressPrinter::default();
    while let Some(event) = rx.recv().await {
        if let Some(text) = printer.handle(event) {
            println!("{text}\n");
        }
    }
}
