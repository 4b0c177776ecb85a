//! Terminal progress bar fed by the scheduler's progress channel.

use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

use chess_analysis::Progress;
use indicatif::{ProgressBar, ProgressStyle};

const TEMPLATE: &str = "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} games (eta {eta})";

/// Start a thread drawing a bar for `total` games on stderr.
///
/// The thread exits once every clone of the returned sender is dropped.
pub fn spawn_progress_bar(total: usize) -> (Sender<Progress>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel::<Progress>();
    let handle = thread::spawn(move || {
        let bar = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::default_bar().template(TEMPLATE) {
            bar.set_style(style);
        }
        for progress in rx {
            bar.set_position(progress.completed as u64);
        }
        bar.finish_and_clear();
    });
    (tx, handle)
}
