use std::io::{self, Write};

use serde::{Deserialize, Serialize};

/// Line protocol spoken to a parent process, one JSON object per line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    Progress { episode: usize, total: usize },
    WroteResults { path: String },
    Error { message: String },
}

impl Event {
    pub fn to_line(&self) -> String {
        // Only strings and integers, serialization cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Write the event and flush so the reader sees it immediately. Failures are
    /// ignored, the observer is best effort.
    pub fn emit(&self, out: &mut impl Write) {
        let _ = writeln!(out, "{}", self.to_line());
        let _ = out.flush();
    }
}

/// Receives a notification after every completed training episode.
pub trait ProgressSink {
    fn episode_completed(&mut self, episode: usize, total: usize);
}

impl<F: FnMut(usize, usize)> ProgressSink for F {
    fn episode_completed(&mut self, episode: usize, total: usize) {
        self(episode, total)
    }
}

/// Progress as `progress` events on stdout
pub struct StdoutProgress;

impl ProgressSink for StdoutProgress {
    fn episode_completed(&mut self, episode: usize, total: usize) {
        Event::Progress { episode, total }.emit(&mut io::stdout().lock());
    }
}
