//! Line-oriented stdin reader for the interactive sessions.

use std::io::BufRead;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

/// Forward each trimmed, non-empty stdin line until EOF or until the
/// receiver is dropped.
pub fn spawn_stdin_lines<T>(tx: Sender<T>) -> JoinHandle<()>
where
    T: From<String> + Send + 'static,
{
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if tx.send(T::from(line.to_string())).is_err() {
                return;
            }
        }
    })
}
