//! Push channel: server-sent events from `GET {base_url}{push_path}`.
//!
//! The stream is read on a helper thread because `ureq` reads block. The
//! thread only parses frames and forwards [`PushEvent`]s over an mpsc
//! channel; all state stays with the session loop that owns the receiver.
//!
//! Recognised events:
//!
//! | `event:`                | `data:`                          |
//! |-------------------------|----------------------------------|
//! | `reading-update`        | latest reading object            |
//! | `settings-update`       | settings snapshot object         |
//! | `analysis-state-change` | `{ "analysis_running": bool }`   |

use std::io::{BufRead, BufReader};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};

use super::types::{self, LatestReading, SettingsSnapshot};
use crate::events;

/// Delay before the listener tries to reopen a dropped stream.
const RECONNECT_DELAY: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    /// The stream is open; the push transport is available.
    Connected,
    Reading(LatestReading),
    Settings(SettingsSnapshot),
    AnalysisState(bool),
    /// The stream failed or ended; the reason is for the log.
    Disconnected(String),
}

// ---------------------------------------------------------------------------
// Frame parsing
// ---------------------------------------------------------------------------

/// Incremental SSE frame parser: feed it lines, it yields `(event, data)`
/// whenever a blank line terminates a frame.
#[derive(Debug, Default)]
pub struct SseParser {
    event: Option<String>,
    data: Vec<String>,
}

impl SseParser {
    pub fn feed_line(&mut self, line: &str) -> Option<(String, String)> {
        let line = line.strip_suffix('\r').unwrap_or(line);

        if line.is_empty() {
            if self.data.is_empty() {
                self.event = None;
                return None;
            }
            let event = self.event.take().unwrap_or_else(|| "message".to_string());
            let data = self.data.join("\n");
            self.data.clear();
            return Some((event, data));
        }

        if line.starts_with(':') {
            return None;
        }

        let (field, value) = line.split_once(':').unwrap_or((line, ""));
        let value = value.strip_prefix(' ').unwrap_or(value);
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }
        None
    }
}

/// Turn a parsed frame into an event. Unknown event names yield `Ok(None)`;
/// known names with a malformed body are an error.
pub fn decode_event(event: &str, data: &str) -> Result<Option<PushEvent>> {
    let parse = || -> Result<serde_json::Value> {
        serde_json::from_str(data).with_context(|| format!("{event}: body is not JSON"))
    };
    match event {
        "reading-update" => Ok(Some(PushEvent::Reading(types::parse_latest(parse()?)?))),
        "settings-update" => Ok(Some(PushEvent::Settings(types::parse_settings(parse()?)?))),
        "analysis-state-change" => {
            let running = parse()?
                .get("analysis_running")
                .and_then(serde_json::Value::as_bool)
                .context("analysis-state-change: missing 'analysis_running'")?;
            Ok(Some(PushEvent::AnalysisState(running)))
        }
        _ => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// Listener thread
// ---------------------------------------------------------------------------

/// Spawn the stream reader. It reconnects after [`RECONNECT_DELAY`] until
/// the receiving side is dropped. Sessions that multiplex several sources
/// on one channel pass a sender of their own message type.
pub fn spawn_listener<T>(url: String, connect_timeout: Duration, tx: Sender<T>) -> JoinHandle<()>
where
    T: From<PushEvent> + Send + 'static,
{
    thread::spawn(move || {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(connect_timeout)
            .build();

        loop {
            let reason = match stream_once(&agent, &url, &tx) {
                Ok(StreamEnd::ReceiverGone) => return,
                Ok(StreamEnd::Eof) => "stream closed by server".to_string(),
                Err(e) => format!("{e:#}"),
            };
            if tx.send(T::from(PushEvent::Disconnected(reason))).is_err() {
                return;
            }
            thread::sleep(RECONNECT_DELAY);
        }
    })
}

enum StreamEnd {
    Eof,
    ReceiverGone,
}

fn stream_once<T: From<PushEvent>>(
    agent: &ureq::Agent,
    url: &str,
    tx: &Sender<T>,
) -> Result<StreamEnd> {
    let resp = agent
        .get(url)
        .set("Accept", "text/event-stream")
        .call()
        .context("push stream unavailable")?;

    if tx.send(T::from(PushEvent::Connected)).is_err() {
        return Ok(StreamEnd::ReceiverGone);
    }

    let mut parser = SseParser::default();
    for line in BufReader::new(resp.into_reader()).lines() {
        let line = line.context("push stream read failed")?;
        let Some((event, data)) = parser.feed_line(&line) else {
            continue;
        };
        match decode_event(&event, &data) {
            Ok(Some(ev)) => {
                if tx.send(T::from(ev)).is_err() {
                    return Ok(StreamEnd::ReceiverGone);
                }
            }
            Ok(None) => {}
            Err(e) => events::warn("push", format!("dropped malformed event: {e:#}")),
        }
    }
    Ok(StreamEnd::Eof)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(input: &str) -> Vec<(String, String)> {
        let mut parser = SseParser::default();
        input.lines().filter_map(|l| parser.feed_line(l)).collect()
    }

    #[test]
    fn parser_yields_named_frames() {
        let got = frames(
            "event: reading-update\ndata: {\"ppm\": 900}\n\n: keep-alive\n\nevent: analysis-state-change\r\ndata:{\"analysis_running\":false}\r\n\r\n",
        );
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].0, "reading-update");
        assert_eq!(got[0].1, "{\"ppm\": 900}");
        assert_eq!(got[1].1, "{\"analysis_running\":false}");
    }

    #[test]
    fn parser_joins_multiline_data_and_defaults_event_name() {
        let got = frames("data: a\ndata: b\n\n");
        assert_eq!(got, vec![("message".to_string(), "a\nb".to_string())]);
    }

    #[test]
    fn decode_known_events() {
        let ev = decode_event("reading-update", r#"{"ppm": 1010, "analysis_running": true}"#)
            .unwrap()
            .unwrap();
        match ev {
            PushEvent::Reading(r) => assert_eq!(r.ppm, Some(1010)),
            other => panic!("unexpected {other:?}"),
        }

        let ev = decode_event("analysis-state-change", r#"{"analysis_running": false}"#).unwrap();
        assert_eq!(ev, Some(PushEvent::AnalysisState(false)));

        let ev = decode_event(
            "settings-update",
            r#"{"good_threshold": 700, "bad_threshold": 1100}"#,
        )
        .unwrap();
        assert!(matches!(ev, Some(PushEvent::Settings(s)) if s.thresholds.good() == 700));
    }

    #[test]
    fn decode_ignores_unknown_and_rejects_malformed() {
        assert_eq!(decode_event("heartbeat", "{}").unwrap(), None);
        assert!(decode_event("reading-update", "not json").is_err());
        assert!(decode_event("analysis-state-change", "{}").is_err());
    }
}
