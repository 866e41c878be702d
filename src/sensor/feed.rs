use crossbeam_channel::{Receiver, Sender, TryRecvError};
use log::{debug, info, warn};
use std::cell::Cell;
use std::io::BufRead;
use std::thread;
use std::time::{Duration, Instant};

use super::TimedEvent;
use crate::error::{SanpoError, SanpoResult};

/// Parse a JSON-lines sensor trace. Blank lines and lines starting with `#`
/// are skipped.
pub fn read_trace<R: BufRead>(reader: R) -> SanpoResult<Vec<TimedEvent>> {
    let mut events = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if let Some(event) = parse_line(&line, index + 1)? {
            events.push(event);
        }
    }
    Ok(events)
}

fn parse_line(line: &str, line_number: usize) -> SanpoResult<Option<TimedEvent>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    serde_json::from_str(trimmed)
        .map(Some)
        .map_err(|e| SanpoError::TraceParse {
            line: line_number,
            reason: e.to_string(),
        })
}

/// Live sensor input: a reader thread forwarding events over a channel.
///
/// Events are re-stamped with the time they are handed to the channel,
/// measured in milliseconds from `epoch`. When the input carries its own
/// timestamps the thread paces itself by them, so a recorded trace plays back
/// at its original rate.
pub struct SensorFeed {
    receiver: Receiver<TimedEvent>,
    disconnected: Cell<bool>,
    _reader_thread: Option<thread::JoinHandle<()>>,
}

impl SensorFeed {
    pub fn spawn<R>(reader: R, epoch: Instant) -> Self
    where
        R: BufRead + Send + 'static,
    {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let handle = thread::spawn(move || Self::pump(reader, epoch, sender));
        Self {
            receiver,
            disconnected: Cell::new(false),
            _reader_thread: Some(handle),
        }
    }

    /// A feed that never produces events, for hosts without a sensor source.
    pub fn silent() -> Self {
        let (_sender, receiver) = crossbeam_channel::unbounded();
        Self {
            receiver,
            disconnected: Cell::new(false),
            _reader_thread: None,
        }
    }

    fn pump<R: BufRead>(reader: R, epoch: Instant, sender: Sender<TimedEvent>) {
        let started = Instant::now();
        let mut first_trace_ms: Option<u64> = None;
        let mut forwarded = 0usize;

        for (index, line) in reader.lines().enumerate() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("Sensor input read error: {}", e);
                    break;
                }
            };
            let mut event = match parse_line(&line, index + 1) {
                Ok(Some(event)) => event,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Skipping sensor record: {}", e);
                    continue;
                }
            };

            let origin = *first_trace_ms.get_or_insert(event.timestamp_ms);
            let due = Duration::from_millis(event.timestamp_ms.saturating_sub(origin));
            let elapsed = started.elapsed();
            if due > elapsed {
                thread::sleep(due - elapsed);
            }

            event.timestamp_ms = epoch.elapsed().as_millis() as u64;
            if sender.send(event).is_err() {
                debug!("Sensor feed receiver dropped");
                return;
            }
            forwarded += 1;
        }
        info!("Sensor input ended after {} events", forwarded);
    }

    /// Everything received since the last call, oldest first. Never blocks.
    pub fn drain(&self) -> Vec<TimedEvent> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.disconnected.set(true);
                    break;
                }
            }
        }
        events
    }

    /// True once a `drain` has seen the reader finish with nothing left queued.
    pub fn is_exhausted(&self) -> bool {
        self.disconnected.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::SensorEvent;
    use std::io::Cursor;

    const TRACE: &str = r#"
# recorded on a phone in a pocket
{"t": 0, "type": "motion", "x": 0.0, "y": 9.8, "z": 0.0, "gravity": true}

{"t": 20, "type": "pointer", "x": 100, "width": 400}
"#;

    #[test]
    fn test_read_trace_skips_comments_and_blanks() {
        let events = read_trace(Cursor::new(TRACE)).unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0].event, SensorEvent::Motion(_)));
        assert_eq!(events[1], TimedEvent::pointer(20, 100.0, 400.0));
    }

    #[test]
    fn test_read_trace_reports_line() {
        let trace = "{\"t\": 0, \"type\": \"pointer\", \"x\": 1, \"width\": 2}\n{\"t\": oops}\n";
        match read_trace(Cursor::new(trace)) {
            Err(SanpoError::TraceParse { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_feed_forwards_and_restamps() {
        let input = "{\"type\": \"pointer\", \"x\": 1, \"width\": 2}\n\
                     {\"type\": \"pointer\", \"x\": 2, \"width\": 2}\n";
        let feed = SensorFeed::spawn(Cursor::new(input.to_string()), Instant::now());

        let mut received = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(2);
        while received.len() < 2 && Instant::now() < deadline {
            received.extend(feed.drain());
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(received.len(), 2);
        assert!(received[0].timestamp_ms <= received[1].timestamp_ms);
    }

    #[test]
    fn test_feed_paces_from_first_record() {
        let input = "{\"t\": 0, \"type\": \"pointer\", \"x\": 1, \"width\": 2}\n\
                     {\"t\": 150, \"type\": \"pointer\", \"x\": 2, \"width\": 2}\n";
        let feed = SensorFeed::spawn(Cursor::new(input.to_string()), Instant::now());

        let mut received = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(2);
        while received.len() < 2 && Instant::now() < deadline {
            received.extend(feed.drain());
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(received.len(), 2);
        assert!(received[1].timestamp_ms - received[0].timestamp_ms >= 140);
    }

    #[test]
    fn test_silent_feed() {
        let feed = SensorFeed::silent();
        assert!(feed.drain().is_empty());
        assert!(feed.is_exhausted());
    }
}
