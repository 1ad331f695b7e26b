//! Recorded frame log playback
//!
//! Log format, one frame per line (hex, `#` starts a comment):
//!
//! ```text
//! 7E8 04 41 0C 1A F8
//! 0x7E8 [4] 03 41 0D 40     # bracketed length is optional and ignored
//! ```
//!
//! The whole log is parsed before the bus starts, so a bad file stops the
//! program before the terminal is taken over. Frames are then replayed in a
//! loop; requests sent to a replay bus are dropped, and any the bus could
//! not have carried are reported as faults.

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use crossbeam_channel::RecvTimeoutError;
use diagscope_common::{Frame, MAX_ARBITRATION_ID, MAX_FRAME_DATA};
use log::{debug, info};

use super::BusHandle;
use crate::domain::TransportError;

/// Delay between replayed frames
pub const REPLAY_INTERVAL: Duration = Duration::from_millis(100);


fn parse_hex_u8(token: &str) -> Result<u8, String> {
    u8::from_str_radix(token, 16).map_err(|_| format!("invalid data byte '{token}'"))
}

/// Parse one log line; `Ok(None)` for blank and comment lines
///
/// # Errors
/// Returns a description of what is wrong with the line
pub fn parse_line(line: &str) -> Result<Option<Frame>, String> {
    let content = line.split('#').next().unwrap_or_default().trim();
    if content.is_empty() {
        return Ok(None);
    }

    let mut tokens = content.split_whitespace();
    let id_token = tokens.next().unwrap_or_default();
    let id_digits = id_token.trim_start_matches("0x").trim_start_matches("0X");
    let arbitration_id = u16::from_str_radix(id_digits, 16)
        .ok()
        .filter(|id| *id <= MAX_ARBITRATION_ID)
        .ok_or_else(|| format!("invalid arbitration id '{id_token}'"))?;

    let data = tokens
        .filter(|t| !(t.starts_with('[') && t.ends_with(']')))
        .map(parse_hex_u8)
        .collect::<Result<Vec<_>, _>>()?;

    if data.is_empty() {
        return Err("frame has no data bytes".to_string());
    }
    if data.len() > MAX_FRAME_DATA {
        return Err(format!("{} data bytes, at most {MAX_FRAME_DATA} allowed", data.len()));
    }

    Ok(Some(Frame::new(arbitration_id, data)))
}

/// Read and parse a whole frame log
///
/// # Errors
/// - [`TransportError::Io`] if the file cannot be read
/// - [`TransportError::ReplayParse`] for the first bad line, or an empty log
pub fn load_log(path: &Path) -> Result<Vec<Frame>, TransportError> {
    let content = fs::read_to_string(path)?;
    let parse_error = |line, reason| TransportError::ReplayParse {
        path: path.display().to_string(),
        line,
        reason,
    };

    let mut frames = Vec::new();
    for (index, line) in content.lines().enumerate() {
        if let Some(frame) = parse_line(line).map_err(|reason| parse_error(index + 1, reason))? {
            frames.push(frame);
        }
    }

    if frames.is_empty() {
        return Err(parse_error(0, "log contains no frames".to_string()));
    }
    Ok(frames)
}

/// Load `path` and start replaying it on its own thread
///
/// # Errors
/// Fails if the log cannot be loaded or the thread cannot start
pub fn spawn(path: &Path) -> Result<BusHandle, TransportError> {
    let frames = load_log(path)?;
    info!("Replaying {} frame(s) from {}", frames.len(), path.display());
    spawn_frames(frames, REPLAY_INTERVAL)
}

/// Replay `frames` cyclically, one every `interval`
///
/// # Errors
/// Returns [`TransportError::ConnectFailed`] if the thread cannot start
pub fn spawn_frames(frames: Vec<Frame>, interval: Duration) -> Result<BusHandle, TransportError> {
    if frames.is_empty() {
        return Err(TransportError::ConnectFailed("replay log is empty".to_string()));
    }

    BusHandle::spawn("replay", move |link| {
        let mut next_at = Instant::now();
        let mut dropped = 0usize;

        for frame in frames.iter().cycle() {
            loop {
                if link.should_stop() {
                    debug!("Replay stopped, {dropped} request(s) dropped");
                    return;
                }
                match link.requests.recv_deadline(next_at) {
                    Ok(request) => {
                        dropped += 1;
                        if let Some(reason) = request.bus_violation() {
                            link.fault(reason);
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => break,
                    Err(RecvTimeoutError::Disconnected) => return,
                }
            }

            if !link.deliver(frame.clone()) {
                return;
            }
            next_at += interval;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Transport;
    use std::io::Write;

    #[test]
    fn test_parse_line_formats() {
        let expected = Frame::new(0x7E8, vec![0x04, 0x41, 0x0C, 0x1A, 0xF8]);
        assert_eq!(parse_line("7E8 04 41 0C 1A F8").unwrap(), Some(expected.clone()));
        assert_eq!(parse_line("0x7e8 [5] 04 41 0c 1a f8  # idle").unwrap(), Some(expected));
        assert_eq!(parse_line("   ").unwrap(), None);
        assert_eq!(parse_line("# header").unwrap(), None);
    }

    #[test]
    fn test_parse_line_errors() {
        assert!(parse_line("ZZZ 01").unwrap_err().contains("arbitration id"));
        assert!(parse_line("FFFF 01").is_err());
        assert!(parse_line("7E8").unwrap_err().contains("no data"));
        assert!(parse_line("7E8 04 4G").unwrap_err().contains("4G"));
        assert!(parse_line("7E8 00 01 02 03 04 05 06 07 08").is_err());
    }

    #[test]
    fn test_load_log_reports_line_number() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "7E8 03 41 0D 40").unwrap();
        writeln!(file, "7E8 03 41 XX 40").unwrap();

        let err = load_log(file.path()).unwrap_err();
        assert!(matches!(err, TransportError::ReplayParse { line: 2, .. }));
    }

    #[test]
    fn test_missing_and_empty_logs_fail() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(load_log(&dir.path().join("absent.log")), Err(TransportError::Io(_))));

        let empty = dir.path().join("empty.log");
        fs::write(&empty, "# nothing\n\n").unwrap();
        assert!(matches!(load_log(&empty), Err(TransportError::ReplayParse { .. })));
    }

    #[test]
    fn test_replay_cycles_frames() {
        let frames = vec![
            Frame::new(0x7E8, vec![0x03, 0x41, 0x0D, 0x40]),
            Frame::new(0x7E8, vec![0x03, 0x41, 0x05, 0x5A]),
        ];
        let mut bus = spawn_frames(frames.clone(), Duration::from_millis(1)).unwrap();
        bus.send_frame(0x7E0, &[0x02, 0x01, 0x0C]).unwrap();

        let mut received = Vec::new();
        for _ in 0..500 {
            if let Some(frame) = bus.poll_frame().unwrap() {
                received.push(frame);
                if received.len() == 3 {
                    break;
                }
            } else {
                std::thread::sleep(Duration::from_millis(2));
            }
        }
        bus.shutdown();

        assert_eq!(received, vec![frames[0].clone(), frames[1].clone(), frames[0].clone()]);
    }
}
