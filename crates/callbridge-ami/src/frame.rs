// SPDX-FileCopyrightText: 2026 Callbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AMI wire framing.
//!
//! A frame is a block of `Key: Value` lines terminated by `\r\n`, with an
//! empty line closing the block. Keys are matched case-insensitively.

use callbridge_core::SwitchEvent;
use chrono::{DateTime, Utc};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// One parsed AMI message (response or event).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AmiFrame {
    fields: Vec<(String, String)>,
}

impl AmiFrame {
    /// Parses one `Key: Value` line into the frame. Lines without a colon are ignored.
    pub fn push_line(&mut self, line: &str) {
        let line = line.trim_end_matches(['\r', '\n']);
        if let Some((key, value)) = line.split_once(':') {
            self.fields
                .push((key.trim().to_string(), value.trim().to_string()));
        }
    }

    /// First value for `key`, compared case-insensitively.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The `Event` header, if this is an event frame.
    pub fn event(&self) -> Option<&str> {
        self.get("Event")
    }

    /// Maps a tracked event to a [`SwitchEvent`] stamped with `at`.
    ///
    /// Returns `None` for events the engine does not consume and for frames
    /// missing a `Uniqueid`.
    pub fn to_switch_event(&self, at: DateTime<Utc>) -> Option<SwitchEvent> {
        let unique_id = self.get("Uniqueid").filter(|v| !v.is_empty())?.to_string();
        let field = |key: &str| self.get(key).unwrap_or_default().to_string();
        let optional = |key: &str| self.get(key).filter(|v| !v.is_empty()).map(str::to_string);

        match self.event()? {
            e if e.eq_ignore_ascii_case("Newchannel") => Some(SwitchEvent::NewChannel {
                unique_id,
                channel: field("Channel"),
                caller_id: field("CallerIDNum"),
                exten: field("Exten"),
                context: field("Context"),
                at,
            }),
            e if e.eq_ignore_ascii_case("BridgeEnter") => {
                Some(SwitchEvent::BridgeEnter { unique_id, at })
            }
            e if e.eq_ignore_ascii_case("Hangup") => Some(SwitchEvent::Hangup {
                unique_id,
                cause: optional("Cause"),
                cause_text: optional("Cause-txt"),
                at,
            }),
            _ => None,
        }
    }
}

/// Encodes an action as an AMI frame.
pub fn encode_action(fields: &[(&str, &str)]) -> String {
    let mut out = String::new();
    for (key, value) in fields {
        out.push_str(key);
        out.push_str(": ");
        out.push_str(value);
        out.push_str("\r\n");
    }
    out.push_str("\r\n");
    out
}

/// Reads frames off a buffered AMI stream.
///
/// Cancel safe: a partially received line or frame is kept for the next call
/// to [`next_frame`](Self::next_frame), so reads can sit under a timeout.
#[derive(Debug)]
pub struct FrameReader<R> {
    reader: R,
    raw: Vec<u8>,
    frame: AmiFrame,
}

impl<R> FrameReader<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            raw: Vec::new(),
            frame: AmiFrame::default(),
        }
    }

    /// Reads the next frame. `Ok(None)` means the stream ended.
    ///
    /// Leading blank lines are skipped; a stream ending mid-frame yields the
    /// partial frame. Bytes that are not UTF-8 (caller names in a legacy
    /// codepage) are replaced rather than failing the read.
    pub async fn next_frame(&mut self) -> std::io::Result<Option<AmiFrame>> {
        loop {
            if self.reader.read_until(b'\n', &mut self.raw).await? == 0 {
                if !self.raw.is_empty() {
                    let line = String::from_utf8_lossy(&self.raw).into_owned();
                    self.raw.clear();
                    self.frame.push_line(&line);
                }
                let frame = std::mem::take(&mut self.frame);
                return Ok((!frame.is_empty()).then_some(frame));
            }
            if !self.raw.ends_with(b"\n") {
                // EOF inside a line; the next read reports it.
                continue;
            }

            let line = String::from_utf8_lossy(&self.raw).into_owned();
            self.raw.clear();
            if line.trim().is_empty() {
                if self.frame.is_empty() {
                    continue;
                }
                return Ok(Some(std::mem::take(&mut self.frame)));
            }
            self.frame.push_line(&line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncWriteExt, BufReader};

    fn frame(text: &str) -> AmiFrame {
        let mut f = AmiFrame::default();
        for line in text.lines() {
            f.push_line(line);
        }
        f
    }

    #[test]
    fn keys_are_case_insensitive_and_values_trimmed() {
        let f = frame("Event: Newchannel\r\nuniqueid:  1.1 \r\nCallerIDNum: 79161234567");
        assert_eq!(f.get("UniqueID"), Some("1.1"));
        assert_eq!(f.event(), Some("Newchannel"));
        assert_eq!(f.get("Missing"), None);
    }

    #[test]
    fn value_may_contain_colons() {
        let f = frame("Channel: SIP/trunk:5060-0001");
        assert_eq!(f.get("Channel"), Some("SIP/trunk:5060-0001"));
    }

    #[test]
    fn newchannel_maps_all_fields() {
        let at = Utc::now();
        let f = frame(
            "Event: Newchannel\nChannel: SIP/from-trunk-0001\nCallerIDNum: 89161234567\n\
             Exten: 100\nContext: from-trunk\nUniqueid: 1700000000.1",
        );
        assert_eq!(
            f.to_switch_event(at),
            Some(SwitchEvent::NewChannel {
                unique_id: "1700000000.1".into(),
                channel: "SIP/from-trunk-0001".into(),
                caller_id: "89161234567".into(),
                exten: "100".into(),
                context: "from-trunk".into(),
                at,
            })
        );
    }

    #[test]
    fn hangup_maps_cause_fields() {
        let at = Utc::now();
        let f = frame("Event: Hangup\nUniqueid: 1.2\nCause: 16\nCause-txt: Normal Clearing");
        assert_eq!(
            f.to_switch_event(at),
            Some(SwitchEvent::Hangup {
                unique_id: "1.2".into(),
                cause: Some("16".into()),
                cause_text: Some("Normal Clearing".into()),
                at,
            })
        );
    }

    #[test]
    fn other_events_and_responses_ignored() {
        let at = Utc::now();
        assert_eq!(frame("Event: VarSet\nUniqueid: 1.3").to_switch_event(at), None);
        assert_eq!(frame("Response: Success").to_switch_event(at), None);
        assert_eq!(frame("Event: Hangup").to_switch_event(at), None);
    }

    #[test]
    fn encode_terminates_with_blank_line() {
        let out = encode_action(&[("Action", "Login"), ("Username", "u")]);
        assert_eq!(out, "Action: Login\r\nUsername: u\r\n\r\n");
    }

    #[tokio::test]
    async fn reads_consecutive_frames() {
        let data = b"\r\nEvent: BridgeEnter\r\nUniqueid: 1.1\r\n\r\nEvent: Hangup\r\nUniqueid: 1.1\r\n\r\nEvent: Partial\r\n";
        let mut reader = FrameReader::new(BufReader::new(&data[..]));

        let first = reader.next_frame().await.unwrap().unwrap();
        assert_eq!(first.event(), Some("BridgeEnter"));
        let second = reader.next_frame().await.unwrap().unwrap();
        assert_eq!(second.event(), Some("Hangup"));
        let partial = reader.next_frame().await.unwrap().unwrap();
        assert_eq!(partial.event(), Some("Partial"));
        assert!(reader.next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cp1251_caller_name_does_not_break_the_stream() {
        let mut data = b"Event: Newchannel\r\nChannel: SIP/from-trunk-0001\r\nCallerIDNum: 79161234567\r\nCallerIDName: ".to_vec();
        data.extend_from_slice(&[0xC8, 0xE2, 0xE0, 0xED]);
        data.extend_from_slice(b"\r\nContext: from-trunk\r\nUniqueid: 1.5\r\n\r\nEvent: Hangup\r\nUniqueid: 1.5\r\nCause: 16\r\n\r\n");
        let mut reader = FrameReader::new(BufReader::new(&data[..]));
        let at = Utc::now();

        let first = reader.next_frame().await.unwrap().unwrap();
        assert!(first.get("CallerIDName").is_some());
        match first.to_switch_event(at) {
            Some(SwitchEvent::NewChannel {
                unique_id,
                caller_id,
                context,
                ..
            }) => {
                assert_eq!(unique_id, "1.5");
                assert_eq!(caller_id, "79161234567");
                assert_eq!(context, "from-trunk");
            }
            other => panic!("expected NewChannel, got {other:?}"),
        }

        let second = reader.next_frame().await.unwrap().unwrap();
        assert!(matches!(
            second.to_switch_event(at),
            Some(SwitchEvent::Hangup { .. })
        ));
    }

    #[tokio::test]
    async fn frame_interrupted_by_timeout_resumes() {
        let (client, mut server) = tokio::io::duplex(256);
        let mut reader = FrameReader::new(BufReader::new(client));

        server.write_all(b"Event: Hangup\r\nUniq").await.unwrap();
        let stalled =
            tokio::time::timeout(Duration::from_millis(50), reader.next_frame()).await;
        assert!(stalled.is_err());

        server.write_all(b"ueid: 1.9\r\n\r\n").await.unwrap();
        let frame = reader.next_frame().await.unwrap().unwrap();
        assert_eq!(frame.event(), Some("Hangup"));
        assert_eq!(frame.get("Uniqueid"), Some("1.9"));
    }
}
