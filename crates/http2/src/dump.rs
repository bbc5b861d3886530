//! Human-readable frame dumps for the debug log.
//!
//! Dumping never fails: payload fields that cannot be read are skipped.

use std::fmt::Write as _;

use common::{BufferView, hex_dump};

use crate::frame::{ErrorCode, Frame, FrameType, MAX_STREAM_ID, flags, settings_name};

/// Payload bytes shown before the dump is snipped.
const PAYLOAD_DUMP_MAX: usize = 200;

/// Names of the flags set on `frame` that are defined for its type.
pub fn flag_names(frame: &Frame) -> Vec<&'static str> {
    let defined: &[(u8, &'static str)] = match frame.frame_type {
        FrameType::Data => &[(flags::END_STREAM, "END_STREAM"), (flags::PADDED, "PADDED")],
        FrameType::Headers => &[
            (flags::END_STREAM, "END_STREAM"),
            (flags::END_HEADERS, "END_HEADERS"),
            (flags::PADDED, "PADDED"),
            (flags::PRIORITY, "PRIORITY"),
        ],
        FrameType::Settings | FrameType::Ping => &[(flags::ACK, "ACK")],
        FrameType::PushPromise => &[(flags::END_HEADERS, "END_HEADERS"), (flags::PADDED, "PADDED")],
        FrameType::Continuation => &[(flags::END_HEADERS, "END_HEADERS")],
        _ => &[],
    };
    defined
        .iter()
        .filter(|&&(bit, _)| frame.has_flag(bit))
        .map(|&(_, name)| name)
        .collect()
}

/// Render a frame: type, header fields, raw header and payload octets, and
/// decoded payload fields for the types that carry them.
pub fn frame(frame: &Frame) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Frame: {}", frame.frame_type);
    let _ = writeln!(
        out,
        "Header: Length={} StreamId={} Flags={}",
        frame.length(),
        frame.stream_id,
        flag_names(frame).join(",")
    );
    out.push_str(&hex_dump(&frame.header_bytes(), 0));

    if !frame.payload.is_empty() {
        out.push_str("Payload:\n");
        out.push_str(&hex_dump(&frame.payload, PAYLOAD_DUMP_MAX));
        let view = BufferView::new(&frame.payload);
        match frame.frame_type {
            FrameType::Headers => headers_payload(&mut out, view, frame.flags),
            FrameType::Settings => settings_payload(&mut out, view),
            FrameType::RstStream => {
                if let Ok(code) = view.u32_at(0) {
                    let _ = writeln!(out, "Error Code: {}", ErrorCode(code));
                }
            }
            FrameType::GoAway => {
                if let (Ok(last), Ok(code)) = (view.u32_at(0), view.u32_at(4)) {
                    let _ = writeln!(out, "Last Stream Id: {}", last & MAX_STREAM_ID);
                    let _ = writeln!(out, "Error Code: {}", ErrorCode(code));
                }
            }
            FrameType::WindowUpdate => {
                if let Ok(increment) = view.u32_at(0) {
                    let _ = writeln!(out, "Window Size Increment: {}", increment & 0x7FFF_FFFF);
                }
            }
            _ => {}
        }
    }
    out
}

fn headers_payload(out: &mut String, view: BufferView<'_>, frame_flags: u8) {
    let mut offset = 0;
    if frame_flags & flags::PADDED != 0 {
        if let Ok(pad) = view.byte_at(offset) {
            let _ = writeln!(out, "Pad Length: {pad}");
        }
        offset += 1;
    }
    if frame_flags & flags::PRIORITY != 0 {
        if let (Ok(dependency), Ok(weight)) = (view.u32_at(offset), view.byte_at(offset + 4)) {
            let _ = writeln!(out, "E: {}", dependency >> 31);
            let _ = writeln!(out, "Stream Dependency: {}", dependency & MAX_STREAM_ID);
            let _ = writeln!(out, "Weight: {weight}");
        }
    }
}

fn settings_payload(out: &mut String, view: BufferView<'_>) {
    let mut offset = 0;
    while let (Ok(id), Ok(value)) = (view.u16_at(offset), view.u32_at(offset + 2)) {
        let _ = writeln!(out, "{}: {value}", settings_name(id).unwrap_or("Unknown"));
        offset += 6;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{
        SETTINGS_MAX_CONCURRENT_STREAMS, build_goaway, build_settings, build_settings_ack,
        build_window_update,
    };

    #[test]
    fn test_dump_settings() {
        let f = build_settings(&[(SETTINGS_MAX_CONCURRENT_STREAMS, 100), (0x99, 7)]);
        let text = frame(&f);
        assert!(text.starts_with("Frame: SETTINGS\nHeader: Length=12 StreamId=0 Flags=\n"));
        assert!(text.contains("Payload:\n"));
        assert!(text.contains("SETTINGS_MAX_CONCURRENT_STREAMS: 100\n"));
        assert!(text.contains("Unknown: 7\n"));
    }

    #[test]
    fn test_dump_settings_ack_has_no_payload() {
        let text = frame(&build_settings_ack());
        assert!(text.contains("Flags=ACK\n"));
        assert!(!text.contains("Payload:"));
    }

    #[test]
    fn test_dump_headers_priority() {
        let payload = vec![3, 0x80, 0, 0, 5, 15, 0x82, 0, 0, 0];
        let f = Frame::new(
            FrameType::Headers,
            flags::END_HEADERS | flags::PADDED | flags::PRIORITY,
            1,
            payload,
        )
        .unwrap();
        let text = frame(&f);
        assert!(text.contains("Flags=END_HEADERS,PADDED,PRIORITY\n"));
        assert!(text.contains("Pad Length: 3\n"));
        assert!(text.contains("E: 1\n"));
        assert!(text.contains("Stream Dependency: 5\n"));
        assert!(text.contains("Weight: 15\n"));
    }

    #[test]
    fn test_dump_goaway_and_window_update() {
        let text = frame(&build_goaway(1, ErrorCode::NO_ERROR).unwrap());
        assert!(text.contains("Last Stream Id: 1\n"));
        assert!(text.contains("Error Code: NO_ERROR(0)\n"));

        let text = frame(&build_window_update(0, 1024).unwrap());
        assert!(text.contains("Window Size Increment: 1024\n"));
    }

    #[test]
    fn test_dump_truncated_payload_skips_details() {
        let f = Frame::new(FrameType::RstStream, 0, 1, vec![0, 0]).unwrap();
        let text = frame(&f);
        assert!(!text.contains("Error Code"));
    }

    #[test]
    fn test_flag_names_ignore_undefined_bits() {
        let f = Frame::new(FrameType::Priority, 0xFF, 1, vec![]).unwrap();
        assert!(flag_names(&f).is_empty());
    }
}
