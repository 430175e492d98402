// SPDX-FileCopyrightText: 2026 Callbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call direction classification from FreePBX channel and context names.

use callbridge_core::Direction;

/// Markers of calls arriving from a trunk / the PSTN.
const INBOUND_MARKERS: &[&str] = &["from-trunk", "from-pstn"];
/// Marker of calls originated by a local extension.
const OUTBOUND_MARKERS: &[&str] = &["from-internal"];
/// Marker of extension-to-extension routing.
const INTERNAL_MARKERS: &[&str] = &["ext-local"];

/// Classifies a call from its channel name and dialplan context.
///
/// Case-insensitive substring match over both strings, first match wins in
/// the order inbound, outbound, internal. The order matters: contexts such
/// as `from-internal` also route through `ext-local`.
pub fn classify_direction(channel: &str, context: &str) -> Direction {
    let channel = channel.to_ascii_lowercase();
    let context = context.to_ascii_lowercase();
    let matches = |markers: &[&str]| {
        markers
            .iter()
            .any(|m| channel.contains(m) || context.contains(m))
    };

    if matches(INBOUND_MARKERS) {
        Direction::Inbound
    } else if matches(OUTBOUND_MARKERS) {
        Direction::Outbound
    } else if matches(INTERNAL_MARKERS) {
        Direction::Internal
    } else {
        Direction::Unknown
    }
}
