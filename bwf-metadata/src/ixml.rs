// Symphonia
// Copyright (c) 2019-2024 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The free-form `<BWFXML>` iXML document: a tolerant reader/writer for a bounded set of known
//! elements.
//!
//! No XML crate appears anywhere in the corpus this engine is grounded on, and a strict parser
//! would reject exactly the malformed documents (missing closing tags, no XML declaration) this
//! codec is required to tolerate. So this is a small hand-rolled scanner: it looks for `<TAG>`
//! and, if `</TAG>` is missing, tolerantly takes everything up to the next `<` as the element's
//! content instead of failing outright.

use bwf_timecode::FpsExact;

use bwf_core::error::{Error, Result};

/// One `TRACK_LIST/TRACK` entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrackInfo {
    pub name: Option<String>,
    pub channel_index: Option<u32>,
    pub interleave_index: Option<u32>,
}

/// One `SYNC_POINT_LIST/SYNC_POINT` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPoint {
    pub sample_offset: u64,
    pub comment: String,
}

/// An opaque, versioned mixer-state sub-document embedded under `<BWFXML>`. The engine never
/// interprets its contents; it only preserves them across a save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixerState {
    pub version: u32,
    pub raw_inner: String,
}

/// The known fields this codec reads and writes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IXMLFields {
    pub project: Option<String>,
    pub scene: Option<String>,
    pub take: Option<String>,
    pub tape: Option<String>,
    pub note: Option<String>,
    pub timecode_rate: Option<(u32, u32)>,
    pub timecode_flag: Option<String>,
    pub file_sample_rate: Option<u32>,
    pub audio_bit_depth: Option<u32>,
    pub timestamp_samples_since_midnight: Option<u64>,
    pub track_count: Option<u32>,
    pub tracks: Vec<TrackInfo>,
    pub sync_points: Vec<SyncPoint>,
}

/// The result of [`parse`]'s tolerance check.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Validation {
    /// The document has no `<BWFXML` root at all; nothing could be salvaged.
    pub malformed: bool,
    /// The document parsed but is missing elements a complete record needs.
    pub needs_repair: bool,
    pub missing: Vec<&'static str>,
}

/// Authoritative facts used to fill in a document during [`repair`] or to build one from scratch
/// via [`synthesize`].
#[derive(Debug, Clone, Copy)]
pub struct RepairFacts {
    pub sample_rate: u32,
    pub bit_depth: u32,
    pub channels: u32,
    pub time_reference: u64,
    pub fps: FpsExact,
}

mod scan {
    use std::ops::Range;

    /// Finds `<tag>...</tag>`, tolerating a missing closing tag by taking content up to the next
    /// `<`. Returns the inner content and the span of the whole element (including the closing
    /// tag if one was found) so a caller can excise it.
    pub fn block(text: &str, tag: &str) -> Option<(String, Range<usize>)> {
        let open = format!("<{tag}>");
        let close = format!("</{tag}>");

        let open_pos = text.find(&open)?;
        let content_start = open_pos + open.len();

        let (content_end, full_end) = match text[content_start..].find(&close) {
            Some(rel) => (content_start + rel, content_start + rel + close.len()),
            None => {
                let fallback =
                    text[content_start..].find('<').map(|rel| content_start + rel).unwrap_or(text.len());
                (fallback, fallback)
            }
        };

        Some((text[content_start..content_end].to_string(), open_pos..full_end))
    }

    pub fn one(text: &str, tag: &str) -> Option<String> {
        block(text, tag).map(|(content, _)| content)
    }

    /// Finds every `<tag>...</tag>` occurrence, each tolerated independently.
    pub fn all(text: &str, tag: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut cursor = 0usize;

        while let Some((content, range)) = block(&text[cursor..], tag) {
            out.push(content);
            let absolute_end = cursor + range.end;
            cursor = if absolute_end > cursor { absolute_end } else { cursor + 1 };
            if cursor >= text.len() {
                break;
            }
        }

        out
    }

    /// Removes the (first) `<tag>...</tag>` element, returning the text with it excised.
    pub fn remove(text: &str, tag: &str) -> String {
        match block(text, tag) {
            Some((_, range)) => format!("{}{}", &text[..range.start], &text[range.end..]),
            None => text.to_string(),
        }
    }

    /// Inserts `fragment` immediately before `</tag>`, or appends it at the end if that closing
    /// tag is absent (the document is already malformed; there's no better anchor).
    pub fn insert_before_close(text: &str, tag: &str, fragment: &str) -> String {
        let close = format!("</{tag}>");
        match text.find(&close) {
            Some(pos) => format!("{}{}{}", &text[..pos], fragment, &text[pos..]),
            None => format!("{text}{fragment}"),
        }
    }

    pub fn attr(open_tag_text: &str, name: &str) -> Option<String> {
        let needle = format!("{name}=\"");
        let start = open_tag_text.find(&needle)? + needle.len();
        let end = open_tag_text[start..].find('"').map(|rel| start + rel)?;
        Some(open_tag_text[start..end].to_string())
    }
}

fn parse_rate_fraction(raw: &str) -> Option<(u32, u32)> {
    let raw = raw.trim();
    if let Some((num, den)) = raw.split_once('/') {
        Some((num.trim().parse().ok()?, den.trim().parse().ok()?))
    } else {
        Some((raw.parse().ok()?, 1))
    }
}

fn parse_speed_note(text: &str) -> (Option<String>, Option<(u32, u32)>, Option<u32>, Option<u32>, Option<u64>) {
    let Some((speed_content, _)) = scan::block(text, "SPEED") else {
        return (None, None, None, None, None);
    };
    let Some(note) = scan::one(&speed_content, "NOTE") else {
        return (None, None, None, None, None);
    };

    let flag = scan::one(&note, "TIMECODE_FLAG");
    let rate = scan::one(&note, "TIMECODE_RATE").and_then(|s| parse_rate_fraction(&s));
    let sample_rate = scan::one(&note, "FILE_SAMPLE_RATE").and_then(|s| s.trim().parse().ok());
    let bit_depth = scan::one(&note, "AUDIO_BIT_DEPTH").and_then(|s| s.trim().parse().ok());

    let hi = scan::one(&note, "TIMESTAMP_SAMPLES_SINCE_MIDNIGHT_HI").and_then(|s| s.trim().parse::<u64>().ok());
    let lo = scan::one(&note, "TIMESTAMP_SAMPLES_SINCE_MIDNIGHT_LO").and_then(|s| s.trim().parse::<u64>().ok());
    let timestamp = match (hi, lo) {
        (Some(hi), Some(lo)) => Some((hi << 32) | lo),
        _ => None,
    };

    (flag, rate, sample_rate, bit_depth, timestamp)
}

fn parse_tracks(text: &str) -> (Option<u32>, Vec<TrackInfo>) {
    let Some((list_content, _)) = scan::block(text, "TRACK_LIST") else {
        return (None, Vec::new());
    };

    let track_count = scan::one(&list_content, "TRACK_COUNT").and_then(|s| s.trim().parse().ok());
    let tracks = scan::all(&list_content, "TRACK")
        .into_iter()
        .map(|raw| TrackInfo {
            name: scan::one(&raw, "NAME"),
            channel_index: scan::one(&raw, "CHANNEL_INDEX").and_then(|s| s.trim().parse().ok()),
            interleave_index: scan::one(&raw, "INTERLEAVE_INDEX").and_then(|s| s.trim().parse().ok()),
        })
        .collect();

    (track_count, tracks)
}

fn parse_sync_points_raw(text: &str) -> Vec<SyncPoint> {
    let Some((list_content, _)) = scan::block(text, "SYNC_POINT_LIST") else {
        return Vec::new();
    };

    scan::all(&list_content, "SYNC_POINT")
        .into_iter()
        .filter_map(|raw| {
            let sample_offset =
                scan::one(&raw, "SYNC_POINT_SAMPLE_OFFSET")?.trim().parse::<u64>().ok()?;
            let comment = scan::one(&raw, "SYNC_POINT_COMMENT").unwrap_or_default();
            Some(SyncPoint { sample_offset, comment })
        })
        .collect()
}

fn validate(text: &str, fields: &IXMLFields) -> Validation {
    let malformed = !text.contains("<BWFXML");
    if malformed {
        return Validation { malformed: true, needs_repair: true, missing: vec!["BWFXML"] };
    }

    let mut missing = Vec::new();
    if !text.contains("</BWFXML>") {
        missing.push("</BWFXML>");
    }
    if fields.timecode_rate.is_none() {
        missing.push("SPEED/NOTE/TIMECODE_RATE");
    }
    if fields.file_sample_rate.is_none() {
        missing.push("SPEED/NOTE/FILE_SAMPLE_RATE");
    }

    Validation { malformed: false, needs_repair: !missing.is_empty(), missing }
}

/// Parses an iXML document, tolerating the malformations described in the module docs.
///
/// Fails with [`Error::IxmlMalformed`] only when there is no `<BWFXML` root at all; anything less
/// severe is reported through the returned [`Validation`] instead, matching the repair-state
/// design (`needsIXMLRepair` on the record, not a hard parse failure).
pub fn parse(text: &str) -> Result<(IXMLFields, Validation)> {
    if !text.contains("<BWFXML") {
        return Err(Error::IxmlMalformed("no <BWFXML> root element found"));
    }

    // The top-level <NOTE> is free text and must not be confused with the <SPEED><NOTE> wrapper,
    // so scan for it only after excising the SPEED block.
    let without_speed = scan::remove(text, "SPEED");

    let (timecode_flag, timecode_rate, file_sample_rate, audio_bit_depth, timestamp) =
        parse_speed_note(text);
    let (track_count, tracks) = parse_tracks(text);
    let sync_points = parse_sync_points_raw(text);

    let fields = IXMLFields {
        project: scan::one(text, "PROJECT"),
        scene: scan::one(text, "SCENE"),
        take: scan::one(text, "TAKE"),
        tape: scan::one(text, "TAPE"),
        note: scan::one(&without_speed, "NOTE"),
        timecode_rate,
        timecode_flag,
        file_sample_rate,
        audio_bit_depth,
        timestamp_samples_since_midnight: timestamp,
        track_count,
        tracks,
        sync_points,
    };

    let validation = validate(text, &fields);
    Ok((fields, validation))
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Builds a complete, well-formed iXML document from scratch.
pub fn synthesize(fields: &IXMLFields) -> String {
    let mut out = String::from("<BWFXML>\n");

    if let Some(v) = &fields.project {
        out.push_str(&format!("<PROJECT>{}</PROJECT>\n", escape(v)));
    }
    if let Some(v) = &fields.scene {
        out.push_str(&format!("<SCENE>{}</SCENE>\n", escape(v)));
    }
    if let Some(v) = &fields.take {
        out.push_str(&format!("<TAKE>{}</TAKE>\n", escape(v)));
    }
    if let Some(v) = &fields.tape {
        out.push_str(&format!("<TAPE>{}</TAPE>\n", escape(v)));
    }
    if let Some(v) = &fields.note {
        out.push_str(&format!("<NOTE>{}</NOTE>\n", escape(v)));
    }

    out.push_str("<SPEED>\n<NOTE>\n");
    if let Some((num, den)) = fields.timecode_rate {
        out.push_str(&format!("<TIMECODE_RATE>{num}/{den}</TIMECODE_RATE>\n"));
    }
    if let Some(flag) = &fields.timecode_flag {
        out.push_str(&format!("<TIMECODE_FLAG>{flag}</TIMECODE_FLAG>\n"));
    }
    if let Some(sr) = fields.file_sample_rate {
        out.push_str(&format!("<FILE_SAMPLE_RATE>{sr}</FILE_SAMPLE_RATE>\n"));
    }
    if let Some(bd) = fields.audio_bit_depth {
        out.push_str(&format!("<AUDIO_BIT_DEPTH>{bd}</AUDIO_BIT_DEPTH>\n"));
    }
    if let Some(ts) = fields.timestamp_samples_since_midnight {
        let hi = ts >> 32;
        let lo = ts & 0xFFFF_FFFF;
        out.push_str(&format!("<TIMESTAMP_SAMPLES_SINCE_MIDNIGHT_HI>{hi}</TIMESTAMP_SAMPLES_SINCE_MIDNIGHT_HI>\n"));
        out.push_str(&format!("<TIMESTAMP_SAMPLES_SINCE_MIDNIGHT_LO>{lo}</TIMESTAMP_SAMPLES_SINCE_MIDNIGHT_LO>\n"));
    }
    out.push_str("</NOTE>\n</SPEED>\n");

    if fields.track_count.is_some() || !fields.tracks.is_empty() {
        out.push_str("<TRACK_LIST>\n");
        if let Some(count) = fields.track_count {
            out.push_str(&format!("<TRACK_COUNT>{count}</TRACK_COUNT>\n"));
        }
        for track in &fields.tracks {
            out.push_str("<TRACK>\n");
            if let Some(idx) = track.channel_index {
                out.push_str(&format!("<CHANNEL_INDEX>{idx}</CHANNEL_INDEX>\n"));
            }
            if let Some(idx) = track.interleave_index {
                out.push_str(&format!("<INTERLEAVE_INDEX>{idx}</INTERLEAVE_INDEX>\n"));
            }
            if let Some(name) = &track.name {
                out.push_str(&format!("<NAME>{}</NAME>\n", escape(name)));
            }
            out.push_str("</TRACK>\n");
        }
        out.push_str("</TRACK_LIST>\n");
    }

    if !fields.sync_points.is_empty() {
        out.push_str(&sync_point_list_block(&fields.sync_points));
    }

    out.push_str("</BWFXML>");
    out
}

/// Fills a broken or incomplete document with authoritative facts, producing a well-formed
/// document. Applied only on explicit user command (the iXML Codec never calls this on its own).
pub fn repair(text: &str, facts: &RepairFacts) -> String {
    let mut fields = parse(text).map(|(fields, _)| fields).unwrap_or_default();

    fields.file_sample_rate = Some(facts.sample_rate);
    fields.audio_bit_depth = Some(facts.bit_depth);
    fields.timecode_rate = Some((facts.fps.numerator, facts.fps.denominator));
    fields.timestamp_samples_since_midnight = Some(facts.time_reference);
    if fields.track_count.is_none() {
        fields.track_count = Some(facts.channels);
    }

    synthesize(&fields)
}

fn sync_point_list_block(points: &[SyncPoint]) -> String {
    let mut out = String::from("<SYNC_POINT_LIST>\n");
    for point in points {
        out.push_str("<SYNC_POINT>\n");
        out.push_str("<SYNC_POINT_TYPE>USER_INSERTED</SYNC_POINT_TYPE>\n");
        out.push_str("<SYNC_POINT_FUNCTION>MARKER</SYNC_POINT_FUNCTION>\n");
        out.push_str(&format!("<SYNC_POINT_COMMENT>{}</SYNC_POINT_COMMENT>\n", escape(&point.comment)));
        out.push_str(&format!(
            "<SYNC_POINT_SAMPLE_OFFSET>{}</SYNC_POINT_SAMPLE_OFFSET>\n",
            point.sample_offset
        ));
        out.push_str("</SYNC_POINT>\n");
    }
    out.push_str("</SYNC_POINT_LIST>\n");
    out
}

/// Replaces the document's sync-point list (one `<SYNC_POINT>` per marker) with `markers`.
pub fn inject_sync_points(text: &str, markers: &[SyncPoint]) -> String {
    let cleaned = scan::remove(text, "SYNC_POINT_LIST");
    if markers.is_empty() {
        return cleaned;
    }
    scan::insert_before_close(&cleaned, "BWFXML", &sync_point_list_block(markers))
}

/// Reads the document's sync points, independent of the rest of [`parse`].
pub fn parse_sync_points(text: &str) -> Vec<SyncPoint> {
    parse_sync_points_raw(text)
}

/// Replaces the document's `<MIXER_STATE>` sub-element with `state`, preserving it as opaque,
/// versioned pass-through payload.
pub fn inject_mixer_state(text: &str, state: &MixerState) -> String {
    let cleaned = scan::remove(text, "MIXER_STATE");
    let block = format!("<MIXER_STATE version=\"{}\">{}</MIXER_STATE>\n", state.version, state.raw_inner);
    scan::insert_before_close(&cleaned, "BWFXML", &block)
}

/// Reads back a previously injected `<MIXER_STATE>`, if present.
pub fn extract_mixer_state(text: &str) -> Option<MixerState> {
    let open_pos = text.find("<MIXER_STATE")?;
    let tag_close = text[open_pos..].find('>').map(|rel| open_pos + rel)?;
    let open_tag_text = &text[open_pos..=tag_close];
    let version = scan::attr(open_tag_text, "version").and_then(|v| v.parse().ok()).unwrap_or(1);

    let content_start = tag_close + 1;
    let close = "</MIXER_STATE>";
    let content_end =
        text[content_start..].find(close).map(|rel| content_start + rel).unwrap_or(text.len());

    Some(MixerState { version, raw_inner: text[content_start..content_end].to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_facts() -> RepairFacts {
        RepairFacts {
            sample_rate: 48000,
            bit_depth: 24,
            channels: 2,
            time_reference: 1_728_000,
            fps: FpsExact::new(25, 1).unwrap(),
        }
    }

    fn well_formed_doc() -> String {
        synthesize(&IXMLFields {
            project: Some("Nightfall".to_string()),
            scene: Some("7A".to_string()),
            take: Some("3".to_string()),
            tape: None,
            note: Some("wind noise on boom".to_string()),
            timecode_rate: Some((25, 1)),
            timecode_flag: Some("NDF".to_string()),
            file_sample_rate: Some(48000),
            audio_bit_depth: Some(24),
            timestamp_samples_since_midnight: Some(1_728_000),
            track_count: Some(2),
            tracks: vec![
                TrackInfo { name: Some("Boom".to_string()), channel_index: Some(1), interleave_index: Some(1) },
                TrackInfo { name: Some("Lav A".to_string()), channel_index: Some(2), interleave_index: Some(2) },
            ],
            sync_points: Vec::new(),
        })
    }

    #[test]
    fn parses_well_formed_document() {
        let text = well_formed_doc();
        let (fields, validation) = parse(&text).unwrap();
        assert!(!validation.malformed);
        assert!(!validation.needs_repair);
        assert_eq!(fields.scene.as_deref(), Some("7A"));
        assert_eq!(fields.timecode_rate, Some((25, 1)));
        assert_eq!(fields.tracks.len(), 2);
        assert_eq!(fields.tracks[0].name.as_deref(), Some("Boom"));
    }

    #[test]
    fn garbage_text_is_malformed() {
        assert!(parse("not xml at all").is_err());
    }

    // S6 — iXML repair.
    #[test]
    fn missing_closing_tag_flags_repair_and_repair_fixes_it() {
        let mut text = well_formed_doc();
        text = text.trim_end_matches("</BWFXML>").to_string();

        let (_, validation) = parse(&text).unwrap();
        assert!(validation.needs_repair);

        let repaired = repair(&text, &sample_facts());
        let (_, validation) = parse(&repaired).unwrap();
        assert!(!validation.needs_repair);
    }

    #[test]
    fn repair_preserves_salvageable_fields_and_fills_facts() {
        let mut text = well_formed_doc();
        text = text.trim_end_matches("</BWFXML>").to_string();

        let repaired = repair(&text, &sample_facts());
        let (fields, _) = parse(&repaired).unwrap();

        assert_eq!(fields.scene.as_deref(), Some("7A"));
        assert_eq!(fields.file_sample_rate, Some(48000));
        assert_eq!(fields.timecode_rate, Some((25, 1)));
    }

    #[test]
    fn sync_points_round_trip() {
        let text = well_formed_doc();
        let markers = vec![
            SyncPoint { sample_offset: 48000, comment: "slate".to_string() },
            SyncPoint { sample_offset: 96000, comment: "cut".to_string() },
        ];

        let injected = inject_sync_points(&text, &markers);
        let parsed = parse_sync_points(&injected);
        assert_eq!(parsed, markers);
    }

    #[test]
    fn mixer_state_round_trips_as_opaque_payload() {
        let text = well_formed_doc();
        let state = MixerState { version: 2, raw_inner: "<CH0 VOL=\"0.8\" PAN=\"0\"/>".to_string() };

        let injected = inject_mixer_state(&text, &state);
        let extracted = extract_mixer_state(&injected).unwrap();
        assert_eq!(extracted, state);
    }

    #[test]
    fn injecting_mixer_state_twice_replaces_the_old_one() {
        let text = well_formed_doc();
        let first = MixerState { version: 1, raw_inner: "first".to_string() };
        let second = MixerState { version: 2, raw_inner: "second".to_string() };

        let once = inject_mixer_state(&text, &first);
        let twice = inject_mixer_state(&once, &second);

        assert_eq!(extract_mixer_state(&twice).unwrap(), second);
        assert_eq!(twice.matches("<MIXER_STATE").count(), 1);
    }

    #[test]
    fn top_level_note_is_not_confused_with_speed_note() {
        let text = well_formed_doc();
        let (fields, _) = parse(&text).unwrap();
        assert_eq!(fields.note.as_deref(), Some("wind noise on boom"));
        assert_eq!(fields.timecode_rate, Some((25, 1)));
    }
}
