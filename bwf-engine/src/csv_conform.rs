// Symphonia
// Copyright (c) 2019-2024 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The CSV Conformer: parses a Sound Report and drives the Range Extractor to produce one output
//! per row, disambiguating multi-take matches.

use bwf_core::error::{Error, Result};
use bwf_metadata::model::AudioFileRecord;
use bwf_timecode::{tc_to_frames, tc_to_samples, FpsExact};

use crate::extract::{extract_range, ExtractionRequest, OutputFormat};

/// One data row of a parsed Sound Report.
#[derive(Debug, Clone)]
pub struct SoundReportRow {
    pub file_name: String,
    pub scene: String,
    pub take: String,
    pub length_tc: String,
    pub start_tc: String,
}

const REQUIRED_COLUMNS: [&str; 5] = ["file name", "scene", "take", "length", "start tc"];

/// Parses a Sound Report CSV. The first line must contain the literal token `SOUND REPORT`; a
/// later line is located by header scan (case-insensitive substring match on each required
/// column's label) and everything after it is treated as data rows.
pub fn parse_sound_report(csv_text: &str) -> Result<Vec<SoundReportRow>> {
    let mut lines = csv_text.lines();
    let first_line = lines.next().ok_or(Error::Other("sound report is empty"))?;
    if !first_line.contains("SOUND REPORT") {
        return Err(Error::Other("sound report is missing the SOUND REPORT header line"));
    }

    let rest: String = lines.collect::<Vec<_>>().join("\n");
    let mut reader = csv::ReaderBuilder::new().has_headers(false).flexible(true).from_reader(rest.as_bytes());
    let mut columns: Option<Vec<usize>> = None;
    let mut rows = Vec::new();

    for record in reader.records() {
        let record = record.map_err(|_| Error::Other("malformed CSV row in sound report"))?;

        if columns.is_none() {
            if let Some(found) = locate_columns(&record) {
                columns = Some(found);
                continue;
            }
            // Blank lines or preamble before the header row are skipped.
            continue;
        }

        let idx = columns.as_ref().unwrap();
        let get = |i: usize| record.get(idx[i]).unwrap_or("").trim().to_string();
        let file_name = get(0);
        if file_name.is_empty() {
            continue;
        }

        rows.push(SoundReportRow {
            file_name,
            scene: get(1),
            take: get(2),
            length_tc: get(3),
            start_tc: get(4),
        });
    }

    if columns.is_none() {
        return Err(Error::Other("sound report has no recognizable column header row"));
    }

    log::info!("parsed {} sound report rows", rows.len());
    Ok(rows)
}

/// Finds, for each required column, the index of the first cell whose lowercased text contains
/// that column's label. Returns `None` unless every required column is found in this row.
fn locate_columns(record: &csv::StringRecord) -> Option<Vec<usize>> {
    let cells: Vec<String> = record.iter().map(|c| c.to_ascii_lowercase()).collect();

    let mut columns = Vec::with_capacity(REQUIRED_COLUMNS.len());
    for label in REQUIRED_COLUMNS {
        let idx = cells.iter().position(|cell| cell.contains(label))?;
        columns.push(idx);
    }
    Some(columns)
}

/// Adds a frame-domain length to a start timecode, producing the end timecode.
fn end_tc(start_tc: &str, length_tc: &str, fps: FpsExact) -> Result<String> {
    let start_frames = tc_to_frames(start_tc, fps)?;
    let length_frames = tc_to_frames(length_tc, fps)?;
    Ok(bwf_timecode::frames_to_tc(start_frames + length_frames, fps))
}

/// Inserts a disambiguation letter (`a`, `b`, ...) before the trailing digit run of a filename, or
/// appends it if there is no trailing digit run.
fn disambiguate(filename: &str, ordinal: usize) -> String {
    if ordinal == 0 {
        return filename.to_string();
    }
    let letter = (b'a' + (ordinal - 1) as u8) as char;

    let (stem, ext) = match filename.rfind('.') {
        Some(dot) => (&filename[..dot], &filename[dot..]),
        None => (filename, ""),
    };

    let split_at = stem.rfind(|c: char| !c.is_ascii_digit()).map(|i| i + 1).unwrap_or(0);
    let (head, digits) = stem.split_at(split_at);
    format!("{head}{letter}{digits}{ext}")
}

/// One row's outcome: the matching sources it was conformed against, or the reason it matched
/// none.
pub struct ConformOutcome {
    pub row_file_name: String,
    pub outputs: Vec<(AudioFileRecord, Vec<u8>)>,
    pub error: Option<Error>,
}

/// Conforms every row of a parsed Sound Report against `sources`, extracting one output per
/// matching source. Rows that match no source fail with [`Error::NoMatchingTake`] but do not stop
/// the batch; every row produces a [`ConformOutcome`].
pub fn conform(
    rows: &[SoundReportRow],
    sources: &[(AudioFileRecord, Vec<u8>)],
    assumed_fps: FpsExact,
    pre_post_roll_seconds: f64,
) -> Vec<ConformOutcome> {
    rows.iter()
        .map(|row| conform_row(row, sources, assumed_fps, pre_post_roll_seconds))
        .collect()
}

fn conform_row(
    row: &SoundReportRow,
    sources: &[(AudioFileRecord, Vec<u8>)],
    assumed_fps: FpsExact,
    pre_post_roll_seconds: f64,
) -> ConformOutcome {
    let mut matches: Vec<&(AudioFileRecord, Vec<u8>)> = Vec::new();
    let mut refined_fps = assumed_fps;

    for (i, (source, _)) in sources.iter().enumerate() {
        let (start, end) = match window_for(row, source.sample_rate, refined_fps) {
            Ok(w) => w,
            Err(e) => return ConformOutcome { row_file_name: row.file_name.clone(), outputs: Vec::new(), error: Some(e) },
        };

        let (window_start, window_end) = source.active_window();
        if start >= window_start && end <= window_end {
            if matches.is_empty() {
                refined_fps = source.fps_exact;
            }
            matches.push(&sources[i]);
        }
    }

    if matches.is_empty() {
        return ConformOutcome {
            row_file_name: row.file_name.clone(),
            outputs: Vec::new(),
            error: Some(Error::NoMatchingTake(row.file_name.clone())),
        };
    }

    let mut outputs = Vec::with_capacity(matches.len());
    for (ordinal, (source, data)) in matches.iter().enumerate() {
        let output_filename = disambiguate(&row.file_name, if matches.len() > 1 { ordinal + 1 } else { 0 });

        let end = match end_tc(&row.start_tc, &row.length_tc, source.fps_exact) {
            Ok(tc) => tc,
            Err(e) => return ConformOutcome { row_file_name: row.file_name.clone(), outputs, error: Some(e) },
        };
        let start_frames = match tc_to_frames(&row.start_tc, source.fps_exact) {
            Ok(f) => f,
            Err(e) => return ConformOutcome { row_file_name: row.file_name.clone(), outputs, error: Some(e) },
        };
        let end_frames = match tc_to_frames(&end, source.fps_exact) {
            Ok(f) => f,
            Err(e) => return ConformOutcome { row_file_name: row.file_name.clone(), outputs, error: Some(e) },
        };

        // Pre/post-roll extends the window in the timecode's own frame domain (a "1.0s" roll is
        // one nominal second of frames at the source's field rate), not a literal sample count,
        // so it lines up with how `end` itself was derived from `startTC + length`.
        let roll_frames = (pre_post_roll_seconds * source.fps_exact.field_rate() as f64).round() as u64;
        let rolled_start_frames = start_frames.saturating_sub(roll_frames);
        let rolled_end_frames = end_frames + roll_frames;

        let (window_start, window_end) = source.active_window();
        let rolled_start =
            tc_to_samples(&bwf_timecode::frames_to_tc(rolled_start_frames, source.fps_exact), source.sample_rate, source.fps_exact)
                .unwrap_or(window_start)
                .max(window_start);
        let rolled_end =
            tc_to_samples(&bwf_timecode::frames_to_tc(rolled_end_frames, source.fps_exact), source.sample_rate, source.fps_exact)
                .unwrap_or(window_end)
                .min(window_end);

        let request = ExtractionRequest {
            start_tc: bwf_timecode::samples_to_tc(rolled_start, source.sample_rate, source.fps_exact),
            end_tc: bwf_timecode::samples_to_tc(rolled_end, source.sample_rate, source.fps_exact),
            output_filename: output_filename.clone(),
            bit_depth: None,
            format: OutputFormat::Wav,
        };

        match extract_range(source, data, &request) {
            Ok(output) => outputs.push(output),
            Err(e) => {
                log::warn!("conform: row {:?} against {} failed: {e}", row.file_name, source.filename);
                return ConformOutcome { row_file_name: row.file_name.clone(), outputs, error: Some(e) };
            }
        }
    }

    ConformOutcome { row_file_name: row.file_name.clone(), outputs, error: None }
}

fn window_for(row: &SoundReportRow, sample_rate: u32, fps: FpsExact) -> Result<(u64, u64)> {
    let end = end_tc(&row.start_tc, &row.length_tc, fps)?;
    let start_samples = tc_to_samples(&row.start_tc, sample_rate, fps)?;
    let end_samples = tc_to_samples(&end, sample_rate, fps)?;
    Ok((start_samples, end_samples))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(body: &str) -> String {
        format!("SOUND REPORT,,,,\n{body}")
    }

    #[test]
    fn parses_rows_with_header_scan_and_quoted_fields() {
        let csv = report(
            "Scene,Take,\"File Name\",Start TC,Length\n\
             7A,3,\"100AT01\",01:02:03:00,00:00:05:00\n",
        );
        let rows = parse_sound_report(&csv).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].file_name, "100AT01");
        assert_eq!(rows[0].scene, "7A");
        assert_eq!(rows[0].start_tc, "01:02:03:00");
    }

    #[test]
    fn missing_sound_report_header_fails() {
        let csv = "File Name,Scene,Take,Length,Start TC\n100AT01,7A,3,00:00:05:00,01:02:03:00\n";
        assert!(parse_sound_report(csv).is_err());
    }

    #[test]
    fn disambiguates_trailing_digit_run() {
        assert_eq!(disambiguate("100AT01.wav", 1), "100AT01a.wav");
        assert_eq!(disambiguate("100AT01.wav", 2), "100AT01b.wav");
        assert_eq!(disambiguate("100AT01.wav", 0), "100AT01.wav");
        assert_eq!(disambiguate("notes.wav", 1), "notesa.wav");
    }

    fn source_record(time_reference: u64, duration_samples: u64) -> AudioFileRecord {
        AudioFileRecord {
            filename: "source.wav".to_string(),
            sample_rate: 48000,
            bit_depth: 16,
            is_float: false,
            channels: 1,
            audio_data_size: duration_samples * 2,
            file_size: 0,
            time_reference,
            duration_samples,
            fps_exact: FpsExact::new(30000, 1001).unwrap(),
            scene: String::new(),
            take: String::new(),
            tape: String::new(),
            project: String::new(),
            notes: String::new(),
            origination_date: String::new(),
            origination_time: String::new(),
            originator: String::new(),
            originator_reference: String::new(),
            description: String::new(),
            track_names: Vec::new(),
            ixml_raw: String::new(),
            bext_raw: Vec::new(),
            cue_points: Vec::new(),
            needs_ixml_repair: false,
            ixml_repair_data: None,
        }
    }

    // S5 — CSV conform with pre-roll.
    #[test]
    fn conform_applies_symmetric_pre_post_roll() {
        let fps = FpsExact::new(30000, 1001).unwrap();
        let window_start = tc_to_samples("01:02:00:00", 48000, fps).unwrap();
        let window_end = tc_to_samples("01:03:00:00", 48000, fps).unwrap();
        let source = source_record(window_start, window_end - window_start);
        let data = vec![0u8; source.audio_data_size as usize];

        let row = SoundReportRow {
            file_name: "100AT01.wav".to_string(),
            scene: String::new(),
            take: String::new(),
            length_tc: "00:00:05:00".to_string(),
            start_tc: "01:02:03:00".to_string(),
        };

        let outcomes = conform(&[row], &[(source, data)], fps, 1.0);
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].error.is_none());
        assert_eq!(outcomes[0].outputs.len(), 1);

        let expected_start = tc_to_samples("01:02:02:00", 48000, fps).unwrap();
        assert_eq!(outcomes[0].outputs[0].0.time_reference, expected_start);
    }

    #[test]
    fn row_with_no_matching_source_fails() {
        let source = source_record(0, 48000 * 10);
        let data = vec![0u8; source.audio_data_size as usize];

        let row = SoundReportRow {
            file_name: "none.wav".to_string(),
            scene: String::new(),
            take: String::new(),
            length_tc: "00:00:05:00".to_string(),
            start_tc: "05:00:00:00".to_string(),
        };

        let fps = FpsExact::new(30000, 1001).unwrap();
        let outcomes = conform(&[row], &[(source, data)], fps, 0.0);
        assert!(matches!(outcomes[0].error, Some(Error::NoMatchingTake(_))));
    }
}
