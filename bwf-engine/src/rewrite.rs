// Symphonia
// Copyright (c) 2019-2024 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The WAV Rewriter: the save state machine that turns an edited [`AudioFileRecord`] back into
//! bytes, and the bit-depth repack it optionally performs along the way.

use bwf_core::config::EngineConfig;
use bwf_core::error::{Error, Result};
use bwf_metadata::ixml::{IXMLFields, SyncPoint, TrackInfo};
use bwf_metadata::model::CueMarker;
use bwf_metadata::{bext, cue, ixml, AudioFileRecord};
use bwf_riff::{ChunkEdit, InsertPosition};

use crate::pcm;
use crate::wav::{self, FmtChunk, BEXT_ID, CUE_ID, DATA_ID, FMT_ID, IXML_ID};

fn bext_fields_from_record(record: &AudioFileRecord) -> bext::BextFields {
    bext::BextFields {
        description: record.description.clone(),
        originator: record.originator.clone(),
        originator_reference: record.originator_reference.clone(),
        origination_date: record.origination_date.clone(),
        origination_time: record.origination_time.clone(),
        time_reference: record.time_reference,
        version: 1,
        umid: [0u8; 64],
        coding_history: String::new(),
    }
}

fn ixml_fields_from_record(record: &AudioFileRecord) -> IXMLFields {
    let tracks = record
        .track_names
        .iter()
        .enumerate()
        .map(|(i, name)| TrackInfo {
            name: Some(name.clone()),
            channel_index: Some((i + 1) as u32),
            interleave_index: Some((i + 1) as u32),
        })
        .collect();

    IXMLFields {
        project: non_empty(&record.project),
        scene: non_empty(&record.scene),
        take: non_empty(&record.take),
        tape: non_empty(&record.tape),
        note: non_empty(&record.notes),
        timecode_rate: Some((record.fps_exact.numerator, record.fps_exact.denominator)),
        timecode_flag: Some("NDF".to_string()),
        file_sample_rate: Some(record.sample_rate),
        audio_bit_depth: Some(record.bit_depth),
        timestamp_samples_since_midnight: Some(record.time_reference),
        track_count: Some(record.channels),
        tracks,
        sync_points: Vec::new(),
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn sync_points_from_cues(cues: &[CueMarker], sample_rate: u32) -> Vec<SyncPoint> {
    cues.iter()
        .map(|cue| SyncPoint {
            sample_offset: (cue.time * f64::from(sample_rate)).round() as u64,
            comment: cue.label.clone(),
        })
        .collect()
}

fn cue_records_from_cues(cues: &[CueMarker], sample_rate: u32) -> Vec<cue::CueRecord> {
    cues.iter()
        .map(|c| cue::CueRecord { id: c.id, sample_position: (c.time * f64::from(sample_rate)).round() as u64 })
        .collect()
}

/// Replaces an existing chunk or inserts it after `fmt `/before `data` if it doesn't exist yet.
fn replace_or_insert(existing: bool, id: [u8; 4], payload: Vec<u8>) -> ChunkEdit {
    if existing {
        ChunkEdit::Replace { id, payload }
    } else {
        ChunkEdit::Insert { id, payload, position: InsertPosition::After(FMT_ID) }
    }
}

/// Rewrites `source_bytes` to reflect `record`'s current metadata, optionally repacking the audio
/// to a new bit depth.
///
/// Implements the save state machine of the WAV Rewriter: re-derives `bext`/`iXML`/`cue ` from
/// the record, preserves `fmt `/`data`/unknown chunks byte-identical unless a repack is
/// requested, and defers to the Chunk Codec for RF64 promotion. Fails with [`Error::FileTooLarge`]
/// if `source_bytes` exceeds `config.edit_size_limit`.
pub fn save_metadata(
    source_bytes: &[u8],
    record: &AudioFileRecord,
    repack_to: Option<(u32, bool)>,
    config: &EngineConfig,
) -> Result<Vec<u8>> {
    let size = source_bytes.len() as u64;
    if size > config.edit_size_limit {
        return Err(Error::FileTooLarge { size, limit: config.edit_size_limit });
    }

    let chunks = bwf_riff::walk(source_bytes)?;
    let has = |id: [u8; 4]| chunks.iter().any(|c| c.id == id);

    let bext_payload = bext::synthesize(&bext_fields_from_record(record));

    let mut ixml_fields = ixml_fields_from_record(record);
    let sync_points = sync_points_from_cues(&record.cue_points, record.sample_rate);
    ixml_fields.sync_points = sync_points.clone();
    let ixml_text = ixml::synthesize(&ixml_fields);

    let mut edits = vec![
        replace_or_insert(has(BEXT_ID), BEXT_ID, bext_payload),
        replace_or_insert(has(IXML_ID), IXML_ID, ixml_text.into_bytes()),
    ];

    if !record.cue_points.is_empty() {
        let cue_payload = cue::synthesize(&cue_records_from_cues(&record.cue_points, record.sample_rate));
        edits.push(replace_or_insert(has(CUE_ID), CUE_ID, cue_payload));
    }

    if let Some((dst_bits, dst_float)) = repack_to {
        if dst_bits != record.bit_depth || dst_float != record.is_float {
            let fmt_chunk = chunks.iter().find(|c| c.id == FMT_ID).ok_or(Error::ChunkNotFound("fmt "))?;
            let fmt: FmtChunk = wav::parse_fmt(fmt_chunk.payload(source_bytes))?;
            let data_chunk = chunks.iter().find(|c| c.id == DATA_ID).ok_or(Error::ChunkNotFound("data"))?;

            let repacked = pcm::repack(
                data_chunk.payload(source_bytes),
                u32::from(fmt.bits_per_sample),
                fmt.is_float(),
                dst_bits,
                dst_float,
            )?;
            let new_fmt = wav::synthesize_fmt(record.channels, record.sample_rate, dst_bits, dst_float);

            log::info!("{}: repacking {} -> {} bit", record.filename, fmt.bits_per_sample, dst_bits);
            edits.push(ChunkEdit::Replace { id: FMT_ID, payload: new_fmt });
            edits.push(ChunkEdit::Replace { id: DATA_ID, payload: repacked });
        }
    }

    bwf_riff::rewrite(source_bytes, &edits, config.rf64_threshold)
}
