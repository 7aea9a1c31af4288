// Symphonia
// Copyright (c) 2019-2024 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Merges `fmt `, `bext`, `iXML`, and `cue ` facts into one [`AudioFileRecord`], per the
//! precedence rules in the engine specification's Metadata Model section.

use bwf_core::error::{Error, Result};
use bwf_timecode::FpsExact;

use crate::bext::{self, BextFields};
use crate::cue::{self, CueRecord};
use crate::ixml::{self, IXMLFields};
use crate::model::{AudioFileRecord, CueMarker};

/// The `fmt ` chunk's authoritative format facts; these always win.
#[derive(Debug, Clone, Copy)]
pub struct FmtFacts {
    pub sample_rate: u32,
    pub bit_depth: u32,
    pub is_float: bool,
    pub channels: u32,
}

/// Everything the Reconciler needs to build one [`AudioFileRecord`].
pub struct ReconcileInputs<'a> {
    pub filename: String,
    pub fmt: FmtFacts,
    pub audio_data_size: u64,
    pub file_size: u64,
    pub bext_payload: Option<&'a [u8]>,
    pub ixml_text: Option<&'a str>,
    pub cue_payload: Option<&'a [u8]>,
}

/// Reconciles one file's chunk-level facts into a unified record.
///
/// Never fails outright on metadata disagreement: per-file inconsistencies are collected and
/// returned as non-fatal warnings alongside the record, matching the "codec-level errors are
/// local" propagation rule — only a structurally broken `bext` payload is a hard failure, since
/// without it there's nothing to reconcile from that source.
pub fn reconcile(inputs: ReconcileInputs<'_>) -> Result<(AudioFileRecord, Vec<Error>)> {
    let mut warnings = Vec::new();

    let bext = match inputs.bext_payload {
        Some(payload) => Some(bext::parse(payload)?),
        None => None,
    };

    let (ixml_fields, ixml_validation) = match inputs.ixml_text {
        Some(text) => match ixml::parse(text) {
            Ok((fields, validation)) => (Some(fields), Some(validation)),
            Err(_) => (None, None),
        },
        None => (None, None),
    };
    let needs_ixml_repair = ixml_validation.as_ref().map(|v| v.needs_repair).unwrap_or(false);

    let cue_records: Vec<CueRecord> = match inputs.cue_payload {
        Some(payload) => cue::parse(payload)?,
        None => Vec::new(),
    };

    if let Some(fields) = &ixml_fields {
        if let Some(sr) = fields.file_sample_rate {
            if sr != inputs.fmt.sample_rate {
                warnings.push(Error::Inconsistent("iXML FILE_SAMPLE_RATE disagrees with fmt sampleRate"));
            }
        }
        if let Some(bd) = fields.audio_bit_depth {
            if bd != inputs.fmt.bit_depth {
                warnings.push(Error::Inconsistent("iXML AUDIO_BIT_DEPTH disagrees with fmt bitsPerSample"));
            }
        }
        if let Some(count) = fields.track_count {
            if count != inputs.fmt.channels {
                warnings.push(Error::Inconsistent("iXML TRACK_COUNT disagrees with fmt channels"));
            }
        }
    }

    let time_reference = bext
        .as_ref()
        .map(|b| b.time_reference)
        .or_else(|| ixml_fields.as_ref().and_then(|f| f.timestamp_samples_since_midnight))
        .unwrap_or(0);

    let fps_exact = ixml_fields
        .as_ref()
        .and_then(|f| f.timecode_rate)
        .and_then(|(num, den)| FpsExact::new(num, den).ok())
        .unwrap_or(FpsExact::new(24, 1).unwrap());

    let (scene, take, tape, project, notes) = match &ixml_fields {
        Some(fields) => (
            fields.scene.clone().unwrap_or_default(),
            fields.take.clone().unwrap_or_default(),
            fields.tape.clone().unwrap_or_default(),
            fields.project.clone().unwrap_or_default(),
            fields.note.clone().unwrap_or_default(),
        ),
        None => Default::default(),
    };

    let track_names = track_names_from(&ixml_fields, &bext, inputs.fmt.channels);

    let cue_points = cue_markers_from(&ixml_fields, &cue_records, inputs.fmt.sample_rate, fps_exact);

    let bytes_per_sample = u64::from(inputs.fmt.bit_depth).div_ceil(8);
    let duration_samples = if inputs.fmt.channels == 0 || bytes_per_sample == 0 {
        0
    } else {
        inputs.audio_data_size / (u64::from(inputs.fmt.channels) * bytes_per_sample)
    };

    let mut record = AudioFileRecord {
        filename: inputs.filename,
        sample_rate: inputs.fmt.sample_rate,
        bit_depth: inputs.fmt.bit_depth,
        is_float: inputs.fmt.is_float,
        channels: inputs.fmt.channels,
        audio_data_size: inputs.audio_data_size,
        file_size: inputs.file_size,
        time_reference,
        duration_samples,
        fps_exact,
        scene,
        take,
        tape,
        project,
        notes,
        origination_date: bext.as_ref().map(|b| b.origination_date.clone()).unwrap_or_default(),
        origination_time: bext.as_ref().map(|b| b.origination_time.clone()).unwrap_or_default(),
        originator: bext.as_ref().map(|b| b.originator.clone()).unwrap_or_default(),
        originator_reference: bext.as_ref().map(|b| b.originator_reference.clone()).unwrap_or_default(),
        description: bext.as_ref().map(|b| b.description.clone()).unwrap_or_default(),
        track_names,
        ixml_raw: inputs.ixml_text.map(|s| s.to_string()).unwrap_or_default(),
        bext_raw: inputs.bext_payload.map(|p| p.to_vec()).unwrap_or_default(),
        cue_points,
        needs_ixml_repair,
        ixml_repair_data: None,
    };
    record.normalize_track_names();

    if !warnings.is_empty() {
        log::warn!("{}: {} metadata inconsistency(ies) detected", record.filename, warnings.len());
    }

    Ok((record, warnings))
}

fn track_names_from(
    ixml_fields: &Option<IXMLFields>,
    bext: &Option<BextFields>,
    channels: u32,
) -> Vec<String> {
    if let Some(fields) = ixml_fields {
        if !fields.tracks.is_empty() {
            let mut names: Vec<String> = vec![String::new(); channels as usize];
            for track in &fields.tracks {
                let Some(name) = &track.name else { continue };
                let idx = track
                    .channel_index
                    .or(track.interleave_index)
                    .map(|i| i.saturating_sub(1) as usize);
                if let Some(idx) = idx {
                    if idx < names.len() {
                        names[idx] = name.clone();
                    }
                }
            }
            if names.iter().any(|n| !n.is_empty()) {
                return names;
            }
        }
    }

    if let Some(bext) = bext {
        let from_description = bext::extract_track_names_from_description(&bext.description);
        if !from_description.is_empty() {
            let mut names: Vec<String> = vec![String::new(); channels as usize];
            for (index, name) in from_description {
                let idx = (index.saturating_sub(1)) as usize;
                if idx < names.len() {
                    names[idx] = name;
                }
            }
            if names.iter().any(|n| !n.is_empty()) {
                return names;
            }
        }
    }

    Vec::new()
}

fn cue_markers_from(
    ixml_fields: &Option<IXMLFields>,
    cue_records: &[CueRecord],
    sample_rate: u32,
    fps: FpsExact,
) -> Vec<CueMarker> {
    // iXML sync points win over the cue chunk; they carry labels the cue chunk cannot.
    if let Some(fields) = ixml_fields {
        if !fields.sync_points.is_empty() {
            let _ = fps; // kept in signature for symmetry with the rest of the reconciler
            return fields
                .sync_points
                .iter()
                .enumerate()
                .map(|(i, point)| CueMarker {
                    id: (i + 1) as u32,
                    time: point.sample_offset as f64 / f64::from(sample_rate),
                    label: point.comment.clone(),
                })
                .collect();
        }
    }

    cue_records
        .iter()
        .map(|rec| CueMarker {
            id: rec.id,
            time: rec.sample_position as f64 / f64::from(sample_rate),
            label: String::new(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt() -> FmtFacts {
        FmtFacts { sample_rate: 48000, bit_depth: 24, is_float: false, channels: 2 }
    }

    #[test]
    fn reconciles_with_no_optional_chunks() {
        let (record, warnings) = reconcile(ReconcileInputs {
            filename: "plain.wav".to_string(),
            fmt: fmt(),
            audio_data_size: 48000 * 2 * 3,
            file_size: 48000 * 2 * 3 + 44,
            bext_payload: None,
            ixml_text: None,
            cue_payload: None,
        })
        .unwrap();

        assert!(warnings.is_empty());
        assert_eq!(record.sample_rate, 48000);
        assert_eq!(record.duration_samples, 48000);
        assert_eq!(record.fps_exact, FpsExact::new(24, 1).unwrap());
        assert_eq!(record.track_names, vec!["Track 1".to_string(), "Track 2".to_string()]);
    }

    #[test]
    fn bext_time_reference_wins_over_ixml_timestamp() {
        let bext_fields =
            BextFields { time_reference: 1000, ..BextFields::default() };
        let bext_payload = bext::synthesize(&bext_fields);

        let ixml_text = ixml::synthesize(&ixml::IXMLFields {
            timestamp_samples_since_midnight: Some(9999),
            timecode_rate: Some((25, 1)),
            file_sample_rate: Some(48000),
            ..Default::default()
        });

        let (record, _) = reconcile(ReconcileInputs {
            filename: "a.wav".to_string(),
            fmt: fmt(),
            audio_data_size: 0,
            file_size: 0,
            bext_payload: Some(&bext_payload),
            ixml_text: Some(&ixml_text),
            cue_payload: None,
        })
        .unwrap();

        assert_eq!(record.time_reference, 1000);
    }

    #[test]
    fn ixml_track_names_win_over_bext_strk_lines() {
        let bext_fields = BextFields { description: "sTRK1=FromBext".to_string(), ..BextFields::default() };
        let bext_payload = bext::synthesize(&bext_fields);

        let ixml_text = ixml::synthesize(&ixml::IXMLFields {
            track_count: Some(2),
            tracks: vec![
                ixml::TrackInfo {
                    name: Some("FromIxml".to_string()),
                    channel_index: Some(1),
                    interleave_index: None,
                },
                ixml::TrackInfo { name: Some("Second".to_string()), channel_index: Some(2), interleave_index: None },
            ],
            ..Default::default()
        });

        let (record, _) = reconcile(ReconcileInputs {
            filename: "a.wav".to_string(),
            fmt: fmt(),
            audio_data_size: 0,
            file_size: 0,
            bext_payload: Some(&bext_payload),
            ixml_text: Some(&ixml_text),
            cue_payload: None,
        })
        .unwrap();

        assert_eq!(record.track_names, vec!["FromIxml".to_string(), "Second".to_string()]);
    }

    #[test]
    fn mismatched_sample_rate_is_flagged_inconsistent() {
        let ixml_text = ixml::synthesize(&ixml::IXMLFields { file_sample_rate: Some(44100), ..Default::default() });

        let (_, warnings) = reconcile(ReconcileInputs {
            filename: "a.wav".to_string(),
            fmt: fmt(),
            audio_data_size: 0,
            file_size: 0,
            bext_payload: None,
            ixml_text: Some(&ixml_text),
            cue_payload: None,
        })
        .unwrap();

        assert!(matches!(warnings.as_slice(), [Error::Inconsistent(_)]));
    }

    #[test]
    fn cue_chunk_is_fallback_when_ixml_has_no_sync_points() {
        let cue_payload = cue::synthesize(&[CueRecord { id: 1, sample_position: 48000 }]);

        let (record, _) = reconcile(ReconcileInputs {
            filename: "a.wav".to_string(),
            fmt: fmt(),
            audio_data_size: 0,
            file_size: 0,
            bext_payload: None,
            ixml_text: None,
            cue_payload: Some(&cue_payload),
        })
        .unwrap();

        assert_eq!(record.cue_points.len(), 1);
        assert_eq!(record.cue_points[0].time, 1.0);
    }
}
