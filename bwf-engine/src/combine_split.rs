// Symphonia
// Copyright (c) 2019-2024 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Combine (n monophonic sources → one polyphonic file) and Split (one polyphonic file → n
//! monophonic files). Neither resamples nor mixes; both operate sample-for-sample.

use bwf_core::error::{Error, Result};
use bwf_metadata::model::AudioFileRecord;

use crate::pcm;

/// One source handed to [`combine`]: its record plus its raw `data` chunk bytes.
pub struct CombineInput<'a> {
    pub record: &'a AudioFileRecord,
    pub data: &'a [u8],
}

fn track_name_or_fallback(record: &AudioFileRecord, index: usize) -> String {
    record.track_names.first().cloned().unwrap_or_else(|| format!("Ch{}", index + 1))
}

/// Interleaves `n ≥ 2` monophonic sources sharing sample rate, bit depth, duration, and time
/// reference into one polyphonic record. `channel_order`, if given, permutes `inputs` before
/// interleaving (e.g. `[1, 0]` swaps the first two channels).
pub fn combine(inputs: &[CombineInput<'_>], channel_order: Option<&[usize]>) -> Result<(AudioFileRecord, Vec<u8>)> {
    if inputs.len() < 2 {
        return Err(Error::Other("combine requires at least 2 sources"));
    }

    let ordered: Vec<&CombineInput<'_>> = match channel_order {
        Some(order) => order.iter().map(|&i| &inputs[i]).collect(),
        None => inputs.iter().collect(),
    };

    let first = ordered[0].record;
    for input in &ordered {
        let r = input.record;
        if r.channels != 1 {
            return Err(Error::Inconsistent("combine sources must each be monophonic"));
        }
        if r.sample_rate != first.sample_rate
            || r.bit_depth != first.bit_depth
            || r.duration_samples != first.duration_samples
            || r.time_reference != first.time_reference
        {
            return Err(Error::Inconsistent("combine sources must share rate, depth, duration, and time reference"));
        }
    }

    let bytes_per_sample = pcm::bytes_per_sample(first.bit_depth);
    let channel_buffers: Vec<&[u8]> = ordered.iter().map(|input| input.data).collect();
    let interleaved = pcm::interleave(&channel_buffers, bytes_per_sample);

    let track_names =
        ordered.iter().enumerate().map(|(i, input)| track_name_or_fallback(input.record, i)).collect();

    let mut output = first.clone();
    output.channels = ordered.len() as u32;
    output.track_names = track_names;
    output.audio_data_size = interleaved.len() as u64;
    output.cue_points = Vec::new();
    output.ixml_raw = String::new();
    output.bext_raw = Vec::new();

    log::info!("combined {} sources into one {}-channel file", ordered.len(), output.channels);

    Ok((output, interleaved))
}

/// Deinterleaves one polyphonic record into `channels` monophonic records, named
/// `<base>_<k+1>.wav`.
pub fn split(record: &AudioFileRecord, data: &[u8]) -> Vec<(AudioFileRecord, Vec<u8>)> {
    let bytes_per_sample = pcm::bytes_per_sample(record.bit_depth);
    let channels = pcm::deinterleave(data, record.channels, bytes_per_sample);

    let base = record.filename.strip_suffix(".wav").unwrap_or(&record.filename);

    channels
        .into_iter()
        .enumerate()
        .map(|(k, channel_data)| {
            let mut output = record.clone();
            output.filename = format!("{base}_{}.wav", k + 1);
            output.channels = 1;
            let name = track_name_or_fallback(record, k);
            output.description = format!("sTRK1={name}");
            output.track_names = vec![name];
            output.audio_data_size = channel_data.len() as u64;
            output.cue_points = Vec::new();
            output.ixml_raw = String::new();
            (output, channel_data)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bwf_timecode::FpsExact;

    fn mono_record(filename: &str, track_name: &str) -> AudioFileRecord {
        AudioFileRecord {
            filename: filename.to_string(),
            sample_rate: 48000,
            bit_depth: 16,
            is_float: false,
            channels: 1,
            audio_data_size: 8,
            file_size: 0,
            time_reference: 100,
            duration_samples: 4,
            fps_exact: FpsExact::new(25, 1).unwrap(),
            scene: "7A".to_string(),
            take: String::new(),
            tape: String::new(),
            project: String::new(),
            notes: String::new(),
            origination_date: String::new(),
            origination_time: String::new(),
            originator: String::new(),
            originator_reference: String::new(),
            description: String::new(),
            track_names: vec![track_name.to_string()],
            ixml_raw: String::new(),
            bext_raw: Vec::new(),
            cue_points: Vec::new(),
            needs_ixml_repair: false,
            ixml_repair_data: None,
        }
    }

    #[test]
    fn combine_then_split_round_trips_audio_data() {
        let left_data: Vec<u8> = (0..4i16).flat_map(|v| v.to_le_bytes()).collect();
        let right_data: Vec<u8> = (10..14i16).flat_map(|v| v.to_le_bytes()).collect();

        let left = mono_record("Scene7_1.wav", "Boom");
        let right = mono_record("Scene7_2.wav", "Lav A");

        let inputs =
            vec![CombineInput { record: &left, data: &left_data }, CombineInput { record: &right, data: &right_data }];

        let (combined, combined_data) = combine(&inputs, None).unwrap();
        assert_eq!(combined.channels, 2);
        assert_eq!(combined.track_names, vec!["Boom".to_string(), "Lav A".to_string()]);

        let split_outputs = split(&combined, &combined_data);
        assert_eq!(split_outputs.len(), 2);
        assert_eq!(split_outputs[0].1, left_data);
        assert_eq!(split_outputs[1].1, right_data);
        assert_eq!(split_outputs[0].0.filename, "Scene7_1_1.wav");
        assert_eq!(split_outputs[0].0.description, "sTRK1=Boom");
    }

    #[test]
    fn combine_rejects_mismatched_sample_rates() {
        let data = vec![0u8; 8];
        let mut right = mono_record("b.wav", "Lav A");
        right.sample_rate = 44100;
        let left = mono_record("a.wav", "Boom");

        let inputs = vec![CombineInput { record: &left, data: &data }, CombineInput { record: &right, data: &data }];
        assert!(combine(&inputs, None).is_err());
    }

    #[test]
    fn combine_respects_channel_order_permutation() {
        let left_data: Vec<u8> = (0..2i16).flat_map(|v| v.to_le_bytes()).collect();
        let right_data: Vec<u8> = (10..12i16).flat_map(|v| v.to_le_bytes()).collect();

        let left = mono_record("a.wav", "Boom");
        let right = mono_record("b.wav", "Lav A");
        let inputs =
            vec![CombineInput { record: &left, data: &left_data }, CombineInput { record: &right, data: &right_data }];

        let (combined, _) = combine(&inputs, Some(&[1, 0])).unwrap();
        assert_eq!(combined.track_names, vec!["Lav A".to_string(), "Boom".to_string()]);
    }
}
