// Symphonia
// Copyright (c) 2019-2024 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The unified metadata record produced by [`crate::reconcile`] and consumed by every downstream
//! engine operation.

use bwf_timecode::FpsExact;

/// One cue point, `id` stable across edits, `time` in seconds for traversal ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct CueMarker {
    pub id: u32,
    pub time: f64,
    pub label: String,
}

/// The unified metadata for one source file: the Reconciler's output and the unit every engine
/// operation (rewrite, extract, combine, split, group) reads and writes.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFileRecord {
    pub filename: String,

    // Format facts — always win from `fmt `.
    pub sample_rate: u32,
    pub bit_depth: u32,
    pub is_float: bool,
    pub channels: u32,
    pub audio_data_size: u64,
    pub file_size: u64,

    // Temporal facts.
    pub time_reference: u64,
    pub duration_samples: u64,
    pub fps_exact: FpsExact,

    // Descriptive facts.
    pub scene: String,
    pub take: String,
    pub tape: String,
    pub project: String,
    pub notes: String,
    pub origination_date: String,
    pub origination_time: String,
    pub originator: String,
    pub originator_reference: String,
    pub description: String,

    pub track_names: Vec<String>,

    pub ixml_raw: String,
    pub bext_raw: Vec<u8>,
    pub cue_points: Vec<CueMarker>,

    pub needs_ixml_repair: bool,
    pub ixml_repair_data: Option<String>,
}

impl AudioFileRecord {
    /// `bytesPerSample = ceil(bitDepth / 8)`.
    pub fn bytes_per_sample(&self) -> u64 {
        u64::from(self.bit_depth).div_ceil(8)
    }

    /// The file's active sample window, `[timeReference, timeReference + durationSamples]`.
    pub fn active_window(&self) -> (u64, u64) {
        (self.time_reference, self.time_reference + self.duration_samples)
    }

    /// Fills any track name gaps with `"Track N"` so `trackNames.len() == channels` always holds,
    /// per the §3.1 normalization invariant.
    pub fn normalize_track_names(&mut self) {
        self.track_names.resize_with(self.channels as usize, || String::new());
        for (i, name) in self.track_names.iter_mut().enumerate() {
            if name.is_empty() {
                *name = format!("Track {}", i + 1);
            }
        }
    }
}

/// A set of [`AudioFileRecord`]s believed to be siblings of one polyphonic recording, grouped by
/// the Grouping Engine.
#[derive(Debug, Clone, PartialEq)]
pub struct TakeGroup {
    /// `(audioDataSize, timeReference)`, the bucketing fingerprint.
    pub fingerprint: (u64, u64),
    pub base_name: String,
    pub members: Vec<AudioFileRecord>,
}

impl TakeGroup {
    /// The group's combined channel count, `Σ sibling.channels`.
    pub fn channels(&self) -> u32 {
        self.members.iter().map(|m| m.channels).sum()
    }

    /// Per-sibling ordered concatenation of track names.
    pub fn track_names(&self) -> Vec<String> {
        self.members.iter().flat_map(|m| m.track_names.iter().cloned()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_record() -> AudioFileRecord {
        AudioFileRecord {
            filename: "a.wav".to_string(),
            sample_rate: 48000,
            bit_depth: 24,
            is_float: false,
            channels: 2,
            audio_data_size: 0,
            file_size: 0,
            time_reference: 0,
            duration_samples: 0,
            fps_exact: FpsExact::new(25, 1).unwrap(),
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

    #[test]
    fn bytes_per_sample_rounds_up() {
        let mut record = blank_record();
        record.bit_depth = 24;
        assert_eq!(record.bytes_per_sample(), 3);
    }

    #[test]
    fn normalize_fills_missing_track_names() {
        let mut record = blank_record();
        record.channels = 3;
        record.track_names = vec!["Boom".to_string()];
        record.normalize_track_names();
        assert_eq!(record.track_names, vec!["Boom", "Track 2", "Track 3"]);
    }

    #[test]
    fn take_group_sums_channels_and_concatenates_names() {
        let mut a = blank_record();
        a.channels = 1;
        a.track_names = vec!["Boom".to_string()];
        let mut b = blank_record();
        b.channels = 1;
        b.track_names = vec!["Lav A".to_string()];

        let group = TakeGroup { fingerprint: (0, 0), base_name: "scene7".to_string(), members: vec![a, b] };
        assert_eq!(group.channels(), 2);
        assert_eq!(group.track_names(), vec!["Boom".to_string(), "Lav A".to_string()]);
    }
}
