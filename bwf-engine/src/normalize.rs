// Symphonia
// Copyright (c) 2019-2024 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Normalize: scales a file's audio to a target peak level in dBFS.

use bwf_core::error::{Error, Result};
use bwf_metadata::model::AudioFileRecord;

use crate::pcm;

/// Applies gain so the file's peak sample reaches `target_db` dBFS. Fails with
/// [`Error::FileIsSilent`] if the existing peak is exactly zero (gain would be infinite).
pub fn normalize(record: &AudioFileRecord, data: &[u8], target_db: f64) -> Result<Vec<u8>> {
    let peak = pcm::peak_amplitude(data, record.bit_depth, record.is_float)?;
    if peak == 0.0 {
        return Err(Error::FileIsSilent);
    }

    let gain = 10f64.powf(target_db / 20.0) / peak;

    let mut out = data.to_vec();
    pcm::apply_gain(&mut out, record.bit_depth, record.is_float, gain)?;

    log::info!("{}: normalized to {target_db} dBFS (peak {peak:.4}, gain {gain:.4})", record.filename);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bwf_timecode::FpsExact;

    fn record() -> AudioFileRecord {
        AudioFileRecord {
            filename: "a.wav".to_string(),
            sample_rate: 48000,
            bit_depth: 16,
            is_float: false,
            channels: 1,
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
    fn normalizes_peak_to_target_level() {
        let samples: Vec<u8> = [0.1, -0.25, 0.5]
            .iter()
            .flat_map(|&v| pcm::encode_normalized(v, 16, false).unwrap())
            .collect();

        let normalized = normalize(&record(), &samples, -3.0).unwrap();
        let peak = pcm::peak_amplitude(&normalized, 16, false).unwrap();
        let target = 10f64.powf(-3.0 / 20.0);
        assert!((peak - target).abs() < 1e-3);
    }

    #[test]
    fn silent_file_fails() {
        let silent = vec![0u8; 8];
        assert!(matches!(normalize(&record(), &silent, -3.0), Err(Error::FileIsSilent)));
    }
}
