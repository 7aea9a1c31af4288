// Symphonia
// Copyright (c) 2019-2024 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The Multi-Process Pipeline: chains SummedMix → Combine → Normalize → Rename over a set of
//! already-extracted files. Extract itself is the Range Extractor or CSV Conformer, run by the
//! caller before handing its outputs to [`run`].

use std::collections::HashMap;

use bwf_core::error::{Error, Result};
use bwf_metadata::model::AudioFileRecord;

use crate::combine_split::{self, CombineInput};
use crate::normalize;
use crate::pcm;

/// Where a group's summed mix lands relative to the group's combined file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixPlacement {
    /// The mix becomes channel 0 of the combined polyphonic file.
    Embed,
    /// The mix is written out as its own standalone file alongside the combined one.
    Separate,
}

/// One field of a [`RenameTemplate`] slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameField {
    None,
    Project,
    Tape,
    Scene,
    Take,
    Custom(String),
}

fn field_value(field: &RenameField, record: &AudioFileRecord) -> String {
    let raw = match field {
        RenameField::None => return String::new(),
        RenameField::Project => &record.project,
        RenameField::Tape => &record.tape,
        RenameField::Scene => &record.scene,
        RenameField::Take => &record.take,
        RenameField::Custom(s) => return s.clone(),
    };

    match raw.parse::<u32>() {
        Ok(n) => format!("{n:02}"),
        Err(_) => raw.clone(),
    }
}

/// The three-field `<f1><sep1><f2><sep2><f3>` rename template.
#[derive(Debug, Clone)]
pub struct RenameTemplate {
    pub field1: RenameField,
    pub sep1: String,
    pub field2: RenameField,
    pub sep2: String,
    pub field3: RenameField,
}

/// Applies `template` to `record`, falling back to `YYMMDD-HHMMSS-NN.wav` (NN incremented until
/// unique against `taken`) if every field resolves empty.
pub fn apply_rename(
    template: &RenameTemplate,
    record: &AudioFileRecord,
    taken: &mut std::collections::HashSet<String>,
    now: chrono::NaiveDateTime,
) -> String {
    let f1 = field_value(&template.field1, record);
    let f2 = field_value(&template.field2, record);
    let f3 = field_value(&template.field3, record);

    let name = if f1.is_empty() && f2.is_empty() && f3.is_empty() {
        let stamp = now.format("%y%m%d-%H%M%S").to_string();
        let mut n = 1u32;
        loop {
            let candidate = format!("{stamp}-{n:02}.wav");
            if !taken.contains(&candidate) {
                break candidate;
            }
            n += 1;
        }
    } else {
        format!("{f1}{}{f2}{}{f3}.wav", template.sep1, template.sep2)
    };

    taken.insert(name.clone());
    name
}

/// Config for one pipeline run. Stages run in the fixed order SummedMix → Combine → Normalize →
/// Rename; each is individually optional.
pub struct PipelineConfig {
    pub summed_mix: bool,
    pub mix_placement: MixPlacement,
    pub combine: bool,
    pub target_db: Option<f64>,
    pub rename: Option<RenameTemplate>,
    pub keep_intermediate: bool,
}

struct Item {
    record: AudioFileRecord,
    data: Vec<u8>,
    is_intermediate: bool,
}

/// Why one file dropped out of the pipeline partway through.
pub struct PipelineFailure {
    pub filename: String,
    pub stage: &'static str,
    pub error: Error,
}

pub struct PipelineResult {
    pub outputs: Vec<(AudioFileRecord, Vec<u8>)>,
    pub failures: Vec<PipelineFailure>,
}

fn group_key(record: &AudioFileRecord) -> (u64, u64) {
    (record.time_reference, record.audio_data_size)
}

fn mix_filename(record: &AudioFileRecord) -> String {
    let label = format!("{}{}", record.scene, record.take);
    if label.is_empty() {
        "mix.wav".to_string()
    } else {
        format!("{label}_mix.wav")
    }
}

/// Mixes `members` down to one mono file, gain `0.9/sqrt(N)` per channel to avoid clipping.
fn summed_mix(members: &[&Item]) -> Result<(AudioFileRecord, Vec<u8>)> {
    let first = &members[0].record;
    let bytes_per_sample = pcm::bytes_per_sample(first.bit_depth);
    let sample_count = first.data_len_samples(bytes_per_sample);
    let gain = 0.9 / (members.len() as f64).sqrt();

    let mut mixed = Vec::with_capacity(sample_count);
    for i in 0..sample_count {
        let mut sum = 0.0;
        for item in members {
            let step = bytes_per_sample;
            let sample = &item.data[i * step..(i + 1) * step];
            sum += pcm::decode_normalized(sample, first.bit_depth, first.is_float)? * gain;
        }
        mixed.push(sum.clamp(-1.0, 1.0));
    }

    let mut encoded = Vec::with_capacity(mixed.len() * bytes_per_sample);
    for v in mixed {
        encoded.extend_from_slice(&pcm::encode_normalized(v, first.bit_depth, first.is_float)?);
    }

    let mut record = first.clone();
    record.filename = mix_filename(first);
    record.channels = 1;
    record.track_names = vec!["Mix".to_string()];
    record.audio_data_size = encoded.len() as u64;
    record.cue_points = Vec::new();
    record.ixml_raw = String::new();
    record.bext_raw = Vec::new();

    Ok((record, encoded))
}

trait DataLen {
    fn data_len_samples(&self, bytes_per_sample: usize) -> usize;
}

impl DataLen for AudioFileRecord {
    fn data_len_samples(&self, bytes_per_sample: usize) -> usize {
        self.audio_data_size as usize / bytes_per_sample
    }
}

/// Runs the pipeline over already-extracted `inputs`.
pub fn run(inputs: Vec<(AudioFileRecord, Vec<u8>)>, config: &PipelineConfig, now: chrono::NaiveDateTime) -> PipelineResult {
    let mut items: Vec<Item> =
        inputs.into_iter().map(|(record, data)| Item { record, data, is_intermediate: false }).collect();
    let mut failures = Vec::new();

    // Bucket every item's index by (timeReference, audioDataSize), preserving first-seen order.
    let mut order: Vec<(u64, u64)> = Vec::new();
    let mut buckets: HashMap<(u64, u64), Vec<usize>> = HashMap::new();
    for (i, item) in items.iter().enumerate() {
        let key = group_key(&item.record);
        if !buckets.contains_key(&key) {
            order.push(key);
        }
        buckets.entry(key).or_default().push(i);
    }

    let mut mixes: HashMap<(u64, u64), (AudioFileRecord, Vec<u8>)> = HashMap::new();
    if config.summed_mix {
        for key in &order {
            let indices = &buckets[key];
            if indices.len() < 2 {
                continue;
            }
            let members: Vec<&Item> = indices.iter().map(|&i| &items[i]).collect();
            match summed_mix(&members) {
                Ok(mix) => {
                    mixes.insert(*key, mix);
                }
                Err(e) => {
                    log::warn!("summed mix failed for group {key:?}: {e}");
                    for &i in indices {
                        failures.push(PipelineFailure {
                            filename: items[i].record.filename.clone(),
                            stage: "summed_mix",
                            error: Error::Other("summed mix failed"),
                        });
                    }
                }
            }
        }
    }

    let mut produced: Vec<Item> = Vec::new();

    if config.combine {
        for key in &order {
            let indices = &buckets[key];
            if indices.len() < 2 {
                for &i in indices {
                    produced.push(items[i].clone_for_output());
                }
                continue;
            }

            let mix = mixes.get(key);
            let embed_mix = matches!(config.mix_placement, MixPlacement::Embed) && mix.is_some();

            let mix_record_data = mix.map(|(r, d)| (r.clone(), d.clone()));
            let mix_input = mix_record_data
                .as_ref()
                .filter(|_| embed_mix)
                .map(|(record, data)| CombineInput { record, data: data.as_slice() });

            let member_inputs: Vec<CombineInput<'_>> =
                indices.iter().map(|&i| CombineInput { record: &items[i].record, data: &items[i].data }).collect();

            let mut all_inputs = Vec::with_capacity(member_inputs.len() + 1);
            all_inputs.extend(mix_input);
            all_inputs.extend(member_inputs);

            match combine_split::combine(&all_inputs, None) {
                Ok((record, data)) => produced.push(Item { record, data, is_intermediate: false }),
                Err(e) => {
                    log::warn!("combine failed for group {key:?}: {e}");
                    for &i in indices {
                        failures.push(PipelineFailure {
                            filename: items[i].record.filename.clone(),
                            stage: "combine",
                            error: Error::Other("combine failed"),
                        });
                    }
                    continue;
                }
            }

            if let Some((record, data)) = mix_record_data {
                if !embed_mix {
                    produced.push(Item { record, data, is_intermediate: false });
                }
            }
            for &i in indices {
                produced.push(items[i].take_for_intermediate());
            }
        }
    } else {
        produced = std::mem::take(&mut items).into_iter().map(|i| i.clone_for_output()).collect();
        for (record, data) in mixes.into_values() {
            produced.push(Item { record, data, is_intermediate: false });
        }
    }

    if let Some(target_db) = config.target_db {
        let mut normalized = Vec::with_capacity(produced.len());
        for item in produced {
            match normalize::normalize(&item.record, &item.data, target_db) {
                Ok(data) => normalized.push(Item { record: item.record, data, is_intermediate: item.is_intermediate }),
                Err(e) => failures.push(PipelineFailure {
                    filename: item.record.filename.clone(),
                    stage: "normalize",
                    error: e,
                }),
            }
        }
        produced = normalized;
    }

    if !config.keep_intermediate {
        produced.retain(|item| !item.is_intermediate);
    }

    if let Some(template) = &config.rename {
        let mut taken = std::collections::HashSet::new();
        for item in &mut produced {
            item.record.filename = apply_rename(template, &item.record, &mut taken, now);
        }
    }

    PipelineResult {
        outputs: produced.into_iter().map(|item| (item.record, item.data)).collect(),
        failures,
    }
}

impl Item {
    fn clone_for_output(&self) -> Item {
        Item { record: self.record.clone(), data: self.data.clone(), is_intermediate: self.is_intermediate }
    }

    fn take_for_intermediate(&self) -> Item {
        Item { record: self.record.clone(), data: self.data.clone(), is_intermediate: true }
    }
}
