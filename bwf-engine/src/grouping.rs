// Symphonia
// Copyright (c) 2019-2024 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The Grouping Engine: buckets polyphonic-split siblings (`<base>_<suffix>.wav`) back into
//! [`TakeGroup`]s.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::RegexBuilder;

use bwf_metadata::model::{AudioFileRecord, TakeGroup};

static SUFFIX_PATTERN: Lazy<regex::Regex> = Lazy::new(|| {
    RegexBuilder::new(r"^(.*)_([0-9]+|[A-Z]+[0-9]*|[A-Z])\.wav$")
        .case_insensitive(true)
        .build()
        .expect("static regex is valid")
});

/// A key for natural (numeric-aware) ordering: `"Tr2"` sorts before `"Tr10"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum NatPart {
    Num(u64),
    Str(String),
}

fn natural_key(s: &str) -> Vec<NatPart> {
    let mut parts = Vec::new();
    let mut chars = s.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() {
            let mut num = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_ascii_digit() {
                    num.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            parts.push(NatPart::Num(num.parse().unwrap_or(0)));
        } else {
            let mut run = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_ascii_digit() {
                    break;
                }
                run.push(d.to_ascii_lowercase());
                chars.next();
            }
            parts.push(NatPart::Str(run));
        }
    }

    parts
}

/// Either a record that didn't group with anything, or a fully formed take group.
#[derive(Debug, Clone, PartialEq)]
pub enum Grouped {
    Bare(AudioFileRecord),
    Group(TakeGroup),
}

fn looks_like_default_track_name(name: &str) -> bool {
    name.is_empty() || name == "Track 1" || name == "Track1"
}

/// Groups a flat sequence of records into bare records and [`TakeGroup`]s, per the Grouping
/// Engine's bucket-then-match-basename algorithm.
pub fn group(records: Vec<AudioFileRecord>) -> Vec<Grouped> {
    // Bucket by (audioDataSize, timeReference), preserving first-seen order so output order is
    // stable and deterministic.
    let mut bucket_order: Vec<(u64, u64)> = Vec::new();
    let mut buckets: HashMap<(u64, u64), Vec<AudioFileRecord>> = HashMap::new();

    for record in records {
        let key = (record.audio_data_size, record.time_reference);
        if !buckets.contains_key(&key) {
            bucket_order.push(key);
        }
        buckets.entry(key).or_default().push(record);
    }

    let mut out = Vec::new();

    for key in bucket_order {
        let bucket = buckets.remove(&key).unwrap();

        if bucket.len() < 2 {
            out.extend(bucket.into_iter().map(Grouped::Bare));
            continue;
        }

        // Match each member against the basename pattern, grouping by captured base (case folded
        // for comparison, original case kept for the group's display name).
        let mut sub_order: Vec<String> = Vec::new();
        let mut sub_buckets: HashMap<String, Vec<(AudioFileRecord, String, String)>> = HashMap::new();
        let mut unmatched = Vec::new();

        for record in bucket {
            match SUFFIX_PATTERN.captures(&record.filename) {
                Some(caps) => {
                    let base = caps.get(1).unwrap().as_str().to_string();
                    let suffix = caps.get(2).unwrap().as_str().to_string();
                    let fold_key = base.to_ascii_lowercase();
                    if !sub_buckets.contains_key(&fold_key) {
                        sub_order.push(fold_key.clone());
                    }
                    sub_buckets.entry(fold_key).or_default().push((record, base, suffix));
                }
                None => unmatched.push(record),
            }
        }

        out.extend(unmatched.into_iter().map(Grouped::Bare));

        for fold_key in sub_order {
            let mut members = sub_buckets.remove(&fold_key).unwrap();

            if members.len() < 2 {
                out.extend(members.into_iter().map(|(record, _, _)| Grouped::Bare(record)));
                continue;
            }

            members.sort_by(|(_, _, a), (_, _, b)| natural_key(a).cmp(&natural_key(b)));

            let base_name = members[0].1.clone();
            let mut siblings = Vec::with_capacity(members.len());

            for (mut record, _base, suffix) in members {
                if record.track_names.first().map(|n| looks_like_default_track_name(n)).unwrap_or(true) {
                    let fallback = format!("Ch{suffix}");
                    if record.track_names.is_empty() {
                        record.track_names.push(fallback);
                    } else {
                        record.track_names[0] = fallback;
                    }
                }
                siblings.push(record);
            }

            log::info!("grouped {} siblings under base {:?}", siblings.len(), base_name);
            out.push(Grouped::Group(TakeGroup { fingerprint: key, base_name, members: siblings }));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use bwf_timecode::FpsExact;

    fn record(filename: &str, data_size: u64, time_ref: u64, track_name: &str) -> AudioFileRecord {
        AudioFileRecord {
            filename: filename.to_string(),
            sample_rate: 48000,
            bit_depth: 24,
            is_float: false,
            channels: 1,
            audio_data_size: data_size,
            file_size: 0,
            time_reference: time_ref,
            duration_samples: data_size / 3,
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
            track_names: if track_name.is_empty() { Vec::new() } else { vec![track_name.to_string()] },
            ixml_raw: String::new(),
            bext_raw: Vec::new(),
            cue_points: Vec::new(),
            needs_ixml_repair: false,
            ixml_repair_data: None,
        }
    }

    #[test]
    fn unique_records_pass_through_bare() {
        let records = vec![record("a.wav", 100, 0, ""), record("b.wav", 200, 0, "")];
        let grouped = group(records);
        assert_eq!(grouped.len(), 2);
        assert!(grouped.iter().all(|g| matches!(g, Grouped::Bare(_))));
    }

    #[test]
    fn matching_siblings_form_a_take_group_sorted_naturally() {
        let records = vec![
            record("Scene7_2.wav", 100, 0, "Lav A"),
            record("Scene7_10.wav", 100, 0, "Lav B"),
            record("Scene7_1.wav", 100, 0, "Boom"),
        ];
        let grouped = group(records);
        assert_eq!(grouped.len(), 1);

        match &grouped[0] {
            Grouped::Group(take_group) => {
                assert_eq!(take_group.base_name, "Scene7");
                assert_eq!(take_group.channels(), 3);
                let names: Vec<&str> = take_group.members.iter().map(|m| m.filename.as_str()).collect();
                assert_eq!(names, vec!["Scene7_1.wav", "Scene7_2.wav", "Scene7_10.wav"]);
            }
            _ => panic!("expected a take group"),
        }
    }

    #[test]
    fn missing_track_name_falls_back_to_suffix() {
        let records = vec![record("X_A.wav", 50, 0, ""), record("X_B.wav", 50, 0, "")];
        let grouped = group(records);
        match &grouped[0] {
            Grouped::Group(take_group) => {
                assert_eq!(take_group.track_names(), vec!["ChA".to_string(), "ChB".to_string()]);
            }
            _ => panic!("expected a take group"),
        }
    }

    #[test]
    fn non_matching_filenames_in_a_bucket_stay_bare() {
        let records = vec![record("random1.wav", 50, 0, ""), record("random2.wav", 50, 0, "")];
        let grouped = group(records);
        assert!(grouped.iter().all(|g| matches!(g, Grouped::Bare(_))));
    }
}
