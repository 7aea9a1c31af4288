// Symphonia
// Copyright (c) 2019-2024 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parses a BWF/RF64 file, prints its reconciled metadata, and extracts a timecode range to a new
//! WAV file.
//!
//! ```text
//! cargo run --example basic-extract -- <in.wav> <start TC> <end TC> <out.wav>
//! ```

use std::env;
use std::fs;

use bwf::engine::{extract_range, parse_file, ExtractionRequest, OutputFormat};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() != 5 {
        eprintln!("usage: {} <in.wav> <start TC> <end TC> <out.wav>", args[0]);
        std::process::exit(1);
    }

    let bytes = fs::read(&args[1]).expect("failed to read input file");
    let parsed = parse_file(&bytes, args[1].clone()).expect("failed to parse file");

    println!(
        "{}: {} ch, {} Hz, {}-bit, scene {:?}, take {:?}",
        parsed.record.filename,
        parsed.record.channels,
        parsed.record.sample_rate,
        parsed.record.bit_depth,
        parsed.record.scene,
        parsed.record.take,
    );
    for warning in &parsed.warnings {
        eprintln!("warning: {warning}");
    }

    let request = ExtractionRequest {
        start_tc: args[2].clone(),
        end_tc: args[3].clone(),
        output_filename: args[4].clone(),
        bit_depth: None,
        format: OutputFormat::Wav,
    };

    let (output, _audio) = extract_range(&parsed.record, parsed.audio_bytes(&bytes), &request)
        .expect("failed to extract range");

    println!("extracted {} samples into {}", output.duration_samples, output.filename);
}
