// Symphonia
// Copyright (c) 2019-2024 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The fixed-layout RIFF `cue ` chunk.
//!
//! Every record in this engine's output always points at the sole `data` chunk with zero
//! chunk/block start offsets, so `sample_offset` is the only field callers ever need to set or
//! read; the rest of the 24-byte record layout is still written out in full for readers that
//! expect it.

use bwf_core::error::{Error, Result};

const RECORD_LEN: usize = 24;

/// One `cue ` point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CueRecord {
    pub id: u32,
    pub sample_position: u64,
}

/// Parses a `cue ` chunk payload: a `u32` record count followed by that many 24-byte records.
pub fn parse(payload: &[u8]) -> Result<Vec<CueRecord>> {
    if payload.len() < 4 {
        return Err(Error::Truncated("cue chunk: missing record count"));
    }

    let count = u32::from_le_bytes(payload[0..4].try_into().unwrap()) as usize;
    let expected_len = 4 + count * RECORD_LEN;
    if payload.len() < expected_len {
        return Err(Error::Truncated("cue chunk: fewer records than the header count claims"));
    }

    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let rec = &payload[4 + i * RECORD_LEN..4 + (i + 1) * RECORD_LEN];
        let id = u32::from_le_bytes(rec[0..4].try_into().unwrap());
        // rec[4..8] is play order, unused by this engine.
        // rec[8..12] is the data-chunk-id tag, always "data" in files this engine writes.
        // rec[12..16]/[16..20] (chunk start / block start) are always 0 in files this engine
        // writes; the authoritative position is sampleOffset alone.
        let sample_offset = u32::from_le_bytes(rec[20..24].try_into().unwrap());
        out.push(CueRecord { id, sample_position: u64::from(sample_offset) });
    }

    Ok(out)
}

/// Builds a `cue ` chunk payload. Every record points at `data` with zero chunk/block start, so
/// `sample_position` round-trips exactly through `sampleOffset` alone provided it fits in 32
/// bits; values above `u32::MAX` saturate rather than wrap, since a cue point beyond the 32-bit
/// sample count of a non-RF64 file cannot be represented by this chunk at all.
pub fn synthesize(records: &[CueRecord]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + records.len() * RECORD_LEN);
    out.extend_from_slice(&(records.len() as u32).to_le_bytes());

    for (order, rec) in records.iter().enumerate() {
        out.extend_from_slice(&rec.id.to_le_bytes());
        out.extend_from_slice(&(order as u32).to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        let sample_offset = u32::try_from(rec.sample_position).unwrap_or(u32::MAX);
        out.extend_from_slice(&sample_offset.to_le_bytes());
    }

    out
}
