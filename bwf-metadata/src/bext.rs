// Symphonia
// Copyright (c) 2019-2024 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The fixed-layout Broadcast Extension (`bext`) chunk.

use bwf_core::error::{Error, Result};

const DESCRIPTION_LEN: usize = 256;
const ORIGINATOR_LEN: usize = 32;
const ORIGINATOR_REFERENCE_LEN: usize = 32;
const ORIGINATION_DATE_LEN: usize = 10;
const ORIGINATION_TIME_LEN: usize = 8;
const UMID_LEN: usize = 64;
const RESERVED_LEN: usize = 190;

/// Offset of the coding history field; also the minimum valid `bext` payload length.
const CODING_HISTORY_OFFSET: usize = 602;

/// A parsed `bext` chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BextFields {
    pub description: String,
    pub originator: String,
    pub originator_reference: String,
    pub origination_date: String,
    pub origination_time: String,
    pub time_reference: u64,
    pub version: u16,
    pub umid: [u8; UMID_LEN],
    pub coding_history: String,
}

impl Default for BextFields {
    fn default() -> Self {
        BextFields {
            description: String::new(),
            originator: String::new(),
            originator_reference: String::new(),
            origination_date: String::new(),
            origination_time: String::new(),
            time_reference: 0,
            version: 1,
            umid: [0u8; UMID_LEN],
            coding_history: String::new(),
        }
    }
}

fn read_fixed_ascii(buf: &[u8]) -> String {
    let nul = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..nul]).trim_end().to_string()
}

fn write_fixed_ascii(out: &mut [u8], value: &str) {
    let bytes = value.as_bytes();
    let n = bytes.len().min(out.len());
    out[..n].copy_from_slice(&bytes[..n]);
}

/// Parses `origination_date`/`origination_time` as a calendar timestamp, if both fields hold
/// well-formed `YYYY-MM-DD`/`HH:MM:SS` text. Producers that leave them blank or malformed are
/// common enough that this is advisory, not required for [`parse`] to succeed.
pub fn origination_datetime(fields: &BextFields) -> Option<chrono::NaiveDateTime> {
    let date = chrono::NaiveDate::parse_from_str(&fields.origination_date, "%Y-%m-%d").ok()?;
    let time = chrono::NaiveTime::parse_from_str(&fields.origination_time, "%H:%M:%S").ok()?;
    Some(chrono::NaiveDateTime::new(date, time))
}

/// Parses a `bext` chunk payload. Fails with [`Error::BextTooShort`] if shorter than 602 bytes.
pub fn parse(payload: &[u8]) -> Result<BextFields> {
    if payload.len() < CODING_HISTORY_OFFSET {
        log::debug!("bext payload too short: {} bytes", payload.len());
        return Err(Error::BextTooShort(payload.len()));
    }

    let mut offset = 0;
    let description = read_fixed_ascii(&payload[offset..offset + DESCRIPTION_LEN]);
    offset += DESCRIPTION_LEN;

    let originator = read_fixed_ascii(&payload[offset..offset + ORIGINATOR_LEN]);
    offset += ORIGINATOR_LEN;

    let originator_reference = read_fixed_ascii(&payload[offset..offset + ORIGINATOR_REFERENCE_LEN]);
    offset += ORIGINATOR_REFERENCE_LEN;

    let origination_date = read_fixed_ascii(&payload[offset..offset + ORIGINATION_DATE_LEN]);
    offset += ORIGINATION_DATE_LEN;

    let origination_time = read_fixed_ascii(&payload[offset..offset + ORIGINATION_TIME_LEN]);
    offset += ORIGINATION_TIME_LEN;

    let time_reference = u64::from_le_bytes(payload[offset..offset + 8].try_into().unwrap());
    offset += 8;

    let version = u16::from_le_bytes(payload[offset..offset + 2].try_into().unwrap());
    offset += 2;

    let mut umid = [0u8; UMID_LEN];
    umid.copy_from_slice(&payload[offset..offset + UMID_LEN]);
    offset += UMID_LEN;

    // Reserved region; skip without validating its contents (readers must tolerate producers
    // that don't zero it).
    offset += RESERVED_LEN;
    debug_assert_eq!(offset, CODING_HISTORY_OFFSET);

    let coding_history = String::from_utf8_lossy(&payload[CODING_HISTORY_OFFSET..])
        .trim_end_matches('\0')
        .to_string();

    Ok(BextFields {
        description,
        originator,
        originator_reference,
        origination_date,
        origination_time,
        time_reference,
        version,
        umid,
        coding_history,
    })
}

/// Builds a fresh `bext` payload. Always emits `version = 1` and a zero-filled reserved region,
/// regardless of what `fields.version` holds: the reserved region's "per best practice" contents
/// aren't preserved across a repair, and downstream readers of this engine only ever write
/// version 1.
pub fn synthesize(fields: &BextFields) -> Vec<u8> {
    let mut out = vec![0u8; CODING_HISTORY_OFFSET];

    write_fixed_ascii(&mut out[0..DESCRIPTION_LEN], &fields.description);
    write_fixed_ascii(
        &mut out[DESCRIPTION_LEN..DESCRIPTION_LEN + ORIGINATOR_LEN],
        &fields.originator,
    );

    let mut offset = DESCRIPTION_LEN + ORIGINATOR_LEN;
    write_fixed_ascii(&mut out[offset..offset + ORIGINATOR_REFERENCE_LEN], &fields.originator_reference);
    offset += ORIGINATOR_REFERENCE_LEN;

    write_fixed_ascii(&mut out[offset..offset + ORIGINATION_DATE_LEN], &fields.origination_date);
    offset += ORIGINATION_DATE_LEN;

    write_fixed_ascii(&mut out[offset..offset + ORIGINATION_TIME_LEN], &fields.origination_time);
    offset += ORIGINATION_TIME_LEN;

    out[offset..offset + 8].copy_from_slice(&fields.time_reference.to_le_bytes());
    offset += 8;

    out[offset..offset + 2].copy_from_slice(&1u16.to_le_bytes());
    offset += 2;

    out[offset..offset + UMID_LEN].copy_from_slice(&fields.umid);
    offset += UMID_LEN;

    offset += RESERVED_LEN;
    debug_assert_eq!(offset, CODING_HISTORY_OFFSET);

    out.extend_from_slice(fields.coding_history.as_bytes());
    out
}

/// Scans a `bext` description for `sTRK<n>=<name>` lines, returning `(track_index, name)` pairs
/// ordered by index. Used as the track-name fallback when iXML carries no `TRACK_LIST`.
pub fn extract_track_names_from_description(description: &str) -> Vec<(u32, String)> {
    let mut found = Vec::new();

    for line in description.lines() {
        let line = line.trim();
        let Some(rest) = line.strip_prefix("sTRK") else { continue };
        let Some(eq) = rest.find('=') else { continue };
        let (index_str, name) = rest.split_at(eq);
        let Ok(index) = index_str.parse::<u32>() else { continue };
        found.push((index, name[1..].to_string()));
    }

    found.sort_by_key(|(index, _)| *index);
    found
}
