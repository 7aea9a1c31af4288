// Symphonia
// Copyright (c) 2019-2024 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `fmt ` chunk access and whole-file parsing: the entry point that turns raw WAV/RF64 bytes into
//! an [`AudioFileRecord`] by combining the Chunk Codec, bEXT/iXML/cue Codecs, and the Reconciler.

use bwf_core::error::{Error, Result};
use bwf_metadata::reconcile::{reconcile, FmtFacts, ReconcileInputs};
use bwf_metadata::AudioFileRecord;

pub const FMT_ID: [u8; 4] = *b"fmt ";
pub const DATA_ID: [u8; 4] = *b"data";
pub const BEXT_ID: [u8; 4] = *b"bext";
pub const IXML_ID: [u8; 4] = *b"iXML";
pub const CUE_ID: [u8; 4] = *b"cue ";

pub const WAVE_FORMAT_PCM: u16 = 1;
pub const WAVE_FORMAT_IEEE_FLOAT: u16 = 3;

/// The parsed `fmt ` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FmtChunk {
    pub audio_format: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
}

impl FmtChunk {
    pub fn is_float(&self) -> bool {
        self.audio_format == WAVE_FORMAT_IEEE_FLOAT
    }
}

/// Parses a `fmt ` chunk payload. Fails with [`Error::Truncated`] if shorter than 16 bytes.
pub fn parse_fmt(payload: &[u8]) -> Result<FmtChunk> {
    if payload.len() < 16 {
        return Err(Error::Truncated("fmt chunk shorter than 16 bytes"));
    }

    Ok(FmtChunk {
        audio_format: u16::from_le_bytes(payload[0..2].try_into().unwrap()),
        channels: u16::from_le_bytes(payload[2..4].try_into().unwrap()),
        sample_rate: u32::from_le_bytes(payload[4..8].try_into().unwrap()),
        byte_rate: u32::from_le_bytes(payload[8..12].try_into().unwrap()),
        block_align: u16::from_le_bytes(payload[12..14].try_into().unwrap()),
        bits_per_sample: u16::from_le_bytes(payload[14..16].try_into().unwrap()),
    })
}

/// Builds a minimal 16-byte `fmt ` chunk payload (PCM or IEEE float, no extension block).
pub fn synthesize_fmt(channels: u32, sample_rate: u32, bits_per_sample: u32, is_float: bool) -> Vec<u8> {
    let block_align = channels * bits_per_sample.div_ceil(8);
    let byte_rate = sample_rate * block_align;

    let mut out = Vec::with_capacity(16);
    out.extend_from_slice(&(if is_float { WAVE_FORMAT_IEEE_FLOAT } else { WAVE_FORMAT_PCM }).to_le_bytes());
    out.extend_from_slice(&(channels as u16).to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&(block_align as u16).to_le_bytes());
    out.extend_from_slice(&(bits_per_sample as u16).to_le_bytes());
    out
}

/// A fully parsed file: its unified record plus the raw byte range of its `data` chunk payload,
/// so callers can slice audio without re-walking the chunk list.
pub struct ParsedFile {
    pub record: AudioFileRecord,
    pub warnings: Vec<Error>,
    pub data_offset: u64,
    pub data_size: u64,
}

impl ParsedFile {
    pub fn audio_bytes<'a>(&self, bytes: &'a [u8]) -> &'a [u8] {
        let start = self.data_offset as usize;
        let end = start + self.data_size as usize;
        &bytes[start..end]
    }
}

/// Parses raw WAV/RF64 bytes into an [`AudioFileRecord`]. Decode is never performed here; this is
/// metadata-only, matching the "parse only; no decode" lifecycle rule.
pub fn parse_file(bytes: &[u8], filename: String) -> Result<ParsedFile> {
    let chunks = bwf_riff::walk(bytes)?;

    let fmt_chunk = chunks
        .iter()
        .find(|c| c.id == FMT_ID)
        .ok_or(Error::ChunkNotFound("fmt "))?;
    let fmt = parse_fmt(fmt_chunk.payload(bytes))?;

    let data_chunk = chunks.iter().find(|c| c.id == DATA_ID).ok_or(Error::ChunkNotFound("data"))?;

    let bext_payload = chunks.iter().find(|c| c.id == BEXT_ID).map(|c| c.payload(bytes));
    let ixml_text: Option<String> = chunks
        .iter()
        .find(|c| c.id == IXML_ID)
        .map(|c| String::from_utf8_lossy(c.payload(bytes)).trim_end_matches('\0').to_string());
    let cue_payload = chunks.iter().find(|c| c.id == CUE_ID).map(|c| c.payload(bytes));

    log::debug!(
        "{filename}: fmt={{channels:{}, rate:{}, bits:{}}}, bext={}, ixml={}, cue={}",
        fmt.channels,
        fmt.sample_rate,
        fmt.bits_per_sample,
        bext_payload.is_some(),
        ixml_text.is_some(),
        cue_payload.is_some()
    );

    let (record, warnings) = reconcile(ReconcileInputs {
        filename,
        fmt: FmtFacts {
            sample_rate: fmt.sample_rate,
            bit_depth: u32::from(fmt.bits_per_sample),
            is_float: fmt.is_float(),
            channels: u32::from(fmt.channels),
        },
        audio_data_size: data_chunk.size,
        file_size: bytes.len() as u64,
        bext_payload,
        ixml_text: ixml_text.as_deref(),
        cue_payload,
    })?;

    Ok(ParsedFile { record, warnings, data_offset: data_chunk.offset, data_size: data_chunk.size })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut out = id.to_vec();
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(payload);
        if payload.len() % 2 == 1 {
            out.push(0);
        }
        out
    }

    fn minimal_wav(channels: u32, sample_rate: u32, bits: u32, audio: &[u8]) -> Vec<u8> {
        let fmt_payload = synthesize_fmt(channels, sample_rate, bits, false);
        let mut body = Vec::new();
        body.extend_from_slice(&chunk(&FMT_ID, &fmt_payload));
        body.extend_from_slice(&chunk(&DATA_ID, audio));

        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&((4 + body.len()) as u32).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(&body);
        out
    }

    #[test]
    fn parses_a_minimal_file_with_no_optional_chunks() {
        let bytes = minimal_wav(2, 48000, 16, &[0u8; 48]);
        let parsed = parse_file(&bytes, "a.wav".to_string()).unwrap();
        assert_eq!(parsed.record.sample_rate, 48000);
        assert_eq!(parsed.record.channels, 2);
        assert_eq!(parsed.data_size, 48);
        assert_eq!(parsed.audio_bytes(&bytes).len(), 48);
    }

    #[test]
    fn missing_fmt_chunk_fails() {
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&12u32.to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(&chunk(&DATA_ID, &[0u8; 4]));
        assert!(matches!(parse_file(&out, "x.wav".to_string()), Err(Error::ChunkNotFound("fmt "))));
    }
}
