// Symphonia
// Copyright (c) 2019-2024 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

//! # bwf
//!
//! A BWF/RF64 broadcast metadata and conformance engine: parses, reconciles, rewrites, groups,
//! combines/splits, extracts, and conforms Broadcast WAV and RF64 files without ever decoding to
//! PCM for its own sake — every operation that can work on bytes does.
//!
//! The workspace is layered the way Symphonia layers its own container/codec/core split:
//!
//! | Crate           | Role                                                                  |
//! |-----------------|------------------------------------------------------------------------|
//! | `bwf-core`      | Shared error type and I/O helpers.                                    |
//! | `bwf-timecode`  | Exact-rational `HH:MM:SS:FF` <-> sample arithmetic.                    |
//! | `bwf-riff`      | RIFF/RF64 chunk walking, lookup, and rewriting (the Chunk Codec).      |
//! | `bwf-metadata`  | `bext`/`iXML`/`cue ` chunk codecs, the unified record, the Reconciler. |
//! | `bwf-engine`    | Rewrite, Grouping, Combine/Split, Range Extractor, CSV Conformer, Multi-Process Pipeline. |
//!
//! This crate re-exports all of them behind feature flags so a caller can depend on just `bwf` and
//! pick the layers it needs.
//!
//! # Usage
//!
//! 1. Call [`parse_file`] (suspendable — see the concurrency model in the design notes) on raw
//!    WAV/RF64 bytes to get a [`AudioFileRecord`] plus its `data` chunk byte range.
//! 2. Edit the record's descriptive fields directly; they round-trip through `bext`/iXML on save.
//! 3. Call [`save_metadata`] to write the edited record back, optionally repacking to a new bit
//!    depth.
//! 4. Use [`extract_range`], [`combine`], [`split`], [`group`], or the CSV Conformer/pipeline in
//!    [`engine`] for the higher-level batch operations.

pub use bwf_core as core;
pub use bwf_metadata as metadata;
pub use bwf_riff as riff;
pub use bwf_timecode as timecode;

pub use bwf_core::config::EngineConfig;
pub use bwf_core::error::{Error, Result};
pub use bwf_metadata::{reconcile, AudioFileRecord, CueMarker, TakeGroup};
pub use bwf_timecode::{samples_to_tc, tc_to_samples, FpsExact};

#[cfg(feature = "engine")]
pub use bwf_engine as engine;

#[cfg(feature = "engine")]
pub use bwf_engine::{combine, extract_range, group, normalize, parse_file, save_metadata, split, Grouped};
