// Symphonia
// Copyright (c) 2019-2024 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The engine: every operation that reads or rewrites audio bytes, built on top of the chunk
//! codecs in `bwf-riff` and the unified record in `bwf-metadata`.
//!
//! - [`pcm`]: raw sample decode/encode, bit-depth repack, interleave/deinterleave, peak/gain.
//! - [`wav`]: `fmt ` chunk parsing/synthesis and whole-file parse into an [`AudioFileRecord`].
//! - [`rewrite`]: the WAV Rewriter save state machine.
//! - [`grouping`]: the Grouping Engine.
//! - [`combine_split`]: Combine and Split.
//! - [`extract`]: the Range Extractor.
//! - [`csv_conform`]: the CSV Conformer.
//! - [`normalize`]: peak normalization.
//! - [`pipeline`]: the Multi-Process Pipeline chaining the above.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]
#![allow(clippy::comparison_chain)]
#![allow(clippy::excessive_precision)]
#![allow(clippy::identity_op)]
#![allow(clippy::manual_range_contains)]
#![allow(clippy::too_many_arguments)]

pub mod combine_split;
pub mod csv_conform;
pub mod extract;
pub mod grouping;
pub mod normalize;
pub mod pcm;
pub mod pipeline;
pub mod rewrite;
pub mod wav;

pub use bwf_core::config::EngineConfig;
pub use bwf_metadata::AudioFileRecord;
pub use combine_split::{combine, split};
pub use extract::{extract_range, ExtractionRequest, OutputFormat};
pub use grouping::{group, Grouped};
pub use normalize::normalize;
pub use rewrite::save_metadata;
pub use wav::parse_file;
