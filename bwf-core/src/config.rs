// Symphonia
// Copyright (c) 2019-2024 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Runtime-configurable thresholds for the WAV Rewriter and Chunk Codec.
//!
//! Both thresholds are fields on [`EngineConfig`], passed into the engine's entry points rather
//! than baked in as global constants, per the "configuration knob" design note.

/// Above this source file size, the WAV Rewriter refuses to edit the file.
pub const DEFAULT_EDIT_SIZE_LIMIT: u64 = 2 * 1024 * 1024 * 1024;

/// Above this reassembled body length, or this `data` payload length, the Chunk Codec emits an
/// `RF64` container with a `ds64` size-override chunk instead of a plain `RIFF`.
pub const DEFAULT_RF64_THRESHOLD: u64 = u32::MAX as u64 - 1;

/// The rewriter's configurable thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub edit_size_limit: u64,
    pub rf64_threshold: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig { edit_size_limit: DEFAULT_EDIT_SIZE_LIMIT, rf64_threshold: DEFAULT_RF64_THRESHOLD }
    }
}
