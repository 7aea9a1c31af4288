// Symphonia
// Copyright (c) 2019-2024 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared plumbing for the BWF/RF64 metadata engine: the [`error`] type used by every crate in
//! the workspace, the [`io`] byte-cursor traits used to read and write chunk payloads, and the
//! [`config`] knobs that make the rewriter's thresholds runtime-configurable.

pub mod config;
pub mod error;
pub mod io;
