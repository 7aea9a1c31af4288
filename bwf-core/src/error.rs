// Symphonia
// Copyright (c) 2019-2024 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `error` module defines the common error type shared by every crate in the workspace.
//!
//! The variant set is exactly the error kind table in the engine specification: one variant per
//! row, plus `Io` for the underlying filesystem/stream failures the spec folds into "unrecoverable
//! I/O error".

use std::fmt;
use std::io;

/// `Error` enumerates every error a BWF/RF64 parse, reconcile, rewrite, or conform operation can
/// report.
#[derive(Debug)]
pub enum Error {
    /// An I/O error occurred while reading, writing, or seeking a file.
    Io(io::Error),
    /// The stream does not start with a `RIFF`/`RF64` + `WAVE` header.
    BadRiffHeader(&'static str),
    /// A chunk's declared size exceeds the bytes remaining in its parent.
    Truncated(&'static str),
    /// A chunk required for the requested operation is missing.
    ChunkNotFound(&'static str),
    /// The `bext` chunk payload is shorter than 602 bytes.
    BextTooShort(usize),
    /// The iXML chunk is not parseable as XML at all.
    IxmlMalformed(&'static str),
    /// The iXML chunk is well-formed but is missing elements required to synthesize a complete
    /// record; `needsIXMLRepair` should be set.
    IxmlIncomplete(&'static str),
    /// `fmt ` and iXML disagree on channels, sample rate, or bit depth.
    Inconsistent(&'static str),
    /// A timecode string did not have 3 or 4 colon-delimited numeric fields.
    MalformedTimecode(String),
    /// A frame-rate label was not recognized.
    UnknownFrameRate(String),
    /// The requested extraction window does not overlap the source file's active window.
    RangeOutsideFile,
    /// The source file exceeds the configured editing size threshold.
    FileTooLarge { size: u64, limit: u64 },
    /// Peak amplitude of a file to be normalized is zero.
    FileIsSilent,
    /// A Sound Report CSV row matched no source file.
    NoMatchingTake(String),
    /// A catch-all for conditions not covered by a specific variant above.
    Other(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "i/o error: {err}"),
            Error::BadRiffHeader(msg) => write!(f, "bad riff header: {msg}"),
            Error::Truncated(msg) => write!(f, "truncated chunk: {msg}"),
            Error::ChunkNotFound(id) => write!(f, "chunk not found: {id}"),
            Error::BextTooShort(len) => {
                write!(f, "bext chunk too short: {len} bytes, need at least 602")
            }
            Error::IxmlMalformed(msg) => write!(f, "ixml malformed: {msg}"),
            Error::IxmlIncomplete(msg) => write!(f, "ixml incomplete: {msg}"),
            Error::Inconsistent(msg) => write!(f, "inconsistent metadata: {msg}"),
            Error::MalformedTimecode(tc) => write!(f, "malformed timecode: {tc:?}"),
            Error::UnknownFrameRate(label) => write!(f, "unknown frame rate label: {label:?}"),
            Error::RangeOutsideFile => write!(f, "requested range does not overlap source file"),
            Error::FileTooLarge { size, limit } => {
                write!(f, "file size {size} exceeds editing threshold {limit}")
            }
            Error::FileIsSilent => write!(f, "peak amplitude is zero"),
            Error::NoMatchingTake(name) => write!(f, "no source file matches csv row {name:?}"),
            Error::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

/// Convenience constructor for [`Error::BadRiffHeader`].
pub fn bad_riff_header_error<T>(msg: &'static str) -> Result<T> {
    Err(Error::BadRiffHeader(msg))
}

/// Convenience constructor for [`Error::Truncated`].
pub fn truncated_error<T>(msg: &'static str) -> Result<T> {
    Err(Error::Truncated(msg))
}

/// Convenience constructor for [`Error::ChunkNotFound`].
pub fn chunk_not_found_error<T>(id: &'static str) -> Result<T> {
    Err(Error::ChunkNotFound(id))
}

/// Convenience constructor for [`Error::Other`].
pub fn other_error<T>(msg: &'static str) -> Result<T> {
    Err(Error::Other(msg))
}
