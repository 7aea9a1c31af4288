// Symphonia
// Copyright (c) 2019-2024 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]
#![allow(clippy::comparison_chain)]
#![allow(clippy::excessive_precision)]
#![allow(clippy::identity_op)]
#![allow(clippy::manual_range_contains)]

//! Exact-rational timecode arithmetic.
//!
//! Every conversion here is driven by an [`FpsExact`] fraction rather than a floating-point frame
//! rate, the same way [`symphonia_core::units::TimeBase`] drives sample-to-time conversion with a
//! `{num, denom}` pair and a 128-bit intermediate, so that multiplying across multi-hour
//! timecodes at 192 kHz never loses a frame to accumulated rounding error.

use bwf_core::error::{Error, Result};

/// An exact frame rate, reduced to lowest terms and always positive.
///
/// `23.976` fps is `24000/1001`, not `23.976`: the fraction is exact, the decimal is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FpsExact {
    pub numerator: u32,
    pub denominator: u32,
}

impl FpsExact {
    /// Builds a reduced, validated fraction. Fails if either part is zero.
    pub fn new(numerator: u32, denominator: u32) -> Result<Self> {
        if numerator == 0 || denominator == 0 {
            return Err(Error::UnknownFrameRate(format!("{numerator}/{denominator}")));
        }
        let divisor = gcd(numerator, denominator);
        Ok(FpsExact { numerator: numerator / divisor, denominator: denominator / divisor })
    }

    /// The nominal integer field rate used for timecode's `FF` field, i.e. `round(p/q)`.
    ///
    /// `24000/1001` rounds to a field rate of 24; `30000/1001` rounds to 30. This is the SMPTE
    /// non-drop convention: the timecode counts frames as if the rate were exactly the rounded
    /// integer, while real elapsed time drifts slowly against it.
    pub fn field_rate(&self) -> u64 {
        let p = u128::from(self.numerator);
        let q = u128::from(self.denominator);
        ((2 * p + q) / (2 * q)) as u64
    }
}

impl std::fmt::Display for FpsExact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

/// Parsed `HH:MM:SS:FF` (or `HH:MM:SS` with `FF` implied to be 0) fields.
struct Fields {
    h: u64,
    m: u64,
    s: u64,
    f: u64,
}

fn parse_fields(tc: &str) -> Result<Fields> {
    let parts: Vec<&str> = tc.split(':').collect();
    if parts.len() != 3 && parts.len() != 4 {
        return Err(Error::MalformedTimecode(tc.to_string()));
    }

    let mut nums = [0u64; 4];
    for (i, part) in parts.iter().enumerate() {
        nums[i] = part.parse::<u64>().map_err(|_| Error::MalformedTimecode(tc.to_string()))?;
    }

    Ok(Fields { h: nums[0], m: nums[1], s: nums[2], f: if parts.len() == 4 { nums[3] } else { 0 } })
}

/// Converts a timecode string to a frame count at the nominal (rounded) field rate, independent
/// of any sample rate. Used for timecode-to-timecode arithmetic (e.g. a Sound Report's `Start TC
/// + Length`) where no source sample rate is known yet.
pub fn tc_to_frames(tc: &str, fps: FpsExact) -> Result<u64> {
    let fields = parse_fields(tc)?;
    let field_rate = u128::from(fps.field_rate());
    let nominal_seconds = fields.h * 3600 + fields.m * 60 + fields.s;
    Ok((u128::from(nominal_seconds) * field_rate + u128::from(fields.f)) as u64)
}

/// Inverse of [`tc_to_frames`].
pub fn frames_to_tc(frames: u64, fps: FpsExact) -> String {
    let field_rate = fps.field_rate();
    let f = frames % field_rate;
    let total_seconds = frames / field_rate;
    let s = total_seconds % 60;
    let m = (total_seconds / 60) % 60;
    let h = total_seconds / 3600;
    format!("{h:02}:{m:02}:{s:02}:{f:02}")
}

/// Converts a timecode string to an absolute sample count at `sample_rate`, given the exact frame
/// rate in effect.
///
/// `tc` must have 3 or 4 colon-delimited nonnegative integer fields (`HH:MM:SS[:FF]`); anything
/// else fails with [`Error::MalformedTimecode`].
pub fn tc_to_samples(tc: &str, sample_rate: u32, fps: FpsExact) -> Result<u64> {
    let frames = u128::from(tc_to_frames(tc, fps)?);

    let p = u128::from(fps.numerator);
    let q = u128::from(fps.denominator);
    let samples = frames * u128::from(sample_rate) * q / p;

    Ok(samples as u64)
}

/// Inverse of [`tc_to_samples`]: converts an absolute sample count back to `HH:MM:SS:FF`.
pub fn samples_to_tc(samples: u64, sample_rate: u32, fps: FpsExact) -> String {
    let p = u128::from(fps.numerator);
    let q = u128::from(fps.denominator);

    let frames = (u128::from(samples) * p / (q * u128::from(sample_rate))) as u64;
    frames_to_tc(frames, fps)
}

/// Maps a production frame-rate label to its exact fraction.
///
/// `"29.97df"` maps to the same fraction as `"29.97"`: drop-frame rendering is not performed (see
/// the drop-frame design note), the label is only a hint the caller may choose to preserve
/// elsewhere. Unrecognized labels fail with [`Error::UnknownFrameRate`].
pub fn fps_from_label(label: &str) -> Result<FpsExact> {
    let (num, den) = match label {
        "23.98" => (24000, 1001),
        "24" => (24, 1),
        "25" => (25, 1),
        "29.97" | "29.97df" => (30000, 1001),
        "30" => (30, 1),
        "48" => (48, 1),
        "50" => (50, 1),
        "59.94" => (60000, 1001),
        "60" => (60, 1),
        other => return Err(Error::UnknownFrameRate(other.to_string())),
    };
    FpsExact::new(num, den)
}

/// Formats a duration in seconds as `HH:MM:SS`, truncating any fractional second.
pub fn duration_string(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0).floor() as u64;
    let s = total_seconds % 60;
    let m = (total_seconds / 60) % 60;
    let h = total_seconds / 3600;
    format!("{h:02}:{m:02}:{s:02}")
}

/// Formats a duration in seconds as `HH:MM:SS:FF` at the given exact frame rate.
pub fn duration_tc(seconds: f64, fps: FpsExact) -> String {
    let field_rate = fps.field_rate();
    let exact_rate = f64::from(fps.numerator) / f64::from(fps.denominator);
    let frames = (seconds.max(0.0) * exact_rate).floor() as u64;

    let f = frames % field_rate;
    let total_seconds = frames / field_rate;
    let s = total_seconds % 60;
    let m = (total_seconds / 60) % 60;
    let h = total_seconds / 3600;

    format!("{h:02}:{m:02}:{s:02}:{f:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fps_exact_reduces() {
        let fps = FpsExact::new(48000, 2002).unwrap();
        assert_eq!(fps, FpsExact { numerator: 24000, denominator: 1001 });
    }

    #[test]
    fn fps_exact_rejects_zero() {
        assert!(FpsExact::new(0, 1).is_err());
        assert!(FpsExact::new(1, 0).is_err());
    }

    #[test]
    fn field_rate_rounds_ntsc_rates_up() {
        assert_eq!(fps_from_label("23.98").unwrap().field_rate(), 24);
        assert_eq!(fps_from_label("29.97").unwrap().field_rate(), 30);
        assert_eq!(fps_from_label("59.94").unwrap().field_rate(), 60);
        assert_eq!(fps_from_label("25").unwrap().field_rate(), 25);
    }

    #[test]
    fn unknown_label_fails() {
        assert!(fps_from_label("29.976").is_err());
    }

    // S1 — TC round-trip at 23.976.
    #[test]
    fn tc_round_trip_at_23_976() {
        let fps = fps_from_label("23.98").unwrap();
        let samples = tc_to_samples("01:00:00:00", 48000, fps).unwrap();
        assert_eq!(samples, 172_972_800);
        assert_eq!(samples_to_tc(samples, 48000, fps), "01:00:00:00");
    }

    #[test]
    fn tc_round_trip_at_integer_rate() {
        let fps = fps_from_label("25").unwrap();
        let samples = tc_to_samples("00:10:30:12", 48000, fps).unwrap();
        assert_eq!(samples_to_tc(samples, 48000, fps), "00:10:30:12");
    }

    #[test]
    fn three_field_timecode_implies_zero_frames() {
        let fps = fps_from_label("25").unwrap();
        let with_frames = tc_to_samples("00:01:00:00", 48000, fps).unwrap();
        let without_frames = tc_to_samples("00:01:00", 48000, fps).unwrap();
        assert_eq!(with_frames, without_frames);
    }

    #[test]
    fn malformed_timecode_is_rejected() {
        let fps = fps_from_label("25").unwrap();
        assert!(tc_to_samples("not:a:timecode", 48000, fps).is_err());
        assert!(tc_to_samples("00:01", 48000, fps).is_err());
        assert!(tc_to_samples("00:01:02:03:04", 48000, fps).is_err());
    }

    #[test]
    fn duration_string_truncates_fraction() {
        assert_eq!(duration_string(3661.9), "01:01:01");
    }

    #[test]
    fn duration_tc_matches_samples_to_tc() {
        let fps = fps_from_label("29.97").unwrap();
        let samples = tc_to_samples("00:05:00:00", 48000, fps).unwrap();
        let seconds = samples as f64 / 48000.0;
        assert_eq!(duration_tc(seconds, fps), samples_to_tc(samples, 48000, fps));
    }
}
