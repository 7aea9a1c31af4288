// Symphonia
// Copyright (c) 2019-2024 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Raw interleaved PCM sample access: decode/encode, bit-depth repack, interleave/deinterleave,
//! and the peak/gain helpers Normalize needs. Everything here operates directly on `data` chunk
//! bytes; there is no intermediate `AudioBuffer` type, since every caller either repacks in place
//! or needs exactly one full-buffer pass.
//!
//! Bit depth is file-controlled (it comes straight out of the parsed `fmt ` chunk), so every
//! function here that switches on `bits` returns [`Result`] and fails with [`Error::Other`] on a
//! depth other than 16/24/32 rather than panicking.

use bwf_core::error::{Error, Result};

/// `bitsPerSample` in bytes, rounded up (24-bit samples occupy 3 bytes).
pub fn bytes_per_sample(bits: u32) -> usize {
    bits.div_ceil(8) as usize
}

fn read_i24(bytes: &[u8]) -> i32 {
    let b = [bytes[0], bytes[1], bytes[2], if bytes[2] & 0x80 != 0 { 0xFF } else { 0x00 }];
    i32::from_le_bytes(b)
}

fn write_i24(value: i32, out: &mut [u8]) {
    let bytes = value.to_le_bytes();
    out[0..3].copy_from_slice(&bytes[0..3]);
}

/// Reads one sample as a normalized `f64` in `[-1.0, 1.0]` (float samples may exceed this range;
/// they are passed through unclipped).
pub fn decode_normalized(buf: &[u8], bits: u32, is_float: bool) -> Result<f64> {
    if is_float {
        debug_assert_eq!(bits, 32);
        return Ok(f64::from(f32::from_le_bytes(buf[0..4].try_into().unwrap())));
    }

    Ok(match bits {
        16 => f64::from(i16::from_le_bytes(buf[0..2].try_into().unwrap())) / f64::from(i16::MAX),
        24 => read_i24(buf) as f64 / 8_388_607.0,
        32 => f64::from(i32::from_le_bytes(buf[0..4].try_into().unwrap())) / f64::from(i32::MAX),
        _ => return Err(Error::Other("unsupported PCM bit depth")),
    })
}

/// Writes a normalized `f64` sample back out, clipping to the representable integer range.
pub fn encode_normalized(value: f64, bits: u32, is_float: bool) -> Result<Vec<u8>> {
    let mut out = vec![0u8; bytes_per_sample(bits)];

    if is_float {
        debug_assert_eq!(bits, 32);
        out.copy_from_slice(&(value as f32).to_le_bytes());
        return Ok(out);
    }

    match bits {
        16 => {
            let scaled = (value * f64::from(i16::MAX)).round().clamp(f64::from(i16::MIN), f64::from(i16::MAX));
            out.copy_from_slice(&(scaled as i16).to_le_bytes());
        }
        24 => {
            let scaled = (value * 8_388_607.0).round().clamp(-8_388_608.0, 8_388_607.0);
            write_i24(scaled as i32, &mut out);
        }
        32 => {
            let scaled = (value * f64::from(i32::MAX)).round().clamp(f64::from(i32::MIN), f64::from(i32::MAX));
            out.copy_from_slice(&(scaled as i32).to_le_bytes());
        }
        _ => return Err(Error::Other("unsupported PCM bit depth")),
    }

    Ok(out)
}

/// Rescales raw PCM bytes from one bit depth / format to another, one sample at a time.
///
/// 16↔24 PCM conversion is sample-domain linear scaling with no dither (dither is a permitted
/// implementation choice, not required). 32-bit float to 16/24-bit PCM scales by
/// `32767.5`/`8388607.5` and clips at ±1.0, per the bit-depth repack rules.
pub fn repack(data: &[u8], src_bits: u32, src_float: bool, dst_bits: u32, dst_float: bool) -> Result<Vec<u8>> {
    let src_step = bytes_per_sample(src_bits);
    let dst_step = bytes_per_sample(dst_bits);
    let sample_count = data.len() / src_step;
    let mut out = Vec::with_capacity(sample_count * dst_step);

    for i in 0..sample_count {
        let sample = &data[i * src_step..(i + 1) * src_step];

        if !src_float && !dst_float {
            let raw = match src_bits {
                16 => i32::from(i16::from_le_bytes(sample[0..2].try_into().unwrap())),
                24 => read_i24(sample),
                32 => i32::from_le_bytes(sample[0..4].try_into().unwrap()),
                _ => return Err(Error::Other("unsupported PCM bit depth")),
            };

            let shift = dst_bits as i32 - src_bits as i32;
            let rescaled = if shift >= 0 { raw.wrapping_shl(shift as u32) } else { raw >> (-shift) };

            match dst_bits {
                16 => out.extend_from_slice(&(rescaled as i16).to_le_bytes()),
                24 => {
                    let mut buf = [0u8; 3];
                    write_i24(rescaled, &mut buf);
                    out.extend_from_slice(&buf);
                }
                32 => out.extend_from_slice(&rescaled.to_le_bytes()),
                _ => return Err(Error::Other("unsupported PCM bit depth")),
            }
            continue;
        }

        if src_float && !dst_float {
            let value = f64::from(f32::from_le_bytes(sample[0..4].try_into().unwrap())).clamp(-1.0, 1.0);
            let scale = match dst_bits {
                16 => 32767.5,
                24 => 8_388_607.5,
                _ => return Err(Error::Other("unsupported float-to-int target PCM bit depth")),
            };
            let scaled = (value * scale).round();
            match dst_bits {
                16 => out.extend_from_slice(&(scaled as i16).to_le_bytes()),
                24 => {
                    let mut buf = [0u8; 3];
                    write_i24(scaled as i32, &mut buf);
                    out.extend_from_slice(&buf);
                }
                _ => unreachable!(),
            }
            continue;
        }

        // int->float or float->float: go through the general normalized path.
        let value = decode_normalized(sample, src_bits, src_float)?;
        out.extend_from_slice(&encode_normalized(value, dst_bits, dst_float)?);
    }

    Ok(out)
}

/// Interleaves `n` mono channel buffers (each the same sample count) into one polyphonic buffer.
pub fn interleave(channels: &[&[u8]], bytes_per_sample: usize) -> Vec<u8> {
    if channels.is_empty() {
        return Vec::new();
    }
    let frame_count = channels[0].len() / bytes_per_sample;
    let mut out = Vec::with_capacity(frame_count * channels.len() * bytes_per_sample);

    for frame in 0..frame_count {
        for channel in channels {
            let start = frame * bytes_per_sample;
            out.extend_from_slice(&channel[start..start + bytes_per_sample]);
        }
    }

    out
}

/// Deinterleaves a polyphonic buffer into `channels` mono buffers.
pub fn deinterleave(data: &[u8], channels: u32, bytes_per_sample: usize) -> Vec<Vec<u8>> {
    let channels = channels as usize;
    let frame_size = bytes_per_sample * channels;
    let frame_count = data.len() / frame_size;

    let mut out: Vec<Vec<u8>> = (0..channels).map(|_| Vec::with_capacity(frame_count * bytes_per_sample)).collect();

    for frame in 0..frame_count {
        let base = frame * frame_size;
        for (c, out_channel) in out.iter_mut().enumerate() {
            let start = base + c * bytes_per_sample;
            out_channel.extend_from_slice(&data[start..start + bytes_per_sample]);
        }
    }

    out
}

/// The largest absolute normalized sample value across the whole buffer (interleaved, all
/// channels).
pub fn peak_amplitude(data: &[u8], bits: u32, is_float: bool) -> Result<f64> {
    let step = bytes_per_sample(bits);
    let mut peak = 0.0;
    for sample in data.chunks_exact(step) {
        peak = f64::max(peak, decode_normalized(sample, bits, is_float)?.abs());
    }
    Ok(peak)
}

/// Scales every sample in `data` by `gain`, in place.
pub fn apply_gain(data: &mut [u8], bits: u32, is_float: bool, gain: f64) -> Result<()> {
    let step = bytes_per_sample(bits);
    for sample in data.chunks_exact_mut(step) {
        let scaled = decode_normalized(sample, bits, is_float)? * gain;
        sample.copy_from_slice(&encode_normalized(scaled, bits, is_float)?);
    }
    Ok(())
}
