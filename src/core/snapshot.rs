//! The snapshot engine: a self-delimited stream of tagged blocks capturing
//! the whole machine, plus a run-length differential form against a
//! reference snapshot.
//!
//! A stream starts with a `NESS` sentinel (length field 0xFFFFFFFF, no
//! payload) and ends with `gend`. Blocks are written in a fixed order but
//! accepted in any order; unknown tags are skipped so newer streams load on
//! older cores.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use log::*;
use serde::{Deserialize, Serialize};

use crate::core::cartridge::mapper::default_reset;
use crate::core::{Nes, NesTime};

/// Differential-compression settings, matching the test script's
/// `"Differential Compression"` object.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct DifferentialConfig {
    #[serde(rename = "Enabled")]
    pub enabled: bool,
    #[serde(rename = "Max Differences")]
    pub max_differences: usize,
    #[serde(rename = "Use Zlib")]
    pub use_zlib: bool,
}

impl Default for DifferentialConfig {
    fn default() -> Self {
        DifferentialConfig {
            enabled: false,
            max_differences: 12800,
            use_zlib: false,
        }
    }
}

/// The RAM-like payloads that the differential form compresses.
const RAM_TAGS: [&[u8; 4]; 5] = [b"LRAM", b"SPRT", b"NTAB", b"CHRR", b"SRAM"];

fn put_block(out: &mut Vec<u8>, tag: &[u8; 4], payload: &[u8]) {
    out.extend_from_slice(tag);
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
}

fn put_sentinel(out: &mut Vec<u8>) {
    out.extend_from_slice(b"NESS");
    out.extend_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
}

/// Split a stream into `(tag, payload)` pairs, sentinel and `gend`
/// excluded.
fn parse_blocks(data: &[u8]) -> Result<Vec<([u8; 4], &[u8])>, String> {
    if data.len() < 8 || &data[0..4] != b"NESS" {
        return Err("Not a NESS snapshot".to_string());
    }
    let mut blocks = Vec::new();
    let mut pos = 8;
    loop {
        if pos + 8 > data.len() {
            return Err("Truncated snapshot stream".to_string());
        }
        let mut tag = [0u8; 4];
        tag.copy_from_slice(&data[pos..pos + 4]);
        let len = u32::from_le_bytes([
            data[pos + 4],
            data[pos + 5],
            data[pos + 6],
            data[pos + 7],
        ]) as usize;
        pos += 8;
        if &tag == b"gend" {
            return Ok(blocks);
        }
        if pos + len > data.len() {
            return Err("Truncated snapshot stream".to_string());
        }
        blocks.push((tag, &data[pos..pos + len]));
        pos += len;
    }
}

fn u16_of(data: &[u8], i: usize) -> u16 {
    u16::from_le_bytes([data[i], data[i + 1]])
}
fn u32_of(data: &[u8], i: usize) -> u32 {
    u32::from_le_bytes([data[i], data[i + 1], data[i + 2], data[i + 3]])
}

impl Nes {
    fn block_disabled(&self, tag: &[u8; 4]) -> bool {
        let name = std::str::from_utf8(tag).unwrap_or("");
        self.disabled_blocks.iter().any(|b| b.as_str() == name)
    }

    /// Omit a block from serialized streams; `"HIGH"` is accepted as an
    /// alias for the SRAM block.
    pub fn disable_state_block(&mut self, name: &str) {
        let name = if name == "HIGH" { "SRAM" } else { name };
        if !self.disabled_blocks.iter().any(|b| b.as_str() == name) {
            self.disabled_blocks.push(name.to_string());
        }
    }

    /// Put a previously disabled block back.
    pub fn enable_state_block(&mut self, name: &str) {
        let name = if name == "HIGH" { "SRAM" } else { name };
        self.disabled_blocks.retain(|b| b.as_str() != name);
    }

    /// Size in bytes of the stream [Nes::serialize] currently produces.
    pub fn state_size(&self) -> usize {
        self.serialize().len()
    }

    fn time_payload(&self) -> [u8; 12] {
        let mut p = [0u8; 12];
        // Stored at five times the CPU clock so the stream does not depend
        // on the internal CPU:PPU ratio
        p[..2].copy_from_slice(&((self.timestamp as u16).wrapping_mul(5)).to_le_bytes());
        p[4..8].copy_from_slice(&self.frame_count.to_le_bytes());
        p
    }

    fn cpu_payload(&self) -> [u8; 8] {
        let r = &self.cpu.r;
        [
            (r.pc & 0xFF) as u8,
            ((r.pc >> 8) & 0xFF) as u8,
            r.sp,
            r.status,
            r.a,
            r.x,
            r.y,
            0,
        ]
    }

    fn ppu_payload(&self) -> [u8; 52] {
        let p = &self.ppu;
        let mut out = [0u8; 52];
        out[0] = p.w2000;
        out[1] = p.w2001;
        out[2] = p.r2002;
        out[3] = p.w2003;
        out[4] = p.r2007;
        out[5] = p.second_write as u8;
        out[6..8].copy_from_slice(&p.vram_addr.to_le_bytes());
        out[8..10].copy_from_slice(&p.vram_temp.to_le_bytes());
        out[10] = p.pixel_x;
        out[12..44].copy_from_slice(&p.palette);
        out[44..46].copy_from_slice(&p.decay_low.to_le_bytes());
        out[46..48].copy_from_slice(&p.decay_high.to_le_bytes());
        out[48] = p.open_bus;
        out
    }

    fn ctrl_payload(&self) -> [u8; 12] {
        let mut out = [0u8; 12];
        out[..4].copy_from_slice(&self.joypad.latches[0].to_le_bytes());
        out[4..8].copy_from_slice(&self.joypad.latches[1].to_le_bytes());
        out[8] = self.joypad.w4016;
        out
    }

    fn nametable_size(&self) -> usize {
        // Four-screen carts map the upper half of VRAM
        if self.ppu.nt_banks[3] >= 0xC00 {
            0x1000
        } else {
            0x800
        }
    }

    /// Serialize the machine into a block-tagged stream. Blocks disabled
    /// with [Nes::disable_state_block] are omitted (the "lite" form).
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(0x1800);
        put_sentinel(&mut out);
        let mut put = |tag: &[u8; 4], payload: &[u8]| {
            if !self.block_disabled(tag) {
                put_block(&mut out, tag, payload);
            }
        };
        put(b"TIME", &self.time_payload());
        put(b"CPUR", &self.cpu_payload());
        put(b"PPUR", &self.ppu_payload());
        put(b"APUR", &self.apu.save_state());
        put(b"CTRL", &self.ctrl_payload());
        put(b"MAPR", &self.mapper.state());
        put(b"LRAM", &self.cpu.low_mem);
        put(b"SPRT", &self.ppu.spr_ram);
        put(b"NTAB", &self.ppu.nt_ram[..self.nametable_size()]);
        if self.ppu.chr_is_writable {
            put(b"CHRR", &self.ppu.chr_ram[..self.ppu.chr_size]);
        }
        if self.map.sram_present {
            put(b"SRAM", &self.map.sram[..]);
        }
        put_block(&mut out, b"gend", &[]);
        out
    }

    /// Restore the machine from a stream produced by [Nes::serialize].
    ///
    /// Unknown tags are skipped. The mapper's mapping is rebuilt from the
    /// MAPR payload last, so the code map and CHR banks always agree with
    /// the loaded registers.
    pub fn deserialize(&mut self, data: &[u8]) -> Result<usize, String> {
        let blocks = parse_blocks(data)?;

        self.clock = 0;
        self.cpu.error_count = 0;
        self.ppu.burst_phase = 0;

        let mut mapr: Option<Vec<u8>> = None;
        let mut sram_seen = false;
        for (tag, payload) in &blocks {
            match tag {
                b"TIME" => {
                    if payload.len() < 8 {
                        return Err("Bad TIME block".to_string());
                    }
                    self.timestamp = (u16_of(payload, 0) / 5) as NesTime;
                    self.frame_count = u32_of(payload, 4);
                }
                b"CPUR" => {
                    if payload.len() < 8 {
                        return Err("Bad CPUR block".to_string());
                    }
                    self.cpu.r.pc = u16_of(payload, 0) as u32;
                    self.cpu.r.sp = payload[2];
                    self.cpu.r.status = payload[3];
                    self.cpu.r.a = payload[4];
                    self.cpu.r.x = payload[5];
                    self.cpu.r.y = payload[6];
                }
                b"PPUR" => {
                    if payload.len() < 52 {
                        return Err("Bad PPUR block".to_string());
                    }
                    let p = &mut self.ppu;
                    p.w2000 = payload[0];
                    p.w2001 = payload[1];
                    p.r2002 = payload[2];
                    p.w2003 = payload[3];
                    p.r2007 = payload[4];
                    p.second_write = payload[5] != 0;
                    p.vram_addr = u16_of(payload, 6);
                    p.vram_temp = u16_of(payload, 8);
                    p.pixel_x = payload[10] & 7;
                    p.palette.copy_from_slice(&payload[12..44]);
                    p.decay_low = u16_of(payload, 44);
                    p.decay_high = u16_of(payload, 46);
                    p.open_bus = payload[48];
                }
                b"APUR" => self.apu.load_state(payload)?,
                b"CTRL" => {
                    if payload.len() < 12 {
                        return Err("Bad CTRL block".to_string());
                    }
                    self.joypad.latches[0] = u32_of(payload, 0);
                    self.joypad.latches[1] = u32_of(payload, 4);
                    self.joypad.w4016 = payload[8];
                }
                b"MAPR" => mapr = Some(payload.to_vec()),
                b"LRAM" => {
                    let n = payload.len().min(self.cpu.low_mem.len());
                    self.cpu.low_mem[..n].copy_from_slice(&payload[..n]);
                }
                b"SPRT" => {
                    let n = payload.len().min(self.ppu.spr_ram.len());
                    self.ppu.spr_ram[..n].copy_from_slice(&payload[..n]);
                }
                b"NTAB" => {
                    let n = payload.len().min(self.ppu.nt_ram.len());
                    self.ppu.nt_ram[..n].copy_from_slice(&payload[..n]);
                }
                b"CHRR" => {
                    if self.ppu.chr_is_writable {
                        let n = payload.len().min(self.ppu.chr_ram.len());
                        self.ppu.chr_ram[..n].copy_from_slice(&payload[..n]);
                    }
                }
                b"SRAM" => {
                    let n = payload.len().min(self.map.sram.len());
                    self.map.sram[..n].copy_from_slice(&payload[..n]);
                    sram_seen = true;
                }
                _ => debug!(
                    "Skipping unknown snapshot block {:?}",
                    String::from_utf8_lossy(&tag[..])
                ),
            }
        }

        if let Some(state) = mapr {
            // The embedded code map is never trusted; reset, reload the
            // registers, and let the mapper rebuild its mapping
            let expected = self.mapper.state().len();
            if state.len() != expected {
                return Err(format!(
                    "MAPR block is {} bytes but mapper {} expects {}",
                    state.len(),
                    self.cart.mapper_code(),
                    expected
                ));
            }
            self.with_mapper(|m, bus| {
                default_reset(m, bus);
                m.load_state(&state);
                m.apply_mapping(bus);
            });
        } else {
            self.with_mapper(|m, bus| m.apply_mapping(bus));
        }
        if sram_seen {
            self.with_mapper(|_, bus| bus.enable_sram(true, false));
        }
        let ts = self.timestamp;
        self.apu.end_frame(-ts);
        Ok(data.len())
    }

    /// Serialize as a difference against `reference` (a full snapshot of
    /// the same machine). Fixed-size blocks are stored verbatim; the
    /// RAM-like payloads become skip/copy runs. Fails when the differing
    /// byte count exceeds the configured budget, in which case the caller
    /// should fall back to a full snapshot.
    pub fn serialize_differential(
        &self,
        reference: &[u8],
        config: &DifferentialConfig,
    ) -> Result<Vec<u8>, String> {
        let current = self.serialize();
        let cur_blocks = parse_blocks(&current)?;
        let ref_blocks = parse_blocks(reference)?;

        let mut out = Vec::new();
        put_sentinel(&mut out);
        let mut cur_ram = Vec::new();
        let mut ref_ram = Vec::new();
        for (tag, payload) in &cur_blocks {
            if RAM_TAGS.contains(&tag) {
                let reference = ref_blocks
                    .iter()
                    .find(|(t, _)| t == tag)
                    .map(|(_, p)| *p)
                    .ok_or_else(|| {
                        format!(
                            "Reference snapshot is missing the {} block",
                            String::from_utf8_lossy(&tag[..])
                        )
                    })?;
                if reference.len() != payload.len() {
                    return Err("Reference snapshot layout differs".to_string());
                }
                cur_ram.extend_from_slice(payload);
                ref_ram.extend_from_slice(reference);
            } else {
                put_block(&mut out, tag, payload);
            }
        }

        let mut body = rle_encode(&ref_ram, &cur_ram, config.max_differences)?;
        let mut payload = vec![config.use_zlib as u8, 0, 0, 0];
        payload.extend_from_slice(&(body.len() as u32).to_le_bytes());
        if config.use_zlib {
            let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
            enc.write_all(&body).map_err(|e| e.to_string())?;
            body = enc.finish().map_err(|e| e.to_string())?;
        }
        payload.extend_from_slice(&body);
        put_block(&mut out, b"DIFF", &payload);
        put_block(&mut out, b"gend", &[]);
        Ok(out)
    }

    /// Restore from a differential stream. The reference is read-only;
    /// the machine is rebuilt from the reference plus the stream alone.
    pub fn deserialize_differential(
        &mut self,
        reference: &[u8],
        stream: &[u8],
        _config: &DifferentialConfig,
    ) -> Result<(), String> {
        let blocks = parse_blocks(stream)?;
        let ref_blocks = parse_blocks(reference)?;

        let diff = blocks
            .iter()
            .find(|(t, _)| t == b"DIFF")
            .map(|(_, p)| *p)
            .ok_or_else(|| "Differential stream has no DIFF block".to_string())?;
        if diff.len() < 8 {
            return Err("Bad DIFF block".to_string());
        }
        let zlib = diff[0] != 0;
        let raw_len = u32_of(diff, 4) as usize;
        let body = if zlib {
            let mut dec = ZlibDecoder::new(&diff[8..]);
            let mut out = Vec::with_capacity(raw_len);
            dec.read_to_end(&mut out).map_err(|e| e.to_string())?;
            out
        } else {
            diff[8..].to_vec()
        };
        if body.len() != raw_len {
            return Err("Bad DIFF block length".to_string());
        }

        // The RAM layout comes from the reference
        let ram_blocks: Vec<([u8; 4], &[u8])> = ref_blocks
            .iter()
            .filter(|(t, _)| RAM_TAGS.contains(&t) && !self.block_disabled(t))
            .cloned()
            .collect();
        let mut ref_ram = Vec::new();
        for (_, payload) in &ram_blocks {
            ref_ram.extend_from_slice(payload);
        }
        let patched = rle_apply(&ref_ram, &body)?;

        // Reassemble a full stream and load it the ordinary way
        let mut full = Vec::new();
        put_sentinel(&mut full);
        for (tag, payload) in &blocks {
            if tag != b"DIFF" {
                put_block(&mut full, tag, payload);
            }
        }
        let mut pos = 0;
        for (tag, payload) in &ram_blocks {
            put_block(&mut full, tag, &patched[pos..pos + payload.len()]);
            pos += payload.len();
        }
        put_block(&mut full, b"gend", &[]);
        self.deserialize(&full)?;
        Ok(())
    }
}

/// Encode `current` against `reference` as (skip, copy, bytes) runs,
/// terminated by the total count of differing bytes.
fn rle_encode(reference: &[u8], current: &[u8], max_differences: usize) -> Result<Vec<u8>, String> {
    let mut out = Vec::new();
    let mut changed_total = 0usize;
    let mut i = 0;
    let n = current.len();
    while i < n {
        let skip_start = i;
        while i < n && current[i] == reference[i] {
            i += 1;
        }
        let change_start = i;
        while i < n && current[i] != reference[i] {
            i += 1;
        }
        let run = i - change_start;
        changed_total += run;
        if changed_total > max_differences {
            return Err(format!(
                "Differential snapshot exceeds the budget of {} differing bytes",
                max_differences
            ));
        }
        out.extend_from_slice(&((change_start - skip_start) as u32).to_le_bytes());
        out.extend_from_slice(&(run as u32).to_le_bytes());
        out.extend_from_slice(&current[change_start..i]);
    }
    out.extend_from_slice(&(changed_total as u32).to_le_bytes());
    Ok(out)
}

/// Apply runs produced by [rle_encode] on top of `reference`.
fn rle_apply(reference: &[u8], body: &[u8]) -> Result<Vec<u8>, String> {
    let mut out = reference.to_vec();
    let mut pos = 0usize;
    let mut i = 0usize;
    let mut changed_total = 0usize;
    while pos < out.len() {
        if i + 8 > body.len() {
            return Err("Truncated differential data".to_string());
        }
        let skip = u32_of(body, i) as usize;
        let run = u32_of(body, i + 4) as usize;
        i += 8;
        if i + run > body.len() || pos + skip + run > out.len() {
            return Err("Corrupt differential data".to_string());
        }
        pos += skip;
        out[pos..pos + run].copy_from_slice(&body[i..i + run]);
        pos += run;
        i += run;
        changed_total += run;
    }
    if i + 4 > body.len() || u32_of(body, i) as usize != changed_total {
        return Err("Differential byte count mismatch".to_string());
    }
    Ok(out)
}
