use crate::core::NesTime;

/// CPU cycles per output sample, roughly 44.2 kHz.
const CYCLES_PER_SAMPLE: NesTime = 40;

/// Amplitude-delta accumulation buffer.
///
/// Channels append signed deltas at the CPU time their output level changes;
/// at the end of a frame the deltas are integrated and decimated into PCM
/// samples. The synthesis is a plain stair-step (no band-limited kernel), the
/// timing side of the design is what replay depends on.
pub struct Blip {
    deltas: Vec<(NesTime, i32)>,
    /// Running output level carried across frames.
    amp: i32,
}

impl Default for Blip {
    fn default() -> Self {
        Self::new()
    }
}

impl Blip {
    pub fn new() -> Blip {
        Blip {
            deltas: Vec::with_capacity(1024),
            amp: 0,
        }
    }

    /// Add an amplitude change at `time`.
    pub fn add_delta(&mut self, time: NesTime, delta: i32) {
        if delta != 0 {
            self.deltas.push((time, delta));
        }
    }

    /// Integrate the frame's deltas into samples and reset for the next
    /// frame. `length` is the frame length in CPU cycles.
    pub fn end_frame(&mut self, length: NesTime, out: &mut std::collections::VecDeque<f32>) {
        self.deltas.sort_by_key(|d| d.0);
        let mut i = 0;
        let mut t = 0;
        while t < length {
            while i < self.deltas.len() && self.deltas[i].0 <= t {
                self.amp += self.deltas[i].1;
                i += 1;
            }
            out.push_back(self.amp as f32 / 32768.0);
            t += CYCLES_PER_SAMPLE;
        }
        // Deltas past the frame edge belong to the next frame
        let mut rest = self.deltas.split_off(i);
        for d in rest.iter_mut() {
            d.0 = (d.0 - length).max(0);
        }
        self.deltas = rest;
    }

    pub fn clear(&mut self) {
        self.deltas.clear();
        self.amp = 0;
    }
}
