//! Frames, render buffers and stem ids
//!
//! Everything that crosses from a decoded stem into the device callback is
//! carried as [`StereoSample`] frames held in a [`StereoBuffer`].

use std::fmt;
use std::ops::{Add, AddAssign, Deref, DerefMut, Mul, MulAssign};
use std::sync::atomic::{AtomicU32, Ordering};

/// Rate used when neither the device nor the decoder reports one
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Frames per render quantum the engine allocates up front
pub const MAX_BUFFER_SIZE: usize = 8192;

/// Stem limit; active sources are reported as a `u64` mask
pub const MAX_STEMS: usize = 64;

pub type Sample = f32;

/// One left/right frame, laid out as two packed `f32`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct StereoSample {
    pub left: Sample,
    pub right: Sample,
}

impl StereoSample {
    pub const SILENCE: Self = Self { left: 0.0, right: 0.0 };

    #[inline]
    pub const fn new(left: Sample, right: Sample) -> Self {
        Self { left, right }
    }

    #[inline]
    pub const fn silence() -> Self {
        Self::SILENCE
    }

    #[inline]
    pub const fn mono(value: Sample) -> Self {
        Self::new(value, value)
    }

    /// Apply `f` to both channels
    #[inline]
    pub fn map(self, mut f: impl FnMut(Sample) -> Sample) -> Self {
        Self::new(f(self.left), f(self.right))
    }

    #[inline]
    pub fn peak(&self) -> Sample {
        self.left.abs().max(self.right.abs())
    }
}

impl Add for StereoSample {
    type Output = Self;

    #[inline]
    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl AddAssign for StereoSample {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = Self::new(self.left + rhs.left, self.right + rhs.right);
    }
}

impl Mul<Sample> for StereoSample {
    type Output = Self;

    #[inline]
    fn mul(self, gain: Sample) -> Self {
        self.map(|s| s * gain)
    }
}

impl MulAssign<Sample> for StereoSample {
    #[inline]
    fn mul_assign(&mut self, gain: Sample) {
        *self = *self * gain;
    }
}

/// Growable run of frames
///
/// Audio-thread buffers are created with [`StereoBuffer::silence`] at
/// `MAX_BUFFER_SIZE` and only ever shrink or regrow inside that allocation via
/// [`StereoBuffer::set_len_from_capacity`]. The buffer derefs to a frame slice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StereoBuffer {
    frames: Vec<StereoSample>,
}

impl StereoBuffer {
    pub fn silence(len: usize) -> Self {
        Self::from_vec(vec![StereoSample::SILENCE; len])
    }

    pub fn from_vec(frames: Vec<StereoSample>) -> Self {
        Self { frames }
    }

    /// Pair up `[L, R, L, R, ...]`; a dangling last value is dropped
    pub fn from_interleaved(interleaved: &[Sample]) -> Self {
        debug_assert!(interleaved.len() % 2 == 0, "odd interleaved length {}", interleaved.len());
        let frames: &[StereoSample] =
            bytemuck::cast_slice(&interleaved[..interleaved.len() & !1]);
        Self::from_vec(frames.to_vec())
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.frames.capacity()
    }

    /// Resize within the existing allocation; frames that appear are silent
    #[inline]
    pub fn set_len_from_capacity(&mut self, len: usize) {
        debug_assert!(len <= self.frames.capacity(), "{} frames exceed capacity {}", len, self.frames.capacity());
        self.frames.resize(len, StereoSample::SILENCE);
    }

    pub fn fill_silence(&mut self) {
        self.frames.fill(StereoSample::SILENCE);
    }

    #[inline]
    pub fn as_slice(&self) -> &[StereoSample] {
        &self.frames
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [StereoSample] {
        &mut self.frames
    }

    /// The frames as a flat `f32` slice, no copy
    #[inline]
    pub fn as_interleaved(&self) -> &[Sample] {
        bytemuck::cast_slice(&self.frames)
    }

    /// Mix `other` into this buffer over their common length
    pub fn add_buffer(&mut self, other: &StereoBuffer) {
        debug_assert_eq!(self.len(), other.len());
        self.frames
            .iter_mut()
            .zip(other.iter())
            .for_each(|(dst, src)| *dst += *src);
    }

    pub fn scale(&mut self, gain: Sample) {
        self.frames.iter_mut().for_each(|frame| *frame *= gain);
    }

    pub fn peak(&self) -> Sample {
        self.frames.iter().fold(0.0_f32, |acc, frame| acc.max(frame.peak()))
    }
}

impl Deref for StereoBuffer {
    type Target = [StereoSample];

    fn deref(&self) -> &Self::Target {
        &self.frames
    }
}

impl DerefMut for StereoBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.frames
    }
}

/// Handle to a loaded stem
///
/// Drawn from a process-wide counter and never reused, so an id kept across a
/// reload stops resolving instead of pointing at a different stem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StemId(u32);

static NEXT_STEM_ID: AtomicU32 = AtomicU32::new(1);

impl StemId {
    pub fn next() -> Self {
        Self(NEXT_STEM_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for StemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stem#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_arithmetic() {
        let a = StereoSample::new(0.5, -0.25);
        let sum = a + StereoSample::mono(0.25);
        assert_eq!(sum, StereoSample::new(0.75, 0.0));
        assert_eq!(a * 2.0, StereoSample::new(1.0, -0.5));
        assert_eq!(a.peak(), 0.5);
        assert_eq!(a.map(f32::abs), StereoSample::new(0.5, 0.25));
    }

    #[test]
    fn test_resize_stays_in_allocation() {
        let mut buffer = StereoBuffer::silence(MAX_BUFFER_SIZE);
        let capacity = buffer.capacity();

        buffer[3] = StereoSample::mono(1.0);
        buffer.set_len_from_capacity(2);
        buffer.set_len_from_capacity(1024);

        assert_eq!(buffer.len(), 1024);
        assert_eq!(buffer.capacity(), capacity);
        assert!(buffer.iter().all(|s| *s == StereoSample::SILENCE));
    }

    #[test]
    fn test_interleaved_round_trip_is_zero_copy_view() {
        let buffer = StereoBuffer::from_interleaved(&[0.1, 0.2, 0.3, 0.4]);
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer[1], StereoSample::new(0.3, 0.4));
        assert_eq!(buffer.as_interleaved(), &[0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn test_mix_then_scale() {
        let mut a = StereoBuffer::from_interleaved(&[0.5, 0.5, -0.5, 0.25]);
        let b = StereoBuffer::from_interleaved(&[0.25, 0.0, 0.5, 0.25]);
        a.add_buffer(&b);
        a.scale(0.5);
        assert!((a[0].left - 0.375).abs() < 1e-6);
        assert!(a[1].left.abs() < 1e-6);
        assert!((a[1].right - 0.25).abs() < 1e-6);
        assert!((a.peak() - 0.375).abs() < 1e-6);
    }

    #[test]
    fn test_stem_ids_increase() {
        let a = StemId::next();
        let b = StemId::next();
        assert_ne!(a, b);
        assert!(b.raw() > a.raw());
    }
}
