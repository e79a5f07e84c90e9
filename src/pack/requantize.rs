//! Requantization of source bytes to a narrower bit depth
//!
//! Maps a byte in [0, 255] to [0, max_value] so that the expected output is
//! `src * max_value / 255`, with the rounding policy supplied by the offset
//! generator. The obvious shortcuts are all wrong in a way that matters at
//! accumulation depth: right-shifting `src * max_value` by 8 divides by 256
//! instead of 255 and biases every entry low, and truncating (offset 0)
//! biases towards zero. Nearest rounding (offset 127) is exact on a uniform
//! continuum but leaves a residual bias on the concentrated distributions of
//! real data, which accumulates linearly along the depth dimension.
//! Probabilistic offsets remove the bias for any input distribution; the
//! price is doubled per-sample variance, so the error of a depth-D sum grows
//! as sqrt(D) instead of D.

use super::bit_depth::BitDepth;
use super::rounding::RoundingOffsetGenerator;

/// Requantizes one source byte to `[0, D::MAX_VALUE]`.
///
/// The divide by 255 is exact integer arithmetic: `src * max_value` fits in
/// 16 bits for every sub-8-bit depth, and the offset is below 255, so the
/// quotient never exceeds `max_value`. At 8 bits this is the identity and
/// the generator is not consulted.
#[inline]
pub fn requantize<D: BitDepth, G: RoundingOffsetGenerator>(src: u8, generator: &mut G) -> u8 {
    if D::BITS == 8 {
        return src;
    }
    let scaled = u16::from(src) * u16::from(D::MAX_VALUE);
    let offset = u16::from(generator.get());
    ((scaled + offset) / 255) as u8
}
