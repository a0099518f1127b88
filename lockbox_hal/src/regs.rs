//! Pure bit arithmetic on register words.
//!
//! Values wider than their mask are truncated, low bits kept, exactly as
//! the hardware would latch them. None of these functions can fail.

/// Extract `word & mask` shifted down by `shift`.
#[inline]
pub const fn get_field(word: u32, mask: u32, shift: u32) -> u32 {
    (word >> shift) & mask
}

/// Replace the `mask << shift` bits of `word` with `value`.
///
/// `value` is masked first, so excess high bits never leak into
/// neighbouring fields.
#[inline]
pub const fn set_field(word: u32, value: u32, mask: u32, shift: u32) -> u32 {
    (word & !(mask << shift)) | ((value & mask) << shift)
}

/// Set `bits` inside `mask`; everything else is untouched.
#[inline]
pub const fn set_bits(word: u32, bits: u32, mask: u32) -> u32 {
    word | (bits & mask)
}

/// Clear `bits` inside `mask`; everything else is untouched.
#[inline]
pub const fn clear_bits(word: u32, bits: u32, mask: u32) -> u32 {
    word & !(bits & mask)
}

/// True if every bit of `bits & mask` is set in `word`.
#[inline]
pub const fn bits_set(word: u32, bits: u32, mask: u32) -> bool {
    let wanted = bits & mask;
    word & wanted == wanted
}

/// Sign-extend the low `width` bits of `raw`.
#[inline]
pub const fn sign_extend(raw: u32, width: u32) -> i32 {
    let unused = 32 - width;
    ((raw << unused) as i32) >> unused
}
