// ===========================================================================
// Scalar row implementations
// ===========================================================================

/// `0xAARRGGBB` → `[R, G, B, A]`.
#[inline(always)]
fn argb_word_to_rgba(v: u32) -> [u8; 4] {
    v.rotate_left(8).to_be_bytes()
}

pub(super) fn bgr_to_rgb_row(src: &[u8], dst: &mut [u8]) {
    for (s, d) in src.chunks_exact(3).zip(dst.chunks_exact_mut(3)) {
        d[0] = s[2];
        d[1] = s[1];
        d[2] = s[0];
    }
}

pub(super) fn abgr_to_rgba_row(src: &[u8], dst: &mut [u8]) {
    for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
        let v = u32::from_ne_bytes([s[0], s[1], s[2], s[3]]);
        d.copy_from_slice(&v.swap_bytes().to_ne_bytes());
    }
}

pub(super) fn gray_to_rgb_row(src: &[u8], dst: &mut [u8]) {
    for (&v, d) in src.iter().zip(dst.chunks_exact_mut(3)) {
        d[0] = v;
        d[1] = v;
        d[2] = v;
    }
}

pub(super) fn argb_to_rgba_row(src: &[u32], dst: &mut [u8]) {
    for (&v, d) in src.iter().zip(dst.chunks_exact_mut(4)) {
        d.copy_from_slice(&argb_word_to_rgba(v));
    }
}

pub(super) fn xrgb_to_rgb_row(src: &[u32], dst: &mut [u8]) {
    for (&v, d) in src.iter().zip(dst.chunks_exact_mut(3)) {
        let [_, r, g, b] = v.to_be_bytes();
        d[0] = r;
        d[1] = g;
        d[2] = b;
    }
}

pub(super) fn xbgr_to_rgb_row(src: &[u32], dst: &mut [u8]) {
    for (&v, d) in src.iter().zip(dst.chunks_exact_mut(3)) {
        let [r, g, b, _] = v.to_le_bytes();
        d[0] = r;
        d[1] = g;
        d[2] = b;
    }
}
