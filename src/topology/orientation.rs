//! Orientation codes for upward (entity → cell) incidences.
//!
//! A code packs three facts about how a lower-dimensional entity appears in a
//! cell into one byte:
//!
//! - `which_down`: the cell-local index of the entity (e.g. which of the six
//!   tetrahedron edges);
//! - `rotation`: how far the entity's own vertex order is rotated relative to
//!   the cell-local template (for an edge: 0 if the endpoints appear in the same
//!   order, 1 if swapped);
//! - `is_flipped`: whether the orientation is mirrored (faces only; always
//!   `false` for edges).

/// Packed incidence code.
pub type Code = u8;

#[inline]
pub const fn make_code(is_flipped: bool, rotation: u8, which_down: u8) -> Code {
    (which_down << 3) | ((rotation & 0b11) << 1) | (is_flipped as u8)
}

#[inline]
pub const fn code_which_down(code: Code) -> usize {
    (code >> 3) as usize
}

#[inline]
pub const fn code_rotation(code: Code) -> usize {
    ((code >> 1) & 0b11) as usize
}

#[inline]
pub const fn code_is_flipped(code: Code) -> bool {
    code & 1 == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_round_trip_for_every_tet_edge() {
        for which_down in 0..6u8 {
            for rotation in 0..2u8 {
                let code = make_code(false, rotation, which_down);
                assert_eq!(code_which_down(code), which_down as usize);
                assert_eq!(code_rotation(code), rotation as usize);
                assert!(!code_is_flipped(code));
            }
        }
        let face = make_code(true, 2, 3);
        assert_eq!((code_which_down(face), code_rotation(face)), (3, 2));
        assert!(code_is_flipped(face));
    }
}
