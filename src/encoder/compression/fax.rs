//! Contract for external CCITT Group 3 / Group 4 encoders.

use crate::error::TiffResult;

/// A CCITT T.4 / T.6 bilevel encoder.
///
/// Implementations are handed bit-packed rows (MSB leftmost, rows starting on
/// byte boundaries) and append encoded bytes to `out`, returning how many
/// they appended. When the caller requested a reversed fill order
/// (`FillOrder = 2`), producing bits in that order is the implementation's
/// responsibility.
pub trait FaxEncoder {
    /// Encode a single row with the T.4 one-dimensional (MH) code.
    fn encode_rle(&mut self, row: &[u8], width: u32, out: &mut Vec<u8>) -> TiffResult<u32>;

    /// Encode a whole chunk with T.4, one- or two-dimensional.
    #[allow(clippy::too_many_arguments)]
    fn encode_t4(
        &mut self,
        one_dimensional: bool,
        pad_eols: bool,
        chunk: &[u8],
        row_bytes: usize,
        width: u32,
        height: u32,
        out: &mut Vec<u8>,
    ) -> TiffResult<u32>;

    /// Encode a whole chunk with T.6 (MMR).
    fn encode_t6(
        &mut self,
        chunk: &[u8],
        row_bytes: usize,
        width: u32,
        height: u32,
        out: &mut Vec<u8>,
    ) -> TiffResult<u32>;
}
