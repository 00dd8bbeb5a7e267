//! PackBits run-length encoding per TIFF 6.0.

/// Upper bound on PackBits output for `input_len` bytes: one header byte per
/// 128-byte literal chunk in the worst case.
pub(crate) fn max_compressed_len(input_len: usize) -> usize {
    input_len + input_len.div_ceil(128)
}

/// Compress one row, appending to `out`. Rows are encoded independently so a
/// decoder can stop at row boundaries.
pub(crate) fn compress_row(row: &[u8], out: &mut Vec<u8>) {
    const MAX_CHUNK: usize = 128;

    let mut i = 0;
    while i < row.len() {
        let mut run = 1;
        while i + run < row.len() && run < MAX_CHUNK && row[i + run] == row[i] {
            run += 1;
        }
        if run >= 2 {
            out.push((1 - run as i32) as u8);
            out.push(row[i]);
            i += run;
            continue;
        }

        // Literal segment: runs shorter than three bytes are not worth
        // interrupting it for.
        let start = i;
        i += 1;
        while i < row.len() && i - start < MAX_CHUNK {
            if i + 2 < row.len() && row[i] == row[i + 1] && row[i + 1] == row[i + 2] {
                break;
            }
            i += 1;
        }
        out.push((i - start - 1) as u8);
        out.extend_from_slice(&row[start..i]);
    }
}
