//! Side-by-side compositing of one frame pair.

use crate::processing::frame::{Dimensions, FramePair, SbsFrame, VideoFrame};

/// Places the left eye in the left half and the right eye in the right half
/// of a new double-width frame. Pixels are copied unchanged.
///
/// # Panics
///
/// Panics if the two frames differ in size. The locator rejects sources whose
/// eye streams disagree, so a mismatch here is a pipeline bug.
pub fn compose(pair: &FramePair) -> SbsFrame {
    SbsFrame {
        index: pair.index,
        frame: compose_frames(&pair.left, &pair.right),
    }
}

/// Composites two single-eye frames; shared by the video and stills paths.
pub(crate) fn compose_frames(left: &VideoFrame, right: &VideoFrame) -> VideoFrame {
    let dims = left.dimensions();
    assert_eq!(
        dims,
        right.dimensions(),
        "eye frames must have identical dimensions"
    );

    let row_len = dims.row_len();
    let mut data = Vec::with_capacity(dims.frame_len() * 2);
    for (left_row, right_row) in left
        .data()
        .chunks_exact(row_len)
        .zip(right.data().chunks_exact(row_len))
    {
        data.extend_from_slice(left_row);
        data.extend_from_slice(right_row);
    }

    let sbs = Dimensions::side_by_side(&dims);
    // Length is exact by construction: 2 * row_len * height.
    match VideoFrame::from_raw(sbs, data) {
        Ok(frame) => frame,
        Err(e) => unreachable!("composited buffer has the wrong size: {e}"),
    }
}
