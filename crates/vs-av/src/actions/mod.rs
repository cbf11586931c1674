//! Split actions: lossless copy-split of a source into parts, and
//! re-encoding of a single oversized part.

mod copy_split;
mod reencode;

pub use copy_split::{
    build_copy_split_args, check_conflicts, collect_parts, copy_split, remove_existing_parts,
};
pub use reencode::{
    build_encode_args, reencode_part, target_video_bitrate, EncodeMode, ReencodeOutcome,
};
