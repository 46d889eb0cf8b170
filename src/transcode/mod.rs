mod convert;
mod ffmpeg;

pub use convert::{ConvertOutcome, convert_book};
pub use ffmpeg::{
    FfmpegTranscoder, MediaProbe, Transcoder, extract_cover_args, parse_probe_output, probe_args,
    strip_drm_args,
};
