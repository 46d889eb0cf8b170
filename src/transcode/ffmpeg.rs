// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

use crate::error::TranscodeError;

/// Container level facts about a media file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaProbe {
    pub duration_secs: Option<f64>,
    pub size: Option<u64>,
    /// Format tags with lowercased keys (`title`, `artist`, `comment`, ...)
    pub tags: BTreeMap<String, String>,
}

impl MediaProbe {
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags.get(name).map(String::as_str)
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: ProbeFormat,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    #[serde(default)]
    duration: Option<String>,
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    tags: BTreeMap<String, serde_json::Value>,
}

/// Parse the JSON printed by `ffprobe -show_format -output_format json`
pub fn parse_probe_output(path: &Path, stdout: &[u8]) -> Result<MediaProbe, TranscodeError> {
    let output: ProbeOutput =
        serde_json::from_slice(stdout).map_err(|e| TranscodeError::ProbeParseFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    let tags = output
        .format
        .tags
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            (key.to_lowercase(), value)
        })
        .collect();

    Ok(MediaProbe {
        duration_secs: output.format.duration.and_then(|d| d.parse().ok()),
        size: output.format.size.and_then(|s| s.parse().ok()),
        tags,
    })
}

/// External media tool used to unwrap downloads and inspect local files
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Copy the audio streams of `source` into `output`, decrypting with `activation_bytes`
    async fn strip_drm(
        &self,
        source: &Path,
        output: &Path,
        activation_bytes: &str,
    ) -> Result<(), TranscodeError>;

    /// Write the embedded cover art of `source` to `output`
    async fn extract_cover(
        &self,
        source: &Path,
        output: &Path,
        activation_bytes: &str,
    ) -> Result<(), TranscodeError>;

    /// Read container metadata
    async fn probe(&self, file: &Path) -> Result<MediaProbe, TranscodeError>;
}

/// [`Transcoder`] backed by the ffmpeg and ffprobe binaries
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl FfmpegTranscoder {
    /// Use `ffmpeg` and `ffprobe` from `PATH`
    pub fn new() -> Self {
        Self::with_binaries("ffmpeg", "ffprobe")
    }

    pub fn with_binaries(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    /// Check that ffprobe can be launched
    pub async fn ffprobe_available(&self) -> bool {
        Command::new(&self.ffprobe)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }

    async fn run(&self, program: &Path, args: Vec<OsString>) -> Result<Vec<u8>, TranscodeError> {
        let name = program.display().to_string();
        tracing::debug!(program = %name, ?args, "running");

        let output = Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| TranscodeError::SpawnFailed {
                program: name.clone(),
                source: e,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TranscodeError::ExitFailure {
                program: name,
                status: output.status.to_string(),
                stderr: stderr.lines().last().unwrap_or("").to_string(),
            });
        }

        Ok(output.stdout)
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

fn os_args(args: &[&str]) -> Vec<OsString> {
    args.iter().map(OsString::from).collect()
}

/// Arguments for a lossless remux that drops the DRM wrapper
pub fn strip_drm_args(source: &Path, output: &Path, activation_bytes: &str) -> Vec<OsString> {
    let mut args = os_args(&["-y", "-activation_bytes", activation_bytes, "-i"]);
    args.push(source.into());
    args.extend(os_args(&["-c", "copy"]));
    args.push(output.into());
    args
}

/// Arguments that render the first video frame (the cover) to an image
pub fn extract_cover_args(source: &Path, output: &Path, activation_bytes: &str) -> Vec<OsString> {
    let mut args = os_args(&["-y", "-activation_bytes", activation_bytes, "-i"]);
    args.push(source.into());
    args.extend(os_args(&[
        "-update",
        "1",
        "-frames:v",
        "1",
        "-an",
        "-vf",
        "scale=2000:-1",
    ]));
    args.push(output.into());
    args
}

/// Arguments for a JSON container probe
pub fn probe_args(file: &Path) -> Vec<OsString> {
    let mut args = os_args(&["-show_format", "-output_format", "json", "-i"]);
    args.push(file.into());
    args
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn strip_drm(
        &self,
        source: &Path,
        output: &Path,
        activation_bytes: &str,
    ) -> Result<(), TranscodeError> {
        self.run(&self.ffmpeg, strip_drm_args(source, output, activation_bytes))
            .await
            .map(|_| ())
    }

    async fn extract_cover(
        &self,
        source: &Path,
        output: &Path,
        activation_bytes: &str,
    ) -> Result<(), TranscodeError> {
        self.run(&self.ffmpeg, extract_cover_args(source, output, activation_bytes))
            .await
            .map(|_| ())
    }

    async fn probe(&self, file: &Path) -> Result<MediaProbe, TranscodeError> {
        let stdout = self.run(&self.ffprobe, probe_args(file)).await?;
        parse_probe_output(file, &stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROBE_JSON: &str = r#"{
        "format": {
            "filename": "/media/book.m4b",
            "nb_streams": 2,
            "format_name": "mov,mp4,m4a,3gp,3g2,mj2",
            "duration": "1234.567000",
            "size": "20480000",
            "bit_rate": "132712",
            "tags": {
                "major_brand": "M4B ",
                "title": "Mostly Harmless",
                "ARTIST": "Douglas Adams",
                "comment": "Book five",
                "creation_time": "2021-06-01T10:00:00.000000Z",
                "track": 1
            }
        }
    }"#;

    #[test]
    fn parses_probe_json() {
        let probe = parse_probe_output(Path::new("/media/book.m4b"), PROBE_JSON.as_bytes()).unwrap();

        assert_eq!(probe.duration_secs, Some(1234.567));
        assert_eq!(probe.size, Some(20_480_000));
        assert_eq!(probe.tag("title"), Some("Mostly Harmless"));
        assert_eq!(probe.tag("artist"), Some("Douglas Adams"));
        assert_eq!(probe.tag("track"), Some("1"));
        assert_eq!(probe.tag("missing"), None);
    }

    #[test]
    fn probe_without_tags() {
        let probe =
            parse_probe_output(Path::new("x.mp3"), br#"{"format": {"duration": "1.0"}}"#).unwrap();
        assert!(probe.tags.is_empty());
        assert_eq!(probe.size, None);
    }

    #[test]
    fn probe_garbage_is_an_error() {
        let result = parse_probe_output(Path::new("x.mp3"), b"Invalid data found");
        assert!(matches!(result, Err(TranscodeError::ProbeParseFailed { .. })));
    }

    #[test]
    fn strip_drm_passes_key_and_copies_streams() {
        let args = strip_drm_args(Path::new("in.aax"), Path::new("out.m4a"), "1a2b3c4d");
        let args: Vec<_> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();

        assert_eq!(
            args,
            vec![
                "-y",
                "-activation_bytes",
                "1a2b3c4d",
                "-i",
                "in.aax",
                "-c",
                "copy",
                "out.m4a"
            ]
        );
    }

    #[test]
    fn cover_args_end_with_output() {
        let args = extract_cover_args(Path::new("in.aax"), Path::new("out.png"), "deadbeef");
        assert_eq!(args.last().unwrap(), "out.png");
        assert!(args.iter().any(|a| a == "scale=2000:-1"));
    }

    #[tokio::test]
    async fn missing_binary_fails_to_spawn() {
        let transcoder = FfmpegTranscoder::with_binaries(
            "/nonexistent/ffmpeg-binary",
            "/nonexistent/ffprobe-binary",
        );

        assert!(!transcoder.ffprobe_available().await);
        let result = transcoder.probe(Path::new("whatever.mp3")).await;
        assert!(matches!(result, Err(TranscodeError::SpawnFailed { .. })));
    }
}
