//! The argument vocabulary of the media tool: every pipeline operation is a
//! single stream-copy invocation, no intermediate re-encoding.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::{MediaError, MediaRunner};

/// Spec for the final mux: stripped video + normalized subtitle + attached
/// font, stream-copied into one container.
#[derive(Debug, Clone)]
pub struct MuxSpec {
    pub video: PathBuf,
    pub subtitle: PathBuf,
    /// Absent when the configured font file is missing; the mux then skips
    /// the attachment rather than failing the session.
    pub font: Option<PathBuf>,
    pub track_title: String,
    pub output: PathBuf,
}

#[derive(Clone)]
pub struct MediaOps {
    runner: Arc<dyn MediaRunner>,
    timeout: Duration,
}

impl MediaOps {
    pub fn new(runner: Arc<dyn MediaRunner>, timeout: Duration) -> Self {
        Self { runner, timeout }
    }

    /// Convert a foreign subtitle format into the canonical one.
    pub async fn convert_subtitle(
        &self,
        input: &Path,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), MediaError> {
        self.run(convert_subtitle_args(input, output), cancel).await
    }

    /// Remux the video with all embedded subtitle streams dropped.
    pub async fn strip_subtitle_streams(
        &self,
        video: &Path,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), MediaError> {
        self.run(strip_args(video, output), cancel).await
    }

    /// The full mux graph, one invocation.
    pub async fn mux(&self, spec: &MuxSpec, cancel: &CancellationToken) -> Result<(), MediaError> {
        self.run(mux_args(spec), cancel).await
    }

    /// Capture a single frame at `timecode`.
    pub async fn capture_still(
        &self,
        video: &Path,
        output: &Path,
        timecode: &str,
        cancel: &CancellationToken,
    ) -> Result<(), MediaError> {
        self.run(still_args(video, output, timecode), cancel).await
    }

    /// Map the first subtitle stream out of the container.
    pub async fn extract_subtitle_stream(
        &self,
        video: &Path,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), MediaError> {
        self.run(extract_subtitle_args(video, output), cancel).await
    }

    async fn run(&self, args: Vec<String>, cancel: &CancellationToken) -> Result<(), MediaError> {
        let out = self.runner.run(&args, cancel, self.timeout).await?;
        if out.exit_code != 0 {
            return Err(MediaError::Failed {
                code: Some(out.exit_code),
                stderr_tail: out.stderr_tail,
            });
        }
        Ok(())
    }
}

fn arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn convert_subtitle_args(input: &Path, output: &Path) -> Vec<String> {
    vec!["-y".into(), "-i".into(), arg(input), arg(output)]
}

fn strip_args(video: &Path, output: &Path) -> Vec<String> {
    vec![
        "-y".into(),
        "-i".into(),
        arg(video),
        "-map".into(),
        "0:v".into(),
        "-map".into(),
        "0:a?".into(),
        "-c".into(),
        "copy".into(),
        arg(output),
    ]
}

fn mux_args(spec: &MuxSpec) -> Vec<String> {
    let mut args = vec![
        "-y".into(),
        "-i".into(),
        arg(&spec.video),
        "-i".into(),
        arg(&spec.subtitle),
    ];
    if let Some(font) = &spec.font {
        args.extend([
            "-attach".into(),
            arg(font),
            "-metadata:s:t:0".into(),
            "mimetype=application/x-font-otf".into(),
        ]);
    }
    args.extend([
        "-map".into(),
        "0".into(),
        "-map".into(),
        "1".into(),
        "-metadata:s:s:0".into(),
        format!("title={}", spec.track_title),
        "-metadata:s:s:0".into(),
        "language=eng".into(),
        "-disposition:s:s:0".into(),
        "default".into(),
        "-c".into(),
        "copy".into(),
        arg(&spec.output),
    ]);
    args
}

fn still_args(video: &Path, output: &Path, timecode: &str) -> Vec<String> {
    vec![
        "-y".into(),
        "-ss".into(),
        timecode.into(),
        "-i".into(),
        arg(video),
        "-frames:v".into(),
        "1".into(),
        "-q:v".into(),
        "2".into(),
        arg(output),
    ]
}

fn extract_subtitle_args(video: &Path, output: &Path) -> Vec<String> {
    vec![
        "-y".into(),
        "-i".into(),
        arg(video),
        "-map".into(),
        "0:s:0".into(),
        arg(output),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mux_graph_is_stream_copy_with_metadata() {
        let spec = MuxSpec {
            video: PathBuf::from("in.mkv"),
            subtitle: PathBuf::from("sub.ass"),
            font: Some(PathBuf::from("font.otf")),
            track_title: "submux".into(),
            output: PathBuf::from("out.mkv"),
        };
        let args = mux_args(&spec);
        let joined = args.join(" ");
        assert!(joined.contains("-attach font.otf"));
        assert!(joined.contains("mimetype=application/x-font-otf"));
        assert!(joined.contains("-metadata:s:s:0 title=submux"));
        assert!(joined.contains("-metadata:s:s:0 language=eng"));
        assert!(joined.contains("-disposition:s:s:0 default"));
        assert!(joined.ends_with("-c copy out.mkv"));
    }

    #[test]
    fn mux_without_font_skips_attachment() {
        let spec = MuxSpec {
            video: PathBuf::from("in.mkv"),
            subtitle: PathBuf::from("sub.ass"),
            font: None,
            track_title: "t".into(),
            output: PathBuf::from("out.mkv"),
        };
        let joined = mux_args(&spec).join(" ");
        assert!(!joined.contains("-attach"));
        assert!(joined.contains("-map 0 -map 1"));
    }

    #[test]
    fn strip_keeps_video_and_audio_only() {
        let joined = strip_args(Path::new("a.mp4"), Path::new("b.mkv")).join(" ");
        assert_eq!(joined, "-y -i a.mp4 -map 0:v -map 0:a? -c copy b.mkv");
    }

    #[test]
    fn still_capture_args() {
        let joined = still_args(Path::new("a.mkv"), Path::new("s.png"), "00:00:05").join(" ");
        assert_eq!(joined, "-y -ss 00:00:05 -i a.mkv -frames:v 1 -q:v 2 s.png");
    }
}
