use serde::{Deserialize, Serialize};

/// First video stream of a file, as reported by ffprobe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoSummary {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub codec: Option<String>,
    pub fps: Option<f32>,
}

impl std::fmt::Display for VideoSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let dim = |v: Option<u32>| v.map(|n| n.to_string()).unwrap_or_else(|| "?".into());
        write!(
            f,
            "{}x{} codec={} fps={}",
            dim(self.width),
            dim(self.height),
            self.codec.as_deref().unwrap_or("?"),
            self.fps
                .map(|fps| format!("{:.2}", fps))
                .unwrap_or_else(|| "?".into())
        )
    }
}
