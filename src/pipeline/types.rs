use std::fmt;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

/// Logical stages of the content pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Scrape,
    ValidateProducts,
    GenerateScripts,
    SynthesizeVoice,
    GenerateImages,
    RenderVideo,
    Publish,
    Finalize,
}

impl StageKind {
    pub const ALL: [StageKind; 8] = [
        StageKind::Scrape,
        StageKind::ValidateProducts,
        StageKind::GenerateScripts,
        StageKind::SynthesizeVoice,
        StageKind::GenerateImages,
        StageKind::RenderVideo,
        StageKind::Publish,
        StageKind::Finalize,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StageKind::Scrape => "scrape",
            StageKind::ValidateProducts => "validate_products",
            StageKind::GenerateScripts => "generate_scripts",
            StageKind::SynthesizeVoice => "synthesize_voice",
            StageKind::GenerateImages => "generate_images",
            StageKind::RenderVideo => "render_video",
            StageKind::Publish => "publish",
            StageKind::Finalize => "finalize",
        }
    }

    /// The stage whose output this stage consumes.
    pub fn prerequisite(self) -> Option<StageKind> {
        let position = Self::ALL.iter().position(|kind| *kind == self)?;
        position.checked_sub(1).map(|previous| Self::ALL[previous])
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StageKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_").to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| anyhow!("Unknown stage '{s}'"))
    }
}
