//! Completion predicates: pure checks over a record's fields that say whether
//! a stage's output is already present.

use serde_json::Value;

use crate::pipeline::{Fields, StageKind, is_populated};

pub type CompletionPredicate = fn(&Fields) -> bool;

pub fn for_kind(kind: StageKind) -> CompletionPredicate {
    match kind {
        StageKind::Scrape => has_scraped_products,
        StageKind::ValidateProducts => has_validated_products,
        StageKind::GenerateScripts => has_all_scripts,
        StageKind::SynthesizeVoice => has_intro_and_outro_audio,
        StageKind::GenerateImages => has_images,
        StageKind::RenderVideo => has_video_url,
        StageKind::Publish => has_published,
        StageKind::Finalize => has_finalized,
    }
}

pub fn has_scraped_products(fields: &Fields) -> bool {
    non_empty_array(fields.get("products"))
}

pub fn has_validated_products(fields: &Fields) -> bool {
    non_empty_array(fields.get("validated_products"))
}

pub fn has_all_scripts(fields: &Fields) -> bool {
    let Some(Value::Object(scripts)) = fields.get("scripts") else {
        return false;
    };
    non_empty_string(scripts.get("intro"))
        && non_empty_string(scripts.get("outro"))
        && non_empty_array(scripts.get("products"))
}

pub fn has_intro_and_outro_audio(fields: &Fields) -> bool {
    let Some(Value::Object(audio)) = fields.get("audio") else {
        return false;
    };
    is_populated(audio.get("intro")) && is_populated(audio.get("outro"))
}

pub fn has_images(fields: &Fields) -> bool {
    non_empty_array(fields.get("images"))
}

pub fn has_video_url(fields: &Fields) -> bool {
    non_empty_string(fields.get("video_url"))
}

pub fn has_published(fields: &Fields) -> bool {
    matches!(fields.get("published"), Some(Value::Object(platforms)) if !platforms.is_empty())
}

pub fn has_finalized(fields: &Fields) -> bool {
    non_empty_string(fields.get("finalized_at"))
}

fn non_empty_array(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::Array(items)) if !items.is_empty())
}

fn non_empty_string(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::String(text)) if !text.trim().is_empty())
}
