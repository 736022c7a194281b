//! Catalog source files for aggregation and catalog tests.

use serde_json::{json, Value};
use std::path::Path;

pub fn kling_model() -> Value {
    json!({
        "slug": "kling-video",
        "name": "Kling Video",
        "provider": "kling",
        "description": "Cinematic text and image to video",
        "tags": ["cinematic", "image-to-video"],
        "api_config": {
            "endpoint": "https://queue.fal.run/fal-ai/kling-video/v1/standard/text-to-video",
            "supports_image": true
        },
        "parameters": [
            { "name": "duration", "type": "select", "options": ["5", "10"], "default": "5" },
            { "name": "aspect_ratio", "type": "select", "options": ["16:9", "9:16", "1:1"], "default": "16:9" },
            { "name": "cfg_scale", "type": "number", "min": 0, "max": 1, "step": 0.1, "default": 0.5 }
        ]
    })
}

pub fn ltx_model() -> Value {
    json!({
        "slug": "ltx-video",
        "name": "LTX Video",
        "provider": "lightricks",
        "tags": ["fast"],
        "api_config": {
            "endpoint": "https://queue.fal.run/fal-ai/ltx-video"
        },
        "parameters": [
            { "name": "num_inference_steps", "type": "number", "min": 1, "max": 50, "default": 30 },
            { "name": "enhance_prompt", "type": "boolean", "default": true },
            { "name": "negative_prompt", "type": "string" }
        ]
    })
}

pub fn custom_prompts() -> Vec<Value> {
    vec![
        json!({
            "id": "neon-rain",
            "title": "Neon Rain",
            "prompt": "Rain falling on neon-lit Tokyo streets at night, reflections on wet asphalt",
            "model": "kling-video",
            "category": "urban",
            "tags": ["night", "rain", "city"],
            "author": "mika",
            "created_at": "2025-03-02T10:00:00Z"
        }),
        json!({
            "id": "misty-pines",
            "title": "Misty Pines",
            "prompt": "Slow dolly through a pine forest with morning fog",
            "model": "ltx-video",
            "category": "nature",
            "tags": ["fog", "forest"],
            "created_at": "2025-04-10T08:30:00Z"
        }),
        json!({
            "id": "harbor-dusk",
            "title": "Harbor at Dusk",
            "prompt": "Fishing boats returning to a harbor at dusk, gulls overhead",
            "model": "kling-video",
            "category": "nature",
            "tags": ["sunset", "sea"],
            "created_at": "2025-01-20T18:00:00Z"
        }),
    ]
}

pub fn write_item(dir: &Path, name: &str, value: &Value) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join(name), serde_json::to_vec_pretty(value).unwrap()).unwrap();
}

/// Lay out per-item source files under `root/content`.
pub fn write_sources(root: &Path) {
    let models = root.join("content/models");
    write_item(&models, "kling-video.json", &kling_model());
    write_item(&models, "ltx-video.json", &ltx_model());

    let prompts = root.join("content/custom-prompts");
    for prompt in custom_prompts() {
        let name = format!("{}.json", prompt["id"].as_str().unwrap());
        write_item(&prompts, &name, &prompt);
    }
}
