//! 粒子与声音定义
//!
//! 只解析模型构建需要的字段，其余字段忽略。

use std::collections::BTreeMap;

use serde::Deserialize;

/// `particles/*.json`
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ParticlesFile {
    pub particle_effect: ParticleEffectData,
}

impl ParticlesFile {
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn identifier(&self) -> &str {
        &self.particle_effect.description.identifier
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ParticleEffectData {
    pub description: ParticleDescription,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ParticleDescription {
    pub identifier: String,
    #[serde(default)]
    pub basic_render_parameters: Option<BasicRenderParameters>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct BasicRenderParameters {
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub texture: Option<String>,
}

/// 已注册的粒子效果
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParticleEffect {
    /// 定义所在文件
    pub file: String,
    pub identifier: String,
    pub material: Option<String>,
}

/// `sounds/sound_definitions.json`
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct SoundDefinitionsFile {
    #[serde(default, rename = "sound_definitions")]
    pub definitions: BTreeMap<String, SoundDefinition>,
}

impl SoundDefinitionsFile {
    pub const PATH: &'static str = "sounds/sound_definitions.json";

    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SoundDefinition {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub min_distance: Option<f32>,
    #[serde(default)]
    pub max_distance: Option<f32>,
    #[serde(default)]
    pub sounds: Vec<SoundEntryData>,
}

/// 声音条目：文件名，或带参数的对象
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SoundEntryData {
    Name(String),
    Detailed(SoundEntry),
}

impl SoundEntryData {
    pub fn into_entry(self) -> SoundEntry {
        match self {
            SoundEntryData::Name(name) => SoundEntry::new(name),
            SoundEntryData::Detailed(entry) => entry,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SoundEntry {
    /// 不含扩展名的文件路径
    pub name: String,
    #[serde(default)]
    pub stream: bool,
    #[serde(default = "one")]
    pub volume: f32,
    #[serde(default = "one")]
    pub pitch: f32,
    #[serde(default = "one_u32")]
    pub weight: u32,
}

fn one() -> f32 {
    1.0
}

fn one_u32() -> u32 {
    1
}

impl SoundEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stream: false,
            volume: 1.0,
            pitch: 1.0,
            weight: 1,
        }
    }

    /// 资源包中的文件路径
    pub fn asset_path(&self) -> String {
        format!("{}.ogg", self.name)
    }
}

/// 已注册的声音效果（只含存在的文件）
#[derive(Clone, Debug, PartialEq)]
pub struct SoundEffect {
    pub identifier: String,
    pub category: Option<String>,
    pub entries: Vec<SoundEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sound_definitions() {
        let file = SoundDefinitionsFile::from_json(
            r#"{ "format_version": "1.14.0", "sound_definitions": {
                "cosmetic.flap": { "category": "player", "sounds": [ "sounds/flap", { "name": "sounds/flap2", "volume": 0.5 } ] }
            } }"#,
        )
        .unwrap();
        let sounds: Vec<_> = file.definitions["cosmetic.flap"]
            .sounds
            .iter()
            .cloned()
            .map(SoundEntryData::into_entry)
            .collect();
        assert_eq!(sounds[0].asset_path(), "sounds/flap.ogg");
        assert_eq!(sounds[0].volume, 1.0);
        assert_eq!(sounds[1].volume, 0.5);
    }

    #[test]
    fn test_parse_particle_identifier() {
        let file = ParticlesFile::from_json(
            r#"{ "format_version": "1.10.0", "particle_effect": {
                "description": { "identifier": "cosmetic:spark",
                                 "basic_render_parameters": { "material": "particles_alpha", "texture": "textures/spark" } },
                "components": {}
            } }"#,
        )
        .unwrap();
        assert_eq!(file.identifier(), "cosmetic:spark");
    }
}
