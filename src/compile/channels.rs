use crate::channels::{BakePass, ChannelId, SortTier};
use crate::config::{ChannelSetting, CustomChannel, Job};
use crate::foundation::core::ColorSpace;
use crate::scene::ColorMode;

#[derive(Clone, Debug, PartialEq)]
pub enum ChannelKind {
    Standard(ChannelSetting),
    Custom(CustomChannel),
}

/// One channel resolved for execution inside a step.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelConfig {
    /// Result key: the channel id, or the custom channel's name.
    pub key: String,
    pub name: String,
    pub prefix: String,
    pub suffix: String,
    pub bake_pass: BakePass,
    pub kind: ChannelKind,
}

impl ChannelConfig {
    pub fn standard(setting: &ChannelSetting) -> Self {
        Self {
            key: setting.id.as_str().to_string(),
            name: setting.name.clone(),
            prefix: setting.prefix.clone(),
            suffix: setting.suffix.clone(),
            bake_pass: setting.id.bake_pass(),
            kind: ChannelKind::Standard(setting.clone()),
        }
    }

    pub fn custom(channel: &CustomChannel) -> Self {
        Self {
            key: channel.name.clone(),
            name: channel.name.clone(),
            prefix: channel.prefix.clone(),
            suffix: channel.suffix.clone(),
            bake_pass: BakePass::Emit,
            kind: ChannelKind::Custom(channel.clone()),
        }
    }

    pub fn id(&self) -> Option<ChannelId> {
        match &self.kind {
            ChannelKind::Standard(s) => Some(s.id),
            ChannelKind::Custom(_) => None,
        }
    }

    pub fn setting(&self) -> Option<&ChannelSetting> {
        match &self.kind {
            ChannelKind::Standard(s) => Some(s),
            ChannelKind::Custom(_) => None,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self.kind, ChannelKind::Custom(_))
    }

    pub fn sort_tier(&self) -> SortTier {
        match &self.kind {
            ChannelKind::Standard(s) => s.id.sort_tier(),
            ChannelKind::Custom(_) => SortTier::Derived,
        }
    }

    pub fn color_space(&self) -> ColorSpace {
        match &self.kind {
            ChannelKind::Standard(s) => s.color_space(),
            ChannelKind::Custom(c) => c.color_space,
        }
    }

    pub fn color_mode(&self) -> ColorMode {
        match &self.kind {
            ChannelKind::Standard(s) => s.color_mode(),
            ChannelKind::Custom(c) if c.bw => ColorMode::Bw,
            ChannelKind::Custom(_) => ColorMode::Rgba,
        }
    }
}

/// Enabled channels of `job` in execution order: ID maps, then regular
/// channels, then conversions and custom compositions. The sort is stable so
/// configuration order holds within a tier.
pub fn collect_channels(job: &Job) -> Vec<ChannelConfig> {
    let setting = &job.setting;
    let mut channels: Vec<ChannelConfig> = setting
        .channels
        .iter()
        .filter(|c| c.enabled && c.valid_for_mode)
        .map(ChannelConfig::standard)
        .collect();

    if setting.use_custom_map {
        channels.extend(
            job.custom_channels
                .iter()
                .filter(|c| c.enabled)
                .map(ChannelConfig::custom),
        );
    }

    channels.sort_by_key(ChannelConfig::sort_tier);
    channels
}

#[cfg(test)]
#[path = "../../tests/unit/compile/channels.rs"]
mod tests;
