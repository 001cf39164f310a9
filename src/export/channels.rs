//! Render channels (render elements).

use crate::bus::ExportBus;
use crate::error::Result;
use crate::nodes::export_params;
use crate::types::{plugin_name, AttrValue, PluginDesc, PluginKind};

pub const SETTINGS_RENDER_CHANNELS: &str = "settingsRenderChannels";

/// Export every enabled render channel and the channel settings.
pub fn export_render_channels(bus: &mut ExportBus<'_>) -> Result<Vec<String>> {
    let channels = bus.scene.render_channels();
    let mut names = Vec::new();

    for channel in channels.iter().filter(|c| c.enabled) {
        let mut desc = PluginDesc::new(
            channel.plugin.clone(),
            plugin_name(PluginKind::RenderChannel.name_prefix(), &channel.name, None),
            PluginKind::RenderChannel,
        )
        .with("name", AttrValue::Quoted(channel.name.clone()));
        export_params(bus, &channel.params, &mut desc)?;
        names.push(bus.write_plugin(&desc)?);
    }

    let settings = PluginDesc::new(
        "SettingsRenderChannels",
        SETTINGS_RENDER_CHANNELS,
        PluginKind::Settings,
    )
    .with("unfiltered_fragment_method", 4i64)
    .with("deep_merge_mode", 0i64);
    bus.write_plugin(&settings)?;

    log::debug!("{} render channels exported", names.len());
    Ok(names)
}
