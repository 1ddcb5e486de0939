//! Entity listing: what a registry would hold after this poll.

use tabled::Tabled;
use veeamly_core::{Controller, EntityView, Platform};

use crate::cli::{EntitiesArgs, GlobalOpts, PlatformFilter};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct EntityRow {
    #[tabled(rename = "Entity")]
    entity_id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Available")]
    available: String,
}

impl From<&EntityView> for EntityRow {
    fn from(e: &EntityView) -> Self {
        Self {
            entity_id: e.entity_id.clone(),
            name: e.name.clone(),
            device: e.device_name.clone(),
            state: e.state.to_string(),
            available: output::flag(Some(e.available)),
        }
    }
}

fn platform(filter: PlatformFilter) -> Platform {
    match filter {
        PlatformFilter::Sensor => Platform::Sensor,
        PlatformFilter::BinarySensor => Platform::BinarySensor,
        PlatformFilter::Button => Platform::Button,
    }
}

pub async fn handle(
    controller: &Controller,
    args: EntitiesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let wanted = args.platform.map(platform);
    let entities: Vec<EntityView> = controller
        .entities()
        .await?
        .into_iter()
        .filter(|e| wanted.is_none_or(|p| e.platform == p))
        .filter(|e| {
            args.device
                .as_deref()
                .is_none_or(|d| e.device_id.contains(d))
        })
        .collect();

    let out = output::render_list(&global.output, &entities, |e| EntityRow::from(e), |e| {
        e.unique_id.clone()
    });
    output::print_output(&out, global.quiet);
    Ok(())
}
