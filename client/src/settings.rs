use bevy::prelude::*;
use std::path::PathBuf;

/// Venue scene loaded when nothing else is configured, relative to the asset folder.
pub const DEFAULT_VENUE: &str = "venue/mall.glb";

#[derive(Resource, Clone, Debug, PartialEq)]
pub struct VenueSettings {
    /// Scene asset path, relative to the asset folder.
    pub venue: String,
    /// Seed for tenant selection. `None` draws from OS entropy.
    pub seed: Option<u64>,
    /// JSON file with one `[row][column]` marker array per floor.
    pub floor_plan: Option<PathBuf>,
}

impl Default for VenueSettings {
    fn default() -> Self {
        Self {
            venue: DEFAULT_VENUE.to_string(),
            seed: None,
            floor_plan: None,
        }
    }
}

pub(super) fn plugin(app: &mut App) {
    let settings = read_settings_from_cli_env();
    info!(
        "Venue: {} (seed: {:?}, floor plan: {:?})",
        settings.venue, settings.seed, settings.floor_plan
    );
    app.insert_resource(settings);
}

fn read_settings_from_cli_env() -> VenueSettings {
    parse_settings(std::env::args().skip(1), |key| std::env::var(key).ok())
}

/// Reads settings from CLI arguments, falling back to the environment.
///
/// Supported:
///   --venue <path> | --venue=<path>              (VENUE_ASSET)
///   --seed <u64> | --seed=<u64>                  (VENUE_SEED)
///   --floor-plan <path> | --floor-plan=<path>    (VENUE_FLOOR_PLAN)
fn parse_settings(
    args: impl IntoIterator<Item = String>,
    env: impl Fn(&str) -> Option<String>,
) -> VenueSettings {
    let mut venue = None;
    let mut seed = None;
    let mut floor_plan = None;
    let mut pending_key: Option<&'static str> = None;

    for arg in args {
        let (key, value) = if let Some(key) = pending_key.take() {
            (key, arg)
        } else if let Some(key) = ["venue", "seed", "floor-plan"]
            .into_iter()
            .find(|k| arg.strip_prefix("--") == Some(*k))
        {
            pending_key = Some(key);
            continue;
        } else if let Some((flag, value)) = arg.split_once('=') {
            match flag {
                "--venue" => ("venue", value.to_string()),
                "--seed" => ("seed", value.to_string()),
                "--floor-plan" => ("floor-plan", value.to_string()),
                _ => continue,
            }
        } else {
            continue;
        };

        match key {
            "venue" => venue = Some(value),
            "seed" => seed = Some(value),
            _ => floor_plan = Some(value),
        }
    }

    let venue = venue.or_else(|| env("VENUE_ASSET"));
    let seed = seed.or_else(|| env("VENUE_SEED")).and_then(|raw| {
        raw.trim()
            .parse::<u64>()
            .inspect_err(|e| warn!("Ignoring seed {raw:?}: {e}"))
            .ok()
    });
    let floor_plan = floor_plan.or_else(|| env("VENUE_FLOOR_PLAN"));

    VenueSettings {
        venue: venue.unwrap_or_else(|| DEFAULT_VENUE.to_string()),
        seed,
        floor_plan: floor_plan.map(PathBuf::from),
    }
}
