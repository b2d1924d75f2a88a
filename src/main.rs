//! # Tide Sampler Entry Point
//!
//! Fetches one day of tide extrema for a location, interpolates the curve at
//! the current instant and prints an ASCII chart.
//!
//! ```text
//! tide-sampler [--config PATH] [--offline] [--lat X --lon Y] [--width W --height H]
//! ```
//!
//! Without an API key in the configuration (or with `--offline`) the harmonic
//! fallback model is used. Network failures also fall back to it.

#[cfg(test)]
mod tests;

use anyhow::{anyhow, Context};
use chrono::Utc;
use std::env;
use std::sync::Arc;
use tide_sampler_lib::config::{Config, CONFIG_FILE};
use tide_sampler_lib::extremum_store::{
    ExtremumStore, HttpExtremumStore, OfflineStore, WithFallback,
};
use tide_sampler_lib::interpolation::compute_series_in;
use tide_sampler_lib::query::{Query, QueryController};
use tide_sampler_lib::renderer::draw_ascii;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command line overrides on top of the config file.
#[derive(Debug, Default, PartialEq)]
struct Args {
    config: Option<String>,
    offline: bool,
    lat: Option<f64>,
    lon: Option<f64>,
    width: Option<u32>,
    height: Option<u32>,
}

fn parse_args<I: Iterator<Item = String>>(mut args: I) -> anyhow::Result<Args> {
    fn value<T: std::str::FromStr>(
        flag: &str,
        args: &mut impl Iterator<Item = String>,
    ) -> anyhow::Result<T> {
        let raw = args.next().ok_or_else(|| anyhow!("{flag} needs a value"))?;
        raw.parse()
            .map_err(|_| anyhow!("invalid value for {flag}: {raw}"))
    }

    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => parsed.config = Some(value("--config", &mut args)?),
            "--offline" => parsed.offline = true,
            "--lat" => parsed.lat = Some(value("--lat", &mut args)?),
            "--lon" => parsed.lon = Some(value("--lon", &mut args)?),
            "--width" => parsed.width = Some(value("--width", &mut args)?),
            "--height" => parsed.height = Some(value("--height", &mut args)?),
            other => return Err(anyhow!("unknown argument: {other}")),
        }
    }
    Ok(parsed)
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

/// Fetch, interpolate and print for one query.
async fn run<S>(store: Arc<S>, config: &Config, query: &Query) -> anyhow::Result<()>
where
    S: ExtremumStore + 'static,
{
    let mut controller = QueryController::new(store);
    if let Some(timeout) = config.fetch_timeout() {
        controller = controller.with_timeout(timeout);
    }

    controller.observe(Some(query));
    controller.settle().await;
    let state = controller.snapshot();

    let (width, height) = (config.display.width, config.display.height);
    let extrema = state.data.as_deref().map(|s| s.extrema()).unwrap_or_default();
    let result = compute_series_in(extrema, Utc::now(), width, height, config.display.units);

    let title = format!(
        "{} ({:.4}, {:.4}) {}",
        config.location.name,
        query.lat,
        query.lon,
        query.options.day()
    );
    draw_ascii(&title, &state, &result, width, height);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = parse_args(env::args().skip(1))?;
    let mut config = Config::load_from_path(args.config.as_deref().unwrap_or(CONFIG_FILE));
    if let Some(lat) = args.lat {
        config.location.latitude = lat;
    }
    if let Some(lon) = args.lon {
        config.location.longitude = lon;
    }
    if let Some(width) = args.width {
        config.display.width = width;
    }
    if let Some(height) = args.height {
        config.display.height = height;
    }

    let query = config.query();
    if !query.has_valid_location() {
        return Err(anyhow!(
            "invalid location: lat {}, lon {}",
            query.lat,
            query.lon
        ));
    }

    let rt = tokio::runtime::Runtime::new().context("starting tokio runtime")?;

    match (&config.source.api_key, args.offline) {
        (Some(key), false) => {
            let http = HttpExtremumStore::new(&config.source.api_url, Some(key.clone()))
                .with_cache(config.cache());
            let store = Arc::new(WithFallback::new(http, OfflineStore));
            rt.block_on(run(store, &config, &query))
        }
        _ => {
            info!("using offline tide model");
            rt.block_on(run(Arc::new(OfflineStore), &config, &query))
        }
    }
}
