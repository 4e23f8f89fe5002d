use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for the console client.
#[derive(Parser, Debug)]
#[clap(name = "treasure-map")]
#[clap(about = "Console client for the community treasure map", long_about = None)]
pub struct Args {
    /// Path to the backend config file
    #[clap(short, long, value_name = "FILE", default_value = "treasure-map.json")]
    pub config: PathBuf,

    /// Override the backend base URL
    #[clap(long, value_name = "URL")]
    pub backend_url: Option<String>,

    /// Override the backend anon key
    #[clap(long, value_name = "KEY")]
    pub anon_key: Option<String>,

    /// Resume a session from an access token (from a clicked login link)
    #[clap(long, value_name = "TOKEN")]
    pub access_token: Option<String>,

    /// Initial map center latitude
    #[clap(long, default_value_t = crate::map::DEFAULT_CENTER.lat)]
    pub lat: f64,

    /// Initial map center longitude
    #[clap(long, default_value_t = crate::map::DEFAULT_CENTER.lng)]
    pub lng: f64,

    /// Initial zoom level
    #[clap(long, default_value_t = crate::map::DEFAULT_ZOOM)]
    pub zoom: u8,
}
