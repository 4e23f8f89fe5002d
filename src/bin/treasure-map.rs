//! treasure-map: console client for the community treasure map.
//!
//! Wires the app core to a text frontend: markers and list cards render as
//! console output, map clicks are the `click` command, and the login link
//! round trip is completed by pasting the access token back in.

use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use treasure_map::cli::Args;
use treasure_map::config::BackendConfig;
use treasure_map::map::{LatLng, MapSurface, MarkerId};
use treasure_map::remote::feed::change_feed_task;
use treasure_map::remote::RestBackend;
use treasure_map::session::Session;
use treasure_map::sync::DeleteOutcome;
use treasure_map::view::{AuthUi, ConfirmPrompt, ListSurface, PinCard, PopupContent};
use treasure_map::{authoring, geocode, App, AppParts};

/// Map surface that narrates view changes instead of drawing them.
struct ConsoleMap {
    next_id: AtomicU64,
    markers: Mutex<HashMap<MarkerId, PopupContent>>,
}

impl ConsoleMap {
    fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            markers: Mutex::new(HashMap::new()),
        }
    }
}

impl MapSurface for ConsoleMap {
    fn set_view(&self, center: LatLng, zoom: u8) {
        println!("[map] view -> {center} (zoom {zoom})");
    }

    fn add_marker(&self, at: LatLng, popup: PopupContent) -> MarkerId {
        let id = MarkerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.markers.lock().unwrap().insert(id, popup);
        println!("[map] marker at {at}");
        id
    }

    fn remove_marker(&self, marker: MarkerId) {
        self.markers.lock().unwrap().remove(&marker);
    }

    fn open_popup(&self, marker: MarkerId) {
        if let Some(popup) = self.markers.lock().unwrap().get(&marker) {
            println!("[map] popup: {}", popup.title);
        }
    }
}

struct ConsoleList;

impl ListSurface for ConsoleList {
    fn clear(&self) {}

    fn push_card(&self, card: PinCard) {
        let delete = if card.deletable { "  [delete]" } else { "" };
        println!(
            "  #{} {} ({}, {}){}\n      {}",
            card.id, card.title, card.coords_label, card.date_label, delete, card.description
        );
    }

    fn show_message(&self, text: &str) {
        println!("  {text}");
    }
}

struct ConsolePrompt;

impl ConfirmPrompt for ConsolePrompt {
    fn confirm(&self, message: &str) -> bool {
        print!("{message} [y/N] ");
        let _ = std::io::stdout().flush();
        let mut answer = String::new();
        if std::io::stdin().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim(), "y" | "Y" | "yes")
    }
}

struct ConsoleAuthUi;

impl AuthUi for ConsoleAuthUi {
    fn session_changed(&self, session: Option<&Session>) {
        match session {
            Some(s) => println!("[auth] signed in as {}", s.email),
            None => println!("[auth] signed out"),
        }
    }
}

const HELP: &str = "\
commands:
  refresh                  refetch pins and redraw
  click <lat> <lng>        select a location (resolves the address)
  post <title> [| <desc>]  submit a pin at the selected location
  photo <path>             attach a photo to the next post
  focus <id>               center the map on a pin
  delete <id>              delete one of your pins
  login <email>            request a magic login link
  token <access-token>     resume the session from a clicked link
  logout                   end the session
  locate <lat> <lng>       center the view on your position
  quit";

fn parse_lat_lng(rest: &str) -> Option<LatLng> {
    let mut parts = rest.split_whitespace();
    let lat = parts.next()?.parse().ok()?;
    let lng = parts.next()?.parse().ok()?;
    Some(LatLng { lat, lng })
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "treasure_map=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = match BackendConfig::load(&args.config).or_else(|_| BackendConfig::from_env())
    {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };
    if let Some(url) = args.backend_url {
        config.url = url.trim_end_matches('/').to_string();
    }
    if let Some(key) = args.anon_key {
        config.anon_key = key;
    }

    let backend = Arc::new(RestBackend::new(config.clone()));
    let resolver = Arc::new(geocode::NominatimResolver::new(backend.http()));
    let map = Arc::new(ConsoleMap::new());

    let app = App::new(AppParts {
        pins: backend.clone(),
        photos: backend.clone(),
        identity: backend.clone(),
        resolver,
        map: map.clone(),
        list: Arc::new(ConsoleList),
        confirm: Arc::new(ConsolePrompt),
        auth_ui: Arc::new(ConsoleAuthUi),
        redirect_to: config.redirect_to.clone(),
    });

    tokio::spawn(change_feed_task(
        backend.http(),
        config.changes_url(),
        app.changes.clone(),
    ));
    app.spawn_change_pump();

    if let Some(token) = &args.access_token {
        if let Err(e) = backend.resume_session(token).await {
            eprintln!("{e}");
        }
    }

    map.set_view(
        LatLng {
            lat: args.lat,
            lng: args.lng,
        },
        args.zoom,
    );
    app.start().await;
    println!("type 'help' for commands");

    let mut pending_photo: Option<authoring::PhotoAttachment> = None;
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };
        let line = line.trim();
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));

        match command {
            "" => {}
            "help" => println!("{HELP}"),
            "refresh" => {
                if let Err(e) = app.sync.reconcile().await {
                    eprintln!("{e}");
                }
            }
            "click" => match parse_lat_lng(rest) {
                Some(at) => {
                    let outcome = app.interaction.handle_click(at).await;
                    if outcome.needs_sign_in {
                        println!("sign in to pin something here (login <email>)");
                    }
                    println!("selected: {}", outcome.address);
                }
                None => eprintln!("usage: click <lat> <lng>"),
            },
            "post" => {
                let (title, description) = match rest.split_once('|') {
                    Some((t, d)) => (t.trim(), d.trim()),
                    None => (rest.trim(), ""),
                };
                let draft = authoring::PinDraft {
                    title: title.to_string(),
                    description: description.to_string(),
                    photo: pending_photo.take(),
                };
                match app.authoring.submit(draft).await {
                    Ok(pin) => println!("pinned #{}", pin.id),
                    Err(e) => eprintln!("{e}"),
                }
            }
            "photo" => match std::fs::read(rest) {
                Ok(bytes) => {
                    let content_type = if rest.ends_with(".png") {
                        "image/png"
                    } else {
                        "image/jpeg"
                    };
                    pending_photo = Some(authoring::PhotoAttachment {
                        file_name: rest.to_string(),
                        content_type: content_type.to_string(),
                        bytes,
                    });
                    println!("photo attached");
                }
                Err(e) => eprintln!("cannot read {rest}: {e}"),
            },
            "focus" => match rest.parse() {
                Ok(id) => app.sync.focus_on(id).await,
                Err(_) => eprintln!("usage: focus <id>"),
            },
            "delete" => match rest.parse() {
                Ok(id) => match app.sync.delete_pin(id).await {
                    Ok(DeleteOutcome::Deleted) => println!("Treasure deleted successfully."),
                    Ok(DeleteOutcome::Cancelled) => {}
                    Err(e) => eprintln!("Failed to delete pin: {e}"),
                },
                Err(_) => eprintln!("usage: delete <id>"),
            },
            "login" => match app.session.sign_in(rest).await {
                Ok(outcome) => println!("{}", outcome.message()),
                Err(e) => eprintln!("{e}"),
            },
            "token" => match backend.resume_session(rest.trim()).await {
                Ok(session) => println!("welcome back, {}", session.email),
                Err(e) => eprintln!("{e}"),
            },
            "logout" => {
                if let Err(e) = app.session.sign_out().await {
                    eprintln!("{e}");
                }
            }
            "locate" => match parse_lat_lng(rest) {
                Some(at) => app.interaction.locate(at),
                None => eprintln!("usage: locate <lat> <lng>"),
            },
            "quit" | "exit" => break,
            other => eprintln!("unknown command: {other} (try 'help')"),
        }
    }
}
