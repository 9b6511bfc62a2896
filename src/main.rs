//! Command-line surface for the transit router.

mod server;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rayon::prelude::*;

use headway_core::prelude::*;

#[derive(Parser)]
#[command(name = "headway", about = "Schedule-based public transit routing over GTFS feeds")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(long, global = true, default_value = "config.json")]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Route between two coordinates.
    OneToOne {
        lat1: f64,
        lng1: f64,
        /// Departure time, HH:MM:SS.
        depart: String,
        lat2: f64,
        lng2: f64,
    },
    /// Travel times from a coordinate to every location in a CSV.
    OneToMany {
        lat: f64,
        lng: f64,
        depart: String,
        locations: PathBuf,
    },
    /// Route between two stops of the loaded feed.
    StopToStop {
        origin_stop_id: String,
        depart: String,
        dest_stop_id: String,
    },
    /// Emit origin,destination,seconds rows over all location pairs.
    AllPairs { locations: PathBuf, depart: String },
    /// Route between two named locations from a CSV.
    OneToOneLocation {
        locations: PathBuf,
        origin_id: String,
        depart: String,
        dest_id: String,
    },
    /// Serve the HTTP API.
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080")]
        listen: String,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Error> {
    let config = LoadConfig::from_file(&cli.config)?;
    let router = create_router(&config)?;

    match cli.command {
        Command::OneToOne {
            lat1,
            lng1,
            depart,
            lat2,
            lng2,
        } => {
            let dep_secs = parse_clock_time(&depart)?;
            let origin = Location::new("origin", lat1, lng1);
            let destination = Location::new("destination", lat2, lng2);
            let route = router.one_to_one(&origin, dep_secs, &destination, &Default::default())?;
            print_route(route.as_ref());
        }
        Command::OneToMany {
            lat,
            lng,
            depart,
            locations,
        } => {
            let dep_secs = parse_clock_time(&depart)?;
            let origin = Location::new("origin", lat, lng);
            let destinations = read_locations(&locations)?;
            let times = router.one_to_many(&origin, dep_secs, &destinations, &Default::default())?;
            // Report in the input's order.
            for destination in &destinations {
                match times.get(&destination.id) {
                    Some(secs) if secs.is_finite() => {
                        println!("{},{}", destination.id, secs.round() as u64)
                    }
                    _ => println!("{},unreachable", destination.id),
                }
            }
        }
        Command::StopToStop {
            origin_stop_id,
            depart,
            dest_stop_id,
        } => {
            let dep_secs = parse_clock_time(&depart)?;
            let route =
                router.stop_to_stop(&origin_stop_id, dep_secs, &dest_stop_id, &Default::default());
            print_route(route.as_ref());
        }
        Command::AllPairs { locations, depart } => {
            let dep_secs = parse_clock_time(&depart)?;
            let locations = read_locations(&locations)?;
            let rows = all_pairs(&router, &locations, dep_secs)?;
            println!("origin,destination,seconds");
            for (origin, destination, secs) in rows {
                println!("{origin},{destination},{secs}");
            }
        }
        Command::OneToOneLocation {
            locations,
            origin_id,
            depart,
            dest_id,
        } => {
            let dep_secs = parse_clock_time(&depart)?;
            let locations = read_locations(&locations)?;
            let origin = find_location(&locations, &origin_id)?;
            let destination = find_location(&locations, &dest_id)?;
            let route = router.one_to_one(origin, dep_secs, destination, &Default::default())?;
            print_route(route.as_ref());
        }
        Command::Serve { listen } => {
            server::serve(router, &listen)?;
        }
    }
    Ok(())
}

fn find_location<'a>(locations: &'a [Location], id: &str) -> Result<&'a Location, Error> {
    locations
        .iter()
        .find(|location| location.id == id)
        .ok_or_else(|| Error::InvalidConfig(format!("no location '{id}' in the locations file")))
}

/// Routes every ordered pair of locations, in parallel over origins.
/// Identity pairs and unreachable pairs are omitted.
fn all_pairs(
    router: &OnlineRouter,
    locations: &[Location],
    dep_secs: Secs,
) -> Result<Vec<(String, String, u64)>, Error> {
    let per_origin: Vec<Result<Vec<(String, String, u64)>, Error>> = locations
        .par_iter()
        .map(|origin| {
            let destinations: Vec<Location> = locations
                .iter()
                .filter(|l| l.id != origin.id)
                .cloned()
                .collect();
            let times = router.one_to_many(origin, dep_secs, &destinations, &Default::default())?;
            let mut rows: Vec<(String, String, u64)> = destinations
                .iter()
                .filter_map(|destination| {
                    let secs = *times.get(&destination.id)?;
                    secs.is_finite().then(|| {
                        (
                            origin.id.clone(),
                            destination.id.clone(),
                            secs.round() as u64,
                        )
                    })
                })
                .collect();
            rows.sort();
            Ok(rows)
        })
        .collect();

    let mut all = Vec::new();
    for rows in per_origin {
        all.extend(rows?);
    }
    all.sort();
    Ok(all)
}

fn format_clock(secs: f64) -> String {
    let total = secs.round() as u64;
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

fn print_route(route: Option<&Route>) {
    let Some(route) = route else {
        println!("no route found");
        return;
    };
    println!(
        "depart {} arrive {} ({} travel, {:.2} km walked)",
        format_clock(route.departure_secs),
        format_clock(route.arrive_time_secs),
        format_duration(route.travel_time_secs),
        route.walking_distance_km,
    );
    for step in &route.steps {
        println!(
            "  {} - {}  {}",
            format_clock(step.depart_secs),
            format_clock(step.arrive_secs),
            step.description
        );
    }
}

fn format_duration(secs: f64) -> String {
    let total = secs.round() as u64;
    if total >= 3600 {
        format!("{}h{:02}m", total / 3600, (total % 3600) / 60)
    } else {
        format!("{}m{:02}s", total / 60, total % 60)
    }
}
