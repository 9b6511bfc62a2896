//! Shared fixture: the canonical GTFS sample feed (Demo Transit Authority),
//! built programmatically.

use chrono::NaiveDate;
use headway_core::loading::{index_feed, OptionCeilings, QueryOptionsOverride};
use headway_core::model::{
    Calendar, CalendarDate, ExceptionType, Feed, Route, RouteType, Stop, StopTime, Trip,
};
use headway_core::routing::OnlineRouter;
use headway_core::water::WaterFilter;
use headway_core::Secs;

pub fn hms(h: u32, m: u32, s: u32) -> Secs {
    h * 3600 + m * 60 + s
}

fn stop(id: &str, name: &str, lat: f64, lng: f64) -> Stop {
    Stop {
        stop_id: id.to_string(),
        stop_name: name.to_string(),
        stop_desc: None,
        lat,
        lng,
        parent_station: None,
        feed_name: Some("sample".to_string()),
    }
}

fn trip(id: &str, route: &str, service: &str, direction: u8) -> Trip {
    Trip {
        trip_id: id.to_string(),
        route_id: route.to_string(),
        service_id: service.to_string(),
        direction_id: direction,
        shape_id: None,
        headsign: None,
        short_name: None,
        block_id: None,
    }
}

fn route(id: &str, route_type: RouteType) -> Route {
    Route {
        route_id: id.to_string(),
        route_type,
        short_name: Some(id.to_string()),
        long_name: None,
        color: None,
        text_color: None,
    }
}

fn call(trip: &str, stop: &str, seq: u32, arrival: Secs, departure: Secs) -> StopTime {
    StopTime {
        trip_id: trip.to_string(),
        stop_id: stop.to_string(),
        stop_sequence: seq,
        arrival_secs: arrival,
        departure_secs: departure,
    }
}

pub fn sample_feed() -> Feed {
    let window = (
        NaiveDate::from_ymd_opt(2007, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2010, 12, 31).unwrap(),
    );
    Feed {
        stops: vec![
            stop(
                "FUR_CREEK_RES",
                "Furnace Creek Resort (Demo)",
                36.425288,
                -117.133162,
            ),
            stop(
                "BEATTY_AIRPORT",
                "Nye County Airport (Demo)",
                36.868446,
                -116.784582,
            ),
            stop("BULLFROG", "Bullfrog (Demo)", 36.88108, -116.81797),
            stop(
                "STAGECOACH",
                "Stagecoach Hotel & Casino (Demo)",
                36.915682,
                -116.751677,
            ),
            stop("NADAV", "North Ave / D Ave N (Demo)", 36.914893, -116.76821),
            stop(
                "NANAA",
                "North Ave / N A Ave (Demo)",
                36.914944,
                -116.761472,
            ),
            stop(
                "DADAN",
                "Doing Ave / D Ave N (Demo)",
                36.909489,
                -116.768242,
            ),
            stop(
                "EMSI",
                "E Main St / S Irving St (Demo)",
                36.905697,
                -116.76218,
            ),
            stop("AMV", "Amargosa Valley (Demo)", 36.641496, -116.40094),
        ],
        routes: vec![
            route("AB", RouteType::Bus),
            route("BFC", RouteType::Bus),
            route("STBA", RouteType::Bus),
            route("CITY", RouteType::Bus),
            route("AAMV", RouteType::Bus),
        ],
        trips: vec![
            trip("AB1", "AB", "FULLW", 0),
            trip("AB2", "AB", "FULLW", 1),
            trip("STBA", "STBA", "FULLW", 0),
            trip("CITY1", "CITY", "FULLW", 0),
            trip("CITY2", "CITY", "FULLW", 1),
            trip("BFC1", "BFC", "FULLW", 0),
            trip("BFC2", "BFC", "FULLW", 1),
            trip("AAMV1", "AAMV", "WE", 0),
            trip("AAMV2", "AAMV", "WE", 1),
            trip("AAMV3", "AAMV", "WE", 0),
            trip("AAMV4", "AAMV", "WE", 1),
        ],
        stop_times: vec![
            call("STBA", "STAGECOACH", 1, hms(6, 0, 0), hms(6, 0, 0)),
            call("STBA", "BEATTY_AIRPORT", 2, hms(6, 20, 0), hms(6, 20, 0)),
            call("CITY1", "STAGECOACH", 1, hms(6, 0, 0), hms(6, 0, 0)),
            call("CITY1", "NANAA", 2, hms(6, 5, 0), hms(6, 7, 0)),
            call("CITY1", "NADAV", 3, hms(6, 12, 0), hms(6, 14, 0)),
            call("CITY1", "DADAN", 4, hms(6, 19, 0), hms(6, 21, 0)),
            call("CITY1", "EMSI", 5, hms(6, 26, 0), hms(6, 28, 0)),
            call("CITY2", "EMSI", 1, hms(6, 28, 0), hms(6, 30, 0)),
            call("CITY2", "DADAN", 2, hms(6, 35, 0), hms(6, 37, 0)),
            call("CITY2", "NADAV", 3, hms(6, 42, 0), hms(6, 44, 0)),
            call("CITY2", "NANAA", 4, hms(6, 49, 0), hms(6, 51, 0)),
            call("CITY2", "STAGECOACH", 5, hms(6, 56, 0), hms(6, 58, 0)),
            call("AB1", "BEATTY_AIRPORT", 1, hms(8, 0, 0), hms(8, 0, 0)),
            call("AB1", "BULLFROG", 2, hms(8, 10, 0), hms(8, 15, 0)),
            call("AB2", "BULLFROG", 1, hms(12, 5, 0), hms(12, 5, 0)),
            call("AB2", "BEATTY_AIRPORT", 2, hms(12, 15, 0), hms(12, 15, 0)),
            call("BFC1", "BULLFROG", 1, hms(8, 20, 0), hms(8, 20, 0)),
            call("BFC1", "FUR_CREEK_RES", 2, hms(9, 20, 0), hms(9, 20, 0)),
            call("BFC2", "FUR_CREEK_RES", 1, hms(11, 0, 0), hms(11, 0, 0)),
            call("BFC2", "BULLFROG", 2, hms(12, 0, 0), hms(12, 0, 0)),
            call("AAMV1", "BEATTY_AIRPORT", 1, hms(8, 0, 0), hms(8, 0, 0)),
            call("AAMV1", "AMV", 2, hms(9, 0, 0), hms(9, 0, 0)),
            call("AAMV2", "AMV", 1, hms(10, 0, 0), hms(10, 0, 0)),
            call("AAMV2", "BEATTY_AIRPORT", 2, hms(11, 0, 0), hms(11, 0, 0)),
            call("AAMV3", "BEATTY_AIRPORT", 1, hms(13, 0, 0), hms(13, 0, 0)),
            call("AAMV3", "AMV", 2, hms(14, 0, 0), hms(14, 0, 0)),
            call("AAMV4", "AMV", 1, hms(15, 0, 0), hms(15, 0, 0)),
            call("AAMV4", "BEATTY_AIRPORT", 2, hms(16, 0, 0), hms(16, 0, 0)),
        ],
        calendars: vec![
            Calendar {
                service_id: "FULLW".to_string(),
                weekdays: [true; 7],
                start_date: window.0,
                end_date: window.1,
            },
            Calendar {
                service_id: "WE".to_string(),
                weekdays: [false, false, false, false, false, true, true],
                start_date: window.0,
                end_date: window.1,
            },
        ],
        calendar_dates: vec![CalendarDate {
            service_id: "FULLW".to_string(),
            date: NaiveDate::from_ymd_opt(2007, 6, 4).unwrap(),
            exception: ExceptionType::ServiceRemoved,
        }],
        ..Feed::default()
    }
}

/// The sample feed filtered for Tuesday 2007-06-05 and fully indexed.
pub fn sample_router() -> OnlineRouter {
    let mut feed = sample_feed();
    feed.filter_by_date(NaiveDate::from_ymd_opt(2007, 6, 5).unwrap());
    let indexed = index_feed(feed, WaterFilter::default(), &[], 1.5);
    OnlineRouter::new(
        indexed,
        QueryOptionsOverride::default(),
        OptionCeilings::default(),
    )
}
