//! The merged feed and its load-time filters.

use chrono::NaiveDate;
use hashbrown::{HashMap, HashSet};
use log::info;

use super::types::{
    Calendar, CalendarDate, ExceptionType, Route, ShapePoint, Stop, StopTime, Transfer, Trip,
};
use crate::error::Error;
use crate::Secs;

/// All entities of one (possibly merged) GTFS feed.
#[derive(Debug, Clone, Default)]
pub struct Feed {
    pub stops: Vec<Stop>,
    pub stop_times: Vec<StopTime>,
    pub trips: Vec<Trip>,
    pub routes: Vec<Route>,
    pub calendars: Vec<Calendar>,
    pub calendar_dates: Vec<CalendarDate>,
    pub shapes: Vec<ShapePoint>,
    pub transfers: Vec<Transfer>,
    /// Source feed name (directory stem) for a single-source feed.
    pub feed_name: Option<String>,
    /// Names of source feeds that declared a transfers.txt; proximity
    /// footpaths are suppressed within those feeds.
    pub feeds_with_transfers: HashSet<String>,
}

impl Feed {
    /// Merges several feeds into one. Stop ids that appear in more than one
    /// feed with differing coordinates are renamed `<feedName>_<stopId>` in
    /// the stops and in every reference (stop-times, parent stations,
    /// transfers); true duplicates at identical coordinates collapse to a
    /// single record.
    pub fn merge(feeds: Vec<Feed>) -> Feed {
        if feeds.len() == 1 {
            let mut feed = feeds.into_iter().next().unwrap();
            feed.note_declared_transfers();
            return feed;
        }

        // Stop ids needing disambiguation: present in >= 2 feeds with any
        // coordinate disagreement.
        let mut seen: HashMap<&str, (usize, f64, f64)> = HashMap::new();
        let mut conflicting: HashSet<String> = HashSet::new();
        for (feed_idx, feed) in feeds.iter().enumerate() {
            for stop in &feed.stops {
                match seen.get(stop.stop_id.as_str()) {
                    None => {
                        seen.insert(&stop.stop_id, (feed_idx, stop.lat, stop.lng));
                    }
                    Some(&(first_idx, lat, lng)) => {
                        if first_idx != feed_idx && (lat != stop.lat || lng != stop.lng) {
                            conflicting.insert(stop.stop_id.clone());
                        }
                    }
                }
            }
        }

        drop(seen);

        let mut merged = Feed::default();
        let mut collapsed: HashSet<String> = HashSet::new();
        for mut feed in feeds {
            let feed_name = feed.feed_name.clone().unwrap_or_default();
            let rename = |id: &str| -> String {
                if conflicting.contains(id) {
                    format!("{feed_name}_{id}")
                } else {
                    id.to_string()
                }
            };

            if !feed.transfers.is_empty() {
                merged.feeds_with_transfers.insert(feed_name.clone());
            }

            for mut stop in feed.stops.drain(..) {
                stop.stop_id = rename(&stop.stop_id);
                stop.parent_station = stop.parent_station.as_deref().map(rename);
                stop.feed_name = Some(feed_name.clone());
                // Identical-coordinate duplicates keep their shared id and
                // collapse to the first record.
                if collapsed.insert(stop.stop_id.clone()) {
                    merged.stops.push(stop);
                }
            }
            for mut st in feed.stop_times.drain(..) {
                st.stop_id = rename(&st.stop_id);
                merged.stop_times.push(st);
            }
            for mut transfer in feed.transfers.drain(..) {
                transfer.from_stop_id = rename(&transfer.from_stop_id);
                transfer.to_stop_id = rename(&transfer.to_stop_id);
                merged.transfers.push(transfer);
            }
            merged.trips.append(&mut feed.trips);
            merged.routes.append(&mut feed.routes);
            merged.calendars.append(&mut feed.calendars);
            merged.calendar_dates.append(&mut feed.calendar_dates);
            merged.shapes.append(&mut feed.shapes);
        }

        info!(
            "Merged feed: {} stops, {} trips, {} stop times ({} renamed stop ids)",
            merged.stops.len(),
            merged.trips.len(),
            merged.stop_times.len(),
            conflicting.len()
        );
        merged
    }

    fn note_declared_transfers(&mut self) {
        if !self.transfers.is_empty() {
            if let Some(name) = self.feed_name.clone() {
                self.feeds_with_transfers.insert(name);
            }
        }
        for stop in &mut self.stops {
            if stop.feed_name.is_none() {
                stop.feed_name = self.feed_name.clone();
            }
        }
    }

    /// Keeps only trips whose service runs on `date`, per the calendar
    /// windows and weekday bits plus calendar-date exceptions, and drops the
    /// stop-times of removed trips.
    pub fn filter_by_date(&mut self, date: NaiveDate) {
        let mut active: HashSet<&str> = self
            .trips
            .iter()
            .map(|trip| trip.service_id.as_str())
            .collect();

        for calendar in &self.calendars {
            if !calendar.runs_on(date) {
                active.remove(calendar.service_id.as_str());
            }
        }
        for exception in &self.calendar_dates {
            if exception.date != date {
                continue;
            }
            match exception.exception {
                ExceptionType::ServiceAdded => {
                    active.insert(exception.service_id.as_str());
                }
                ExceptionType::ServiceRemoved => {
                    active.remove(exception.service_id.as_str());
                }
            }
        }

        let active: HashSet<String> = active.into_iter().map(String::from).collect();
        let before = self.trips.len();
        self.trips.retain(|trip| active.contains(&trip.service_id));
        let live_trips: HashSet<&str> = self.trips.iter().map(|t| t.trip_id.as_str()).collect();
        self.stop_times
            .retain(|st| live_trips.contains(st.trip_id.as_str()));
        info!(
            "Service filter for {date}: kept {}/{before} trips",
            self.trips.len()
        );
    }

    /// Keeps only stop-times within `[earliest, latest]` seconds since
    /// midnight. Fails unless `earliest < latest`.
    pub fn filter_stop_times(&mut self, earliest: Secs, latest: Secs) -> Result<(), Error> {
        if earliest >= latest {
            return Err(Error::InvalidConfig(format!(
                "stop_time_filter requires earliest < latest, got {earliest}..{latest}"
            )));
        }
        self.stop_times
            .retain(|st| (earliest..=latest).contains(&st.time_of_day()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::RouteType;

    fn stop(id: &str, lat: f64, lng: f64) -> Stop {
        Stop {
            stop_id: id.to_string(),
            stop_name: id.to_string(),
            stop_desc: None,
            lat,
            lng,
            parent_station: None,
            feed_name: None,
        }
    }

    fn stop_time(trip: &str, stop: &str, seq: u32, secs: Secs) -> StopTime {
        StopTime {
            trip_id: trip.to_string(),
            stop_id: stop.to_string(),
            stop_sequence: seq,
            arrival_secs: secs,
            departure_secs: secs,
        }
    }

    fn trip(id: &str, service: &str) -> Trip {
        Trip {
            trip_id: id.to_string(),
            route_id: "R".to_string(),
            service_id: service.to_string(),
            direction_id: 0,
            shape_id: None,
            headsign: None,
            short_name: None,
            block_id: None,
        }
    }

    fn feed(name: &str, stops: Vec<Stop>, stop_times: Vec<StopTime>) -> Feed {
        Feed {
            stops,
            stop_times,
            feed_name: Some(name.to_string()),
            ..Feed::default()
        }
    }

    #[test]
    fn merge_renames_conflicting_stops_and_references() {
        let a = feed(
            "metro",
            vec![stop("S1", 47.0, 8.0), stop("ONLY_A", 47.1, 8.0)],
            vec![stop_time("T1", "S1", 1, 3600)],
        );
        let b = feed(
            "bus",
            vec![stop("S1", 47.5, 8.5)],
            vec![stop_time("T2", "S1", 1, 3600)],
        );

        let merged = Feed::merge(vec![a, b]);
        let ids: Vec<&str> = merged.stops.iter().map(|s| s.stop_id.as_str()).collect();
        assert_eq!(ids, ["metro_S1", "ONLY_A", "bus_S1"]);
        assert_eq!(merged.stop_times[0].stop_id, "metro_S1");
        assert_eq!(merged.stop_times[1].stop_id, "bus_S1");
    }

    #[test]
    fn merge_collapses_identical_duplicates() {
        let a = feed("metro", vec![stop("S1", 47.0, 8.0)], vec![]);
        let b = feed("bus", vec![stop("S1", 47.0, 8.0)], vec![]);
        let merged = Feed::merge(vec![a, b]);
        assert_eq!(merged.stops.len(), 1);
        assert_eq!(merged.stops[0].stop_id, "S1");
    }

    #[test]
    fn merge_records_feeds_with_transfers() {
        let mut a = feed("metro", vec![stop("S1", 47.0, 8.0)], vec![]);
        a.transfers.push(Transfer {
            from_stop_id: "S1".to_string(),
            to_stop_id: "S1".to_string(),
            transfer_type: crate::model::types::TransferType::MinTime,
            min_transfer_secs: Some(120),
        });
        let b = feed("bus", vec![stop("S2", 47.5, 8.5)], vec![]);
        let merged = Feed::merge(vec![a, b]);
        assert!(merged.feeds_with_transfers.contains("metro"));
        assert!(!merged.feeds_with_transfers.contains("bus"));
    }

    fn calendar(service: &str, weekdays: [bool; 7]) -> Calendar {
        Calendar {
            service_id: service.to_string(),
            weekdays,
            start_date: NaiveDate::from_ymd_opt(2007, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2010, 12, 31).unwrap(),
        }
    }

    #[test]
    fn date_filter_applies_weekdays_and_exceptions() {
        let mut feed = Feed {
            trips: vec![trip("T1", "WEEKDAY"), trip("T2", "WEEKEND")],
            stop_times: vec![
                stop_time("T1", "S", 1, 3600),
                stop_time("T2", "S", 1, 3600),
            ],
            calendars: vec![
                calendar("WEEKDAY", [true, true, true, true, true, false, false]),
                calendar("WEEKEND", [false, false, false, false, false, true, true]),
            ],
            calendar_dates: vec![CalendarDate {
                service_id: "WEEKEND".to_string(),
                // A Monday, explicitly added.
                date: NaiveDate::from_ymd_opt(2007, 6, 4).unwrap(),
                exception: ExceptionType::ServiceAdded,
            }],
            ..Feed::default()
        };

        // 2007-06-04 is a Monday: WEEKDAY runs, WEEKEND added by exception.
        feed.filter_by_date(NaiveDate::from_ymd_opt(2007, 6, 4).unwrap());
        assert_eq!(feed.trips.len(), 2);

        let mut feed2 = feed.clone();
        feed2.calendar_dates = vec![CalendarDate {
            service_id: "WEEKDAY".to_string(),
            date: NaiveDate::from_ymd_opt(2007, 6, 5).unwrap(),
            exception: ExceptionType::ServiceRemoved,
        }];
        // A Tuesday with WEEKDAY removed by exception: nothing runs.
        feed2.filter_by_date(NaiveDate::from_ymd_opt(2007, 6, 5).unwrap());
        assert!(feed2.trips.is_empty());
        assert!(feed2.stop_times.is_empty());
    }

    #[test]
    fn service_outside_calendar_window_is_dropped() {
        let mut feed = Feed {
            trips: vec![trip("T1", "S")],
            calendars: vec![calendar("S", [true; 7])],
            ..Feed::default()
        };
        feed.filter_by_date(NaiveDate::from_ymd_opt(2012, 1, 2).unwrap());
        assert!(feed.trips.is_empty());
    }

    #[test]
    fn stop_time_window_filter_validates_bounds() {
        let mut feed = Feed {
            stop_times: vec![
                stop_time("T1", "S", 1, 3600),
                stop_time("T1", "S2", 2, 7200),
            ],
            ..Feed::default()
        };
        assert!(feed.filter_stop_times(7200, 3600).is_err());
        feed.filter_stop_times(0, 3600).unwrap();
        assert_eq!(feed.stop_times.len(), 1);
    }

    #[test]
    fn route_label_prefers_short_name() {
        let route = Route {
            route_id: "R1".to_string(),
            route_type: RouteType::Bus,
            short_name: Some("17".to_string()),
            long_name: Some("Airport Express".to_string()),
            color: None,
            text_color: None,
        };
        assert_eq!(route.label(), "17");
    }
}
