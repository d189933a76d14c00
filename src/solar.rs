//! Low-precision sunrise/sunset (NOAA "Almanac for Computers" method)
//!
//! Accuracy: about one minute at mid latitudes, zenith 90.833° so that
//! atmospheric refraction and the solar disc radius are accounted for.
//! Results are UTC instants for a given civil date; callers convert them to
//! whatever zone they display.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

/// "Official" zenith for rise/set events.
const ZENITH_DEG: f64 = 90.833;

/// Sunrise and sunset for one day. `None` means the event does not happen
/// (polar day or polar night).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunTimes {
    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, PartialEq)]
enum Event {
    Rise,
    Set,
}

fn sin_deg(x: f64) -> f64 {
    x.to_radians().sin()
}

fn cos_deg(x: f64) -> f64 {
    x.to_radians().cos()
}

fn norm360(x: f64) -> f64 {
    x.rem_euclid(360.0)
}

/// UT hours after midnight of the civil date for the event on day-of-year `doy`.
/// May fall outside 0..24 when the event belongs to a neighbouring UTC day.
fn event_ut_hours(lat_deg: f64, lon_deg: f64, doy: u32, event: Event) -> Option<f64> {
    let lng_hour = lon_deg / 15.0;

    // 1. Approximate time: 06:00 local solar for rise, 18:00 for set
    let base = match event {
        Event::Rise => 6.0,
        Event::Set => 18.0,
    };
    let t = doy as f64 + (base - lng_hour) / 24.0;

    // 2. Sun's mean anomaly and true longitude
    let m = 0.9856 * t - 3.289;
    let l = norm360(m + 1.916 * sin_deg(m) + 0.020 * sin_deg(2.0 * m) + 282.634);

    // 3. Right ascension, moved into the same quadrant as L, in hours
    let mut ra = norm360((0.91764 * l.to_radians().tan()).atan().to_degrees());
    ra += (l / 90.0).floor() * 90.0 - (ra / 90.0).floor() * 90.0;
    let ra_hours = ra / 15.0;

    // 4. Declination
    let sin_dec = 0.39782 * sin_deg(l);
    let cos_dec = (1.0 - sin_dec * sin_dec).sqrt();

    // 5. Local hour angle; outside [-1, 1] the sun never crosses the zenith
    let cos_h = (cos_deg(ZENITH_DEG) - sin_dec * sin_deg(lat_deg)) / (cos_dec * cos_deg(lat_deg));
    if !(-1.0..=1.0).contains(&cos_h) {
        return None;
    }
    let h_deg = match event {
        Event::Rise => 360.0 - cos_h.acos().to_degrees(),
        Event::Set => cos_h.acos().to_degrees(),
    };

    // 6. Local mean time of the event, then UT. The UT hour is moved by whole
    // days next to the approximate time so far-west sunsets land on the next
    // UTC day instead of the morning of the same one.
    let local_mean = h_deg / 15.0 + ra_hours - 0.06571 * t - 6.622;
    let ut = (local_mean - lng_hour).rem_euclid(24.0);
    let expected = base - lng_hour;
    Some(ut + 24.0 * ((expected - ut) / 24.0).round())
}

fn ut_hours_to_utc(date: NaiveDate, ut_hours: f64) -> DateTime<Utc> {
    let seconds = (ut_hours * 3600.0).round() as i64;
    let midnight = date.and_time(chrono::NaiveTime::MIN).and_utc();
    midnight + Duration::seconds(seconds)
}

/// Sunrise/sunset for the civil date `date` at the given position.
pub fn sun_times(lat_deg: f64, lon_deg: f64, date: NaiveDate) -> SunTimes {
    let doy = date.ordinal();
    let at = |event| event_ut_hours(lat_deg, lon_deg, doy, event).map(|h| ut_hours_to_utc(date, h));
    SunTimes {
        sunrise: at(Event::Rise),
        sunset: at(Event::Set),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn minutes_of_day(dt: DateTime<Utc>) -> i64 {
        (dt.hour() * 60 + dt.minute()) as i64
    }

    #[test]
    fn test_equator_equinox_is_about_twelve_hours() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
        let times = sun_times(0.0, 0.0, date);
        let rise = minutes_of_day(times.sunrise.unwrap());
        let set = minutes_of_day(times.sunset.unwrap());
        // 06:04 and 18:11 UTC give or take a few minutes
        assert!((rise - 6 * 60).abs() < 15, "sunrise at {} min", rise);
        assert!((set - 18 * 60).abs() < 20, "sunset at {} min", set);
    }

    #[test]
    fn test_toronto_summer_solstice() {
        // Toronto 2024-06-21: sunrise 05:36 EDT (09:36 UTC), sunset 21:03 EDT (01:03 UTC next day)
        let date = NaiveDate::from_ymd_opt(2024, 6, 21).unwrap();
        let times = sun_times(43.6532, -79.3832, date);
        let rise = minutes_of_day(times.sunrise.unwrap());
        let set = minutes_of_day(times.sunset.unwrap());
        assert!((rise - (9 * 60 + 36)).abs() < 5, "sunrise at {} min", rise);
        assert!((set - 63).abs() < 5, "sunset at {} min", set);
        assert_eq!(times.sunset.unwrap().day(), 22);
    }

    #[test]
    fn test_far_east_sunrise_is_previous_utc_day() {
        // Tokyo sunrise is before midnight UTC
        let date = NaiveDate::from_ymd_opt(2024, 6, 21).unwrap();
        let times = sun_times(35.6762, 139.6503, date);
        assert_eq!(times.sunrise.unwrap().day(), 20);
    }

    #[test]
    fn test_polar_night_has_no_events() {
        let date = NaiveDate::from_ymd_opt(2024, 12, 21).unwrap();
        let times = sun_times(78.22, 15.65, date); // Longyearbyen
        assert_eq!(times.sunrise, None);
        assert_eq!(times.sunset, None);
    }

    #[test]
    fn test_polar_day_has_no_events() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 21).unwrap();
        let times = sun_times(78.22, 15.65, date);
        assert_eq!(times.sunrise, None);
        assert_eq!(times.sunset, None);
    }
}
