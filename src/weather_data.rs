//! # OpenWeatherMap Weather Data
//!
//! This module fetches the One Call forecast for the configured position and
//! maps the JSON response into an immutable [`WeatherSnapshot`].
//!
//! ## Data Source
//! - **URL**: `https://api.openweathermap.org/data/2.5/onecall`
//! - **Query**: `lat`, `lon`, `units` and, when configured, `appid`
//! - **Format**: JSON with `current`, `hourly`, `daily`, `minutely`, `alerts`
//!
//! ## Snapshot Lifecycle
//! A snapshot is built once per successful poll and replaces the previous one
//! wholesale. Nothing in it is ever mutated after construction; the render
//! path holds an `Arc` to it for the duration of one frame.
//!
//! ## Error Handling
//! Every failure (network, timeout, non-200 status, malformed body, bad
//! timestamp) is a [`WeatherError`]. The poll loop logs it and keeps the
//! previous snapshot, so none of these are fatal.

use crate::config::{Position, Units};
use chrono::{DateTime, Local};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// One Call endpoint
pub const BASE_URL: &str = "https://api.openweathermap.org/data/2.5/onecall";

/// Upper bound for one poll, connection included.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur while fetching or decoding a forecast.
#[derive(Error, Debug)]
pub enum WeatherError {
    /// HTTP request failed (network, timeout, TLS)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API answered with something other than 200
    #[error("OpenWeatherMap returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// Body was not the expected JSON shape
    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// Unix timestamp outside chrono's range
    #[error("invalid timestamp {0}")]
    Timestamp(i64),
}

/// Weather condition as reported by the API (`weather[]` entries).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Condition {
    pub id: u32,
    pub main: String,
    pub description: String,
    /// Icon id such as `10d`; assets live at `weather/<icon>.png`
    pub icon: String,
}

/// Current conditions or one hourly forecast step.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherPoint {
    pub time: DateTime<Local>,
    pub sunrise: Option<DateTime<Local>>,
    pub sunset: Option<DateTime<Local>>,
    pub temperature: f32,
    pub feels_like: Option<f32>,
    /// hPa
    pub pressure: u32,
    /// percent
    pub humidity: u8,
    pub dew_point: Option<f32>,
    pub uvi: Option<f32>,
    pub clouds: u8,
    /// metres
    pub visibility: Option<u32>,
    /// m/s for metric, mph for imperial
    pub wind_speed: f32,
    /// degrees, 0 = north, clockwise
    pub wind_direction: f32,
    pub wind_gust: Option<f32>,
    /// rain volume for the last hour, mm
    pub rain_1h: Option<f32>,
    /// probability of precipitation, 0..=1
    pub pop: Option<f32>,
    pub conditions: Vec<Condition>,
}

impl WeatherPoint {
    /// Primary condition, the one the icon and description come from.
    pub fn condition(&self) -> Option<&Condition> {
        self.conditions.first()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct DailyTemperatures {
    pub day: f32,
    pub min: Option<f32>,
    pub max: Option<f32>,
    pub night: f32,
    pub eve: f32,
    pub morn: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyForecast {
    pub time: DateTime<Local>,
    pub sunrise: Option<DateTime<Local>>,
    pub sunset: Option<DateTime<Local>>,
    pub temperatures: DailyTemperatures,
    pub feels_like: Option<DailyTemperatures>,
    pub pressure: u32,
    pub humidity: u8,
    pub uvi: Option<f32>,
    pub clouds: u8,
    pub wind_speed: f32,
    pub wind_direction: f32,
    pub wind_gust: Option<f32>,
    pub rain: Option<f32>,
    pub pop: Option<f32>,
    pub conditions: Vec<Condition>,
}

/// Government weather alert.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub authority: String,
    pub event: String,
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
    pub description: String,
}

impl Alert {
    pub fn is_active(&self, now: DateTime<Local>) -> bool {
        self.start <= now && now < self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinutelyPrecipitation {
    pub time: DateTime<Local>,
    /// mm
    pub precipitation: f32,
}

/// Everything one poll returned. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSnapshot {
    pub current: WeatherPoint,
    pub hourly: Vec<WeatherPoint>,
    pub daily: Vec<DailyForecast>,
    pub minutely: Vec<MinutelyPrecipitation>,
    pub alerts: Vec<Alert>,
}

impl WeatherSnapshot {
    /// Probability of precipitation of the first `hours` hourly points, in
    /// percent. Missing values count as 0.
    pub fn hourly_pop_percent(&self, hours: usize) -> Vec<f32> {
        self.hourly
            .iter()
            .take(hours)
            .map(|point| point.pop.unwrap_or(0.0) * 100.0)
            .collect()
    }

    /// Today's forecast, the first daily entry.
    pub fn today(&self) -> Option<&DailyForecast> {
        self.daily.first()
    }
}

/// 16-point compass abbreviation for a bearing in degrees.
pub fn wind_direction_to_compass(degrees: f32) -> &'static str {
    const POINTS: [&str; 16] = [
        "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW",
        "NW", "NNW",
    ];
    let index = ((degrees.rem_euclid(360.0) + 11.25) / 22.5) as usize % 16;
    POINTS[index]
}

// -- Wire format --

#[derive(Deserialize)]
struct OneCallResponse {
    current: RawPoint,
    #[serde(default)]
    hourly: Vec<RawPoint>,
    #[serde(default)]
    daily: Vec<RawDaily>,
    #[serde(default)]
    minutely: Vec<RawMinutely>,
    #[serde(default)]
    alerts: Vec<RawAlert>,
}

#[derive(Deserialize)]
struct RawVolume {
    #[serde(rename = "1h")]
    one_hour: Option<f32>,
}

#[derive(Deserialize)]
struct RawPoint {
    dt: i64,
    sunrise: Option<i64>,
    sunset: Option<i64>,
    temp: f32,
    feels_like: Option<f32>,
    pressure: u32,
    humidity: u8,
    dew_point: Option<f32>,
    uvi: Option<f32>,
    #[serde(default)]
    clouds: u8,
    visibility: Option<u32>,
    wind_speed: f32,
    wind_deg: f32,
    wind_gust: Option<f32>,
    rain: Option<RawVolume>,
    pop: Option<f32>,
    #[serde(default)]
    weather: Vec<Condition>,
}

#[derive(Deserialize)]
struct RawDaily {
    dt: i64,
    sunrise: Option<i64>,
    sunset: Option<i64>,
    temp: DailyTemperatures,
    feels_like: Option<DailyTemperatures>,
    pressure: u32,
    humidity: u8,
    uvi: Option<f32>,
    #[serde(default)]
    clouds: u8,
    wind_speed: f32,
    wind_deg: f32,
    wind_gust: Option<f32>,
    rain: Option<f32>,
    pop: Option<f32>,
    #[serde(default)]
    weather: Vec<Condition>,
}

#[derive(Deserialize)]
struct RawMinutely {
    dt: i64,
    precipitation: f32,
}

#[derive(Deserialize)]
struct RawAlert {
    #[serde(default)]
    sender_name: String,
    event: String,
    start: i64,
    end: i64,
    #[serde(default)]
    description: String,
}

fn local_time(timestamp: i64) -> Result<DateTime<Local>, WeatherError> {
    DateTime::from_timestamp(timestamp, 0)
        .map(|utc| utc.with_timezone(&Local))
        .ok_or(WeatherError::Timestamp(timestamp))
}

fn optional_local_time(timestamp: Option<i64>) -> Result<Option<DateTime<Local>>, WeatherError> {
    timestamp.map(local_time).transpose()
}

impl TryFrom<RawPoint> for WeatherPoint {
    type Error = WeatherError;

    fn try_from(raw: RawPoint) -> Result<Self, Self::Error> {
        Ok(WeatherPoint {
            time: local_time(raw.dt)?,
            sunrise: optional_local_time(raw.sunrise)?,
            sunset: optional_local_time(raw.sunset)?,
            temperature: raw.temp,
            feels_like: raw.feels_like,
            pressure: raw.pressure,
            humidity: raw.humidity,
            dew_point: raw.dew_point,
            uvi: raw.uvi,
            clouds: raw.clouds,
            visibility: raw.visibility,
            wind_speed: raw.wind_speed,
            wind_direction: raw.wind_deg,
            wind_gust: raw.wind_gust,
            rain_1h: raw.rain.and_then(|rain| rain.one_hour),
            pop: raw.pop,
            conditions: raw.weather,
        })
    }
}

impl TryFrom<RawDaily> for DailyForecast {
    type Error = WeatherError;

    fn try_from(raw: RawDaily) -> Result<Self, Self::Error> {
        Ok(DailyForecast {
            time: local_time(raw.dt)?,
            sunrise: optional_local_time(raw.sunrise)?,
            sunset: optional_local_time(raw.sunset)?,
            temperatures: raw.temp,
            feels_like: raw.feels_like,
            pressure: raw.pressure,
            humidity: raw.humidity,
            uvi: raw.uvi,
            clouds: raw.clouds,
            wind_speed: raw.wind_speed,
            wind_direction: raw.wind_deg,
            wind_gust: raw.wind_gust,
            rain: raw.rain,
            pop: raw.pop,
            conditions: raw.weather,
        })
    }
}

impl TryFrom<OneCallResponse> for WeatherSnapshot {
    type Error = WeatherError;

    fn try_from(raw: OneCallResponse) -> Result<Self, Self::Error> {
        Ok(WeatherSnapshot {
            current: raw.current.try_into()?,
            hourly: raw
                .hourly
                .into_iter()
                .map(WeatherPoint::try_from)
                .collect::<Result<_, _>>()?,
            daily: raw
                .daily
                .into_iter()
                .map(DailyForecast::try_from)
                .collect::<Result<_, _>>()?,
            minutely: raw
                .minutely
                .into_iter()
                .map(|m| {
                    Ok(MinutelyPrecipitation {
                        time: local_time(m.dt)?,
                        precipitation: m.precipitation,
                    })
                })
                .collect::<Result<_, WeatherError>>()?,
            alerts: raw
                .alerts
                .into_iter()
                .map(|a| {
                    Ok(Alert {
                        authority: a.sender_name,
                        event: a.event,
                        start: local_time(a.start)?,
                        end: local_time(a.end)?,
                        description: a.description,
                    })
                })
                .collect::<Result<_, WeatherError>>()?,
        })
    }
}

/// Decode a One Call response body.
pub fn parse_snapshot(body: &str) -> Result<WeatherSnapshot, WeatherError> {
    let raw: OneCallResponse = serde_json::from_str(body)?;
    raw.try_into()
}

/// Client for the One Call API.
pub struct OpenWeatherMap {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl OpenWeatherMap {
    pub fn new(api_key: Option<String>) -> Result<Self, WeatherError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self::with_client(client, api_key))
    }

    pub(crate) fn with_client(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key,
            base_url: BASE_URL.to_string(),
        }
    }

    /// Send requests to another One Call endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Query string for one poll.
    pub fn query_params(&self, position: Position, units: Units) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("lat", position.lat.to_string()),
            ("lon", position.lon.to_string()),
            ("units", units.as_query().to_string()),
        ];
        if let Some(key) = &self.api_key {
            params.push(("appid", key.clone()));
        }
        params
    }

    /// Fetch and decode one forecast. One GET request, bounded by the client timeout.
    pub async fn fetch(
        &self,
        position: Position,
        units: Units,
    ) -> Result<WeatherSnapshot, WeatherError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&self.query_params(position, units))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status != reqwest::StatusCode::OK {
            return Err(WeatherError::Status { status, body });
        }

        parse_snapshot(&body)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Trimmed-down real One Call response.
    pub(crate) const ONE_CALL_JSON: &str = r#"{
        "lat": 43.63, "lon": -80.04, "timezone": "America/Toronto",
        "current": {
            "dt": 1718978400, "sunrise": 1718962560, "sunset": 1719018180,
            "temp": 21.4, "feels_like": 21.9, "pressure": 1014, "humidity": 78,
            "dew_point": 17.4, "uvi": 2.31, "clouds": 40, "visibility": 10000,
            "wind_speed": 10.0, "wind_deg": 45,
            "weather": [{"id": 802, "main": "Clouds", "description": "scattered clouds", "icon": "03d"}]
        },
        "minutely": [{"dt": 1718978400, "precipitation": 0}, {"dt": 1718978460, "precipitation": 0.25}],
        "hourly": [
            {"dt": 1718978400, "temp": 21.4, "feels_like": 21.9, "pressure": 1014, "humidity": 78,
             "clouds": 40, "visibility": 10000, "wind_speed": 3.1, "wind_deg": 200, "pop": 0.1,
             "weather": [{"id": 802, "main": "Clouds", "description": "scattered clouds", "icon": "03d"}]},
            {"dt": 1718982000, "temp": 22.0, "pressure": 1014, "humidity": 75, "clouds": 60,
             "wind_speed": 3.4, "wind_deg": 210, "pop": 0.5, "rain": {"1h": 0.4},
             "weather": [{"id": 500, "main": "Rain", "description": "light rain", "icon": "10d"}]},
            {"dt": 1718985600, "temp": 22.5, "pressure": 1013, "humidity": 74, "clouds": 90,
             "wind_speed": 3.8, "wind_deg": 220, "pop": 1.0, "weather": []}
        ],
        "daily": [
            {"dt": 1718985600, "sunrise": 1718962560, "sunset": 1719018180,
             "temp": {"day": 24.1, "min": 15.2, "max": 26.3, "night": 17.0, "eve": 23.0, "morn": 16.1},
             "feels_like": {"day": 24.5, "night": 17.2, "eve": 23.4, "morn": 16.0},
             "pressure": 1013, "humidity": 60, "wind_speed": 4.2, "wind_deg": 215,
             "clouds": 70, "pop": 0.8, "rain": 3.2, "uvi": 7.4,
             "weather": [{"id": 500, "main": "Rain", "description": "light rain", "icon": "10d"}]}
        ],
        "alerts": [
            {"sender_name": "Environment Canada", "event": "heat warning",
             "start": 1718960000, "end": 1719050000, "description": "Hot and humid"}
        ]
    }"#;

    pub(crate) fn sample_snapshot() -> WeatherSnapshot {
        parse_snapshot(ONE_CALL_JSON).unwrap()
    }

    /// Local HTTP endpoint answering one connection per `(status, body)`
    /// pair, in order. Returns its One Call URL.
    pub(crate) async fn serve_replies(replies: Vec<(u16, &'static str)>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            for (status, body) in replies {
                let (mut stream, _) = listener.accept().await.unwrap();
                let mut request = Vec::new();
                let mut chunk = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = stream.read(&mut chunk).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&chunk[..n]);
                }
                let reply = format!(
                    "HTTP/1.1 {status} Reply\r\nContent-Type: application/json\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(reply.as_bytes()).await.unwrap();
                let _ = stream.shutdown().await;
            }
        });
        format!("http://{addr}/data/2.5/onecall")
    }

    /// Client for [`serve_replies`], bypassing any proxy from the environment.
    pub(crate) fn local_client(base_url: String) -> OpenWeatherMap {
        let client = reqwest::Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        OpenWeatherMap::with_client(client, Some("key".to_string())).with_base_url(base_url)
    }

    fn toronto() -> Position {
        Position {
            lat: 43.63,
            lon: -80.04,
        }
    }

    #[tokio::test]
    async fn test_fetch_ok() {
        let url = serve_replies(vec![(200, ONE_CALL_JSON)]).await;
        let snapshot = local_client(url)
            .fetch(toronto(), Units::Metric)
            .await
            .unwrap();
        assert_eq!(snapshot.hourly.len(), 3);
        assert_eq!(snapshot.current.temperature, 21.4);
    }

    #[tokio::test]
    async fn test_fetch_server_error_is_status() {
        let url = serve_replies(vec![(500, r#"{"message": "boom"}"#)]).await;
        let result = local_client(url).fetch(toronto(), Units::Metric).await;
        match result {
            Err(WeatherError::Status { status, body }) => {
                assert_eq!(status, reqwest::StatusCode::INTERNAL_SERVER_ERROR);
                assert!(body.contains("boom"));
            }
            other => panic!("expected a status error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_fetch_malformed_body_is_payload_error() {
        let url = serve_replies(vec![(200, "{\"current\": ")]).await;
        let result = local_client(url).fetch(toronto(), Units::Metric).await;
        assert!(matches!(result, Err(WeatherError::Payload(_))));
    }

    #[test]
    fn test_parse_current() {
        let snapshot = sample_snapshot();
        let current = &snapshot.current;
        assert_eq!(current.time, Local.timestamp_opt(1718978400, 0).unwrap());
        assert_eq!(current.temperature, 21.4);
        assert_eq!(current.feels_like, Some(21.9));
        assert_eq!(current.pressure, 1014);
        assert_eq!(current.humidity, 78);
        assert_eq!(current.uvi, Some(2.31));
        assert_eq!(current.wind_direction, 45.0);
        assert_eq!(current.condition().unwrap().icon, "03d");
        assert!(current.sunrise.is_some());
    }

    #[test]
    fn test_parse_series() {
        let snapshot = sample_snapshot();
        assert_eq!(snapshot.hourly.len(), 3);
        assert_eq!(snapshot.hourly[1].rain_1h, Some(0.4));
        assert_eq!(snapshot.hourly[1].feels_like, None);
        assert!(snapshot.hourly[2].condition().is_none());
        assert!(snapshot.hourly.windows(2).all(|w| w[0].time < w[1].time));

        let today = snapshot.today().unwrap();
        assert_eq!(today.temperatures.min, Some(15.2));
        assert_eq!(today.temperatures.max, Some(26.3));
        assert_eq!(today.feels_like.unwrap().min, None);
        assert_eq!(today.rain, Some(3.2));

        assert_eq!(snapshot.minutely.len(), 2);
        assert_eq!(snapshot.alerts[0].authority, "Environment Canada");
        assert_eq!(snapshot.alerts[0].event, "heat warning");
    }

    #[test]
    fn test_optional_sections_may_be_absent() {
        let body = r#"{"current": {"dt": 0, "temp": 1.0, "pressure": 1000, "humidity": 50,
                        "wind_speed": 0.0, "wind_deg": 0}}"#;
        let snapshot = parse_snapshot(body).unwrap();
        assert!(snapshot.hourly.is_empty());
        assert!(snapshot.daily.is_empty());
        assert!(snapshot.alerts.is_empty());
        assert!(snapshot.current.condition().is_none());
    }

    #[test]
    fn test_malformed_payload() {
        assert!(matches!(
            parse_snapshot(r#"{"cod": 401, "message": "Invalid API key"}"#),
            Err(WeatherError::Payload(_))
        ));
        assert!(matches!(
            parse_snapshot("<html>"),
            Err(WeatherError::Payload(_))
        ));
    }

    #[test]
    fn test_out_of_range_timestamp() {
        let body = format!(
            r#"{{"current": {{"dt": {}, "temp": 1.0, "pressure": 1000, "humidity": 50,
                 "wind_speed": 0.0, "wind_deg": 0}}}}"#,
            i64::MAX
        );
        assert!(matches!(
            parse_snapshot(&body),
            Err(WeatherError::Timestamp(_))
        ));
    }

    #[test]
    fn test_hourly_pop_percent() {
        let snapshot = sample_snapshot();
        let pops = snapshot.hourly_pop_percent(8);
        assert_eq!(pops.len(), 3);
        assert!((pops[0] - 10.0).abs() < 1e-4);
        assert!((pops[1] - 50.0).abs() < 1e-4);
        assert!((pops[2] - 100.0).abs() < 1e-4);
    }

    #[test]
    fn test_alert_is_active() {
        let alert = &sample_snapshot().alerts[0];
        let during = Local.timestamp_opt(1718978400, 0).unwrap();
        assert!(alert.is_active(during));
        let after = Local.timestamp_opt(1719050000, 0).unwrap();
        assert!(!alert.is_active(after));
    }

    #[test]
    fn test_query_params() {
        let client = OpenWeatherMap::new(Some("key".to_string())).unwrap();
        let params = client.query_params(toronto(), Units::Metric);
        assert_eq!(
            params,
            vec![
                ("lat", "43.63".to_string()),
                ("lon", "-80.04".to_string()),
                ("units", "metric".to_string()),
                ("appid", "key".to_string()),
            ]
        );

        let anonymous = OpenWeatherMap::new(None).unwrap();
        let params = anonymous.query_params(toronto(), Units::Imperial);
        assert!(params.iter().all(|(name, _)| *name != "appid"));
        assert!(params.contains(&("units", "imperial".to_string())));
    }

    #[test]
    fn test_compass_points() {
        assert_eq!(wind_direction_to_compass(0.0), "N");
        assert_eq!(wind_direction_to_compass(45.0), "NE");
        assert_eq!(wind_direction_to_compass(200.0), "SSW");
        assert_eq!(wind_direction_to_compass(349.0), "N");
        assert_eq!(wind_direction_to_compass(360.0), "N");
        assert_eq!(wind_direction_to_compass(-90.0), "W");
    }
}
