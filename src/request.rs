//! # NOAA Request URLs
//!
//! Builds the two CO-OPS datagetter URLs the widget needs for one day: tide
//! predictions and observed water levels. Both cover the local calendar day
//! (`begin_date == end_date == YYYYMMDD`).
//!
//! The configured base URL already ends with `begin_date=`, so the date is
//! appended directly:
//!
//! ```text
//! {api_base}20240305&end_date=20240305&station=8465705&product=predictions
//!     &datum=MSL&time_zone=lst_ldt&units=english&format=json
//! ```

use crate::config::StationConfig;
use crate::Units;
use chrono::{Local, NaiveDate};

/// URLs for one refresh cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestPair {
    /// Tide predictions for the whole day
    pub predicted: String,
    /// Observed water levels so far today
    pub measured: String,
}

/// NOAA `product` parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Product {
    Predictions,
    WaterLevel,
}

impl Product {
    fn as_str(self) -> &'static str {
        match self {
            Product::Predictions => "predictions",
            Product::WaterLevel => "water_level",
        }
    }
}

/// Builds [`RequestPair`]s from station settings.
///
/// Units are normalized once, when the builder is created.
#[derive(Clone, Debug)]
pub struct RequestBuilder {
    api_base: String,
    station_id: String,
    datum: String,
    time_zone: String,
    units: Units,
}

impl RequestBuilder {
    pub fn new(station: &StationConfig) -> Self {
        RequestBuilder {
            api_base: station.api_base.clone(),
            station_id: station.id.clone(),
            datum: station.datum.clone(),
            time_zone: station.time.clone(),
            units: Units::resolve(&station.units),
        }
    }

    /// Unit system every request will ask for.
    pub fn units(&self) -> Units {
        self.units
    }

    /// Build both URLs for the given local date.
    pub fn build(&self, date: NaiveDate) -> RequestPair {
        let day = noaa_date(date);
        RequestPair {
            predicted: self.url(&day, Product::Predictions),
            measured: self.url(&day, Product::WaterLevel),
        }
    }

    /// Build both URLs for today's local date.
    pub fn build_today(&self) -> RequestPair {
        self.build(Local::now().date_naive())
    }

    fn url(&self, day: &str, product: Product) -> String {
        format!(
            "{base}{day}&end_date={day}&station={station}&product={product}&datum={datum}&time_zone={tz}&units={units}&format=json",
            base = self.api_base,
            day = day,
            station = self.station_id,
            product = product.as_str(),
            datum = self.datum,
            tz = self.time_zone,
            units = self.units.as_str(),
        )
    }
}

/// Format a date the way NOAA expects it: `YYYYMMDD`.
pub fn noaa_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}
