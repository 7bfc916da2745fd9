//! Inbound weather readings and their mapping onto `SendTweet` calls

use crate::proto::TweetRequest;
use serde::{Deserialize, Serialize};

/// A single environmental observation posted by the producer
///
/// The JSON keys are the producer's (`name`, `temperatura`, `humedad`,
/// `clima`). A missing key takes its zero value; the tweet service decides
/// whether the result is complete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Reading {
    /// Place the reading was taken
    #[serde(rename = "name")]
    pub location: String,
    /// Temperature in degrees Celsius
    #[serde(rename = "temperatura")]
    pub temperature_c: i32,
    /// Relative humidity in percent
    #[serde(rename = "humedad")]
    pub humidity_pct: i32,
    /// Sky condition, e.g. "soleado"
    #[serde(rename = "clima")]
    pub condition: String,
}

impl Reading {
    /// Human-readable tweet text covering every field of the reading
    pub fn description(&self) -> String {
        format!(
            "Weather in {}: {}, Temperature: {}°C, Humidity: {}%",
            self.location, self.condition, self.temperature_c, self.humidity_pct
        )
    }
}

impl From<&Reading> for TweetRequest {
    fn from(reading: &Reading) -> Self {
        TweetRequest {
            description: reading.description(),
            country: reading.location.clone(),
            weather: reading.condition.clone(),
        }
    }
}
