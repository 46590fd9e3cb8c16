//! Air pollution readings

use serde::{Deserialize, Serialize};

/// Current air quality for a location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQuality {
    /// Air quality index, 1 (good) to 5 (very poor)
    pub aqi: u8,
    /// Component concentrations in μg/m³
    pub co: f64,
    pub no: f64,
    pub no2: f64,
    pub o3: f64,
    pub so2: f64,
    pub pm2_5: f64,
    pub pm10: f64,
    pub nh3: f64,
}

impl AirQuality {
    /// Human label for the index
    #[must_use]
    pub fn aqi_label(&self) -> &'static str {
        match self.aqi {
            1 => "Good",
            2 => "Fair",
            3 => "Moderate",
            4 => "Poor",
            5 => "Very Poor",
            _ => "Unknown",
        }
    }

    /// (metric, value) rows in display order
    #[must_use]
    pub fn rows(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("AQI (Index)", f64::from(self.aqi)),
            ("CO (μg/m³)", self.co),
            ("NO (μg/m³)", self.no),
            ("NO2 (μg/m³)", self.no2),
            ("O3 (μg/m³)", self.o3),
            ("SO2 (μg/m³)", self.so2),
            ("PM2.5 (μg/m³)", self.pm2_5),
            ("PM10 (μg/m³)", self.pm10),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aqi_labels() {
        let mut reading = AirQuality {
            aqi: 1,
            co: 201.9,
            no: 0.0,
            no2: 0.7,
            o3: 68.6,
            so2: 0.6,
            pm2_5: 0.5,
            pm10: 0.5,
            nh3: 0.1,
        };
        assert_eq!(reading.aqi_label(), "Good");
        reading.aqi = 5;
        assert_eq!(reading.aqi_label(), "Very Poor");
        reading.aqi = 9;
        assert_eq!(reading.aqi_label(), "Unknown");
        assert_eq!(reading.rows().len(), 8);
    }
}
