//! Weather condition codes and their icons.
//!
//! Mirrors the upstream "Weather condition codes" table.

/// A day/night icon pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Icon {
    pub day: &'static str,
    pub night: &'static str,
    pub description: &'static str,
}

const fn icon(day: &'static str, night: &'static str, description: &'static str) -> Icon {
    Icon {
        day,
        night,
        description,
    }
}

const CLEAR: Icon = icon("01d", "01n", "clear sky");
const FEW_CLOUDS: Icon = icon("02d", "02n", "few clouds");
const SCATTERED: Icon = icon("03d", "03n", "scattered clouds");
const BROKEN: Icon = icon("04d", "04n", "broken clouds");
const SHOWER: Icon = icon("09d", "09n", "shower rain");
const RAIN: Icon = icon("10d", "10n", "rain");
const THUNDER: Icon = icon("11d", "11n", "thunderstorm");
const SNOW: Icon = icon("13d", "13n", "snow");
const MIST: Icon = icon("50d", "50n", "mist");

static ALL_ICONS: &[(&str, Icon)] = &[
    ("01", CLEAR),
    ("02", FEW_CLOUDS),
    ("03", SCATTERED),
    ("04", BROKEN),
    ("09", SHOWER),
    ("10", RAIN),
    ("11", THUNDER),
    ("13", SNOW),
    ("50", MIST),
];

impl Icon {
    /// Look up by code; `"10d"` and `"10"` both resolve to the rain icon.
    /// Unknown codes map to a clear-sky icon described as "unknown".
    pub fn find(code: &str) -> Icon {
        let prefix = code.get(..2).unwrap_or(code);
        ALL_ICONS
            .iter()
            .find(|(k, _)| *k == prefix)
            .map(|(_, icon)| *icon)
            .unwrap_or(Icon {
                description: "unknown",
                ..CLEAR
            })
    }

    /// Image URL; `size` is the density multiplier (2 or 4).
    pub fn url(&self, size: u8, day: bool) -> Option<String> {
        if size != 2 && size != 4 {
            return None;
        }
        let code = if day { self.day } else { self.night };
        Some(format!("https://openweathermap.org/img/wn/{code}@{size}x.png"))
    }
}

/// A condition code with its group and icon.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Condition {
    pub code: u32,
    /// Group, e.g. `Thunderstorm`.
    pub group: &'static str,
    pub description: &'static str,
    pub icon: Icon,
}

const fn cond(code: u32, group: &'static str, description: &'static str, icon: Icon) -> Condition {
    Condition {
        code,
        group,
        description,
        icon,
    }
}

static ALL_CONDITIONS: &[Condition] = &[
    cond(200, "Thunderstorm", "thunderstorm with light rain", THUNDER),
    cond(201, "Thunderstorm", "thunderstorm with rain", THUNDER),
    cond(202, "Thunderstorm", "thunderstorm with heavy rain", THUNDER),
    cond(210, "Thunderstorm", "light thunderstorm", THUNDER),
    cond(211, "Thunderstorm", "thunderstorm", THUNDER),
    cond(212, "Thunderstorm", "heavy thunderstorm", THUNDER),
    cond(221, "Thunderstorm", "ragged thunderstorm", THUNDER),
    cond(230, "Thunderstorm", "thunderstorm with light drizzle", THUNDER),
    cond(231, "Thunderstorm", "thunderstorm with drizzle", THUNDER),
    cond(232, "Thunderstorm", "thunderstorm with heavy drizzle", THUNDER),
    cond(300, "Drizzle", "light intensity drizzle", SHOWER),
    cond(301, "Drizzle", "drizzle", SHOWER),
    cond(302, "Drizzle", "heavy intensity drizzle", SHOWER),
    cond(310, "Drizzle", "light intensity drizzle rain", SHOWER),
    cond(311, "Drizzle", "drizzle rain", SHOWER),
    cond(312, "Drizzle", "heavy intensity drizzle rain", SHOWER),
    cond(313, "Drizzle", "shower rain and drizzle", SHOWER),
    cond(314, "Drizzle", "heavy shower rain and drizzle", SHOWER),
    cond(321, "Drizzle", "shower drizzle", SHOWER),
    cond(500, "Rain", "light rain", RAIN),
    cond(501, "Rain", "moderate rain", RAIN),
    cond(502, "Rain", "heavy intensity rain", RAIN),
    cond(503, "Rain", "very heavy rain", RAIN),
    cond(504, "Rain", "extreme rain", RAIN),
    cond(511, "Rain", "freezing rain", SNOW),
    cond(520, "Rain", "light intensity shower rain", SHOWER),
    cond(521, "Rain", "shower rain", SHOWER),
    cond(522, "Rain", "heavy intensity shower rain", SHOWER),
    cond(531, "Rain", "ragged shower rain", SHOWER),
    cond(600, "Snow", "light snow", SNOW),
    cond(601, "Snow", "snow", SNOW),
    cond(602, "Snow", "heavy snow", SNOW),
    cond(611, "Snow", "sleet", SNOW),
    cond(612, "Snow", "light shower sleet", SNOW),
    cond(613, "Snow", "shower sleet", SNOW),
    cond(615, "Snow", "light rain and snow", SNOW),
    cond(616, "Snow", "rain and snow", SNOW),
    cond(620, "Snow", "light shower snow", SNOW),
    cond(621, "Snow", "shower snow", SNOW),
    cond(622, "Snow", "heavy shower snow", SNOW),
    cond(701, "Mist", "mist", MIST),
    cond(711, "Smoke", "smoke", MIST),
    cond(721, "Haze", "haze", MIST),
    cond(731, "Dust", "sand/dust whirls", MIST),
    cond(741, "Fog", "fog", MIST),
    cond(751, "Sand", "sand", MIST),
    cond(761, "Dust", "dust", MIST),
    cond(762, "Ash", "volcanic ash", MIST),
    cond(771, "Squall", "squalls", MIST),
    cond(781, "Tornado", "tornado", MIST),
    cond(800, "Clear", "clear sky", CLEAR),
    cond(801, "Clouds", "few clouds: 11-25%", FEW_CLOUDS),
    cond(802, "Clouds", "scattered clouds: 25-50%", SCATTERED),
    cond(803, "Clouds", "broken clouds: 51-84%", BROKEN),
    cond(804, "Clouds", "overcast clouds: 85-100%", BROKEN),
];

impl Condition {
    /// Look up a condition code. Unknown codes yield an `Unknown` condition
    /// with the mist icon.
    pub fn find(code: u32) -> Condition {
        ALL_CONDITIONS
            .iter()
            .find(|c| c.code == code)
            .copied()
            .unwrap_or(Condition {
                code,
                group: "Unknown",
                description: "unknown",
                icon: MIST,
            })
    }
}
