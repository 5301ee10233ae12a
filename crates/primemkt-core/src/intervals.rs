//! Candle aggregation intervals.

use std::str::FromStr;

/// The fixed set of candle intervals the aggregation jobs produce.
///
/// The string label (`1m` … `1d`) is what gets persisted in the `candles`
/// table and accepted by the API's `interval` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandleInterval {
    OneMinute,
    FiveMinutes,
    ThirtyMinutes,
    Hourly,
    Daily,
}

impl CandleInterval {
    /// All intervals, in ascending window size.
    #[must_use]
    pub const fn all() -> [CandleInterval; 5] {
        [
            CandleInterval::OneMinute,
            CandleInterval::FiveMinutes,
            CandleInterval::ThirtyMinutes,
            CandleInterval::Hourly,
            CandleInterval::Daily,
        ]
    }

    /// Window length in seconds.
    #[must_use]
    pub const fn secs(self) -> i64 {
        match self {
            CandleInterval::OneMinute => 60,
            CandleInterval::FiveMinutes => 300,
            CandleInterval::ThirtyMinutes => 1_800,
            CandleInterval::Hourly => 3_600,
            CandleInterval::Daily => 86_400,
        }
    }

    /// Persisted label for the interval.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            CandleInterval::OneMinute => "1m",
            CandleInterval::FiveMinutes => "5m",
            CandleInterval::ThirtyMinutes => "30m",
            CandleInterval::Hourly => "1h",
            CandleInterval::Daily => "1d",
        }
    }

    /// Default cron cadence for the aggregation task of this interval.
    ///
    /// Each fires at the close of its window so the previous window is
    /// complete when the task runs.
    #[must_use]
    pub const fn default_cadence(self) -> &'static str {
        match self {
            CandleInterval::OneMinute => "0 * * * * *",
            CandleInterval::FiveMinutes => "0 */5 * * * *",
            CandleInterval::ThirtyMinutes => "0 */30 * * * *",
            CandleInterval::Hourly => "0 0 * * * *",
            CandleInterval::Daily => "0 0 0 * * *",
        }
    }
}

impl FromStr for CandleInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(CandleInterval::OneMinute),
            "5m" => Ok(CandleInterval::FiveMinutes),
            "30m" => Ok(CandleInterval::ThirtyMinutes),
            "1h" => Ok(CandleInterval::Hourly),
            "1d" => Ok(CandleInterval::Daily),
            other => Err(format!("unknown candle interval '{other}'")),
        }
    }
}

impl std::fmt::Display for CandleInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_round_trip_through_from_str() {
        for interval in CandleInterval::all() {
            assert_eq!(interval.label().parse::<CandleInterval>(), Ok(interval));
        }
    }

    #[test]
    fn unknown_label_is_rejected() {
        assert!("2h".parse::<CandleInterval>().is_err());
    }

    #[test]
    fn windows_ascend() {
        let all = CandleInterval::all();
        for pair in all.windows(2) {
            assert!(pair[0].secs() < pair[1].secs());
        }
    }
}
