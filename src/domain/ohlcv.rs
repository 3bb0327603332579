//! Daily price bars.

use chrono::NaiveDate;

/// One trading day for one symbol. Volume is in shares.
#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl OhlcvBar {
    /// Wilder's true range against the previous close, so overnight gaps count.
    pub fn true_range(&self, prev_close: f64) -> f64 {
        (self.high - self.low)
            .max((self.high - prev_close).abs())
            .max((self.low - prev_close).abs())
    }

    pub fn dollar_volume(&self) -> f64 {
        self.close * self.volume as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn wide_bar() -> OhlcvBar {
        OhlcvBar {
            symbol: "MSFT".into(),
            date: NaiveDate::from_ymd_opt(2024, 4, 2).unwrap(),
            open: 412.0,
            high: 420.0,
            low: 400.0,
            close: 415.0,
            volume: 20_000,
        }
    }

    #[test]
    fn true_range_cases() {
        let bar = wide_bar();
        // (prev close, expected): inside the bar, gap down below, gap up above
        for (prev_close, expected) in [(410.0, 20.0), (380.0, 40.0), (445.0, 45.0)] {
            assert_relative_eq!(bar.true_range(prev_close), expected);
        }
    }

    #[test]
    fn dollar_volume_is_close_times_shares() {
        assert_relative_eq!(wide_bar().dollar_volume(), 8_300_000.0);
    }
}
