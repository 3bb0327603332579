//! Open positions and closed trades.

use crate::domain::signal::Direction;
use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    /// Positive for long, negative for short.
    pub quantity: i64,
    pub entry_price: f64,
    pub entry_date: NaiveDate,
    pub stop_loss: f64,
    pub entry_commission: f64,
    pub risk_per_share: f64,
    pub entry_type: Option<String>,
}

impl Position {
    pub fn is_long(&self) -> bool {
        self.quantity > 0
    }

    pub fn is_short(&self) -> bool {
        self.quantity < 0
    }

    pub fn direction(&self) -> Direction {
        if self.is_short() {
            Direction::Short
        } else {
            Direction::Long
        }
    }

    /// Value this position contributes to equity at `price`.
    ///
    /// Shorts hold their entry notional in escrow, so their value is the
    /// escrow plus the open profit.
    pub fn market_value(&self, price: f64) -> f64 {
        let qty = self.quantity.unsigned_abs() as f64;
        if self.is_long() {
            qty * price
        } else {
            qty * (2.0 * self.entry_price - price)
        }
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.quantity as f64 * (price - self.entry_price)
    }

    /// Fill price if the bar touches the stop, else `None`.
    ///
    /// A bar that gaps through the stop fills at its open.
    pub fn stop_fill(&self, open: f64, high: f64, low: f64) -> Option<f64> {
        if self.stop_loss <= 0.0 {
            return None;
        }
        if self.is_long() {
            (low <= self.stop_loss).then(|| open.min(self.stop_loss))
        } else {
            (high >= self.stop_loss).then(|| open.max(self.stop_loss))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExitReason {
    StopLoss,
    Rule(String),
    TimeStop,
    EndOfData,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::StopLoss => f.write_str("stop loss"),
            ExitReason::Rule(reason) => f.write_str(reason),
            ExitReason::TimeStop => f.write_str("time stop"),
            ExitReason::EndOfData => f.write_str("end of data"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrade {
    pub symbol: String,
    pub quantity: i64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub pnl: f64,
    pub r_multiple: Option<f64>,
    pub exit_reason: ExitReason,
    pub entry_type: Option<String>,
}

impl ClosedTrade {
    pub fn direction(&self) -> Direction {
        if self.quantity < 0 {
            Direction::Short
        } else {
            Direction::Long
        }
    }

    pub fn holding_days(&self) -> i64 {
        (self.exit_date - self.entry_date).num_days()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_long_position() -> Position {
        Position {
            symbol: "AAPL".into(),
            quantity: 100,
            entry_price: 50.0,
            entry_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            stop_loss: 45.0,
            entry_commission: 0.0,
            risk_per_share: 5.0,
            entry_type: None,
        }
    }

    fn sample_short_position() -> Position {
        Position {
            symbol: "TSLA".into(),
            quantity: -100,
            entry_price: 100.0,
            entry_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            stop_loss: 110.0,
            entry_commission: 0.0,
            risk_per_share: 10.0,
            entry_type: None,
        }
    }

    #[test]
    fn direction_follows_quantity_sign() {
        assert!(sample_long_position().is_long());
        assert_eq!(sample_long_position().direction(), Direction::Long);
        assert!(sample_short_position().is_short());
        assert_eq!(sample_short_position().direction(), Direction::Short);
    }

    #[test]
    fn market_value_long() {
        assert!((sample_long_position().market_value(55.0) - 5500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn market_value_short_includes_escrow() {
        // escrow 10_000 plus 500 open profit
        assert!((sample_short_position().market_value(95.0) - 10_500.0).abs() < 1e-9);
    }

    #[test]
    fn unrealized_pnl_by_direction() {
        assert!((sample_long_position().unrealized_pnl(45.0) + 500.0).abs() < 1e-9);
        assert!((sample_short_position().unrealized_pnl(90.0) - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn long_stop_fills_at_stop_or_gap_open() {
        let pos = sample_long_position();
        assert_eq!(pos.stop_fill(48.0, 49.0, 46.0), None);
        assert_eq!(pos.stop_fill(48.0, 49.0, 44.0), Some(45.0));
        assert_eq!(pos.stop_fill(42.0, 43.0, 41.0), Some(42.0));
    }

    #[test]
    fn short_stop_fills_at_stop_or_gap_open() {
        let pos = sample_short_position();
        assert_eq!(pos.stop_fill(105.0, 109.0, 104.0), None);
        assert_eq!(pos.stop_fill(105.0, 112.0, 104.0), Some(110.0));
        assert_eq!(pos.stop_fill(115.0, 118.0, 113.0), Some(115.0));
    }

    #[test]
    fn zero_stop_never_fills() {
        let mut pos = sample_long_position();
        pos.stop_loss = 0.0;
        assert_eq!(pos.stop_fill(1.0, 1.0, 0.0), None);
    }

    #[test]
    fn closed_trade_direction_and_duration() {
        let trade = ClosedTrade {
            symbol: "AAPL".into(),
            quantity: -10,
            entry_price: 50.0,
            exit_price: 45.0,
            entry_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            exit_date: NaiveDate::from_ymd_opt(2024, 1, 20).unwrap(),
            pnl: 50.0,
            r_multiple: Some(1.0),
            exit_reason: ExitReason::Rule("close above exit channel".into()),
            entry_type: None,
        };
        assert_eq!(trade.direction(), Direction::Short);
        assert_eq!(trade.holding_days(), 5);
        assert_eq!(trade.exit_reason.to_string(), "close above exit channel");
    }
}
