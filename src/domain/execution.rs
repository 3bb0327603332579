//! Trade execution and fill simulation.
//!
//! Entries and exits with slippage and commissions. Shorts escrow their entry
//! notional in cash and settle the price difference on exit.

use chrono::NaiveDate;

use super::portfolio::Portfolio;
use super::position::{ClosedTrade, ExitReason, Position};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExecutionConfig {
    pub commission_per_trade: f64,
    /// Percent of trade value, e.g. 0.1 means 0.1%.
    pub commission_pct: f64,
    pub slippage_pct: f64,
    pub allow_shorting: bool,
}

/// Calculate commission: flat_fee + (trade_value * pct / 100).
pub fn calculate_commission(trade_value: f64, config: &ExecutionConfig) -> f64 {
    config.commission_per_trade + (trade_value * config.commission_pct / 100.0)
}

/// Long entry (buy): market_price * (1 + slippage_pct / 100)
pub fn apply_slippage_long_entry(market_price: f64, slippage_pct: f64) -> f64 {
    market_price * (1.0 + slippage_pct / 100.0)
}

/// Short entry (sell short): market_price * (1 - slippage_pct / 100)
pub fn apply_slippage_short_entry(market_price: f64, slippage_pct: f64) -> f64 {
    market_price * (1.0 - slippage_pct / 100.0)
}

/// Long exit (sell): market_price * (1 - slippage_pct / 100)
pub fn apply_slippage_long_exit(market_price: f64, slippage_pct: f64) -> f64 {
    market_price * (1.0 - slippage_pct / 100.0)
}

/// Short exit (buy to cover): market_price * (1 + slippage_pct / 100)
pub fn apply_slippage_short_exit(market_price: f64, slippage_pct: f64) -> f64 {
    market_price * (1.0 + slippage_pct / 100.0)
}

/// An order to open a position. `quantity` is signed: negative opens a short.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryOrder {
    pub symbol: String,
    pub quantity: i64,
    pub market_price: f64,
    pub stop_loss: f64,
    pub date: NaiveDate,
    pub entry_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryResult {
    Entered {
        quantity: i64,
        execution_price: f64,
        cost: f64,
        commission: f64,
    },
    InsufficientCapital,
    ShortingDisabled,
}

/// Open a position.
///
/// The full notional plus commission leaves cash for both directions; a
/// short's notional is held as escrow until the position is covered.
pub fn enter_position(
    portfolio: &mut Portfolio,
    order: EntryOrder,
    config: &ExecutionConfig,
) -> EntryResult {
    if order.quantity == 0 {
        return EntryResult::InsufficientCapital;
    }
    let is_short = order.quantity < 0;
    if is_short && !config.allow_shorting {
        return EntryResult::ShortingDisabled;
    }

    let execution_price = if is_short {
        apply_slippage_short_entry(order.market_price, config.slippage_pct)
    } else {
        apply_slippage_long_entry(order.market_price, config.slippage_pct)
    };

    let cost = order.quantity.unsigned_abs() as f64 * execution_price;
    let commission = calculate_commission(cost, config);
    let total_cost = cost + commission;

    if total_cost > portfolio.cash {
        return EntryResult::InsufficientCapital;
    }

    portfolio.cash -= total_cost;

    portfolio.add_position(Position {
        symbol: order.symbol,
        quantity: order.quantity,
        entry_price: execution_price,
        entry_date: order.date,
        stop_loss: order.stop_loss,
        entry_commission: commission,
        risk_per_share: (execution_price - order.stop_loss).abs(),
        entry_type: order.entry_type,
    });

    EntryResult::Entered {
        quantity: order.quantity,
        execution_price,
        cost,
        commission,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExitResult {
    pub quantity: i64,
    pub exit_price: f64,
    pub exit_value: f64,
    pub exit_commission: f64,
    pub pnl: f64,
}

/// Close the position in `symbol` and record the trade.
///
/// PnL includes both commissions. R-multiple is PnL over the dollars at risk
/// on entry, and is `None` when the position had no stop distance.
pub fn exit_position(
    portfolio: &mut Portfolio,
    symbol: &str,
    market_price: f64,
    exit_date: NaiveDate,
    exit_reason: ExitReason,
    config: &ExecutionConfig,
) -> Option<ExitResult> {
    let position = portfolio.remove_position(symbol)?;

    let exit_price = if position.is_long() {
        apply_slippage_long_exit(market_price, config.slippage_pct)
    } else {
        apply_slippage_short_exit(market_price, config.slippage_pct)
    };

    let qty_abs = position.quantity.unsigned_abs() as f64;
    let exit_value = qty_abs * exit_price;
    let exit_commission = calculate_commission(exit_value, config);

    let price_pnl = position.quantity as f64 * (exit_price - position.entry_price);
    let pnl = price_pnl - position.entry_commission - exit_commission;

    if position.is_long() {
        portfolio.cash += exit_value - exit_commission;
    } else {
        let entry_notional = qty_abs * position.entry_price;
        let short_profit = entry_notional - exit_value;
        portfolio.cash += entry_notional + short_profit - exit_commission;
    }

    let dollars_at_risk = position.risk_per_share * qty_abs;
    let r_multiple = (dollars_at_risk > 0.0).then(|| pnl / dollars_at_risk);

    portfolio.record_trade(ClosedTrade {
        symbol: position.symbol,
        quantity: position.quantity,
        entry_price: position.entry_price,
        exit_price,
        entry_date: position.entry_date,
        exit_date,
        pnl,
        r_multiple,
        exit_reason,
        entry_type: position.entry_type,
    });

    Some(ExitResult {
        quantity: position.quantity,
        exit_price,
        exit_value,
        exit_commission,
        pnl,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn make_config() -> ExecutionConfig {
        ExecutionConfig {
            commission_per_trade: 10.0,
            commission_pct: 0.1,
            slippage_pct: 0.05,
            allow_shorting: true,
        }
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn order(symbol: &str, quantity: i64, price: f64, stop: f64) -> EntryOrder {
        EntryOrder {
            symbol: symbol.into(),
            quantity,
            market_price: price,
            stop_loss: stop,
            date: date(15),
            entry_type: None,
        }
    }

    #[test]
    fn calculate_commission_flat_plus_pct() {
        let config = make_config();
        let commission = calculate_commission(10000.0, &config);
        assert!((commission - 20.0).abs() < 1e-9);

        let flat_only = ExecutionConfig {
            commission_per_trade: 10.0,
            ..Default::default()
        };
        assert!((calculate_commission(10000.0, &flat_only) - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn slippage_worsens_every_fill() {
        assert!((apply_slippage_long_entry(100.0, 0.05) - 100.05).abs() < 1e-9);
        assert!((apply_slippage_short_entry(100.0, 0.05) - 99.95).abs() < 1e-9);
        assert!((apply_slippage_long_exit(100.0, 0.05) - 99.95).abs() < 1e-9);
        assert!((apply_slippage_short_exit(100.0, 0.05) - 100.05).abs() < 1e-9);
    }

    #[test]
    fn enter_long_deducts_cost_and_commission() {
        let mut portfolio = Portfolio::new(100000.0);
        let config = make_config();

        let result = enter_position(&mut portfolio, order("AAPL", 100, 100.0, 95.0), &config);
        let EntryResult::Entered {
            quantity,
            execution_price,
            cost,
            commission,
        } = result
        else {
            panic!("expected entry, got {:?}", result);
        };

        assert_eq!(quantity, 100);
        assert!((execution_price - 100.05).abs() < 1e-9);
        assert!((cost - 10005.0).abs() < 1e-9);
        assert!((commission - (10.0 + 10.005)).abs() < 1e-9);
        assert!((portfolio.cash - (100000.0 - cost - commission)).abs() < 1e-9);

        let pos = portfolio.get_position("AAPL").unwrap();
        assert!((pos.entry_commission - commission).abs() < 1e-9);
        assert!((pos.risk_per_share - 5.05).abs() < 1e-9);
        assert!((pos.stop_loss - 95.0).abs() < f64::EPSILON);
    }

    #[test]
    fn enter_rejects_when_cash_short() {
        let mut portfolio = Portfolio::new(1000.0);
        let result = enter_position(&mut portfolio, order("AAPL", 100, 100.0, 95.0), &make_config());
        assert_eq!(result, EntryResult::InsufficientCapital);
        assert!((portfolio.cash - 1000.0).abs() < f64::EPSILON);
        assert_eq!(portfolio.position_count(), 0);
    }

    #[test]
    fn enter_rejects_zero_quantity() {
        let mut portfolio = Portfolio::new(1000.0);
        let result = enter_position(&mut portfolio, order("AAPL", 0, 10.0, 9.0), &make_config());
        assert_eq!(result, EntryResult::InsufficientCapital);
    }

    #[test]
    fn short_requires_shorting_enabled() {
        let mut portfolio = Portfolio::new(100000.0);
        let config = ExecutionConfig {
            allow_shorting: false,
            ..make_config()
        };
        let result = enter_position(&mut portfolio, order("TSLA", -10, 100.0, 105.0), &config);
        assert_eq!(result, EntryResult::ShortingDisabled);
    }

    #[test]
    fn long_round_trip_pnl_and_r_multiple() {
        let mut portfolio = Portfolio::new(100000.0);
        let config = ExecutionConfig::default();
        enter_position(&mut portfolio, order("AAPL", 100, 100.0, 95.0), &config);

        let exit = exit_position(
            &mut portfolio,
            "AAPL",
            110.0,
            date(20),
            ExitReason::Rule("close below EMA 10".into()),
            &config,
        )
        .unwrap();

        assert!((exit.pnl - 1000.0).abs() < 1e-9);
        assert!((portfolio.cash - 101000.0).abs() < 1e-9);
        let trade = &portfolio.closed_trades[0];
        assert_eq!(trade.r_multiple, Some(2.0));
        assert_eq!(trade.exit_reason.to_string(), "close below EMA 10");
        assert!(!portfolio.has_position("AAPL"));
    }

    #[test]
    fn short_round_trip_settles_escrow() {
        let mut portfolio = Portfolio::new(100000.0);
        let config = ExecutionConfig {
            allow_shorting: true,
            ..Default::default()
        };
        enter_position(&mut portfolio, order("TSLA", -100, 100.0, 110.0), &config);
        assert!((portfolio.cash - 90000.0).abs() < 1e-9);

        let mut prices = HashMap::new();
        prices.insert("TSLA".to_string(), 90.0);
        assert!((portfolio.total_equity(&prices) - 101000.0).abs() < 1e-9);

        let exit = exit_position(&mut portfolio, "TSLA", 90.0, date(20), ExitReason::StopLoss, &config)
            .unwrap();
        assert!((exit.pnl - 1000.0).abs() < 1e-9);
        assert!((portfolio.cash - 101000.0).abs() < 1e-9);
        assert_eq!(portfolio.closed_trades[0].r_multiple, Some(1.0));
    }

    #[test]
    fn pnl_includes_both_commissions() {
        let mut portfolio = Portfolio::new(100000.0);
        let config = ExecutionConfig {
            commission_per_trade: 5.0,
            ..Default::default()
        };
        enter_position(&mut portfolio, order("AAPL", 10, 100.0, 90.0), &config);
        let exit = exit_position(&mut portfolio, "AAPL", 100.0, date(16), ExitReason::TimeStop, &config)
            .unwrap();
        assert!((exit.pnl + 10.0).abs() < 1e-9);
        assert!((portfolio.cash - 99990.0).abs() < 1e-9);
    }

    #[test]
    fn no_stop_distance_has_no_r_multiple() {
        let mut portfolio = Portfolio::new(100000.0);
        let config = ExecutionConfig::default();
        enter_position(&mut portfolio, order("AAPL", 10, 100.0, 100.0), &config);
        exit_position(&mut portfolio, "AAPL", 101.0, date(16), ExitReason::EndOfData, &config);
        assert_eq!(portfolio.closed_trades[0].r_multiple, None);
    }

    #[test]
    fn exit_unknown_symbol_is_none() {
        let mut portfolio = Portfolio::new(100000.0);
        let result = exit_position(
            &mut portfolio,
            "XYZ",
            10.0,
            date(16),
            ExitReason::EndOfData,
            &ExecutionConfig::default(),
        );
        assert!(result.is_none());
    }
}
