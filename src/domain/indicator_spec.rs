//! Indicator spec parser.
//!
//! Playbook definitions list their required indicators as text, e.g.
//! `"SMA(200), EMA(10) EMA(30)"` or `"MACD"`. This module turns such strings
//! into [`IndicatorType`] keys. Tokens are separated by whitespace, commas or
//! semicolons; names are case-insensitive. The `Display` form of every
//! `IndicatorType` parses back to itself.

use crate::domain::error::ParseError;
use crate::domain::indicator::IndicatorType;
use crate::domain::indicator::macd::{DEFAULT_FAST, DEFAULT_SIGNAL, DEFAULT_SLOW};

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn skip_separators(&mut self) {
        while self
            .peek()
            .is_some_and(|c| c.is_whitespace() || c == ',' || c == ';')
        {
            self.advance();
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(ParseError::new(
                format!("expected '{}', found '{}'", expected, ch),
                self.pos,
            )),
            None => Err(ParseError::new(
                format!("expected '{}', found end of input", expected),
                self.pos,
            )),
        }
    }

    fn parse_name(&mut self) -> Result<(String, usize), ParseError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.advance();
        }
        if self.pos == start {
            let found = self
                .peek()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "end of input".to_string());
            return Err(ParseError::new(
                format!("expected indicator name, found '{}'", found),
                start,
            ));
        }
        Ok((self.input[start..self.pos].to_ascii_uppercase(), start))
    }

    fn parse_integer(&mut self) -> Result<usize, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        if self.pos == start {
            return Err(ParseError::new("expected period", start));
        }
        let value: usize = self.input[start..self.pos]
            .parse()
            .map_err(|_| ParseError::new("period out of range", start))?;
        if value == 0 {
            return Err(ParseError::new("period must be positive", start));
        }
        Ok(value)
    }

    /// Optional parenthesised integer list. `None` when no '(' follows.
    fn parse_args(&mut self) -> Result<Option<Vec<usize>>, ParseError> {
        let save = self.pos;
        self.skip_whitespace();
        if self.peek() != Some('(') {
            self.pos = save;
            return Ok(None);
        }
        self.advance();
        let mut args = vec![self.parse_integer()?];
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(',') => {
                    self.advance();
                    args.push(self.parse_integer()?);
                }
                _ => break,
            }
        }
        self.expect_char(')')?;
        Ok(Some(args))
    }

    fn parse_token(&mut self) -> Result<IndicatorType, ParseError> {
        let (name, start) = self.parse_name()?;
        let args_pos = self.pos;
        let args = self.parse_args()?;

        let single = |args: Option<Vec<usize>>| -> Result<usize, ParseError> {
            match args.as_deref() {
                Some([p]) => Ok(*p),
                Some(_) => Err(ParseError::new(
                    format!("{} takes exactly one period", name),
                    args_pos,
                )),
                None => Err(ParseError::new(
                    format!("{} requires a period, e.g. {}(14)", name, name),
                    args_pos,
                )),
            }
        };

        let parsed = match name.as_str() {
            "SMA" => IndicatorType::Sma(single(args)?),
            "EMA" => IndicatorType::Ema(single(args)?),
            "RSI" => IndicatorType::Rsi(single(args)?),
            "ATR" => IndicatorType::Atr(single(args)?),
            "DONCHIAN_HIGH" => IndicatorType::DonchianHigh(single(args)?),
            "DONCHIAN_LOW" => IndicatorType::DonchianLow(single(args)?),
            "HIGHEST_HIGH" => IndicatorType::HighestHigh(single(args)?),
            "LOWEST_LOW" => IndicatorType::LowestLow(single(args)?),
            "VOLUME_SMA" => IndicatorType::VolumeSma(single(args)?),
            "DOLLAR_VOLUME_SMA" => IndicatorType::DollarVolumeSma(single(args)?),
            "CHANGE" => IndicatorType::Change(single(args)?),
            "MACD" => match args.as_deref() {
                None => IndicatorType::Macd {
                    fast: DEFAULT_FAST,
                    slow: DEFAULT_SLOW,
                    signal: DEFAULT_SIGNAL,
                },
                Some(&[fast, slow, signal]) => IndicatorType::Macd { fast, slow, signal },
                Some(_) => {
                    return Err(ParseError::new(
                        "MACD takes (fast,slow,signal) or no arguments",
                        args_pos,
                    ));
                }
            },
            other => {
                return Err(ParseError::new(
                    format!("unknown indicator '{}'", other),
                    start,
                ));
            }
        };
        Ok(parsed)
    }
}

/// Parse every indicator token in `input`, preserving order and duplicates.
pub fn parse_specs(input: &str) -> Result<Vec<IndicatorType>, ParseError> {
    let mut parser = Parser::new(input);
    let mut out = Vec::new();
    loop {
        parser.skip_separators();
        if parser.peek().is_none() {
            break;
        }
        out.push(parser.parse_token()?);
    }
    Ok(out)
}

/// Parse a list of spec strings into a de-duplicated, order-preserving list.
pub fn parse_all<S: AsRef<str>>(specs: &[S]) -> Result<Vec<IndicatorType>, ParseError> {
    let mut out: Vec<IndicatorType> = Vec::new();
    for spec in specs {
        for t in parse_specs(spec.as_ref())? {
            if !out.contains(&t) {
                out.push(t);
            }
        }
    }
    Ok(out)
}
