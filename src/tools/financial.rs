//! Market data via the Alpha Vantage API.
//!
//! Every action requires an API key, supplied at construction or through the
//! `FINANCIAL_API_KEY` environment variable. The key precondition is checked
//! before any request is issued.

use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::encode::encode_value;
use crate::error::{ToolError, ToolResult};
use crate::tool::{opt_int_arg, opt_str_arg, str_arg, ActionSpec, Param, ParamKind, Tool};

const API_URL: &str = "https://www.alphavantage.co/query";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_NEWS_LIMIT: u64 = 5;

/// Adapter for Alpha Vantage market data.
pub struct FinancialDatasetsTool {
    name: String,
    description: String,
    client: Client,
    api_key: Option<String>,
}

const ACTIONS: &[ActionSpec] = &[
    ActionSpec {
        name: "get_stock_price",
        params: &[Param::required("symbol", ParamKind::Str)],
    },
    ActionSpec {
        name: "get_stock_history",
        params: &[
            Param::required("symbol", ParamKind::Str),
            Param::required("start_date", ParamKind::Str),
            Param::optional("end_date", ParamKind::Str),
        ],
    },
    ActionSpec {
        name: "get_company_info",
        params: &[Param::required("symbol", ParamKind::Str)],
    },
    ActionSpec {
        name: "get_market_news",
        params: &[Param::optional("limit", ParamKind::Int)],
    },
];

impl FinancialDatasetsTool {
    /// Create the tool, reading the API key from `FINANCIAL_API_KEY` when
    /// not supplied explicitly.
    pub fn new() -> ToolResult<Self> {
        let key = std::env::var("FINANCIAL_API_KEY").ok();
        Self::with_api_key(key)
    }

    /// Create the tool with an explicit key (or none). The environment is
    /// not consulted.
    pub fn with_api_key(api_key: Option<String>) -> ToolResult<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| ToolError::context("Error building HTTP client", e))?;

        Ok(Self {
            name: "financial_datasets".to_string(),
            description: "Access financial data and market information".to_string(),
            client,
            api_key,
        })
    }

    fn api_key(&self) -> ToolResult<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ToolError::new("API key not provided"))
    }

    /// Issue one Alpha Vantage query and surface API-level errors.
    fn query(&self, params: &[(&str, &str)], op: &str) -> ToolResult<Value> {
        debug!(tool = %self.name, "querying Alpha Vantage");
        let response = self
            .client
            .get(API_URL)
            .query(params)
            .send()
            .map_err(|e| ToolError::context(op, e))?;

        if !response.status().is_success() {
            return Err(ToolError::new(format!(
                "{op}: API request failed: {}",
                response.status()
            )));
        }

        let data: Value = response.json().map_err(|e| ToolError::context(op, e))?;
        if let Some(message) = data.get("Error Message").and_then(Value::as_str) {
            return Err(ToolError::new(format!("{op}: {message}")));
        }
        Ok(data)
    }

    fn get_stock_price(&self, symbol: &str) -> ToolResult<String> {
        let op = "Error fetching stock price";
        let key = self.api_key()?;
        let data = self.query(
            &[("function", "GLOBAL_QUOTE"), ("symbol", symbol), ("apikey", key)],
            op,
        )?;

        let quote = data["Global Quote"]
            .as_object()
            .filter(|q| !q.is_empty())
            .ok_or_else(|| {
                ToolError::new(format!("{op}: No data found for symbol: {symbol}"))
            })?;

        Ok(encode_value(&json!({
            "symbol": quote["01. symbol"],
            "price": quote["05. price"],
            "change": quote["09. change"],
            "change_percent": quote["10. change percent"],
            "volume": quote["06. volume"],
            "latest_trading_day": quote["07. latest trading day"],
        })))
    }

    fn get_stock_history(
        &self,
        symbol: &str,
        start_date: &str,
        end_date: Option<&str>,
    ) -> ToolResult<String> {
        let op = "Error fetching stock history";
        let key = self.api_key()?;
        let data = self.query(
            &[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", symbol),
                ("outputsize", "full"),
                ("apikey", key),
            ],
            op,
        )?;

        let series = data["Time Series (Daily)"]
            .as_object()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                ToolError::new(format!("{op}: No historical data found for symbol: {symbol}"))
            })?;

        // Dates are ISO `YYYY-MM-DD`, so lexicographic comparison is date
        // comparison. A missing end date means no upper bound.
        let mut history: Vec<(&String, &Value)> = series
            .iter()
            .filter(|(date, _)| {
                date.as_str() >= start_date
                    && end_date.is_none_or(|end| date.as_str() <= end)
            })
            .collect();
        history.sort_by(|a, b| a.0.cmp(b.0));

        let rows: Vec<Value> = history
            .into_iter()
            .map(|(date, values)| {
                json!({
                    "date": date,
                    "open": values["1. open"],
                    "high": values["2. high"],
                    "low": values["3. low"],
                    "close": values["4. close"],
                    "volume": values["5. volume"],
                })
            })
            .collect();

        Ok(encode_value(&Value::Array(rows)))
    }

    fn get_company_info(&self, symbol: &str) -> ToolResult<String> {
        let op = "Error fetching company information";
        let key = self.api_key()?;
        let data = self.query(
            &[("function", "OVERVIEW"), ("symbol", symbol), ("apikey", key)],
            op,
        )?;

        if data.get("Symbol").and_then(Value::as_str).is_none() {
            return Err(ToolError::new(format!(
                "{op}: No company information found for symbol: {symbol}"
            )));
        }

        Ok(encode_value(&json!({
            "symbol": data["Symbol"],
            "name": data["Name"],
            "description": data["Description"],
            "exchange": data["Exchange"],
            "industry": data["Industry"],
            "sector": data["Sector"],
            "market_cap": data["MarketCapitalization"],
            "pe_ratio": data["PERatio"],
            "dividend_yield": data["DividendYield"],
            "earnings_per_share": data["EPS"],
            "beta": data["Beta"],
            "fifty_two_week_high": data["52WeekHigh"],
            "fifty_two_week_low": data["52WeekLow"],
        })))
    }

    fn get_market_news(&self, limit: u64) -> ToolResult<String> {
        let op = "Error fetching market news";
        let key = self.api_key()?;
        let data = self.query(
            &[
                ("function", "NEWS_SENTIMENT"),
                ("topics", "financial_markets"),
                ("apikey", key),
            ],
            op,
        )?;

        let feed = data["feed"]
            .as_array()
            .filter(|f| !f.is_empty())
            .ok_or_else(|| ToolError::new(format!("{op}: No market news found")))?;

        let articles: Vec<Value> = feed
            .iter()
            .take(limit as usize)
            .map(|article| {
                json!({
                    "title": article["title"],
                    "url": article["url"],
                    "time_published": article["time_published"],
                    "authors": article["authors"],
                    "summary": article["summary"],
                    "source": article["source"],
                    "overall_sentiment": article["overall_sentiment_label"],
                })
            })
            .collect();

        Ok(encode_value(&Value::Array(articles)))
    }
}

impl Tool for FinancialDatasetsTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn actions(&self) -> &'static [ActionSpec] {
        ACTIONS
    }

    fn dispatch(&mut self, action: &str, args: &[Value]) -> ToolResult<String> {
        debug!(tool = %self.name, action, "dispatch");
        let Some(spec) = ActionSpec::find(ACTIONS, action) else {
            return Err(ToolError::unknown_action("Financial Datasets", action));
        };

        match spec.name {
            "get_stock_price" => {
                let symbol = str_arg(spec, args, 0)?;
                self.get_stock_price(symbol)
            }
            "get_stock_history" => {
                let symbol = str_arg(spec, args, 0)?;
                let start_date = str_arg(spec, args, 1)?;
                let end_date = opt_str_arg(spec, args, 2)?;
                self.get_stock_history(symbol, start_date, end_date)
            }
            "get_company_info" => {
                let symbol = str_arg(spec, args, 0)?;
                self.get_company_info(symbol)
            }
            "get_market_news" => {
                let limit = opt_int_arg(spec, args, 0)?.unwrap_or(DEFAULT_NEWS_LIMIT);
                self.get_market_news(limit)
            }
            _ => Err(ToolError::unknown_action("Financial Datasets", action)),
        }
    }
}
