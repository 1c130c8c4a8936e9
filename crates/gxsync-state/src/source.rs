//! Value ingest - turning raw text from a sim or client into variables

use std::collections::HashMap;
use std::sync::Arc;

use gxsync_core::{DataStatus, GxError, GxResult, Registry, Side, TypedValue, VariableType};
use tracing::debug;

use crate::{StoreOutcome, Variable, VariableStore};

/// Separators used by formatted numbers
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NumberFormat {
    pub group_separator: char,
    pub decimal_separator: char,
}

impl Default for NumberFormat {
    fn default() -> Self {
        NumberFormat {
            group_separator: ',',
            decimal_separator: '.',
        }
    }
}

impl NumberFormat {
    /// Strip formatting from a number
    ///
    /// Group separators go, as does anything that is not a digit, a minus
    /// sign or the decimal separator. The decimal separator becomes `.`.
    pub fn unformat(&self, raw: &str) -> Option<String> {
        if raw.trim().is_empty() {
            return None;
        }

        let plain: String = raw
            .chars()
            .filter(|&c| c != self.group_separator)
            .filter(|&c| c.is_ascii_digit() || c == '-' || c == self.decimal_separator)
            .map(|c| if c == self.decimal_separator { '.' } else { c })
            .collect();

        let digits = plain.strip_prefix('-').unwrap_or(&plain);
        let mut parts = digits.splitn(2, '.');
        let whole = parts.next().unwrap_or_default();
        let fraction = parts.next();

        let valid = match fraction {
            None => !whole.is_empty() && whole.bytes().all(|b| b.is_ascii_digit()),
            Some(fraction) => {
                !(whole.is_empty() && fraction.is_empty())
                    && whole.bytes().all(|b| b.is_ascii_digit())
                    && fraction.bytes().all(|b| b.is_ascii_digit())
            }
        };

        valid.then_some(plain)
    }
}

type Parser = fn(&str, &NumberFormat) -> GxResult<TypedValue>;

fn parse_string(raw: &str, _: &NumberFormat) -> GxResult<TypedValue> {
    Ok(TypedValue::from(raw))
}

fn parse_int32(raw: &str, format: &NumberFormat) -> GxResult<TypedValue> {
    format
        .unformat(raw)
        .and_then(|plain| plain.parse::<i32>().ok())
        .map(TypedValue::Int32)
        .ok_or_else(|| GxError::InvalidNumber {
            raw: raw.to_owned(),
            expected: VariableType::Int32,
        })
}

fn parse_int64(raw: &str, format: &NumberFormat) -> GxResult<TypedValue> {
    format
        .unformat(raw)
        .and_then(|plain| plain.parse::<i64>().ok())
        .map(TypedValue::Int64)
        .ok_or_else(|| GxError::InvalidNumber {
            raw: raw.to_owned(),
            expected: VariableType::Int64,
        })
}

fn parser_for(var_type: VariableType) -> Parser {
    match var_type {
        VariableType::String => parse_string,
        VariableType::Int32 => parse_int32,
        VariableType::Int64 => parse_int64,
    }
}

/// Builds variables from raw text values
///
/// The parser for every registered name is looked up once, when the ingest
/// is created.
#[derive(Debug)]
pub struct ValueIngest {
    registry: Arc<Registry>,
    format: NumberFormat,
    parsers: HashMap<String, Parser>,
}

impl ValueIngest {
    pub fn new(registry: Arc<Registry>, format: NumberFormat) -> Self {
        let parsers = registry
            .all_variables()
            .values()
            .map(|attrs| (attrs.name.clone(), parser_for(attrs.var_type)))
            .collect();

        ValueIngest {
            registry,
            format,
            parsers,
        }
    }

    pub fn format(&self) -> &NumberFormat {
        &self.format
    }

    /// Parse `raw` and build the variable as sent by `side`
    pub fn ingest(&self, side: Side, name: &str, raw: &str) -> GxResult<Variable> {
        let attrs = self.registry.find(name)?;
        let parse = self
            .parsers
            .get(&attrs.name)
            .ok_or_else(|| GxError::VariableNotFound(name.to_owned()))?;
        let value = parse(raw, &self.format)?;

        let mut variable = Variable::new(&self.registry, name, DataStatus::StatusNotSet, value)?;
        variable.set_trigger(side.send_trigger())?;
        variable.change_status(side.send_trigger())?;

        debug!(name, ?side, status = ?variable.status(), "value ingested");
        Ok(variable)
    }

    /// Ingest and hand the variable to `store`
    pub fn publish(
        &self,
        store: &impl VariableStore,
        side: Side,
        name: &str,
        raw: &str,
    ) -> GxResult<StoreOutcome> {
        store.store(self.ingest(side, name, raw)?)
    }
}
