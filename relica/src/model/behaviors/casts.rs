// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Attribute casting stage
//!
//! Converts typed fields on read paths per the model's cast table.
//! Casting is best-effort: null values and unparseable payloads pass
//! through unchanged.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value;

use super::super::pipeline::{Behavior, CallContext, Next};
use super::super::{CastType, ModelDef};
use crate::error::Error;
use crate::record::Record;

pub struct Casts;

/// Convert a single attribute value.
pub(crate) fn cast_value(cast: CastType, value: &Value) -> Value {
    if value.is_null() {
        return Value::Null;
    }
    match cast {
        CastType::Number => match value {
            Value::String(s) => s
                .parse::<i64>()
                .map(Value::from)
                .or_else(|_| s.parse::<f64>().map(Value::from))
                .unwrap_or_else(|_| value.clone()),
            Value::Bool(b) => Value::from(*b as i64),
            _ => value.clone(),
        },
        CastType::Boolean => match value {
            Value::Number(n) => Value::Bool(n.as_f64().map_or(false, |f| f != 0.0)),
            Value::String(s) => match s.as_str() {
                "true" | "1" => Value::Bool(true),
                "false" | "0" => Value::Bool(false),
                _ => value.clone(),
            },
            _ => value.clone(),
        },
        CastType::DateTime => match value {
            Value::String(s) => parse_datetime(s)
                .map(|dt| Value::String(dt.to_rfc3339_opts(SecondsFormat::Secs, true)))
                .unwrap_or_else(|| value.clone()),
            Value::Number(n) => n
                .as_i64()
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
                .map(|dt| Value::String(dt.to_rfc3339_opts(SecondsFormat::Secs, true)))
                .unwrap_or_else(|| value.clone()),
            _ => value.clone(),
        },
        CastType::Json => match value {
            Value::String(s) => serde_json::from_str(s).unwrap_or_else(|_| value.clone()),
            _ => value.clone(),
        },
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Common driver format without a timezone; read as UTC.
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Cast every configured field of a record.
pub(crate) fn cast_record(def: &ModelDef, mut record: Record) -> Record {
    for (field, cast) in def.casts() {
        if let Some(value) = record.get(field) {
            let converted = cast_value(*cast, value);
            record.insert(field.clone(), converted);
        }
    }
    record
}

#[async_trait]
impl Behavior for Casts {
    fn name(&self) -> &'static str {
        "casts"
    }

    async fn find(
        &self,
        ctx: &CallContext,
        id: Value,
        next: Next<'_>,
    ) -> Result<Option<Record>, Error> {
        let def = next.services().def.clone();
        let record = next.find(ctx, id).await?;
        Ok(record.map(|r| cast_record(&def, r)))
    }

    async fn all(&self, ctx: &CallContext, next: Next<'_>) -> Result<Vec<Record>, Error> {
        let def = next.services().def.clone();
        let records = next.all(ctx).await?;
        Ok(records.into_iter().map(|r| cast_record(&def, r)).collect())
    }
}
