use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use crate::error::ApiError;

/// Storage format for `data_hora`. Lexicographic order of this format is
/// chronological order, which the ledger's ORDER BY relies on.
pub const DATA_HORA_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Presentation variant some clients send back (`DD-MM-YYYY HH:MM:SS`).
const DATA_HORA_FORMAT_BR: &str = "%d-%m-%Y %H:%M:%S";

// Manual corrections often come at minute precision; seconds default to 0.
const DATA_HORA_FORMAT_MIN: &str = "%Y-%m-%d %H:%M";
const DATA_HORA_FORMAT_BR_MIN: &str = "%d-%m-%Y %H:%M";

const DATA_FORMAT: &str = "%Y-%m-%d";
const DATA_FORMAT_BR: &str = "%d-%m-%Y";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EventType {
    Entrada,
    // The original mobile client writes the accented spelling; accept both.
    #[serde(alias = "saída")]
    #[strum(serialize = "saída", to_string = "saida")]
    Saida,
}

impl TryFrom<String> for EventType {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One row of the attendance ledger. Immutable once written; corrections
/// go through insert/delete, never update.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceRecord {
    #[schema(example = "7f0c7e1a-4be6-4b1f-9a2d-3cf2a7f1d9e0")]
    pub registro_id: String,
    #[schema(example = "mariasilva-9f3b21aa")]
    pub funcionario_id: String,
    #[schema(example = "2024-01-10 08:00:00")]
    pub data_hora: String,
    #[sqlx(try_from = "String")]
    pub tipo: EventType,
    pub empresa_id: String,
    pub empresa_nome: String,
}

impl AttendanceRecord {
    /// Parsed event instant; malformed rows surface `InvalidInput` so the
    /// callers can skip them instead of aborting a whole pass.
    pub fn timestamp(&self) -> Result<NaiveDateTime, ApiError> {
        parse_data_hora(&self.data_hora)
    }
}

pub fn parse_data_hora(s: &str) -> Result<NaiveDateTime, ApiError> {
    NaiveDateTime::parse_from_str(s, DATA_HORA_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, DATA_HORA_FORMAT_BR))
        .or_else(|_| NaiveDateTime::parse_from_str(s, DATA_HORA_FORMAT_MIN))
        .or_else(|_| NaiveDateTime::parse_from_str(s, DATA_HORA_FORMAT_BR_MIN))
        .map_err(|_| ApiError::InvalidInput(format!("malformed timestamp: {}", s)))
}

pub fn parse_data(s: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(s, DATA_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(s, DATA_FORMAT_BR))
        .map_err(|_| ApiError::InvalidInput(format!("malformed date: {}", s)))
}

pub fn format_data_hora(dt: NaiveDateTime) -> String {
    dt.format(DATA_HORA_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    #[test]
    fn parses_storage_format() {
        let dt = parse_data_hora("2024-01-10 08:30:15").unwrap();
        assert_eq!(dt.date(), NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        assert_eq!((dt.hour(), dt.minute(), dt.second()), (8, 30, 15));
    }

    #[test]
    fn parses_presentation_format() {
        let a = parse_data_hora("2024-01-10 08:30:15").unwrap();
        let b = parse_data_hora("10-01-2024 08:30:15").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn parses_minute_precision_with_zero_seconds() {
        let a = parse_data_hora("2024-01-10 08:30").unwrap();
        assert_eq!(format_data_hora(a), "2024-01-10 08:30:00");

        let b = parse_data_hora("10-01-2024 08:30").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_malformed_timestamp() {
        assert!(matches!(
            parse_data_hora("2024/01/10 08:30"),
            Err(ApiError::InvalidInput(_))
        ));
        assert!(parse_data_hora("2024-01-10").is_err());
    }

    #[test]
    fn parses_dates_both_ways() {
        assert_eq!(
            parse_data("2024-01-10").unwrap(),
            parse_data("10-01-2024").unwrap()
        );
        assert!(parse_data("Jan 10 2024").is_err());
    }

    #[test]
    fn event_type_accepts_accented_spelling() {
        assert_eq!("saida".parse::<EventType>().unwrap(), EventType::Saida);
        assert_eq!("saída".parse::<EventType>().unwrap(), EventType::Saida);
        assert_eq!("entrada".parse::<EventType>().unwrap(), EventType::Entrada);
        assert!("almoço".parse::<EventType>().is_err());
    }

    #[test]
    fn event_type_renders_unaccented() {
        assert_eq!(EventType::Saida.to_string(), "saida");
        assert_eq!(EventType::Entrada.to_string(), "entrada");
    }

    #[test]
    fn event_type_serde_roundtrip() {
        let json = serde_json::to_string(&EventType::Saida).unwrap();
        assert_eq!(json, "\"saida\"");
        let back: EventType = serde_json::from_str("\"saída\"").unwrap();
        assert_eq!(back, EventType::Saida);
    }

    #[test]
    fn format_is_second_precision() {
        let dt = parse_data_hora("2024-01-10 23:59:59").unwrap();
        assert_eq!(format_data_hora(dt), "2024-01-10 23:59:59");
    }
}
