use chrono::NaiveDateTime;

use crate::model::registro::{AttendanceRecord, EventType};

/// Decides the type of the next event from the employee's events for one
/// calendar day. Empty day, or day ending in a saida, yields entrada;
/// a day ending in an entrada yields saida. Sessions never carry past
/// midnight because callers only ever pass a single day's records.
pub fn next_event_type(registros_do_dia: &[AttendanceRecord]) -> EventType {
    let mut parsed: Vec<(NaiveDateTime, EventType)> = registros_do_dia
        .iter()
        .filter_map(|r| match r.timestamp() {
            Ok(ts) => Some((ts, r.tipo)),
            Err(_) => {
                tracing::warn!(
                    registro_id = %r.registro_id,
                    data_hora = %r.data_hora,
                    "Skipping record with malformed timestamp"
                );
                None
            }
        })
        .collect();

    // The storage backend is not trusted to preserve order. The sort is
    // stable, so two records at the same instant keep scan order and the
    // later one counts as more recent.
    parsed.sort_by_key(|(ts, _)| *ts);

    match parsed.last() {
        Some((_, EventType::Entrada)) => EventType::Saida,
        _ => EventType::Entrada,
    }
}
