use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use crate::model::registro::{AttendanceRecord, EventType};

/// Pairs entrada→saida per employee and accumulates the worked seconds.
///
/// Policy, matching the manual-correction rules:
/// - a second entrada before any saida replaces the open one (the later
///   entrada wins — "forgot to clock out");
/// - a saida with no open entrada contributes nothing and is not an error;
/// - a trailing open entrada contributes nothing, but the employee is
///   still reported at zero rather than dropped;
/// - rows with malformed timestamps are skipped, not fatal.
///
/// Summaries are always derived fresh from raw records; nothing here is
/// cached, so manual inserts and deletions are reflected on the next call
/// with no separate recompute step.
pub fn reconcile(registros: &[AttendanceRecord]) -> BTreeMap<String, i64> {
    let mut per_employee: BTreeMap<String, Vec<(NaiveDateTime, EventType)>> = BTreeMap::new();

    for r in registros {
        match r.timestamp() {
            Ok(ts) => per_employee
                .entry(r.funcionario_id.clone())
                .or_default()
                .push((ts, r.tipo)),
            Err(_) => {
                tracing::warn!(
                    registro_id = %r.registro_id,
                    data_hora = %r.data_hora,
                    "Skipping record with malformed timestamp"
                );
            }
        }
    }

    let mut totals = BTreeMap::new();

    for (funcionario_id, mut eventos) in per_employee {
        eventos.sort_by_key(|(ts, _)| *ts);

        let mut total: i64 = 0;
        let mut aberta: Option<NaiveDateTime> = None;

        for (ts, tipo) in eventos {
            match tipo {
                EventType::Entrada => aberta = Some(ts),
                EventType::Saida => {
                    if let Some(entrada) = aberta.take() {
                        total += (ts - entrada).num_seconds();
                    }
                }
            }
        }

        totals.insert(funcionario_id, total);
    }

    totals
}

pub fn format_duration(total_segundos: i64) -> String {
    let h = total_segundos / 3600;
    let m = (total_segundos % 3600) / 60;
    let s = total_segundos % 60;
    format!("{:02}:{:02}:{:02}", h, m, s)
}
