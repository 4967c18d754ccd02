pub mod filter;
pub mod reconcile;
pub mod toggle;

#[cfg(test)]
mod tests {
    use crate::core::{reconcile, toggle};
    use crate::model::registro::{AttendanceRecord, EventType};

    fn rec(funcionario_id: &str, data_hora: &str, tipo: EventType) -> AttendanceRecord {
        AttendanceRecord {
            registro_id: uuid::Uuid::new_v4().to_string(),
            funcionario_id: funcionario_id.to_string(),
            data_hora: data_hora.to_string(),
            tipo,
            empresa_id: "empresa-a".to_string(),
            empresa_nome: "Empresa A".to_string(),
        }
    }

    /// Two manual inserts with no explicit type must come out as
    /// entrada/saida and reconcile to nine hours.
    #[test]
    fn manual_inserts_without_type_toggle_and_reconcile() {
        let mut dia: Vec<AttendanceRecord> = Vec::new();

        let tipo = toggle::next_event_type(&dia);
        assert_eq!(tipo, EventType::Entrada);
        dia.push(rec("e1", "2024-01-10 08:00:00", tipo));

        let tipo = toggle::next_event_type(&dia);
        assert_eq!(tipo, EventType::Saida);
        dia.push(rec("e1", "2024-01-10 17:00:00", tipo));

        let totals = reconcile::reconcile(&dia);
        assert_eq!(totals.get("e1").copied(), Some(9 * 3600));
    }

    /// A retroactive manual insert lands between existing events and the
    /// toggle keeps deciding from the full same-day set, not insertion
    /// order.
    #[test]
    fn retroactive_insert_stays_consistent_with_siblings() {
        let mut dia = vec![
            rec("e1", "2024-01-10 08:00:00", EventType::Entrada),
            rec("e1", "2024-01-10 17:00:00", EventType::Saida),
        ];
        // forgot lunch break: clock-out at noon inserted after the fact
        dia.push(rec("e1", "2024-01-10 12:00:00", EventType::Saida));
        dia.push(rec("e1", "2024-01-10 13:00:00", EventType::Entrada));

        // last event of the day is still the 17:00 saida
        assert_eq!(toggle::next_event_type(&dia), EventType::Entrada);

        let totals = reconcile::reconcile(&dia);
        assert_eq!(totals.get("e1").copied(), Some(8 * 3600));
    }
}
