use chrono::NaiveDate;

/// Typed, conjunctive filter over the attendance ledger. The ledger
/// compiles it to a WHERE clause; all predicates AND together and the
/// tenant predicate is always present, so no scan can cross tenants.
#[derive(Debug, Clone)]
pub struct RecordFilter {
    pub empresa_id: String,
    /// `Some(vec![])` means "none of them", never "all of them".
    pub funcionario_ids: Option<Vec<String>>,
    pub de: Option<NaiveDate>,
    pub ate: Option<NaiveDate>,
}

impl RecordFilter {
    pub fn for_company(empresa_id: &str) -> Self {
        Self {
            empresa_id: empresa_id.to_string(),
            funcionario_ids: None,
            de: None,
            ate: None,
        }
    }

    /// Compiles to `WHERE ...` plus positional bindings. Everything binds
    /// as text because `data_hora` is stored in its textual form, whose
    /// lexicographic order is chronological.
    pub fn to_where(&self) -> (String, Vec<String>) {
        let mut conditions = vec!["empresa_id = ?".to_string()];
        let mut bindings = vec![self.empresa_id.clone()];

        if let Some(de) = self.de {
            conditions.push("data_hora >= ?".to_string());
            bindings.push(format!("{} 00:00:00", de.format("%Y-%m-%d")));
        }

        if let Some(ate) = self.ate {
            conditions.push("data_hora <= ?".to_string());
            bindings.push(format!("{} 23:59:59", ate.format("%Y-%m-%d")));
        }

        match &self.funcionario_ids {
            Some(ids) if ids.is_empty() => {
                // explicit empty set: match nothing
                conditions.push("1 = 0".to_string());
            }
            Some(ids) => {
                let marks = vec!["?"; ids.len()].join(", ");
                conditions.push(format!("funcionario_id IN ({})", marks));
                bindings.extend(ids.iter().cloned());
            }
            None => {}
        }

        (format!("WHERE {}", conditions.join(" AND ")), bindings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn tenant_predicate_is_always_first() {
        let (sql, binds) = RecordFilter::for_company("empresa-a").to_where();
        assert_eq!(sql, "WHERE empresa_id = ?");
        assert_eq!(binds, vec!["empresa-a".to_string()]);
    }

    #[test]
    fn date_bounds_cover_whole_days() {
        let mut f = RecordFilter::for_company("empresa-a");
        f.de = NaiveDate::from_ymd_opt(2024, 1, 10);
        f.ate = NaiveDate::from_ymd_opt(2024, 1, 31);

        let (sql, binds) = f.to_where();
        assert_eq!(
            sql,
            "WHERE empresa_id = ? AND data_hora >= ? AND data_hora <= ?"
        );
        assert_eq!(binds[1], "2024-01-10 00:00:00");
        assert_eq!(binds[2], "2024-01-31 23:59:59");
    }

    #[test]
    fn employee_set_becomes_in_list() {
        let mut f = RecordFilter::for_company("empresa-a");
        f.funcionario_ids = Some(vec!["e1".to_string(), "e2".to_string()]);

        let (sql, binds) = f.to_where();
        assert_eq!(sql, "WHERE empresa_id = ? AND funcionario_id IN (?, ?)");
        assert_eq!(binds.len(), 3);
    }

    #[test]
    fn empty_employee_set_matches_nothing() {
        let mut f = RecordFilter::for_company("empresa-a");
        f.funcionario_ids = Some(vec![]);

        let (sql, binds) = f.to_where();
        assert_eq!(sql, "WHERE empresa_id = ? AND 1 = 0");
        assert_eq!(binds.len(), 1);
    }

    #[test]
    fn predicates_are_conjunctive() {
        let mut f = RecordFilter::for_company("empresa-a");
        f.de = NaiveDate::from_ymd_opt(2024, 1, 1);
        f.funcionario_ids = Some(vec!["e1".to_string()]);

        let (sql, _) = f.to_where();
        assert_eq!(sql.matches(" AND ").count(), 2);
    }
}
