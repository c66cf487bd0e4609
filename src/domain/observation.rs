use {
    crate::{
        error::{PipelineError, PipelineResult},
        utils::parse_date_key,
    },
    chrono::NaiveDate,
    serde::{Deserialize, Serialize},
};

/// One long-form source row: (date, entity, open, close).
///
/// Prices are optional so that an ingestion step can hand over rows with
/// empty cells; the pivot rejects them with `MalformedRow`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: String,
    pub entity: String,
    pub open: Option<f64>,
    pub close: Option<f64>,
}

impl Observation {
    pub fn new(date: impl Into<String>, entity: impl Into<String>, open: f64, close: f64) -> Self {
        Self {
            date: date.into(),
            entity: entity.into(),
            open: Some(open),
            close: Some(close),
        }
    }

    /// Checks every required field. `row` is 1-based and only used for the error.
    pub(crate) fn validate(&self, row: usize) -> PipelineResult<ValidObservation<'_>> {
        let malformed = |field: &'static str, reason: String| PipelineError::MalformedRow {
            row,
            field,
            reason,
        };

        let date = parse_date_key(&self.date)
            .ok_or_else(|| malformed("date", format!("'{}' is not a YYYY-MM-DD day", self.date)))?;

        let entity = self.entity.trim();
        if entity.is_empty() {
            return Err(malformed("entity", "is empty".to_string()));
        }

        let open = require_price(self.open).map_err(|reason| malformed("open", reason))?;
        let close = require_price(self.close).map_err(|reason| malformed("close", reason))?;

        Ok(ValidObservation {
            date,
            entity,
            open,
            close,
        })
    }
}

fn require_price(value: Option<f64>) -> Result<f64, String> {
    match value {
        None => Err("is missing".to_string()),
        Some(v) if !v.is_finite() => Err(format!("is not finite ({})", v)),
        Some(v) => Ok(v),
    }
}

/// An observation whose fields have all been checked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ValidObservation<'a> {
    pub date: NaiveDate,
    pub entity: &'a str,
    pub open: f64,
    pub close: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_row_passes_with_trimmed_entity() {
        let obs = Observation::new("2024-01-02", " AAPL ", 10.0, 11.0);
        let valid = obs.validate(1).unwrap();
        assert_eq!(valid.entity, "AAPL");
        assert_eq!(valid.date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!((valid.open, valid.close), (10.0, 11.0));
    }

    #[test]
    fn missing_close_is_malformed_with_context() {
        let obs = Observation {
            date: "2024-01-02".into(),
            entity: "MSFT".into(),
            open: Some(1.0),
            close: None,
        };
        match obs.validate(5) {
            Err(PipelineError::MalformedRow { row, field, .. }) => {
                assert_eq!(row, 5);
                assert_eq!(field, "close");
            }
            other => panic!("expected MalformedRow, got {:?}", other),
        }
    }

    #[test]
    fn bad_date_empty_entity_and_nan_are_rejected() {
        let bad_date = Observation::new("01/02/2024", "A", 1.0, 1.0);
        assert!(matches!(
            bad_date.validate(1),
            Err(PipelineError::MalformedRow { field: "date", .. })
        ));

        let no_entity = Observation::new("2024-01-02", "  ", 1.0, 1.0);
        assert!(matches!(
            no_entity.validate(2),
            Err(PipelineError::MalformedRow { field: "entity", .. })
        ));

        let nan_open = Observation::new("2024-01-02", "A", f64::NAN, 1.0);
        assert!(matches!(
            nan_open.validate(3),
            Err(PipelineError::MalformedRow { field: "open", .. })
        ));
    }
}
