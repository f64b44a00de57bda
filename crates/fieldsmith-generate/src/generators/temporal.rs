use chrono::{Duration, NaiveDate};
use rand::Rng;

use crate::errors::GenerationError;
use crate::generators::{Generator, GeneratorContext, GeneratorRegistry, non_blank};

const DATE_FORMAT: &str = "%Y-%m-%d";
const MAX_OFFSET_DAYS: i64 = 365;

pub fn register(registry: &mut GeneratorRegistry) {
    registry.register_generator(Box::new(RelativeDateGenerator {
        id: "Date.afterDate",
        name: "Date After Date",
        direction: Direction::After,
    }));
    registry.register_generator(Box::new(RelativeDateGenerator {
        id: "Date.priorToDate",
        name: "Date Prior To Date",
        direction: Direction::Before,
    }));
    registry.register_generator(Box::new(SystemDateGenerator));
}

#[derive(Clone, Copy)]
enum Direction {
    After,
    Before,
}

/// ISO date up to a year away from an anchor: the date in the options, or
/// the generation date.
struct RelativeDateGenerator {
    id: &'static str,
    name: &'static str,
    direction: Direction,
}

impl Generator for RelativeDateGenerator {
    fn id(&self) -> &'static str {
        self.id
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn generate(
        &self,
        ctx: &GeneratorContext<'_>,
        options: Option<&str>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<String, GenerationError> {
        let anchor = match non_blank(options) {
            Some(options) => NaiveDate::parse_from_str(options, DATE_FORMAT).map_err(|_| {
                GenerationError::invalid_options(format!(
                    "{}: options must be an ISO date (yyyy-MM-dd), got '{options}'",
                    self.id
                ))
            })?,
            None => ctx.timestamp().date(),
        };

        let days = Duration::days(rng.random_range(1..=MAX_OFFSET_DAYS));
        let date = match self.direction {
            Direction::After => anchor.checked_add_signed(days),
            Direction::Before => anchor.checked_sub_signed(days),
        }
        .ok_or_else(|| GenerationError::invalid_options(format!("{}: date out of range", self.id)))?;
        Ok(date.format(DATE_FORMAT).to_string())
    }
}

/// The generation date, identical for every row of a run.
struct SystemDateGenerator;

impl Generator for SystemDateGenerator {
    fn id(&self) -> &'static str {
        "Date.sameAsSystemDate"
    }

    fn name(&self) -> &'static str {
        "Date Same As System Date"
    }

    fn generate(
        &self,
        ctx: &GeneratorContext<'_>,
        _options: Option<&str>,
        _rng: &mut dyn rand::RngCore,
    ) -> Result<String, GenerationError> {
        Ok(ctx.timestamp().date().format(DATE_FORMAT).to_string())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::generators::test_support::{generate, row};

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("iso date")
    }

    #[test]
    fn relative_dates_stay_within_a_year() {
        let row = row(0, &[]);
        let today = date("2024-06-15");
        for seed in 0..25 {
            let after = date(&generate("Date.afterDate", None, &row, seed).expect("after"));
            let before = date(&generate("Date.priorToDate", None, &row, seed).expect("before"));
            assert!(after > today && (after - today).num_days() <= 365);
            assert!(before < today && (today - before).num_days() <= 365);
        }
    }

    #[test]
    fn explicit_anchor_and_bad_anchor() {
        let row = row(0, &[]);
        let after = date(&generate("Date.afterDate", Some("2000-01-01"), &row, 2).expect("after"));
        assert!(after > date("2000-01-01") && after <= date("2000-12-31"));
        assert!(generate("Date.afterDate", Some("next week"), &row, 2).is_err());
    }

    #[test]
    fn system_date_is_the_generation_date() {
        assert_eq!(
            generate("Date.sameAsSystemDate", None, &row(5, &[]), 0).ok().as_deref(),
            Some("2024-06-15")
        );
    }
}
