//! Long-form date labels used when spreadsheet rows omit a date.

use time::{Date, Month};

use crate::domain::types::Language;

/// `January 15, 2024` for English, `15 de enero de 2024` for Spanish.
pub fn long_date(language: Language, date: Date) -> String {
    match language {
        Language::En => format!(
            "{} {}, {}",
            month_en(date.month()),
            date.day(),
            date.year()
        ),
        Language::Es => format!(
            "{} de {} de {}",
            date.day(),
            month_es(date.month()),
            date.year()
        ),
    }
}

fn month_en(month: Month) -> &'static str {
    match month {
        Month::January => "January",
        Month::February => "February",
        Month::March => "March",
        Month::April => "April",
        Month::May => "May",
        Month::June => "June",
        Month::July => "July",
        Month::August => "August",
        Month::September => "September",
        Month::October => "October",
        Month::November => "November",
        Month::December => "December",
    }
}

fn month_es(month: Month) -> &'static str {
    match month {
        Month::January => "enero",
        Month::February => "febrero",
        Month::March => "marzo",
        Month::April => "abril",
        Month::May => "mayo",
        Month::June => "junio",
        Month::July => "julio",
        Month::August => "agosto",
        Month::September => "septiembre",
        Month::October => "octubre",
        Month::November => "noviembre",
        Month::December => "diciembre",
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    #[test]
    fn english_labels_are_month_first() {
        assert_eq!(
            long_date(Language::En, date!(2024 - 01 - 15)),
            "January 15, 2024"
        );
    }

    #[test]
    fn spanish_labels_are_day_first() {
        assert_eq!(
            long_date(Language::Es, date!(2024 - 01 - 15)),
            "15 de enero de 2024"
        );
    }
}
