use chrono::{Local, Months, NaiveDate};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Calendar range requested for every symbol in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// Eleven months of history ending one month before `today`.
    ///
    /// The start is derived as "one year back, then one month forward" so that
    /// month-end clamping happens the same way on both steps.
    pub fn trailing_from(today: NaiveDate) -> Self {
        let end = today
            .checked_sub_months(Months::new(1))
            .unwrap_or(NaiveDate::MIN);
        let start = today
            .checked_sub_months(Months::new(12))
            .and_then(|date| date.checked_add_months(Months::new(1)))
            .unwrap_or(NaiveDate::MIN);

        Self { start, end }
    }

    pub fn trailing_from_today() -> Self {
        Self::trailing_from(Local::now().date_naive())
    }

    pub fn start_param(&self) -> String {
        self.start.format(DATE_FORMAT).to_string()
    }

    pub fn end_param(&self) -> String {
        self.end.format(DATE_FORMAT).to_string()
    }
}

pub fn current_human_timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn window_spans_eleven_months() {
        let window = DateWindow::trailing_from(date(2024, 6, 15));

        assert_eq!(window.start_param(), "2023-07-15");
        assert_eq!(window.end_param(), "2024-05-15");
        assert!(window.start < window.end);
    }

    #[test]
    fn clamps_to_month_end() {
        let window = DateWindow::trailing_from(date(2024, 3, 31));

        assert_eq!(window.end, date(2024, 2, 29));
        assert_eq!(window.start, date(2023, 4, 30));
    }

    #[test]
    fn leap_day_start_clamps_before_moving_forward() {
        let window = DateWindow::trailing_from(date(2024, 2, 29));

        assert_eq!(window.start, date(2023, 3, 28));
        assert_eq!(window.end, date(2024, 1, 29));
    }
}
