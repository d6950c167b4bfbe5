use chrono::{Duration, NaiveDate};

/// Computes the ordered list of dates an ingestion run still has to fetch.
///
/// With no stored history the range starts at `epoch`; otherwise at the day
/// after the newest stored date. Both cases end at `today`, inclusive, in
/// ascending order. An up-to-date store yields an empty plan rather than an
/// error. Pure function of its inputs; `today` is injected by the caller.
pub fn plan_range(
    latest: Option<NaiveDate>,
    today: NaiveDate,
    epoch: NaiveDate,
) -> Vec<NaiveDate> {
    let start = match latest {
        Some(date) => date + Duration::days(1),
        None => epoch,
    };
    if start > today {
        return Vec::new();
    }

    let span = (today - start).num_days() as usize + 1;
    let mut dates = Vec::with_capacity(span);
    let mut current = start;
    while current <= today {
        dates.push(current);
        current += Duration::days(1);
    }
    dates
}

#[cfg(test)]
mod tests {
    use super::plan_range;
    use chrono::{Duration, NaiveDate};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn empty_store_covers_epoch_through_today() {
        let epoch = date(2020, 1, 1);
        let today = date(2020, 1, 3);

        let dates = plan_range(None, today, epoch);
        assert_eq!(
            dates,
            vec![date(2020, 1, 1), date(2020, 1, 2), date(2020, 1, 3)]
        );
    }

    #[test]
    fn resumes_the_day_after_the_latest_stored_date() {
        let epoch = date(2020, 1, 1);
        let today = date(2020, 2, 1);
        let latest = date(2020, 1, 28);

        let dates = plan_range(Some(latest), today, epoch);
        assert_eq!(dates.len(), (today - latest).num_days() as usize);
        assert_eq!(dates.first(), Some(&date(2020, 1, 29)));
        assert_eq!(dates.last(), Some(&today));
        for pair in dates.windows(2) {
            assert_eq!(pair[1] - pair[0], Duration::days(1));
        }
    }

    #[test]
    fn up_to_date_store_yields_an_empty_plan() {
        let epoch = date(2020, 1, 1);
        let today = date(2020, 1, 3);

        assert!(plan_range(Some(today), today, epoch).is_empty());
        assert!(plan_range(Some(date(2020, 1, 4)), today, epoch).is_empty());
    }

    #[test]
    fn crosses_month_boundaries_without_gaps() {
        let epoch = date(2020, 1, 1);
        let today = date(2020, 3, 2);
        let latest = date(2020, 2, 27);

        let dates = plan_range(Some(latest), today, epoch);
        assert_eq!(
            dates,
            vec![
                date(2020, 2, 28),
                date(2020, 2, 29),
                date(2020, 3, 1),
                date(2020, 3, 2)
            ]
        );
    }
}
