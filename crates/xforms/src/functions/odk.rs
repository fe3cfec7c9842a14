//! Functions in the ODK namespace.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, Timelike};
use fancy_regex::Regex;

use formpath_xpath::consts::ODK_NS;
use formpath_xpath::error::Error;
use formpath_xpath::library::FunctionLibrary;
use formpath_xpath::model::NodeAdapter;
use formpath_xpath::value::Value;

/// The ODK convenience library: regex matching, arithmetic helpers and the
/// date/time surface. Stateless, but namespaced like the other domain
/// libraries so it can be shadowed or addressed explicitly.
pub fn odk_function_library<A: NodeAdapter>() -> FunctionLibrary<A> {
    let mut lib: FunctionLibrary<A> = FunctionLibrary::new(ODK_NS);

    lib.register("regex", 2, Some(2), |ctx, args| {
        let value = args[0].string(ctx.adapter());
        let pattern = args[1].string(ctx.adapter());
        let re = Regex::new(&pattern)
            .map_err(|e| Error::Evaluation(format!("invalid regex `{pattern}`: {e}")))?;
        let matched = re
            .is_match(&value)
            .map_err(|e| Error::Evaluation(format!("regex evaluation failed: {e}")))?;
        Ok(Value::Boolean(matched))
    });

    lib.register("pow", 2, Some(2), |ctx, args| {
        let base = args[0].number(ctx.adapter());
        let exponent = args[1].number(ctx.adapter());
        Ok(Value::Number(base.powf(exponent)))
    });

    lib.register("abs", 1, Some(1), |ctx, args| {
        Ok(Value::Number(args[0].number(ctx.adapter()).abs()))
    });

    // Truncation toward zero, unlike floor().
    lib.register("int", 1, Some(1), |ctx, args| {
        Ok(Value::Number(args[0].number(ctx.adapter()).trunc()))
    });

    lib.register("ends-with", 2, Some(2), |ctx, args| {
        let s = args[0].string(ctx.adapter());
        let suffix = args[1].string(ctx.adapter());
        Ok(Value::Boolean(s.ends_with(&suffix)))
    });

    lib.register("today", 0, Some(0), |ctx, _| {
        Ok(Value::String(ctx.now().format("%Y-%m-%d").to_string()))
    });

    lib.register("now", 0, Some(0), |ctx, _| {
        Ok(Value::String(
            ctx.now().to_rfc3339_opts(SecondsFormat::Millis, false),
        ))
    });

    lib.register("format-date", 2, Some(2), |ctx, args| {
        let value = args[0].string(ctx.adapter());
        let format = args[1].string(ctx.adapter());
        // An unparseable date yields the empty string, not an error, so
        // constraints over optional answers stay evaluable.
        let formatted = parse_date(&value, ctx.timezone())
            .map(|dt| format_with_codes(&dt, &format))
            .unwrap_or_default();
        Ok(Value::String(formatted))
    });

    lib
}

/// Accepts a full RFC 3339 timestamp, a local datetime, or a bare date
/// (interpreted at midnight in the evaluator's timezone).
fn parse_date(value: &str, timezone: FixedOffset) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return dt.and_local_timezone(timezone).single();
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    date.and_hms_opt(0, 0, 0)?
        .and_local_timezone(timezone)
        .single()
}

const SHORT_MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const SHORT_WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// The `%`-code date format dialect: `%Y %y %m %n %b %d %e %H %M %S %3 %a`.
/// Unknown codes pass through literally.
fn format_with_codes(dt: &DateTime<FixedOffset>, format: &str) -> String {
    let mut out = String::new();
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('Y') => out.push_str(&format!("{:04}", dt.year())),
            Some('y') => out.push_str(&format!("{:02}", dt.year().rem_euclid(100))),
            Some('m') => out.push_str(&format!("{:02}", dt.month())),
            Some('n') => out.push_str(&dt.month().to_string()),
            Some('b') => out.push_str(SHORT_MONTHS[dt.month0() as usize]),
            Some('d') => out.push_str(&format!("{:02}", dt.day())),
            Some('e') => out.push_str(&dt.day().to_string()),
            Some('H') => out.push_str(&format!("{:02}", dt.hour())),
            Some('M') => out.push_str(&format!("{:02}", dt.minute())),
            Some('S') => out.push_str(&format!("{:02}", dt.second())),
            Some('3') => out.push_str(&format!("{:03}", dt.timestamp_subsec_millis())),
            Some('a') => {
                out.push_str(SHORT_WEEKDAYS[dt.weekday().num_days_from_monday() as usize]);
            }
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(y, mo, d, h, mi, s)
            .unwrap()
    }

    #[test]
    fn format_codes() {
        let dt = fixed(2024, 3, 7, 9, 5, 2);
        assert_eq!(format_with_codes(&dt, "%Y-%m-%d"), "2024-03-07");
        assert_eq!(format_with_codes(&dt, "%e %b %y"), "7 Mar 24");
        assert_eq!(format_with_codes(&dt, "%H:%M:%S.%3"), "09:05:02.000");
        assert_eq!(format_with_codes(&dt, "%a"), "Thu");
        assert_eq!(format_with_codes(&dt, "100%"), "100%");
        assert_eq!(format_with_codes(&dt, "%q"), "%q");
    }

    #[test]
    fn date_parsing_dialects() {
        let tz = FixedOffset::east_opt(0).unwrap();
        assert!(parse_date("2024-03-07", tz).is_some());
        assert!(parse_date("2024-03-07T09:05:02", tz).is_some());
        assert!(parse_date("2024-03-07T09:05:02+01:00", tz).is_some());
        assert!(parse_date("not a date", tz).is_none());
    }
}
