//! Display formatting for pushed log messages.

use std::borrow::Cow;

use chrono::NaiveDate;

const DATETIME_REPR: &str = "datetime.datetime(";

/// Parse the argument list of a `datetime.datetime(...)` repr.
///
/// Year, month and day are required; hour, minute and second default to
/// zero. Trailing arguments (microseconds, `tzinfo=...`) are ignored.
fn parse_repr_args(args: &str) -> Option<String> {
    let mut numbers = args
        .split(',')
        .map(str::trim)
        .map_while(|part| part.parse::<u32>().ok());

    let year = i32::try_from(numbers.next()?).ok()?;
    let month = numbers.next()?;
    let day = numbers.next()?;
    let hour = numbers.next().unwrap_or(0);
    let minute = numbers.next().unwrap_or(0);
    let second = numbers.next().unwrap_or(0);

    let stamp = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)?;
    Some(stamp.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Rewrite Python `datetime.datetime(Y, M, D, h, m, s, ...)` reprs inside a
/// message as `YYYY-MM-DD HH:MM:SS`, together with a `[` that immediately
/// precedes one. Reprs that do not describe a valid date are left untouched.
#[must_use]
pub fn format_message(message: &str) -> Cow<'_, str> {
    if !message.contains(DATETIME_REPR) {
        return Cow::Borrowed(message);
    }

    let mut out = String::with_capacity(message.len());
    let mut rest = message;
    while let Some(start) = rest.find(DATETIME_REPR) {
        let args_start = start + DATETIME_REPR.len();
        let Some(close) = rest[args_start..].find(')') else {
            break;
        };
        let args_end = args_start + close;

        match parse_repr_args(&rest[args_start..args_end]) {
            Some(formatted) => {
                // A `[` directly before the repr is part of the match.
                let before = &rest[..start];
                out.push_str(before.strip_suffix('[').unwrap_or(before));
                out.push_str(&formatted);
            }
            None => out.push_str(&rest[..=args_end]),
        }
        rest = &rest[args_end + 1..];
    }
    out.push_str(rest);
    Cow::Owned(out)
}
