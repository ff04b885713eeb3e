use axum::extract::{FromRequest, FromRequestParts};
use time::{macros::format_description, Date, OffsetDateTime, Time};

use crate::error::{AppError, AppResult};

/// `Json` whose rejections become [`AppError::Validation`]
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// `Query` whose rejections become [`AppError::Validation`]
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

/// `Path` whose rejections become [`AppError::Validation`]
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

/// Which end of the day a `YYYY-MM-DD` bound refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayBound {
    Start,
    End,
}

/// Parse an optional `YYYY-MM-DD` query value into a UTC timestamp.
/// Empty values count as absent.
pub fn parse_date_param(
    name: &str,
    value: Option<&str>,
    bound: DayBound,
) -> AppResult<Option<OffsetDateTime>> {
    let Some(value) = value.filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    let date = Date::parse(value, format_description!("[year]-[month]-[day]")).map_err(|_| {
        AppError::Validation(format!("invalid {name} date format, use YYYY-MM-DD"))
    })?;

    let time = match bound {
        DayBound::Start => Time::MIDNIGHT,
        DayBound::End => Time::from_hms_nano(23, 59, 59, 999_999_999)
            .map_err(|e| AppError::Internal(e.to_string()))?,
    };

    Ok(Some(date.with_time(time).assume_utc()))
}
