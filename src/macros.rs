/// `tracing::info!` with the time elapsed since `$start` attached as `elapsed_ms`.
/// `$start` is a `chrono::DateTime<Local>`.
/// ```
/// use chrono::Local;
/// use ecourts::info_time;
///
/// let start = Local::now();
/// info_time!(start, court = "01", "fetched cause list");
/// ```
#[macro_export]
macro_rules! info_time {
    ($start:expr, $($arg:tt)+) => {{
        let elapsed_ms = (::chrono::Local::now() - $start).num_milliseconds();
        ::tracing::info!(elapsed_ms, $($arg)+);
    }};
}
