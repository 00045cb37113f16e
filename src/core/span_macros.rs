/// Creates a root span, making the sampling decision once at the root so
/// every descendant `child_span_*!` call inherits it for free: if a parent
/// span is already active the decision was already made upstream and this
/// always attaches; otherwise it samples at `sample_percent` (`[0.0, 1.0]`,
/// `LoggingConfig::span_sample_rate`).
///
/// Returns an **un-entered** `Span` — call `.entered()` or `.instrument()`.
#[macro_export]
macro_rules! sample_or_attach_root_span {
    ($sample_percent:expr, $span_name:literal) => {{
        let current = ::tracing::Span::current();
        if !current.is_disabled() || ::rand::random::<f32>() < $sample_percent {
            ::tracing::info_span!($span_name)
        } else {
            ::tracing::Span::none()
        }
    }};
    ($sample_percent:expr, $span_name:literal, $($fields:tt)*) => {{
        let current = ::tracing::Span::current();
        if !current.is_disabled() || ::rand::random::<f32>() < $sample_percent {
            ::tracing::info_span!($span_name, $($fields)*)
        } else {
            ::tracing::Span::none()
        }
    }};
}

/// Creates an INFO-level child span only if the parent span is active
/// (sampled). Returns `Span::none()` with no allocation when the parent is
/// disabled, so unsampled requests pay nothing for span creation.
///
/// Returns an **un-entered** `Span` — call `.entered()` or `.instrument()`.
#[macro_export]
macro_rules! child_span_info {
    ($span_name:literal) => {{
        if !::tracing::Span::current().is_disabled() {
            ::tracing::info_span!($span_name)
        } else {
            ::tracing::Span::none()
        }
    }};
    ($span_name:literal, $($fields:tt)*) => {{
        if !::tracing::Span::current().is_disabled() {
            ::tracing::info_span!($span_name, $($fields)*)
        } else {
            ::tracing::Span::none()
        }
    }};
}

/// Same as [`child_span_info!`] at DEBUG level.
#[macro_export]
macro_rules! child_span_debug {
    ($span_name:literal) => {{
        if !::tracing::Span::current().is_disabled() {
            ::tracing::debug_span!($span_name)
        } else {
            ::tracing::Span::none()
        }
    }};
    ($span_name:literal, $($fields:tt)*) => {{
        if !::tracing::Span::current().is_disabled() {
            ::tracing::debug_span!($span_name, $($fields)*)
        } else {
            ::tracing::Span::none()
        }
    }};
}
