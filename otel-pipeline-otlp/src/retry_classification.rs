//! Maps protocol failures onto [`RetryErrorType`], honouring server
//! throttling hints: the HTTP `Retry-After` header and gRPC `RetryInfo`
//! status details.
use crate::retry::RetryErrorType;
use std::time::Duration;

/// Server hints above this are clamped.
const MAX_THROTTLE_HINT: Duration = Duration::from_secs(600);

/// HTTP status classification.
pub mod http {
    use super::*;
    use std::time::SystemTime;

    /// Classify a non-success HTTP status.
    ///
    /// `retry_after` is the raw `Retry-After` header, either delay seconds
    /// (`"120"`) or an HTTP date (`"Fri, 31 Dec 1999 23:59:59 GMT"`).
    pub fn classify_http_error(status_code: u16, retry_after: Option<&str>) -> RetryErrorType {
        let hint = retry_after.and_then(parse_retry_after);
        match status_code {
            429 | 502 | 503 | 504 => match hint {
                Some(delay) => RetryErrorType::Throttled(delay),
                None => RetryErrorType::Retryable,
            },
            500..=599 => RetryErrorType::Retryable,
            400..=499 => RetryErrorType::NonRetryable,
            _ => RetryErrorType::Retryable,
        }
    }

    pub(crate) fn parse_retry_after(retry_after: &str) -> Option<Duration> {
        let retry_after = retry_after.trim();
        if let Ok(seconds) = retry_after.parse::<u64>() {
            return Some(Duration::from_secs(seconds).min(MAX_THROTTLE_HINT));
        }
        let date = httpdate::parse_http_date(retry_after).ok()?;
        // A date in the past means "retry now".
        let delay = date
            .duration_since(SystemTime::now())
            .unwrap_or(Duration::ZERO);
        Some(delay.min(MAX_THROTTLE_HINT))
    }
}

/// gRPC status classification.
#[cfg(feature = "grpc-tonic")]
pub mod grpc {
    use super::*;
    use tonic_types::StatusExt;

    /// Classify a failed gRPC call, reading `RetryInfo` from the status details.
    pub fn classify_tonic_status(status: &tonic::Status) -> RetryErrorType {
        let retry_delay = status
            .get_details_retry_info()
            .and_then(|retry_info| retry_info.retry_delay);
        classify_grpc_error(status.code(), retry_delay)
    }

    fn classify_grpc_error(code: tonic::Code, retry_delay: Option<Duration>) -> RetryErrorType {
        match code {
            // Retryable only when the server says when to come back.
            tonic::Code::ResourceExhausted => match retry_delay {
                Some(delay) => RetryErrorType::Throttled(
                    Duration::from_secs(delay.as_secs()).min(MAX_THROTTLE_HINT),
                ),
                None => RetryErrorType::NonRetryable,
            },

            tonic::Code::Cancelled
            | tonic::Code::DeadlineExceeded
            | tonic::Code::Aborted
            | tonic::Code::OutOfRange
            | tonic::Code::Unavailable
            | tonic::Code::DataLoss => RetryErrorType::Retryable,

            tonic::Code::Ok
            | tonic::Code::Unknown
            | tonic::Code::InvalidArgument
            | tonic::Code::NotFound
            | tonic::Code::AlreadyExists
            | tonic::Code::PermissionDenied
            | tonic::Code::FailedPrecondition
            | tonic::Code::Unimplemented
            | tonic::Code::Internal
            | tonic::Code::Unauthenticated => RetryErrorType::NonRetryable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::http::{classify_http_error, parse_retry_after};
    use super::*;
    use rstest::rstest;
    use std::time::SystemTime;

    #[rstest]
    #[case(429, Some("30"), RetryErrorType::Throttled(Duration::from_secs(30)))]
    #[case(429, Some("900"), RetryErrorType::Throttled(Duration::from_secs(600)))]
    #[case(429, Some("soon"), RetryErrorType::Retryable)]
    #[case(429, None, RetryErrorType::Retryable)]
    #[case(503, Some("5"), RetryErrorType::Throttled(Duration::from_secs(5)))]
    #[case(503, None, RetryErrorType::Retryable)]
    #[case(502, Some("1"), RetryErrorType::Throttled(Duration::from_secs(1)))]
    #[case(500, Some("5"), RetryErrorType::Retryable)]
    #[case(599, None, RetryErrorType::Retryable)]
    #[case(400, None, RetryErrorType::NonRetryable)]
    #[case(401, Some("5"), RetryErrorType::NonRetryable)]
    #[case(404, None, RetryErrorType::NonRetryable)]
    fn http_status_classification(
        #[case] status: u16,
        #[case] retry_after: Option<&str>,
        #[case] expected: RetryErrorType,
    ) {
        assert_eq!(classify_http_error(status, retry_after), expected);
    }

    #[test]
    fn retry_after_accepts_http_dates() {
        let in_a_minute = SystemTime::now() + Duration::from_secs(60);
        let delay = parse_retry_after(&httpdate::fmt_http_date(in_a_minute)).unwrap();
        assert!(delay > Duration::from_secs(55) && delay <= Duration::from_secs(60));

        let past = parse_retry_after("Fri, 31 Dec 1999 23:59:59 GMT");
        assert_eq!(past, Some(Duration::ZERO));
    }

    #[cfg(feature = "grpc-tonic")]
    mod grpc_tests {
        use super::super::grpc::classify_tonic_status;
        use super::*;
        use tonic::Code;
        use tonic_types::{ErrorDetails, StatusExt};

        #[rstest]
        #[case(Code::Cancelled, RetryErrorType::Retryable)]
        #[case(Code::DeadlineExceeded, RetryErrorType::Retryable)]
        #[case(Code::Aborted, RetryErrorType::Retryable)]
        #[case(Code::OutOfRange, RetryErrorType::Retryable)]
        #[case(Code::Unavailable, RetryErrorType::Retryable)]
        #[case(Code::DataLoss, RetryErrorType::Retryable)]
        #[case(Code::ResourceExhausted, RetryErrorType::NonRetryable)]
        #[case(Code::InvalidArgument, RetryErrorType::NonRetryable)]
        #[case(Code::Unauthenticated, RetryErrorType::NonRetryable)]
        #[case(Code::Internal, RetryErrorType::NonRetryable)]
        #[case(Code::Unknown, RetryErrorType::NonRetryable)]
        fn plain_status_classification(#[case] code: Code, #[case] expected: RetryErrorType) {
            assert_eq!(
                classify_tonic_status(&tonic::Status::new(code, "failed")),
                expected
            );
        }

        #[rstest]
        #[case(Duration::from_secs(30), Duration::from_secs(30))]
        #[case(Duration::from_millis(5500), Duration::from_secs(5))]
        #[case(Duration::from_secs(3600), Duration::from_secs(600))]
        fn resource_exhausted_with_retry_info_is_throttled(
            #[case] retry_delay: Duration,
            #[case] expected: Duration,
        ) {
            let status = tonic::Status::with_error_details(
                Code::ResourceExhausted,
                "rate limited",
                ErrorDetails::with_retry_info(Some(retry_delay)),
            );
            assert_eq!(
                classify_tonic_status(&status),
                RetryErrorType::Throttled(expected)
            );
        }
    }
}
