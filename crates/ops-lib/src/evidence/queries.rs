//! Query texts for the log-analytics backend

/// Predicate matching error lines in any service's log stream
pub const ERROR_PATTERN: &str = "/ERROR|Error|Exception/";

/// Count error lines in one service's log stream; result column `errors`
pub fn error_count(service: &str) -> String {
    format!(
        "fields @timestamp, @message, @logStream \
         | filter @message like {ERROR_PATTERN} \
         | filter @logStream like /{service}/ \
         | stats count() as errors"
    )
}

/// Most recent error lines across all streams
pub fn recent_errors(limit: u32) -> String {
    format!(
        "fields @timestamp, @message, @logStream \
         | filter @message like {ERROR_PATTERN} \
         | sort @timestamp desc \
         | limit {limit}"
    )
}

/// Most recent error lines for one service
pub fn service_errors(service: &str, limit: u32) -> String {
    format!(
        "fields @timestamp, @message, @logStream \
         | filter @message like {ERROR_PATTERN} \
         | filter @logStream like /{service}/ \
         | sort @timestamp desc \
         | limit {limit}"
    )
}

/// Request URIs ranked by hit count; result columns `requestURI`, `hits`
pub fn top_endpoints(limit: u32) -> String {
    format!(
        "fields @timestamp, requestURI \
         | filter ispresent(requestURI) \
         | stats count() as hits by requestURI \
         | sort hits desc \
         | limit {limit}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_count_filters_by_stream() {
        let q = error_count("orders");
        assert!(q.contains("@logStream like /orders/"));
        assert!(q.contains("like /ERROR|Error|Exception/"));
        assert!(q.ends_with("stats count() as errors"));
    }

    #[test]
    fn test_limits_are_applied() {
        assert!(recent_errors(50).ends_with("limit 50"));
        assert!(service_errors("users", 5).ends_with("limit 5"));
        assert!(top_endpoints(10).contains("sort hits desc | limit 10"));
    }
}
