use crate::HttpStatusCode;

/// **VALUE**: Verifies the status ranges used to split success from client/server failures.
///
/// **WHY THIS MATTERS**: The HTTP client decides whether a response is a failure from
/// `is_success()`. An off-by-one here turns a 300 redirect into a success or a 299 into an error.
///
/// **BUG THIS CATCHES**: Would catch inclusive/exclusive range mistakes at the boundaries.
#[test]
fn given_boundary_codes_when_categorized_then_ranges_are_half_open() {
    // GIVEN / WHEN / THEN: Each boundary lands in exactly one bucket
    assert!(HttpStatusCode(200).is_success());
    assert!(HttpStatusCode(299).is_success());
    assert!(!HttpStatusCode(300).is_success());

    assert!(HttpStatusCode(400).is_client_error());
    assert!(HttpStatusCode(499).is_client_error());
    assert!(!HttpStatusCode(500).is_client_error());

    assert!(HttpStatusCode(500).is_server_error());
    assert!(HttpStatusCode(599).is_server_error());
    assert!(!HttpStatusCode(600).is_server_error());
}

/// **VALUE**: Verifies that only the well-known transient codes are flagged transient.
///
/// **WHY THIS MATTERS**: The default retry configuration is seeded from this list.
/// Flagging 404 or 422 as transient would make the client hammer the backend with
/// requests that can never succeed.
///
/// **BUG THIS CATCHES**: Would catch permanent client errors sneaking into the transient set.
#[test]
fn given_status_codes_when_checking_transient_then_only_temporary_failures_match() {
    // GIVEN: Transient and permanent codes
    let transient = [408, 429, 500, 502, 503, 504];
    let permanent = [400, 401, 403, 404, 422, 501];

    // THEN: Classification matches
    for code in transient {
        assert!(HttpStatusCode(code).is_transient(), "{code} should be transient");
    }
    for code in permanent {
        assert!(!HttpStatusCode(code).is_transient(), "{code} should not be transient");
    }
}
