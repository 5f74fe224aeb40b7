use kinocheck_common::HarnessConfig;
use kinocheck_e2e::contract::{run_api_check, ApiCheck};
use kinocheck_e2e::{ApiContractChecker, ApiSession, FsReportSink};

fn live_config() -> Option<HarnessConfig> {
    let mut config = HarnessConfig::default();
    config.apply_env();
    config.api.key.as_ref()?;
    Some(config)
}

/// Live API smoke check
///
/// Sends the key check and the year filter to the real service.
///
/// Marked ignored because it needs network access and `KINOPOISK_API_KEY`.
#[tokio::test]
#[ignore]
async fn live_key_and_year_filter() {
    let Some(config) = live_config() else {
        eprintln!("Skipping: KINOPOISK_API_KEY is not set");
        return;
    };

    let session = ApiSession::from_config(&config).expect("build API session");
    let checker = ApiContractChecker::new(&session, config.report.body_preview_chars);
    let dir = tempfile::tempdir().expect("tempdir");
    let sink = FsReportSink::new(dir.path()).expect("evidence sink");

    let verdict = checker
        .check(&ApiCheck::KeyValid { limit: 1 }.query_spec())
        .await
        .expect("request sent");
    assert_eq!(verdict.status_code, 200, "body: {}", verdict.body_preview);
    assert!(verdict.schema_valid);

    let year = ApiCheck::Year { year: 2001, limit: 5 };
    let outcome = run_api_check(&checker, "live_year", &year, &sink)
        .await
        .unwrap_or_else(|e| panic!("year filter failed: {e}"));
    assert_eq!(outcome.notes.last().map(String::as_str), Some("5 records returned"));
}
