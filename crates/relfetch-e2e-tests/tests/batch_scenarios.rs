use httpmock::prelude::*;
use relfetch_e2e_tests::{
    FixtureRepo, OWNER, controller, init_tracing, mock_missing_repo, release_path,
    setup_output_dir, sha256_hex, test_config, unix_now,
};
use relfetch_lib::cli::{FAILURE_GLYPH, SUCCESS_GLYPH, format_summary};
use relfetch_lib::release::RepoId;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn repo_id(repo: &str) -> RepoId {
    RepoId::new(OWNER, repo)
}

#[tokio::test]
async fn test_verified_download_is_installed() {
    init_tracing();
    let server = MockServer::start_async().await;
    let output = setup_output_dir().expect("Failed to create output dir");

    let content = b"#!/bin/sh\necho app 1.0\n";
    let fixture = FixtureRepo {
        repo: "app",
        asset_name: "app-1.0.AppImage",
        content,
        checksum_content: Some(format!("{}  app-1.0.AppImage\n", sha256_hex(content))),
    };
    fixture.mock_all(&server).await;

    let report = controller(test_config(&server, output.path()))
        .run_batch(&[repo_id("app")], 4)
        .await
        .expect("Batch should run");

    assert!(!report.any_failed(), "{report:?}");
    let outcome = &report.outcomes[0];
    assert!(outcome.message.contains("verified"));
    assert!(!outcome.message.contains("unverified"));

    let installed = output.path().join("app-1.0.AppImage");
    assert_eq!(std::fs::read(&installed).unwrap(), content);
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&installed).unwrap().permissions().mode();
        assert_eq!(mode & 0o100, 0o100, "installed file should be executable");
    }

    assert!(format_summary(&report).starts_with(SUCCESS_GLYPH));
}

#[tokio::test]
async fn test_digest_mismatch_fails_and_keeps_file() {
    init_tracing();
    let server = MockServer::start_async().await;
    let output = setup_output_dir().expect("Failed to create output dir");

    let content = b"tampered payload";
    let declared = sha256_hex(b"genuine payload");
    let fixture = FixtureRepo {
        repo: "app",
        asset_name: "app-1.0.AppImage",
        content,
        checksum_content: Some(format!("sha256:{declared}")),
    };
    fixture.mock_all(&server).await;

    let report = controller(test_config(&server, output.path()))
        .run_batch(&[repo_id("app")], 1)
        .await
        .expect("Batch should run");

    assert!(report.any_failed());
    let message = &report.outcomes[0].message;
    assert!(message.contains("Digest mismatch"), "{message}");
    assert!(message.contains(&declared));
    assert!(message.contains(&sha256_hex(content)));
    assert!(output.path().join("app-1.0.AppImage").exists());
    assert!(format_summary(&report).starts_with(FAILURE_GLYPH));
}

#[tokio::test]
async fn test_rate_limited_release_is_retried_after_reset() {
    init_tracing();
    let server = MockServer::start_async().await;
    let output = setup_output_dir().expect("Failed to create output dir");

    let content = b"rate limited app";
    let fixture = FixtureRepo {
        repo: "limited",
        asset_name: "limited.AppImage",
        content,
        checksum_content: None,
    };
    fixture.mock_downloads(&server).await;

    let reset = unix_now() + 2;
    let limited = server
        .mock_async(|when, then| {
            when.method(GET).path(release_path("limited"));
            then.status(429)
                .header("x-ratelimit-limit", "60")
                .header("x-ratelimit-remaining", "0")
                .header("x-ratelimit-reset", reset.to_string());
        })
        .await;

    let controller = Arc::new(controller(test_config(&server, output.path())));
    let started = Instant::now();
    let batch = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.run_batch(&[repo_id("limited")], 1).await })
    };

    let deadline = Instant::now() + Duration::from_secs(5);
    while limited.hits_async().await == 0 {
        assert!(Instant::now() < deadline, "release endpoint was never called");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    limited.delete_async().await;
    fixture.mock_release(&server).await;

    let report = batch
        .await
        .expect("Batch task should not panic")
        .expect("Batch should run");

    assert!(!report.any_failed(), "{report:?}");
    assert!(started.elapsed() >= Duration::from_secs(1));
    assert_eq!(
        std::fs::read(output.path().join("limited.AppImage")).unwrap(),
        content
    );
}

#[tokio::test]
async fn test_one_missing_release_does_not_stop_siblings() {
    init_tracing();
    let server = MockServer::start_async().await;
    let output = setup_output_dir().expect("Failed to create output dir");

    let first = FixtureRepo {
        repo: "first",
        asset_name: "first.AppImage",
        content: b"first",
        checksum_content: Some(sha256_hex(b"first")),
    };
    let third = FixtureRepo {
        repo: "third",
        asset_name: "third.AppImage",
        content: b"third",
        checksum_content: None,
    };
    first.mock_all(&server).await;
    third.mock_all(&server).await;
    let missing = mock_missing_repo(&server, "missing").await;

    let requested = vec![repo_id("first"), repo_id("missing"), repo_id("third")];
    let report = controller(test_config(&server, output.path()))
        .run_batch(&requested, 2)
        .await
        .expect("Batch should run");

    missing.assert_async().await;
    assert_eq!(report.outcomes.len(), 3);
    let order: Vec<RepoId> = report.outcomes.iter().map(|o| o.repo_id.clone()).collect();
    assert_eq!(order, requested);

    assert!(report.outcomes[0].success);
    assert!(!report.outcomes[1].success);
    assert!(report.outcomes[1].message.contains("No release found"));
    assert!(report.outcomes[2].success);
    assert!(report.any_failed());
}

#[tokio::test]
async fn test_downloads_never_exceed_concurrency_limit() {
    init_tracing();
    let server = MockServer::start_async().await;
    let output = setup_output_dir().expect("Failed to create output dir");

    let names: Vec<String> = (0..7).map(|i| format!("repo{i}")).collect();
    let assets: Vec<String> = names.iter().map(|n| format!("{n}.AppImage")).collect();
    for (name, asset) in names.iter().zip(&assets) {
        let fixture = FixtureRepo {
            repo: name,
            asset_name: asset,
            content: name.as_bytes(),
            checksum_content: None,
        };
        fixture.mock_release(&server).await;
        let body = name.as_bytes().to_vec();
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path(relfetch_e2e_tests::download_path(name, asset));
                then.status(200).delay(Duration::from_millis(40)).body(body);
            })
            .await;
    }

    for limit in [1, 3] {
        let controller = controller(test_config(&server, output.path()));
        let requested: Vec<RepoId> = names.iter().map(|n| repo_id(n)).collect();

        let report = controller
            .run_batch(&requested, limit)
            .await
            .expect("Batch should run");

        assert!(!report.any_failed(), "{report:?}");
        let peak = controller.tracker().peak_downloading();
        assert!(peak >= 1 && peak <= limit, "peak {peak} exceeds limit {limit}");
    }
}
