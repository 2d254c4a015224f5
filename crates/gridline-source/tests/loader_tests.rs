// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use gridline_source::{Loader, ResponseCache, SourceLocation};
use gridline_testkit::{DirectoryFaker, write_records_json};
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Response, Server};

fn json_response(body: String, status: u16) -> Response<std::io::Cursor<Vec<u8>>> {
    Response::from_string(body)
        .with_status_code(status)
        .with_header(
            Header::from_bytes("Content-Type", "application/json")
                .expect("valid content type header"),
        )
}

#[test]
fn loads_bare_array_from_file() -> Result<()> {
    let records = DirectoryFaker::new(9).records(12);
    let (_dir, path) = write_records_json(&records)?;

    let mut loader = Loader::new(Duration::from_secs(1), ResponseCache::default())?;
    let location = SourceLocation::parse(&path.display().to_string())?;
    let loaded = loader.load(&location)?;
    assert_eq!(loaded, records);
    assert_eq!(loader.cache().len(), 1);
    Ok(())
}

#[test]
fn missing_file_error_names_the_path() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("absent.json");
    let mut loader = Loader::new(Duration::from_secs(1), ResponseCache::default())?;
    let error = loader
        .load(&SourceLocation::File(path.clone()))
        .expect_err("missing file should fail");
    let message = format!("{error:#}");
    assert!(message.contains("absent.json"));
    assert!(message.contains("--data"));
    assert!(loader.cache().is_empty());
    Ok(())
}

#[test]
fn duplicate_ids_fail_the_load() -> Result<()> {
    let mut records = DirectoryFaker::new(2).records(3);
    records[2].id = records[0].id;
    let (_dir, path) = write_records_json(&records)?;

    let mut loader = Loader::new(Duration::from_secs(1), ResponseCache::default())?;
    let error = loader
        .load(&SourceLocation::File(path))
        .expect_err("duplicate ids should fail");
    assert!(format!("{error:#}").contains("duplicate record id"));
    Ok(())
}

#[test]
fn envelope_over_http_is_cached_until_refetch() -> Result<()> {
    let records = DirectoryFaker::new(4).records(5);
    let envelope = serde_json::json!({
        "data": records,
        "total": 5,
        "page": 1,
        "pageSize": 20,
        "totalPages": 1,
    })
    .to_string();

    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let url = format!("http://{}/api/users", server.server_addr());

    let handle = thread::spawn(move || {
        for _ in 0..2 {
            let request = server.recv().expect("request expected");
            assert_eq!(request.url(), "/api/users");
            request
                .respond(json_response(envelope.clone(), 200))
                .expect("response should succeed");
        }
    });

    let mut loader = Loader::new(Duration::from_secs(1), ResponseCache::default())?;
    let location = SourceLocation::parse(&url)?;
    assert_eq!(loader.load(&location)?, records);
    // Served from the cache: the mock only answers twice.
    assert_eq!(loader.load(&location)?, records);
    assert_eq!(loader.refetch(&location)?, records);

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn disabled_cache_fetches_every_time() -> Result<()> {
    let body = serde_json::to_string(&DirectoryFaker::new(8).records(2))?;
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let url = format!("http://{}/users.json", server.server_addr());

    let handle = thread::spawn(move || {
        let mut served = 0;
        for _ in 0..2 {
            let request = server.recv().expect("request expected");
            request
                .respond(json_response(body.clone(), 200))
                .expect("response should succeed");
            served += 1;
        }
        served
    });

    let mut loader = Loader::new(Duration::from_secs(1), ResponseCache::disabled())?;
    let location = SourceLocation::parse(&url)?;
    loader.load(&location)?;
    loader.load(&location)?;
    assert!(loader.cache().is_empty());

    let served = handle.join().expect("server thread should join");
    assert_eq!(served, 2);
    Ok(())
}

#[test]
fn server_error_surfaces_message() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let url = format!("http://{}/api/users", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        request
            .respond(json_response(
                r#"{"error":"Failed to fetch users"}"#.to_owned(),
                500,
            ))
            .expect("response should succeed");
    });

    let mut loader = Loader::new(Duration::from_secs(1), ResponseCache::default())?;
    let error = loader
        .load(&SourceLocation::parse(&url)?)
        .expect_err("500 should fail");
    assert_eq!(error.to_string(), "server error (500): Failed to fetch users");
    assert!(loader.cache().is_empty());

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn unreachable_server_error_is_actionable() -> Result<()> {
    let mut loader = Loader::new(Duration::from_millis(50), ResponseCache::default())?;
    let error = loader
        .load(&SourceLocation::parse("http://127.0.0.1:1/api/users")?)
        .expect_err("unreachable endpoint should fail");
    assert!(error.to_string().contains("cannot reach"));
    Ok(())
}

#[test]
fn zero_timeout_is_rejected() {
    let error = Loader::new(Duration::ZERO, ResponseCache::default())
        .expect_err("zero timeout should fail");
    assert!(error.to_string().contains("[source].timeout"));
}
