use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use http::StatusCode;
use http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use std::sync::Arc;
use symserve_api::{
    ARTIFACT_PATH_KEY, AccessCheck, ApiResult, ArtifactsViewMode, Authentication, Authorizer,
    Denial, FILE_NAME_KEY, MetadataEntry, Permission, symbol_key,
};
use symserve_core::auth::{BasicAuthorizer, UserAccount, UserDirectory};
use symserve_core::memory::{InMemoryBuild, InMemoryBuildRegistry, InMemoryMetadataIndex};
use symserve_core::{BufferedResponse, SymbolResolver, SymbolService};

const PREFIX: &str = "/app/symbols/";
const GUID: &str = "11112222333344445555666677778899";
const SIGNATURE: &str = "11112222333344445555666677778899f";

struct Harness {
    index: Arc<InMemoryMetadataIndex>,
    builds: Arc<InMemoryBuildRegistry>,
    service: SymbolService,
}

fn users() -> UserDirectory {
    UserDirectory::default()
        .with_user(UserAccount::new("alice", "alice-pw").grant("ProjA", Permission::ViewBuildRuntimeData))
        .with_user(UserAccount::new("bob", "bob-pw").grant("ProjB", Permission::ViewBuildRuntimeData))
        .with_user(UserAccount::new("carol", "carol-pw"))
}

fn harness_with(authorizer: Arc<dyn Authorizer>) -> Harness {
    let index = Arc::new(InMemoryMetadataIndex::new());
    let builds = Arc::new(InMemoryBuildRegistry::new());
    let resolver = SymbolResolver::new(index.clone(), builds.clone(), PREFIX);
    Harness {
        index,
        builds,
        service: SymbolService::new(resolver, authorizer).with_buffer_size(16),
    }
}

fn harness() -> Harness {
    harness_with(Arc::new(BasicAuthorizer::new(users(), "symbols")))
}

fn publish(h: &Harness, file_name: &str, build_id: i64, artifact_path: &str) {
    h.index.publish(
        MetadataEntry::new(symbol_key(GUID, file_name), build_id)
            .with(ARTIFACT_PATH_KEY, artifact_path),
    );
}

fn get(path: &str, credentials: Option<(&str, &str)>) -> http::Request<()> {
    let mut builder = http::Request::get(path);
    if let Some((name, password)) = credentials {
        let token = STANDARD.encode(format!("{name}:{password}"));
        builder = builder.header(AUTHORIZATION, format!("Basic {token}"));
    }
    builder.body(()).unwrap()
}

fn run(h: &Harness, request: &http::Request<()>) -> BufferedResponse {
    let mut sink = BufferedResponse::new();
    h.service.handle(request, &mut sink);
    sink
}

fn symbol_path(file_name: &str) -> String {
    format!("{PREFIX}{file_name}/{SIGNATURE}/{file_name}")
}

const ALICE: Option<(&str, &str)> = Some(("alice", "alice-pw"));

#[test]
fn test_index_probe_answers_without_lookup() {
    let h = harness();
    for path in ["/app/symbols/", "/app/symbols", "//app//symbols//"] {
        let response = run(&h, &get(path, None));
        assert_eq!(response.status(), Some(StatusCode::OK));
        assert_eq!(response.body_text(), "Symbol server available");
    }
    assert_eq!(h.index.lookup_count(), 0);
}

#[test]
fn test_compressed_request_without_entry_is_not_found() {
    let h = harness();
    let path = format!("/app/symbols/foo.pdb/{SIGNATURE}/foo.pd_");
    let response = run(&h, &get(&path, ALICE));
    assert_eq!(response.status(), Some(StatusCode::NOT_FOUND));
    assert_eq!(response.body_text(), "File not found");
}

#[test]
fn test_blocked_suffix_wins_over_index_contents() {
    let h = harness();
    h.builds
        .insert(InMemoryBuild::new(1, Some("ProjA")).with_artifact("file.ptr", b"x".to_vec()));
    publish(&h, "file.ptr", 1, "file.ptr");
    publish(&h, "foo.pd_", 1, "file.ptr");

    for path in [symbol_path("file.ptr"), symbol_path("foo.pd_")] {
        let response = run(&h, &get(&path, ALICE));
        assert_eq!(response.status(), Some(StatusCode::NOT_FOUND));
    }
    assert_eq!(h.index.lookup_count(), 0);
}

#[test]
fn test_authorized_download_streams_artifact() {
    let h = harness();
    let content: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
    let build = h.builds.insert(
        InMemoryBuild::new(10, Some("ProjA")).with_artifact("out/foo.pdb", content.clone()),
    );
    publish(&h, "foo.pdb", 10, "out/foo.pdb");

    let response = run(&h, &get(&symbol_path("foo.pdb"), ALICE));
    assert_eq!(response.status(), Some(StatusCode::OK));
    assert_eq!(response.body, content);
    assert!(response.aborted.is_none());

    let accesses = build.accesses();
    assert_eq!(accesses.len(), 1);
    assert_eq!(accesses[0].subject, "alice");
    assert_eq!(accesses[0].mode, ArtifactsViewMode::WithArchivesContent);
}

#[test]
fn test_request_file_name_case_and_discriminator_do_not_matter() {
    let h = harness();
    h.builds
        .insert(InMemoryBuild::new(10, Some("ProjA")).with_artifact("foo.pdb", b"pdb".to_vec()));
    publish(&h, "foo.pdb", 10, "foo.pdb");

    let path = format!("{PREFIX}FOO.PDB/{GUID}2/FOO.PDB");
    let response = run(&h, &get(&path, ALICE));
    assert_eq!(response.status(), Some(StatusCode::OK));
    assert_eq!(response.body, b"pdb");
}

#[test]
fn test_archived_artifact_is_served() {
    let h = harness();
    let build = h.builds.insert(InMemoryBuild::new(10, Some("ProjA")));
    build.add_archived_artifact("symbols.zip!/foo.pdb", b"zipped".to_vec());
    publish(&h, "foo.pdb", 10, "symbols.zip!/foo.pdb");

    let response = run(&h, &get(&symbol_path("foo.pdb"), ALICE));
    assert_eq!(response.status(), Some(StatusCode::OK));
    assert_eq!(response.body, b"zipped");
}

#[test]
fn test_legacy_entries_resolve_by_file_name() {
    let h = harness();
    h.builds
        .insert(InMemoryBuild::new(5, Some("ProjA")).with_artifact("old/foo.pdb", b"old".to_vec()));
    h.index.publish(
        MetadataEntry::new(GUID, 5)
            .with(FILE_NAME_KEY, "Foo.Pdb")
            .with(ARTIFACT_PATH_KEY, "old/foo.pdb"),
    );

    let response = run(&h, &get(&symbol_path("foo.pdb"), ALICE));
    assert_eq!(response.status(), Some(StatusCode::OK));
    assert_eq!(response.body, b"old");

    let response = run(&h, &get(&symbol_path("bar.pdb"), ALICE));
    assert_eq!(response.status(), Some(StatusCode::NOT_FOUND));
}

#[test]
fn test_deleted_build_is_not_found() {
    let h = harness();
    h.builds
        .insert(InMemoryBuild::new(10, Some("ProjA")).with_artifact("foo.pdb", b"pdb".to_vec()));
    publish(&h, "foo.pdb", 10, "foo.pdb");
    h.builds.remove(10);

    let path = format!("/app/symbols/foo.pdb/{SIGNATURE}/foo.pdb");
    let response = run(&h, &get(&path, ALICE));
    assert_eq!(response.status(), Some(StatusCode::NOT_FOUND));
    assert_eq!(response.body_text(), "File not found");
}

#[test]
fn test_misses_look_identical() {
    let h = harness();
    h.builds.insert(InMemoryBuild::new(2, None));
    h.index
        .publish(MetadataEntry::new(symbol_key(GUID, "corrupt.pdb"), 10));
    publish(&h, "orphan.pdb", 2, "orphan.pdb");

    let paths = [
        "/app/symbols/foo.pdb".to_string(),
        format!("{PREFIX}foo.pdb/x/foo.pdb"),
        symbol_path("unknown.pdb"),
        symbol_path("corrupt.pdb"),
        symbol_path("orphan.pdb"),
    ];
    for path in paths {
        let response = run(&h, &get(&path, ALICE));
        assert_eq!(response.status(), Some(StatusCode::NOT_FOUND), "{path}");
        assert_eq!(response.body_text(), "File not found", "{path}");
    }
}

#[test]
fn test_missing_credentials_keep_authorizer_challenge() {
    let h = harness();
    let build = h.builds.insert(
        InMemoryBuild::new(10, Some("ProjA")).with_artifact("foo.pdb", b"pdb".to_vec()),
    );
    publish(&h, "foo.pdb", 10, "foo.pdb");

    let response = run(&h, &get(&symbol_path("foo.pdb"), None));
    assert_eq!(response.status(), Some(StatusCode::UNAUTHORIZED));
    assert_eq!(response.headers[WWW_AUTHENTICATE], "Basic realm=\"symbols\"");
    assert_ne!(response.body, b"pdb");
    assert!(build.accesses().is_empty());
}

#[test]
fn test_user_without_permission_is_denied_even_if_artifact_exists() {
    let h = harness();
    let build = h.builds.insert(
        InMemoryBuild::new(10, Some("ProjA")).with_artifact("foo.pdb", b"pdb".to_vec()),
    );
    publish(&h, "foo.pdb", 10, "foo.pdb");

    for credentials in [("bob", "bob-pw"), ("carol", "carol-pw")] {
        let response = run(&h, &get(&symbol_path("foo.pdb"), Some(credentials)));
        assert_eq!(response.status(), Some(StatusCode::FORBIDDEN));
        assert!(!response.body.ends_with(b"pdb"));
    }
    assert!(build.accesses().is_empty());
}

struct TeapotAuthorizer;

impl Authorizer for TeapotAuthorizer {
    fn authenticate(
        &self,
        _request: &http::Request<()>,
        check: &AccessCheck,
    ) -> ApiResult<Authentication> {
        assert_eq!(check.permission, Permission::ViewBuildRuntimeData);
        let mut denial = Denial::new(StatusCode::IM_A_TEAPOT, format!("no {}", check.project_id));
        denial
            .headers
            .insert("x-denied-by", http::HeaderValue::from_static("teapot"));
        Ok(Authentication::Denied(denial))
    }
}

#[test]
fn test_denial_is_passed_through_unchanged() {
    let h = harness_with(Arc::new(TeapotAuthorizer));
    h.builds
        .insert(InMemoryBuild::new(10, Some("ProjA")).with_artifact("foo.pdb", b"pdb".to_vec()));
    publish(&h, "foo.pdb", 10, "foo.pdb");

    let response = run(&h, &get(&symbol_path("foo.pdb"), None));
    assert_eq!(response.status(), Some(StatusCode::IM_A_TEAPOT));
    assert_eq!(response.body_text(), "no ProjA");
    assert_eq!(response.headers["x-denied-by"], "teapot");
}

#[test]
fn test_artifact_purged_before_streaming_is_not_found() {
    let h = harness();
    let build = h.builds.insert(InMemoryBuild::new(10, Some("ProjA")));
    publish(&h, "foo.pdb", 10, "gone/foo.pdb");

    let response = run(&h, &get(&symbol_path("foo.pdb"), ALICE));
    assert_eq!(response.status(), Some(StatusCode::NOT_FOUND));
    assert_eq!(response.body_text(), "File not found");
    // The view was still opened for the authenticated user.
    assert_eq!(build.accesses().len(), 1);
}

#[test]
fn test_open_failure_is_internal_error_with_message() {
    let h = harness();
    let build = h.builds.insert(InMemoryBuild::new(10, Some("ProjA")));
    build.add_broken_artifact("foo.pdb", "storage unavailable");
    publish(&h, "foo.pdb", 10, "foo.pdb");

    let response = run(&h, &get(&symbol_path("foo.pdb"), ALICE));
    assert_eq!(response.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert!(response.body_text().contains("storage unavailable"));
}

#[test]
fn test_copy_failure_aborts_started_body() {
    let h = harness();
    let build = h.builds.insert(InMemoryBuild::new(10, Some("ProjA")));
    build.add_truncated_artifact("foo.pdb", vec![7u8; 100], "read failed");
    publish(&h, "foo.pdb", 10, "foo.pdb");

    let response = run(&h, &get(&symbol_path("foo.pdb"), ALICE));
    assert_eq!(response.status(), Some(StatusCode::OK));
    let reason = response.aborted.expect("body should be aborted");
    assert!(reason.contains("read failed"));
}

#[test]
fn test_index_failure_is_internal_error() {
    let h = harness();
    h.index.fail_with("index offline");

    let response = run(&h, &get(&symbol_path("foo.pdb"), ALICE));
    assert_eq!(response.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert!(response.body_text().contains("index offline"));
}

#[test]
fn test_concurrent_users_keep_their_own_identity() {
    let h = Arc::new(harness());
    let build_a = h.builds.insert(
        InMemoryBuild::new(1, Some("ProjA")).with_artifact("a.pdb", vec![b'a'; 4096]),
    );
    let build_b = h.builds.insert(
        InMemoryBuild::new(2, Some("ProjB")).with_artifact("b.pdb", vec![b'b'; 4096]),
    );
    publish(&h, "a.pdb", 1, "a.pdb");
    publish(&h, "b.pdb", 2, "b.pdb");

    let mut workers = Vec::new();
    for round in 0..16 {
        let h = h.clone();
        workers.push(std::thread::spawn(move || {
            let (file, user, expected) = if round % 2 == 0 {
                ("a.pdb", ("alice", "alice-pw"), b'a')
            } else {
                ("b.pdb", ("bob", "bob-pw"), b'b')
            };
            let response = run(&h, &get(&symbol_path(file), Some(user)));
            assert_eq!(response.status(), Some(StatusCode::OK));
            assert!(response.body.iter().all(|&byte| byte == expected));
        }));
    }
    for worker in workers {
        worker.join().unwrap();
    }

    let a_subjects: Vec<_> = build_a.accesses().into_iter().map(|a| a.subject).collect();
    let b_subjects: Vec<_> = build_b.accesses().into_iter().map(|a| a.subject).collect();
    assert_eq!(a_subjects.len(), 8);
    assert_eq!(b_subjects.len(), 8);
    assert!(a_subjects.iter().all(|s| s == "alice"));
    assert!(b_subjects.iter().all(|s| s == "bob"));
}
