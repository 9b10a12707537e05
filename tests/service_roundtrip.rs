mod common;

use std::os::unix::net::UnixListener;
use std::sync::Arc;
use std::time::Duration;

use common::{centered_face, matched, ready_state, sample_frame, temp_store, Reply, StubAnalyzer};
use faceguard::service::{ConfiguredEndpoint, Gateway};
use faceguard::{FaceAnalyzer, IdentityStore, ServiceClient};

/// Serve `connections` requests on a fresh socket, one thread per request.
fn spawn_gateway(gateway: Arc<Gateway>, connections: usize) -> (ServiceClient, tempfile::TempDir) {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("faceguard.sock");
    let listener = UnixListener::bind(&path).unwrap();

    std::thread::spawn(move || {
        for stream in listener.incoming().take(connections) {
            let gateway = Arc::clone(&gateway);
            let stream = stream.unwrap();
            std::thread::spawn(move || {
                gateway.serve_connection(stream, Duration::from_secs(2)).unwrap();
            });
        }
    });

    let client = ServiceClient::new(
        ConfiguredEndpoint(path),
        Duration::from_secs(2),
        Duration::from_secs(2),
    );
    (client, tmp)
}

#[test]
fn enroll_then_list_over_the_socket() {
    let (store, _store_dir) = temp_store();
    let store = Arc::new(store);
    let analyzer = Arc::new(StubAnalyzer::always(Reply::Ok(centered_face())));
    let gateway = Arc::new(Gateway::new(analyzer.clone(), store.clone()));
    let (client, _sock_dir) = spawn_gateway(gateway, 3);

    let sampled = client.analyze(&faceguard::protocol::AnalysisRequest::detect(sample_frame().jpeg)).unwrap();
    assert!(sampled.face_detected);

    let response = client.enroll("Alice", &sample_frame(), &ready_state()).unwrap();
    assert!(response.success, "{}", response.message);
    assert_eq!(response.message, "User 'Alice' registered successfully");

    let gallery = client.list_encodings().unwrap();
    assert_eq!(gallery.len(), 1);
    assert_eq!(gallery[0].name, "Alice");
    assert_eq!(Some(gallery[0].identity_id), response.identity_id);
}

#[test]
fn verify_and_profile_over_the_socket() {
    let (store, _store_dir) = temp_store();
    let alice = store.create_identity("Alice").unwrap();
    let store = Arc::new(store);
    let analyzer = Arc::new(StubAnalyzer::always(Reply::Ok(matched(alice.id, "Alice", 0.9, true))));
    let gateway = Arc::new(Gateway::new(analyzer, store.clone()));
    let (client, _sock_dir) = spawn_gateway(gateway, 2);

    let response = client.verify(&sample_frame()).unwrap();
    assert!(response.success);
    assert_eq!(response.message, "Welcome back, Alice!");

    let profile = client.profile(alice.id).unwrap();
    assert_eq!(profile.total_logins, 1);
    assert_eq!(profile.successful_logins, 1);
    assert!(profile.identity.last_login_at.is_some());
}

#[test]
fn large_gallery_is_fetched_page_by_page() {
    let (store, _store_dir) = temp_store();
    for i in 0..20 {
        let identity = store.create_identity(&format!("user-{i}")).unwrap();
        store.save_encoding(identity.id, &[0.1; 16], &[0xff, 0xd8]).unwrap();
    }
    let store = Arc::new(store);
    let analyzer = Arc::new(StubAnalyzer::always(Reply::Ok(centered_face())));
    let gateway = Arc::new(Gateway::new(analyzer, store.clone()));
    // 20 records in pages of 8
    let (client, _sock_dir) = spawn_gateway(gateway, 3);

    let gallery = client.list_encodings().unwrap();
    assert_eq!(gallery.len(), 20);
    assert_eq!(gallery, store.list_all_encodings().unwrap());
}
