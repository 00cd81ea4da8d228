use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use wscast::edge::{
    CustomHeader, Distribution, DistributionConfig, EdgeControlPlane, EdgeError, EdgeResult,
    EnforcerPhase, GateEnforcer, HeaderRuleRequest, LifecycleEvent,
};

const DIST_ID: &str = "E12345";

#[derive(Clone, Copy, PartialEq)]
enum FailureMode {
    None,
    TransportOnFetch,
    ConflictOnUpdate,
}

/// In-memory stand-in for the edge control plane: versioned distribution
/// state with etag bumping and optional failure injection.
struct FakeControlPlane {
    distribution: Mutex<Distribution>,
    mode: FailureMode,
    fetch_calls: AtomicUsize,
    update_calls: AtomicUsize,
}

impl FakeControlPlane {
    fn new(mode: FailureMode) -> Arc<Self> {
        Arc::new(Self {
            distribution: Mutex::new(Distribution {
                id: DIST_ID.to_string(),
                etag: "etag-1".to_string(),
                config: DistributionConfig::default(),
            }),
            mode,
            fetch_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
        })
    }

    fn headers(&self) -> Vec<CustomHeader> {
        self.distribution.lock().unwrap().config.custom_headers.clone()
    }

    fn etag(&self) -> String {
        self.distribution.lock().unwrap().etag.clone()
    }
}

#[async_trait]
impl EdgeControlPlane for FakeControlPlane {
    async fn get_distribution(&self, id: &str) -> EdgeResult<Distribution> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.mode == FailureMode::TransportOnFetch {
            return Err(EdgeError::Transport("connection refused".to_string()));
        }
        let distribution = self.distribution.lock().unwrap();
        if distribution.id != id {
            return Err(EdgeError::NotFound(id.to_string()));
        }
        Ok(distribution.clone())
    }

    async fn update_distribution(
        &self,
        id: &str,
        config: DistributionConfig,
        if_match: &str,
    ) -> EdgeResult<Distribution> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if self.mode == FailureMode::ConflictOnUpdate {
            return Err(EdgeError::Conflict(id.to_string()));
        }
        let mut distribution = self.distribution.lock().unwrap();
        if distribution.etag != if_match {
            return Err(EdgeError::Conflict(id.to_string()));
        }
        distribution.config = config;
        distribution.etag = format!("etag-{}", self.update_calls.load(Ordering::SeqCst) + 1);
        Ok(distribution.clone())
    }
}

fn request(value: &str) -> HeaderRuleRequest {
    HeaderRuleRequest {
        distribution_id: DIST_ID.to_string(),
        custom_headers: vec![CustomHeader {
            header_name: "x-edge-secret".to_string(),
            header_value: value.to_string(),
        }],
    }
}

#[tokio::test]
async fn test_create_event_applies_header_rule() {
    let control_plane = FakeControlPlane::new(FailureMode::None);
    let mut enforcer = GateEnforcer::new(control_plane.clone());

    enforcer
        .handle_event(LifecycleEvent::Create(request("abc")))
        .await
        .unwrap();

    assert_eq!(enforcer.phase(), EnforcerPhase::Done);
    let headers = control_plane.headers();
    assert_eq!(headers.len(), 1);
    assert_eq!(headers[0].header_name, "x-edge-secret");
    assert_eq!(headers[0].header_value, "abc");
    // Accepted update bumped the version token
    assert_ne!(control_plane.etag(), "etag-1");
}

/// Submitting the same header rule twice leaves one entry, not two.
#[tokio::test]
async fn test_repeated_submission_is_idempotent() {
    let control_plane = FakeControlPlane::new(FailureMode::None);

    let mut first = GateEnforcer::new(control_plane.clone());
    first
        .handle_event(LifecycleEvent::Create(request("abc")))
        .await
        .unwrap();

    let mut second = GateEnforcer::new(control_plane.clone());
    second
        .handle_event(LifecycleEvent::Update(request("abc")))
        .await
        .unwrap();

    let headers = control_plane.headers();
    assert_eq!(headers.len(), 1);
    assert_eq!(headers[0].header_value, "abc");
}

#[tokio::test]
async fn test_update_event_replaces_header_value() {
    let control_plane = FakeControlPlane::new(FailureMode::None);

    let mut enforcer = GateEnforcer::new(control_plane.clone());
    enforcer
        .handle_event(LifecycleEvent::Create(request("old")))
        .await
        .unwrap();

    let mut enforcer = GateEnforcer::new(control_plane.clone());
    enforcer
        .handle_event(LifecycleEvent::Update(request("new")))
        .await
        .unwrap();

    let headers = control_plane.headers();
    assert_eq!(headers.len(), 1);
    assert_eq!(headers[0].header_value, "new");
}

#[tokio::test]
async fn test_merge_preserves_headers_owned_by_others() {
    let control_plane = FakeControlPlane::new(FailureMode::None);
    control_plane
        .distribution
        .lock()
        .unwrap()
        .config
        .custom_headers
        .push(CustomHeader {
            header_name: "x-operator-tag".to_string(),
            header_value: "keep-me".to_string(),
        });

    let mut enforcer = GateEnforcer::new(control_plane.clone());
    enforcer
        .handle_event(LifecycleEvent::Create(request("abc")))
        .await
        .unwrap();

    let headers = control_plane.headers();
    assert_eq!(headers.len(), 2);
    assert!(headers.iter().any(|h| h.header_value == "keep-me"));
}

/// A stale version token surfaces as a Conflict; the enforcer does not retry.
#[tokio::test]
async fn test_version_conflict_surfaces_and_fails() {
    let control_plane = FakeControlPlane::new(FailureMode::ConflictOnUpdate);
    let mut enforcer = GateEnforcer::new(control_plane.clone());

    let err = enforcer
        .handle_event(LifecycleEvent::Create(request("abc")))
        .await
        .unwrap_err();

    assert!(matches!(err, EdgeError::Conflict(_)));
    assert_eq!(enforcer.phase(), EnforcerPhase::Failed);
    // Exactly one attempt, no internal retry
    assert_eq!(control_plane.update_calls.load(Ordering::SeqCst), 1);
    assert!(control_plane.headers().is_empty());
}

#[tokio::test]
async fn test_transport_failure_on_fetch_fails_the_run() {
    let control_plane = FakeControlPlane::new(FailureMode::TransportOnFetch);
    let mut enforcer = GateEnforcer::new(control_plane.clone());

    let err = enforcer
        .handle_event(LifecycleEvent::Create(request("abc")))
        .await
        .unwrap_err();

    assert!(matches!(err, EdgeError::Transport(_)));
    assert_eq!(enforcer.phase(), EnforcerPhase::Failed);
    assert_eq!(control_plane.update_calls.load(Ordering::SeqCst), 0);
}

/// Delete passes through without touching the control plane.
#[tokio::test]
async fn test_delete_event_makes_no_control_plane_contact() {
    let control_plane = FakeControlPlane::new(FailureMode::None);
    let mut enforcer = GateEnforcer::new(control_plane.clone());

    enforcer.handle_event(LifecycleEvent::Delete).await.unwrap();

    assert_eq!(enforcer.phase(), EnforcerPhase::Done);
    assert_eq!(control_plane.fetch_calls.load(Ordering::SeqCst), 0);
    assert_eq!(control_plane.update_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unknown_distribution_is_not_found() {
    let control_plane = FakeControlPlane::new(FailureMode::None);
    let mut enforcer = GateEnforcer::new(control_plane.clone());

    let err = enforcer
        .handle_event(LifecycleEvent::Create(HeaderRuleRequest {
            distribution_id: "E99999".to_string(),
            custom_headers: request("abc").custom_headers,
        }))
        .await
        .unwrap_err();

    assert!(matches!(err, EdgeError::NotFound(_)));
    assert_eq!(enforcer.phase(), EnforcerPhase::Failed);
}

#[tokio::test]
async fn test_empty_header_name_is_rejected_before_submit() {
    let control_plane = FakeControlPlane::new(FailureMode::None);
    let mut enforcer = GateEnforcer::new(control_plane.clone());

    let err = enforcer
        .handle_event(LifecycleEvent::Create(HeaderRuleRequest {
            distribution_id: DIST_ID.to_string(),
            custom_headers: vec![CustomHeader {
                header_name: String::new(),
                header_value: "abc".to_string(),
            }],
        }))
        .await
        .unwrap_err();

    assert!(matches!(err, EdgeError::InvalidConfig(_)));
    assert_eq!(enforcer.phase(), EnforcerPhase::Failed);
    assert_eq!(control_plane.update_calls.load(Ordering::SeqCst), 0);
}
