//! Integration-style tests for the build → sign → notify flow.
//!
//! These run the builder and the cascade against the hook mocks, with no
//! database — the transactional paths are thin wrappers over the same
//! pure functions exercised here.  Tests that need a live Postgres belong
//! in a separate, environment-gated suite.

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use hooks::mock::{MockDirectory, MockNotifier};
use hooks::NotificationKind;

use crate::audit::AuditEventKind;
use crate::builder::{build_workflow, BuildRequest};
use crate::cascade::apply_action;
use crate::engine::{dispatch_notifications, pending_closure_notifications};
use crate::models::{
    ActorContext, ClientMeta, Decision, SignaturePayload, WorkflowStatus, WorkflowTree,
};
use crate::topology::{GroupSpec, LineSpec, TopologySpec};

fn certificate_request() -> BuildRequest {
    BuildRequest {
        reference: "EXP-2024-0042".into(),
        subject: "Controlled-substances certificate".into(),
        message: Some("Please sign certificate CERT-42".into()),
        context: json!({ "certificate": "CERT-42" }),
        expires_in_days: Some(30),
        topology: TopologySpec {
            lines: vec![
                LineSpec {
                    groups: vec![GroupSpec {
                        role: "DIRECTOR".into(),
                        first_responder_sufficient: false,
                    }],
                },
                LineSpec {
                    groups: vec![GroupSpec {
                        role: "EXTERNAL_VERIFIER".into(),
                        first_responder_sufficient: true,
                    }],
                },
            ],
        },
    }
}

fn payload_for(tree: &WorkflowTree) -> SignaturePayload {
    SignaturePayload {
        method: "ELECTRONIC".into(),
        timestamp: Utc::now(),
        content_hash: "cafe".into(),
        client: ClientMeta {
            ip_address: Some("10.0.0.7".into()),
            user_agent: Some("signflow-test".into()),
        },
        workflow_code: tree.workflow.public_code.clone(),
    }
}

#[tokio::test]
async fn full_two_line_flow_notifies_and_completes() {
    let director = Uuid::new_v4();
    let (v1, v2) = (Uuid::new_v4(), Uuid::new_v4());
    let directory = MockDirectory::new()
        .with_role("DIRECTOR", vec![director])
        .with_role("EXTERNAL_VERIFIER", vec![v1, v2]);
    let notifier = MockNotifier::new();
    let sender = ActorContext::new(Uuid::new_v4());

    let out = build_workflow(&sender, certificate_request(), &directory, Utc::now())
        .await
        .expect("build");
    let mut tree = out.tree;

    // Creation alerts line 1 only.
    dispatch_notifications(&notifier, &out.notifications).await;
    assert_eq!(notifier.notified_signers(), vec![director]);

    // Director signs; line 2 activates and both verifiers are alerted.
    let p = payload_for(&tree);
    let outcome = apply_action(
        &mut tree,
        &ActorContext::new(director),
        Decision::Sign,
        p,
        Utc::now(),
    )
    .expect("director signs");
    assert_eq!(outcome.workflow_status, WorkflowStatus::InProgress);
    dispatch_notifications(&notifier, &outcome.notifications).await;
    assert_eq!(notifier.sent_count(), 3);
    assert!(notifier
        .sent
        .lock()
        .unwrap()
        .iter()
        .all(|n| n.kind == NotificationKind::SignaturePending));

    // First verifier wins the OR group and completes the workflow.
    let p = payload_for(&tree);
    let outcome = apply_action(
        &mut tree,
        &ActorContext::new(v2),
        Decision::Sign,
        p,
        Utc::now(),
    )
    .expect("verifier signs");
    assert_eq!(outcome.workflow_status, WorkflowStatus::Completed);
    assert!(outcome.finally_authorized);
    assert!(outcome
        .audit
        .iter()
        .any(|r| r.event == AuditEventKind::WorkflowCompleted));
}

#[tokio::test]
async fn failing_notifier_never_fails_the_flow() {
    let director = Uuid::new_v4();
    let directory = MockDirectory::new()
        .with_role("DIRECTOR", vec![director])
        .with_role("EXTERNAL_VERIFIER", vec![Uuid::new_v4()]);
    let notifier = MockNotifier::failing("smtp down");
    let sender = ActorContext::new(Uuid::new_v4());

    let out = build_workflow(&sender, certificate_request(), &directory, Utc::now())
        .await
        .expect("build");

    // Delivery fails; dispatch just logs and returns.
    dispatch_notifications(&notifier, &out.notifications).await;
    assert_eq!(notifier.sent_count(), 1);

    // The tree is untouched by delivery failure.
    assert_eq!(out.tree.workflow.status, WorkflowStatus::InProgress);
}

#[tokio::test]
async fn closure_notices_reach_only_already_alerted_pending_signers() {
    let director = Uuid::new_v4();
    let (v1, v2) = (Uuid::new_v4(), Uuid::new_v4());
    let directory = MockDirectory::new()
        .with_role("DIRECTOR", vec![director])
        .with_role("EXTERNAL_VERIFIER", vec![v1, v2]);
    let sender = ActorContext::new(Uuid::new_v4());

    let out = build_workflow(&sender, certificate_request(), &directory, Utc::now())
        .await
        .expect("build");
    let mut tree = out.tree;

    // Only line 1 has been alerted so far; closing now reaches just the
    // director.
    let notes = pending_closure_notifications(&tree);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].signer_id, director);
    assert_eq!(notes[0].kind, NotificationKind::WorkflowClosed);

    // After line 2 activates, its alerted verifiers are the pending set.
    let p = payload_for(&tree);
    apply_action(
        &mut tree,
        &ActorContext::new(director),
        Decision::Sign,
        p,
        Utc::now(),
    )
    .expect("director signs");

    let signers: Vec<Uuid> = pending_closure_notifications(&tree)
        .iter()
        .map(|n| n.signer_id)
        .collect();
    assert_eq!(signers.len(), 2);
    assert!(signers.contains(&v1) && signers.contains(&v2));
}

#[tokio::test]
async fn audit_attribution_carries_explicit_actor_context() {
    let director = Uuid::new_v4();
    let directory = MockDirectory::new()
        .with_role("DIRECTOR", vec![director])
        .with_role("EXTERNAL_VERIFIER", vec![Uuid::new_v4()]);
    let client = ClientMeta {
        ip_address: Some("192.0.2.10".into()),
        user_agent: Some("Mozilla/5.0".into()),
    };
    let actor = ActorContext::new(director).with_client(client.clone());
    let sender = ActorContext::new(Uuid::new_v4());

    let out = build_workflow(&sender, certificate_request(), &directory, Utc::now())
        .await
        .unwrap();
    let mut tree = out.tree;

    let p = payload_for(&tree);
    let outcome = apply_action(&mut tree, &actor, Decision::Sign, p, Utc::now()).unwrap();

    for record in &outcome.audit {
        assert_eq!(record.user_id, Some(director));
        assert_eq!(record.client, client);
    }
}
