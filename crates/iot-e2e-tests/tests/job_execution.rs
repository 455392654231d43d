//! End-to-end tests for the job runner against the simulated Jobs service.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use helpers::{Harness, THING, eventually};
use iot_device_agent::job_runner::JobRunner;
use iot_mqtt_channel::RpcError;
use iot_protocol::jobs::{
    DescribeJobExecutionRequest, GetPendingJobExecutionsRequest, JobStatus, RejectedErrorCode,
    UpdateJobExecutionRequest,
};
use serde_json::{Value, json};

fn runner(harness: &Harness) -> JobRunner<iot_mqtt_channel::MockChannel> {
    JobRunner::new(harness.jobs_rpc(), THING, Duration::from_millis(5))
}

#[tokio::test]
async fn e2e_queued_jobs_run_in_order() {
    let harness = Harness::start();
    harness.queue_job(THING, "reboot-1", json!({"operation": "reboot"}));
    harness.queue_job(THING, "upgrade-2", json!({"operation": "upgrade", "version": "2.0.0"}));

    let processed = runner(&harness).process_pending().await.unwrap();
    assert_eq!(processed, 2);

    let finished = harness.aws.finished_jobs();
    let order: Vec<_> = finished
        .iter()
        .map(|(id, status, _)| (id.as_str(), status.as_str()))
        .collect();
    assert_eq!(order, vec![("reboot-1", "SUCCEEDED"), ("upgrade-2", "SUCCEEDED")]);
    assert_eq!(finished[0].2["expectedVersion"], 2);

    let pending = harness
        .jobs_rpc()
        .get_pending_job_executions(GetPendingJobExecutionsRequest::new(THING))
        .await
        .unwrap();
    assert!(pending.queued_jobs.unwrap_or_default().is_empty());
    assert!(pending.in_progress_jobs.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn e2e_job_without_document_fails() {
    let harness = Harness::start();
    harness.queue_job(THING, "broken", Value::Null);

    runner(&harness).process_pending().await.unwrap();

    let finished = harness.aws.finished_jobs();
    assert_eq!(finished[0].1, "FAILED");
    assert_eq!(finished[0].2["statusDetails"]["reason"], "missing job document");

    let described = harness
        .jobs_rpc()
        .describe_job_execution(DescribeJobExecutionRequest::new(THING, "broken"))
        .await
        .unwrap();
    assert_eq!(described.execution.unwrap().status, Some(JobStatus::Failed));
}

#[tokio::test]
async fn e2e_runner_picks_up_new_jobs() {
    let harness = Harness::start();
    let jobs = runner(&harness);
    let task = tokio::spawn(async move { jobs.run().await });

    eventually("notify-next subscription", || {
        harness.mqtt.is_subscribed_to("$aws/things/rpi-001/jobs/notify-next")
    })
    .await;
    // Let the start-up pass finish on an empty queue.
    eventually("start-up pass", || {
        !harness
            .mqtt
            .published_to("$aws/things/rpi-001/jobs/start-next")
            .is_empty()
    })
    .await;

    harness.queue_job(THING, "late-job", json!({"operation": "collect-logs"}));

    let aws = Arc::clone(&harness.aws);
    eventually("late job to finish", move || aws.finished_jobs().len() == 1).await;
    assert_eq!(harness.aws.finished_jobs()[0].0, "late-job");
    task.abort();
}

#[tokio::test]
async fn e2e_updating_unknown_execution_is_rejected() {
    let harness = Harness::start();
    let err = harness
        .jobs_rpc()
        .update_job_execution(UpdateJobExecutionRequest::new(
            THING,
            "ghost",
            JobStatus::Succeeded,
        ))
        .await
        .unwrap_err();

    match err {
        RpcError::Rejected(rejected) => {
            assert_eq!(rejected.code, Some(RejectedErrorCode::ResourceNotFound));
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}
