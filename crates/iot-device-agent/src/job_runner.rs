//! Jobs worker: claims pending executions one at a time, "runs" them and
//! reports the outcome.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;

use iot_mqtt_channel::channel::Channel;
use iot_mqtt_channel::{IotJobsRpcClient, MqttResult, RpcError};
use iot_protocol::jobs::{
    JobExecutionData, JobStatus, NextJobExecutionChangedEvent,
    NextJobExecutionChangedSubscriptionRequest, RejectedError,
    StartNextPendingJobExecutionRequest, UpdateJobExecutionRequest,
};

type JobsResult<T> = Result<T, RpcError<RejectedError>>;

pub struct JobRunner<C: Channel> {
    rpc: IotJobsRpcClient<C>,
    thing_name: String,
    simulated_duration: Duration,
}

impl<C: Channel> JobRunner<C> {
    pub fn new(
        rpc: IotJobsRpcClient<C>,
        thing_name: impl Into<String>,
        simulated_duration: Duration,
    ) -> Self {
        Self {
            rpc,
            thing_name: thing_name.into(),
            simulated_duration,
        }
    }

    /// Drain the queue at start-up, then again whenever the service
    /// announces a new next execution.
    pub async fn run(&self) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let request = NextJobExecutionChangedSubscriptionRequest::new(&self.thing_name);
        let subscribed = self
            .rpc
            .subscribe_to_next_job_execution_changed_events(
                &request,
                move |event: MqttResult<NextJobExecutionChangedEvent>| match event {
                    Ok(event) => {
                        let _ = tx.send(event.execution.is_some());
                    }
                    Err(e) => tracing::warn!(error = %e, "malformed notify-next event"),
                },
            )
            .await;
        let handle = match subscribed {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(error = %e, "failed to subscribe to job notifications");
                return;
            }
        };

        self.drain().await;
        while let Some(has_next) = rx.recv().await {
            // Coalesce a burst of notifications into one pass.
            let mut has_next = has_next;
            while let Ok(more) = rx.try_recv() {
                has_next |= more;
            }
            if has_next {
                self.drain().await;
            }
        }

        if let Err(e) = self.rpc.unsubscribe(&handle).await {
            tracing::debug!(error = %e, "failed to drop job subscription");
        }
    }

    async fn drain(&self) {
        match self.process_pending().await {
            Ok(0) => tracing::debug!("no pending jobs"),
            Ok(count) => tracing::info!(count, "pending jobs processed"),
            Err(e) => tracing::warn!(error = %e, "job processing stopped"),
        }
    }

    /// Start, execute and finish executions until none is left. Returns how
    /// many were processed.
    pub async fn process_pending(&self) -> JobsResult<usize> {
        let mut processed = 0;
        loop {
            let started = self
                .rpc
                .start_next_pending_job_execution(StartNextPendingJobExecutionRequest::new(
                    &self.thing_name,
                ))
                .await?;
            let Some(execution) = started.execution else {
                return Ok(processed);
            };
            let Some(job_id) = execution.job_id.clone() else {
                tracing::warn!("started execution has no job id");
                return Ok(processed);
            };

            tracing::info!(
                job_id = %job_id,
                execution_number = ?execution.execution_number,
                "job started"
            );
            let (status, details) = self.execute(&execution).await;

            let mut update = UpdateJobExecutionRequest::new(&self.thing_name, &job_id, status);
            update.expected_version = execution.version_number;
            update.execution_number = execution.execution_number;
            update.status_details = Some(details);
            self.rpc.update_job_execution(update).await?;

            tracing::info!(job_id = %job_id, status = ?status, "job finished");
            processed += 1;
        }
    }

    async fn execute(&self, execution: &JobExecutionData) -> (JobStatus, HashMap<String, String>) {
        let Some(document) = &execution.job_document else {
            return (JobStatus::Failed, details("missing job document"));
        };
        if let Some(operation) = document.get("operation").and_then(Value::as_str) {
            tracing::debug!(operation = %operation, "executing job");
        }
        tokio::time::sleep(self.simulated_duration).await;
        (JobStatus::Succeeded, details("completed"))
    }
}

fn details(reason: &str) -> HashMap<String, String> {
    HashMap::from([("reason".to_string(), reason.to_string())])
}
