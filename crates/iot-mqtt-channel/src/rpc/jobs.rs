use std::time::Duration;

use rumqttc::QoS;

use iot_protocol::jobs::*;
use iot_protocol::topics;

use super::{DEFAULT_RPC_TIMEOUT, RpcEngine, RpcError, assign_token};
use crate::channel::Channel;
use crate::error::{MqttResult, require};
use crate::jobs::IotJobsClient;
use crate::router::SubscriptionHandle;
use crate::service::MqttServiceClient;

type JobsResult<T> = Result<T, RpcError<RejectedError>>;

/// Awaitable Jobs operations.
pub struct IotJobsRpcClient<C: Channel> {
    jobs: IotJobsClient<C>,
    engine: RpcEngine<C>,
}

impl<C: Channel> IotJobsRpcClient<C> {
    pub fn new(service: MqttServiceClient<C>) -> Self {
        Self::with_timeout(service, DEFAULT_RPC_TIMEOUT)
    }

    pub fn with_timeout(service: MqttServiceClient<C>, timeout: Duration) -> Self {
        Self {
            jobs: IotJobsClient::new(service.clone()),
            engine: RpcEngine::new(service, timeout),
        }
    }

    pub fn jobs_client(&self) -> &IotJobsClient<C> {
        &self.jobs
    }

    pub async fn describe_job_execution(
        &self,
        mut request: DescribeJobExecutionRequest,
    ) -> JobsResult<DescribeJobExecutionResponse> {
        require("thing_name", &request.thing_name)?;
        require("job_id", &request.job_id)?;
        let token = assign_token(&mut request.client_token);
        let topic = topics::jobs_describe(&request.thing_name, &request.job_id);
        self.engine.call(topic, &request, token).await
    }

    pub async fn get_pending_job_executions(
        &self,
        mut request: GetPendingJobExecutionsRequest,
    ) -> JobsResult<GetPendingJobExecutionsResponse> {
        require("thing_name", &request.thing_name)?;
        let token = assign_token(&mut request.client_token);
        let topic = topics::jobs_get_pending(&request.thing_name);
        self.engine.call(topic, &request, token).await
    }

    /// Moves the next queued execution to IN_PROGRESS. The response carries no
    /// execution when the queue is empty.
    pub async fn start_next_pending_job_execution(
        &self,
        mut request: StartNextPendingJobExecutionRequest,
    ) -> JobsResult<StartNextJobExecutionResponse> {
        require("thing_name", &request.thing_name)?;
        let token = assign_token(&mut request.client_token);
        let topic = topics::jobs_start_next(&request.thing_name);
        self.engine.call(topic, &request, token).await
    }

    pub async fn update_job_execution(
        &self,
        mut request: UpdateJobExecutionRequest,
    ) -> JobsResult<UpdateJobExecutionResponse> {
        require("thing_name", &request.thing_name)?;
        require("job_id", &request.job_id)?;
        let token = assign_token(&mut request.client_token);
        let topic = topics::jobs_update(&request.thing_name, &request.job_id);
        self.engine.call(topic, &request, token).await
    }

    pub async fn subscribe_to_job_executions_changed_events<F>(
        &self,
        request: &JobExecutionsChangedSubscriptionRequest,
        callback: F,
    ) -> MqttResult<SubscriptionHandle>
    where
        F: Fn(MqttResult<JobExecutionsChangedEvent>) + Send + Sync + 'static,
    {
        self.jobs
            .subscribe_to_job_executions_changed_events(request, QoS::AtLeastOnce, callback)
            .await
    }

    pub async fn subscribe_to_next_job_execution_changed_events<F>(
        &self,
        request: &NextJobExecutionChangedSubscriptionRequest,
        callback: F,
    ) -> MqttResult<SubscriptionHandle>
    where
        F: Fn(MqttResult<NextJobExecutionChangedEvent>) + Send + Sync + 'static,
    {
        self.jobs
            .subscribe_to_next_job_execution_changed_events(request, QoS::AtLeastOnce, callback)
            .await
    }

    pub async fn unsubscribe(&self, handle: &SubscriptionHandle) -> MqttResult<()> {
        self.jobs.unsubscribe(handle).await
    }
}
