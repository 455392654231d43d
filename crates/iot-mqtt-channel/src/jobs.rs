//! AWS IoT Jobs service client.

use rumqttc::QoS;
use serde::de::DeserializeOwned;

use iot_protocol::jobs::*;
use iot_protocol::topics;

use crate::channel::Channel;
use crate::error::{MqttResult, require};
use crate::router::SubscriptionHandle;
use crate::service::MqttServiceClient;

pub struct IotJobsClient<C: Channel> {
    service: MqttServiceClient<C>,
}

impl<C: Channel> Clone for IotJobsClient<C> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
        }
    }
}

impl<C: Channel> IotJobsClient<C> {
    pub fn new(service: MqttServiceClient<C>) -> Self {
        Self { service }
    }

    pub fn mqtt_service(&self) -> &MqttServiceClient<C> {
        &self.service
    }

    pub async fn unsubscribe(&self, handle: &SubscriptionHandle) -> MqttResult<()> {
        self.service.unsubscribe(handle).await
    }

    // ─── Requests ───

    pub async fn publish_describe_job_execution(
        &self,
        request: &DescribeJobExecutionRequest,
        qos: QoS,
    ) -> MqttResult<()> {
        require_job(&request.thing_name, &request.job_id)?;
        let topic = topics::jobs_describe(&request.thing_name, &request.job_id);
        self.service.publish_operation(&topic, qos, Some(request)).await
    }

    pub async fn publish_get_pending_job_executions(
        &self,
        request: &GetPendingJobExecutionsRequest,
        qos: QoS,
    ) -> MqttResult<()> {
        require("thing_name", &request.thing_name)?;
        let topic = topics::jobs_get_pending(&request.thing_name);
        self.service.publish_operation(&topic, qos, Some(request)).await
    }

    pub async fn publish_start_next_pending_job_execution(
        &self,
        request: &StartNextPendingJobExecutionRequest,
        qos: QoS,
    ) -> MqttResult<()> {
        require("thing_name", &request.thing_name)?;
        let topic = topics::jobs_start_next(&request.thing_name);
        self.service.publish_operation(&topic, qos, Some(request)).await
    }

    pub async fn publish_update_job_execution(
        &self,
        request: &UpdateJobExecutionRequest,
        qos: QoS,
    ) -> MqttResult<()> {
        require_job(&request.thing_name, &request.job_id)?;
        let topic = topics::jobs_update(&request.thing_name, &request.job_id);
        self.service.publish_operation(&topic, qos, Some(request)).await
    }

    // ─── Responses ───

    pub async fn subscribe_to_describe_job_execution_accepted<F>(
        &self,
        request: &DescribeJobExecutionSubscriptionRequest,
        qos: QoS,
        callback: F,
    ) -> MqttResult<SubscriptionHandle>
    where
        F: Fn(MqttResult<DescribeJobExecutionResponse>) + Send + Sync + 'static,
    {
        require_job(&request.thing_name, &request.job_id)?;
        let topic = topics::accepted(&topics::jobs_describe(&request.thing_name, &request.job_id));
        self.subscribe(&topic, qos, callback).await
    }

    pub async fn subscribe_to_describe_job_execution_rejected<F>(
        &self,
        request: &DescribeJobExecutionSubscriptionRequest,
        qos: QoS,
        callback: F,
    ) -> MqttResult<SubscriptionHandle>
    where
        F: Fn(MqttResult<RejectedError>) + Send + Sync + 'static,
    {
        require_job(&request.thing_name, &request.job_id)?;
        let topic = topics::rejected(&topics::jobs_describe(&request.thing_name, &request.job_id));
        self.subscribe(&topic, qos, callback).await
    }

    pub async fn subscribe_to_get_pending_job_executions_accepted<F>(
        &self,
        request: &GetPendingJobExecutionsSubscriptionRequest,
        qos: QoS,
        callback: F,
    ) -> MqttResult<SubscriptionHandle>
    where
        F: Fn(MqttResult<GetPendingJobExecutionsResponse>) + Send + Sync + 'static,
    {
        require("thing_name", &request.thing_name)?;
        let topic = topics::accepted(&topics::jobs_get_pending(&request.thing_name));
        self.subscribe(&topic, qos, callback).await
    }

    pub async fn subscribe_to_get_pending_job_executions_rejected<F>(
        &self,
        request: &GetPendingJobExecutionsSubscriptionRequest,
        qos: QoS,
        callback: F,
    ) -> MqttResult<SubscriptionHandle>
    where
        F: Fn(MqttResult<RejectedError>) + Send + Sync + 'static,
    {
        require("thing_name", &request.thing_name)?;
        let topic = topics::rejected(&topics::jobs_get_pending(&request.thing_name));
        self.subscribe(&topic, qos, callback).await
    }

    pub async fn subscribe_to_start_next_pending_job_execution_accepted<F>(
        &self,
        request: &StartNextPendingJobExecutionSubscriptionRequest,
        qos: QoS,
        callback: F,
    ) -> MqttResult<SubscriptionHandle>
    where
        F: Fn(MqttResult<StartNextJobExecutionResponse>) + Send + Sync + 'static,
    {
        require("thing_name", &request.thing_name)?;
        let topic = topics::accepted(&topics::jobs_start_next(&request.thing_name));
        self.subscribe(&topic, qos, callback).await
    }

    pub async fn subscribe_to_start_next_pending_job_execution_rejected<F>(
        &self,
        request: &StartNextPendingJobExecutionSubscriptionRequest,
        qos: QoS,
        callback: F,
    ) -> MqttResult<SubscriptionHandle>
    where
        F: Fn(MqttResult<RejectedError>) + Send + Sync + 'static,
    {
        require("thing_name", &request.thing_name)?;
        let topic = topics::rejected(&topics::jobs_start_next(&request.thing_name));
        self.subscribe(&topic, qos, callback).await
    }

    pub async fn subscribe_to_update_job_execution_accepted<F>(
        &self,
        request: &UpdateJobExecutionSubscriptionRequest,
        qos: QoS,
        callback: F,
    ) -> MqttResult<SubscriptionHandle>
    where
        F: Fn(MqttResult<UpdateJobExecutionResponse>) + Send + Sync + 'static,
    {
        require_job(&request.thing_name, &request.job_id)?;
        let topic = topics::accepted(&topics::jobs_update(&request.thing_name, &request.job_id));
        self.subscribe(&topic, qos, callback).await
    }

    pub async fn subscribe_to_update_job_execution_rejected<F>(
        &self,
        request: &UpdateJobExecutionSubscriptionRequest,
        qos: QoS,
        callback: F,
    ) -> MqttResult<SubscriptionHandle>
    where
        F: Fn(MqttResult<RejectedError>) + Send + Sync + 'static,
    {
        require_job(&request.thing_name, &request.job_id)?;
        let topic = topics::rejected(&topics::jobs_update(&request.thing_name, &request.job_id));
        self.subscribe(&topic, qos, callback).await
    }

    // ─── Events ───

    pub async fn subscribe_to_job_executions_changed_events<F>(
        &self,
        request: &JobExecutionsChangedSubscriptionRequest,
        qos: QoS,
        callback: F,
    ) -> MqttResult<SubscriptionHandle>
    where
        F: Fn(MqttResult<JobExecutionsChangedEvent>) + Send + Sync + 'static,
    {
        require("thing_name", &request.thing_name)?;
        let topic = topics::jobs_notify(&request.thing_name);
        self.subscribe(&topic, qos, callback).await
    }

    pub async fn subscribe_to_next_job_execution_changed_events<F>(
        &self,
        request: &NextJobExecutionChangedSubscriptionRequest,
        qos: QoS,
        callback: F,
    ) -> MqttResult<SubscriptionHandle>
    where
        F: Fn(MqttResult<NextJobExecutionChangedEvent>) + Send + Sync + 'static,
    {
        require("thing_name", &request.thing_name)?;
        let topic = topics::jobs_notify_next(&request.thing_name);
        self.subscribe(&topic, qos, callback).await
    }

    async fn subscribe<T, F>(
        &self,
        topic: &str,
        qos: QoS,
        callback: F,
    ) -> MqttResult<SubscriptionHandle>
    where
        T: DeserializeOwned + 'static,
        F: Fn(MqttResult<T>) + Send + Sync + 'static,
    {
        self.service.subscribe_operation(topic, qos, callback).await
    }
}

fn require_job(thing_name: &str, job_id: &str) -> MqttResult<()> {
    require("thing_name", thing_name)?;
    require("job_id", job_id)
}
