use crate::models::{
    AvailabilityData, EventData, ExceptionData, MessageData, MetricData, PageViewData,
    PageViewPerformanceData, RemoteDependencyData, RequestData, Sanitize,
};
use serde::Serialize;

/// Data struct to contain both B and C sections.
#[derive(Debug, Serialize)]
#[serde(tag = "baseType", content = "baseData")]
pub enum Data {
    #[serde(rename = "RequestData")]
    Request(RequestData),
    #[serde(rename = "EventData")]
    Event(EventData),
    #[serde(rename = "ExceptionData")]
    Exception(ExceptionData),
    #[serde(rename = "MetricData")]
    Metric(MetricData),
    #[serde(rename = "PageViewData")]
    PageView(PageViewData),
    #[serde(rename = "PageViewPerformanceData")]
    PageViewPerformance(PageViewPerformanceData),
    #[serde(rename = "RemoteDependencyData")]
    RemoteDependency(RemoteDependencyData),
    #[serde(rename = "MessageData")]
    Message(MessageData),
    #[serde(rename = "AvailabilityData")]
    Availability(AvailabilityData),
}

impl Sanitize for Data {
    fn sanitize(&mut self) {
        match self {
            Data::Request(data) => data.properties.sanitize(),
            Data::Event(data) => data.properties.sanitize(),
            Data::Exception(data) => data.properties.sanitize(),
            Data::Metric(data) => data.properties.sanitize(),
            Data::PageView(data) => data.properties.sanitize(),
            Data::PageViewPerformance(data) => data.properties.sanitize(),
            Data::RemoteDependency(data) => data.properties.sanitize(),
            Data::Message(data) => data.properties.sanitize(),
            Data::Availability(data) => data.properties.sanitize(),
        }
    }
}
