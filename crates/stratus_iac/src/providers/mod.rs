//! One renderer per supported cloud.

mod aws;
mod azure;
mod gcp;
mod openstack;

pub use aws::AwsRenderer;
pub use azure::AzureRenderer;
pub use gcp::GcpRenderer;
pub use openstack::OpenStackRenderer;
