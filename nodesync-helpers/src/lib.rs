pub mod haproxy;
pub mod registry;
pub mod s3policy;

pub use haproxy::HaproxyHelper;
pub use registry::{HelperFactory, HelperRegistry};
pub use s3policy::S3PolicyHelper;
