//! Bucket policy document

use serde::Serialize;

use nodesync_core::{Error, Result};

const POLICY_VERSION: &str = "2012-10-17";

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct PolicyDocument<'a> {
    version: &'static str,
    statement: [Statement<'a>; 1],
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Statement<'a> {
    effect: &'static str,
    principal: &'static str,
    action: &'static str,
    resource: String,
    condition: Condition<'a>,
}

#[derive(Serialize)]
struct Condition<'a> {
    #[serde(rename = "IpAddress")]
    ip_address: IpAddressCondition<'a>,
}

#[derive(Serialize)]
struct IpAddressCondition<'a> {
    #[serde(rename = "aws:SourceIp")]
    source_ip: &'a [&'a str],
}

/// Render a policy allowing anonymous `s3:GetObject` on every object in
/// `bucket`, restricted to requests from `source_ips`.
pub fn render_policy(bucket: &str, source_ips: &[&str]) -> Result<String> {
    let document = PolicyDocument {
        version: POLICY_VERSION,
        statement: [Statement {
            effect: "Allow",
            principal: "*",
            action: "s3:GetObject",
            resource: format!("arn:aws:s3:::{bucket}/*"),
            condition: Condition {
                ip_address: IpAddressCondition { source_ip: source_ips },
            },
        }],
    };

    serde_json::to_string_pretty(&document)
        .map_err(|e| Error::Render(format!("failed to render bucket policy: {e}")))
}
