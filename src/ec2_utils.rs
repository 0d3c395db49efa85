// Copyright 2018-2022 Cargill Incorporated
// SPDX-License-Identifier: Apache-2.0

use crate::orchestrator::OrchResult;
use tracing::info;

mod instance;
mod launch_plan;
mod types;

pub use instance::{
    instance_id, instances_by_label, launch_instance, private_ip, terminate_instances,
    wait_until_running,
};
pub use launch_plan::{InstanceRole, InstanceSpec, LaunchPlan};
pub use types::{AmiId, InstanceId, Label, PrivIp, SecurityGroupId, SubnetId};

/// Resolve a label to the instances it tags and terminate them as a unit.
/// Zero matches is a no-op success; nothing to validate or terminate.
pub async fn terminate_by_label(ec2_client: &aws_sdk_ec2::Client, label: &Label) -> OrchResult<()> {
    let instance_ids = instances_by_label(ec2_client, label).await?;
    println!(
        "Instances tagged {label}: [{}]",
        instance_ids
            .iter()
            .map(InstanceId::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    );

    if instance_ids.is_empty() {
        info!("no instances tagged {label}, nothing to terminate");
        return Ok(());
    }

    terminate_instances(ec2_client, instance_ids).await
}
