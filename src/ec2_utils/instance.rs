// Copyright 2018-2022 Cargill Incorporated
// SPDX-License-Identifier: Apache-2.0

use crate::{
    ec2_utils::{
        launch_plan::{InstanceSpec, LaunchPlan},
        types::{InstanceId, Label, PrivIp},
    },
    orchestrator::{OrchError, OrchResult, STATE},
};
use aws_sdk_ec2::{
    error::{DisplayErrorContext, ProvideErrorMetadata},
    types::{
        BlockDeviceMapping, EbsBlockDevice, Filter, Instance, InstanceStateName, InstanceType,
        Reservation, ResourceType, RunInstancesMonitoringEnabled, Tag, TagSpecification,
        VolumeType,
    },
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::{net::IpAddr, str::FromStr, time::Duration};
use tracing::{debug, info};

/// Request exactly one instance: 30 GiB deletable gp2 root volume, fixed
/// subnet and security group, monitoring disabled, Name tag set to the
/// label. The boot script is base64-encoded here; EC2 expects the caller
/// to encode user data.
pub async fn launch_instance(
    ec2_client: &aws_sdk_ec2::Client,
    plan: &LaunchPlan<'_>,
    spec: &InstanceSpec<'_>,
    label: &Label,
    boot_script: &str,
) -> OrchResult<Instance> {
    let monitoring = RunInstancesMonitoringEnabled::builder().enabled(false).build();

    let run_result = ec2_client
        .run_instances()
        .image_id(spec.ami_id.as_str())
        .instance_type(InstanceType::from(spec.instance_type))
        .min_count(1)
        .max_count(1)
        .monitoring(monitoring)
        .security_group_ids(plan.security_group_id.as_str())
        .subnet_id(plan.subnet_id.as_str())
        .block_device_mappings(
            BlockDeviceMapping::builder()
                .device_name(STATE.root_device_name)
                .ebs(
                    EbsBlockDevice::builder()
                        .delete_on_termination(true)
                        .volume_size(STATE.root_volume_gb)
                        .volume_type(VolumeType::Gp2)
                        .build(),
                )
                .build(),
        )
        .tag_specifications(
            TagSpecification::builder()
                .resource_type(ResourceType::Instance)
                .tags(Tag::builder().key("Name").value(label.as_str()).build())
                .build(),
        )
        .user_data(STANDARD.encode(boot_script))
        .send()
        .await
        .map_err(|err| OrchError::Ec2 {
            dbg: format!(
                "failed to launch {} instance: {}",
                spec.role.as_str(),
                DisplayErrorContext(&err)
            ),
        })?;

    run_result
        .instances()
        .first()
        .cloned()
        .ok_or(OrchError::Ec2 {
            dbg: "no instances in run result".to_string(),
        })
}

pub fn instance_id(instance: &Instance) -> OrchResult<InstanceId> {
    instance
        .instance_id()
        .map(|id| InstanceId::from(id.to_string()))
        .ok_or(OrchError::Ec2 {
            dbg: "no instance id in launch response".to_string(),
        })
}

pub fn private_ip(instance: &Instance) -> OrchResult<PrivIp> {
    instance
        .private_ip_address()
        .and_then(|ip| IpAddr::from_str(ip).ok())
        .map(PrivIp)
        .ok_or(OrchError::Ec2 {
            dbg: "no private ip in launch response".to_string(),
        })
}

/// All instances carrying the label as their Name tag, across all
/// reservations. Empty when nothing matches.
pub async fn instances_by_label(
    ec2_client: &aws_sdk_ec2::Client,
    label: &Label,
) -> OrchResult<Vec<InstanceId>> {
    let resp = ec2_client
        .describe_instances()
        .filters(
            Filter::builder()
                .name("tag:Name")
                .values(label.as_str())
                .build(),
        )
        .send()
        .await
        .map_err(|err| OrchError::Ec2 {
            dbg: format!("describe by tag failed: {}", DisplayErrorContext(&err)),
        })?;

    Ok(collect_instance_ids(resp.reservations()))
}

fn collect_instance_ids(reservations: &[Reservation]) -> Vec<InstanceId> {
    reservations
        .iter()
        .flat_map(|reservation| reservation.instances())
        .filter_map(|instance| instance.instance_id())
        .map(|id| InstanceId::from(id.to_string()))
        .collect()
}

/// Terminate the given instances. A dry-run call validates permissions and
/// parameters first; the expected dry-run success signal is the only error
/// tolerated there. Failures of the real call are printed but not fatal.
pub async fn terminate_instances(
    ec2_client: &aws_sdk_ec2::Client,
    ids: Vec<InstanceId>,
) -> OrchResult<()> {
    let ids: Vec<String> = ids.iter().map(|id| id.as_str().to_string()).collect();

    let dry_run = ec2_client
        .terminate_instances()
        .set_instance_ids(Some(ids.clone()))
        .dry_run(true)
        .send()
        .await;
    if let Err(err) = dry_run {
        let service_err = err.into_service_error();
        if !is_dry_run_success(service_err.code()) {
            return Err(OrchError::Ec2 {
                dbg: format!("termination dry run rejected: {service_err}"),
            });
        }
    }

    match ec2_client
        .terminate_instances()
        .set_instance_ids(Some(ids))
        .dry_run(false)
        .send()
        .await
    {
        Ok(_) => println!("Termination was successful"),
        Err(err) => println!("{}", DisplayErrorContext(&err)),
    }
    Ok(())
}

// EC2 signals "this would have succeeded" for dry-run requests as an error
// with this code. Anything else is a genuine failure.
fn is_dry_run_success(code: Option<&str>) -> bool {
    code == Some(STATE.dry_run_success_code)
}

/// Bounded readiness poll for the buildx helper: describe the instance
/// until it reports `running` or the timeout elapses. On timeout, fall back
/// to the unconditional fixed delay and proceed; the helper's own boot
/// script is never observed from here either way.
pub async fn wait_until_running(
    ec2_client: &aws_sdk_ec2::Client,
    instance_id: &InstanceId,
) -> OrchResult<()> {
    let deadline = tokio::time::Instant::now() + STATE.helper_ready_timeout;
    while tokio::time::Instant::now() < deadline {
        tokio::time::sleep(STATE.helper_poll_delay).await;
        match instance_state(ec2_client, instance_id).await {
            Ok(Some(state)) => {
                info!("{instance_id} state: {state:?}");
                if state == InstanceStateName::Running {
                    return Ok(());
                }
            }
            Ok(None) => {}
            // transient describe failures just mean another poll round
            Err(err) => debug!("describe failed while waiting for {instance_id}: {err}"),
        }
    }

    let fallback: Duration = STATE.helper_ready_fallback_delay;
    println!(
        "Sleeping for {}s so {} will be ready",
        fallback.as_secs(),
        instance_id
    );
    tokio::time::sleep(fallback).await;
    Ok(())
}

async fn instance_state(
    ec2_client: &aws_sdk_ec2::Client,
    instance_id: &InstanceId,
) -> OrchResult<Option<InstanceStateName>> {
    let resp = ec2_client
        .describe_instances()
        .instance_ids(instance_id.as_str())
        .send()
        .await
        .map_err(|err| OrchError::Ec2 {
            dbg: err.to_string(),
        })?;

    Ok(resp
        .reservations()
        .iter()
        .flat_map(|reservation| reservation.instances())
        .find_map(|instance| instance.state().and_then(|state| state.name()).cloned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reservation(ids: &[&str]) -> Reservation {
        let mut builder = Reservation::builder();
        for id in ids {
            builder = builder.instances(Instance::builder().instance_id(*id).build());
        }
        builder.build()
    }

    #[test]
    fn collects_ids_across_reservations() {
        let reservations = vec![reservation(&["i-01", "i-02"]), reservation(&["i-03"])];
        let ids = collect_instance_ids(&reservations);
        assert_eq!(
            ids,
            vec![
                InstanceId::from("i-01".to_string()),
                InstanceId::from("i-02".to_string()),
                InstanceId::from("i-03".to_string()),
            ]
        );
    }

    #[test]
    fn no_reservations_no_ids() {
        assert!(collect_instance_ids(&[]).is_empty());
        // an instance missing its id is skipped rather than invented
        let empty = vec![Reservation::builder()
            .instances(Instance::builder().build())
            .build()];
        assert!(collect_instance_ids(&empty).is_empty());
    }

    #[test]
    fn dry_run_signal_recognition() {
        assert!(is_dry_run_success(Some("DryRunOperation")));
        assert!(!is_dry_run_success(Some("UnauthorizedOperation")));
        assert!(!is_dry_run_success(Some("InvalidInstanceID.NotFound")));
        assert!(!is_dry_run_success(None));
    }
}
