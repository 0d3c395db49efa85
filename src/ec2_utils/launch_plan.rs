// Copyright 2018-2022 Cargill Incorporated
// SPDX-License-Identifier: Apache-2.0

use crate::{
    ec2_utils::{AmiId, SecurityGroupId, SubnetId},
    orchestrator::StartConfig,
};

// What a single `start` invocation will ask EC2 for. Built up front so the
// buildx/single decision lives in one place instead of inside the launch
// calls.
#[derive(Clone, Debug)]
pub struct LaunchPlan<'a> {
    // ARM helper, launched first so its private ip can be baked into the
    // runner's boot script. Only present in buildx mode.
    pub helper: Option<InstanceSpec<'a>>,
    pub runner: InstanceSpec<'a>,
    pub subnet_id: &'a SubnetId,
    pub security_group_id: &'a SecurityGroupId,
}

#[derive(Clone, Debug)]
pub struct InstanceSpec<'a> {
    pub ami_id: &'a AmiId,
    pub instance_type: &'a str,
    pub role: InstanceRole,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum InstanceRole {
    Runner,
    BuildxHelper,
}

impl InstanceRole {
    pub fn as_str(&self) -> &str {
        match self {
            InstanceRole::Runner => "runner",
            InstanceRole::BuildxHelper => "buildx helper",
        }
    }
}

impl<'a> LaunchPlan<'a> {
    pub fn from_config(config: &'a StartConfig) -> Self {
        let helper = config.helper.as_ref().map(|helper| InstanceSpec {
            ami_id: &helper.arm_ami_id,
            instance_type: &helper.arm_instance_type,
            role: InstanceRole::BuildxHelper,
        });

        LaunchPlan {
            helper,
            runner: InstanceSpec {
                ami_id: &config.amd_ami_id,
                instance_type: &config.amd_instance_type,
                role: InstanceRole::Runner,
            },
            subnet_id: &config.subnet_id,
            security_group_id: &config.security_group_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::{HelperConfig, RepoSlug};

    fn start_config(buildx: bool) -> StartConfig {
        StartConfig {
            amd_ami_id: "ami-0123456789abcdef0".to_string().into(),
            amd_instance_type: "c5.xlarge".to_string(),
            helper: buildx.then(|| HelperConfig {
                arm_ami_id: "ami-0fedcba9876543210".to_string().into(),
                arm_instance_type: "a1.xlarge".to_string(),
            }),
            github_pat: "ghp_testtoken".to_string(),
            repo: RepoSlug::parse("Cargill/splinter").unwrap(),
            security_group_id: "sg-0123456789abcdef0".to_string().into(),
            subnet_id: "subnet-0123456789abcdef0".to_string().into(),
        }
    }

    #[test]
    fn single_mode_plans_one_instance() {
        let config = start_config(false);
        let plan = LaunchPlan::from_config(&config);
        assert!(plan.helper.is_none());
        assert_eq!(plan.runner.role, InstanceRole::Runner);
        assert_eq!(plan.runner.ami_id.as_str(), "ami-0123456789abcdef0");
    }

    #[test]
    fn buildx_mode_plans_helper_first() {
        let config = start_config(true);
        let plan = LaunchPlan::from_config(&config);
        let helper = plan.helper.expect("buildx plan includes a helper");
        assert_eq!(helper.role, InstanceRole::BuildxHelper);
        assert_eq!(helper.ami_id.as_str(), "ami-0fedcba9876543210");
        assert_eq!(helper.instance_type, "a1.xlarge");
    }
}
