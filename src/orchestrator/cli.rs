// Copyright 2018-2022 Cargill Incorporated
// SPDX-License-Identifier: Apache-2.0

use crate::{
    ec2_utils::{AmiId, Label, SecurityGroupId, SubnetId},
    orchestrator::{OrchError, OrchResult},
};
use clap::{Parser, ValueEnum};

// Inputs double as CLI flags and environment variables so the tool can be
// driven entirely from a CI pipeline step (`INPUT_*` is the convention used
// for action inputs).
#[derive(Parser, Debug)]
pub struct Cli {
    /// Action to perform
    #[arg(long, value_enum, env = "INPUT_ACTION")]
    action: Action,

    /// Runner mode; "buildx" joins an ARM helper into a multi-arch build cluster
    #[arg(long, env = "INPUT_MODE")]
    mode: String,

    /// AWS region the instances are created in
    #[arg(long, env = "AWS_REGION")]
    region: String,

    /// AMI for the primary (AMD) runner instance
    #[arg(long, env = "INPUT_AMD_AMI_ID")]
    amd_ami_id: Option<String>,

    /// Instance type for the primary (AMD) runner instance
    #[arg(long, env = "INPUT_AMD_INSTANCE_TYPE")]
    amd_instance_type: Option<String>,

    /// AMI for the ARM buildx helper instance
    #[arg(long, env = "INPUT_ARM_AMI_ID")]
    arm_ami_id: Option<String>,

    /// Instance type for the ARM buildx helper instance
    #[arg(long, env = "INPUT_ARM_INSTANCE_TYPE")]
    arm_instance_type: Option<String>,

    /// Personal access token used to request the runner registration token
    #[arg(long, env = "INPUT_GH_PERSONAL_ACCESS_TOKEN", hide_env_values = true)]
    github_pat: Option<String>,

    /// Repository the runner registers against, as "owner/repo"
    #[arg(long, env = "GITHUB_REPOSITORY")]
    repo: Option<String>,

    /// Security group the instances are placed in
    #[arg(long, env = "INPUT_SECURITY_GROUP_ID")]
    security_group_id: Option<String>,

    /// Subnet the instances are placed in
    #[arg(long, env = "INPUT_SUBNET")]
    subnet_id: Option<String>,

    /// Label identifying the instances to terminate (stop only)
    #[arg(long, env = "INPUT_LABEL")]
    label: Option<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Action {
    Start,
    Stop,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RunnerMode {
    Buildx,
    Single,
}

impl From<&str> for RunnerMode {
    fn from(value: &str) -> Self {
        // anything other than "buildx" provisions a single runner
        if value == "buildx" {
            RunnerMode::Buildx
        } else {
            RunnerMode::Single
        }
    }
}

// "owner/repo" slug, validated once at config construction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepoSlug(String);

impl RepoSlug {
    pub fn parse(value: &str) -> OrchResult<Self> {
        let mut segments = value.split('/');
        let valid = matches!(
            (segments.next(), segments.next(), segments.next()),
            (Some(owner), Some(repo), None) if !owner.is_empty() && !repo.is_empty()
        );
        if !valid {
            return Err(OrchError::Init {
                dbg: format!("repository must be of the form owner/repo, got: {value}"),
            });
        }
        Ok(RepoSlug(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug)]
pub struct OrchestratorConfig {
    pub region: String,
    pub operation: Operation,
}

#[derive(Debug)]
pub enum Operation {
    Start(Box<StartConfig>),
    Stop { label: Label },
}

#[derive(Debug)]
pub struct StartConfig {
    pub amd_ami_id: AmiId,
    pub amd_instance_type: String,
    pub helper: Option<HelperConfig>,
    pub github_pat: String,
    pub repo: RepoSlug,
    pub security_group_id: SecurityGroupId,
    pub subnet_id: SubnetId,
}

// ARM instance joined as a remote builder; present only in buildx mode
#[derive(Debug)]
pub struct HelperConfig {
    pub arm_ami_id: AmiId,
    pub arm_instance_type: String,
}

impl Cli {
    pub fn into_config(self) -> OrchResult<OrchestratorConfig> {
        let operation = match self.action {
            Action::Start => {
                let mode = RunnerMode::from(self.mode.as_str());
                let helper = match mode {
                    RunnerMode::Buildx => Some(HelperConfig {
                        arm_ami_id: require(self.arm_ami_id, "INPUT_ARM_AMI_ID")?.into(),
                        arm_instance_type: require(
                            self.arm_instance_type,
                            "INPUT_ARM_INSTANCE_TYPE",
                        )?,
                    }),
                    RunnerMode::Single => None,
                };
                Operation::Start(Box::new(StartConfig {
                    amd_ami_id: require(self.amd_ami_id, "INPUT_AMD_AMI_ID")?.into(),
                    amd_instance_type: require(self.amd_instance_type, "INPUT_AMD_INSTANCE_TYPE")?,
                    helper,
                    github_pat: require(self.github_pat, "INPUT_GH_PERSONAL_ACCESS_TOKEN")?,
                    repo: RepoSlug::parse(&require(self.repo, "GITHUB_REPOSITORY")?)?,
                    security_group_id: require(self.security_group_id, "INPUT_SECURITY_GROUP_ID")?
                        .into(),
                    subnet_id: require(self.subnet_id, "INPUT_SUBNET")?.into(),
                }))
            }
            Action::Stop => Operation::Stop {
                label: require(self.label, "INPUT_LABEL")?.into(),
            },
        };

        Ok(OrchestratorConfig {
            region: self.region,
            operation,
        })
    }
}

fn require(value: Option<String>, name: &str) -> OrchResult<String> {
    value.filter(|v| !v.is_empty()).ok_or(OrchError::Init {
        dbg: format!("missing required input: {name}"),
    })
}
