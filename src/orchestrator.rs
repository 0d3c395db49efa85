// Copyright 2018-2022 Cargill Incorporated
// SPDX-License-Identifier: Apache-2.0

use crate::{
    ec2_utils::{self, Label, LaunchPlan},
    github_utils,
    user_data::{self, RunnerScriptParams},
};
use tracing::info;

mod cli;
mod error;
mod state;

pub use cli::{
    Action, Cli, HelperConfig, Operation, OrchestratorConfig, RepoSlug, RunnerMode, StartConfig,
};
pub use error::{OrchError, OrchResult};
pub use state::STATE;

pub async fn run(config: &OrchestratorConfig, aws_config: &aws_types::SdkConfig) -> OrchResult<()> {
    let ec2_client = aws_sdk_ec2::Client::new(aws_config);

    match &config.operation {
        Operation::Start(start_config) => start(&ec2_client, start_config).await,
        Operation::Stop { label } => ec2_utils::terminate_by_label(&ec2_client, label).await,
    }
}

async fn start(ec2_client: &aws_sdk_ec2::Client, config: &StartConfig) -> OrchResult<()> {
    // The registration token is the one hard prerequisite; nothing is
    // provisioned if it cannot be obtained.
    let registration_token =
        match github_utils::get_registration_token(&config.repo, &config.github_pat).await {
            Ok(token) => token,
            Err(err) => {
                info!("registration token fetch failed: {err}");
                println!("ERROR: Unable to get GHA self-hosted registration token");
                std::process::exit(1);
            }
        };

    let label = Label::generate();
    println!("Creating instances with tag {label}");

    let plan = LaunchPlan::from_config(config);

    let buildx_fragment = match &plan.helper {
        Some(helper_spec) => {
            let helper =
                ec2_utils::launch_instance(ec2_client, &plan, helper_spec, &label, "").await?;
            let helper_id = ec2_utils::instance_id(&helper)?;
            let helper_ip = ec2_utils::private_ip(&helper)?;
            println!("Started ARM instance {helper_id} at {helper_ip}");

            ec2_utils::wait_until_running(ec2_client, &helper_id).await?;
            Some(user_data::buildx_join_fragment(&helper_ip))
        }
        None => None,
    };

    let boot_script = user_data::runner_boot_script(&RunnerScriptParams {
        buildx_fragment: buildx_fragment.as_deref(),
        repo: &config.repo,
        registration_token: &registration_token,
        label: &label,
    })?;

    // Pipeline output consumed by later workflow steps.
    println!("::set-output name=label::{label}");

    let runner = ec2_utils::launch_instance(ec2_client, &plan, &plan.runner, &label, &boot_script)
        .await?;
    info!(
        "started runner instance {}",
        ec2_utils::instance_id(&runner)?
    );

    Ok(())
}
