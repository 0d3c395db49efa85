// Copyright 2018-2022 Cargill Incorporated
// SPDX-License-Identifier: Apache-2.0

//! Boot-script construction for instance user data.
//!
//! Typed builders instead of ad-hoc format strings: the values spliced into
//! the shell text are validated first, so a mangled token or label fails
//! here rather than producing a broken script on the instance.

use crate::{
    ec2_utils::{Label, PrivIp},
    orchestrator::{OrchError, OrchResult, RepoSlug, STATE},
};

pub struct RunnerScriptParams<'a> {
    /// Rendered buildx join fragment, present only in buildx mode
    pub buildx_fragment: Option<&'a str>,
    pub repo: &'a RepoSlug,
    pub registration_token: &'a str,
    pub label: &'a Label,
}

/// Shell fragment that joins the ARM helper as a remote builder. The helper
/// is addressed through an /etc/hosts alias so the docker endpoint stays
/// stable in the rest of the fragment.
pub fn buildx_join_fragment(helper_ip: &PrivIp) -> String {
    format!(
        "echo \"{helper_ip} buildx\" >> /etc/hosts\n\
         DOCKER_HOST=tcp://buildx:{port} docker buildx create --name cluster\n\
         docker buildx create --name cluster --append\n\
         docker buildx use cluster\n\
         docker buildx inspect --bootstrap\n",
        port = STATE.buildx_port,
    )
}

/// Boot script for the primary instance: optionally join the build cluster,
/// then download the pinned runner agent, register it against the repository
/// with the one-time token and the label, and run it as an ephemeral runner.
pub fn runner_boot_script(params: &RunnerScriptParams<'_>) -> OrchResult<String> {
    shell_safe("registration token", params.registration_token)?;
    shell_safe("label", params.label.as_str())?;

    let tarball = STATE.runner_tarball();
    Ok(format!(
        "#!/bin/bash\n\
         {fragment}\
         mkdir {workspace} && cd {workspace}\n\
         curl -o {tarball} -L {url}\n\
         tar xzf ./{tarball}\n\
         RUNNER_ALLOW_RUNASROOT=1 ./config.sh --url https://github.com/{repo} --token {token} --labels {label} --ephemeral --unattended\n\
         RUNNER_ALLOW_RUNASROOT=1 ./run.sh\n",
        fragment = params.buildx_fragment.unwrap_or(""),
        workspace = STATE.runner_workspace_dir,
        url = STATE.runner_download_url(),
        repo = params.repo,
        token = params.registration_token,
        label = params.label,
    ))
}

// Values are spliced into shell text unquoted; only non-empty single-word
// values are accepted.
fn shell_safe(field: &str, value: &str) -> OrchResult<()> {
    if value.is_empty() || value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(OrchError::Init {
            dbg: format!("{field} must be a non-empty single-line value"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;
    use std::str::FromStr;

    fn params<'a>(repo: &'a RepoSlug, label: &'a Label, fragment: Option<&'a str>) -> RunnerScriptParams<'a> {
        RunnerScriptParams {
            buildx_fragment: fragment,
            repo,
            registration_token: "AABF3JGZDX3P5PMEXLND6TS6FCWO6",
            label,
        }
    }

    #[test]
    fn runner_script_registers_with_token_and_label() {
        let repo = RepoSlug::parse("Cargill/splinter").unwrap();
        let label = Label::from("80a1b79a".to_string());
        let script = runner_boot_script(&params(&repo, &label, None)).unwrap();

        assert!(script.starts_with("#!/bin/bash\n"));
        assert!(script.contains("--url https://github.com/Cargill/splinter"));
        assert!(script.contains("--token AABF3JGZDX3P5PMEXLND6TS6FCWO6"));
        assert!(script.contains("--labels 80a1b79a"));
        assert!(script.contains("--ephemeral --unattended"));
        assert!(script.contains("actions-runner-linux-x64-2.288.1.tar.gz"));
        assert!(!script.contains("buildx"));
    }

    #[test]
    fn buildx_script_contains_helper_ip() {
        let repo = RepoSlug::parse("Cargill/splinter").unwrap();
        let label = Label::from("80a1b79a".to_string());
        let helper_ip = PrivIp(IpAddr::from_str("10.0.1.17").unwrap());

        let fragment = buildx_join_fragment(&helper_ip);
        assert!(fragment.contains("echo \"10.0.1.17 buildx\" >> /etc/hosts"));
        assert!(fragment.contains("DOCKER_HOST=tcp://buildx:2375"));
        assert!(fragment.contains("docker buildx inspect --bootstrap"));

        let script = runner_boot_script(&params(&repo, &label, Some(&fragment))).unwrap();
        assert!(script.contains("10.0.1.17"));
        // cluster join happens before the runner install
        let join = script.find("docker buildx use cluster").unwrap();
        let install = script.find("./config.sh").unwrap();
        assert!(join < install);
    }

    #[test]
    fn rejects_values_that_would_break_the_script() {
        let repo = RepoSlug::parse("Cargill/splinter").unwrap();
        let label = Label::from("80a1b79a".to_string());

        let mut bad = params(&repo, &label, None);
        bad.registration_token = "";
        assert!(runner_boot_script(&bad).is_err());

        bad.registration_token = "token\nrm -rf /";
        assert!(runner_boot_script(&bad).is_err());

        let spaced = Label::from("two words".to_string());
        let bad_label = params(&repo, &spaced, None);
        assert!(runner_boot_script(&bad_label).is_err());
    }
}
