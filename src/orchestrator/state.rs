// Copyright 2018-2022 Cargill Incorporated
// SPDX-License-Identifier: Apache-2.0

use core::time::Duration;

pub const STATE: State = State {
    // runner agent
    runner_version: "2.288.1",
    runner_download_base: "https://github.com/actions/runner/releases/download",
    runner_workspace_dir: "/tmp/actions-runner",

    // buildx
    buildx_port: 2375,

    // aws
    root_device_name: "/dev/xvda",
    root_volume_gb: 30,
    helper_ready_timeout: Duration::from_secs(120),
    helper_poll_delay: Duration::from_secs(5),
    helper_ready_fallback_delay: Duration::from_secs(20),
    // Error code EC2 returns when a dry-run request would have succeeded.
    dry_run_success_code: "DryRunOperation",
};

pub struct State {
    // runner agent
    pub runner_version: &'static str,
    pub runner_download_base: &'static str,
    pub runner_workspace_dir: &'static str,

    // buildx
    pub buildx_port: u16,

    // aws
    pub root_device_name: &'static str,
    pub root_volume_gb: i32,
    pub helper_ready_timeout: Duration,
    pub helper_poll_delay: Duration,
    pub helper_ready_fallback_delay: Duration,
    pub dry_run_success_code: &'static str,
}

impl State {
    pub fn runner_tarball(&self) -> String {
        format!("actions-runner-linux-x64-{}.tar.gz", self.runner_version)
    }

    pub fn runner_download_url(&self) -> String {
        format!(
            "{}/v{}/{}",
            self.runner_download_base,
            self.runner_version,
            self.runner_tarball()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pinned_runner_download_url() {
        assert_eq!(
            STATE.runner_download_url(),
            "https://github.com/actions/runner/releases/download/v2.288.1/actions-runner-linux-x64-2.288.1.tar.gz"
        );
    }
}
