// Copyright 2018-2022 Cargill Incorporated
// SPDX-License-Identifier: Apache-2.0

//! Registration-token fetch against the GitHub REST API.
//!
//! One POST, authenticated with a personal access token, scoped to the
//! configured repository. No retries; the caller decides what a failure
//! means for the process.

use crate::orchestrator::{OrchError, OrchResult, RepoSlug};
use serde::Deserialize;

const GITHUB_API_URL: &str = "https://api.github.com";

#[derive(Debug, Deserialize)]
struct RegistrationTokenResponse {
    token: String,
    // expires_at is also present in the response but unused; the token is
    // consumed immediately by the boot script.
}

fn registration_token_url(repo: &RepoSlug) -> String {
    format!("{GITHUB_API_URL}/repos/{repo}/actions/runners/registration-token")
}

/// Request a one-time runner registration token for the repository.
pub async fn get_registration_token(repo: &RepoSlug, pat: &str) -> OrchResult<String> {
    let client = reqwest::Client::builder()
        .user_agent("ec2-runners")
        .build()
        .map_err(|err| OrchError::GitHub {
            dbg: err.to_string(),
        })?;

    let response = client
        .post(registration_token_url(repo))
        .header("Authorization", format!("token {}", pat.trim()))
        .header("Accept", "application/vnd.github+json")
        .header("X-GitHub-Api-Version", "2022-11-28")
        .send()
        .await
        .map_err(|err| OrchError::GitHub {
            dbg: format!("registration token request failed: {err}"),
        })?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(OrchError::GitHub {
            dbg: format!("registration token request failed ({status}): {body}"),
        });
    }

    let token_response: RegistrationTokenResponse =
        response.json().await.map_err(|err| OrchError::GitHub {
            dbg: format!("malformed registration token response: {err}"),
        })?;

    Ok(token_response.token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_url_is_repo_scoped() {
        let repo = RepoSlug::parse("Cargill/splinter").unwrap();
        assert_eq!(
            registration_token_url(&repo),
            "https://api.github.com/repos/Cargill/splinter/actions/runners/registration-token"
        );
    }

    #[test]
    fn parses_registration_token_body() {
        let body = r#"{"token":"AABF3JGZDX3P5PMEXLND6TS6FCWO6","expires_at":"2022-01-22T12:13:35.000-08:00"}"#;
        let parsed: RegistrationTokenResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.token, "AABF3JGZDX3P5PMEXLND6TS6FCWO6");
    }

    #[test]
    fn rejects_malformed_body() {
        let body = r#"{"message":"Bad credentials"}"#;
        assert!(serde_json::from_str::<RegistrationTokenResponse>(body).is_err());
    }
}
