// Copyright 2018-2022 Cargill Incorporated
// SPDX-License-Identifier: Apache-2.0

use std::net::IpAddr;

// Identifiers handed to/returned by EC2. Newtypes keep the call sites from
// mixing up the half dozen strings this tool threads around.
macro_rules! ec2_new_types {
    ($name:ident) => {
        #[derive(Clone, Debug, Hash, Eq, PartialEq, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                $name(value)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

ec2_new_types!(AmiId);
ec2_new_types!(SubnetId);
ec2_new_types!(SecurityGroupId);
ec2_new_types!(InstanceId);

// Shared by the instance Name tag and the runner registration; one `start`
// invocation tags everything it creates with a single label so `stop` can
// find the whole set.
#[derive(Clone, Debug, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct Label(String);

impl Label {
    // First dash-delimited segment of a fresh UUID: short, hex-only, and
    // practically unique within the lifetime of a runner fleet.
    pub fn generate() -> Self {
        let uuid = uuid::Uuid::new_v4().to_string();
        let short = uuid.split('-').next().expect("uuid has segments");
        Label(short.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Label {
    fn from(value: String) -> Self {
        Label(value)
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Private ip of a launched instance, as reported by the provider
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct PrivIp(pub IpAddr);

impl std::fmt::Display for PrivIp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_label_is_short_and_dashless() {
        let label = Label::generate();
        assert!(!label.as_str().is_empty());
        assert!(!label.as_str().contains('-'));
        // first segment of a canonical uuid
        assert_eq!(label.as_str().len(), 8);
        assert!(label.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generated_labels_differ() {
        assert_ne!(Label::generate(), Label::generate());
    }
}
