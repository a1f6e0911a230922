// ABOUTME: Upper bounds for blocking external calls.
// ABOUTME: One duration per operation class, parsed with humantime.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TimeoutsConfig {
    #[serde(default = "default_git", with = "humantime_serde")]
    pub git: Duration,

    #[serde(default = "default_build", with = "humantime_serde")]
    pub build: Duration,

    /// Time allowed for the test container to exit.
    #[serde(default = "default_test", with = "humantime_serde")]
    pub test: Duration,

    #[serde(default = "default_push", with = "humantime_serde")]
    pub push: Duration,

    #[serde(default = "default_pull", with = "humantime_serde")]
    pub pull: Duration,
}

fn default_git() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_build() -> Duration {
    Duration::from_secs(15 * 60)
}

fn default_test() -> Duration {
    Duration::from_secs(30 * 60)
}

fn default_push() -> Duration {
    Duration::from_secs(10 * 60)
}

fn default_pull() -> Duration {
    Duration::from_secs(10 * 60)
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        TimeoutsConfig {
            git: default_git(),
            build: default_build(),
            test: default_test(),
            push: default_push(),
            pull: default_pull(),
        }
    }
}
