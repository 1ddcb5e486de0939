// ── Write actions ──
//
// Typed requests for the handful of mutations VBR exposes. Buttons in the
// entity catalogue map 1:1 onto these variants.

use std::fmt;

use serde::{Deserialize, Serialize};
use veeamly_api::{Capability, ExtentMode};

use crate::entity::SourceKey;

/// A write operation against the backup server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    StartJob {
        id: String,
        #[serde(default)]
        active_full: bool,
    },
    StopJob {
        id: String,
        #[serde(default)]
        graceful: bool,
    },
    RetryJob {
        id: String,
    },
    EnableJob {
        id: String,
    },
    DisableJob {
        id: String,
    },
    RescanRepository {
        id: String,
    },
    EnableExtentSealedMode {
        sobr_id: String,
        extent_id: String,
    },
    DisableExtentSealedMode {
        sobr_id: String,
        extent_id: String,
    },
    EnableExtentMaintenanceMode {
        sobr_id: String,
        extent_id: String,
    },
    DisableExtentMaintenanceMode {
        sobr_id: String,
        extent_id: String,
    },
}

impl Action {
    /// The API capability the action needs.
    pub fn capability(&self) -> Capability {
        match self {
            Self::StartJob { .. } | Self::StopJob { .. } | Self::RetryJob { .. } => {
                Capability::JobControl
            }
            Self::EnableJob { .. } | Self::DisableJob { .. } => Capability::JobToggle,
            Self::RescanRepository { .. } => Capability::RepositoryRescan,
            Self::EnableExtentSealedMode { .. } | Self::DisableExtentSealedMode { .. } => {
                Capability::ExtentSealedMode
            }
            Self::EnableExtentMaintenanceMode { .. }
            | Self::DisableExtentMaintenanceMode { .. } => Capability::ExtentMaintenanceMode,
        }
    }

    /// Short verb phrase used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::StartJob { .. } => "start job",
            Self::StopJob { .. } => "stop job",
            Self::RetryJob { .. } => "retry job",
            Self::EnableJob { .. } => "enable job",
            Self::DisableJob { .. } => "disable job",
            Self::RescanRepository { .. } => "rescan repository",
            Self::EnableExtentSealedMode { .. } => "enable sealed mode",
            Self::DisableExtentSealedMode { .. } => "disable sealed mode",
            Self::EnableExtentMaintenanceMode { .. } => "enable maintenance mode",
            Self::DisableExtentMaintenanceMode { .. } => "disable maintenance mode",
        }
    }

    /// The record the action operates on.
    pub fn target(&self) -> SourceKey {
        match self {
            Self::StartJob { id, .. }
            | Self::StopJob { id, .. }
            | Self::RetryJob { id }
            | Self::EnableJob { id }
            | Self::DisableJob { id } => SourceKey::Job(id.clone()),
            Self::RescanRepository { id } => SourceKey::Repository(id.clone()),
            Self::EnableExtentSealedMode { sobr_id, extent_id }
            | Self::DisableExtentSealedMode { sobr_id, extent_id }
            | Self::EnableExtentMaintenanceMode { sobr_id, extent_id }
            | Self::DisableExtentMaintenanceMode { sobr_id, extent_id } => SourceKey::Extent {
                sobr_id: sobr_id.clone(),
                extent_id: extent_id.clone(),
            },
        }
    }

    /// Mode and direction for the four extent switches.
    pub fn extent_mode(&self) -> Option<(ExtentMode, bool)> {
        match self {
            Self::EnableExtentSealedMode { .. } => Some((ExtentMode::Sealed, true)),
            Self::DisableExtentSealedMode { .. } => Some((ExtentMode::Sealed, false)),
            Self::EnableExtentMaintenanceMode { .. } => Some((ExtentMode::Maintenance, true)),
            Self::DisableExtentMaintenanceMode { .. } => Some((ExtentMode::Maintenance, false)),
            _ => None,
        }
    }

    /// The action behind a catalogue button, with default options.
    pub fn from_button(source: &SourceKey, suffix: &str) -> Option<Self> {
        let action = match (source, suffix) {
            (SourceKey::Job(id), "start") => Self::StartJob {
                id: id.clone(),
                active_full: false,
            },
            (SourceKey::Job(id), "stop") => Self::StopJob {
                id: id.clone(),
                graceful: false,
            },
            (SourceKey::Job(id), "retry") => Self::RetryJob { id: id.clone() },
            (SourceKey::Job(id), "enable") => Self::EnableJob { id: id.clone() },
            (SourceKey::Job(id), "disable") => Self::DisableJob { id: id.clone() },
            (SourceKey::Repository(id), "rescan") => Self::RescanRepository { id: id.clone() },
            (SourceKey::Extent { sobr_id, extent_id }, suffix) => {
                let sobr_id = sobr_id.clone();
                let extent_id = extent_id.clone();
                match suffix {
                    "enable_sealed_mode" => Self::EnableExtentSealedMode { sobr_id, extent_id },
                    "disable_sealed_mode" => Self::DisableExtentSealedMode { sobr_id, extent_id },
                    "enable_maintenance_mode" => {
                        Self::EnableExtentMaintenanceMode { sobr_id, extent_id }
                    }
                    "disable_maintenance_mode" => {
                        Self::DisableExtentMaintenanceMode { sobr_id, extent_id }
                    }
                    _ => return None,
                }
            }
            _ => return None,
        };
        Some(action)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.target().logical_key())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entity::{Category, descriptors};

    #[test]
    fn every_catalogue_button_maps_to_an_action() {
        let sources = [
            (Category::Job, SourceKey::Job("j1".into())),
            (Category::Repository, SourceKey::Repository("r1".into())),
            (
                Category::Extent,
                SourceKey::Extent {
                    sobr_id: "s1".into(),
                    extent_id: "e1".into(),
                },
            ),
        ];
        for (category, source) in sources {
            for d in descriptors(category)
                .iter()
                .filter(|d| d.requires.is_some())
            {
                let action = Action::from_button(&source, d.suffix)
                    .unwrap_or_else(|| panic!("no action for {}", d.suffix));
                assert_eq!(Some(action.capability()), d.requires);
                assert_eq!(action.target(), source);
            }
        }
    }

    #[test]
    fn unknown_button_has_no_action() {
        assert!(Action::from_button(&SourceKey::Job("j1".into()), "status").is_none());
        assert!(Action::from_button(&SourceKey::Server, "start").is_none());
    }

    #[test]
    fn serde_uses_action_tag() {
        let action: Action =
            serde_json::from_str(r#"{"action":"stop_job","id":"j1","graceful":true}"#).unwrap();
        assert_eq!(
            action,
            Action::StopJob {
                id: "j1".into(),
                graceful: true
            }
        );
        assert_eq!(action.to_string(), "stop job (job:j1)");
    }
}
