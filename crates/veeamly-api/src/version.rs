// API version adapters
//
// VBR negotiates the REST surface through the `x-api-version` header.
// The version is chosen once when the client is built; the matching
// capability set decides which write actions exist for this server.

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Supported values of the `x-api-version` header.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Display, EnumString,
    EnumIter, IntoStaticStr,
)]
pub enum ApiVersion {
    #[strum(serialize = "1.1-rev0")]
    V1_1Rev0,
    #[strum(serialize = "1.1-rev1")]
    V1_1Rev1,
    #[strum(serialize = "1.1-rev2")]
    V1_1Rev2,
    #[strum(serialize = "1.2-rev0")]
    V1_2Rev0,
    #[strum(serialize = "1.2-rev1")]
    V1_2Rev1,
    #[strum(serialize = "1.3-rev0")]
    V1_3Rev0,
    #[default]
    #[strum(serialize = "1.3-rev1")]
    V1_3Rev1,
}

impl ApiVersion {
    /// Header value sent with every request.
    pub fn header_value(self) -> &'static str {
        self.into()
    }

    /// Capability set for this version.
    pub fn capabilities(self) -> Capabilities {
        // Scale-out extent mode switches arrived with the 1.2 surface (VBR 12.1).
        let extent_modes = self >= Self::V1_2Rev0;
        Capabilities {
            version: self,
            job_control: true,
            job_toggle: true,
            repository_rescan: true,
            extent_sealed_mode: extent_modes,
            extent_maintenance_mode: extent_modes,
        }
    }
}

/// A single write operation that may or may not exist in an API version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Capability {
    /// Start, stop and retry a job.
    JobControl,
    /// Enable or disable a job.
    JobToggle,
    RepositoryRescan,
    ExtentSealedMode,
    ExtentMaintenanceMode,
}

/// The write actions available for one `ApiVersion`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Capabilities {
    pub version: ApiVersion,
    pub job_control: bool,
    pub job_toggle: bool,
    pub repository_rescan: bool,
    pub extent_sealed_mode: bool,
    pub extent_maintenance_mode: bool,
}

impl Capabilities {
    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::JobControl => self.job_control,
            Capability::JobToggle => self.job_toggle,
            Capability::RepositoryRescan => self.repository_rescan,
            Capability::ExtentSealedMode => self.extent_sealed_mode,
            Capability::ExtentMaintenanceMode => self.extent_maintenance_mode,
        }
    }
}
