//! Simulation configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fatal configuration errors, surfaced to the caller before the run starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("can't read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("can't parse YAML from config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Holds raw simulation config parsed from YAML file.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
struct RawSimulationConfig {
    pub cloudlets: Option<CloudletConfig>,
    pub primary: Option<DatacenterConfig>,
    pub backup: Option<DatacenterConfig>,
    pub disaster: Option<DisasterConfig>,
    pub vm_admission_limit: Option<u32>,
    pub placement_algorithm: Option<String>,
}

/// Holds configuration of the cloudlet batch.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct CloudletConfig {
    /// Number of cloudlets in the batch.
    pub count: u32,
    /// Instruction length of each cloudlet.
    pub length: f64,
    /// Input file size.
    pub file_size: u64,
    /// Output file size.
    pub output_size: u64,
    /// Required cores.
    pub cores: u32,
}

impl Default for CloudletConfig {
    fn default() -> Self {
        Self {
            count: 20,
            length: 10000.,
            file_size: 300,
            output_size: 300,
            cores: 1,
        }
    }
}

/// Holds configuration of a set of identical hosts within a datacenter.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct HostConfig {
    pub count: u32,
    pub cores: u32,
    pub mips_per_core: f64,
    pub memory: u64,
    pub bandwidth: u64,
    pub storage: u64,
}

/// Holds configuration of a set of identical VMs within a datacenter.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct VmConfig {
    pub count: u32,
    pub cores: u32,
    pub mips_per_core: f64,
    pub memory: u64,
    pub bandwidth: u64,
    pub disk_size: u64,
}

/// Static datacenter characteristics, carried through to reporting unchanged.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct CharacteristicsConfig {
    pub arch: String,
    pub os: String,
    pub vmm: String,
    pub timezone: f64,
    pub cost_per_sec: f64,
    pub cost_per_mem: f64,
    pub cost_per_storage: f64,
    pub cost_per_bw: f64,
}

/// Holds configuration of a single datacenter tier.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct DatacenterConfig {
    pub name: String,
    pub hosts: HostConfig,
    pub vms: VmConfig,
    pub characteristics: CharacteristicsConfig,
}

/// Holds configuration of the randomized disaster event.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct DisasterConfig {
    /// Period in simulated time units between disaster checks.
    pub check_interval: f64,
    /// Probability of the Bernoulli trial performed at each check.
    pub failure_probability: f64,
}

impl Default for DisasterConfig {
    fn default() -> Self {
        Self {
            check_interval: 10.,
            failure_probability: 0.5,
        }
    }
}

fn default_primary() -> DatacenterConfig {
    DatacenterConfig {
        name: "PrimaryDC".to_string(),
        hosts: HostConfig {
            count: 2,
            cores: 4,
            mips_per_core: 3000.,
            memory: 16384,
            bandwidth: 10000,
            storage: 1000000,
        },
        vms: VmConfig {
            count: 4,
            cores: 2,
            mips_per_core: 1000.,
            memory: 2048,
            bandwidth: 1000,
            disk_size: 10000,
        },
        characteristics: CharacteristicsConfig {
            arch: "x86".to_string(),
            os: "Linux".to_string(),
            vmm: "Xen".to_string(),
            timezone: 10.,
            cost_per_sec: 0.1,
            cost_per_mem: 0.05,
            cost_per_storage: 0.001,
            cost_per_bw: 0.1,
        },
    }
}

fn default_backup() -> DatacenterConfig {
    DatacenterConfig {
        name: "BackupDC".to_string(),
        hosts: HostConfig {
            count: 2,
            cores: 2,
            mips_per_core: 1500.,
            memory: 8192,
            bandwidth: 5000,
            storage: 1000000,
        },
        vms: VmConfig {
            count: 2,
            cores: 1,
            mips_per_core: 500.,
            memory: 1024,
            bandwidth: 500,
            disk_size: 10000,
        },
        characteristics: CharacteristicsConfig {
            arch: "x86".to_string(),
            os: "Linux".to_string(),
            vmm: "Xen".to_string(),
            timezone: 10.,
            cost_per_sec: 0.05,
            cost_per_mem: 0.05,
            cost_per_storage: 0.001,
            cost_per_bw: 0.1,
        },
    }
}

/// Represents simulation configuration.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct SimulationConfig {
    /// Configuration of the cloudlet batch.
    pub cloudlets: CloudletConfig,
    /// Configuration of the primary datacenter.
    pub primary: DatacenterConfig,
    /// Configuration of the backup datacenter.
    pub backup: DatacenterConfig,
    /// Configuration of the disaster event.
    pub disaster: DisasterConfig,
    /// Maximum number of concurrently executing cloudlets per VM.
    pub vm_admission_limit: u32,
    /// VM placement algorithm used by both datacenters.
    pub placement_algorithm: String,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            cloudlets: CloudletConfig::default(),
            primary: default_primary(),
            backup: default_backup(),
            disaster: DisasterConfig::default(),
            vm_admission_limit: 8,
            placement_algorithm: "FirstFit".to_string(),
        }
    }
}

impl SimulationConfig {
    /// Creates simulation config by reading parameter values from YAML file
    /// (uses default values if some parameters are absent).
    pub fn from_file(file_name: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(file_name).map_err(|e| ConfigError::Io {
            path: file_name.to_string(),
            source: e,
        })?;
        let raw: RawSimulationConfig = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: file_name.to_string(),
            source: e,
        })?;
        let config = Self {
            cloudlets: raw.cloudlets.unwrap_or_default(),
            primary: raw.primary.unwrap_or_else(default_primary),
            backup: raw.backup.unwrap_or_else(default_backup),
            disaster: raw.disaster.unwrap_or_default(),
            vm_admission_limit: raw.vm_admission_limit.unwrap_or(8),
            placement_algorithm: raw.placement_algorithm.unwrap_or_else(|| "FirstFit".to_string()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks configuration values for business validity.
    ///
    /// A failure here aborts before any event is scheduled, leaving no
    /// partial state.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = self.disaster.failure_probability;
        if !(0. ..=1.).contains(&p) {
            return Err(ConfigError::InvalidConfiguration(format!(
                "failure probability must be within [0, 1], got {}",
                p
            )));
        }
        if self.disaster.check_interval <= 0. {
            return Err(ConfigError::InvalidConfiguration(format!(
                "disaster check interval must be positive, got {}",
                self.disaster.check_interval
            )));
        }
        if self.cloudlets.length <= 0. {
            return Err(ConfigError::InvalidConfiguration(format!(
                "cloudlet length must be positive, got {}",
                self.cloudlets.length
            )));
        }
        if self.cloudlets.cores == 0 {
            return Err(ConfigError::InvalidConfiguration(
                "cloudlet must require at least one core".to_string(),
            ));
        }
        if self.vm_admission_limit == 0 {
            return Err(ConfigError::InvalidConfiguration(
                "vm admission limit must be at least 1".to_string(),
            ));
        }
        if !matches!(self.placement_algorithm.as_str(), "FirstFit" | "BestFit") {
            return Err(ConfigError::InvalidConfiguration(format!(
                "unknown placement algorithm {}",
                self.placement_algorithm
            )));
        }
        for dc in [&self.primary, &self.backup] {
            if dc.hosts.count == 0 {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "datacenter {} must have at least one host",
                    dc.name
                )));
            }
            if dc.hosts.cores == 0 || dc.hosts.mips_per_core <= 0. {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "hosts of datacenter {} must have positive cores and MIPS",
                    dc.name
                )));
            }
            if dc.vms.count > 0 && (dc.vms.cores == 0 || dc.vms.mips_per_core <= 0.) {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "VMs of datacenter {} must have positive cores and MIPS",
                    dc.name
                )));
            }
        }
        Ok(())
    }
}
