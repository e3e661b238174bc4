use std::collections::BTreeMap;
use std::path::Path;

use fabric_core::{AddrGen, Operation};
use serde::Deserialize;

/// Full parameter set of a fabric simulation run.
///
/// Sections are `BTreeMap`s on purpose: iteration order decides arbiter
/// rotation order and process creation order, and sorted names keep both
/// deterministic across runs and platforms.
#[derive(Deserialize, Debug)]
pub struct FabricSimConfig {
    pub global: GlobalParams,
    pub fabric: FabricParams,
    pub initiators: BTreeMap<String, InitiatorParams>,
    pub targets: BTreeMap<String, TargetParams>,
}

#[derive(Deserialize, Debug)]
pub struct GlobalParams {
    #[serde(default = "defaults::debug_level")]
    pub debug_level: u8,
    pub simulation_time_in_cycles: f64,
    #[serde(default = "defaults::seed")]
    pub seed: u64,
}

#[derive(Deserialize, Debug)]
pub struct FabricParams {
    pub frequency_mhz: f64,
    pub arbiter: ArbiterParams,
    pub sockets: BTreeMap<String, SocketParams>,
}

impl FabricParams {
    pub fn clk_ns(&self) -> f64 {
        1000.0 / self.frequency_mhz
    }
}

#[derive(Deserialize, Debug)]
pub struct ArbiterParams {
    pub policy: ArbiterPolicy,
    pub slot_length: u64,
    pub start_at: StartAt,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ArbiterPolicy {
    RoundRobin,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StartAt {
    First,
    Random,
}

#[derive(Deserialize, Debug)]
pub struct SocketParams {
    pub protocol: String,
    pub init_tgt: SocketRole,
    /// Reserved for target-side latency modelling; routed but unused.
    #[serde(default)]
    pub latencies: Vec<u64>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SocketRole {
    Initiator,
    Target,
}

#[derive(Deserialize, Debug)]
pub struct InitiatorParams {
    pub frequency_mhz: f64,
    pub procedures: BTreeMap<String, ProcedureParams>,
    pub queues: BTreeMap<String, QueueParams>,
}

impl InitiatorParams {
    pub fn clk_ns(&self) -> f64 {
        1000.0 / self.frequency_mhz
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ProcedureParams {
    pub direction: Operation,
    pub burst_length: u32,
    pub burst_size: u64,
    pub inter_bursts: u32,
    pub thr_in_mbps: f64,
    pub outstanding: u32,
    pub address_gen: AddrGen,
    /// Name of the queue (within the same initiator) this procedure feeds.
    pub queue: String,
}

#[derive(Deserialize, Debug, Clone, Copy)]
pub struct QueueParams {
    pub depth: u64,
    pub width: u64,
}

#[derive(Deserialize, Debug)]
pub struct TargetParams {
    pub frequency_mhz: f64,
}

impl TargetParams {
    pub fn clk_ns(&self) -> f64 {
        1000.0 / self.frequency_mhz
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

mod defaults {
    pub fn debug_level() -> u8 {
        0
    }

    pub fn seed() -> u64 {
        1
    }
}

impl FabricSimConfig {
    pub fn load(path: impl AsRef<Path> + ToString) -> Result<Self, ConfigError> {
        let toml_str = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let config: FabricSimConfig = toml::from_str(&toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Cross-section checks serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (initiator, params) in &self.initiators {
            for (procedure, proc_params) in &params.procedures {
                if !params.queues.contains_key(&proc_params.queue) {
                    return Err(ConfigError::Invalid(format!(
                        "procedure '{initiator}.{procedure}' feeds unknown queue '{}'",
                        proc_params.queue
                    )));
                }
            }
            if !self.fabric.sockets.contains_key(initiator) {
                return Err(ConfigError::Invalid(format!(
                    "initiator '{initiator}' has no fabric socket"
                )));
            }
        }
        for target in self.targets.keys() {
            if !self.fabric.sockets.contains_key(target) {
                return Err(ConfigError::Invalid(format!(
                    "target '{target}' has no fabric socket"
                )));
            }
        }
        if self.initiators.is_empty() {
            return Err(ConfigError::Invalid("no initiators defined".into()));
        }
        if self.targets.is_empty() {
            return Err(ConfigError::Invalid("no targets defined".into()));
        }
        Ok(())
    }
}

impl Default for FabricSimConfig {
    /// The shipped CPU/PCIE → SRAM/ROM exploration setup, identical to
    /// `config/fabric.toml`.
    fn default() -> Self {
        let socket = |role: SocketRole| SocketParams {
            protocol: "AXI".to_string(),
            init_tgt: role,
            latencies: Vec::new(),
        };

        let procedure = |direction: Operation, thr_in_mbps: f64, queue: &str| ProcedureParams {
            direction,
            burst_length: 8,
            burst_size: 64,
            inter_bursts: 10,
            thr_in_mbps,
            outstanding: 8,
            address_gen: AddrGen::Random,
            queue: queue.to_string(),
        };

        let mut sockets = BTreeMap::new();
        sockets.insert("CPU".to_string(), socket(SocketRole::Initiator));
        sockets.insert("PCIE".to_string(), socket(SocketRole::Initiator));
        sockets.insert("SRAM".to_string(), socket(SocketRole::Target));
        sockets.insert("ROM".to_string(), socket(SocketRole::Target));

        let mut cpu_procedures = BTreeMap::new();
        cpu_procedures.insert("RD".to_string(), procedure(Operation::Read, 1600.0, "RDQ"));
        cpu_procedures.insert("WR".to_string(), procedure(Operation::Write, 1600.0, "WRQ"));
        let mut cpu_queues = BTreeMap::new();
        cpu_queues.insert("RDQ".to_string(), QueueParams { depth: 4, width: 16 });
        cpu_queues.insert("WRQ".to_string(), QueueParams { depth: 4, width: 16 });

        let mut pcie_procedures = BTreeMap::new();
        pcie_procedures.insert("WR".to_string(), procedure(Operation::Write, 800.0, "WRQ"));
        let mut pcie_queues = BTreeMap::new();
        pcie_queues.insert("WRQ".to_string(), QueueParams { depth: 4, width: 16 });

        let mut initiators = BTreeMap::new();
        initiators.insert(
            "CPU".to_string(),
            InitiatorParams {
                frequency_mhz: 400.0,
                procedures: cpu_procedures,
                queues: cpu_queues,
            },
        );
        initiators.insert(
            "PCIE".to_string(),
            InitiatorParams {
                frequency_mhz: 250.0,
                procedures: pcie_procedures,
                queues: pcie_queues,
            },
        );

        let mut targets = BTreeMap::new();
        targets.insert("SRAM".to_string(), TargetParams { frequency_mhz: 500.0 });
        targets.insert("ROM".to_string(), TargetParams { frequency_mhz: 200.0 });

        Self {
            global: GlobalParams {
                debug_level: 0,
                simulation_time_in_cycles: 1000.0,
                seed: 1,
            },
            fabric: FabricParams {
                frequency_mhz: 200.0,
                arbiter: ArbiterParams {
                    policy: ArbiterPolicy::RoundRobin,
                    slot_length: 5,
                    start_at: StartAt::First,
                },
                sockets,
            },
            initiators,
            targets,
        }
    }
}
